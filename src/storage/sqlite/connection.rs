//! Connection handling for the knowledge store.
//!
//! This module provides utilities for managing the `SQLite` connection with
//! mutex poison recovery and the pragmas the store relies on.

use crate::{Error, Result};
use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use std::sync::{Mutex, MutexGuard};

/// Busy timeout applied to every connection, in milliseconds.
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// SQL function folding text to lowercase with full Unicode case mapping.
///
/// `SQLite`'s built-in `lower()` only folds ASCII.
pub const LOWER_FN: &str = "learngraph_lower";

/// Acquires the connection mutex, recovering from poison.
///
/// If a previous critical section panicked, the connection itself is still
/// usable: any transaction it held was rolled back when the guard dropped.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("knowledge store mutex was poisoned, recovering");
            metrics::counter!("learngraph_sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a connection for the knowledge store.
///
/// # Configuration Applied
///
/// - **WAL mode**: readers never observe a partially applied batch
/// - **NORMAL synchronous**: durable at transaction boundaries in WAL mode
/// - **`busy_timeout`**: waits up to 5 seconds on a locked database file
/// - **`foreign_keys`**: enforced for every table sharing the file
/// - **[`LOWER_FN`]**: Unicode lowercase function used by keyword matching
///
/// # Errors
///
/// Returns [`Error::Storage`] if the busy timeout or foreign key pragma
/// cannot be applied, or the lowercase function cannot be registered.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    // journal_mode returns a row ("wal" or "memory"); in-memory databases
    // cannot switch to WAL, so the result is ignored.
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");

    conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS)
        .map_err(|e| Error::storage("configure_busy_timeout", e))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| Error::storage("configure_foreign_keys", e))?;

    conn.create_scalar_function(
        LOWER_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
    .map_err(|e| Error::storage("configure_lower_function", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_acquire_lock_concurrent() {
        let mutex = Arc::new(Mutex::new(0));
        let mut handles = vec![];

        for _ in 0..10 {
            let mutex_clone = Arc::clone(&mutex);
            handles.push(thread::spawn(move || {
                let mut guard = acquire_lock(&mutex_clone);
                *guard += 1;
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*acquire_lock(&mutex), 10);
    }

    #[test]
    fn test_acquire_lock_recovers_from_poison() {
        let mutex = Arc::new(Mutex::new(7));
        let poisoner = Arc::clone(&mutex);
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(mutex.is_poisoned());
        assert_eq!(*acquire_lock(&mutex), 7);
    }

    #[test]
    fn test_configure_connection() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn).unwrap();

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert!(
            journal_mode.eq_ignore_ascii_case("wal") || journal_mode.eq_ignore_ascii_case("memory"),
            "unexpected journal mode '{journal_mode}'"
        );

        let busy_timeout: i32 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(busy_timeout, 5000);

        let foreign_keys: i32 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn test_lower_function_folds_unicode() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn).unwrap();

        let folded: String = conn
            .query_row(
                &format!("SELECT {LOWER_FN}('Über ÉMILE Straße')"),
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(folded, "über émile straße");

        let null: Option<String> = conn
            .query_row(&format!("SELECT {LOWER_FN}(NULL)"), [], |row| row.get(0))
            .unwrap();
        assert!(null.is_none());
    }
}
