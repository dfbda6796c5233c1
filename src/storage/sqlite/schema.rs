//! Embedded schema migrations for the knowledge store.
//!
//! Applied versions are tracked in `knowledge_schema_migrations` rather than
//! `PRAGMA user_version`, leaving the pragma free for other tables sharing
//! the database file.

use crate::{Error, Result};
use rusqlite::{Connection, TransactionBehavior, params};

/// A single migration with version and SQL.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Migration version (sequential, starting at 1).
    pub version: i32,
    /// Human-readable description.
    pub description: &'static str,
    /// SQL to apply (may contain multiple statements).
    pub sql: &'static str,
}

/// Migrations for the knowledge graph tables, in order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "knowledge graph entities and relationships",
        sql: "
            CREATE TABLE IF NOT EXISTS learnings (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                code_area TEXT,
                file_path TEXT,
                source_issue INTEGER,
                confidence REAL NOT NULL DEFAULT 0.5
                    CHECK (confidence >= 0.0 AND confidence <= 1.0),
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS patterns (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                code_area TEXT
            );
            CREATE TABLE IF NOT EXISTS mistakes (
                id TEXT PRIMARY KEY,
                description TEXT NOT NULL,
                how_fixed TEXT NOT NULL,
                file_path TEXT
            );
            CREATE TABLE IF NOT EXISTS code_areas (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS files (
                id TEXT PRIMARY KEY,
                path TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS relationships (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                from_id TEXT NOT NULL,
                to_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_relationships_to ON relationships(to_id, kind);
            CREATE INDEX IF NOT EXISTS idx_relationships_from ON relationships(from_id, kind);
            CREATE INDEX IF NOT EXISTS idx_learnings_source_issue ON learnings(source_issue);
        ",
    },
];

/// Applies all pending migrations.
///
/// Each migration runs in its own transaction together with its bookkeeping row.
///
/// # Errors
///
/// Returns [`Error::Storage`] if a migration fails; earlier migrations stay applied.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS knowledge_schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .map_err(|e| Error::storage("create_migrations_table", e))?;

    let current = current_version(conn)?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::storage("migration_begin", e))?;

        tx.execute_batch(migration.sql).map_err(|e| Error::Storage {
            operation: format!("migration_v{}", migration.version),
            cause: e.to_string(),
        })?;
        tx.execute(
            "INSERT INTO knowledge_schema_migrations (version, description, applied_at)
             VALUES (?1, ?2, ?3)",
            params![
                migration.version,
                migration.description,
                chrono::Utc::now().to_rfc3339()
            ],
        )
        .map_err(|e| Error::storage("migration_record", e))?;

        tx.commit()
            .map_err(|e| Error::storage("migration_commit", e))?;

        tracing::debug!(
            version = migration.version,
            description = migration.description,
            "Applied knowledge schema migration"
        );
    }

    Ok(())
}

/// Returns the highest applied migration version, or 0.
///
/// # Errors
///
/// Returns [`Error::Storage`] if the bookkeeping table cannot be read.
pub fn current_version(conn: &Connection) -> Result<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM knowledge_schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| Error::storage("migration_current_version", e))
}
