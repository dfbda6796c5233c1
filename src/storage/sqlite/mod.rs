//! `SQLite` Entity Store.
//!
//! ## Module Structure
//!
//! - [`connection`]: Connection handling (mutex poison recovery, pragmas)
//! - [`schema`]: Versioned migrations for the knowledge tables
//! - `rows`: Row conversion for each table
//! - `metrics`: Transaction metrics recording
//! - `store`: [`EntityStore`] and the transaction-scoped [`EntityTx`] operations

pub mod connection;
mod metrics;
mod rows;
pub mod schema;
mod store;

pub use connection::{BUSY_TIMEOUT_MS, LOWER_FN, acquire_lock, configure_connection};
pub use schema::{MIGRATIONS, Migration, current_version, migrate};
pub use store::{EntityStore, EntityTx};
