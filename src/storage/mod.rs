//! Storage layer.
//!
//! Knowledge graph entities and relationships persist in a single local
//! `SQLite` file. The same file may hold unrelated tables owned by other
//! tools (workflow checkpoints, for example); this layer only touches its
//! own tables and never hard-deletes anything.

// Allow significant_drop_tightening - the connection guard lives for the
// whole transaction by construction.
#![allow(clippy::significant_drop_tightening)]

pub mod sqlite;

pub use sqlite::{EntityStore, EntityTx};
