//! # learngraph
//!
//! Cross-session knowledge graph for autonomous coding agents.
//!
//! An agent records what it learned during a session (learnings, reusable
//! patterns, past mistakes) into a local `SQLite` file. At the start of the next
//! session the most relevant subset is retrieved, ranked, and rendered into a
//! markdown digest that never exceeds a caller-supplied token budget.
//!
//! ## Pipeline
//!
//! | Stage | Module | Entry point |
//! |-------|--------|-------------|
//! | Entity Store | [`storage`] | [`EntityStore`] |
//! | Ingestion | [`services::ingestion`] | [`IngestionService`] |
//! | Query Engine | [`services::query`] | [`QueryService`] |
//! | Relevance Ranker | [`services::ranking`] | [`RelevanceRanker`] |
//! | Formatter | [`rendering`] | [`format_knowledge_context`] |
//!
//! ## Example
//!
//! ```rust,no_run
//! use learngraph::{FormatOptions, KnowledgeGraph, NewLearning, QueryContext};
//!
//! # fn main() -> learngraph::Result<()> {
//! let graph = KnowledgeGraph::in_memory()?;
//! graph.store(vec![
//!     NewLearning::new("Use Zod for validation")
//!         .with_code_area("API")
//!         .with_confidence(0.9),
//! ])?;
//!
//! let results = graph.query(&QueryContext::new().with_code_area("API"))?;
//! assert_eq!(results.len(), 1);
//!
//! let learnings: Vec<_> = results.into_iter().map(|r| r.learning).collect();
//! let digest = learngraph::format_knowledge_context(&learnings, &[], &[], &FormatOptions::default());
//! assert!(digest.contains("Use Zod for validation"));
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod hooks;
pub mod models;
pub mod observability;
pub mod rendering;
pub mod services;
pub mod storage;

pub use config::LearngraphConfig;
pub use models::{
    CodeArea, EdgeId, Entity, EntityId, EntityKind, FileNode, GraphStats, KnowledgeResult,
    Learning, Mistake, NewLearning, NewMistake, NewPattern, Pattern, QueryContext, Relationship,
    RelationshipType,
};
pub use rendering::{
    FormatOptions, FormattedContext, KnowledgeContextFormatter, estimate_tokens,
    format_knowledge_context,
};
pub use services::{
    AsyncKnowledgeGraph, IngestionService, KnowledgeGraph, QueryService, RankingContext,
    RelevanceRanker, SessionQuery,
};
pub use storage::EntityStore;

/// Error type for learngraph operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Storage` | The `SQLite` file is unreachable or corrupt, a statement fails, a constraint is violated |
/// | `Validation` | Malformed input records, rejected before any write |
/// | `NotFound` | An id-based single-entity lookup has no match |
/// | `Config` | A configuration file cannot be read or parsed, logging initialized twice |
///
/// Context-filtered queries never produce `NotFound`; no match is an empty list.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The underlying datastore failed.
    ///
    /// Any write batch that produced this error has been rolled back in full.
    #[error("storage operation '{operation}' failed: {cause}")]
    Storage {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Input failed validation.
    ///
    /// Raised when:
    /// - Learning content is blank
    /// - Confidence is outside `[0, 1]` or not finite
    /// - A supplied code area, file path, or id is blank
    /// - Hook input is not valid JSON for the event
    #[error("validation failed: {0}")]
    Validation(String),

    /// An entity looked up by id does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind that was looked up.
        kind: &'static str,
        /// The id that had no match.
        id: String,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Builds a [`Error::Storage`] from an operation name and any displayable cause.
    pub(crate) fn storage(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::Storage {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Returns `true` if this is a storage failure.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

/// Result type alias for learngraph operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Validation("content is blank".to_string());
        assert_eq!(err.to_string(), "validation failed: content is blank");

        let err = Error::storage("insert_learning", "disk I/O error");
        assert_eq!(
            err.to_string(),
            "storage operation 'insert_learning' failed: disk I/O error"
        );
        assert!(err.is_storage());

        let err = Error::NotFound {
            kind: "learning",
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "learning not found: abc");
        assert!(!err.is_storage());
    }
}
