//! Data models for learngraph.
//!
//! This module contains all the core data structures used throughout the system.

pub mod graph;
mod knowledge;
mod query;

pub use graph::{EdgeId, EntityId, EntityKind, GraphStats, Relationship, RelationshipType};
pub use knowledge::{
    CodeArea, DEFAULT_CONFIDENCE, Entity, FileNode, Learning, Mistake, NewLearning, NewMistake,
    NewPattern, Pattern, validate_confidence,
};
pub use query::{KnowledgeResult, QueryContext};
