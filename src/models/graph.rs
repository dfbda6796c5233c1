// Allow non-const functions that use HashMap lookups
#![allow(clippy::missing_const_for_fn)]

//! Graph identity and edge types for the knowledge graph.
//!
//! # Entity Kinds
//!
//! | Kind | Key | Notes |
//! |------|-----|-------|
//! | `Learning` | id | Immutable after creation |
//! | `Pattern` | id | Derived from learnings |
//! | `Mistake` | id | Error plus the fix that resolved it |
//! | `CodeArea` | name | Deduplicated, auto-created on first reference |
//! | `File` | path | Deduplicated, auto-created on first reference |
//!
//! # Relationship Types
//!
//! | Type | From | To |
//! |------|------|----|
//! | `ABOUT` | Learning | `CodeArea` |
//! | `IN_FILE` | Learning, Mistake | File |
//! | `LED_TO` | Pattern, Mistake | Learning |
//! | `APPLIES_TO` | Pattern | `CodeArea` |
//! | `SUPERSEDES` | Learning | Learning |
//!
//! Edges are directed, typed, and append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Unique identifier for a stored entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates an entity ID from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new time-ordered entity ID (UUID v7).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of a relationship edge (monotonic row id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(i64);

impl EdgeId {
    /// Wraps a raw edge row id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw row id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of entity stored in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Atomic knowledge unit captured during a session.
    Learning,
    /// Reusable practice derived from learnings.
    Pattern,
    /// Recorded error plus its fix.
    Mistake,
    /// Named semantic grouping, keyed by name.
    CodeArea,
    /// Source file, keyed by path.
    File,
}

impl EntityKind {
    /// Returns all entity kinds.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Learning,
            Self::Pattern,
            Self::Mistake,
            Self::CodeArea,
            Self::File,
        ]
    }

    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Learning => "learning",
            Self::Pattern => "pattern",
            Self::Mistake => "mistake",
            Self::CodeArea => "code_area",
            Self::File => "file",
        }
    }

    /// Returns `true` for kinds deduplicated by natural key.
    #[must_use]
    pub const fn has_natural_key(&self) -> bool {
        matches!(self, Self::CodeArea | Self::File)
    }

    /// Parses an entity kind from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "learning" | "learnings" => Some(Self::Learning),
            "pattern" | "patterns" => Some(Self::Pattern),
            "mistake" | "mistakes" => Some(Self::Mistake),
            "code_area" | "codearea" | "area" => Some(Self::CodeArea),
            "file" | "files" => Some(Self::File),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown entity kind: {s}"))
    }
}

/// Type of a directed relationship edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    /// Learning relates to a code area.
    About,
    /// Learning or mistake is located in a file.
    InFile,
    /// Pattern or mistake derived from / fixed by a learning.
    LedTo,
    /// Pattern applies to a code area.
    AppliesTo,
    /// Learning supersedes another learning. Stored, not yet enforced by queries.
    Supersedes,
}

impl RelationshipType {
    /// Returns all relationship types.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::About,
            Self::InFile,
            Self::LedTo,
            Self::AppliesTo,
            Self::Supersedes,
        ]
    }

    /// Returns the relationship type as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::About => "ABOUT",
            Self::InFile => "IN_FILE",
            Self::LedTo => "LED_TO",
            Self::AppliesTo => "APPLIES_TO",
            Self::Supersedes => "SUPERSEDES",
        }
    }

    /// Entity kinds allowed at the source end of the edge.
    #[must_use]
    pub const fn source_kinds(&self) -> &'static [EntityKind] {
        match self {
            Self::About | Self::Supersedes => &[EntityKind::Learning],
            Self::InFile => &[EntityKind::Learning, EntityKind::Mistake],
            Self::LedTo => &[EntityKind::Pattern, EntityKind::Mistake],
            Self::AppliesTo => &[EntityKind::Pattern],
        }
    }

    /// Entity kinds allowed at the target end of the edge.
    #[must_use]
    pub const fn target_kinds(&self) -> &'static [EntityKind] {
        match self {
            Self::About | Self::AppliesTo => &[EntityKind::CodeArea],
            Self::InFile => &[EntityKind::File],
            Self::LedTo | Self::Supersedes => &[EntityKind::Learning],
        }
    }

    /// Parses a relationship type from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "ABOUT" => Some(Self::About),
            "IN_FILE" | "INFILE" => Some(Self::InFile),
            "LED_TO" | "LEDTO" => Some(Self::LedTo),
            "APPLIES_TO" | "APPLIESTO" => Some(Self::AppliesTo),
            "SUPERSEDES" => Some(Self::Supersedes),
            _ => None,
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown relationship type: {s}"))
    }
}

/// A stored relationship edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Edge id.
    pub id: EdgeId,
    /// Edge type.
    pub kind: RelationshipType,
    /// Source entity.
    pub from_id: EntityId,
    /// Target entity.
    pub to_id: EntityId,
    /// When the edge was written.
    pub created_at: DateTime<Utc>,
}

/// Counts of stored entities and edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Entity count by kind.
    pub entities: HashMap<EntityKind, usize>,
    /// Edge count by relationship type.
    pub relationships: HashMap<RelationshipType, usize>,
}

impl GraphStats {
    /// Number of entities of the given kind.
    #[must_use]
    pub fn entity_count(&self, kind: EntityKind) -> usize {
        self.entities.get(&kind).copied().unwrap_or(0)
    }

    /// Number of edges of the given type.
    #[must_use]
    pub fn relationship_count(&self, kind: RelationshipType) -> usize {
        self.relationships.get(&kind).copied().unwrap_or(0)
    }

    /// Total number of edges.
    #[must_use]
    pub fn total_relationships(&self) -> usize {
        self.relationships.values().sum()
    }
}
