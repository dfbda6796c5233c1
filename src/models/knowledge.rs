//! Knowledge records: learnings, patterns, mistakes, and their anchors.
//!
//! Stored entities (`Learning`, `Pattern`, ...) are what the store returns.
//! Input records (`NewLearning`, `NewPattern`, `NewMistake`) are what callers
//! hand to ingestion; they carry explicit optional fields and are validated
//! before any write is attempted.

use super::graph::{EntityId, EntityKind};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confidence assigned to a learning that does not specify one.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// An atomic knowledge unit captured during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Learning {
    /// Unique identifier.
    pub id: EntityId,
    /// What was learned.
    pub content: String,
    /// Code area the learning relates to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_area: Option<String>,
    /// File the learning is located in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Issue number of the session that produced it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_issue: Option<u32>,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A generalized, reusable practice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// Unique identifier.
    pub id: EntityId,
    /// Short name.
    pub name: String,
    /// What the pattern prescribes.
    pub description: String,
    /// Code area the pattern applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_area: Option<String>,
}

/// A recorded error plus the fix that resolved it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mistake {
    /// Unique identifier.
    pub id: EntityId,
    /// What went wrong.
    pub description: String,
    /// How it was fixed.
    pub how_fixed: String,
    /// File the mistake was made in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// A named code area, deduplicated by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArea {
    /// Unique identifier.
    pub id: EntityId,
    /// Natural key.
    pub name: String,
}

/// A source file, deduplicated by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    /// Unique identifier.
    pub id: EntityId,
    /// Natural key.
    pub path: String,
}

/// Any stored entity, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    /// A learning.
    Learning(Learning),
    /// A pattern.
    Pattern(Pattern),
    /// A mistake.
    Mistake(Mistake),
    /// A code area.
    CodeArea(CodeArea),
    /// A file.
    File(FileNode),
}

impl Entity {
    /// Returns the entity kind.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Learning(_) => EntityKind::Learning,
            Self::Pattern(_) => EntityKind::Pattern,
            Self::Mistake(_) => EntityKind::Mistake,
            Self::CodeArea(_) => EntityKind::CodeArea,
            Self::File(_) => EntityKind::File,
        }
    }

    /// Returns the entity id.
    #[must_use]
    pub const fn id(&self) -> &EntityId {
        match self {
            Self::Learning(l) => &l.id,
            Self::Pattern(p) => &p.id,
            Self::Mistake(m) => &m.id,
            Self::CodeArea(a) => &a.id,
            Self::File(f) => &f.id,
        }
    }

    /// Returns the natural key for deduplicated kinds.
    #[must_use]
    pub fn natural_key(&self) -> Option<&str> {
        match self {
            Self::CodeArea(a) => Some(a.name.as_str()),
            Self::File(f) => Some(f.path.as_str()),
            Self::Learning(_) | Self::Pattern(_) | Self::Mistake(_) => None,
        }
    }
}

/// Input record for a learning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewLearning {
    /// Caller-supplied id; generated when absent.
    #[serde(default)]
    pub id: Option<EntityId>,
    /// What was learned.
    pub content: String,
    /// Code area reference.
    #[serde(default)]
    pub code_area: Option<String>,
    /// File path reference.
    #[serde(default)]
    pub file_path: Option<String>,
    /// Originating issue number.
    #[serde(default)]
    pub source_issue: Option<u32>,
    /// Confidence; defaults to [`DEFAULT_CONFIDENCE`].
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Creation time; defaults to ingestion time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewLearning {
    /// Creates a learning input with the given content.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Sets an explicit id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the code area.
    #[must_use]
    pub fn with_code_area(mut self, area: impl Into<String>) -> Self {
        self.code_area = Some(area.into());
        self
    }

    /// Sets the file path.
    #[must_use]
    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Sets the source issue.
    #[must_use]
    pub const fn with_source_issue(mut self, issue: u32) -> Self {
        self.source_issue = Some(issue);
        self
    }

    /// Sets the confidence.
    #[must_use]
    pub const fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Sets the creation time.
    #[must_use]
    pub const fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Checks the record without touching storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        validate_optional_id(self.id.as_ref())?;
        require_text("learning content", &self.content)?;
        validate_optional_text("code_area", self.code_area.as_deref())?;
        validate_optional_text("file_path", self.file_path.as_deref())?;
        if let Some(confidence) = self.confidence {
            validate_confidence(confidence)?;
        }
        Ok(())
    }

    /// Resolves defaults into a storable [`Learning`].
    #[must_use]
    pub fn into_learning(self, now: DateTime<Utc>) -> Learning {
        Learning {
            id: self.id.unwrap_or_else(EntityId::generate),
            content: self.content,
            code_area: self.code_area,
            file_path: self.file_path,
            source_issue: self.source_issue,
            confidence: self.confidence.unwrap_or(DEFAULT_CONFIDENCE),
            created_at: self.created_at.unwrap_or(now),
        }
    }
}

/// Input record for a pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPattern {
    /// Caller-supplied id; generated when absent.
    #[serde(default)]
    pub id: Option<EntityId>,
    /// Short name.
    pub name: String,
    /// What the pattern prescribes.
    pub description: String,
    /// Code area reference.
    #[serde(default)]
    pub code_area: Option<String>,
}

impl NewPattern {
    /// Creates a pattern input.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    /// Sets an explicit id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the code area.
    #[must_use]
    pub fn with_code_area(mut self, area: impl Into<String>) -> Self {
        self.code_area = Some(area.into());
        self
    }

    /// Checks the record without touching storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        validate_optional_id(self.id.as_ref())?;
        require_text("pattern name", &self.name)?;
        require_text("pattern description", &self.description)?;
        validate_optional_text("code_area", self.code_area.as_deref())
    }

    /// Resolves defaults into a storable [`Pattern`].
    #[must_use]
    pub fn into_pattern(self) -> Pattern {
        Pattern {
            id: self.id.unwrap_or_else(EntityId::generate),
            name: self.name,
            description: self.description,
            code_area: self.code_area,
        }
    }
}

/// Input record for a mistake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMistake {
    /// Caller-supplied id; generated when absent.
    #[serde(default)]
    pub id: Option<EntityId>,
    /// What went wrong.
    pub description: String,
    /// How it was fixed.
    pub how_fixed: String,
    /// File path reference.
    #[serde(default)]
    pub file_path: Option<String>,
}

impl NewMistake {
    /// Creates a mistake input.
    #[must_use]
    pub fn new(description: impl Into<String>, how_fixed: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            how_fixed: how_fixed.into(),
            ..Self::default()
        }
    }

    /// Sets an explicit id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the file path.
    #[must_use]
    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Checks the record without touching storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        validate_optional_id(self.id.as_ref())?;
        require_text("mistake description", &self.description)?;
        require_text("mistake how_fixed", &self.how_fixed)?;
        validate_optional_text("file_path", self.file_path.as_deref())
    }

    /// Resolves defaults into a storable [`Mistake`].
    #[must_use]
    pub fn into_mistake(self) -> Mistake {
        Mistake {
            id: self.id.unwrap_or_else(EntityId::generate),
            description: self.description,
            how_fixed: self.how_fixed,
            file_path: self.file_path,
        }
    }
}

/// Rejects confidence values outside `[0, 1]`.
///
/// # Errors
///
/// Returns [`Error::Validation`] for NaN, infinities, and out-of-range values.
pub fn validate_confidence(confidence: f64) -> Result<()> {
    if confidence.is_finite() && (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "confidence must be within [0, 1], got {confidence}"
        )))
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn validate_optional_text(field: &str, value: Option<&str>) -> Result<()> {
    value.map_or(Ok(()), |v| require_text(field, v))
}

fn validate_optional_id(id: Option<&EntityId>) -> Result<()> {
    id.map_or(Ok(()), |id| require_text("id", id.as_str()))
}
