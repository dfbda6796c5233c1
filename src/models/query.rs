//! Query inputs and results.

use super::knowledge::{Learning, Mistake, Pattern};
use serde::{Deserialize, Serialize};

/// Filters for retrieving learnings.
///
/// Every present field must match (AND across fields). Within `keywords`, a
/// learning matches if its content contains any keyword.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    /// Exact code area name.
    #[serde(default)]
    pub code_area: Option<String>,
    /// Exact file path.
    #[serde(default)]
    pub file_path: Option<String>,
    /// Content keywords, matched case-insensitively.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Exact source issue.
    #[serde(default)]
    pub issue_number: Option<u32>,
    /// Maximum number of learnings returned.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl QueryContext {
    /// Creates an empty query that matches every learning.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by code area.
    #[must_use]
    pub fn with_code_area(mut self, area: impl Into<String>) -> Self {
        self.code_area = Some(area.into());
        self
    }

    /// Filters by file path.
    #[must_use]
    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Adds a keyword.
    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    /// Replaces the keyword list.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Filters by source issue.
    #[must_use]
    pub const fn with_issue_number(mut self, issue: u32) -> Self {
        self.issue_number = Some(issue);
        self
    }

    /// Caps the number of learnings returned.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Keywords with blank entries removed.
    pub fn effective_keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
    }
}

/// A matched learning plus the entities one `LED_TO` hop away from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeResult {
    /// The matched learning.
    pub learning: Learning,
    /// Patterns with a `LED_TO` edge into the learning.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_patterns: Vec<Pattern>,
    /// Mistakes with a `LED_TO` edge into the learning.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_mistakes: Vec<Mistake>,
}

impl KnowledgeResult {
    /// Wraps a learning with no related entities.
    #[must_use]
    pub const fn new(learning: Learning) -> Self {
        Self {
            learning,
            related_patterns: Vec::new(),
            related_mistakes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_keywords_skip_blanks() {
        let ctx = QueryContext::new().with_keywords(["zod", "  ", "", " cache "]);
        let keywords: Vec<&str> = ctx.effective_keywords().collect();
        assert_eq!(keywords, vec!["zod", "cache"]);
    }

    #[test]
    fn test_builder_sets_fields() {
        let ctx = QueryContext::new()
            .with_code_area("API")
            .with_file_path("src/api.ts")
            .with_issue_number(42)
            .with_limit(5);
        assert_eq!(ctx.code_area.as_deref(), Some("API"));
        assert_eq!(ctx.file_path.as_deref(), Some("src/api.ts"));
        assert_eq!(ctx.issue_number, Some(42));
        assert_eq!(ctx.limit, Some(5));
    }
}
