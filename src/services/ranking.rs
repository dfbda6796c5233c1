//! Relevance ranking for retrieved learnings.
//!
//! # Scoring
//!
//! ```text
//! score = confidence
//!       + 0.3  if context.issue_number == learning.source_issue (both present)
//!       + 0.2  if learning.file_path is in context.modified_files
//!       + 0.1  if learning.created_at is within 30 days of `now`
//! ```
//!
//! Scores are not clamped, so a fully boosted learning can exceed 1.0.
//! Sorting is stable: equal scores keep their input order.

use crate::models::Learning;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Boost when the learning came from the issue being worked on.
pub const ISSUE_MATCH_BOOST: f64 = 0.3;

/// Boost when the learning's file is among the modified files.
pub const MODIFIED_FILE_BOOST: f64 = 0.2;

/// Boost for learnings recorded within [`RECENCY_WINDOW_DAYS`].
pub const RECENCY_BOOST: f64 = 0.1;

/// Age limit for the recency boost, in days.
pub const RECENCY_WINDOW_DAYS: i64 = 30;

/// Session context that feeds the ranker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingContext {
    /// Issue currently being worked on.
    #[serde(default)]
    pub issue_number: Option<u32>,
    /// Code area the session focuses on.
    #[serde(default)]
    pub primary_code_area: Option<String>,
    /// Files modified in the working tree.
    #[serde(default)]
    pub modified_files: Vec<String>,
}

impl RankingContext {
    /// Creates an empty context (no boosts apply except recency).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current issue.
    #[must_use]
    pub const fn with_issue_number(mut self, issue: u32) -> Self {
        self.issue_number = Some(issue);
        self
    }

    /// Sets the primary code area.
    #[must_use]
    pub fn with_primary_code_area(mut self, area: impl Into<String>) -> Self {
        self.primary_code_area = Some(area.into());
        self
    }

    /// Sets the modified files.
    #[must_use]
    pub fn with_modified_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modified_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `true` if `path` is among the modified files.
    #[must_use]
    pub fn is_modified(&self, path: &str) -> bool {
        self.modified_files.iter().any(|f| f == path)
    }
}

/// A learning paired with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredLearning {
    /// The learning.
    pub learning: Learning,
    /// Relevance score.
    pub score: f64,
}

/// Learnings sharing a code area, in ranked order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningGroup {
    /// Shared code area; `None` for the ungrouped bucket.
    pub code_area: Option<String>,
    /// Members, highest score first.
    pub members: Vec<ScoredLearning>,
}

impl LearningGroup {
    /// Score of the best member (0.0 for an empty group).
    #[must_use]
    pub fn top_score(&self) -> f64 {
        self.members
            .iter()
            .map(|m| m.score)
            .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
            .unwrap_or(0.0)
    }
}

/// Deterministic relevance scorer.
///
/// The reference time is fixed at construction so that every learning in a
/// call is scored against the same `now`.
#[derive(Debug, Clone, Copy)]
pub struct RelevanceRanker {
    now: DateTime<Utc>,
}

impl Default for RelevanceRanker {
    fn default() -> Self {
        Self::new()
    }
}

impl RelevanceRanker {
    /// Creates a ranker anchored at the current time.
    #[must_use]
    pub fn new() -> Self {
        Self { now: Utc::now() }
    }

    /// Creates a ranker anchored at `now`.
    #[must_use]
    pub const fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Reference time used for the recency boost.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Scores one learning.
    #[must_use]
    pub fn score(&self, learning: &Learning, ctx: &RankingContext) -> f64 {
        let mut score = learning.confidence;

        if let (Some(wanted), Some(source)) = (ctx.issue_number, learning.source_issue)
            && wanted == source
        {
            score += ISSUE_MATCH_BOOST;
        }

        if learning
            .file_path
            .as_deref()
            .is_some_and(|path| ctx.is_modified(path))
        {
            score += MODIFIED_FILE_BOOST;
        }

        if self.now.signed_duration_since(learning.created_at)
            <= Duration::days(RECENCY_WINDOW_DAYS)
        {
            score += RECENCY_BOOST;
        }

        score
    }

    /// Scores and sorts learnings, highest first. Ties keep input order.
    #[must_use]
    pub fn rank(&self, learnings: Vec<Learning>, ctx: &RankingContext) -> Vec<ScoredLearning> {
        let mut scored: Vec<ScoredLearning> = learnings
            .into_iter()
            .map(|learning| ScoredLearning {
                score: self.score(&learning, ctx),
                learning,
            })
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }

    /// Groups ranked learnings by code area.
    ///
    /// Groups are ordered by member count (largest first), ties by the
    /// position of their first member. Members keep their ranked order.
    #[must_use]
    pub fn group_by_area(ranked: Vec<ScoredLearning>) -> Vec<LearningGroup> {
        let mut groups: Vec<LearningGroup> = Vec::new();

        for scored in ranked {
            let area = scored.learning.code_area.clone();
            match groups.iter_mut().find(|g| g.code_area == area) {
                Some(group) => group.members.push(scored),
                None => groups.push(LearningGroup {
                    code_area: area,
                    members: vec![scored],
                }),
            }
        }

        groups.sort_by(|a, b| b.members.len().cmp(&a.members.len()));
        groups
    }
}
