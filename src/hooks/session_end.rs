//! Session end hook handler.

use super::{HookHandler, parse_input};
use crate::config::LearngraphConfig;
use crate::models::{NewLearning, validate_confidence};
use crate::services::KnowledgeGraph;
use crate::Result;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

/// One learning captured at session end.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionLearning {
    /// What was learned.
    pub content: String,
    /// Code area reference.
    #[serde(default)]
    pub code_area: Option<String>,
    /// File path reference.
    #[serde(default)]
    pub file_path: Option<String>,
    /// Confidence; defaults to the handler's session-end confidence.
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Session end payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionEndInput {
    /// Issue the session worked on; recorded as each learning's source.
    #[serde(default)]
    pub issue_number: Option<u32>,
    /// Learnings to record.
    #[serde(default)]
    pub learnings: Vec<SessionLearning>,
}

/// Handles session end events.
///
/// Records captured learnings in one batch at reduced default confidence.
pub struct SessionEndHandler {
    graph: Arc<KnowledgeGraph>,
    default_confidence: f64,
}

impl SessionEndHandler {
    /// Creates a handler using the default session-end confidence (0.6).
    #[must_use]
    pub fn new(graph: Arc<KnowledgeGraph>) -> Self {
        Self::from_config(graph, &LearngraphConfig::default())
    }

    /// Creates a handler using the configured session-end confidence.
    #[must_use]
    pub fn from_config(graph: Arc<KnowledgeGraph>, config: &LearngraphConfig) -> Self {
        Self {
            graph,
            default_confidence: config.session_end_confidence,
        }
    }

    fn to_new_learning(&self, issue: Option<u32>, captured: SessionLearning) -> NewLearning {
        NewLearning {
            id: None,
            content: captured.content,
            code_area: captured.code_area,
            file_path: captured.file_path,
            source_issue: issue,
            confidence: Some(captured.confidence.unwrap_or(self.default_confidence)),
            created_at: None,
        }
    }
}

impl HookHandler for SessionEndHandler {
    fn event_type(&self) -> &'static str {
        "SessionEnd"
    }

    #[instrument(skip(self, input), fields(hook = "SessionEnd"))]
    fn handle(&self, input: &str) -> Result<String> {
        let input: SessionEndInput = parse_input(self.event_type(), input)?;
        validate_confidence(self.default_confidence)?;

        let learnings: Vec<_> = input
            .learnings
            .into_iter()
            .map(|l| self.to_new_learning(input.issue_number, l))
            .collect();

        let stored = if learnings.is_empty() {
            0
        } else {
            self.graph.store(learnings)?.len()
        };

        tracing::info!(stored, issue = ?input.issue_number, "Recorded session learnings");
        Ok(json!({ "stored": stored }).to_string())
    }
}
