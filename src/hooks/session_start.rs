//! Session start hook handler.

use super::{HookHandler, parse_input};
use crate::config::LearngraphConfig;
use crate::rendering::FormatOptions;
use crate::services::{KnowledgeGraph, SessionQuery};
use crate::Result;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

/// Session start payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionStartInput {
    /// Issue being worked on.
    #[serde(default)]
    pub issue_number: Option<u32>,
    /// Primary code area.
    #[serde(default)]
    pub code_area: Option<String>,
    /// Files modified in the working tree.
    #[serde(default)]
    pub modified_files: Vec<String>,
    /// Content keywords.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Maximum learnings to consider.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Token budget override.
    #[serde(default)]
    pub max_tokens: Option<usize>,
}

/// Handles session start events.
///
/// Queries the graph and injects the budgeted knowledge digest.
pub struct SessionStartHandler {
    graph: Arc<KnowledgeGraph>,
    options: FormatOptions,
    default_limit: usize,
}

impl SessionStartHandler {
    /// Creates a handler with default formatting options.
    #[must_use]
    pub fn new(graph: Arc<KnowledgeGraph>) -> Self {
        Self::from_config(graph, &LearngraphConfig::default())
    }

    /// Creates a handler using budget, path, and limit settings from config.
    #[must_use]
    pub fn from_config(graph: Arc<KnowledgeGraph>, config: &LearngraphConfig) -> Self {
        Self {
            graph,
            options: FormatOptions::default()
                .with_max_tokens(config.max_tokens)
                .with_show_file_paths(config.show_file_paths),
            default_limit: config.query_limit,
        }
    }

    fn session_query(&self, input: SessionStartInput) -> (SessionQuery, FormatOptions) {
        let options = input.max_tokens.map_or_else(
            || self.options.clone(),
            |max| self.options.clone().with_max_tokens(max),
        );
        let session = SessionQuery {
            issue_number: input.issue_number,
            code_area: input.code_area,
            modified_files: input.modified_files,
            keywords: input.keywords,
            limit: Some(input.limit.unwrap_or(self.default_limit)),
        };
        (session, options)
    }
}

impl HookHandler for SessionStartHandler {
    fn event_type(&self) -> &'static str {
        "SessionStart"
    }

    #[instrument(skip(self, input), fields(hook = "SessionStart"))]
    fn handle(&self, input: &str) -> Result<String> {
        let input: SessionStartInput = parse_input(self.event_type(), input)?;
        let (session, options) = self.session_query(input);

        let response = match self.graph.build_session_context(&session, &options) {
            Ok(rendered) => json!({
                "hookSpecificOutput": {
                    "hookEventName": self.event_type(),
                    "additionalContext": rendered.text,
                }
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Knowledge query failed, continuing without context");
                metrics::counter!("learngraph_hook_failures_total", "hook" => "SessionStart")
                    .increment(1);
                json!({})
            },
        };

        Ok(response.to_string())
    }
}
