//! Query service.
//!
//! Context-filtered retrieval of learnings plus a bounded two-hop traversal:
//! for each matched learning, the patterns and mistakes whose `LED_TO` edges
//! point into it. Nothing past that second hop is followed.

use crate::models::{EntityId, KnowledgeResult, Mistake, Pattern, QueryContext};
use crate::storage::EntityStore;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Service for reading knowledge back out of the graph.
pub struct QueryService {
    store: Arc<EntityStore>,
}

impl QueryService {
    /// Creates a query service over a shared store handle.
    #[must_use]
    pub const fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    /// Returns learnings matching `ctx`, each with its related patterns and mistakes.
    ///
    /// Results are in storage order; ranking is a separate step. No match is
    /// an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the datastore fails.
    #[instrument(skip(self), fields(code_area = ?ctx.code_area, issue = ?ctx.issue_number))]
    pub fn query(&self, ctx: &QueryContext) -> Result<Vec<KnowledgeResult>> {
        let start = Instant::now();

        let results = self.store.read(|tx| {
            tx.find_learnings(ctx)?
                .into_iter()
                .map(|learning| {
                    let related_patterns = tx.patterns_leading_to(&learning.id)?;
                    let related_mistakes = tx.mistakes_leading_to(&learning.id)?;
                    Ok(KnowledgeResult {
                        learning,
                        related_patterns,
                        related_mistakes,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })?;

        metrics::counter!("learngraph_queries_total").increment(1);
        tracing::debug!(
            results = results.len(),
            duration_ms = start.elapsed().as_millis(),
            "Knowledge query completed"
        );
        Ok(results)
    }

    /// Mistakes recorded against the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the datastore fails.
    #[instrument(skip(self))]
    pub fn mistakes_for_file(&self, path: &str) -> Result<Vec<Mistake>> {
        self.store.read(|tx| tx.mistakes_in_file(path))
    }

    /// Patterns that apply to the code area named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the datastore fails.
    #[instrument(skip(self))]
    pub fn patterns_for_area(&self, name: &str) -> Result<Vec<Pattern>> {
        self.store.read(|tx| tx.patterns_for_area(name))
    }

    /// Loads one learning by id, with its related patterns and mistakes.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if no learning has this id
    /// - [`Error::Storage`] if the datastore fails
    #[instrument(skip(self), fields(learning_id = %id))]
    pub fn get_learning(&self, id: &EntityId) -> Result<KnowledgeResult> {
        self.store.read(|tx| {
            let learning = tx.get_learning(id)?.ok_or_else(|| Error::NotFound {
                kind: "learning",
                id: id.to_string(),
            })?;
            Ok(KnowledgeResult {
                related_patterns: tx.patterns_leading_to(&learning.id)?,
                related_mistakes: tx.mistakes_leading_to(&learning.id)?,
                learning,
            })
        })
    }
}
