//! Async calling convention for async hosts.
//!
//! Every call runs to completion on tokio's blocking pool; there is no
//! suspension point inside a store, query, or render.

use super::knowledge_graph::{KnowledgeGraph, SessionQuery};
use crate::models::{
    EntityId, GraphStats, KnowledgeResult, Mistake, NewLearning, NewMistake, NewPattern, Pattern,
    QueryContext,
};
use crate::rendering::{FormatOptions, FormattedContext};
use crate::{Error, Result};
use std::sync::Arc;

/// Async wrapper over a shared [`KnowledgeGraph`].
#[derive(Clone)]
pub struct AsyncKnowledgeGraph {
    inner: Arc<KnowledgeGraph>,
}

impl AsyncKnowledgeGraph {
    /// Wraps a graph.
    #[must_use]
    pub fn new(graph: KnowledgeGraph) -> Self {
        Self {
            inner: Arc::new(graph),
        }
    }

    /// Wraps an already shared graph.
    #[must_use]
    pub const fn from_shared(inner: Arc<KnowledgeGraph>) -> Self {
        Self { inner }
    }

    /// The wrapped graph.
    #[must_use]
    pub const fn inner(&self) -> &Arc<KnowledgeGraph> {
        &self.inner
    }

    async fn run<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&KnowledgeGraph) -> Result<T> + Send + 'static,
    {
        let graph = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&graph))
            .await
            .map_err(|e| Error::storage(operation, format!("task failed: {e}")))?
    }

    /// See [`KnowledgeGraph::store`].
    ///
    /// # Errors
    ///
    /// Propagates validation and storage errors.
    pub async fn store(&self, learnings: Vec<NewLearning>) -> Result<Vec<EntityId>> {
        self.run("store", move |g| g.store(learnings)).await
    }

    /// See [`KnowledgeGraph::store_pattern`].
    ///
    /// # Errors
    ///
    /// Propagates validation and storage errors.
    pub async fn store_pattern(
        &self,
        pattern: NewPattern,
        learning_ids: Vec<EntityId>,
    ) -> Result<EntityId> {
        self.run("store_pattern", move |g| g.store_pattern(pattern, &learning_ids))
            .await
    }

    /// See [`KnowledgeGraph::store_mistake`].
    ///
    /// # Errors
    ///
    /// Propagates validation and storage errors.
    pub async fn store_mistake(
        &self,
        mistake: NewMistake,
        learning_id: Option<EntityId>,
    ) -> Result<EntityId> {
        self.run("store_mistake", move |g| {
            g.store_mistake(mistake, learning_id.as_ref())
        })
        .await
    }

    /// See [`KnowledgeGraph::query`].
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn query(&self, ctx: QueryContext) -> Result<Vec<KnowledgeResult>> {
        self.run("query", move |g| g.query(&ctx)).await
    }

    /// See [`KnowledgeGraph::mistakes_for_file`].
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn mistakes_for_file(&self, path: String) -> Result<Vec<Mistake>> {
        self.run("mistakes_for_file", move |g| g.mistakes_for_file(&path))
            .await
    }

    /// See [`KnowledgeGraph::patterns_for_area`].
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn patterns_for_area(&self, name: String) -> Result<Vec<Pattern>> {
        self.run("patterns_for_area", move |g| g.patterns_for_area(&name))
            .await
    }

    /// See [`KnowledgeGraph::get_learning`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for unknown ids.
    pub async fn get_learning(&self, id: EntityId) -> Result<KnowledgeResult> {
        self.run("get_learning", move |g| g.get_learning(&id)).await
    }

    /// See [`KnowledgeGraph::stats`].
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn stats(&self) -> Result<GraphStats> {
        self.run("stats", KnowledgeGraph::stats).await
    }

    /// See [`KnowledgeGraph::build_session_context`].
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn build_session_context(
        &self,
        session: SessionQuery,
        options: FormatOptions,
    ) -> Result<FormattedContext> {
        self.run("build_session_context", move |g| {
            g.build_session_context(&session, &options)
        })
        .await
    }
}
