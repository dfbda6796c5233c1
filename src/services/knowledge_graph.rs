//! Knowledge graph facade.
//!
//! Bundles one shared store handle with the ingestion and query services and
//! assembles the session-start digest.

use super::ranking::{RankingContext, RelevanceRanker};
use super::{IngestionService, QueryService};
use crate::config::LearngraphConfig;
use crate::models::{
    EntityId, GraphStats, KnowledgeResult, Learning, Mistake, NewLearning, NewMistake,
    NewPattern, Pattern, QueryContext,
};
use crate::rendering::{FormatOptions, FormattedContext, KnowledgeContextFormatter};
use crate::storage::EntityStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// What a new session is about.
///
/// `keywords` filter which learnings are fetched. The other fields steer
/// ranking and pull in patterns for the code area and mistakes for the
/// modified files; they do not exclude learnings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionQuery {
    /// Issue being worked on.
    #[serde(default)]
    pub issue_number: Option<u32>,
    /// Primary code area.
    #[serde(default)]
    pub code_area: Option<String>,
    /// Files modified in the working tree.
    #[serde(default)]
    pub modified_files: Vec<String>,
    /// Content keywords (any match).
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Maximum learnings kept after ranking.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SessionQuery {
    /// Ranking context derived from this session.
    #[must_use]
    pub fn ranking_context(&self) -> RankingContext {
        RankingContext {
            issue_number: self.issue_number,
            primary_code_area: self.code_area.clone(),
            modified_files: self.modified_files.clone(),
        }
    }
}

/// Entry point bundling storage, ingestion, and query.
pub struct KnowledgeGraph {
    store: Arc<EntityStore>,
    ingestion: IngestionService,
    query: QueryService,
}

impl KnowledgeGraph {
    /// Builds the facade over an existing store handle.
    #[must_use]
    pub fn from_store(store: Arc<EntityStore>) -> Self {
        Self {
            ingestion: IngestionService::new(Arc::clone(&store)),
            query: QueryService::new(Arc::clone(&store)),
            store,
        }
    }

    /// Opens the database named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the database cannot be opened.
    pub fn open(config: &LearngraphConfig) -> Result<Self> {
        Self::open_path(config.db_path())
    }

    /// Opens the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the database cannot be opened.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let store = EntityStore::open(path.as_ref())?;
        Ok(Self::from_store(Arc::new(store)))
    }

    /// Creates a disposable in-memory graph.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_store(Arc::new(EntityStore::in_memory()?)))
    }

    /// The shared store handle.
    #[must_use]
    pub const fn entity_store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    /// See [`IngestionService::store`].
    ///
    /// # Errors
    ///
    /// Propagates validation and storage errors.
    pub fn store(&self, learnings: Vec<NewLearning>) -> Result<Vec<EntityId>> {
        self.ingestion.store(learnings)
    }

    /// See [`IngestionService::store_pattern`].
    ///
    /// # Errors
    ///
    /// Propagates validation and storage errors.
    pub fn store_pattern(&self, pattern: NewPattern, learning_ids: &[EntityId]) -> Result<EntityId> {
        self.ingestion.store_pattern(pattern, learning_ids)
    }

    /// See [`IngestionService::store_mistake`].
    ///
    /// # Errors
    ///
    /// Propagates validation and storage errors.
    pub fn store_mistake(
        &self,
        mistake: NewMistake,
        learning_id: Option<&EntityId>,
    ) -> Result<EntityId> {
        self.ingestion.store_mistake(mistake, learning_id)
    }

    /// See [`QueryService::query`].
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn query(&self, ctx: &QueryContext) -> Result<Vec<KnowledgeResult>> {
        self.query.query(ctx)
    }

    /// See [`QueryService::mistakes_for_file`].
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn mistakes_for_file(&self, path: &str) -> Result<Vec<Mistake>> {
        self.query.mistakes_for_file(path)
    }

    /// See [`QueryService::patterns_for_area`].
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn patterns_for_area(&self, name: &str) -> Result<Vec<Pattern>> {
        self.query.patterns_for_area(name)
    }

    /// See [`QueryService::get_learning`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for unknown ids.
    pub fn get_learning(&self, id: &EntityId) -> Result<KnowledgeResult> {
        self.query.get_learning(id)
    }

    /// Entity and edge counts.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn stats(&self) -> Result<GraphStats> {
        self.store.stats()
    }

    /// Builds the session-start digest.
    ///
    /// 1. Fetch learnings matching the session keywords
    /// 2. Rank them and keep the top `limit`
    /// 3. Collect their related patterns and mistakes, the patterns for the
    ///    code area, and the mistakes for each modified file (deduplicated)
    /// 4. Render within `options.max_tokens`; `options.context` is replaced
    ///    by the session's ranking context
    ///
    /// # Errors
    ///
    /// Propagates storage errors. Rendering itself never fails.
    #[instrument(skip(self, options), fields(max_tokens = options.max_tokens))]
    pub fn build_session_context(
        &self,
        session: &SessionQuery,
        options: &FormatOptions,
    ) -> Result<FormattedContext> {
        let context = session.ranking_context();
        let ranker = RelevanceRanker::new();

        let results = self
            .query
            .query(&QueryContext::new().with_keywords(session.keywords.iter().cloned()))?;

        let mut ranked: Vec<_> = results
            .into_iter()
            .map(|r| (ranker.score(&r.learning, &context), r))
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        if let Some(limit) = session.limit {
            ranked.truncate(limit);
        }

        let mut learnings: Vec<Learning> = Vec::with_capacity(ranked.len());
        let mut patterns = Collected::default();
        let mut mistakes = Collected::default();
        for (_, result) in ranked {
            patterns.extend(result.related_patterns, |p| &p.id);
            mistakes.extend(result.related_mistakes, |m| &m.id);
            learnings.push(result.learning);
        }

        if let Some(area) = session.code_area.as_deref() {
            patterns.extend(self.query.patterns_for_area(area)?, |p| &p.id);
        }
        for path in &session.modified_files {
            mistakes.extend(self.query.mistakes_for_file(path)?, |m| &m.id);
        }

        let formatter = KnowledgeContextFormatter::new(options.clone().with_context(context))
            .with_ranker(ranker);
        let rendered = formatter.render(&learnings, &patterns.items, &mistakes.items);

        tracing::info!(
            learnings = learnings.len(),
            included = rendered.included_sections.len(),
            total = rendered.total_sections,
            "Built session context"
        );
        Ok(rendered)
    }
}

/// Items collected in first-seen order, unique by id.
struct Collected<T> {
    seen: HashSet<EntityId>,
    items: Vec<T>,
}

impl<T> Default for Collected<T> {
    fn default() -> Self {
        Self {
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }
}

impl<T> Collected<T> {
    fn extend(&mut self, items: Vec<T>, id: impl Fn(&T) -> &EntityId) {
        for item in items {
            if self.seen.insert(id(&item).clone()) {
                self.items.push(item);
            }
        }
    }
}
