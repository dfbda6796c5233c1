//! Business logic services.
//!
//! Services share one [`EntityStore`](crate::storage::EntityStore) handle and
//! provide the ingestion, query, and ranking operations.

mod async_graph;
pub mod ingestion;
mod knowledge_graph;
pub mod query;
pub mod ranking;

pub use async_graph::AsyncKnowledgeGraph;
pub use ingestion::IngestionService;
pub use knowledge_graph::{KnowledgeGraph, SessionQuery};
pub use query::QueryService;
pub use ranking::{
    ISSUE_MATCH_BOOST, LearningGroup, MODIFIED_FILE_BOOST, RECENCY_BOOST, RECENCY_WINDOW_DAYS,
    RankingContext, RelevanceRanker, ScoredLearning,
};
