//! Ingestion service.
//!
//! Converts flat input records into entity and edge writes. Every call
//! validates its whole input first, then applies all writes in one store
//! transaction, so a call either lands completely or leaves nothing behind.

use crate::models::{
    Entity, EntityId, EntityKind, NewLearning, NewMistake, NewPattern, RelationshipType,
};
use crate::storage::{EntityStore, EntityTx};
use crate::{Error, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Service for recording learnings, patterns, and mistakes.
pub struct IngestionService {
    store: Arc<EntityStore>,
}

impl IngestionService {
    /// Creates an ingestion service over a shared store handle.
    #[must_use]
    pub const fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    /// Stores a batch of learnings in one transaction.
    ///
    /// For each learning: assigns an id if absent, inserts the row, links a
    /// `CodeArea` via `ABOUT` and a `File` via `IN_FILE` when referenced.
    /// A learning whose id is already stored is left as it is, edges included.
    ///
    /// Returns the learning ids in input order.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if any record is malformed; nothing is written
    /// - [`Error::Storage`] if a write fails; the whole batch is rolled back
    #[instrument(skip(self, learnings), fields(count = learnings.len()))]
    pub fn store(&self, learnings: Vec<NewLearning>) -> Result<Vec<EntityId>> {
        let start = Instant::now();
        for (index, learning) in learnings.iter().enumerate() {
            learning
                .validate()
                .map_err(|e| with_position("learning", index, e))?;
        }

        let now = Utc::now();
        let records: Vec<_> = learnings
            .into_iter()
            .map(|l| l.into_learning(now))
            .collect();

        let ids = self.store.write(|tx| {
            records
                .iter()
                .map(|learning| {
                    let existed = tx.exists(EntityKind::Learning, &learning.id)?;
                    let id = tx.upsert_entity(&Entity::Learning(learning.clone()))?;
                    if !existed {
                        link_code_area(tx, RelationshipType::About, &id, learning.code_area.as_deref())?;
                        link_file(tx, &id, learning.file_path.as_deref())?;
                    }
                    Ok(id)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        metrics::counter!("learngraph_learnings_stored_total").increment(ids.len() as u64);
        tracing::info!(
            stored = ids.len(),
            duration_ms = start.elapsed().as_millis(),
            "Stored learnings"
        );
        Ok(ids)
    }

    /// Stores a pattern, linking it to its code area and source learnings.
    ///
    /// Adds an `APPLIES_TO` edge when `code_area` is present and one `LED_TO`
    /// edge per supplied learning id. Re-storing an existing pattern id only
    /// adds the `LED_TO` edges.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the pattern or a learning id is malformed
    /// - [`Error::Storage`] if a write fails or a learning id does not exist;
    ///   nothing is written
    #[instrument(skip(self, pattern, learning_ids), fields(name = %pattern.name, links = learning_ids.len()))]
    pub fn store_pattern(
        &self,
        pattern: NewPattern,
        learning_ids: &[EntityId],
    ) -> Result<EntityId> {
        pattern.validate()?;
        for id in learning_ids {
            validate_reference(id)?;
        }
        let pattern = pattern.into_pattern();

        let id = self.store.write(|tx| {
            let existed = tx.exists(EntityKind::Pattern, &pattern.id)?;
            let id = tx.upsert_entity(&Entity::Pattern(pattern.clone()))?;
            if !existed {
                link_code_area(tx, RelationshipType::AppliesTo, &id, pattern.code_area.as_deref())?;
            }
            for learning_id in learning_ids {
                tx.insert_edge(RelationshipType::LedTo, &id, learning_id)?;
            }
            Ok(id)
        })?;

        metrics::counter!("learngraph_patterns_stored_total").increment(1);
        tracing::info!(pattern_id = %id, "Stored pattern");
        Ok(id)
    }

    /// Stores a mistake, linking it to its file and the learning it led to.
    ///
    /// Adds an `IN_FILE` edge when `file_path` is present and a `LED_TO` edge
    /// when `learning_id` is supplied. Re-storing an existing mistake id only
    /// adds the `LED_TO` edge.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the mistake or the learning id is malformed
    /// - [`Error::Storage`] if a write fails or the learning does not exist;
    ///   nothing is written
    #[instrument(skip(self, mistake), fields(learning_id = ?learning_id))]
    pub fn store_mistake(
        &self,
        mistake: NewMistake,
        learning_id: Option<&EntityId>,
    ) -> Result<EntityId> {
        mistake.validate()?;
        if let Some(learning_id) = learning_id {
            validate_reference(learning_id)?;
        }
        let mistake = mistake.into_mistake();

        let id = self.store.write(|tx| {
            let existed = tx.exists(EntityKind::Mistake, &mistake.id)?;
            let id = tx.upsert_entity(&Entity::Mistake(mistake.clone()))?;
            if !existed {
                link_file(tx, &id, mistake.file_path.as_deref())?;
            }
            if let Some(learning_id) = learning_id {
                tx.insert_edge(RelationshipType::LedTo, &id, learning_id)?;
            }
            Ok(id)
        })?;

        metrics::counter!("learngraph_mistakes_stored_total").increment(1);
        tracing::info!(mistake_id = %id, "Stored mistake");
        Ok(id)
    }
}

fn link_code_area(
    tx: &EntityTx<'_>,
    kind: RelationshipType,
    from: &EntityId,
    area: Option<&str>,
) -> Result<()> {
    if let Some(name) = area {
        let area_id = tx.upsert_code_area(name)?;
        tx.insert_edge(kind, from, &area_id)?;
    }
    Ok(())
}

fn link_file(tx: &EntityTx<'_>, from: &EntityId, path: Option<&str>) -> Result<()> {
    if let Some(path) = path {
        let file_id = tx.upsert_file(path)?;
        tx.insert_edge(RelationshipType::InFile, from, &file_id)?;
    }
    Ok(())
}

fn validate_reference(id: &EntityId) -> Result<()> {
    if id.as_str().trim().is_empty() {
        return Err(Error::Validation(
            "referenced learning id must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn with_position(what: &str, index: usize, err: Error) -> Error {
    match err {
        Error::Validation(msg) => Error::Validation(format!("{what} #{index}: {msg}")),
        other => other,
    }
}
