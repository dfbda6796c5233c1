//! `SQLite` entity store for the knowledge graph.
//!
//! Provides durable keyed storage for the five entity kinds plus typed,
//! append-only relationship edges. All access goes through a closure that
//! receives an [`EntityTx`]: writes run inside one IMMEDIATE transaction that
//! commits only if the closure returns `Ok`, reads run inside a deferred
//! transaction so they see a single consistent snapshot.

// SQLite returns i64 counts; they are non-negative and small.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::redundant_closure_for_method_calls)]

use super::connection::{LOWER_FN, acquire_lock, configure_connection};
use super::metrics::{record_operation_metrics, status_label};
use super::rows::{
    format_timestamp, parse_code_area_row, parse_file_row, parse_learning_row,
    parse_mistake_row, parse_pattern_row, parse_relationship_row,
};
use super::schema::migrate;
use crate::models::{
    CodeArea, EdgeId, Entity, EntityId, EntityKind, FileNode, GraphStats, Learning, Mistake,
    Pattern, QueryContext, Relationship, RelationshipType,
};
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::instrument;

/// `SQLite`-backed entity store.
///
/// # Concurrency Model
///
/// A single `Mutex<Connection>` serializes callers within one process. Write
/// batches use IMMEDIATE transactions so the natural-key lookup and the
/// conditional insert that follows it cannot interleave with another writer;
/// the `UNIQUE` constraints on `code_areas.name` and `files.path` back this up
/// across processes.
///
/// # Schema
///
/// - `learnings`, `patterns`, `mistakes`: id-keyed entities
/// - `code_areas`, `files`: natural-key entities
/// - `relationships`: typed directed edges `(kind, from_id, to_id)`
pub struct EntityStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl EntityStore {
    /// Opens (or creates) a store at the given path.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file cannot be opened or migrated.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::storage("create_store_dir", format!("{}: {e}", parent.display())))?;
        }

        let conn = Connection::open(&db_path)
            .map_err(|e| Error::storage("open_store", format!("{}: {e}", db_path.display())))?;
        let store = Self::initialize(conn, Some(db_path))?;
        tracing::debug!(path = ?store.db_path, "Opened knowledge store");
        Ok(store)
    }

    /// Creates a disposable in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| Error::storage("open_store_memory", e))?;
        Self::initialize(conn, None)
    }

    fn initialize(mut conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        configure_connection(&conn)?;
        migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Returns the database path (`None` for in-memory stores).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Runs `f` inside a single write transaction.
    ///
    /// Commits when `f` returns `Ok`; otherwise every write made by `f` is
    /// rolled back and the error is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or [`Error::Storage`] if the transaction
    /// cannot begin or commit.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&EntityTx<'_>) -> Result<T>,
    {
        let start = Instant::now();
        let mut conn = acquire_lock(&self.conn);

        let result = (|| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| Error::storage("begin_write", e))?;
            let value = f(&EntityTx { conn: &tx })?;
            tx.commit().map_err(|e| Error::storage("commit_write", e))?;
            Ok(value)
        })();

        record_operation_metrics("write", start, status_label(&result));
        result
    }

    /// Runs `f` inside a read transaction over a consistent snapshot.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or [`Error::Storage`] if the transaction
    /// cannot begin.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&EntityTx<'_>) -> Result<T>,
    {
        let start = Instant::now();
        let mut conn = acquire_lock(&self.conn);

        let result = (|| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Deferred)
                .map_err(|e| Error::storage("begin_read", e))?;
            // Dropping the transaction ends it; nothing was written.
            f(&EntityTx { conn: &tx })
        })();

        record_operation_metrics("read", start, status_label(&result));
        result
    }

    /// Returns entity and edge counts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the counts cannot be read.
    pub fn stats(&self) -> Result<GraphStats> {
        self.read(|tx| tx.stats())
    }
}

/// Entity and edge operations scoped to one open transaction.
pub struct EntityTx<'a> {
    conn: &'a Connection,
}

impl EntityTx<'_> {
    // ========================================================================
    // Entity writes
    // ========================================================================

    /// Stores an entity and returns its id.
    ///
    /// - `CodeArea` / `File`: looks up the natural key first and returns the
    ///   existing id if present; inserts only when absent.
    /// - `Learning` / `Pattern` / `Mistake`: inserts by id; an id that already
    ///   exists leaves the stored row untouched.
    ///
    /// Ids are unique across kinds: an id already held by an entity of
    /// another kind is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if a statement fails, a constraint is
    /// violated, or the id belongs to another kind.
    #[instrument(skip(self, entity), fields(kind = %entity.kind(), entity_id = %entity.id()))]
    pub fn upsert_entity(&self, entity: &Entity) -> Result<EntityId> {
        match entity {
            Entity::CodeArea(area) => self.upsert_natural(EntityKind::CodeArea, &area.name, &area.id),
            Entity::File(file) => self.upsert_natural(EntityKind::File, &file.path, &file.id),
            Entity::Learning(learning) => self.insert_learning(learning),
            Entity::Pattern(pattern) => self.insert_pattern(pattern),
            Entity::Mistake(mistake) => self.insert_mistake(mistake),
        }
    }

    /// Returns the id of the code area named `name`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the lookup or insert fails.
    pub fn upsert_code_area(&self, name: &str) -> Result<EntityId> {
        self.upsert_natural(EntityKind::CodeArea, name, &EntityId::generate())
    }

    /// Returns the id of the file at `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the lookup or insert fails.
    pub fn upsert_file(&self, path: &str) -> Result<EntityId> {
        self.upsert_natural(EntityKind::File, path, &EntityId::generate())
    }

    fn upsert_natural(&self, kind: EntityKind, key: &str, new_id: &EntityId) -> Result<EntityId> {
        let (table, column) = natural_key_table(kind)?;

        let existing: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT id FROM {table} WHERE {column} = ?1"),
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::storage("lookup_natural_key", e))?;

        if let Some(id) = existing {
            return Ok(EntityId::new(id));
        }

        self.ensure_id_unclaimed(kind, new_id)?;
        self.conn
            .execute(
                &format!("INSERT INTO {table} (id, {column}) VALUES (?1, ?2)"),
                params![new_id.as_str(), key],
            )
            .map_err(|e| Error::storage("insert_natural_key", e))?;

        metrics::counter!("learngraph_entities_created_total", "kind" => kind.as_str())
            .increment(1);
        tracing::debug!(kind = %kind, key, id = %new_id, "Created natural-key entity");
        Ok(new_id.clone())
    }

    fn insert_learning(&self, learning: &Learning) -> Result<EntityId> {
        self.ensure_id_unclaimed(EntityKind::Learning, &learning.id)?;
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO learnings (
                    id, content, code_area, file_path, source_issue, confidence, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    learning.id.as_str(),
                    learning.content,
                    learning.code_area,
                    learning.file_path,
                    learning.source_issue,
                    learning.confidence,
                    format_timestamp(&learning.created_at),
                ],
            )
            .map_err(|e| Error::storage("insert_learning", e))?;

        Self::note_insert(EntityKind::Learning, &learning.id, inserted);
        Ok(learning.id.clone())
    }

    fn insert_pattern(&self, pattern: &Pattern) -> Result<EntityId> {
        self.ensure_id_unclaimed(EntityKind::Pattern, &pattern.id)?;
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO patterns (id, name, description, code_area)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    pattern.id.as_str(),
                    pattern.name,
                    pattern.description,
                    pattern.code_area,
                ],
            )
            .map_err(|e| Error::storage("insert_pattern", e))?;

        Self::note_insert(EntityKind::Pattern, &pattern.id, inserted);
        Ok(pattern.id.clone())
    }

    fn insert_mistake(&self, mistake: &Mistake) -> Result<EntityId> {
        self.ensure_id_unclaimed(EntityKind::Mistake, &mistake.id)?;
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO mistakes (id, description, how_fixed, file_path)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    mistake.id.as_str(),
                    mistake.description,
                    mistake.how_fixed,
                    mistake.file_path,
                ],
            )
            .map_err(|e| Error::storage("insert_mistake", e))?;

        Self::note_insert(EntityKind::Mistake, &mistake.id, inserted);
        Ok(mistake.id.clone())
    }

    /// Fails if `id` is already taken by an entity of another kind.
    ///
    /// Ids are unique across all tables, so an edge endpoint always names
    /// exactly one entity.
    fn ensure_id_unclaimed(&self, kind: EntityKind, id: &EntityId) -> Result<()> {
        for other in EntityKind::all().iter().filter(|other| **other != kind) {
            if self.exists(*other, id)? {
                return Err(Error::storage(
                    "claim_id",
                    format!("id '{id}' already belongs to a {other}, cannot reuse it for a {kind}"),
                ));
            }
        }
        Ok(())
    }

    fn note_insert(kind: EntityKind, id: &EntityId, rows: usize) {
        if rows == 0 {
            tracing::debug!(kind = %kind, id = %id, "Entity already stored, row left unchanged");
        } else {
            metrics::counter!("learngraph_entities_created_total", "kind" => kind.as_str())
                .increment(1);
        }
    }

    /// Appends a typed edge and returns its id.
    ///
    /// Both endpoints must already exist with a kind the relationship type
    /// permits at that end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if an endpoint is missing or of the wrong
    /// kind, or if the insert fails.
    #[instrument(skip(self), fields(kind = %kind, from = %from, to = %to))]
    pub fn insert_edge(
        &self,
        kind: RelationshipType,
        from: &EntityId,
        to: &EntityId,
    ) -> Result<EdgeId> {
        if !self.exists_as_any(from, kind.source_kinds())? {
            return Err(Error::storage(
                "insert_edge",
                format!("{kind} source '{from}' does not exist"),
            ));
        }
        if !self.exists_as_any(to, kind.target_kinds())? {
            return Err(Error::storage(
                "insert_edge",
                format!("{kind} target '{to}' does not exist"),
            ));
        }

        self.conn
            .execute(
                "INSERT INTO relationships (kind, from_id, to_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    kind.as_str(),
                    from.as_str(),
                    to.as_str(),
                    format_timestamp(&Utc::now()),
                ],
            )
            .map_err(|e| Error::storage("insert_edge", e))?;

        metrics::counter!("learngraph_relationships_created_total", "kind" => kind.as_str())
            .increment(1);
        Ok(EdgeId::new(self.conn.last_insert_rowid()))
    }

    fn exists_as_any(&self, id: &EntityId, kinds: &[EntityKind]) -> Result<bool> {
        for kind in kinds {
            if self.exists(*kind, id)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns `true` if an entity of `kind` with this id exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the lookup fails.
    pub fn exists(&self, kind: EntityKind, id: &EntityId) -> Result<bool> {
        let table = entity_table(kind);
        self.conn
            .query_row(
                &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"),
                params![id.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| Error::storage("entity_exists", e))
    }

    // ========================================================================
    // Entity reads
    // ========================================================================

    /// Loads an entity by kind and id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the lookup fails.
    pub fn get_by_id(&self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>> {
        let sql = format!("SELECT * FROM {} WHERE id = ?1", entity_table(kind));
        self.conn
            .query_row(&sql, params![id.as_str()], |row| parse_entity(kind, row))
            .optional()
            .map_err(|e| Error::storage("get_by_id", e))
    }

    /// Loads a `CodeArea` by name or a `File` by path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for kinds without a natural key, or
    /// [`Error::Storage`] if the lookup fails.
    pub fn get_by_natural_key(&self, kind: EntityKind, key: &str) -> Result<Option<Entity>> {
        let (table, column) = natural_key_table(kind)?;
        let sql = format!("SELECT * FROM {table} WHERE {column} = ?1");
        self.conn
            .query_row(&sql, params![key], |row| parse_entity(kind, row))
            .optional()
            .map_err(|e| Error::storage("get_by_natural_key", e))
    }

    /// Loads a learning by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the lookup fails.
    pub fn get_learning(&self, id: &EntityId) -> Result<Option<Learning>> {
        self.conn
            .query_row(
                "SELECT * FROM learnings WHERE id = ?1",
                params![id.as_str()],
                parse_learning_row,
            )
            .optional()
            .map_err(|e| Error::storage("get_learning", e))
    }

    // ========================================================================
    // Query helpers
    // ========================================================================

    /// Returns learnings matching every present filter, in storage order.
    ///
    /// `code_area` and `file_path` match through `ABOUT` / `IN_FILE` edges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the query fails.
    pub fn find_learnings(&self, ctx: &QueryContext) -> Result<Vec<Learning>> {
        let (where_clause, mut params) = build_learning_where_clause(ctx);
        let limit_clause = match ctx.limit {
            Some(limit) => {
                params.push(Box::new(i64::try_from(limit).unwrap_or(i64::MAX)));
                format!(" LIMIT ?{}", params.len())
            },
            None => String::new(),
        };
        let sql =
            format!("SELECT l.* FROM learnings l {where_clause} ORDER BY l.rowid{limit_clause}");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::storage("find_learnings_prepare", e))?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        stmt.query_map(param_refs.as_slice(), parse_learning_row)
            .and_then(|rows| rows.collect())
            .map_err(|e| Error::storage("find_learnings", e))
    }

    /// Patterns with a `LED_TO` edge into the learning, de-duplicated, in edge order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the query fails.
    pub fn patterns_leading_to(&self, learning_id: &EntityId) -> Result<Vec<Pattern>> {
        let patterns = self.collect_rows(
            "patterns_leading_to",
            "SELECT p.* FROM relationships r
             JOIN patterns p ON p.id = r.from_id
             WHERE r.kind = 'LED_TO' AND r.to_id = ?1
             ORDER BY r.id",
            learning_id.as_str(),
            parse_pattern_row,
        )?;
        Ok(dedup_by_id(patterns, |p| &p.id))
    }

    /// Mistakes with a `LED_TO` edge into the learning, de-duplicated, in edge order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the query fails.
    pub fn mistakes_leading_to(&self, learning_id: &EntityId) -> Result<Vec<Mistake>> {
        let mistakes = self.collect_rows(
            "mistakes_leading_to",
            "SELECT m.* FROM relationships r
             JOIN mistakes m ON m.id = r.from_id
             WHERE r.kind = 'LED_TO' AND r.to_id = ?1
             ORDER BY r.id",
            learning_id.as_str(),
            parse_mistake_row,
        )?;
        Ok(dedup_by_id(mistakes, |m| &m.id))
    }

    /// Mistakes joined via `IN_FILE` to the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the query fails.
    pub fn mistakes_in_file(&self, path: &str) -> Result<Vec<Mistake>> {
        let mistakes = self.collect_rows(
            "mistakes_in_file",
            "SELECT m.* FROM files f
             JOIN relationships r ON r.to_id = f.id AND r.kind = 'IN_FILE'
             JOIN mistakes m ON m.id = r.from_id
             WHERE f.path = ?1
             ORDER BY r.id",
            path,
            parse_mistake_row,
        )?;
        Ok(dedup_by_id(mistakes, |m| &m.id))
    }

    /// Patterns joined via `APPLIES_TO` to the code area named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the query fails.
    pub fn patterns_for_area(&self, name: &str) -> Result<Vec<Pattern>> {
        let patterns = self.collect_rows(
            "patterns_for_area",
            "SELECT p.* FROM code_areas a
             JOIN relationships r ON r.to_id = a.id AND r.kind = 'APPLIES_TO'
             JOIN patterns p ON p.id = r.from_id
             WHERE a.name = ?1
             ORDER BY r.id",
            name,
            parse_pattern_row,
        )?;
        Ok(dedup_by_id(patterns, |p| &p.id))
    }

    /// All edges leaving or entering an entity, in write order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the query fails.
    pub fn edges_touching(&self, id: &EntityId) -> Result<Vec<Relationship>> {
        self.collect_rows(
            "edges_touching",
            "SELECT * FROM relationships WHERE from_id = ?1 OR to_id = ?1 ORDER BY id",
            id.as_str(),
            parse_relationship_row,
        )
    }

    /// Counts entities per kind and edges per type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if a count fails.
    pub fn stats(&self) -> Result<GraphStats> {
        let mut stats = GraphStats::default();

        for kind in EntityKind::all() {
            let count: i64 = self
                .conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {}", entity_table(*kind)),
                    [],
                    |row| row.get(0),
                )
                .map_err(|e| Error::storage("stats_entities", e))?;
            stats.entities.insert(*kind, count as usize);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT kind, COUNT(*) FROM relationships GROUP BY kind")
            .map_err(|e| Error::storage("stats_relationships_prepare", e))?;
        let rows: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .and_then(|rows| rows.collect())
            .map_err(|e| Error::storage("stats_relationships", e))?;

        for (kind, count) in rows {
            if let Some(kind) = RelationshipType::parse(&kind) {
                stats.relationships.insert(kind, count as usize);
            }
        }

        Ok(stats)
    }

    fn collect_rows<T>(
        &self,
        operation: &str,
        sql: &str,
        key: &str,
        parse: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let mut stmt = self
            .conn
            .prepare_cached(sql)
            .map_err(|e| Error::storage(operation, e))?;
        stmt.query_map(params![key], parse)
            .and_then(|rows| rows.collect())
            .map_err(|e| Error::storage(operation, e))
    }
}

/// Table holding entities of `kind`.
const fn entity_table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Learning => "learnings",
        EntityKind::Pattern => "patterns",
        EntityKind::Mistake => "mistakes",
        EntityKind::CodeArea => "code_areas",
        EntityKind::File => "files",
    }
}

/// Table and natural-key column for deduplicated kinds.
fn natural_key_table(kind: EntityKind) -> Result<(&'static str, &'static str)> {
    match kind {
        EntityKind::CodeArea => Ok(("code_areas", "name")),
        EntityKind::File => Ok(("files", "path")),
        EntityKind::Learning | EntityKind::Pattern | EntityKind::Mistake => Err(
            Error::Validation(format!("{kind} entities have no natural key")),
        ),
    }
}

fn parse_entity(kind: EntityKind, row: &Row<'_>) -> rusqlite::Result<Entity> {
    Ok(match kind {
        EntityKind::Learning => Entity::Learning(parse_learning_row(row)?),
        EntityKind::Pattern => Entity::Pattern(parse_pattern_row(row)?),
        EntityKind::Mistake => Entity::Mistake(parse_mistake_row(row)?),
        EntityKind::CodeArea => Entity::CodeArea(parse_code_area_row(row)?),
        EntityKind::File => Entity::File(parse_file_row(row)?),
    })
}

/// Builds the WHERE clause for learning queries with numbered parameters.
fn build_learning_where_clause(ctx: &QueryContext) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref area) = ctx.code_area {
        params.push(Box::new(area.clone()));
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM relationships r JOIN code_areas a ON a.id = r.to_id
                     WHERE r.kind = 'ABOUT' AND r.from_id = l.id AND a.name = ?{})",
            params.len()
        ));
    }

    if let Some(ref path) = ctx.file_path {
        params.push(Box::new(path.clone()));
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM relationships r JOIN files f ON f.id = r.to_id
                     WHERE r.kind = 'IN_FILE' AND r.from_id = l.id AND f.path = ?{})",
            params.len()
        ));
    }

    let keyword_conditions: Vec<String> = ctx
        .effective_keywords()
        .map(|keyword| {
            params.push(Box::new(keyword.to_lowercase()));
            format!("instr({LOWER_FN}(l.content), ?{}) > 0", params.len())
        })
        .collect();
    if !keyword_conditions.is_empty() {
        conditions.push(format!("({})", keyword_conditions.join(" OR ")));
    }

    if let Some(issue) = ctx.issue_number {
        params.push(Box::new(issue));
        conditions.push(format!("l.source_issue = ?{}", params.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, params)
}

/// Keeps the first occurrence of each id, preserving order.
fn dedup_by_id<T>(items: Vec<T>, id: impl Fn(&T) -> &EntityId) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(id(item).clone()))
        .collect()
}
