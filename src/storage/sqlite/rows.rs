//! Row conversion for knowledge graph tables.

use crate::models::{
    CodeArea, EdgeId, EntityId, FileNode, Learning, Mistake, Pattern, Relationship,
    RelationshipType,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

/// Formats a timestamp for storage. Nanosecond precision keeps round-trips exact.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Reads an RFC 3339 timestamp column.
fn timestamp_column(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| {
            let idx = row.as_ref().column_index(column).unwrap_or(0);
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
        })
}

/// Parses a `learnings` row.
pub fn parse_learning_row(row: &Row<'_>) -> rusqlite::Result<Learning> {
    Ok(Learning {
        id: EntityId::new(row.get::<_, String>("id")?),
        content: row.get("content")?,
        code_area: row.get("code_area")?,
        file_path: row.get("file_path")?,
        source_issue: row.get("source_issue")?,
        confidence: row.get("confidence")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

/// Parses a `patterns` row.
pub fn parse_pattern_row(row: &Row<'_>) -> rusqlite::Result<Pattern> {
    Ok(Pattern {
        id: EntityId::new(row.get::<_, String>("id")?),
        name: row.get("name")?,
        description: row.get("description")?,
        code_area: row.get("code_area")?,
    })
}

/// Parses a `mistakes` row.
pub fn parse_mistake_row(row: &Row<'_>) -> rusqlite::Result<Mistake> {
    Ok(Mistake {
        id: EntityId::new(row.get::<_, String>("id")?),
        description: row.get("description")?,
        how_fixed: row.get("how_fixed")?,
        file_path: row.get("file_path")?,
    })
}

/// Parses a `code_areas` row.
pub fn parse_code_area_row(row: &Row<'_>) -> rusqlite::Result<CodeArea> {
    Ok(CodeArea {
        id: EntityId::new(row.get::<_, String>("id")?),
        name: row.get("name")?,
    })
}

/// Parses a `files` row.
pub fn parse_file_row(row: &Row<'_>) -> rusqlite::Result<FileNode> {
    Ok(FileNode {
        id: EntityId::new(row.get::<_, String>("id")?),
        path: row.get("path")?,
    })
}

/// Parses a `relationships` row.
pub fn parse_relationship_row(row: &Row<'_>) -> rusqlite::Result<Relationship> {
    let kind_str: String = row.get("kind")?;
    let kind = RelationshipType::parse(&kind_str).ok_or_else(|| {
        let idx = row.as_ref().column_index("kind").unwrap_or(0);
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown relationship type '{kind_str}'").into(),
        )
    })?;

    Ok(Relationship {
        id: EdgeId::new(row.get("id")?),
        kind,
        from_id: EntityId::new(row.get::<_, String>("from_id")?),
        to_id: EntityId::new(row.get::<_, String>("to_id")?),
        created_at: timestamp_column(row, "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rusqlite::Connection;

    #[test]
    fn test_timestamp_roundtrip_keeps_nanos() {
        let at = Utc.timestamp_opt(1_760_000_000, 123_456_789).unwrap();
        let conn = Connection::open_in_memory().unwrap();
        let parsed = conn
            .query_row(
                "SELECT ?1 AS created_at",
                [format_timestamp(&at)],
                |row| timestamp_column(row, "created_at"),
            )
            .unwrap();
        assert_eq!(parsed, at);
    }

    #[test]
    fn test_bad_timestamp_is_conversion_error() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.query_row("SELECT 'yesterday' AS created_at", [], |row| {
            timestamp_column(row, "created_at")
        });
        assert!(matches!(
            result,
            Err(rusqlite::Error::FromSqlConversionFailure(_, Type::Text, _))
        ));
    }
}
