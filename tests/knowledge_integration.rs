//! Integration tests for the knowledge graph.
//!
//! Each test gets its own database: either in-memory or a file inside a
//! fresh temporary directory.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use learngraph::hooks::{HookHandler, SessionEndHandler, SessionStartHandler};
use learngraph::{
    AsyncKnowledgeGraph, EntityId, EntityKind, Error, FormatOptions, KnowledgeGraph, Learning,
    NewLearning, NewMistake, NewPattern, QueryContext, RelationshipType, SessionQuery,
    format_knowledge_context,
};
use std::sync::Arc;
use tempfile::TempDir;

fn file_graph() -> (TempDir, KnowledgeGraph) {
    let dir = TempDir::new().expect("create temp dir");
    let graph = KnowledgeGraph::open_path(dir.path().join("knowledge.db")).expect("open graph");
    (dir, graph)
}

// ============================================================================
// Store and query
// ============================================================================

#[test]
fn test_zod_learning_end_to_end() {
    let (_dir, graph) = file_graph();

    graph
        .store(vec![
            NewLearning::new("Use Zod for validation")
                .with_code_area("API")
                .with_confidence(0.9),
        ])
        .unwrap();

    let results = graph
        .query(&QueryContext::new().with_code_area("API"))
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].learning.content, "Use Zod for validation");

    assert!(graph.patterns_for_area("API").unwrap().is_empty());

    let learnings: Vec<_> = results.into_iter().map(|r| r.learning).collect();
    let digest = format_knowledge_context(
        &learnings,
        &[],
        &[],
        &FormatOptions::default().with_max_tokens(2000),
    );
    assert!(digest.contains("Use Zod for validation"));
}

#[test]
fn test_code_areas_and_files_deduplicated_by_name() {
    let (_dir, graph) = file_graph();

    graph
        .store(vec![
            NewLearning::new("first")
                .with_code_area("API")
                .with_file_path("src/api.ts"),
            NewLearning::new("second")
                .with_code_area("API")
                .with_file_path("src/api.ts"),
        ])
        .unwrap();
    graph
        .store(vec![NewLearning::new("third").with_code_area("API")])
        .unwrap();
    graph
        .store_mistake(
            NewMistake::new("Forgot await", "Awaited the promise").with_file_path("src/api.ts"),
            None,
        )
        .unwrap();

    let stats = graph.stats().unwrap();
    assert_eq!(stats.entity_count(EntityKind::Learning), 3);
    assert_eq!(stats.entity_count(EntityKind::CodeArea), 1);
    assert_eq!(stats.entity_count(EntityKind::File), 1);
    assert_eq!(stats.relationship_count(RelationshipType::About), 3);
    assert_eq!(stats.relationship_count(RelationshipType::InFile), 3);
}

#[test]
fn test_failed_batch_leaves_graph_unchanged() {
    let (_dir, graph) = file_graph();
    graph
        .store(vec![NewLearning::new("existing").with_code_area("Core")])
        .unwrap();
    let before = graph.stats().unwrap();

    let result = graph.store(vec![
        NewLearning::new("would be fine").with_code_area("Other"),
        NewLearning::new("bad confidence").with_confidence(1.5),
    ]);
    assert!(matches!(result, Err(Error::Validation(_))));

    let after = graph.stats().unwrap();
    assert_eq!(before, after);
    assert!(
        graph
            .query(&QueryContext::new().with_code_area("Other"))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_stored_fields_round_trip() {
    let (_dir, graph) = file_graph();
    let expected = Learning {
        id: EntityId::new("learning-1"),
        content: "Batch writes inside one transaction".to_string(),
        code_area: Some("Storage".to_string()),
        file_path: Some("src/storage/mod.rs".to_string()),
        source_issue: Some(17),
        confidence: 0.75,
        created_at: chrono::Utc::now() - chrono::Duration::days(3),
    };

    let ids = graph
        .store(vec![
            NewLearning::new(expected.content.clone())
                .with_id(expected.id.clone())
                .with_code_area("Storage")
                .with_file_path("src/storage/mod.rs")
                .with_source_issue(17)
                .with_confidence(0.75)
                .with_created_at(expected.created_at),
        ])
        .unwrap();
    assert_eq!(ids, vec![expected.id.clone()]);

    let results = graph
        .query(&QueryContext::new().with_code_area("Storage"))
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].learning, expected);
}

#[test]
fn test_keyword_match_is_unicode_case_insensitive() {
    let (_dir, graph) = file_graph();
    graph
        .store(vec![
            NewLearning::new("Über-fast caching in Émile module"),
            NewLearning::new("Plain ASCII note"),
        ])
        .unwrap();

    for keyword in ["Émile", "ÉMILE", "über"] {
        let results = graph
            .query(&QueryContext::new().with_keyword(keyword))
            .unwrap();
        assert_eq!(results.len(), 1, "keyword {keyword}");
        assert_eq!(results[0].learning.content, "Über-fast caching in Émile module");
    }
}

#[test]
fn test_ids_are_not_shared_across_kinds() {
    let (_dir, graph) = file_graph();
    let ids = graph
        .store(vec![NewLearning::new("A"), NewLearning::new("B")])
        .unwrap();
    graph
        .store_pattern(NewPattern::new("P", "Pattern for A").with_id("shared"), &ids[..1])
        .unwrap();

    let clash = graph.store_mistake(
        NewMistake::new("Mistake for B", "Fixed").with_id("shared"),
        Some(&ids[1]),
    );
    assert!(clash.is_err());

    let b = graph.get_learning(&ids[1]).unwrap();
    assert!(b.related_patterns.is_empty());
    assert!(b.related_mistakes.is_empty());

    let a = graph.get_learning(&ids[0]).unwrap();
    assert_eq!(a.related_patterns.len(), 1);
    assert_eq!(a.related_patterns[0].name, "P");
}

#[test]
fn test_two_hop_traversal() {
    let (_dir, graph) = file_graph();

    let ids = graph
        .store(vec![
            NewLearning::new("Index foreign keys").with_code_area("DB"),
            NewLearning::new("Unrelated learning").with_code_area("DB"),
        ])
        .unwrap();
    let pattern = graph
        .store_pattern(
            NewPattern::new("Indexed joins", "Every join column gets an index").with_code_area("DB"),
            &ids[..1],
        )
        .unwrap();
    let mistake = graph
        .store_mistake(
            NewMistake::new("Slow join", "Added missing index").with_file_path("migrations/003.sql"),
            Some(&ids[0]),
        )
        .unwrap();

    let linked = graph.get_learning(&ids[0]).unwrap();
    assert_eq!(linked.related_patterns.len(), 1);
    assert_eq!(linked.related_patterns[0].id, pattern);
    assert_eq!(linked.related_mistakes.len(), 1);
    assert_eq!(linked.related_mistakes[0].id, mistake);

    let unlinked = graph.get_learning(&ids[1]).unwrap();
    assert!(unlinked.related_patterns.is_empty());
    assert!(unlinked.related_mistakes.is_empty());

    let by_area = graph.patterns_for_area("DB").unwrap();
    assert_eq!(by_area.len(), 1);
    assert_eq!(by_area[0].name, "Indexed joins");

    let by_file = graph.mistakes_for_file("migrations/003.sql").unwrap();
    assert_eq!(by_file.len(), 1);
    assert_eq!(by_file[0].how_fixed, "Added missing index");
}

#[test]
fn test_filters_combine_and_keywords_match_any() {
    let (_dir, graph) = file_graph();
    graph
        .store(vec![
            NewLearning::new("Cache tokens in memory")
                .with_code_area("Auth")
                .with_source_issue(5),
            NewLearning::new("Rotate refresh TOKENS weekly")
                .with_code_area("Auth")
                .with_source_issue(6),
            NewLearning::new("Sessions expire after an hour").with_code_area("Auth"),
            NewLearning::new("Tokens in the UI are masked").with_code_area("UI"),
        ])
        .unwrap();

    let by_keyword = graph
        .query(
            &QueryContext::new()
                .with_code_area("Auth")
                .with_keywords(["tokens", "expire"]),
        )
        .unwrap();
    assert_eq!(by_keyword.len(), 3);

    let by_issue = graph
        .query(
            &QueryContext::new()
                .with_code_area("Auth")
                .with_keyword("tokens")
                .with_issue_number(6),
        )
        .unwrap();
    assert_eq!(by_issue.len(), 1);
    assert_eq!(by_issue[0].learning.content, "Rotate refresh TOKENS weekly");

    let limited = graph.query(&QueryContext::new().with_limit(2)).unwrap();
    assert_eq!(limited.len(), 2);

    let none = graph
        .query(&QueryContext::new().with_code_area("Nowhere"))
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_get_unknown_learning_is_not_found() {
    let graph = KnowledgeGraph::in_memory().unwrap();
    let result = graph.get_learning(&EntityId::new("missing"));
    assert!(matches!(result, Err(Error::NotFound { kind: "learning", .. })));
}

#[test]
fn test_link_to_unknown_learning_fails_atomically() {
    let graph = KnowledgeGraph::in_memory().unwrap();

    let result = graph.store_pattern(
        NewPattern::new("Orphan", "Points nowhere").with_code_area("Core"),
        &[EntityId::new("ghost")],
    );
    assert!(result.is_err());

    let stats = graph.stats().unwrap();
    assert_eq!(stats.entity_count(EntityKind::Pattern), 0);
    assert_eq!(stats.entity_count(EntityKind::CodeArea), 0);
}

#[test]
fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("knowledge.db");

    {
        let graph = KnowledgeGraph::open_path(&path).unwrap();
        graph
            .store(vec![NewLearning::new("Persist me").with_code_area("Disk")])
            .unwrap();
    }

    let reopened = KnowledgeGraph::open_path(&path).unwrap();
    let results = reopened
        .query(&QueryContext::new().with_code_area("Disk"))
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].learning.content, "Persist me");
}

// ============================================================================
// Session context
// ============================================================================

#[test]
fn test_session_context_prioritizes_current_files() {
    let (_dir, graph) = file_graph();
    let ids = graph
        .store(vec![
            NewLearning::new("Prefer typed routes")
                .with_code_area("API")
                .with_source_issue(12)
                .with_confidence(0.6),
            NewLearning::new("Memoize selectors")
                .with_code_area("UI")
                .with_confidence(0.3),
        ])
        .unwrap();
    graph
        .store_mistake(
            NewMistake::new("Route param unparsed", "Parsed with schema")
                .with_file_path("src/routes.ts"),
            Some(&ids[0]),
        )
        .unwrap();

    let session = SessionQuery {
        issue_number: Some(12),
        code_area: Some("API".to_string()),
        modified_files: vec!["src/routes.ts".to_string()],
        ..SessionQuery::default()
    };
    let rendered = graph
        .build_session_context(&session, &FormatOptions::default())
        .unwrap();

    assert_eq!(rendered.included_sections[0], "Past Mistakes in Current Files");
    assert_eq!(rendered.included_sections[1], "API Learnings (current area)");
    assert!(rendered.omitted_sections.is_empty());
    assert!(rendered.text.starts_with("# Knowledge Context"));
    assert!(rendered.text.contains("**Route param unparsed** Fix: Parsed with schema"));
    assert!(rendered.text.contains("Showing 3 of 3 sections"));
    assert!(learngraph::estimate_tokens(&rendered.text) <= rendered.max_tokens);
}

#[test]
fn test_session_context_tight_budget() {
    let graph = KnowledgeGraph::in_memory().unwrap();
    graph
        .store(
            (0..20)
                .map(|i| {
                    NewLearning::new(format!("Learning number {i} with a fairly long body"))
                        .with_code_area(format!("Area{}", i % 5))
                })
                .collect(),
        )
        .unwrap();

    let rendered = graph
        .build_session_context(
            &SessionQuery::default(),
            &FormatOptions::default().with_max_tokens(60),
        )
        .unwrap();

    assert!(learngraph::estimate_tokens(&rendered.text) <= 60);
    assert_eq!(rendered.total_sections, 5);
    assert_eq!(
        rendered.included_sections.len() + rendered.omitted_sections.len(),
        rendered.total_sections
    );
    assert!(!rendered.omitted_sections.is_empty());
}

// ============================================================================
// Hooks
// ============================================================================

#[test]
fn test_session_end_then_session_start() {
    let (_dir, graph) = file_graph();
    let graph = Arc::new(graph);

    let end = SessionEndHandler::new(Arc::clone(&graph));
    let stored = end
        .handle(
            r#"{"issue_number": 9, "learnings": [
                {"content": "Run migrations before tests", "code_area": "DB"},
                {"content": "Seed fixtures per test", "code_area": "DB", "file_path": "tests/seed.rs"}
            ]}"#,
        )
        .unwrap();
    assert_eq!(stored, r#"{"stored":2}"#);

    let start = SessionStartHandler::new(Arc::clone(&graph));
    let output = start.handle(r#"{"code_area": "DB"}"#).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    let context = value["hookSpecificOutput"]["additionalContext"]
        .as_str()
        .unwrap();

    assert!(context.contains("DB Learnings (current area)"));
    assert!(context.contains("Run migrations before tests"));
    assert!(context.contains("Seed fixtures per test"));
}

// ============================================================================
// Async facade
// ============================================================================

#[test]
fn test_async_facade_over_file_store() {
    let (_dir, graph) = file_graph();
    let graph = AsyncKnowledgeGraph::new(graph);

    tokio_test::block_on(async {
        let ids = graph
            .store(vec![NewLearning::new("Async hosts share the store").with_code_area("Runtime")])
            .await
            .unwrap();
        graph
            .store_pattern(
                NewPattern::new("Blocking pool", "Run store calls off the reactor")
                    .with_code_area("Runtime"),
                ids.clone(),
            )
            .await
            .unwrap();

        let patterns = graph.patterns_for_area("Runtime".to_string()).await.unwrap();
        assert_eq!(patterns.len(), 1);

        let rendered = graph
            .build_session_context(
                SessionQuery {
                    code_area: Some("Runtime".to_string()),
                    ..SessionQuery::default()
                },
                FormatOptions::default(),
            )
            .await
            .unwrap();
        assert!(rendered.text.contains("**Blocking pool**: Run store calls off the reactor"));
    });
}
