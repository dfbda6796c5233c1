//! Benchmarks for ranking and context rendering.
//!
//! Covers the session-start path:
//! - Ranking and grouping learnings by code area
//! - Rendering the budgeted digest
//! - Building the full session context from a file-backed graph

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tempfile::TempDir;

use learngraph::{
    FormatOptions, KnowledgeContextFormatter, KnowledgeGraph, Learning, NewLearning, NewMistake,
    RankingContext, RelevanceRanker, SessionQuery,
};

// ============================================================================
// Helper Functions
// ============================================================================

const AREAS: [&str; 6] = ["API", "UI", "DB", "Auth", "Build", "Infra"];

fn new_learnings(count: usize) -> Vec<NewLearning> {
    (0..count)
        .map(|i| {
            NewLearning::new(format!(
                "Learning {i}: prefer explicit error propagation in handler {i}"
            ))
            .with_code_area(AREAS[i % AREAS.len()])
            .with_file_path(format!("src/module_{}.rs", i % 40))
            .with_source_issue(u32::try_from(i % 25).unwrap())
            .with_confidence((i % 10) as f64 / 10.0)
        })
        .collect()
}

fn learnings(count: usize) -> Vec<Learning> {
    let now = chrono::Utc::now();
    new_learnings(count)
        .into_iter()
        .map(|l| l.into_learning(now))
        .collect()
}

fn context() -> RankingContext {
    RankingContext::new()
        .with_issue_number(7)
        .with_primary_code_area("API")
        .with_modified_files(["src/module_3.rs", "src/module_11.rs"])
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    let ranker = RelevanceRanker::new();
    let ctx = context();

    for count in [100, 1_000, 10_000] {
        let input = learnings(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &input, |b, input| {
            b.iter(|| {
                let ranked = ranker.rank(input.clone(), &ctx);
                black_box(RelevanceRanker::group_by_area(ranked))
            });
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let input = learnings(500);

    for max_tokens in [200, 2_000, 20_000] {
        let formatter = KnowledgeContextFormatter::new(
            FormatOptions::default()
                .with_max_tokens(max_tokens)
                .with_context(context()),
        );
        group.bench_with_input(
            BenchmarkId::from_parameter(max_tokens),
            &input,
            |b, input| {
                b.iter(|| black_box(formatter.render(input, &[], &[])));
            },
        );
    }
    group.finish();
}

fn bench_session_context(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_context");
    group.sample_size(20);

    for count in [100, 1_000] {
        let dir = TempDir::new().unwrap();
        let graph = KnowledgeGraph::open_path(dir.path().join("bench.db")).unwrap();
        let ids = graph.store(new_learnings(count)).unwrap();
        for (i, id) in ids.iter().enumerate().step_by(10) {
            graph
                .store_mistake(
                    NewMistake::new(format!("Mistake {i}"), "Propagated the error")
                        .with_file_path(format!("src/module_{}.rs", i % 40)),
                    Some(id),
                )
                .unwrap();
        }

        let session = SessionQuery {
            issue_number: Some(7),
            code_area: Some("API".to_string()),
            modified_files: vec!["src/module_3.rs".to_string()],
            limit: Some(50),
            ..SessionQuery::default()
        };
        let options = FormatOptions::default();

        group.bench_function(BenchmarkId::from_parameter(count), |b| {
            b.iter(|| black_box(graph.build_session_context(&session, &options).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rank, bench_render, bench_session_context);
criterion_main!(benches);
