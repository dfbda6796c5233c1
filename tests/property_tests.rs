//! Property-based tests for ranking and context rendering.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Rendered output never exceeds the token budget
//! - The footer reports the real included and total section counts
//! - Scores grow with confidence and with each matching signal
//! - Token estimation is `ceil(chars / 4)`

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{Duration, TimeZone, Utc};
use learngraph::{
    FormatOptions, KnowledgeContextFormatter, Learning, Mistake, NewLearning, NewMistake,
    NewPattern, Pattern, RankingContext, RelevanceRanker, estimate_tokens,
};
use proptest::prelude::*;

fn anchor() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
}

prop_compose! {
    fn arb_learning()(
        content in "[a-zA-Z0-9 .,`*_\n-]{1,120}",
        area in prop::option::of(prop::sample::select(vec!["API", "UI", "DB", "Auth"])),
        file in prop::option::of(prop::sample::select(vec!["src/a.rs", "src/b.rs", "lib/c.ts"])),
        issue in prop::option::of(1u32..20),
        confidence in 0.0f64..=1.0,
        age_days in 0i64..90,
    ) -> Learning {
        let mut learning = NewLearning::new(content);
        learning.code_area = area.map(str::to_string);
        learning.file_path = file.map(str::to_string);
        learning.source_issue = issue;
        learning
            .with_confidence(confidence)
            .with_created_at(anchor() - Duration::days(age_days))
            .into_learning(anchor())
    }
}

prop_compose! {
    fn arb_pattern()(
        name in "[a-zA-Z ]{1,30}",
        description in "[a-zA-Z0-9 .,\n]{1,100}",
    ) -> Pattern {
        NewPattern::new(name, description).into_pattern()
    }
}

prop_compose! {
    fn arb_mistake()(
        description in "[a-zA-Z0-9 .,]{1,80}",
        fix in "[a-zA-Z0-9 .,]{1,80}",
        file in prop::option::of(prop::sample::select(vec!["src/a.rs", "src/b.rs", "lib/c.ts"])),
    ) -> Mistake {
        let mut mistake = NewMistake::new(description, fix);
        mistake.file_path = file.map(str::to_string);
        mistake.into_mistake()
    }
}

fn arb_context() -> impl Strategy<Value = RankingContext> {
    (
        prop::option::of(1u32..20),
        prop::option::of(prop::sample::select(vec!["API", "UI", "DB", "Auth"])),
        prop::collection::vec(prop::sample::select(vec!["src/a.rs", "src/b.rs", "lib/c.ts"]), 0..3),
    )
        .prop_map(|(issue, area, files)| {
            let mut ctx = RankingContext::new().with_modified_files(files);
            ctx.issue_number = issue;
            ctx.primary_code_area = area.map(str::to_string);
            ctx
        })
}

fn formatter(max_tokens: usize, show_file_paths: bool, ctx: RankingContext) -> KnowledgeContextFormatter {
    KnowledgeContextFormatter::new(
        FormatOptions::default()
            .with_max_tokens(max_tokens)
            .with_show_file_paths(show_file_paths)
            .with_context(ctx),
    )
    .with_ranker(RelevanceRanker::at(anchor()))
}

/// Extracts `(shown, total)` from the "Showing X of Y sections" footer.
fn footer_counts(text: &str) -> Option<(usize, usize)> {
    let rest = &text[text.rfind("Showing ")? + "Showing ".len()..];
    let mut words = rest.split_whitespace();
    let shown = words.next()?.parse().ok()?;
    if words.next()? != "of" {
        return None;
    }
    let total = words.next()?.parse().ok()?;
    Some((shown, total))
}

proptest! {
    /// Property: output never exceeds the token budget, whatever the input.
    #[test]
    fn prop_budget_respected(
        learnings in prop::collection::vec(arb_learning(), 0..25),
        patterns in prop::collection::vec(arb_pattern(), 0..6),
        mistakes in prop::collection::vec(arb_mistake(), 0..6),
        ctx in arb_context(),
        max_tokens in 0usize..1500,
        show_file_paths in any::<bool>(),
    ) {
        let rendered = formatter(max_tokens, show_file_paths, ctx)
            .render(&learnings, &patterns, &mistakes);

        prop_assert!(estimate_tokens(&rendered.text) <= max_tokens);
        prop_assert!(rendered.tokens_used <= max_tokens);
        prop_assert_eq!(rendered.max_tokens, max_tokens);
    }

    /// Property: the footer matches the sections actually rendered.
    #[test]
    fn prop_footer_accurate(
        learnings in prop::collection::vec(arb_learning(), 0..25),
        patterns in prop::collection::vec(arb_pattern(), 0..6),
        mistakes in prop::collection::vec(arb_mistake(), 0..6),
        ctx in arb_context(),
        max_tokens in 60usize..3000,
    ) {
        let rendered = formatter(max_tokens, true, ctx)
            .render(&learnings, &patterns, &mistakes);

        prop_assert_eq!(
            rendered.included_sections.len() + rendered.omitted_sections.len(),
            rendered.total_sections
        );
        let (shown, total) = footer_counts(&rendered.text).expect("footer present");
        prop_assert_eq!(shown, rendered.included_sections.len());
        prop_assert_eq!(total, rendered.total_sections);

        for title in &rendered.included_sections {
            let heading = format!("## {title}\n");
            prop_assert!(rendered.text.contains(&heading));
        }
    }

    /// Property: empty input renders a non-empty digest within budget.
    #[test]
    fn prop_empty_input_renders(max_tokens in 1usize..500) {
        let rendered = formatter(max_tokens, true, RankingContext::new()).render(&[], &[], &[]);

        prop_assert!(!rendered.text.is_empty());
        prop_assert!(estimate_tokens(&rendered.text) <= max_tokens);
        prop_assert_eq!(rendered.total_sections, 0);
    }

    /// Property: raising confidence never lowers the score.
    #[test]
    fn prop_score_monotonic_in_confidence(
        learning in arb_learning(),
        ctx in arb_context(),
        bump in 0.0f64..=1.0,
    ) {
        let ranker = RelevanceRanker::at(anchor());
        let mut higher = learning.clone();
        higher.confidence = (learning.confidence + bump).min(1.0);

        prop_assert!(ranker.score(&higher, &ctx) >= ranker.score(&learning, &ctx));
    }

    /// Property: matching the session issue never lowers the score.
    #[test]
    fn prop_issue_match_never_lowers_score(learning in arb_learning(), issue in 1u32..20) {
        let ranker = RelevanceRanker::at(anchor());
        let ctx = RankingContext::new().with_issue_number(issue);
        let mut matching = learning.clone();
        matching.source_issue = Some(issue);

        prop_assert!(ranker.score(&matching, &ctx) >= ranker.score(&learning, &ctx));
    }

    /// Property: `rank` returns every input, sorted by descending score.
    #[test]
    fn prop_rank_sorted_and_complete(
        learnings in prop::collection::vec(arb_learning(), 0..30),
        ctx in arb_context(),
    ) {
        let ranker = RelevanceRanker::at(anchor());
        let ranked = ranker.rank(learnings.clone(), &ctx);

        prop_assert_eq!(ranked.len(), learnings.len());
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }

    /// Property: token estimate is the character count divided by four, rounded up.
    #[test]
    fn prop_estimate_tokens_is_ceil_quarter(text in "\\PC{0,400}") {
        let chars = text.chars().count();
        prop_assert_eq!(estimate_tokens(&text), chars.div_ceil(4));
    }
}
