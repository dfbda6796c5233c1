//! Budget-constrained knowledge digest.
//!
//! Turns ranked learnings, patterns, and mistakes into a markdown block that
//! never exceeds a token budget.
//!
//! # Layout
//!
//! ```text
//! # Knowledge Context
//!
//! ## Past Mistakes in Current Files      priority 1.0
//! ## <area> Learnings                    priority = best member score
//! ## Patterns                            priority 0.7
//! ## Mistakes to Avoid                   priority 0.6
//!
//! Showing X of Y sections (token budget: used/max)
//! ```
//!
//! Sections are walked in priority order and either included whole or
//! skipped; a skipped section does not stop the walk. The header and a
//! worst-case footer are reserved before any section is considered, so the
//! complete output satisfies `estimate_tokens(text) <= max_tokens`.

use crate::models::{Learning, Mistake, Pattern};
use crate::services::{LearningGroup, RankingContext, RelevanceRanker};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Default token budget.
pub const DEFAULT_MAX_TOKENS: usize = 2000;

/// Priority of the current-file mistakes section.
pub const CURRENT_FILE_MISTAKES_PRIORITY: f64 = 1.0;

/// Priority of the patterns section.
pub const PATTERNS_PRIORITY: f64 = 0.7;

/// Priority of the remaining-mistakes section.
pub const MISTAKES_TO_AVOID_PRIORITY: f64 = 0.6;

const HEADER: &str = "# Knowledge Context\n\n";
const EMPTY_PLACEHOLDER: &str = "_No relevant knowledge recorded yet._\n\n";

/// Estimates tokens as `ceil(chars / 4)`.
///
/// Characters are Unicode scalar values, not bytes.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Formatting options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Token ceiling for the whole output.
    pub max_tokens: usize,
    /// Render file paths next to entries.
    pub show_file_paths: bool,
    /// Session context used for ranking and section selection.
    #[serde(default)]
    pub context: RankingContext,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            show_file_paths: true,
            context: RankingContext::default(),
        }
    }
}

impl FormatOptions {
    /// Sets the token budget.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Toggles inline file paths.
    #[must_use]
    pub const fn with_show_file_paths(mut self, show: bool) -> Self {
        self.show_file_paths = show;
        self
    }

    /// Sets the ranking context.
    #[must_use]
    pub fn with_context(mut self, context: RankingContext) -> Self {
        self.context = context;
        self
    }
}

/// Rendered digest plus a report of what made it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedContext {
    /// The markdown output.
    pub text: String,
    /// Titles of included sections, in output order.
    pub included_sections: Vec<String>,
    /// Titles of sections skipped for budget, in priority order.
    pub omitted_sections: Vec<String>,
    /// Number of candidate sections.
    pub total_sections: usize,
    /// Tokens spent on the header and included sections.
    pub tokens_used: usize,
    /// The budget that was applied.
    pub max_tokens: usize,
}

struct Section {
    title: String,
    priority: f64,
    body: String,
}

impl Section {
    fn new(title: impl Into<String>, priority: f64, bullets: &[String]) -> Self {
        let title = title.into();
        let mut body = format!("## {title}\n");
        for bullet in bullets {
            let _ = writeln!(body, "- {bullet}");
        }
        body.push('\n');
        Self {
            title,
            priority,
            body,
        }
    }

    fn tokens(&self) -> usize {
        estimate_tokens(&self.body)
    }
}

/// Renders knowledge into a budget-bounded markdown digest.
///
/// Rendering never fails: short budgets and empty input degrade to smaller
/// output instead.
#[derive(Debug, Clone)]
pub struct KnowledgeContextFormatter {
    options: FormatOptions,
    ranker: RelevanceRanker,
}

impl KnowledgeContextFormatter {
    /// Creates a formatter ranking against the current time.
    #[must_use]
    pub fn new(options: FormatOptions) -> Self {
        Self {
            options,
            ranker: RelevanceRanker::new(),
        }
    }

    /// Replaces the ranker (e.g. one anchored at a fixed time).
    #[must_use]
    pub const fn with_ranker(mut self, ranker: RelevanceRanker) -> Self {
        self.ranker = ranker;
        self
    }

    /// Returns the options in use.
    #[must_use]
    pub const fn options(&self) -> &FormatOptions {
        &self.options
    }

    /// Renders the digest.
    #[must_use]
    pub fn render(
        &self,
        learnings: &[Learning],
        patterns: &[Pattern],
        mistakes: &[Mistake],
    ) -> FormattedContext {
        let mut sections = self.build_sections(learnings, patterns, mistakes);
        // Stable: equal priorities keep candidate order.
        sections.sort_by(|a, b| b.priority.total_cmp(&a.priority));

        let max_tokens = self.options.max_tokens;
        let total_sections = sections.len();
        let footer_reserve = estimate_tokens(&footer(
            total_sections,
            total_sections,
            max_tokens,
            max_tokens,
        ));

        let placeholder = if total_sections == 0 {
            EMPTY_PLACEHOLDER
        } else {
            ""
        };
        let with_header = format!("{HEADER}{placeholder}");

        let preamble = if estimate_tokens(&with_header) + footer_reserve <= max_tokens {
            Some(with_header)
        } else if estimate_tokens(placeholder) + footer_reserve <= max_tokens {
            Some(placeholder.to_string())
        } else {
            None
        };

        let Some(preamble) = preamble else {
            return Self::footer_only(sections, max_tokens);
        };

        let budget = max_tokens - footer_reserve;
        let mut used = estimate_tokens(&preamble);
        let mut text = preamble;
        let mut included_sections = Vec::new();
        let mut omitted_sections = Vec::new();

        for section in sections {
            let cost = section.tokens();
            if used + cost <= budget {
                used += cost;
                text.push_str(&section.body);
                included_sections.push(section.title);
            } else {
                omitted_sections.push(section.title);
            }
        }

        text.push_str(&footer(
            included_sections.len(),
            total_sections,
            used,
            max_tokens,
        ));

        if !omitted_sections.is_empty() {
            metrics::counter!("learngraph_sections_omitted_total")
                .increment(omitted_sections.len() as u64);
        }
        tracing::debug!(
            included = included_sections.len(),
            omitted = omitted_sections.len(),
            tokens_used = used,
            max_tokens,
            "Rendered knowledge context"
        );

        FormattedContext {
            text,
            included_sections,
            omitted_sections,
            total_sections,
            tokens_used: used,
            max_tokens,
        }
    }

    /// Budget too small for anything but the footer, possibly cut short.
    fn footer_only(sections: Vec<Section>, max_tokens: usize) -> FormattedContext {
        let total_sections = sections.len();
        let full = footer(0, total_sections, 0, max_tokens);
        let text = if estimate_tokens(&full) <= max_tokens {
            full
        } else {
            full.chars().take(max_tokens.saturating_mul(4)).collect()
        };

        tracing::debug!(max_tokens, "Token budget only fits the footer");
        if total_sections > 0 {
            metrics::counter!("learngraph_sections_omitted_total")
                .increment(total_sections as u64);
        }

        FormattedContext {
            text,
            included_sections: Vec::new(),
            omitted_sections: sections.into_iter().map(|s| s.title).collect(),
            total_sections,
            tokens_used: 0,
            max_tokens,
        }
    }

    fn build_sections(
        &self,
        learnings: &[Learning],
        patterns: &[Pattern],
        mistakes: &[Mistake],
    ) -> Vec<Section> {
        let ctx = &self.options.context;
        let mut sections = Vec::new();

        let (current, other): (Vec<&Mistake>, Vec<&Mistake>) = mistakes.iter().partition(|m| {
            m.file_path
                .as_deref()
                .is_some_and(|path| ctx.is_modified(path))
        });

        if !current.is_empty() {
            let bullets: Vec<_> = current.iter().map(|m| self.mistake_bullet(m)).collect();
            sections.push(Section::new(
                "Past Mistakes in Current Files",
                CURRENT_FILE_MISTAKES_PRIORITY,
                &bullets,
            ));
        }

        let ranked = self.ranker.rank(learnings.to_vec(), ctx);
        for group in RelevanceRanker::group_by_area(ranked) {
            let bullets: Vec<_> = group
                .members
                .iter()
                .map(|m| self.learning_bullet(&m.learning))
                .collect();
            sections.push(Section::new(
                group_title(&group, ctx),
                group.top_score(),
                &bullets,
            ));
        }

        if !patterns.is_empty() {
            let bullets: Vec<_> = patterns
                .iter()
                .map(|p| format!("**{}**: {}", single_line(&p.name), single_line(&p.description)))
                .collect();
            sections.push(Section::new("Patterns", PATTERNS_PRIORITY, &bullets));
        }

        if !other.is_empty() {
            let bullets: Vec<_> = other.iter().map(|m| self.mistake_bullet(m)).collect();
            sections.push(Section::new(
                "Mistakes to Avoid",
                MISTAKES_TO_AVOID_PRIORITY,
                &bullets,
            ));
        }

        sections
    }

    fn learning_bullet(&self, learning: &Learning) -> String {
        let mut bullet = single_line(&learning.content);
        self.append_path(&mut bullet, learning.file_path.as_deref());
        bullet
    }

    fn mistake_bullet(&self, mistake: &Mistake) -> String {
        let mut bullet = format!(
            "**{}** Fix: {}",
            single_line(&mistake.description),
            single_line(&mistake.how_fixed)
        );
        self.append_path(&mut bullet, mistake.file_path.as_deref());
        bullet
    }

    fn append_path(&self, bullet: &mut String, path: Option<&str>) {
        if self.options.show_file_paths
            && let Some(path) = path
        {
            let _ = write!(bullet, " (`{path}`)");
        }
    }
}

/// Renders the digest with default ranking time and returns only the text.
#[must_use]
pub fn format_knowledge_context(
    learnings: &[Learning],
    patterns: &[Pattern],
    mistakes: &[Mistake],
    options: &FormatOptions,
) -> String {
    KnowledgeContextFormatter::new(options.clone())
        .render(learnings, patterns, mistakes)
        .text
}

fn footer(shown: usize, total: usize, used: usize, max_tokens: usize) -> String {
    format!("Showing {shown} of {total} sections (token budget: {used}/{max_tokens})")
}

fn group_title(group: &LearningGroup, ctx: &RankingContext) -> String {
    match group.code_area.as_deref() {
        Some(area) if ctx.primary_code_area.as_deref() == Some(area) => {
            format!("{area} Learnings (current area)")
        },
        Some(area) => format!("{area} Learnings"),
        None => "General Learnings".to_string(),
    }
}

fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
