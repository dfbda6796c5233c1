//! Binary entry point for learngraph.
//!
//! This binary provides the CLI interface for manual inspection of the
//! knowledge graph and the session hook commands.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use learngraph::hooks::{HookHandler, SessionEndHandler, SessionStartHandler};
use learngraph::models::EntityKind;
use learngraph::{
    EntityId, FormatOptions, KnowledgeGraph, KnowledgeResult, LearngraphConfig, NewLearning,
    NewMistake, NewPattern, QueryContext, RelationshipType, SessionQuery, observability,
};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Learngraph - cross-session knowledge for coding agents.
#[derive(Parser)]
#[command(name = "learngraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the knowledge database (overrides config).
    #[arg(long, global = true, env = "LEARNGRAPH_DB_PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Record a learning.
    Store {
        /// What was learned.
        content: String,

        /// Code area.
        #[arg(short, long)]
        area: Option<String>,

        /// File path.
        #[arg(short, long)]
        file: Option<String>,

        /// Source issue number.
        #[arg(short, long)]
        issue: Option<u32>,

        /// Confidence in [0, 1].
        #[arg(long)]
        confidence: Option<f64>,
    },

    /// Record a pattern.
    Pattern {
        /// Pattern name.
        name: String,

        /// What the pattern prescribes.
        description: String,

        /// Code area the pattern applies to.
        #[arg(short, long)]
        area: Option<String>,

        /// Learning the pattern was derived from (repeatable).
        #[arg(short, long = "learning")]
        learnings: Vec<String>,
    },

    /// Record a mistake and its fix.
    Mistake {
        /// What went wrong.
        description: String,

        /// How it was fixed.
        #[arg(long)]
        fix: String,

        /// File the mistake was in.
        #[arg(short, long)]
        file: Option<String>,

        /// Learning the mistake led to.
        #[arg(short, long)]
        learning: Option<String>,
    },

    /// Query learnings.
    Query {
        /// Code area filter.
        #[arg(short, long)]
        area: Option<String>,

        /// File path filter.
        #[arg(short, long)]
        file: Option<String>,

        /// Keyword (repeatable, any match).
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,

        /// Source issue filter.
        #[arg(short, long)]
        issue: Option<u32>,

        /// Maximum results.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// List mistakes recorded against a file.
    Mistakes {
        /// File path.
        path: String,
    },

    /// List patterns for a code area.
    Patterns {
        /// Code area name.
        area: String,
    },

    /// Show one learning with related patterns and mistakes.
    Show {
        /// Learning id.
        id: String,
    },

    /// Render the session context digest.
    Context {
        /// Primary code area.
        #[arg(short, long)]
        area: Option<String>,

        /// Current issue number.
        #[arg(short, long)]
        issue: Option<u32>,

        /// Modified file (repeatable).
        #[arg(short, long = "modified")]
        modified_files: Vec<String>,

        /// Keyword (repeatable).
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,

        /// Maximum learnings considered.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Token budget (defaults to config).
        #[arg(long)]
        max_tokens: Option<usize>,
    },

    /// Show entity and relationship counts.
    Stats,

    /// Handle a session hook event (payload on stdin).
    Hook {
        /// Hook event.
        #[command(subcommand)]
        event: HookEvent,
    },
}

/// Hook events.
#[derive(Subcommand, Clone, Copy)]
enum HookEvent {
    /// Inject knowledge at session start.
    SessionStart,
    /// Record learnings at session end.
    SessionEnd,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = match LearngraphConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };
    if let Some(db) = cli.db.clone() {
        config.db_path = Some(db);
    }

    if let Err(e) = observability::init_from_settings(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: &LearngraphConfig) -> anyhow::Result<()> {
    let open = || {
        KnowledgeGraph::open(config)
            .with_context(|| format!("opening {}", config.db_path().display()))
    };

    match cli.command {
        Commands::Store {
            content,
            area,
            file,
            issue,
            confidence,
        } => {
            let graph = open()?;
            let learning = NewLearning {
                code_area: area,
                file_path: file,
                source_issue: issue,
                confidence,
                ..NewLearning::new(content)
            };
            let ids = graph.store(vec![learning])?;
            for id in ids {
                println!("{id}");
            }
        },

        Commands::Pattern {
            name,
            description,
            area,
            learnings,
        } => {
            let graph = open()?;
            let pattern = NewPattern {
                code_area: area,
                ..NewPattern::new(name, description)
            };
            let ids: Vec<EntityId> = learnings.into_iter().map(EntityId::from).collect();
            println!("{}", graph.store_pattern(pattern, &ids)?);
        },

        Commands::Mistake {
            description,
            fix,
            file,
            learning,
        } => {
            let graph = open()?;
            let mistake = NewMistake {
                file_path: file,
                ..NewMistake::new(description, fix)
            };
            let learning = learning.map(EntityId::from);
            println!("{}", graph.store_mistake(mistake, learning.as_ref())?);
        },

        Commands::Query {
            area,
            file,
            keywords,
            issue,
            limit,
            json,
        } => {
            let graph = open()?;
            let ctx = QueryContext {
                code_area: area,
                file_path: file,
                keywords,
                issue_number: issue,
                limit,
            };
            let results = graph.query(&ctx)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No matching learnings.");
            } else {
                for result in &results {
                    print_result(result);
                }
            }
        },

        Commands::Mistakes { path } => {
            let graph = open()?;
            for mistake in graph.mistakes_for_file(&path)? {
                println!("{}  {} (fix: {})", mistake.id, mistake.description, mistake.how_fixed);
            }
        },

        Commands::Patterns { area } => {
            let graph = open()?;
            for pattern in graph.patterns_for_area(&area)? {
                println!("{}  {}: {}", pattern.id, pattern.name, pattern.description);
            }
        },

        Commands::Show { id } => {
            let graph = open()?;
            let result = graph.get_learning(&EntityId::from(id))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        },

        Commands::Context {
            area,
            issue,
            modified_files,
            keywords,
            limit,
            max_tokens,
        } => {
            let graph = open()?;
            let session = SessionQuery {
                issue_number: issue,
                code_area: area,
                modified_files,
                keywords,
                limit: Some(limit.unwrap_or(config.query_limit)),
            };
            let options = FormatOptions::default()
                .with_max_tokens(max_tokens.unwrap_or(config.max_tokens))
                .with_show_file_paths(config.show_file_paths);
            println!("{}", graph.build_session_context(&session, &options)?.text);
        },

        Commands::Stats => {
            let stats = open()?.stats()?;
            println!("Entities:");
            for kind in EntityKind::all() {
                println!("  {:<10} {}", kind.as_str(), stats.entity_count(*kind));
            }
            println!("Relationships:");
            for kind in RelationshipType::all() {
                println!("  {:<10} {}", kind.as_str(), stats.relationship_count(*kind));
            }
        },

        Commands::Hook { event } => cmd_hook(config, event)?,
    }

    Ok(())
}

/// Runs a hook handler over stdin and prints its response.
///
/// A session start that cannot open the store prints `{}` so the host
/// session continues without injected knowledge.
fn cmd_hook(config: &LearngraphConfig, event: HookEvent) -> anyhow::Result<()> {
    let input = read_hook_input()?;

    let graph = match KnowledgeGraph::open(config) {
        Ok(graph) => Arc::new(graph),
        Err(e) if matches!(event, HookEvent::SessionStart) => {
            tracing::warn!(error = %e, "Knowledge store unavailable, skipping context");
            println!("{{}}");
            return Ok(());
        },
        Err(e) => return Err(e.into()),
    };

    let handler: Box<dyn HookHandler> = match event {
        HookEvent::SessionStart => Box::new(SessionStartHandler::from_config(graph, config)),
        HookEvent::SessionEnd => Box::new(SessionEndHandler::from_config(graph, config)),
    };

    let output = handler.handle(&input)?;
    println!("{output}");
    Ok(())
}

/// Reads hook input from stdin as a string.
fn read_hook_input() -> io::Result<String> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    Ok(input)
}

fn print_result(result: &KnowledgeResult) {
    let learning = &result.learning;
    println!(
        "{}  [{:.2}] {}",
        learning.id, learning.confidence, learning.content
    );
    if let Some(area) = &learning.code_area {
        println!("    area: {area}");
    }
    if let Some(path) = &learning.file_path {
        println!("    file: {path}");
    }
    for pattern in &result.related_patterns {
        println!("    pattern: {}", pattern.name);
    }
    for mistake in &result.related_mistakes {
        println!("    mistake: {}", mistake.description);
    }
}
