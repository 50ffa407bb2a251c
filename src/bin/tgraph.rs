//! Travel graph CLI
//!
//! Load travel records into the graph and ask questions about them.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use travel_graph::config::Config;
use travel_graph::context::AppContext;
use travel_graph::ingest::{RecordSets, SourcePaths};
use travel_graph::otel::{init_tracing, LogFormat};
use travel_graph::query::PatternCatalog;
use travel_graph::QaOutcome;

/// Travel graph CLI - travel and accommodation relationship questions
#[derive(Parser)]
#[command(name = "tgraph")]
#[command(about = "Build a travel graph from CSV exports and ask who met whom, where", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(long, env = "TG_CONFIG")]
    config: Option<PathBuf>,

    /// Log output: pretty or json
    #[arg(long, env = "TG_LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,

    /// Log filter directives (overrides RUST_LOG)
    #[arg(long)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ensure uniqueness constraints
    Init,

    /// Load the four record sets
    Load {
        /// Directory holding the source files (default names)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// People file
        #[arg(long, requires_all = ["hotels", "flights", "buses"], conflicts_with = "dir")]
        people: Option<PathBuf>,

        /// Hotel stays file
        #[arg(long)]
        hotels: Option<PathBuf>,

        /// Flights file
        #[arg(long)]
        flights: Option<PathBuf>,

        /// Bus trips file
        #[arg(long)]
        buses: Option<PathBuf>,

        /// Wipe the whole graph first
        #[arg(long)]
        rebuild: bool,
    },

    /// Ask one question
    Ask {
        /// Question in natural language
        question: String,

        /// Show pattern, query, rows and stage trail
        #[arg(long)]
        verbose: bool,
    },

    /// Interactive question loop on stdin
    Chat {
        #[arg(long)]
        verbose: bool,
    },

    /// Print the query pattern catalog
    Patterns,

    /// Node and relationship counts
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format, cli.log.as_deref())?;

    if let Commands::Patterns = cli.command {
        print!("{}", PatternCatalog.describe());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    let ctx = AppContext::connect(config).await.context("connecting to graph store")?;

    match cli.command {
        Commands::Init => cmd_init(&ctx).await?,
        Commands::Load {
            dir,
            people,
            hotels,
            flights,
            buses,
            rebuild,
        } => {
            let explicit = match (people, hotels, flights, buses) {
                (Some(people), Some(hotel_stays), Some(flights), Some(bus_trips)) => Some(SourcePaths {
                    people,
                    hotel_stays,
                    flights,
                    bus_trips,
                }),
                _ => None,
            };
            cmd_load(&ctx, dir, explicit, rebuild).await?;
        }
        Commands::Ask { question, verbose } => cmd_ask(&ctx, &question, verbose).await?,
        Commands::Chat { verbose } => cmd_chat(&ctx, verbose).await?,
        Commands::Stats => cmd_stats(&ctx).await?,
        Commands::Patterns => {}
    }

    Ok(())
}

async fn cmd_init(ctx: &AppContext) -> anyhow::Result<()> {
    let report = ctx.bootstrapper().ensure_constraints().await;
    for name in &report.ensured {
        println!("✓ {}", name);
    }
    for error in &report.failed {
        println!("✗ {}", error);
    }
    Ok(())
}

async fn cmd_load(
    ctx: &AppContext,
    dir: Option<PathBuf>,
    explicit: Option<SourcePaths>,
    rebuild: bool,
) -> anyhow::Result<()> {
    let paths = match (explicit, dir.or_else(|| ctx.config.ingest.data_dir.clone())) {
        (Some(paths), _) => paths,
        (None, Some(dir)) => SourcePaths::in_dir(&dir, &ctx.config.ingest.files),
        (None, None) => anyhow::bail!("provide --dir, the four file flags, or ingest.data_dir"),
    };

    let sets = RecordSets::from_paths(&paths, &ctx.config.ingest.columns)?;

    let report = ctx.bootstrapper().ensure_constraints().await;
    if !report.is_complete() {
        println!("! {} constraint(s) could not be created", report.failed.len());
    }

    let summary = ctx
        .ingest_pipeline()
        .with_rebuild(rebuild || ctx.config.ingest.rebuild)
        .load_all(&sets)
        .await?;
    println!("{}", summary);
    Ok(())
}

async fn cmd_ask(ctx: &AppContext, question: &str, verbose: bool) -> anyhow::Result<()> {
    let outcome = ctx.qa_service().answer_detailed(question).await;
    print_outcome(&outcome, verbose)?;
    Ok(())
}

async fn cmd_chat(ctx: &AppContext, verbose: bool) -> anyhow::Result<()> {
    let qa = ctx.qa_service();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("Ask about relationships between people (empty line or 'exit' to quit).");
    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() || question == "exit" {
            break;
        }
        let outcome = qa.answer_detailed(question).await;
        print_outcome(&outcome, verbose)?;
        println!();
    }
    Ok(())
}

async fn cmd_stats(ctx: &AppContext) -> anyhow::Result<()> {
    let counts = ctx.graph.counts().await?;
    println!("Backend:       {}", ctx.graph.backend());
    println!("Nodes:         {}", counts.nodes);
    println!("Relationships: {}", counts.relationships);
    Ok(())
}

fn print_outcome(outcome: &QaOutcome, verbose: bool) -> anyhow::Result<()> {
    println!("{}", outcome.answer);
    if !verbose {
        return Ok(());
    }

    println!();
    println!("Request: {}", outcome.request_id);
    let stages: Vec<String> = outcome.stages.iter().map(|s| s.to_string()).collect();
    println!("Stages:  {}", stages.join(" → "));
    if let Some(translation) = &outcome.translation {
        println!("Pattern: {} (attempts: {})", translation.pattern(), translation.attempts);
        if !translation.reasoning.is_empty() {
            println!("Reason:  {}", translation.reasoning);
        }
        println!("Query:");
        for line in translation.rendered().lines() {
            println!("    {}", line);
        }
    }
    if !outcome.rows.is_empty() {
        println!("Rows:");
        println!("{}", serde_json::to_string_pretty(&outcome.rows)?);
    }
    if let Some(error) = &outcome.error {
        println!("Error:   {}", error);
    }
    Ok(())
}
