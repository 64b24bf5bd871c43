//! # Context Scout CLI (`scout`)
//!
//! Runs the retrieval entry points from the command line or serves them
//! over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! scout --config ./config/scout.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scout search "<query>"` | Hybrid search with optional filters and work context |
//! | `scout related --file <path>` | Tests, docs and neighbours of a file |
//! | `scout related --ticket <id>` | Git history, PRs, issues and discussions for a ticket |
//! | `scout serve` | Start the HTTP tool server |
//!
//! Results are printed to stdout as pretty JSON; logs go to stderr
//! (`RUST_LOG`, default `context_scout=info`).

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use context_scout::config::{self, Config};
use context_scout::retriever::SearchRequest;
use context_scout::server;
use context_scout::Services;
use context_scout_core::models::{RequestContext, SearchFilters, SourceType};

/// Context Scout CLI: context retrieval for AI coding agents.
#[derive(Parser)]
#[command(
    name = "scout",
    about = "Context Scout: hybrid search and related-context lookup for AI coding agents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// A missing file at the default location falls back to built-in
    /// defaults; an explicitly named file must exist.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

const DEFAULT_CONFIG: &str = "./config/scout.toml";

#[derive(Subcommand)]
enum Commands {
    /// Search indexed code, docs, tickets, pull requests and chat.
    Search {
        /// The search query string.
        query: String,

        /// Number of results (default 20, capped at 100).
        #[arg(long)]
        top_k: Option<i64>,

        /// Results to skip.
        #[arg(long)]
        offset: Option<i64>,

        /// Restrict to source types (`code`, `documentation`, `ticket`,
        /// `issue`, `pull_request`, `chat`, `other`). Repeatable.
        #[arg(long = "source-type", value_parser = parse_source_type)]
        source_types: Vec<SourceType>,

        /// File the agent is editing; matching results are boosted.
        #[arg(long)]
        active_file: Option<String>,

        /// Current git branch; matching results are boosted.
        #[arg(long)]
        branch: Option<String>,

        /// Open ticket IDs; matching results are boosted. Repeatable.
        #[arg(long = "ticket")]
        tickets: Vec<String>,
    },

    /// Related context for a file or a ticket.
    Related {
        /// Repository-relative file path.
        #[arg(long)]
        file: Option<String>,

        /// Ticket ID (letters, digits, `.`, `_`, `-`).
        #[arg(long)]
        ticket: Option<String>,
    },

    /// Start the HTTP tool server on `[server].bind`.
    Serve,
}

fn parse_source_type(s: &str) -> Result<SourceType, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown source type: '{}'", s))
}

fn load(path: &Path) -> Result<Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        tracing::debug!("no config file; using defaults");
        return Ok(Config::default());
    }
    config::load_config(path)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("context_scout=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load(&cli.config)?;
    let services = Services::from_config(&cfg)?;

    match cli.command {
        Commands::Search {
            query,
            top_k,
            offset,
            source_types,
            active_file,
            branch,
            tickets,
        } => {
            let context = RequestContext {
                boost_file: active_file,
                git_branch: branch,
                boost_tickets: tickets,
            };
            let request = SearchRequest {
                query,
                top_k,
                offset,
                filters: (!source_types.is_empty()).then(|| SearchFilters {
                    source_types,
                    ..Default::default()
                }),
                context: (!context.is_empty()).then_some(context),
            };
            let response = services.retriever.search(&request).await?;
            print_json(&response)?;
        }
        Commands::Related { file, ticket } => {
            if file.is_none() && ticket.is_none() {
                bail!("related needs --file or --ticket");
            }
            let info = services
                .related
                .get_related_info(file.as_deref(), ticket.as_deref())
                .await?;
            print_json(&info)?;
        }
        Commands::Serve => {
            server::run_server(&cfg, services).await?;
        }
    }

    Ok(())
}
