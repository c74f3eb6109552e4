//! # folio CLI
//!
//! Command-line interface for the folio content index.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Site root holding config/ and content/
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild every index from the content files
    Rebuild {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Parse and validate content without writing the index
    Lint {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,

        /// Exit with an error when anything is reported
        #[arg(long)]
        strict: bool,
    },

    /// Show index freshness, backend and per-type counts
    Status {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Query indexed content
    Query(commands::QueryOptions),

    /// Resolve a request path against the route table
    Route {
        /// Request path, e.g. /blog/hello
        path: String,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Resolve a request path and print what its template would receive
    Render {
        /// Request path, e.g. /blog/hello
        path: String,

        /// Page number for archive and term listings
        #[arg(long, default_value_t = 1)]
        page: i64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Rebuild { json } => commands::rebuild(&cli.root, json),
        Commands::Lint { json, strict } => commands::lint(&cli.root, json, strict),
        Commands::Status { json } => commands::status(&cli.root, json),
        Commands::Query(opts) => commands::query(&cli.root, &opts),
        Commands::Route { path, json } => commands::route(&cli.root, &path, json),
        Commands::Render { path, page } => commands::render(&cli.root, &path, page),
    }
}
