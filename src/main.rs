//! # medfind CLI
//!
//! Command-line interface over the medfind retrieval engine.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `medfind search "<query>" --data <table>` | Ranked hits from both scorers |
//! | `medfind ask "<query>" --data <table>` | Formatted answer (structured / strict / expert) |
//! | `medfind fields --data <table>` | Dataset columns with fill counts |
//!
//! ## Examples
//!
//! ```bash
//! # Ranked search over the primary dataset plus a docs directory
//! medfind search "napa" --data medicine_data.xlsx --docs ./leaflets
//!
//! # Expert-template answer with an extra uploaded table
//! medfind ask "প্যারাসিটামল" --data medicine_data.xlsx --table extra.csv --expert
//!
//! # Pull a remote payload into the pool for this query
//! medfind search "dosage" --data data.csv --api https://api.example.com/medicines
//! ```

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use medfind::config::{self, Config};
use medfind::format;
use medfind::index::StructuredIndex;
use medfind::ingest;
use medfind::loader;
use medfind::models::SourceItem;
use medfind::pool;
use medfind::search;

#[derive(Parser)]
#[command(
    name = "medfind",
    about = "Hybrid medicine-information search over tables, documents, and APIs",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Falls back to ./medfind.toml,
    /// then to built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Source inputs shared by every query command.
#[derive(Args)]
struct SourceArgs {
    /// Primary dataset file (XLSX or CSV).
    #[arg(long)]
    data: PathBuf,

    /// Additional table file to pool alongside the dataset. Repeatable.
    #[arg(long = "table")]
    tables: Vec<PathBuf>,

    /// Directory of documents (pdf, docx, xlsx, txt, md, csv) to pool.
    #[arg(long)]
    docs: Option<PathBuf>,

    /// Remote API endpoint to fetch into the pool. Repeatable.
    #[arg(long = "api")]
    apis: Vec<String>,

    /// API key sent as both a bearer token and an X-API-Key header.
    #[arg(long)]
    api_key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print ranked hits from the structured index and the source pool.
    Search {
        /// The search query string.
        query: String,

        #[command(flatten)]
        sources: SourceArgs,

        /// Maximum structured results (single-token queries may return more).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print a formatted answer for a query.
    Ask {
        /// The question or medicine name.
        query: String,

        #[command(flatten)]
        sources: SourceArgs,

        /// Answer only from exact dataset content; no free-text blending.
        #[arg(long)]
        strict: bool,

        /// Render the fixed expert template (takes precedence over --strict).
        #[arg(long)]
        expert: bool,
    },

    /// List the primary dataset's columns with non-missing value counts.
    Fields {
        /// Primary dataset file (XLSX or CSV).
        #[arg(long)]
        data: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Search {
            query,
            sources,
            limit,
        } => {
            let (index, pool) = load_sources(&sources)?;
            let top_k = limit.unwrap_or(cfg.retrieval.top_k);
            let outcome = search::run_query(&index, &pool, &query, top_k, &cfg.retrieval);
            print_hits(&query, &index, &outcome);
        }
        Commands::Ask {
            query,
            sources,
            strict,
            expert,
        } => {
            let (index, pool) = load_sources(&sources)?;
            let outcome =
                search::run_query(&index, &pool, &query, cfg.retrieval.top_k, &cfg.retrieval);
            let mode = format::Mode::resolve(expert, strict);
            println!("{}", format::format_answer(mode, &query, &index, &outcome, &cfg));
        }
        Commands::Fields { data } => {
            print_fields(&data)?;
        }
    }

    Ok(())
}

/// Explicit --config must parse; the implicit ./medfind.toml is only used
/// when it exists; otherwise built-in defaults apply.
fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => config::load_config(p),
        None => {
            let default_path = Path::new("./medfind.toml");
            if default_path.exists() {
                config::load_config(default_path)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn load_sources(args: &SourceArgs) -> Result<(StructuredIndex, Vec<SourceItem>)> {
    let rows = loader::load_table(&args.data)?;
    let index = StructuredIndex::build(rows);

    let mut tables = Vec::new();
    for path in &args.tables {
        tables.push(ingest::ingest_table(path)?);
    }

    let documents = match &args.docs {
        Some(dir) => ingest::ingest_document_dir(dir)?,
        None => Vec::new(),
    };

    let mut api_payloads = Vec::new();
    for url in &args.apis {
        match ingest::fetch_api(url, args.api_key.as_deref()) {
            Ok(payload) => api_payloads.push(payload),
            Err(e) => eprintln!("warning: skipping {}: {:#}", url, e),
        }
    }

    let origin = args
        .data
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.data.display().to_string());
    let pool = pool::assemble(index.records(), &origin, &tables, &documents, &api_payloads);
    Ok((index, pool))
}

fn print_hits(query: &str, index: &StructuredIndex, outcome: &search::QueryOutcome) {
    println!("query: {}", query);
    println!();

    println!("structured ({} hits)", outcome.structured.len());
    for hit in &outcome.structured {
        let name = index
            .record(hit.record_index)
            .and_then(|rec| rec.fields.first().and_then(|(_, v)| v.as_display()))
            .unwrap_or_else(|| format!("record {}", hit.record_index));
        println!("{:>3}. [{:.3}] {}", hit.rank, hit.score, name);
    }

    println!();
    println!("sources ({} hits)", outcome.unstructured.len());
    for hit in &outcome.unstructured {
        println!(
            "{:>3}. [{:.3}] {} ({})",
            hit.rank,
            hit.score,
            hit.origin,
            hit.kind.label()
        );
        println!("     {}", hit.context);
    }
}

fn print_fields(data: &Path) -> Result<()> {
    let rows = loader::load_table(data)?;
    let headers: Vec<String> = rows
        .first()
        .map(|row| row.iter().map(|(k, _)| k.clone()).collect())
        .unwrap_or_default();

    println!("{} rows, {} columns", rows.len(), headers.len());
    for header in headers {
        let filled = rows
            .iter()
            .filter(|row| {
                row.iter()
                    .any(|(k, v)| k == &header && v.as_display().is_some())
            })
            .count();
        println!("  {} ({}/{} filled)", header, filled, rows.len());
    }
    Ok(())
}
