//! Search binary entry point.
//!
//! Command-line interface for querying the paper index without the browser
//! UI. Supports single-query and interactive REPL modes with table or JSON
//! output.
//!
//! # Examples
//!
//! Single query with default settings:
//! ```bash
//! search --data-dir ./data --query "neural networks"
//! ```
//!
//! JSON output with more results:
//! ```bash
//! search --data-dir ./data --query "transformers" --format json --top-k 10
//! ```
//!
//! Interactive mode:
//! ```bash
//! search --data-dir ./data --interactive
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use paper_recommender::{
    config::AppConfig, startup::Resources, QueryResult, SearchEngine, SearchQuery, SearchSummary,
    DEFAULT_TOP_K, MAX_TOP_K,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output format for search results
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-friendly table
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Search binary CLI for querying the paper index
#[derive(Parser, Debug)]
#[command(
    name = "search",
    version,
    about = "Search papers by semantic similarity",
    long_about = "Query the paper index using semantic search. Supports both single-query \
                  and interactive modes with flexible output formatting.

EXAMPLES:
  Single query:
    search --data-dir ./data --query \"neural networks\"

  JSON output:
    search --data-dir ./data --query \"transformers\" --format json

  Interactive mode:
    search --data-dir ./data --interactive"
)]
struct Args {
    #[command(flatten)]
    config: AppConfig,

    /// Search query (required for single-query mode, omitted in interactive mode)
    #[arg(long, value_name = "TEXT", conflicts_with = "interactive")]
    query: Option<String>,

    /// Number of results to return (1-10)
    #[arg(long, value_name = "N", default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Hide the "Found N results" summary line
    #[arg(long)]
    no_stats: bool,

    /// Enable interactive REPL mode
    #[arg(long, short = 'i')]
    interactive: bool,
}

/// Setup logging with the specified level
fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}

fn validate_top_k(top_k: usize) -> Result<()> {
    if !(1..=MAX_TOP_K).contains(&top_k) {
        anyhow::bail!("Number of results must be between 1 and {}, got {}", MAX_TOP_K, top_k);
    }
    Ok(())
}

/// Execute a search query and return results with timing
async fn execute_search<S: SearchEngine>(
    engine: &S,
    query_text: &str,
    top_k: usize,
) -> Result<(Vec<QueryResult>, SearchSummary)> {
    debug!("Executing search for query: {}", query_text);

    let query = SearchQuery::new(query_text, top_k);
    engine
        .search_with_summary(&query)
        .await
        .with_context(|| format!("Failed to execute search for query: '{}'", query_text))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// Format results as a pretty table
fn format_results_table(results: &[QueryResult]) -> String {
    if results.is_empty() {
        return "No results found.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Rank").add_attribute(Attribute::Bold),
        Cell::new("Score").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("URL").add_attribute(Attribute::Bold),
    ]);

    for (idx, result) in results.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(format!("{:.4}", result.distance)),
            Cell::new(truncate(&result.record.title, 60)),
            Cell::new(&result.record.url),
        ]);
    }

    table.to_string()
}

/// Format results as JSON
fn format_results_json(results: &[QueryResult]) -> Result<String> {
    serde_json::to_string_pretty(results).with_context(|| "Failed to serialize results to JSON")
}

fn print_results(
    results: &[QueryResult],
    summary: &SearchSummary,
    format: &OutputFormat,
    show_stats: bool,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", format_results_table(results));
            if show_stats {
                println!("\n{}", summary);
            }
        }
        OutputFormat::Json => println!("{}", format_results_json(results)?),
    }
    Ok(())
}

/// Display detailed view of a single result
fn display_result_detail(result: &QueryResult, rank: usize) {
    println!("\n{}", "═".repeat(80));
    println!("Rank: {}", rank);
    println!("Title: {}", result.record.title);
    println!("URL: {}", result.record.url);
    println!("Score: {:.4}", result.distance);
    println!("\nAbstract:\n{}", result.record.abstract_text);
    println!("{}", "═".repeat(80));
}

fn print_help() {
    println!("Commands:");
    println!("  <query>          - Search for papers");
    println!("  /top N           - Set number of results to N (1-{})", MAX_TOP_K);
    println!("  /format table    - Use table output format");
    println!("  /format json     - Use JSON output format");
    println!("  /detail N        - Show full details for result rank N");
    println!("  /help            - Show this help");
    println!("  Ctrl+D or Ctrl+C - Exit");
}

/// Run interactive REPL mode
async fn run_interactive<S: SearchEngine>(
    engine: S,
    mut top_k: usize,
    mut format: OutputFormat,
    show_stats: bool,
) -> Result<()> {
    println!("Paper Recommendation Engine ({} papers)", engine.corpus_size());
    print_help();
    println!();

    let mut rl = DefaultEditor::new().with_context(|| "Failed to create readline editor")?;

    let mut last_results: Vec<QueryResult> = Vec::new();

    loop {
        match rl.readline("Search> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line).ok();

                if line.starts_with('/') {
                    let parts: Vec<&str> = line.split_whitespace().collect();
                    match parts[0] {
                        "/help" => print_help(),
                        "/top" => {
                            if parts.len() != 2 {
                                eprintln!("Usage: /top N");
                                continue;
                            }
                            match parts[1].parse::<usize>() {
                                Ok(n) if validate_top_k(n).is_ok() => {
                                    top_k = n;
                                    println!("Set top-k to {}", top_k);
                                }
                                _ => eprintln!("Invalid number: must be between 1 and {}", MAX_TOP_K),
                            }
                        }
                        "/format" => match parts.get(1) {
                            Some(&"table") => {
                                format = OutputFormat::Table;
                                println!("Set output format to table");
                            }
                            Some(&"json") => {
                                format = OutputFormat::Json;
                                println!("Set output format to JSON");
                            }
                            _ => eprintln!("Usage: /format [table|json]"),
                        },
                        "/detail" => {
                            if parts.len() != 2 {
                                eprintln!("Usage: /detail N");
                                continue;
                            }
                            match parts[1].parse::<usize>() {
                                Ok(rank) if rank > 0 && rank <= last_results.len() => {
                                    display_result_detail(&last_results[rank - 1], rank);
                                }
                                Ok(rank) if rank > last_results.len() => {
                                    eprintln!(
                                        "Rank {} out of range (last search had {} results)",
                                        rank,
                                        last_results.len()
                                    );
                                }
                                _ => eprintln!("Invalid rank: must be a positive integer"),
                            }
                        }
                        _ => eprintln!(
                            "Unknown command: {}. Type /help for available commands.",
                            parts[0]
                        ),
                    }
                } else {
                    match execute_search(&engine, line, top_k).await {
                        Ok((results, summary)) => {
                            if let Err(e) = print_results(&results, &summary, &format, show_stats) {
                                eprintln!("Error formatting results: {}", e);
                            }
                            last_results = results;
                        }
                        Err(e) => eprintln!("Search failed: {:#}", e),
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                error!("Error reading input: {}", err);
                break;
            }
        }
    }

    Ok(())
}

/// Run single-query mode
async fn run_single_query<S: SearchEngine>(
    engine: S,
    query: &str,
    top_k: usize,
    format: OutputFormat,
    show_stats: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        info!("Empty query, no search performed");
        return Ok(());
    }

    let (results, summary) = execute_search(&engine, query, top_k).await?;
    print_results(&results, &summary, &format, show_stats)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.config.log_level);

    if !args.interactive && args.query.is_none() {
        anyhow::bail!(
            "Either --query or --interactive must be specified.\n\
             Use --help for usage information."
        );
    }
    validate_top_k(args.top_k)?;

    let config = args.config.clone();
    let resources = tokio::task::spawn_blocking(move || Resources::load(&config))
        .await
        .context("Startup task panicked")?
        .context("Failed to load search resources")?;
    let engine = resources.query_service();

    info!("Ready to search {} papers", engine.corpus_size());

    let show_stats = !args.no_stats;
    match args.query {
        Some(query) if !args.interactive => {
            run_single_query(engine, &query, args.top_k, args.format, show_stats).await
        }
        _ => run_interactive(engine, args.top_k, args.format, show_stats).await,
    }
}
