//! Hangul-Harvest main entry point
//!
//! This is the command-line interface for the Korean dictionary crawler.

use anyhow::Context;
use clap::Parser;
use hangul_harvest::clock::SystemClock;
use hangul_harvest::config::{load_config_with_hash, Config};
use hangul_harvest::crawler::{crawl, CrawlOutcome};
use hangul_harvest::hangul::Keyspace;
use hangul_harvest::import::import_directory;
use hangul_harvest::output::{load_statistics, print_statistics};
use hangul_harvest::state::FileCheckpoint;
use hangul_harvest::storage::{RunKind, RunStatus, SqliteStorage, Storage};
use hangul_harvest::winning::find_winning_words;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Hangul-Harvest: a resumable Korean dictionary crawler
///
/// Walks every Hangul syllable through the dictionary search API within the
/// daily request quota, storing nouns in 19 consonant partitions. Progress is
/// checkpointed after every page, so the crawl can be stopped and resumed at
/// any time.
#[derive(Parser, Debug)]
#[command(name = "hangul-harvest")]
#[command(version)]
#[command(about = "A resumable, quota-aware Korean dictionary crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Discard the checkpoint and crawl from the first key (stored words are kept)
    #[arg(long)]
    fresh: bool,

    /// Validate config and show where the crawl would resume
    #[arg(long, conflicts_with_all = ["stats", "import_csv", "winning_words"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "import_csv", "winning_words"])]
    stats: bool,

    /// Import every CSV dictionary export in DIR and exit
    #[arg(long, value_name = "DIR", conflicts_with_all = ["dry_run", "stats", "winning_words"])]
    import_csv: Option<PathBuf>,

    /// Find winning words in the stored dictionary and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "import_csv"])]
    winning_words: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(dir) = &cli.import_csv {
        handle_import(&config, &config_hash, dir).await?;
    } else if cli.winning_words {
        handle_winning_words(&config, &config_hash)?;
    } else {
        handle_crawl(&config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("hangul_harvest=info,warn"),
            1 => EnvFilter::new("hangul_harvest=debug,info"),
            2 => EnvFilter::new("hangul_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_database(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.storage.database_path);
    SqliteStorage::new(path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Handles the --dry-run mode: validates config and shows the resume point
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Hangul-Harvest Dry Run ===\n");

    println!("API:");
    println!("  Endpoint: {}", config.api.endpoint);
    println!("  Page size: {}", config.api.page_size);
    println!("  Timeout: {}s", config.api.timeout_secs);
    println!(
        "  Retries: {} (backoff step {}s)",
        config.api.max_retries, config.api.backoff_step_secs
    );
    println!("  Request delay: {}ms", config.api.request_delay_ms);
    println!("  User agent: {}", config.api.user_agent());
    match config.api.resolve_key() {
        Ok(_) => println!("  Access key: found"),
        Err(e) => println!("  Access key: MISSING ({})", e),
    }

    println!("\nQuota:");
    println!("  Daily limit: {} requests", config.quota.daily_limit);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!(
        "  Reconnect: {} attempts, {}ms apart",
        config.storage.reconnect_attempts, config.storage.reconnect_delay_ms
    );

    let consonants = config.crawler.consonant_set()?;
    println!("\nCrawler:");
    println!(
        "  Consonants: {}",
        consonants
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    );
    if let Some(max_keys) = config.crawler.max_keys {
        println!("  Max keys per run: {}", max_keys);
    }

    let checkpoint = FileCheckpoint::new(&config.checkpoint.path);
    let progress = checkpoint
        .peek()
        .with_context(|| format!("Failed to read checkpoint {}", config.checkpoint.path))?
        .unwrap_or_default();
    let remaining = Keyspace::with_consonants(consonants)
        .starting_at(progress.consonant_index, progress.syllable_index)
        .remaining();

    println!("\nCheckpoint: {}", config.checkpoint.path);
    println!("  Resume at: {}", progress);
    println!("  Keys remaining: {}", remaining);

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_database(config)?;
    let checkpoint = FileCheckpoint::new(&config.checkpoint.path)
        .peek()
        .with_context(|| format!("Failed to read checkpoint {}", config.checkpoint.path))?;

    let stats = load_statistics(&storage, checkpoint)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --import-csv mode
async fn handle_import(config: &Config, config_hash: &str, dir: &Path) -> anyhow::Result<()> {
    println!("=== Importing CSV exports from {} ===\n", dir.display());

    let mut storage = open_database(config)?;
    let run_id = storage.create_run(RunKind::Import, config_hash)?;

    let result = import_directory(
        &mut storage,
        dir,
        &config.storage.retry_policy(),
        &SystemClock,
    )
    .await;

    let status = if result.is_ok() {
        RunStatus::Completed
    } else {
        RunStatus::Failed
    };
    storage.finish_run(run_id, status)?;
    let summary = result.with_context(|| format!("Import from {} failed", dir.display()))?;

    for file in &summary.files {
        if file.missing_pos_column {
            println!("  {}: skipped (no part-of-speech column)", file.path.display());
        } else {
            println!(
                "  {}: {} nouns, {} inserted, {} duplicates, {} rejected",
                file.path.display(),
                file.nouns,
                file.inserted,
                file.duplicates,
                file.rejected
            );
        }
    }
    for path in &summary.failed_files {
        println!("  {}: FAILED", path.display());
    }

    println!(
        "\n✓ Imported {} files: {} inserted, {} duplicates, {} rejected, {} failed inserts",
        summary.files.len(),
        summary.inserted(),
        summary.duplicates(),
        summary.rejected(),
        summary.failures()
    );
    Ok(())
}

/// Handles the --winning-words mode
fn handle_winning_words(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let mut storage = open_database(config)?;
    let run_id = storage.create_run(RunKind::WinningWords, config_hash)?;

    let result = find_winning_words(&mut storage);
    let status = if result.is_ok() {
        RunStatus::Completed
    } else {
        RunStatus::Failed
    };
    storage.finish_run(run_id, status)?;
    let report = result.context("Winning-word pass failed")?;

    println!(
        "✓ {} dead-end syllables, {} new winning words ({} already stored)",
        report.dead_ends, report.inserted, report.duplicates
    );
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (checkpoint discarded)");
    } else {
        tracing::info!("Starting crawl (resuming from checkpoint if present)");
    }

    let report = crawl(config, config_hash, fresh)
        .await
        .context("Crawl failed; rerun to resume from the last checkpoint")?;

    let verb = match report.outcome {
        CrawlOutcome::Completed => "Crawl completed",
        CrawlOutcome::KeyLimitReached => "Key limit reached",
        CrawlOutcome::Interrupted => "Crawl interrupted",
    };
    println!(
        "✓ {} (run #{}): {} keys, {} pages, {} words inserted, {} duplicates",
        verb,
        report.run_id,
        report.summary.keys_completed,
        report.summary.pages_fetched,
        report.summary.words_inserted,
        report.summary.duplicates
    );
    println!("  Next run resumes at: {}", report.checkpoint);
    Ok(())
}
