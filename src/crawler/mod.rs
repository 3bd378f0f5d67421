//! Crawler module for the dictionary search API
//!
//! This module contains the core crawling logic, including:
//! - Search response parsing
//! - Paged fetching with retry logic
//! - Daily quota accounting and request pacing
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod quota;

pub use coordinator::{Coordinator, CrawlOutcome, CrawlReport, CrawlSettings, CrawlSummary};
pub use fetcher::{build_http_client, total_pages, FetchError, FetchedPage, KeyCursor, PagedFetcher};
pub use parser::{parse_search_response, ParsedPage, ResponseError};
pub use quota::{QuotaGate, QuotaPermit};

use crate::config::Config;
use crate::Result;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the dictionary database and the checkpoint
/// 2. Resume from the saved position (or the first key when `fresh`)
/// 3. Fetch, normalize, and store every remaining key
/// 4. Stop cleanly on Ctrl-C, keeping every committed page
///
/// # Example
///
/// ```no_run
/// use hangul_harvest::config::load_config_with_hash;
/// use hangul_harvest::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("harvest.toml"))?;
/// let report = crawl(&config, &hash, false).await?;
/// println!("Resume point: {}", report.checkpoint);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: &Config, config_hash: &str, fresh: bool) -> Result<CrawlReport> {
    let mut coordinator = Coordinator::from_config(config, config_hash, fresh)?;
    coordinator.run_until(shutdown_signal()).await
}

/// Resolves on Ctrl-C
///
/// Never resolves if the signal handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Unable to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Interrupt received, stopping after the current page");
}
