//! # HRW News Archiver
//!
//! A resumable crawler for the Human Rights Watch news listing. It drives a
//! real browser over WebDriver, walks the paginated list, opens each article,
//! extracts a normalized record and appends it to a CSV store while archiving
//! the raw page. Reruns resume where the store left off.
//!
//! ## Usage
//!
//! ```sh
//! hrw_news_archiver crawl --webdriver-url http://localhost:4444
//! hrw_news_archiver partition --output-dir output
//! hrw_news_archiver export
//! ```
//!
//! ## Architecture
//!
//! 1. **Walk**: Load each list page, collect its article links, then click
//!    through to the next page until the control disappears
//! 2. **Visit**: Skip links already in the store, open the rest and validate
//!    the landing page
//! 3. **Extract**: Map the detail page to an [`models::ArticleRecord`]
//! 4. **Persist**: Append the record, archive the raw HTML
//!
//! Every list-page stage runs under a bounded retry with a recovery step that
//! brings the browser back to the list page.

use std::error::Error;

use clap::Parser;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod browser;
mod cli;
mod config;
mod error;
mod models;
mod navigation;
mod outputs;
mod retry;
mod scrapers;
mod store;
mod utils;
mod walker;

use browser::webdriver::{SessionOptions, WebDriverSession};
use cli::{Cli, Command};
use config::CrawlerConfig;
use outputs::partition::{PartitionOptions, partition_by_year};
use outputs::spreadsheet::export_store;
use retry::retry;
use store::{RecordStore, SeenUrls};
use utils::ensure_writable_dir;
use walker::PaginationWalker;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("hrw_news_archiver starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.command, "Parsed CLI arguments");

    let mut config = CrawlerConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Crawl {
            start_url,
            store,
            html_dir,
            webdriver_url,
            headless,
        } => {
            if let Some(start_url) = start_url {
                config.start_url = start_url;
            }
            if let Some(store) = store {
                config.store_path = store;
            }
            if let Some(html_dir) = html_dir {
                config.html_dir = html_dir;
            }
            if let Some(webdriver_url) = webdriver_url {
                config.webdriver_url = webdriver_url;
            }
            config.headless |= headless;
            crawl(&config).await?;
        }
        Command::Partition {
            store,
            output_dir,
            prefix,
            skip_spreadsheet,
        } => {
            let store_path = store.unwrap_or_else(|| config.store_path.clone());
            let options = PartitionOptions {
                output_dir,
                prefix,
                spreadsheets: !skip_spreadsheet,
            };
            let counts = partition_by_year(&store_path, &options)?;
            info!(
                years = counts.len(),
                rows = counts.values().sum::<usize>(),
                "Partition complete"
            );
        }
        Command::Export { store, output } => {
            let store_path = store.unwrap_or_else(|| config.store_path.clone());
            let output = output.unwrap_or_else(|| store_path.with_extension("xlsx"));
            export_store(&store_path, &output)?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Run one crawl session end to end.
async fn crawl(config: &CrawlerConfig) -> Result<(), Box<dyn Error>> {
    // Early check: archive dir must be writable before a browser is started.
    if let Err(e) = ensure_writable_dir(&config.html_dir).await {
        error!(
            path = %config.html_dir.display(),
            error = %e,
            "HTML output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }
    if let Some(parent) = config
        .store_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        ensure_writable_dir(parent).await?;
    }

    let store = RecordStore::new(config.store_path.clone());
    let seen = SeenUrls::load(store.path())?;
    if seen.is_empty() {
        info!(store = %store.path().display(), "Starting a new store");
    } else {
        info!(already_saved = seen.len(), store = %store.path().display(), "Resuming from store");
    }

    let session = SessionOptions {
        webdriver_url: config.webdriver_url.clone(),
        headless: config.headless,
        window_size: config.window_size.clone(),
    };
    let driver = retry(&config.retry.policy(), "browser session start", async || {
        WebDriverSession::connect(&session).await
    })
    .await?;

    let mut walker = PaginationWalker::new(driver, config, store, seen)?;
    let outcome = walker.run(&config.start_url).await;
    let closed = walker.close().await;

    match outcome {
        Ok(stats) => {
            info!(
                saved = stats.saved,
                pages = stats.pages,
                store_total = walker.seen().len(),
                "Crawl finished"
            );
            closed?;
            Ok(())
        }
        Err(e) => {
            let stats = walker.stats();
            error!(
                error = %e,
                pages = stats.pages,
                saved = stats.saved,
                "Crawl aborted"
            );
            Err(e.into())
        }
    }
}
