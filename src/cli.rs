//! Command-line interface definitions for the HRW news archiver.
//!
//! Flags given here override the matching keys of the YAML config file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line arguments for the HRW news archiver.
///
/// # Examples
///
/// ```sh
/// # Crawl from the configured start page
/// hrw_news_archiver crawl
///
/// # Resume from a specific list page against a remote WebDriver
/// hrw_news_archiver crawl --start-url 'https://www.hrw.org/news?page=2671' \
///     --webdriver-url http://localhost:4444
///
/// # Split the store into yearly files
/// hrw_news_archiver partition --store data/hrw_news.csv -o output
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Walk the news list pages and archive every new article
    Crawl {
        /// First list page to load
        #[arg(long)]
        start_url: Option<String>,

        /// Record store CSV file
        #[arg(long)]
        store: Option<PathBuf>,

        /// Directory for archived raw article pages
        #[arg(long)]
        html_dir: Option<PathBuf>,

        /// WebDriver server address
        #[arg(long, env = "WEBDRIVER_URL")]
        webdriver_url: Option<String>,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,
    },

    /// Split the record store into one file set per publish year
    Partition {
        /// Record store CSV file (defaults to the configured store)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Directory that receives one subdirectory per year
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// File name prefix of the yearly files
        #[arg(long, default_value = "hrw")]
        prefix: String,

        /// Write only the yearly CSV files
        #[arg(long)]
        skip_spreadsheet: bool,
    },

    /// Convert the whole record store into a single spreadsheet
    Export {
        /// Record store CSV file (defaults to the configured store)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output workbook (defaults to the store path with an .xlsx extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
