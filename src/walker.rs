//! Pagination walker: the top-level crawl loop.
//!
//! For each list page, starting from a fixed start URL:
//!
//! 1. Wait for the cards to render and collect article links (retried; an
//!    empty page counts as a slow render)
//! 2. Visit every link in DOM order, persisting new articles (retried as a
//!    whole batch; already-saved links are skipped cheaply on the next pass)
//! 3. Click the next-page control; its absence is the only way the walk ends
//!
//! There is no pagination checkpoint. A restarted run walks from the start
//! URL again and relies on [`SeenUrls`] to skip everything already stored.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument, warn};
use url::Url;

use crate::browser::BrowserDriver;
use crate::config::CrawlerConfig;
use crate::error::CrawlError;
use crate::models::ArticleRecord;
use crate::navigation::{DetailVisit, Navigator};
use crate::retry::{RetryPolicy, retry_with_recovery};
use crate::scrapers::hrw::{self, Extraction};
use crate::store::{RecordStore, SeenUrls};
use crate::utils::truncate_for_log;

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlStats {
    pub pages: usize,
    pub saved: usize,
    pub skipped_seen: usize,
    pub skipped_non_article: usize,
    pub rejected: usize,
}

/// What happened to one article link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkOutcome {
    Saved,
    AlreadySeen,
    NonArticle,
    Rejected,
}

/// Persists extracted articles and tracks what is already stored.
#[derive(Debug)]
struct ArticleSink {
    base_url: Url,
    store: RecordStore,
    seen: SeenUrls,
    html_dir: PathBuf,
    stats: CrawlStats,
}

impl ArticleSink {
    fn resolve(&self, href: &str) -> Result<String, CrawlError> {
        self.base_url
            .join(href)
            .map(|u| u.to_string())
            .map_err(|source| CrawlError::InvalidUrl {
                input: href.to_string(),
                source,
            })
    }

    /// Visit every link of one list page in order.
    ///
    /// Any error aborts the batch; the caller recovers and re-runs it from the
    /// first link, and links saved before the failure are skipped as seen.
    async fn process_batch<D: BrowserDriver>(
        &mut self,
        nav: &Navigator<D>,
        links: &[String],
        list_url: &str,
    ) -> Result<(), CrawlError> {
        for href in links {
            match self.process_link(nav, href, list_url).await? {
                LinkOutcome::Saved => self.stats.saved += 1,
                LinkOutcome::AlreadySeen => self.stats.skipped_seen += 1,
                LinkOutcome::NonArticle => self.stats.skipped_non_article += 1,
                LinkOutcome::Rejected => self.stats.rejected += 1,
            }
        }
        Ok(())
    }

    async fn process_link<D: BrowserDriver>(
        &mut self,
        nav: &Navigator<D>,
        href: &str,
        list_url: &str,
    ) -> Result<LinkOutcome, CrawlError> {
        let url = self.resolve(href)?;
        if self.seen.contains(&url) {
            info!(%url, "Skipping already saved article");
            return Ok(LinkOutcome::AlreadySeen);
        }
        if !hrw::is_news_link(href) {
            info!(%url, "Skipping non-news article");
            return Ok(LinkOutcome::NonArticle);
        }

        info!(%url, "Moving to specific article page");
        let (url, html) = match nav.open_detail(href, list_url).await? {
            DetailVisit::Valid { url, html } => (url, html),
            DetailVisit::Rejected { url, reason } => {
                info!(%url, ?reason, "Skipping non-news article");
                nav.return_to_list(list_url).await?;
                return Ok(LinkOutcome::Rejected);
            }
        };

        let outcome = if self.seen.contains(&url) {
            info!(%url, "Skipping already saved article");
            LinkOutcome::AlreadySeen
        } else {
            match hrw::extract(&html, &url)? {
                Extraction::NonArticle => {
                    info!(%url, "Skipping non-news article");
                    LinkOutcome::NonArticle
                }
                Extraction::Article(record) => {
                    self.persist(&record, &html).await?;
                    LinkOutcome::Saved
                }
            }
        };

        nav.return_to_list(list_url).await?;
        Ok(outcome)
    }

    /// Append the record and mark the URL seen, then archive the raw page.
    async fn persist(&mut self, record: &ArticleRecord, html: &str) -> Result<(), CrawlError> {
        self.store.append(record)?;
        self.seen.insert(record.url.clone());

        let path = self.html_dir.join(format!("{}.html", record.local_name));
        tokio::fs::write(&path, html)
            .await
            .map_err(|source| CrawlError::Archive {
                path: path.clone(),
                source,
            })?;

        info!(
            title = %truncate_for_log(&record.title, 120),
            country = %record.country_tags,
            topics = %record.topic_tags,
            url = %record.url,
            "Article saved"
        );
        Ok(())
    }
}

/// Walks list pages until the next-page control disappears.
#[derive(Debug)]
pub struct PaginationWalker<D: BrowserDriver> {
    nav: Navigator<D>,
    sink: ArticleSink,
    policy: RetryPolicy,
}

impl<D: BrowserDriver> PaginationWalker<D> {
    /// Build a walker over `driver`. `seen` must already reflect the store.
    pub fn new(
        driver: D,
        config: &CrawlerConfig,
        store: RecordStore,
        seen: SeenUrls,
    ) -> Result<Self, CrawlError> {
        let base_url = Url::parse(&config.base_url).map_err(|source| CrawlError::InvalidUrl {
            input: config.base_url.clone(),
            source,
        })?;
        Ok(Self {
            nav: Navigator::new(driver, config.selectors.clone(), config.timing.clone()),
            sink: ArticleSink {
                base_url,
                store,
                seen,
                html_dir: config.html_dir.clone(),
                stats: CrawlStats::default(),
            },
            policy: config.retry.policy(),
        })
    }

    #[cfg(test)]
    pub fn navigator(&self) -> &Navigator<D> {
        &self.nav
    }

    pub fn seen(&self) -> &SeenUrls {
        &self.sink.seen
    }

    pub fn stats(&self) -> CrawlStats {
        self.sink.stats
    }

    /// Crawl from `start_url` to the last list page.
    ///
    /// # Errors
    ///
    /// Returns the last error of a stage that exhausted its retries, or the
    /// first store/archive write failure.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&mut self, start_url: &str) -> Result<CrawlStats, CrawlError> {
        let started = Instant::now();
        self.nav.goto(start_url).await?;

        loop {
            let nav = &self.nav;
            let links = retry_with_recovery(
                &self.policy,
                "list page load",
                async || load_list_page(nav).await,
                async || nav.reload().await,
            )
            .await?;
            self.sink.stats.pages += 1;

            let list_url = nav.current_url().await?;
            info!(page = self.sink.stats.pages, %list_url, articles = links.len(), "Found articles");

            let sink = &mut self.sink;
            retry_with_recovery(
                &self.policy,
                "article batch",
                async || sink.process_batch(nav, &links, &list_url).await,
                async || nav.recover_to_list(&list_url).await,
            )
            .await?;

            if !nav.advance_to_next_page().await? {
                info!("No next page control found");
                break;
            }
        }

        let stats = self.sink.stats;
        info!(
            pages = stats.pages,
            saved = stats.saved,
            skipped_seen = stats.skipped_seen,
            skipped_non_article = stats.skipped_non_article,
            rejected = stats.rejected,
            elapsed_secs = started.elapsed().as_secs(),
            "All articles have been saved"
        );
        Ok(stats)
    }

    pub async fn close(&self) -> Result<(), CrawlError> {
        if let Err(e) = self.nav.quit().await {
            warn!(error = %e, "Failed to close browser session");
            return Err(e);
        }
        Ok(())
    }
}

/// Wait for the list page and collect its article links.
async fn load_list_page<D: BrowserDriver>(nav: &Navigator<D>) -> Result<Vec<String>, CrawlError> {
    info!("Waiting page loads");
    nav.wait_for_list_page().await?;

    let links = hrw::parse_list_links(&nav.page_source().await?);
    if links.is_empty() {
        warn!("No articles found. Retrying...");
        return Err(CrawlError::EmptyListPage {
            url: nav.current_url().await?,
        });
    }
    Ok(links)
}
