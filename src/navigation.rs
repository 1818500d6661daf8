//! List → detail → list navigation over a [`BrowserDriver`].
//!
//! Every article visit walks the same states:
//!
//! ```text
//! OnList → Navigating → OnDetail → Validating ─┬─ valid ──→ (extract) → Returning → OnList
//!                                               └─ rejected ────────────→ Returning → OnList
//! ```
//!
//! A visit is rejected when the click did not change the URL or the landing
//! page is not a news article. Errors while navigating or validating leave
//! the browser wherever it stopped; [`Navigator::recover_to_list`] puts it
//! back on the list page before the batch is retried.

use std::cell::Cell;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument};

use crate::browser::BrowserDriver;
use crate::config::{Selectors, Timing};
use crate::error::CrawlError;
use crate::scrapers::hrw;

/// Where the current article visit stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    OnList,
    Navigating,
    OnDetail,
    Validating,
    Returning,
}

/// Why a detail page was not extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The URL did not change after clicking the link.
    ClickNotReflected,
    /// The landing page is not a news article.
    NonNewsPage,
}

/// Outcome of opening an article from the list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailVisit {
    /// On a validated article page: its URL and full markup.
    Valid { url: String, html: String },
    Rejected { url: String, reason: RejectReason },
}

/// Drives the single browser session through article visits.
#[derive(Debug)]
pub struct Navigator<D: BrowserDriver> {
    driver: D,
    selectors: Selectors,
    timing: Timing,
    state: Cell<VisitState>,
}

impl<D: BrowserDriver> Navigator<D> {
    pub fn new(driver: D, selectors: Selectors, timing: Timing) -> Self {
        Self {
            driver,
            selectors,
            timing,
            state: Cell::new(VisitState::OnList),
        }
    }

    #[cfg(test)]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn state(&self) -> VisitState {
        self.state.get()
    }

    fn enter(&self, state: VisitState) {
        debug!(from = ?self.state.get(), to = ?state, "Visit state");
        self.state.set(state);
    }

    /// Poll for an element until it appears or `timeout` elapses.
    ///
    /// With `require_visible`, an element that exists but is not rendered
    /// visible does not satisfy the wait. Driver errors during polling count
    /// as "not yet". Returns `None` on timeout. At least one probe is made
    /// even for a zero timeout.
    pub async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
        poll_interval: Duration,
        require_visible: bool,
    ) -> Option<D::Element> {
        let started = Instant::now();
        loop {
            match self.driver.find(selector, poll_interval).await {
                Ok(Some(element)) => {
                    if !require_visible {
                        return Some(element);
                    }
                    match self.driver.is_displayed(&element).await {
                        Ok(true) => return Some(element),
                        Ok(false) => {}
                        Err(e) => debug!(%selector, error = %e, "Visibility check failed"),
                    }
                }
                Ok(None) => {}
                Err(e) => debug!(%selector, error = %e, "Lookup failed while waiting"),
            }

            if started.elapsed() >= timeout {
                return None;
            }
            sleep(poll_interval).await;
        }
    }

    async fn require_visible(
        &self,
        selector: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<D::Element, CrawlError> {
        self.wait_for_selector(selector, timeout, poll_interval, true)
            .await
            .ok_or_else(|| CrawlError::SelectorTimeout {
                selector: selector.to_string(),
                waited: timeout,
            })
    }

    pub async fn goto(&self, url: &str) -> Result<(), CrawlError> {
        info!(%url, "Opening start page");
        self.driver.goto(url).await?;
        self.enter(VisitState::OnList);
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String, CrawlError> {
        Ok(self.driver.current_url().await?)
    }

    pub async fn page_source(&self) -> Result<String, CrawlError> {
        Ok(self.driver.page_source().await?)
    }

    /// Wait for a freshly loaded list page to render its cards.
    pub async fn wait_for_list_page(&self) -> Result<(), CrawlError> {
        self.require_visible(
            &self.selectors.list_ready,
            self.timing.wait_timeout(),
            self.timing.page_poll_interval(),
        )
        .await?;
        Ok(())
    }

    async fn wait_for_list_after_return(&self) -> Result<(), CrawlError> {
        self.require_visible(
            &self.selectors.list_ready,
            self.timing.wait_timeout(),
            self.timing.poll_interval(),
        )
        .await?;
        sleep(self.timing.settle()).await;
        self.enter(VisitState::OnList);
        Ok(())
    }

    /// Poll the current URL until it differs from `list_url`, for at most
    /// the link timeout. `None` means the browser never left the list.
    async fn wait_for_url_change(&self, list_url: &str) -> Result<Option<String>, CrawlError> {
        let started = Instant::now();
        loop {
            let url = self.driver.current_url().await?;
            if url != list_url {
                return Ok(Some(url));
            }
            if started.elapsed() >= self.timing.link_timeout() {
                return Ok(None);
            }
            sleep(self.timing.poll_interval()).await;
        }
    }

    /// Click the article link `href` on the list page at `list_url` and
    /// validate where the browser lands.
    #[instrument(level = "debug", skip(self))]
    pub async fn open_detail(&self, href: &str, list_url: &str) -> Result<DetailVisit, CrawlError> {
        self.enter(VisitState::Navigating);
        let link_selector = format!("a[href='{}']", href.replace('\'', "\\'"));
        let link = self
            .wait_for_selector(
                &link_selector,
                self.timing.link_timeout(),
                self.timing.poll_interval(),
                false,
            )
            .await
            .ok_or_else(|| CrawlError::SelectorTimeout {
                selector: link_selector.clone(),
                waited: self.timing.link_timeout(),
            })?;
        self.driver.click(&link).await?;

        let Some(url) = self.wait_for_url_change(list_url).await? else {
            self.enter(VisitState::Validating);
            return Ok(DetailVisit::Rejected {
                url: list_url.to_string(),
                reason: RejectReason::ClickNotReflected,
            });
        };
        debug!(%url, "Click navigated");

        self.enter(VisitState::OnDetail);
        self.require_visible(
            &self.selectors.article_ready,
            self.timing.wait_timeout(),
            self.timing.poll_interval(),
        )
        .await?;
        self.driver
            .execute("window.scrollTo(0, document.body.scrollHeight);")
            .await?;
        sleep(self.timing.settle()).await;

        self.enter(VisitState::Validating);
        let url = self.driver.current_url().await?;
        if !hrw::is_news_page(&url) {
            return Ok(DetailVisit::Rejected {
                url,
                reason: RejectReason::NonNewsPage,
            });
        }
        let html = self.driver.page_source().await?;
        Ok(DetailVisit::Valid { url, html })
    }

    /// Leave the detail page and wait until the list page is ready again.
    ///
    /// Goes back only if the browser actually left `list_url`.
    pub async fn return_to_list(&self, list_url: &str) -> Result<(), CrawlError> {
        self.enter(VisitState::Returning);
        if self.driver.current_url().await? != list_url {
            debug!("Back to news page");
            self.driver.back().await?;
        }
        self.wait_for_list_after_return().await
    }

    /// Put the browser back on `list_url` after a failed visit.
    ///
    /// Off the list page this goes back; on it, the page is reloaded.
    #[instrument(level = "info", skip(self))]
    pub async fn recover_to_list(&self, list_url: &str) -> Result<(), CrawlError> {
        info!(interrupted_in = ?self.state(), "Recovering to list page");
        self.enter(VisitState::Returning);
        if self.driver.current_url().await? != list_url {
            info!("Recovering: navigating back to the list page");
            self.driver.back().await?;
        } else {
            info!("Recovering: reloading the list page");
            self.driver.refresh().await?;
        }
        self.wait_for_list_after_return().await
    }

    /// Reload the current page, used between list-page load attempts.
    pub async fn reload(&self) -> Result<(), CrawlError> {
        self.driver.refresh().await?;
        Ok(())
    }

    /// Click the next-page control if it shows up within the bounded wait.
    ///
    /// Returns `false` when there is no further page.
    pub async fn advance_to_next_page(&self) -> Result<bool, CrawlError> {
        let Some(next) = self
            .wait_for_selector(
                &self.selectors.next_page,
                self.timing.wait_timeout(),
                self.timing.page_poll_interval(),
                true,
            )
            .await
        else {
            return Ok(false);
        };
        self.driver.click(&next).await?;
        info!("Moving to the next page");
        sleep(self.timing.page_turn()).await;
        Ok(true)
    }

    pub async fn quit(&self) -> Result<(), CrawlError> {
        Ok(self.driver.quit().await?)
    }
}
