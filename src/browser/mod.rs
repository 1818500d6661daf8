//! Browser driver seam.
//!
//! The crawler never talks to a browser engine directly. Everything it needs
//! from a live session is expressed by [`BrowserDriver`]; any automation
//! backend with this shape can drive a crawl.
//!
//! | Implementation | Module | Notes |
//! |----------------|--------|-------|
//! | W3C WebDriver (chromedriver, geckodriver) | [`webdriver`] | Production backend via `fantoccini` |
//! | Scripted in-memory site | `testing` | Unit tests only |

use std::time::Duration;

use crate::error::DriverError;

pub mod webdriver;

#[cfg(test)]
pub(crate) mod testing;

/// Capability set the crawler consumes from a browser session.
///
/// All methods act on the session's single current tab.
#[allow(async_fn_in_trait)]
pub trait BrowserDriver {
    /// Handle to an element located in the current document.
    type Element: Clone;

    /// Navigate to `url` and wait for the load event.
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    /// Look up the first element matching the CSS `selector`, polling for at
    /// most `timeout`. `Ok(None)` means nothing matched in time.
    async fn find(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<Self::Element>, DriverError>;

    /// Whether the element is currently rendered visible.
    async fn is_displayed(&self, element: &Self::Element) -> Result<bool, DriverError>;

    /// Dispatch a click on the element from script.
    async fn click(&self, element: &Self::Element) -> Result<(), DriverError>;

    /// Run arbitrary script in the page.
    async fn execute(&self, script: &str) -> Result<(), DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    /// Full markup of the current document.
    async fn page_source(&self) -> Result<String, DriverError>;

    async fn back(&self) -> Result<(), DriverError>;

    async fn refresh(&self) -> Result<(), DriverError>;

    /// End the session.
    async fn quit(&self) -> Result<(), DriverError>;
}
