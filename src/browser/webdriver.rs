//! W3C WebDriver backend built on `fantoccini`.
//!
//! Connects to a running WebDriver server (for example `chromedriver
//! --port=9515`) and opens a Chrome session with the arguments the crawl
//! needs. Element clicks are dispatched from script so overlays and sticky
//! headers cannot intercept them.

use std::time::Duration;

use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Value, json};
use tracing::{info, instrument};

use super::BrowserDriver;
use crate::error::DriverError;

/// Chrome arguments applied to every session.
const CHROME_ARGS: &[&str] = &[
    "--disable-dev-shm-usage",
    "--disable-software-rasterizer",
    "--disable-infobars",
    "--disable-notifications",
    "--disable-popup-blocking",
    "--disable-translate",
];

/// Session settings for [`WebDriverSession::connect`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Address of the WebDriver server.
    pub webdriver_url: String,
    pub headless: bool,
    /// Window size as `width,height`.
    pub window_size: String,
}

/// A live WebDriver session.
#[derive(Debug, Clone)]
pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    /// Open a new Chrome session on the WebDriver server.
    #[instrument(level = "info", skip_all, fields(webdriver_url = %options.webdriver_url, headless = options.headless))]
    pub async fn connect(options: &SessionOptions) -> Result<Self, DriverError> {
        let mut args: Vec<String> = CHROME_ARGS.iter().map(|a| a.to_string()).collect();
        args.push(format!("--window-size={}", options.window_size));
        if options.headless {
            args.push("--headless=new".to_string());
            args.push("--disable-gpu".to_string());
        }

        let mut capabilities = serde_json::Map::new();
        capabilities.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(&options.webdriver_url)
            .await
            .map_err(|e| DriverError::Session(e.to_string()))?;

        info!("Browser session started");
        Ok(Self { client })
    }
}

/// Map the result of a bounded element wait: a timeout or a missing element
/// is "not found", anything else is a driver failure.
fn lookup_outcome<T>(result: Result<T, CmdError>) -> Result<Option<T>, DriverError> {
    match result {
        Ok(element) => Ok(Some(element)),
        Err(CmdError::WaitTimeout) => Ok(None),
        Err(e) if e.is_no_such_element() => Ok(None),
        Err(e) => Err(DriverError::command("find", e)),
    }
}

impl BrowserDriver for WebDriverSession {
    type Element = Element;

    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.client
            .goto(url)
            .await
            .map_err(|e| DriverError::command("goto", e))
    }

    async fn find(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<Element>, DriverError> {
        lookup_outcome(
            self.client
                .wait()
                .at_most(timeout)
                .for_element(Locator::Css(selector))
                .await,
        )
    }

    async fn is_displayed(&self, element: &Element) -> Result<bool, DriverError> {
        element
            .is_displayed()
            .await
            .map_err(|e| DriverError::command("is_displayed", e))
    }

    async fn click(&self, element: &Element) -> Result<(), DriverError> {
        let arg = serde_json::to_value(element).map_err(|e| DriverError::command("click", e))?;
        self.client
            .execute("arguments[0].click();", vec![arg])
            .await
            .map(|_: Value| ())
            .map_err(|e| DriverError::command("click", e))
    }

    async fn execute(&self, script: &str) -> Result<(), DriverError> {
        self.client
            .execute(script, Vec::new())
            .await
            .map(|_| ())
            .map_err(|e| DriverError::command("execute", e))
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(|e| DriverError::command("current_url", e))
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        self.client
            .source()
            .await
            .map_err(|e| DriverError::command("page_source", e))
    }

    async fn back(&self) -> Result<(), DriverError> {
        self.client
            .back()
            .await
            .map_err(|e| DriverError::command("back", e))
    }

    async fn refresh(&self) -> Result<(), DriverError> {
        self.client
            .refresh()
            .await
            .map_err(|e| DriverError::command("refresh", e))
    }

    async fn quit(&self) -> Result<(), DriverError> {
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| DriverError::command("quit", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fantoccini::error::{ErrorStatus, WebDriver};

    #[test]
    fn test_wait_timeout_is_not_found() {
        let outcome = lookup_outcome::<()>(Err(CmdError::WaitTimeout)).unwrap();
        assert_eq!(outcome, None);
    }

    #[test]
    fn test_no_such_element_is_not_found() {
        let missing = CmdError::Standard(WebDriver::new(ErrorStatus::NoSuchElement, "no such element"));
        assert_eq!(lookup_outcome::<()>(Err(missing)).unwrap(), None);
    }

    #[test]
    fn test_found_element_is_returned() {
        assert_eq!(lookup_outcome(Ok(7)).unwrap(), Some(7));
    }

    #[test]
    fn test_other_failures_are_command_errors() {
        let err = lookup_outcome::<()>(Err(CmdError::NotJson("<html>".to_string()))).unwrap_err();
        assert!(matches!(err, DriverError::Command { command: "find", .. }));
    }
}
