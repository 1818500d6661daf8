//! Scripted in-memory driver for unit tests.
//!
//! Models a paginated news site: list pages at `/news?page=N` holding article
//! links, and detail pages keyed by absolute URL. Selectors are matched by
//! shape rather than parsed, which is enough for the crawler's fixed set.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::BrowserDriver;
use crate::error::DriverError;

pub(crate) const BASE: &str = "https://www.hrw.org";

pub(crate) fn list_url(page: usize) -> String {
    format!("{BASE}/news?page={page}")
}

/// Markup of a well-formed detail page.
pub(crate) fn article_markup(title: &str, body: &str, countries: &[&str], topics: &[&str]) -> String {
    let items = |tags: &[&str]| {
        tags.iter()
            .map(|t| format!("<li><a href=\"#\">{t}</a></li>"))
            .collect::<String>()
    };
    format!(
        r#"<html><body>
<h1 class="headline title">{title}</h1>
<p class="article-subtitle">Subtitle of {title}</p>
<div class="article-body"><p>{body}</p><p>Click to expand Image</p></div>
<div class="tags"><div>Region / Country</div><ul>{}</ul></div>
<div class="tags"><div>Topic</div><ul>{}</ul></div>
</body></html>"#,
        items(countries),
        items(topics)
    )
}

/// Site content served by [`ScriptedDriver`].
#[derive(Debug, Default)]
pub(crate) struct MockSite {
    /// Article hrefs on each list page, in DOM order.
    pub pages: Vec<Vec<String>>,
    /// Detail page markup by absolute URL.
    pub details: HashMap<String, String>,
    /// Absolute link URL → URL the browser actually lands on.
    pub redirects: HashMap<String, String>,
    /// Detail URL → number of reads that return a page without a title.
    pub unrendered: HashMap<String, usize>,
    /// List page index → number of reads that return no article entries.
    pub empty_renders: HashMap<usize, usize>,
    /// Selectors whose elements exist but are not rendered visible.
    pub hidden: HashSet<String>,
}

impl MockSite {
    /// Add a list page whose links all lead to well-formed articles.
    pub fn with_page(mut self, hrefs: &[&str]) -> Self {
        for href in hrefs {
            let url = format!("{BASE}{href}");
            let title = format!("Article {}", href.rsplit('/').next().unwrap_or(href));
            self.details
                .entry(url)
                .or_insert_with(|| article_markup(&title, "Body.", &["Kenya"], &["Refugees"]));
        }
        self.pages
            .push(hrefs.iter().map(|h| h.to_string()).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MockElement {
    /// Element matched by the given selector.
    Marker(String),
    Link(String),
    Next(usize),
}

enum Location {
    List(usize),
    Detail(String),
}

#[derive(Debug)]
pub(crate) struct ScriptedDriver {
    site: MockSite,
    history: RefCell<Vec<String>>,
    unrendered: RefCell<HashMap<String, usize>>,
    empty_renders: RefCell<HashMap<usize, usize>>,
    visited: RefCell<Vec<String>>,
}

impl ScriptedDriver {
    pub fn new(site: MockSite) -> Self {
        Self {
            unrendered: RefCell::new(site.unrendered.clone()),
            empty_renders: RefCell::new(site.empty_renders.clone()),
            site,
            history: RefCell::new(Vec::new()),
            visited: RefCell::new(Vec::new()),
        }
    }

    /// Every URL navigated to by goto or click, in order.
    pub fn visited(&self) -> Vec<String> {
        self.visited.borrow().clone()
    }

    fn current(&self) -> String {
        self.history
            .borrow()
            .last()
            .cloned()
            .unwrap_or_else(|| "about:blank".to_string())
    }

    fn location(&self) -> Location {
        let current = self.current();
        let list_prefix = format!("{BASE}/news?page=");
        match current.strip_prefix(&list_prefix).map(str::parse::<usize>) {
            Some(Ok(page)) => Location::List(page),
            _ => Location::Detail(current),
        }
    }

    fn push(&self, url: String) {
        self.visited.borrow_mut().push(url.clone());
        self.history.borrow_mut().push(url);
    }
}

fn take_one<K: std::hash::Hash + Eq>(counts: &RefCell<HashMap<K, usize>>, key: &K) -> bool {
    let mut counts = counts.borrow_mut();
    match counts.get_mut(key) {
        Some(n) if *n > 0 => {
            *n -= 1;
            true
        }
        _ => false,
    }
}

impl BrowserDriver for ScriptedDriver {
    type Element = MockElement;

    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.push(url.to_string());
        Ok(())
    }

    async fn find(
        &self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<Option<MockElement>, DriverError> {
        let found = match self.location() {
            Location::List(page) => {
                let hrefs = self.site.pages.get(page).cloned().unwrap_or_default();
                if let Some(rest) = selector.strip_prefix("a[href='") {
                    let href = rest.trim_end_matches("']");
                    hrefs
                        .iter()
                        .any(|h| h == href)
                        .then(|| MockElement::Link(href.to_string()))
                } else if selector.contains("next page") {
                    (page + 1 < self.site.pages.len()).then_some(MockElement::Next(page + 1))
                } else if selector.contains("content") {
                    Some(MockElement::Marker(selector.to_string()))
                } else {
                    None
                }
            }
            Location::Detail(url) => (selector.contains("article-body")
                && self.site.details.contains_key(&url))
            .then(|| MockElement::Marker(selector.to_string())),
        };
        Ok(found)
    }

    async fn is_displayed(&self, element: &MockElement) -> Result<bool, DriverError> {
        Ok(match element {
            MockElement::Marker(selector) => !self.site.hidden.contains(selector),
            _ => true,
        })
    }

    async fn click(&self, element: &MockElement) -> Result<(), DriverError> {
        match element {
            MockElement::Marker(_) => {}
            MockElement::Link(href) => {
                let url = format!("{BASE}{href}");
                let landed = self.site.redirects.get(&url).cloned().unwrap_or(url);
                self.push(landed);
            }
            MockElement::Next(page) => self.push(list_url(*page)),
        }
        Ok(())
    }

    async fn execute(&self, _script: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.current())
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        let markup = match self.location() {
            Location::List(page) => {
                if take_one(&self.empty_renders, &page) {
                    return Ok("<html><body><main></main></body></html>".to_string());
                }
                let entries = self
                    .site
                    .pages
                    .get(page)
                    .map(|hrefs| {
                        hrefs
                            .iter()
                            .map(|h| {
                                format!(r#"<article><div class="card-content"><a href="{h}">{h}</a></div></article>"#)
                            })
                            .collect::<String>()
                    })
                    .unwrap_or_default();
                format!("<html><body>{entries}</body></html>")
            }
            Location::Detail(url) => {
                if take_one(&self.unrendered, &url) {
                    return Ok(r#"<html><body><div class="article-body">Loading</div></body></html>"#.to_string());
                }
                self.site.details.get(&url).cloned().unwrap_or_default()
            }
        };
        Ok(markup)
    }

    async fn back(&self) -> Result<(), DriverError> {
        let mut history = self.history.borrow_mut();
        if history.len() > 1 {
            history.pop();
        }
        Ok(())
    }

    async fn refresh(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn quit(&self) -> Result<(), DriverError> {
        Ok(())
    }
}
