//! Site-specific mapping from raw markup to article records.
//!
//! Each submodule knows one site's markup: how its list pages expose article
//! links, which links are news, and how a detail page maps onto
//! [`ArticleRecord`](crate::models::ArticleRecord). Navigation and
//! persistence stay site-agnostic.
//!
//! # Supported Sites
//!
//! | Site | Module | Notes |
//! |------|--------|-------|
//! | Human Rights Watch | [`hrw`] | Date-path article URLs, labeled tag lists |
//!
//! # Common Patterns
//!
//! Each scraper module exports:
//! - `parse_list_links(html)`: article hrefs on a list page, in DOM order
//! - `is_news_link(href)` / `is_news_page(url)`: non-article filters
//! - `extract(html, url)`: one detail page to an `Extraction`

pub mod hrw;
