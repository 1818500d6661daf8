//! Human Rights Watch news pages.
//!
//! List pages live under `https://www.hrw.org/news?page=N` and render one
//! `article` card per story. Detail pages carry the publish date in their
//! path, e.g. `https://www.hrw.org/news/2024/03/14/kenya-police-abuses`.
//!
//! # Field mapping
//!
//! | Field | Source | Fallback |
//! |-------|--------|----------|
//! | Title | `h1[class*='title']` | none, hard failure |
//! | Subtitle | `p[class*='subtitle']` | first `h2` |
//! | Date | `/YYYY/MM/DD/` URL segment | none, hard failure |
//! | Content | `div[class*='article-body']` | every `div[class*='container']` |
//! | Country | list after the `Region / Country` label | empty |
//! | Topics | list after the `Topic` label | empty |

use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use crate::error::ExtractError;
use crate::models::{ArticleRecord, DATE_FORMAT};
use crate::utils::{collapse_whitespace, slugify_title};

/// One article card on a list page.
pub const LIST_ITEM: &str = "article div[class*='content']";

/// Links containing this marker are topic landing pages, not news.
pub const EXCLUDED_MARKER: &str = "/top-human-rights-";

/// Presentational text injected into article bodies by image widgets.
const NOISE: &str = "Click to expand Image";

const TOPIC_LABEL: &str = "Topic";
const COUNTRY_LABEL: &str = "Region / Country";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid static selector")
}

static LIST_ITEM_SEL: Lazy<Selector> = Lazy::new(|| selector(LIST_ITEM));
static ANCHOR: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("h1[class*='title']"));
static SUBTITLE: Lazy<Selector> = Lazy::new(|| selector("p[class*='subtitle']"));
static SECONDARY_HEADING: Lazy<Selector> = Lazy::new(|| selector("h2"));
static ARTICLE_BODY: Lazy<Selector> = Lazy::new(|| selector("div[class*='article-body']"));
static CONTAINER: Lazy<Selector> = Lazy::new(|| selector("div[class*='container']"));
static DIV: Lazy<Selector> = Lazy::new(|| selector("div"));
static LIST_ENTRY: Lazy<Selector> = Lazy::new(|| selector("li"));
static DATE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d{4}/\d{2}/\d{2})/").expect("valid date regex"));

/// Result of mapping one detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Article(Box<ArticleRecord>),
    /// The URL is not a news article; skip it without retrying.
    NonArticle,
}

/// Whether a list-page href may lead to a news article.
pub fn is_news_link(href: &str) -> bool {
    href.contains("/news/") && !href.contains(EXCLUDED_MARKER)
}

/// Whether the URL the browser landed on is a news article page.
pub fn is_news_page(url: &str) -> bool {
    url.contains("/news/")
}

/// Article hrefs on a list page, in DOM order.
///
/// Cards without a link are ignored. Hrefs are returned exactly as written
/// in the markup so they can be located again with an attribute selector.
pub fn parse_list_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&LIST_ITEM_SEL)
        .filter_map(|card| card.select(&ANCHOR).next())
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// Publish date from the `/YYYY/MM/DD/` URL segment, as `MM/DD/YYYY`.
pub fn parse_publish_date(url: &str) -> Result<String, ExtractError> {
    let segment = DATE_SEGMENT
        .captures(url)
        .and_then(|c| c.get(1))
        .ok_or_else(|| ExtractError::MissingDate {
            url: url.to_string(),
        })?
        .as_str();
    let date = NaiveDate::parse_from_str(segment, "%Y/%m/%d").map_err(|_| {
        ExtractError::InvalidDate {
            url: url.to_string(),
            segment: segment.to_string(),
        }
    })?;
    Ok(date.format(DATE_FORMAT).to_string())
}

/// Map the raw markup of a detail page at `url` into a record.
///
/// # Errors
///
/// - [`ExtractError::MissingDate`] / [`ExtractError::InvalidDate`] when the
///   URL has no usable date segment
/// - [`ExtractError::MissingTitle`] when the title is absent or empty, which
///   usually means the page has not finished rendering
#[instrument(level = "debug", skip(html), fields(bytes = html.len()))]
pub fn extract(html: &str, url: &str) -> Result<Extraction, ExtractError> {
    if !is_news_page(url) {
        return Ok(Extraction::NonArticle);
    }
    let published_date = parse_publish_date(url)?;

    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| collapse_whitespace(&text_of(el)))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ExtractError::MissingTitle {
            url: url.to_string(),
        })?;

    let subtitle = document
        .select(&SUBTITLE)
        .next()
        .or_else(|| document.select(&SECONDARY_HEADING).next())
        .map(|el| collapse_whitespace(&text_of(el)))
        .unwrap_or_default();

    let record = ArticleRecord {
        url: url.to_string(),
        local_name: slugify_title(&title),
        title,
        subtitle,
        published_date,
        body_text: body_text(&document),
        country_tags: labeled_tags(&document, COUNTRY_LABEL),
        topic_tags: labeled_tags(&document, TOPIC_LABEL),
    };
    debug!(title = %record.title, "Extracted article");
    Ok(Extraction::Article(Box::new(record)))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect()
}

fn clean_body(raw: &str) -> String {
    collapse_whitespace(&collapse_whitespace(raw).replace(NOISE, ""))
}

/// Body from the designated container, else every generic container joined.
fn body_text(document: &Html) -> String {
    if let Some(body) = document.select(&ARTICLE_BODY).next() {
        return clean_body(&text_of(body));
    }
    document
        .select(&CONTAINER)
        .map(|el| clean_body(&text_of(el)))
        .filter(|t| !t.is_empty())
        .join(" ")
}

/// Comma-joined entries of the list that follows the `label` div.
fn labeled_tags(document: &Html, label: &str) -> String {
    let Some(label_div) = document
        .select(&DIV)
        .find(|div| collapse_whitespace(&text_of(*div)) == label)
    else {
        return String::new();
    };
    let Some(list) = label_div
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "ul")
    else {
        return String::new();
    };
    list.select(&LIST_ENTRY)
        .map(|li| collapse_whitespace(&text_of(li)))
        .filter(|t| !t.is_empty())
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.hrw.org/news/2024/03/14/kenya-police-abuses";

    fn article(html: &str, url: &str) -> ArticleRecord {
        match extract(html, url).unwrap() {
            Extraction::Article(record) => *record,
            Extraction::NonArticle => panic!("expected an article"),
        }
    }

    const FULL_PAGE: &str = r#"<html><body>
        <h1 class="headline-title">Kenya: Police Abuses
        </h1>
        <p class="article-subtitle">Investigate killings during protests</p>
        <h2>Related content</h2>
        <div class="article-body">
            <p>First paragraph.</p>
            <figure>Click to expand Image</figure>
            <p>Second
            paragraph.</p>
        </div>
        <div class="tag-block"><div>Region / Country</div><ul><li>Africa</li><li> Kenya </li></ul></div>
        <div class="tag-block"><div>Topic</div><ul><li>Police</li><li>Free Speech</li></ul></div>
    </body></html>"#;

    #[test]
    fn test_extract_full_page() {
        let record = article(FULL_PAGE, URL);
        assert_eq!(record.url, URL);
        assert_eq!(record.title, "Kenya: Police Abuses");
        assert_eq!(record.local_name, "Kenya- Police Abuses");
        assert_eq!(record.subtitle, "Investigate killings during protests");
        assert_eq!(record.published_date, "03/14/2024");
        assert_eq!(record.body_text, "First paragraph. Second paragraph.");
        assert_eq!(record.country_tags, "Africa, Kenya");
        assert_eq!(record.topic_tags, "Police, Free Speech");
    }

    #[test]
    fn test_subtitle_falls_back_to_secondary_heading() {
        let html = r#"<h1 class="title">T</h1><h2>Secondary</h2><div class="article-body">b</div>"#;
        assert_eq!(article(html, URL).subtitle, "Secondary");

        let bare = r#"<h1 class="title">T</h1><div class="article-body">b</div>"#;
        assert_eq!(article(bare, URL).subtitle, "");
    }

    #[test]
    fn test_body_falls_back_to_containers() {
        let html = r#"<h1 class="title">T</h1>
            <div class="container">One
            Click to expand Image</div>
            <div class="container-wide">Two</div>
            <div class="container"></div>"#;
        assert_eq!(article(html, URL).body_text, "One Two");
    }

    #[test]
    fn test_missing_tags_yield_empty_strings() {
        let html = r#"<h1 class="title">T</h1><div class="article-body">b</div>"#;
        let record = article(html, URL);
        assert_eq!(record.country_tags, "");
        assert_eq!(record.topic_tags, "");
    }

    #[test]
    fn test_missing_title_is_an_error() {
        let html = r#"<div class="article-body">Loading</div>"#;
        let err = extract(html, URL).unwrap_err();
        assert!(matches!(err, ExtractError::MissingTitle { .. }));

        let empty = r#"<h1 class="title">  </h1>"#;
        assert!(matches!(
            extract(empty, URL).unwrap_err(),
            ExtractError::MissingTitle { .. }
        ));
    }

    #[test]
    fn test_missing_date_segment_fails_deterministically() {
        let url = "https://www.hrw.org/news/kenya-police-abuses";
        for _ in 0..3 {
            let err = extract(FULL_PAGE, url).unwrap_err();
            assert!(matches!(err, ExtractError::MissingDate { .. }));
        }
    }

    #[test]
    fn test_invalid_date_segment() {
        let url = "https://www.hrw.org/news/2024/13/45/x";
        assert!(matches!(
            extract(FULL_PAGE, url).unwrap_err(),
            ExtractError::InvalidDate { .. }
        ));
    }

    #[test]
    fn test_non_news_page_is_not_an_error() {
        let url = "https://www.hrw.org/topic/refugees-and-migrants";
        assert_eq!(extract(FULL_PAGE, url).unwrap(), Extraction::NonArticle);
    }

    #[test]
    fn test_news_link_filter() {
        assert!(is_news_link("/news/2024/03/14/kenya"));
        assert!(!is_news_link("/report/2024/03/14/kenya"));
        assert!(!is_news_link("/news/2024/01/01/top-human-rights-stories"));
        assert!(!is_news_link("/news/top-human-rights-2023"));
    }

    #[test]
    fn test_parse_list_links_in_dom_order() {
        let html = r#"<main>
            <article><div class="card-content"><a href="/news/2024/01/02/b">B</a></div></article>
            <article><div class="card-content"><span>no link</span></div></article>
            <article><div class="card-content"><h3><a href="/news/2024/01/01/a">A</a></h3></div></article>
            <div class="content"><a href="/news/2024/01/01/outside">not in an article</a></div>
        </main>"#;
        assert_eq!(
            parse_list_links(html),
            vec!["/news/2024/01/02/b".to_string(), "/news/2024/01/01/a".to_string()]
        );
    }

    #[test]
    fn test_parse_list_links_empty_page() {
        assert!(parse_list_links("<html><body></body></html>").is_empty());
    }
}
