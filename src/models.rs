//! Data models for extracted articles.
//!
//! [`ArticleRecord`] is the unit of persistence. Its serde field names are the
//! store's header row, so the column order below is the on-disk column order:
//!
//! ```text
//! URL, html_name, Title, Subtitle, Date, Content, Country, Topics
//! ```

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Header row of the record store, in column order.
pub const FIELD_NAMES: [&str; 8] = [
    "URL",
    "html_name",
    "Title",
    "Subtitle",
    "Date",
    "Content",
    "Country",
    "Topics",
];

/// Name of the unique-key column.
pub const URL_COLUMN: &str = "URL";

/// Calendar format of [`ArticleRecord::published_date`].
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// One normalized news article, built from a single detail page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleRecord {
    /// Canonical absolute URL of the article; unique across the store.
    #[serde(rename = "URL")]
    pub url: String,
    /// Filesystem-safe slug of the title, the stem of the archived raw page.
    #[serde(rename = "html_name")]
    pub local_name: String,
    #[serde(rename = "Title")]
    pub title: String,
    /// Subtitle, or the first secondary heading when the page has none.
    #[serde(rename = "Subtitle")]
    pub subtitle: String,
    /// Publish date as `MM/DD/YYYY`.
    #[serde(rename = "Date")]
    pub published_date: String,
    /// Flattened body text.
    #[serde(rename = "Content")]
    pub body_text: String,
    /// Comma-joined country tags in page order.
    #[serde(rename = "Country")]
    pub country_tags: String,
    /// Comma-joined topic tags in page order.
    #[serde(rename = "Topics")]
    pub topic_tags: String,
}

impl ArticleRecord {
    /// Calendar year of the publish date, if the date is well formed.
    pub fn year(&self) -> Option<i32> {
        NaiveDate::parse_from_str(&self.published_date, DATE_FORMAT)
            .ok()
            .map(|d| d.year())
    }

    /// Field values in column order.
    pub fn fields(&self) -> [&str; 8] {
        [
            &self.url,
            &self.local_name,
            &self.title,
            &self.subtitle,
            &self.published_date,
            &self.body_text,
            &self.country_tags,
            &self.topic_tags,
        ]
    }

    /// Apply `f` to every field, in column order.
    pub fn map_fields(self, f: impl Fn(&str) -> String) -> Self {
        Self {
            url: f(&self.url),
            local_name: f(&self.local_name),
            title: f(&self.title),
            subtitle: f(&self.subtitle),
            published_date: f(&self.published_date),
            body_text: f(&self.body_text),
            country_tags: f(&self.country_tags),
            topic_tags: f(&self.topic_tags),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_record(url: &str) -> ArticleRecord {
    ArticleRecord {
        url: url.to_string(),
        local_name: "Sample Title".to_string(),
        title: "Sample Title".to_string(),
        subtitle: "Sample subtitle".to_string(),
        published_date: "01/02/2024".to_string(),
        body_text: "Body text.".to_string(),
        country_tags: "Kenya, Uganda".to_string(),
        topic_tags: "Refugees and Migrants".to_string(),
    }
}
