//! Append-only CSV record store and the seen-URL index built from it.
//!
//! The store file is UTF-8, comma-delimited, with every field double-quoted.
//! The header row is written only when the file is missing or empty. Each
//! [`RecordStore::append`] call renders its rows in memory and hands them to
//! the file in a single open-append-close cycle, so a reader never observes
//! half a row between calls.
//!
//! The store itself does not deduplicate. [`SeenUrls`] is loaded from the
//! store once at startup and consulted before every navigation.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::models::{ArticleRecord, URL_COLUMN};

/// Neutralize characters that could break row boundaries.
///
/// Line feeds become spaces and carriage returns are dropped. Quotes are
/// escaped by the CSV writer, which doubles them inside quoted fields.
pub fn clean_for_csv(text: &str) -> String {
    text.replace('\n', " ").replace('\r', "")
}

/// Append-only tabular store at a fixed path.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record.
    ///
    /// # Errors
    ///
    /// Any filesystem or serialization failure is returned as-is; the store
    /// never retries.
    pub fn append(&self, record: &ArticleRecord) -> Result<(), StoreError> {
        self.append_all(std::slice::from_ref(record))
    }

    /// Append a batch of records in one file write.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display(), rows = records.len()))]
    pub fn append_all(&self, records: &[ArticleRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let needs_header = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(source) => return Err(self.io_error(source)),
        };

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .has_headers(needs_header)
            .from_writer(Vec::new());
        for record in records {
            let cleaned = record.clone().map_fields(clean_for_csv);
            writer.serialize(&cleaned).map_err(|e| self.csv_error(e))?;
        }
        let buf = writer
            .into_inner()
            .map_err(|e| self.io_error(e.into_error()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.write_all(&buf).map_err(|e| self.io_error(e))?;
        file.sync_data().map_err(|e| self.io_error(e))?;

        debug!(bytes = buf.len(), header = needs_header, "Appended rows");
        Ok(())
    }

    /// Read every record back, in file order.
    pub fn read_all(&self) -> Result<Vec<ArticleRecord>, StoreError> {
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        let mut reader = csv::Reader::from_reader(file);
        reader
            .deserialize()
            .collect::<Result<Vec<ArticleRecord>, _>>()
            .map_err(|e| self.csv_error(e))
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> StoreError {
        StoreError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

/// Set of article URLs already persisted, by this run or an earlier one.
#[derive(Debug, Default, Clone)]
pub struct SeenUrls {
    urls: HashSet<String>,
}

impl SeenUrls {
    /// Build the index from the `URL` column of the store at `path`.
    ///
    /// A missing or empty file yields an empty index. Rows with the wrong
    /// field count, such as a final row cut short by a killed process, are
    /// logged and still contribute their URL. Must run before any navigation
    /// so the index covers everything already on disk.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No existing store; starting with an empty index");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let csv_error = |source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(file);
        let headers = reader.headers().map_err(csv_error)?.clone();
        if headers.is_empty() {
            info!("Store is empty; starting with an empty index");
            return Ok(Self::default());
        }
        let column = headers
            .iter()
            .position(|h| h == URL_COLUMN)
            .ok_or_else(|| StoreError::MissingUrlColumn {
                path: path.to_path_buf(),
            })?;

        let mut urls = HashSet::new();
        for row in reader.records() {
            let row = row.map_err(csv_error)?;
            if row.len() != headers.len() {
                warn!(
                    line = row.position().map(|p| p.line()),
                    fields = row.len(),
                    expected = headers.len(),
                    "Malformed store row"
                );
            }
            if let Some(url) = row.get(column).filter(|u| !u.is_empty()) {
                urls.insert(url.to_string());
            }
        }

        info!(count = urls.len(), "Loaded seen URLs");
        Ok(Self { urls })
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Record a URL; returns `false` if it was already present.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FIELD_NAMES, sample_record};

    fn store_in(dir: &tempfile::TempDir) -> RecordStore {
        RecordStore::new(dir.path().join("news.csv"))
    }

    #[test]
    fn test_header_written_once() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);

        for i in 0..5 {
            store
                .append(&sample_record(&format!("https://www.hrw.org/news/2024/01/02/{i}")))
                .unwrap();
        }
        store
            .append_all(&[
                sample_record("https://www.hrw.org/news/2024/01/02/x"),
                sample_record("https://www.hrw.org/news/2024/01/02/y"),
            ])
            .unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        let quoted_header = FIELD_NAMES
            .iter()
            .map(|f| format!("\"{f}\""))
            .collect::<Vec<_>>()
            .join(",");
        assert_eq!(text.matches(&quoted_header).count(), 1);
        assert!(text.starts_with(&quoted_header));
        assert_eq!(store.read_all().unwrap().len(), 7);
    }

    #[test]
    fn test_header_written_into_existing_empty_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        std::fs::write(store.path(), "").unwrap();

        store
            .append(&sample_record("https://www.hrw.org/news/2024/01/02/a"))
            .unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("\"URL\",\"html_name\""));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_every_field_is_quoted() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        store
            .append(&sample_record("https://www.hrw.org/news/2024/01/02/a"))
            .unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert!(row.starts_with("\"https://www.hrw.org/news/2024/01/02/a\","));
        assert!(row.ends_with("\"Refugees and Migrants\""));
        assert_eq!(row.matches("\",\"").count(), FIELD_NAMES.len() - 1);
    }

    #[test]
    fn test_hostile_body_survives_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);

        let mut hostile = sample_record("https://www.hrw.org/news/2024/01/02/hostile");
        hostile.body_text = "He said \"stop\",\nthen left.\r\nEnd \"\"quoted\"\"".to_string();
        hostile.title = "Line\rbreak".to_string();
        store.append(&hostile).unwrap();
        store
            .append(&sample_record("https://www.hrw.org/news/2024/01/02/next"))
            .unwrap();

        let rows = store.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].body_text,
            "He said \"stop\", then left. End \"\"quoted\"\""
        );
        assert_eq!(rows[0].title, "Linebreak");
        assert_eq!(rows[1].url, "https://www.hrw.org/news/2024/01/02/next");
    }

    #[test]
    fn test_load_seen_urls_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let seen = SeenUrls::load(&tmp.path().join("absent.csv")).unwrap();
        assert!(seen.is_empty());
    }

    #[test]
    fn test_load_seen_urls_empty_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();
        assert!(SeenUrls::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_load_seen_urls_reads_url_column() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        store
            .append_all(&[
                sample_record("https://www.hrw.org/news/2024/01/02/a"),
                sample_record("https://www.hrw.org/news/2024/01/03/b"),
            ])
            .unwrap();

        let mut seen = SeenUrls::load(store.path()).unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.contains("https://www.hrw.org/news/2024/01/02/a"));
        assert!(!seen.contains("https://www.hrw.org/news/2024/01/04/c"));
        assert!(!seen.insert("https://www.hrw.org/news/2024/01/03/b"));
        assert!(seen.insert("https://www.hrw.org/news/2024/01/04/c"));
    }

    #[test]
    fn test_load_seen_urls_tolerates_truncated_last_row() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        store
            .append(&sample_record("https://www.hrw.org/news/2024/01/02/a"))
            .unwrap();
        let mut file = OpenOptions::new().append(true).open(store.path()).unwrap();
        file.write_all(b"\"https://www.hrw.org/news/2024/01/03/b\",\"Cut Off").unwrap();

        let seen = SeenUrls::load(store.path()).unwrap();

        assert_eq!(seen.len(), 2);
        assert!(seen.contains("https://www.hrw.org/news/2024/01/03/b"));
    }

    #[test]
    fn test_load_seen_urls_rejects_foreign_header() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("foreign.csv");
        std::fs::write(&path, "\"link\",\"title\"\n\"a\",\"b\"\n").unwrap();
        let err = SeenUrls::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::MissingUrlColumn { .. }));
    }

    #[test]
    fn test_clean_for_csv() {
        assert_eq!(clean_for_csv("a\nb\r\nc\"d"), "a b c\"d");
    }
}
