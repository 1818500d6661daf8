//! Yearly partition of the record store.
//!
//! Regroups every stored row by the calendar year of its `Date` column and
//! writes one CSV (and optionally one spreadsheet) per year. The partition is
//! regenerated wholesale from the full store on every run.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 2023/
//! │   ├── hrw-2023.csv
//! │   └── hrw-2023.xlsx
//! └── 2024/
//!     ├── hrw-2024.csv
//!     └── hrw-2024.xlsx
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, WriterBuilder};
use tracing::{info, instrument};

use crate::error::OutputError;
use crate::models::{ArticleRecord, FIELD_NAMES};
use crate::outputs::spreadsheet;
use crate::store::RecordStore;
use crate::utils::strip_control_chars;

/// Options for [`partition_by_year`].
#[derive(Debug, Clone)]
pub struct PartitionOptions {
    pub output_dir: PathBuf,
    /// File stem prefix, e.g. `hrw` for `hrw-2024.csv`.
    pub prefix: String,
    pub spreadsheets: bool,
}

/// Read every row of the store, with control characters stripped from all fields.
fn read_clean_rows(store_path: &Path) -> Result<Vec<ArticleRecord>, OutputError> {
    let rows = RecordStore::new(store_path).read_all()?;
    Ok(rows
        .into_iter()
        .map(|r| r.map_fields(strip_control_chars))
        .collect())
}

/// Group rows by publish year, keeping store order within each year.
pub fn group_by_year(
    rows: Vec<ArticleRecord>,
) -> Result<BTreeMap<i32, Vec<ArticleRecord>>, OutputError> {
    let mut by_year: BTreeMap<i32, Vec<ArticleRecord>> = BTreeMap::new();
    for row in rows {
        let year = row.year().ok_or_else(|| OutputError::BadDate {
            url: row.url.clone(),
            date: row.published_date.clone(),
        })?;
        by_year.entry(year).or_default().push(row);
    }
    Ok(by_year)
}

fn write_year_csv(path: &Path, rows: &[ArticleRecord]) -> Result<(), OutputError> {
    let file = File::create(path).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let csv_error = |source| OutputError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(file);
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Split the store at `store_path` into per-year files.
///
/// Returns the number of rows written for each year.
///
/// # Errors
///
/// Fails on the first unreadable store row, unparseable `Date`, or write
/// failure. Files already written for other years are left in place.
#[instrument(level = "info", skip_all, fields(store = %store_path.display(), output_dir = %options.output_dir.display()))]
pub fn partition_by_year(
    store_path: &Path,
    options: &PartitionOptions,
) -> Result<BTreeMap<i32, usize>, OutputError> {
    let by_year = group_by_year(read_clean_rows(store_path)?)?;

    let mut counts = BTreeMap::new();
    for (year, rows) in &by_year {
        let year_dir = options.output_dir.join(year.to_string());
        fs::create_dir_all(&year_dir).map_err(|source| OutputError::Io {
            path: year_dir.clone(),
            source,
        })?;

        let stem = format!("{}-{year}", options.prefix);
        write_year_csv(&year_dir.join(format!("{stem}.csv")), rows)?;
        if options.spreadsheets {
            spreadsheet::write_table(
                &year_dir.join(format!("{stem}.xlsx")),
                &FIELD_NAMES,
                rows.iter().map(ArticleRecord::fields),
            )?;
        }

        info!(year, rows = rows.len(), "Wrote yearly partition");
        counts.insert(*year, rows.len());
    }
    Ok(counts)
}
