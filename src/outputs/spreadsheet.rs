//! Spreadsheet (`.xlsx`) output.
//!
//! [`export_store`] converts the whole record store into one workbook with
//! the same column order and no filtering. [`write_table`] is shared with the
//! yearly partition step.

use std::path::Path;

use csv::StringRecord;
use rust_xlsxwriter::{Format, Workbook};
use tracing::{info, instrument, warn};

use crate::error::OutputError;

/// Longest string a single spreadsheet cell can hold.
pub const MAX_CELL_CHARS: usize = 32_767;

fn cell_text(text: &str, row: usize, col: usize) -> String {
    if text.chars().count() <= MAX_CELL_CHARS {
        return text.to_string();
    }
    warn!(row, col, chars = text.chars().count(), "Cell exceeds spreadsheet limit; truncating");
    text.chars().take(MAX_CELL_CHARS).collect()
}

/// Write a header row plus data rows into a single-sheet workbook at `path`,
/// replacing any existing file. Returns the number of data rows written.
pub fn write_table<'a, I, R>(path: &Path, header: &[&str], rows: I) -> Result<usize, OutputError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = &'a str>,
{
    let xlsx_error = |source| OutputError::Spreadsheet {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    for (col, name) in header.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *name, &bold)
            .map_err(xlsx_error)?;
    }

    let mut written = 0usize;
    for (i, row) in rows.into_iter().enumerate() {
        let row_num = u32::try_from(i + 1).unwrap_or(u32::MAX);
        for (col, value) in row.into_iter().enumerate() {
            worksheet
                .write_string(row_num, col as u16, cell_text(value, i + 1, col))
                .map_err(xlsx_error)?;
        }
        written += 1;
    }

    workbook.save(path).map_err(xlsx_error)?;
    Ok(written)
}

/// Convert the CSV store at `store_path` into a workbook at `output_path`.
#[instrument(level = "info", skip_all, fields(store = %store_path.display(), output = %output_path.display()))]
pub fn export_store(store_path: &Path, output_path: &Path) -> Result<usize, OutputError> {
    let csv_error = |source| OutputError::Csv {
        path: store_path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(store_path).map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?.clone();
    let records = reader
        .records()
        .collect::<Result<Vec<StringRecord>, _>>()
        .map_err(csv_error)?;

    let header: Vec<&str> = headers.iter().collect();
    let written = write_table(output_path, &header, records.iter().map(|r| r.iter()))?;
    info!(rows = written, "Spreadsheet created");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_record;
    use crate::store::RecordStore;

    #[test]
    fn test_cell_text_truncates_oversized_values() {
        let long = "x".repeat(MAX_CELL_CHARS + 10);
        assert_eq!(cell_text(&long, 1, 5).chars().count(), MAX_CELL_CHARS);
        assert_eq!(cell_text("short", 1, 0), "short");
    }

    #[test]
    fn test_export_store_writes_workbook() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::new(tmp.path().join("news.csv"));
        store
            .append_all(&[
                sample_record("https://www.hrw.org/news/2024/01/02/a"),
                sample_record("https://www.hrw.org/news/2024/01/03/b"),
            ])
            .unwrap();
        let output = tmp.path().join("news.xlsx");

        let rows = export_store(store.path(), &output).unwrap();

        assert_eq!(rows, 2);
        let bytes = std::fs::read(&output).unwrap();
        // xlsx files are zip archives.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_export_missing_store_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = export_store(&tmp.path().join("absent.csv"), &tmp.path().join("out.xlsx"))
            .unwrap_err();
        assert!(matches!(err, OutputError::Csv { .. }));
    }
}
