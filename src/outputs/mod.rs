//! Derived outputs built from the record store after a crawl.
//!
//! # Submodules
//!
//! - [`partition`]: Regroups the store into one CSV (and workbook) per publish year
//! - [`spreadsheet`]: Converts the store, or any table of strings, into `.xlsx`
//!
//! Neither step touches the store itself; both can be rerun at any time.

pub mod partition;
pub mod spreadsheet;
