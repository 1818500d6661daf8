//! Utility functions for text normalization, slugs and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Slug derivation for archived page filenames
//! - Whitespace and control-character normalization for stored text
//! - String truncation for logging
//! - File system validation for output directories

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs as stdfs;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9\s\-_]").expect("valid slug regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x1f\x7f-\x9f]").expect("valid control-char regex"));

/// Slug used when a title has no character that survives sanitizing.
pub const FALLBACK_SLUG: &str = "article";

/// Derive a filesystem-safe name from an article title.
///
/// `/` and `:` become `-`, every character outside `[A-Za-z0-9 _-]` is
/// dropped, whitespace runs collapse to a single space, and leading or
/// trailing whitespace, underscores and dots are trimmed. The function is
/// pure and idempotent.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("Kenya: Police Abuses"), "Kenya- Police Abuses");
/// assert_eq!(slugify_title("_Q&A  on   Gaza_."), "QA on Gaza");
/// ```
pub fn slugify_title(title: &str) -> String {
    let replaced = title.replace(['/', ':'], "-");
    let kept = NON_SLUG_CHARS.replace_all(&replaced, "");
    let collapsed = WHITESPACE_RUN.replace_all(kept.trim(), " ");
    let trimmed = collapsed.trim_matches(|c: char| c == '_' || c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Collapse every whitespace run (including line breaks) to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove ASCII and C1 control characters.
pub fn strip_control_chars(text: &str) -> String {
    CONTROL_CHARS.replace_all(text, "").into_owned()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes on a character boundary with
/// an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable
/// (permission denied, read-only filesystem, etc.).
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
