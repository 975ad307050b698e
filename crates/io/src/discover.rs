//! Newest-extract discovery in a local directory.
//!
//! Extract files are named like `Shipvoid Forecast 01-30-2025_0600.xlsm`. The
//! stamp in the name decides which file is newest; files without a stamp fall
//! back to their modification time.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Local};
use regex::Regex;

fn stamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // MM-DD-YYYY_HHMM
    PATTERN.get_or_init(|| Regex::new(r"(\d{2})-(\d{2})-(\d{4})_(\d{4})").expect("valid regex"))
}

/// Sortable `YYYYMMDD_HHMM` stamp parsed from a file name.
pub fn filename_stamp(name: &str) -> Option<String> {
    let caps = stamp_pattern().captures(name)?;
    Some(format!("{}{}{}_{}", &caps[3], &caps[1], &caps[2], &caps[4]))
}

fn sort_stamp(path: &Path) -> String {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if let Some(stamp) = filename_stamp(name) {
        return stamp;
    }
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|t| DateTime::<Local>::from(t).format("%Y%m%d_%H%M").to_string())
        .unwrap_or_default()
}

/// Find the newest file in `dir` matching `pattern` (a glob such as `Shipvoid*.xlsm`).
pub fn find_newest(dir: &Path, pattern: &str) -> Result<Option<PathBuf>, glob::PatternError> {
    let full = format!("{}/{}", glob::Pattern::escape(&dir.to_string_lossy()), pattern);
    let mut files: Vec<(String, PathBuf)> = glob::glob(&full)?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .map(|p| (sort_stamp(&p), p))
        .collect();

    if files.is_empty() {
        return Ok(None);
    }

    // Newest first; file name breaks ties so the choice is stable
    files.sort_by(|a, b| b.cmp(a));
    tracing::debug!(
        dir = %dir.display(),
        pattern,
        candidates = files.len(),
        chosen = %files[0].1.display(),
        "selected newest extract"
    );
    Ok(files.into_iter().next().map(|(_, p)| p))
}

/// Try patterns in order, returning the newest match of the first pattern that matches anything.
pub fn find_newest_any(dir: &Path, patterns: &[String]) -> Result<Option<PathBuf>, glob::PatternError> {
    for pattern in patterns {
        if let Some(found) = find_newest(dir, pattern)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}
