use std::path::PathBuf;

use thiserror::Error;

use crate::table::SourceKind;

/// Fatal load failure. A run that hits one produces no report.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File missing or unreadable.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// File exists but cannot be parsed as tabular data.
    #[error("{}: not readable as a table: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },
    /// Extension is neither a spreadsheet nor delimited text.
    #[error(
        "{}: unsupported file type (expected .xlsx, .xlsm, .xls, .xlsb, .ods, .csv, .tsv or .txt)",
        .path.display()
    )]
    UnsupportedFormat { path: PathBuf },
    /// None of the reconciliation sheets exist in the workbook.
    #[error("{}: none of the sheets {expected:?} were found (available: {available:?})", .path.display())]
    NoSheets {
        path: PathBuf,
        expected: Vec<String>,
        available: Vec<String>,
    },
    /// No header row.
    #[error("{}: file has no header row", .path.display())]
    EmptyFile { path: PathBuf },
    /// A required column is absent from the header row.
    #[error(
        "{kind} extract {}{}: missing required column '{column}'{}",
        .path.display(),
        sheet_suffix(.sheet),
        fallback_suffix(.fallback)
    )]
    MissingColumn {
        kind: SourceKind,
        path: PathBuf,
        sheet: Option<String>,
        column: String,
        /// Column that would have stood in for the missing key column.
        fallback: Option<String>,
    },
}

fn sheet_suffix(sheet: &Option<String>) -> String {
    match sheet {
        Some(name) => format!(" (sheet '{name}')"),
        None => String::new(),
    }
}

fn fallback_suffix(fallback: &Option<String>) -> String {
    match fallback {
        Some(name) => format!(" (or fallback '{name}')"),
        None => String::new(),
    }
}
