// Source loading: pick the reader by file type, validate the header schema.

use std::path::{Path, PathBuf};

use crate::error::LoadError;
use crate::table::{RawRecord, RawTable, SourceKind};

pub use crate::xlsx::SheetSpec;

/// Required-column schema checked against every loaded table's header row.
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    /// Columns that must all be present.
    pub required: Vec<String>,
    /// Key columns. Satisfied when all are present, or when `key_fallback` is.
    pub key_columns: Vec<String>,
    pub key_fallback: Option<String>,
}

/// First column a header row lacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingHeader {
    pub column: String,
    /// Set when the column is a key column with a fallback that is also absent.
    pub fallback: Option<String>,
}

impl TableSchema {
    /// Check a table's header. Returns the first missing column.
    pub fn check(&self, table: &RawTable) -> Result<(), MissingHeader> {
        if let Some(missing) = self.required.iter().find(|c| !table.has_column(c)) {
            return Err(MissingHeader {
                column: missing.clone(),
                fallback: None,
            });
        }

        let Some(column) = self.key_columns.iter().find(|c| !table.has_column(c)) else {
            return Ok(());
        };
        match &self.key_fallback {
            Some(fallback) if table.has_column(fallback) => Ok(()),
            fallback => Err(MissingHeader {
                column: column.clone(),
                fallback: fallback.clone(),
            }),
        }
    }
}

/// How to load one source.
#[derive(Debug, Clone, Default)]
pub struct LoadSpec {
    pub schema: TableSchema,
    /// Worksheets to read from a spreadsheet. Empty = first sheet.
    pub sheets: Vec<SheetSpec>,
}

/// Records from one source file.
#[derive(Debug)]
pub struct LoadedSource {
    pub path: PathBuf,
    pub kind: SourceKind,
    pub records: Vec<RawRecord>,
    /// Requested worksheets the file did not contain.
    pub missing_sheets: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Workbook,
    Delimited,
}

fn detect_format(path: &Path) -> Option<FileFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(FileFormat::Workbook),
        "csv" | "tsv" | "txt" => Some(FileFormat::Delimited),
        _ => None,
    }
}

/// Load a source file into raw records, validating the header of every
/// table read. Any failure here is fatal to the run.
pub fn load_source(path: &Path, kind: SourceKind, spec: &LoadSpec) -> Result<LoadedSource, LoadError> {
    if !path.exists() {
        return Err(LoadError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        });
    }

    let format = detect_format(path).ok_or_else(|| LoadError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    let (tables, missing_sheets) = match format {
        FileFormat::Delimited => (vec![crate::csv::read_table(path, kind)?], Vec::new()),
        FileFormat::Workbook => {
            let wb = crate::xlsx::read_sheets(path, kind, &spec.sheets)?;
            (wb.tables, wb.missing_sheets)
        }
    };

    let mut records = Vec::new();
    for table in tables {
        spec.schema.check(&table).map_err(|missing| LoadError::MissingColumn {
            kind,
            path: path.to_path_buf(),
            sheet: table.sheet.clone(),
            column: missing.column,
            fallback: missing.fallback,
        })?;
        records.extend(table.records);
    }

    tracing::info!(
        source = %kind,
        path = %path.display(),
        records = records.len(),
        "loaded extract"
    );

    Ok(LoadedSource {
        path: path.to_path_buf(),
        kind,
        records,
        missing_sheets,
    })
}
