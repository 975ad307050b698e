// Delimited-text extract reading (Legacy Unbilled Cartons and friends)

use std::path::Path;

use crate::error::LoadError;
use crate::table::{RawTable, RawValue, SourceKind, TableBuilder};

/// Read a delimited-text file into a table. The first non-blank line is the header.
pub fn read_table(path: &Path, source: SourceKind) -> Result<RawTable, LoadError> {
    let content = read_file_as_utf8(path)?;
    read_table_from_str(&content, path, source)
}

/// Parse already-decoded delimited text. `path` is used for error messages only.
pub fn read_table_from_str(
    content: &str,
    path: &Path,
    source: SourceKind,
) -> Result<RawTable, LoadError> {
    let delimiter = sniff_delimiter(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut builder: Option<TableBuilder> = None;
    let mut skipped = 0usize;

    for result in reader.records() {
        let record = result.map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

        match builder.as_mut() {
            None => {
                if record.iter().all(|f| f.trim().is_empty()) {
                    continue;
                }
                let headers: Vec<String> = record.iter().map(|h| h.trim_start_matches('\u{feff}').to_string()).collect();
                builder = Some(TableBuilder::new(source, None, None, &headers));
            }
            Some(b) => {
                let cells = record.iter().map(RawValue::from_text).collect();
                if !b.push_row(line, cells) {
                    skipped += 1;
                }
            }
        }
    }

    let table = builder
        .ok_or_else(|| LoadError::EmptyFile { path: path.to_path_buf() })?
        .finish();

    tracing::debug!(
        path = %path.display(),
        delimiter = %(delimiter as char).escape_default(),
        rows = table.records.len(),
        blank_rows_skipped = skipped,
        "read delimited extract"
    );
    Ok(table)
}

const DELIMITERS: [u8; 4] = [b'\t', b';', b',', b'|'];
const SNIFF_LINES: usize = 10;

/// Fields on one line when split by `delimiter`, quoting respected.
fn field_count(line: &str, delimiter: u8) -> usize {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    match reader.records().next() {
        Some(Ok(record)) => record.len(),
        _ => 1,
    }
}

/// Pick the delimiter whose split of the header line is repeated most often by
/// the lines below it, weighted by the header's field count. A candidate that
/// leaves the header as a single field never wins; comma is the default.
fn sniff_delimiter(content: &str) -> u8 {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty()).take(SNIFF_LINES);
    let Some(header) = lines.next() else {
        return b',';
    };
    let body: Vec<&str> = lines.collect();

    DELIMITERS
        .iter()
        .filter_map(|&delimiter| {
            let width = field_count(header, delimiter);
            if width < 2 {
                return None;
            }
            let agreeing = 1 + body.iter().filter(|l| field_count(l, delimiter) == width).count();
            Some((agreeing * width, delimiter))
        })
        // Earlier candidates win ties
        .fold(None, |best: Option<(usize, u8)>, (score, delimiter)| match best {
            Some((top, _)) if top >= score => best,
            _ => Some((score, delimiter)),
        })
        .map_or(b',', |(_, delimiter)| delimiter)
}

/// Decode an extract: UTF-8 when valid, otherwise Windows-1252 (Excel's CSV export).
fn decode_extract(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| {
        let (text, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
        tracing::debug!("extract is not UTF-8, decoded as Windows-1252");
        text.into_owned()
    })
}

/// Read a file as text, see [`decode_extract`].
pub fn read_file_as_utf8(path: &Path) -> Result<String, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_extract(bytes))
}
