// Spreadsheet extract reading (xlsx, xlsm, xls, xlsb, ods) via calamine

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::LoadError;
use crate::table::{excel_serial_to_datetime, normalize_header, RawTable, RawValue, SourceKind, TableBuilder};

/// A worksheet to read and the label its rows carry (e.g. "In House").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSpec {
    pub name: String,
    pub origin: Option<String>,
}

/// Tables read from a workbook plus the requested sheets that were not there.
#[derive(Debug)]
pub struct WorkbookTables {
    pub tables: Vec<RawTable>,
    pub missing_sheets: Vec<String>,
}

/// Read the requested sheets. Sheet names are matched the way headers are
/// (case and spacing insensitive). With no sheets requested, the first sheet
/// is read. Fails with [`LoadError::NoSheets`] when none of the requested
/// sheets exist.
pub fn read_sheets(
    path: &Path,
    source: SourceKind,
    sheets: &[SheetSpec],
) -> Result<WorkbookTables, LoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        reason: format!("failed to open workbook: {e}"),
    })?;

    let available: Vec<String> = workbook.sheet_names().to_vec();
    if available.is_empty() {
        return Err(LoadError::NoSheets {
            path: path.to_path_buf(),
            expected: sheets.iter().map(|s| s.name.clone()).collect(),
            available,
        });
    }

    let wanted: Vec<SheetSpec> = if sheets.is_empty() {
        vec![SheetSpec {
            name: available[0].clone(),
            origin: None,
        }]
    } else {
        sheets.to_vec()
    };

    let mut tables = Vec::new();
    let mut missing_sheets = Vec::new();

    for spec in &wanted {
        let target = normalize_header(&spec.name);
        let Some(actual) = available.iter().find(|n| normalize_header(n) == target) else {
            tracing::warn!(path = %path.display(), sheet = %spec.name, "sheet not found, skipping");
            missing_sheets.push(spec.name.clone());
            continue;
        };

        let range = workbook.worksheet_range(actual).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            reason: format!("failed to read sheet '{actual}': {e}"),
        })?;

        // Range start offset (data may not begin at A1)
        let start_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);

        let mut builder: Option<TableBuilder> = None;
        let mut skipped = 0usize;

        for (idx, row) in range.rows().enumerate() {
            let row_number = start_row + idx + 1;
            let cells: Vec<RawValue> = row.iter().map(cell_value).collect();

            match builder.as_mut() {
                None => {
                    if cells.iter().all(RawValue::is_absent) {
                        continue;
                    }
                    let headers: Vec<String> = cells
                        .iter()
                        .map(|c| c.as_text().unwrap_or_default())
                        .collect();
                    builder = Some(TableBuilder::new(
                        source,
                        Some(actual.clone()),
                        spec.origin.clone(),
                        &headers,
                    ));
                }
                Some(b) => {
                    if !b.push_row(row_number, cells) {
                        skipped += 1;
                    }
                }
            }
        }

        let table = match builder {
            Some(b) => b.finish(),
            None => RawTable {
                sheet: Some(actual.clone()),
                headers: Vec::new(),
                records: Vec::new(),
            },
        };

        tracing::debug!(
            path = %path.display(),
            sheet = %actual,
            rows = table.records.len(),
            blank_rows_skipped = skipped,
            "read worksheet"
        );
        tables.push(table);
    }

    if tables.is_empty() {
        return Err(LoadError::NoSheets {
            path: path.to_path_buf(),
            expected: wanted.into_iter().map(|s| s.name).collect(),
            available,
        });
    }

    Ok(WorkbookTables {
        tables,
        missing_sheets,
    })
}

fn cell_value(cell: &Data) -> RawValue {
    match cell {
        Data::Empty => RawValue::Absent,
        Data::String(s) => RawValue::from_text(s),
        Data::Float(n) => RawValue::Number(*n),
        Data::Int(n) => RawValue::Number(*n as f64),
        Data::Bool(b) => RawValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => RawValue::Text(format!("#{:?}", e)),
        // Assumes the 1900 date system, like most workbooks
        Data::DateTime(dt) => match excel_serial_to_datetime(dt.as_f64()) {
            Some(value) => RawValue::DateTime(value),
            None => RawValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => RawValue::from_text(s),
        Data::DurationIso(s) => RawValue::from_text(s),
    }
}
