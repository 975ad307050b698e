// Raw tabular data: normalized headers, untyped cell values, provenance.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Which extract a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Shipvoid,
    Legacy,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shipvoid => "shipvoid",
            Self::Legacy => "legacy",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An untyped cell value. `Absent` is the sentinel for blank cells and for
/// columns the file does not carry.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Absent,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

static ABSENT: RawValue = RawValue::Absent;

impl RawValue {
    /// Build from a text cell. Whitespace-only text is `Absent`.
    pub fn from_text(s: &str) -> Self {
        if s.trim().is_empty() {
            Self::Absent
        } else {
            Self::Text(s.to_string())
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Trimmed textual form, `None` when absent.
    ///
    /// Integral numbers render without decimals so a spreadsheet `6031.0`
    /// and a CSV `6031` produce the same text.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Absent => None,
            Self::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t.to_string())
                }
            }
            Self::Number(n) => Some(format_number(*n)),
            Self::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

/// Format a float the way a spreadsheet user reads it: integers without decimals.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Convert an Excel serial date (1900 date system) to a date-time.
///
/// Serial 1 is 1900-01-01; the epoch is shifted to 1899-12-30 to absorb
/// Excel's phantom 1900-02-29. Serials before 61 are off by one, matching Excel.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial >= 2_958_466.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let secs = (serial.fract() * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::days(days) + Duration::seconds(secs))
}

/// Normalize a header for lookup: trim, lowercase, collapse whitespace and
/// underscores into single spaces. `" Carton_Number "` → `"carton number"`.
pub fn normalize_header(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || c == '_')
        .filter(|part| !part.is_empty())
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// One data row. Field names are normalized headers.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub source: SourceKind,
    /// Worksheet the row came from (spreadsheets only).
    pub sheet: Option<String>,
    /// Label attached to the worksheet, e.g. "In House".
    pub origin: Option<String>,
    /// 1-based row number in the file or sheet; the header is row 1.
    pub row: usize,
    pub fields: BTreeMap<String, RawValue>,
}

impl RawRecord {
    /// Look up a column by any spelling of its header. Columns the file does
    /// not carry yield [`RawValue::Absent`].
    pub fn get(&self, column: &str) -> &RawValue {
        self.fields.get(&normalize_header(column)).unwrap_or(&ABSENT)
    }

    /// Whether the header row carried this column, blank or not.
    pub fn has_column(&self, column: &str) -> bool {
        self.fields.contains_key(&normalize_header(column))
    }
}

/// Header + rows read from one file or worksheet.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub sheet: Option<String>,
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl RawTable {
    pub fn has_column(&self, column: &str) -> bool {
        let wanted = normalize_header(column);
        self.headers.iter().any(|h| *h == wanted)
    }
}

/// Accumulates rows under a normalized header, dropping blank rows.
pub(crate) struct TableBuilder {
    source: SourceKind,
    sheet: Option<String>,
    origin: Option<String>,
    headers: Vec<String>,
    records: Vec<RawRecord>,
}

impl TableBuilder {
    pub(crate) fn new(
        source: SourceKind,
        sheet: Option<String>,
        origin: Option<String>,
        raw_headers: &[String],
    ) -> Self {
        let mut headers = Vec::with_capacity(raw_headers.len());
        for (i, h) in raw_headers.iter().enumerate() {
            let mut name = normalize_header(h);
            if name.is_empty() {
                name = format!("column {}", i + 1);
            }
            if headers.contains(&name) {
                tracing::debug!(header = %name, "duplicate header, keeping first occurrence");
            }
            headers.push(name);
        }
        Self {
            source,
            sheet,
            origin,
            headers,
            records: Vec::new(),
        }
    }

    /// Add a row. Returns false when the row was blank and skipped.
    pub(crate) fn push_row(&mut self, row: usize, cells: Vec<RawValue>) -> bool {
        if cells.iter().all(RawValue::is_absent) {
            return false;
        }

        let mut fields = BTreeMap::new();
        let mut cells = cells.into_iter();
        for header in &self.headers {
            let value = cells.next().unwrap_or(RawValue::Absent);
            fields.entry(header.clone()).or_insert(value);
        }

        self.records.push(RawRecord {
            source: self.source,
            sheet: self.sheet.clone(),
            origin: self.origin.clone(),
            row,
            fields,
        });
        true
    }

    pub(crate) fn finish(self) -> RawTable {
        RawTable {
            sheet: self.sheet,
            headers: self.headers,
            records: self.records,
        }
    }
}
