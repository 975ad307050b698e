//! Key derivation and typed field extraction.
//!
//! Each source has its own [`SourceSchema`]; the normalizer reads the raw
//! record through it and produces a [`NormalizedRecord`] with a canonical key.
//! Records whose key cannot be derived get [`RecordKey::Invalid`] and a
//! [`KeyDerivationWarning`]; they are reported, never matched.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use shipvoid_io::{excel_serial_to_datetime, RawRecord, RawValue, SourceKind};

use crate::config::SourceSchema;
use crate::context::RunContext;
use crate::decimal::Decimal;
use crate::error::UnparseableValue;
use crate::model::{KeyDerivationWarning, LatestEvent, NormalizedRecord, RecordKey, ReconWarning};

// Two-digit year layouts come first: `%Y` would read `1/5/24` as year 24.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%y %I:%M:%S %p",
    "%m/%d/%y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%Y/%m/%d"];

/// Earliest year accepted from text; anything before is a misread layout.
const MIN_YEAR: i32 = 1900;

const DATE: UnparseableValue = UnparseableValue { expected: "date" };
const NUMBER: UnparseableValue = UnparseableValue { expected: "number" };

/// Parse a timestamp from text. Accepts ISO and US layouts, RFC 3339, and
/// bare dates (midnight). Years before 1900 are rejected.
pub fn parse_datetime_text(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let parsed = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });
    parsed.filter(|dt| dt.year() >= MIN_YEAR)
}

/// Timestamp of a cell. `Ok(None)` for blank cells, `Err` for content that
/// is not a date.
pub fn parse_timestamp(value: &RawValue) -> Result<Option<NaiveDateTime>, UnparseableValue> {
    match value {
        RawValue::Absent => Ok(None),
        RawValue::DateTime(dt) => Ok(Some(*dt)),
        RawValue::Number(n) => excel_serial_to_datetime(*n).map(Some).ok_or(DATE),
        RawValue::Text(s) => parse_datetime_text(s).map(Some).ok_or(DATE),
    }
}

/// Day of a cell, time of day dropped.
pub fn parse_date(value: &RawValue) -> Result<Option<NaiveDate>, UnparseableValue> {
    parse_timestamp(value).map(|dt| dt.map(|dt| dt.date()))
}

/// Exact decimal of a cell. `Ok(None)` for blank cells.
pub fn parse_decimal(value: &RawValue) -> Result<Option<Decimal>, UnparseableValue> {
    match value {
        RawValue::Absent => Ok(None),
        RawValue::Number(n) => Decimal::from_f64(*n).map(Some).ok_or(NUMBER),
        RawValue::Text(s) => Decimal::parse(s).map(Some).ok_or(NUMBER),
        RawValue::DateTime(_) => Err(NUMBER),
    }
}

/// Numbered event slots (`event_ts_1`, `event_ts_2`, ...) present on a record, ascending.
fn event_slots(raw: &RawRecord) -> Vec<u32> {
    let mut slots: Vec<u32> = raw
        .fields
        .keys()
        .filter_map(|k| k.strip_prefix("event ts "))
        .filter_map(|n| n.trim().parse().ok())
        .collect();
    slots.sort_unstable();
    slots.dedup();
    slots
}

/// The slot with the greatest parseable timestamp. Ties keep the earlier slot.
pub fn latest_event(raw: &RawRecord) -> Option<LatestEvent> {
    let mut best: Option<LatestEvent> = None;
    for n in event_slots(raw) {
        let Ok(Some(at)) = parse_timestamp(raw.get(&format!("event_ts_{n}"))) else {
            continue;
        };
        if best.as_ref().is_some_and(|b| at <= b.at) {
            continue;
        }
        best = Some(LatestEvent {
            at,
            status: raw.get(&format!("status_{n}")).as_text(),
            name: raw.get(&format!("event_type_{n}")).as_text(),
            location: raw.get(&format!("location_id_{n}")).as_text(),
        });
    }
    best
}

/// Normalizes the records of one source.
pub struct Normalizer<'a> {
    source: SourceKind,
    schema: &'a SourceSchema,
    default_facility: &'a str,
}

impl<'a> Normalizer<'a> {
    pub fn new(source: SourceKind, schema: &'a SourceSchema, default_facility: &'a str) -> Self {
        Self {
            source,
            schema,
            default_facility,
        }
    }

    /// Key columns to read for this record: the rule's columns, or the
    /// fallback when the header lacks one of them.
    fn key_columns<'r>(&'r self, raw: &RawRecord) -> Vec<&'r str> {
        let rule = &self.schema.key;
        let complete = rule.columns.iter().all(|c| raw.has_column(c));
        match (&rule.fallback_column, complete) {
            (Some(fallback), false) if raw.has_column(fallback) => vec![fallback.as_str()],
            _ => rule.columns.iter().map(String::as_str).collect(),
        }
    }

    /// Derive the canonical key. `Err` carries the reason it could not be derived.
    fn derive_key(
        &self,
        raw: &RawRecord,
        date: Result<Option<NaiveDate>, UnparseableValue>,
    ) -> Result<String, String> {
        let mut key = String::new();
        for column in self.key_columns(raw) {
            match raw.get(column).as_text() {
                Some(text) => key.push_str(&text),
                None if raw.has_column(column) => {
                    return Err(format!("key column '{column}' is blank"))
                }
                None => return Err(format!("key column '{column}' is missing")),
            }
        }

        if self.schema.key.include_date {
            let column = &self.schema.date_column;
            match date {
                Ok(Some(d)) => {
                    key.push('|');
                    key.push_str(&d.format("%Y-%m-%d").to_string());
                }
                Ok(None) => return Err(format!("date column '{column}' is blank")),
                Err(_) => {
                    let value = raw.get(column).as_text().unwrap_or_default();
                    return Err(format!("date column '{column}' has unparseable value '{value}'"));
                }
            }
        }

        Ok(key)
    }

    fn decimal_column(&self, raw: &RawRecord, column: Option<&String>, ctx: &mut RunContext) -> Option<Decimal> {
        let column = column?;
        let value = raw.get(column);
        match parse_decimal(value) {
            Ok(d) => d,
            Err(_) => {
                ctx.warn(ReconWarning::UnparsedValue {
                    source: self.source,
                    row: raw.row,
                    column: column.clone(),
                    value: value.as_text().unwrap_or_default(),
                });
                None
            }
        }
    }

    pub fn normalize(&self, raw: RawRecord, ctx: &mut RunContext) -> NormalizedRecord {
        let date_value = raw.get(&self.schema.date_column);
        let date = parse_date(date_value);

        let key = match self.derive_key(&raw, date) {
            Ok(key) => RecordKey::Valid(key),
            Err(reason) => {
                ctx.warn(ReconWarning::KeyDerivation(KeyDerivationWarning {
                    source: self.source,
                    row: raw.row,
                    reason,
                }));
                RecordKey::Invalid
            }
        };

        // With the date outside the key, a bad date is only a field problem
        if date.is_err() && !self.schema.key.include_date {
            ctx.warn(ReconWarning::UnparsedValue {
                source: self.source,
                row: raw.row,
                column: self.schema.date_column.clone(),
                value: date_value.as_text().unwrap_or_default(),
            });
        }

        let facility = self
            .schema
            .facility_column
            .as_ref()
            .and_then(|c| raw.get(c).as_text())
            .unwrap_or_else(|| self.default_facility.to_string());

        let status = self
            .schema
            .status_column
            .as_ref()
            .and_then(|c| raw.get(c).as_text())
            .map(|s| s.to_uppercase());

        let quantity = self.decimal_column(&raw, self.schema.quantity_column.as_ref(), ctx);
        let cost = self.decimal_column(&raw, self.schema.cost_column.as_ref(), ctx);
        let latest_event = latest_event(&raw);

        NormalizedRecord {
            source: self.source,
            key,
            facility,
            date: date.ok().flatten(),
            quantity,
            status,
            cost,
            origin: raw.origin.clone(),
            latest_event,
            row: raw.row,
            raw: Arc::new(raw),
        }
    }

    pub fn normalize_all(&self, records: Vec<RawRecord>, ctx: &mut RunContext) -> Vec<NormalizedRecord> {
        let out: Vec<NormalizedRecord> = records.into_iter().map(|r| self.normalize(r, ctx)).collect();
        tracing::debug!(
            source = %self.source,
            records = out.len(),
            invalid = out.iter().filter(|r| !r.key.is_valid()).count(),
            "normalized records"
        );
        out
    }
}
