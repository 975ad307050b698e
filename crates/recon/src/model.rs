use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

use shipvoid_io::{RawRecord, SourceKind};

use crate::decimal::Decimal;

// ---------------------------------------------------------------------------
// Normalized records
// ---------------------------------------------------------------------------

/// Canonical join key. `Invalid` records never take part in matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Valid(String),
    Invalid,
}

impl RecordKey {
    pub fn as_valid(&self) -> Option<&str> {
        match self {
            Self::Valid(k) => Some(k),
            Self::Invalid => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid(k) => f.write_str(k),
            Self::Invalid => f.write_str("INVALID"),
        }
    }
}

impl Serialize for RecordKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Most recent tracking event of a Legacy container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestEvent {
    pub at: NaiveDateTime,
    pub status: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizedRecord {
    pub source: SourceKind,
    pub key: RecordKey,
    pub facility: String,
    pub date: Option<NaiveDate>,
    pub quantity: Option<Decimal>,
    pub status: Option<String>,
    pub cost: Option<Decimal>,
    pub origin: Option<String>,
    pub latest_event: Option<LatestEvent>,
    pub row: usize,
    #[serde(skip)]
    pub raw: Arc<RawRecord>,
}

impl NormalizedRecord {
    pub fn source_row(&self) -> SourceRow {
        SourceRow {
            sheet: self.raw.sheet.clone(),
            row: self.row,
        }
    }
}

/// A row in an extract. Row numbers restart on every worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    pub row: usize,
}

impl std::fmt::Display for SourceRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.sheet {
            Some(sheet) => write!(f, "{sheet}!{}", self.row),
            None => write!(f, "{}", self.row),
        }
    }
}

// ---------------------------------------------------------------------------
// Match results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchResult {
    Matched {
        shipvoid: NormalizedRecord,
        legacy: NormalizedRecord,
        /// `shipvoid.quantity - legacy.quantity`; `None` when either is absent.
        delta: Option<Decimal>,
    },
    ShipvoidOnly {
        record: NormalizedRecord,
    },
    LegacyOnly {
        record: NormalizedRecord,
    },
    /// Every record of one source sharing one key, in input order.
    DuplicateKey {
        source: SourceKind,
        key: String,
        records: Vec<NormalizedRecord>,
    },
}

impl MatchResult {
    /// The record a result is grouped under: Shipvoid side for matches,
    /// first record for duplicates.
    pub fn representative(&self) -> &NormalizedRecord {
        match self {
            Self::Matched { shipvoid, .. } => shipvoid,
            Self::ShipvoidOnly { record } | Self::LegacyOnly { record } => record,
            Self::DuplicateKey { records, .. } => &records[0],
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::DuplicateKey { key, .. } => key,
            other => other.representative().key.as_valid().unwrap_or_default(),
        }
    }

    pub fn record_count(&self) -> usize {
        match self {
            Self::Matched { .. } => 2,
            Self::ShipvoidOnly { .. } | Self::LegacyOnly { .. } => 1,
            Self::DuplicateKey { records, .. } => records.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyDerivationWarning {
    pub source: SourceKind,
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateKeyWarning {
    pub source: SourceKind,
    pub key: String,
    pub count: usize,
}

/// Recovered conditions collected over a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconWarning {
    KeyDerivation(KeyDerivationWarning),
    DuplicateKey(DuplicateKeyWarning),
    SheetSkipped {
        source: SourceKind,
        sheet: String,
    },
    UnparsedValue {
        source: SourceKind,
        row: usize,
        column: String,
        value: String,
    },
    Retrieval {
        message: String,
    },
}

impl std::fmt::Display for ReconWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyDerivation(w) => write!(f, "{} row {}: {}", w.source, w.row, w.reason),
            Self::DuplicateKey(w) => {
                write!(f, "{} key '{}' appears {} times", w.source, w.key, w.count)
            }
            Self::SheetSkipped { source, sheet } => {
                write!(f, "{source} sheet '{sheet}' not found, skipped")
            }
            Self::UnparsedValue {
                source,
                row,
                column,
                value,
            } => write!(f, "{source} row {row}: cannot parse {column} '{value}'"),
            Self::Retrieval { message } => write!(f, "retrieval failed: {message}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub matched: usize,
    pub shipvoid_only: usize,
    pub legacy_only: usize,
    /// Number of (source, key) duplicate entries.
    pub duplicate_keys: usize,
    /// Records inside those entries.
    pub duplicate_records: usize,
    pub invalid: usize,
    /// Matched pairs whose quantities differ.
    pub quantity_mismatches: usize,
}

impl OutcomeCounts {
    /// Records these counts account for.
    pub fn records(&self) -> usize {
        2 * self.matched
            + self.shipvoid_only
            + self.legacy_only
            + self.duplicate_records
            + self.invalid
    }

    pub fn has_discrepancies(&self) -> bool {
        self.shipvoid_only > 0
            || self.legacy_only > 0
            || self.duplicate_keys > 0
            || self.invalid > 0
            || self.quantity_mismatches > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_bucket: Option<String>,
    pub counts: OutcomeCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    pub total_raw_records: usize,
    pub shipvoid_records: usize,
    pub legacy_records: usize,
    pub filtered_out: usize,
    pub totals: OutcomeCounts,
    /// First-seen order.
    pub groups: Vec<GroupSummary>,
}

impl ReconciliationSummary {
    pub fn accounted_records(&self) -> usize {
        self.totals.records() + self.filtered_out
    }

    /// Every raw record lands in exactly one outcome.
    pub fn is_balanced(&self) -> bool {
        self.accounted_records() == self.total_raw_records
    }
}

// ---------------------------------------------------------------------------
// Detail rows
// ---------------------------------------------------------------------------

/// A detail cell. `NotApplicable` marks a column that has no meaning for the
/// row's kind, as opposed to a value the extract left blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    Value(T),
    Absent,
    NotApplicable,
}

pub const NOT_APPLICABLE: &str = "n/a";

impl<T> Field<T> {
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Field::Absent, Field::Value)
    }

    pub fn is_applicable(&self) -> bool {
        !matches!(self, Field::NotApplicable)
    }
}

impl<T: ToString> Field<T> {
    /// Flat text for CSV: absent is an empty cell.
    pub fn to_cell(&self) -> String {
        match self {
            Field::Value(v) => v.to_string(),
            Field::Absent => String::new(),
            Field::NotApplicable => NOT_APPLICABLE.to_string(),
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Value(v) => v.serialize(serializer),
            Field::Absent => serializer.serialize_none(),
            Field::NotApplicable => serializer.serialize_str(NOT_APPLICABLE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailKind {
    Matched,
    ShipvoidOnly,
    LegacyOnly,
    DuplicateKey,
    InvalidKey,
}

impl DetailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::ShipvoidOnly => "shipvoid_only",
            Self::LegacyOnly => "legacy_only",
            Self::DuplicateKey => "duplicate_key",
            Self::InvalidKey => "invalid_key",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailRow {
    pub kind: DetailKind,
    pub key: String,
    pub source: Field<SourceKind>,
    pub facility: Field<String>,
    pub date: Field<NaiveDate>,
    pub shipvoid_quantity: Field<Decimal>,
    pub legacy_quantity: Field<Decimal>,
    pub delta: Field<Decimal>,
    pub shipvoid_status: Field<String>,
    pub origin: Field<String>,
    pub cost: Field<Decimal>,
    pub legacy_status: Field<String>,
    pub legacy_event: Field<String>,
    pub legacy_event_at: Field<NaiveDateTime>,
    pub legacy_location: Field<String>,
    pub record_count: usize,
    /// Source rows behind this detail row.
    pub rows: Vec<SourceRow>,
}

impl DetailRow {
    pub const CSV_HEADER: [&'static str; 17] = [
        "kind",
        "key",
        "source",
        "facility",
        "date",
        "shipvoid_quantity",
        "legacy_quantity",
        "delta",
        "shipvoid_status",
        "origin",
        "cost",
        "legacy_status",
        "legacy_event",
        "legacy_event_at",
        "legacy_location",
        "record_count",
        "rows",
    ];

    pub fn csv_record(&self) -> Vec<String> {
        vec![
            self.kind.as_str().to_string(),
            self.key.clone(),
            self.source.to_cell(),
            self.facility.to_cell(),
            self.date.to_cell(),
            self.shipvoid_quantity.to_cell(),
            self.legacy_quantity.to_cell(),
            self.delta.to_cell(),
            self.shipvoid_status.to_cell(),
            self.origin.to_cell(),
            self.cost.to_cell(),
            self.legacy_status.to_cell(),
            self.legacy_event.to_cell(),
            self.legacy_event_at.to_cell(),
            self.legacy_location.to_cell(),
            self.record_count.to_string(),
            self.rows
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(";"),
        ]
    }
}

// ---------------------------------------------------------------------------
// Dashboard stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateCount {
    pub date: NaiveDate,
    pub containers: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShipvoidStats {
    pub total: usize,
    pub by_origin: BTreeMap<String, usize>,
    pub oldest_date: Option<NaiveDate>,
    /// Records whose status is not a billed status.
    pub at_risk_count: usize,
    /// Sum of cost over at-risk records.
    pub potential_cost: Decimal,
    pub undated: usize,
    /// Container count per label date, ascending.
    pub by_label_date: Vec<DateCount>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub facility: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipvoid_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_file: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: ReconciliationSummary,
    pub stats: ShipvoidStats,
    pub details: Vec<DetailRow>,
    pub warnings: Vec<ReconWarning>,
    #[serde(skip)]
    pub results: Vec<MatchResult>,
    #[serde(skip)]
    pub invalid: Vec<NormalizedRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_serialization_distinguishes_absent_and_not_applicable() {
        let v: Field<Decimal> = Field::Value(Decimal::from_int(3));
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"3\"");
        assert_eq!(serde_json::to_string(&Field::<Decimal>::Absent).unwrap(), "null");
        assert_eq!(
            serde_json::to_string(&Field::<Decimal>::NotApplicable).unwrap(),
            "\"n/a\""
        );
        assert_eq!(Field::<String>::Absent.to_cell(), "");
        assert_eq!(Field::<String>::NotApplicable.to_cell(), "n/a");
    }

    #[test]
    fn record_key_serializes_invalid_marker() {
        assert_eq!(serde_json::to_string(&RecordKey::Invalid).unwrap(), "\"INVALID\"");
        assert_eq!(
            serde_json::to_string(&RecordKey::Valid("A|2024-01-05".into())).unwrap(),
            "\"A|2024-01-05\""
        );
    }

    #[test]
    fn counts_account_for_records() {
        let counts = OutcomeCounts {
            matched: 2,
            shipvoid_only: 1,
            legacy_only: 1,
            duplicate_keys: 1,
            duplicate_records: 3,
            invalid: 1,
            quantity_mismatches: 0,
        };
        assert_eq!(counts.records(), 10);
        assert!(counts.has_discrepancies());
        assert!(!OutcomeCounts::default().has_discrepancies());
    }

    #[test]
    fn csv_record_matches_header_width() {
        let row = DetailRow {
            kind: DetailKind::InvalidKey,
            key: "INVALID".into(),
            source: Field::Value(SourceKind::Legacy),
            facility: Field::Value("6006".into()),
            date: Field::Absent,
            shipvoid_quantity: Field::NotApplicable,
            legacy_quantity: Field::Absent,
            delta: Field::NotApplicable,
            shipvoid_status: Field::NotApplicable,
            origin: Field::NotApplicable,
            cost: Field::NotApplicable,
            legacy_status: Field::Absent,
            legacy_event: Field::Absent,
            legacy_event_at: Field::Absent,
            legacy_location: Field::Absent,
            record_count: 1,
            rows: vec![
                SourceRow { sheet: None, row: 7 },
                SourceRow { sheet: Some("Crossdock Data".into()), row: 2 },
            ],
        };
        let record = row.csv_record();
        assert_eq!(record.len(), DetailRow::CSV_HEADER.len());
        assert_eq!(record[0], "invalid_key");
        assert_eq!(record[2], "legacy");
        assert_eq!(record[16], "7;Crossdock Data!2");
    }
}
