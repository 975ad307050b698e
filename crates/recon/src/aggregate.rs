use std::collections::HashMap;

use shipvoid_io::SourceKind;

use crate::config::{GroupDimension, ReconConfig};
use crate::model::{
    DetailKind, DetailRow, Field, GroupSummary, MatchResult, NormalizedRecord, OutcomeCounts,
};

/// Folded match results: totals, per-group counts, and flat detail rows.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub totals: OutcomeCounts,
    pub groups: Vec<GroupSummary>,
    pub details: Vec<DetailRow>,
}

type GroupKey = (Option<String>, Option<String>);

/// Groups in first-seen order.
struct Groups<'c> {
    config: &'c ReconConfig,
    index: HashMap<GroupKey, usize>,
    groups: Vec<GroupSummary>,
}

impl<'c> Groups<'c> {
    fn new(config: &'c ReconConfig) -> Self {
        Self {
            config,
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn key_for(&self, record: &NormalizedRecord) -> GroupKey {
        let by = |dim| self.config.group_by.contains(&dim);
        let facility = by(GroupDimension::Facility).then(|| record.facility.clone());
        let bucket = by(GroupDimension::DateBucket).then(|| match record.date {
            Some(d) => self.config.date_bucket.label(d),
            None => "none".to_string(),
        });
        (facility, bucket)
    }

    fn counts(&mut self, record: &NormalizedRecord) -> &mut OutcomeCounts {
        let key = self.key_for(record);
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.groups.push(GroupSummary {
                    facility: key.0.clone(),
                    date_bucket: key.1.clone(),
                    counts: OutcomeCounts::default(),
                });
                self.index.insert(key, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        &mut self.groups[idx].counts
    }
}

fn tally(counts: &mut OutcomeCounts, result: &MatchResult) {
    match result {
        MatchResult::Matched { delta, .. } => {
            counts.matched += 1;
            if delta.as_ref().is_some_and(|d| !d.is_zero()) {
                counts.quantity_mismatches += 1;
            }
        }
        MatchResult::ShipvoidOnly { .. } => counts.shipvoid_only += 1,
        MatchResult::LegacyOnly { .. } => counts.legacy_only += 1,
        MatchResult::DuplicateKey { records, .. } => {
            counts.duplicate_keys += 1;
            counts.duplicate_records += records.len();
        }
    }
}

/// Fold results and invalid-keyed records into counts and detail rows.
/// Each result counts toward the group of its representative record.
pub fn aggregate(results: &[MatchResult], invalid: &[NormalizedRecord], config: &ReconConfig) -> Aggregation {
    let mut totals = OutcomeCounts::default();
    let mut groups = Groups::new(config);
    let mut details = Vec::with_capacity(results.len() + invalid.len());

    for result in results {
        tally(&mut totals, result);
        tally(groups.counts(result.representative()), result);
        details.push(detail_row(result));
    }

    for record in invalid {
        totals.invalid += 1;
        groups.counts(record).invalid += 1;
        details.push(invalid_row(record));
    }

    tracing::debug!(
        groups = groups.groups.len(),
        details = details.len(),
        "aggregated results"
    );

    Aggregation {
        totals,
        groups: groups.groups,
        details,
    }
}

// ---------------------------------------------------------------------------
// Detail rows
// ---------------------------------------------------------------------------

fn blank_row(kind: DetailKind, key: String) -> DetailRow {
    DetailRow {
        kind,
        key,
        source: Field::NotApplicable,
        facility: Field::NotApplicable,
        date: Field::NotApplicable,
        shipvoid_quantity: Field::NotApplicable,
        legacy_quantity: Field::NotApplicable,
        delta: Field::NotApplicable,
        shipvoid_status: Field::NotApplicable,
        origin: Field::NotApplicable,
        cost: Field::NotApplicable,
        legacy_status: Field::NotApplicable,
        legacy_event: Field::NotApplicable,
        legacy_event_at: Field::NotApplicable,
        legacy_location: Field::NotApplicable,
        record_count: 0,
        rows: Vec::new(),
    }
}

fn fill_common(row: &mut DetailRow, rec: &NormalizedRecord) {
    row.facility = Field::Value(rec.facility.clone());
    row.date = Field::from_option(rec.date);
}

fn fill_shipvoid(row: &mut DetailRow, rec: &NormalizedRecord) {
    row.shipvoid_quantity = Field::from_option(rec.quantity.clone());
    row.shipvoid_status = Field::from_option(rec.status.clone());
    row.origin = Field::from_option(rec.origin.clone());
    row.cost = Field::from_option(rec.cost.clone());
}

fn fill_legacy(row: &mut DetailRow, rec: &NormalizedRecord) {
    row.legacy_quantity = Field::from_option(rec.quantity.clone());
    let event = rec.latest_event.as_ref();
    row.legacy_status = Field::from_option(event.and_then(|e| e.status.clone()));
    row.legacy_event = Field::from_option(event.and_then(|e| e.name.clone()));
    row.legacy_event_at = Field::from_option(event.map(|e| e.at));
    row.legacy_location = Field::from_option(event.and_then(|e| e.location.clone()));
}

fn fill_single(row: &mut DetailRow, rec: &NormalizedRecord) {
    row.source = Field::Value(rec.source);
    fill_common(row, rec);
    match rec.source {
        SourceKind::Shipvoid => fill_shipvoid(row, rec),
        SourceKind::Legacy => fill_legacy(row, rec),
    }
    row.record_count = 1;
    row.rows = vec![rec.source_row()];
}

fn detail_row(result: &MatchResult) -> DetailRow {
    let key = result.key().to_string();
    match result {
        MatchResult::Matched {
            shipvoid,
            legacy,
            delta,
        } => {
            let mut row = blank_row(DetailKind::Matched, key);
            fill_common(&mut row, shipvoid);
            fill_shipvoid(&mut row, shipvoid);
            fill_legacy(&mut row, legacy);
            row.delta = Field::from_option(delta.clone());
            row.record_count = 2;
            row.rows = vec![shipvoid.source_row(), legacy.source_row()];
            row
        }
        MatchResult::ShipvoidOnly { record } => {
            let mut row = blank_row(DetailKind::ShipvoidOnly, key);
            fill_single(&mut row, record);
            row
        }
        MatchResult::LegacyOnly { record } => {
            let mut row = blank_row(DetailKind::LegacyOnly, key);
            fill_single(&mut row, record);
            row
        }
        MatchResult::DuplicateKey { source, records, .. } => {
            // Quantities of duplicate rows are never summed
            let mut row = blank_row(DetailKind::DuplicateKey, key);
            row.source = Field::Value(*source);
            if let Some(first) = records.first() {
                fill_common(&mut row, first);
            }
            row.record_count = records.len();
            row.rows = records.iter().map(NormalizedRecord::source_row).collect();
            row
        }
    }
}

fn invalid_row(record: &NormalizedRecord) -> DetailRow {
    let mut row = blank_row(DetailKind::InvalidKey, record.key.to_string());
    fill_single(&mut row, record);
    row
}
