use std::collections::{BTreeMap, BTreeSet};

use shipvoid_io::SourceKind;

use crate::context::RunContext;
use crate::model::{DuplicateKeyWarning, MatchResult, NormalizedRecord, ReconWarning};

fn group_by_key(records: Vec<NormalizedRecord>) -> BTreeMap<String, Vec<NormalizedRecord>> {
    let mut groups: BTreeMap<String, Vec<NormalizedRecord>> = BTreeMap::new();
    for record in records {
        // Invalid keys are partitioned out before matching
        let Some(key) = record.key.as_valid().map(str::to_string) else {
            continue;
        };
        groups.entry(key).or_default().push(record);
    }
    groups
}

fn duplicate(
    source: SourceKind,
    key: &str,
    records: Vec<NormalizedRecord>,
    ctx: &mut RunContext,
) -> MatchResult {
    ctx.warn(ReconWarning::DuplicateKey(DuplicateKeyWarning {
        source,
        key: key.to_string(),
        count: records.len(),
    }));
    MatchResult::DuplicateKey {
        source,
        key: key.to_string(),
        records,
    }
}

/// Match Shipvoid against Legacy by exact canonical key.
///
/// Every input record appears in exactly one result. Output is sorted by key;
/// within a key Shipvoid results precede Legacy results. A key held by more
/// than one record of a source yields a single `DuplicateKey` for that source,
/// and the other side's lone record (if any) stays unmatched.
pub fn match_records(
    shipvoid: Vec<NormalizedRecord>,
    legacy: Vec<NormalizedRecord>,
    ctx: &mut RunContext,
) -> Vec<MatchResult> {
    let mut sv_map = group_by_key(shipvoid);
    let mut lg_map = group_by_key(legacy);

    let keys: BTreeSet<String> = sv_map.keys().chain(lg_map.keys()).cloned().collect();
    let mut results = Vec::with_capacity(keys.len());

    for key in &keys {
        let sv = sv_map.remove(key).unwrap_or_default();
        let lg = lg_map.remove(key).unwrap_or_default();

        if sv.len() == 1 && lg.len() == 1 {
            let (Some(shipvoid), Some(legacy)) = (sv.into_iter().next(), lg.into_iter().next()) else {
                continue;
            };
            let delta = match (&shipvoid.quantity, &legacy.quantity) {
                (Some(a), Some(b)) => Some(a - b),
                _ => None,
            };
            results.push(MatchResult::Matched {
                shipvoid,
                legacy,
                delta,
            });
            continue;
        }

        match sv.len() {
            0 => {}
            1 => results.extend(sv.into_iter().map(|record| MatchResult::ShipvoidOnly { record })),
            _ => results.push(duplicate(SourceKind::Shipvoid, key, sv, ctx)),
        }
        match lg.len() {
            0 => {}
            1 => results.extend(lg.into_iter().map(|record| MatchResult::LegacyOnly { record })),
            _ => results.push(duplicate(SourceKind::Legacy, key, lg, ctx)),
        }
    }

    tracing::debug!(
        keys = keys.len(),
        results = results.len(),
        "matched records"
    );
    results
}
