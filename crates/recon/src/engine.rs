use std::path::Path;

use shipvoid_io::{load_source, RawRecord, SourceKind};

use crate::aggregate::aggregate;
use crate::config::ReconConfig;
use crate::context::RunContext;
use crate::error::ReconError;
use crate::matcher::match_records;
use crate::model::{NormalizedRecord, ReconMeta, ReconReport, ReconWarning, ReconciliationSummary};
use crate::normalize::Normalizer;
use crate::stats::shipvoid_stats;

/// Raw records of both sources, already loaded.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub shipvoid: Vec<RawRecord>,
    pub legacy: Vec<RawRecord>,
}

/// Load both extracts and reconcile them. Fails fast on any load error; no
/// partial report is produced.
pub fn reconcile(shipvoid_path: &Path, legacy_path: &Path, config: &ReconConfig) -> Result<ReconReport, ReconError> {
    reconcile_with_context(RunContext::new(config), shipvoid_path, legacy_path)
}

/// [`reconcile`] with a caller-created context, so warnings raised while
/// resolving inputs end up in the same report.
pub fn reconcile_with_context(
    mut ctx: RunContext,
    shipvoid_path: &Path,
    legacy_path: &Path,
) -> Result<ReconReport, ReconError> {
    let config = ctx.config;

    let shipvoid = load_source(shipvoid_path, SourceKind::Shipvoid, &config.shipvoid.load_spec())?;
    for sheet in &shipvoid.missing_sheets {
        ctx.warn(ReconWarning::SheetSkipped {
            source: SourceKind::Shipvoid,
            sheet: sheet.clone(),
        });
    }
    let legacy = load_source(legacy_path, SourceKind::Legacy, &config.legacy.load_spec())?;
    for sheet in &legacy.missing_sheets {
        ctx.warn(ReconWarning::SheetSkipped {
            source: SourceKind::Legacy,
            sheet: sheet.clone(),
        });
    }

    let mut report = run_in(
        ctx,
        ReconInput {
            shipvoid: shipvoid.records,
            legacy: legacy.records,
        },
    );
    report.meta.shipvoid_file = file_label(shipvoid_path);
    report.meta.legacy_file = file_label(legacy_path);
    Ok(report)
}

/// Reconcile already-loaded tables. Cannot fail.
pub fn reconcile_tables(shipvoid: Vec<RawRecord>, legacy: Vec<RawRecord>, config: &ReconConfig) -> ReconReport {
    run(config, ReconInput { shipvoid, legacy })
}

pub fn run(config: &ReconConfig, input: ReconInput) -> ReconReport {
    run_in(RunContext::new(config), input)
}

fn file_label(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Split off records outside the facility filter. Returns the count removed.
fn apply_facility_filter(records: &mut Vec<NormalizedRecord>, config: &ReconConfig) -> usize {
    let before = records.len();
    records.retain(|r| config.facility_in_scope(&r.facility));
    before - records.len()
}

fn run_in(mut ctx: RunContext, input: ReconInput) -> ReconReport {
    let config = ctx.config;
    let shipvoid_records = input.shipvoid.len();
    let legacy_records = input.legacy.len();

    let mut shipvoid = Normalizer::new(SourceKind::Shipvoid, &config.shipvoid, &config.facility)
        .normalize_all(input.shipvoid, &mut ctx);
    let mut legacy = Normalizer::new(SourceKind::Legacy, &config.legacy, &config.facility)
        .normalize_all(input.legacy, &mut ctx);

    // Dashboard stats cover the whole forecast, filter or not
    let stats = shipvoid_stats(&shipvoid, &config.billed_statuses);

    let filtered_out =
        apply_facility_filter(&mut shipvoid, config) + apply_facility_filter(&mut legacy, config);

    let (shipvoid, mut invalid): (Vec<_>, Vec<_>) = shipvoid.into_iter().partition(|r| r.key.is_valid());
    let (legacy, legacy_invalid): (Vec<_>, Vec<_>) = legacy.into_iter().partition(|r| r.key.is_valid());
    invalid.extend(legacy_invalid);

    let results = match_records(shipvoid, legacy, &mut ctx);
    let agg = aggregate(&results, &invalid, config);

    let summary = ReconciliationSummary {
        total_raw_records: shipvoid_records + legacy_records,
        shipvoid_records,
        legacy_records,
        filtered_out,
        totals: agg.totals,
        groups: agg.groups,
    };

    tracing::info!(
        config = %config.name,
        shipvoid = shipvoid_records,
        legacy = legacy_records,
        matched = summary.totals.matched,
        shipvoid_only = summary.totals.shipvoid_only,
        legacy_only = summary.totals.legacy_only,
        duplicate_keys = summary.totals.duplicate_keys,
        invalid = summary.totals.invalid,
        filtered_out,
        "reconciliation complete"
    );

    let meta = ReconMeta {
        config_name: config.name.clone(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        run_at: ctx.started_at.to_rfc3339(),
        facility: config.facility.clone(),
        shipvoid_file: None,
        legacy_file: None,
    };

    ReconReport {
        meta,
        summary,
        stats,
        details: agg.details,
        warnings: ctx.into_warnings(),
        results,
        invalid,
    }
}
