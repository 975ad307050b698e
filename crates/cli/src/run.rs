//! `shipvoid run`, `shipvoid validate`, `shipvoid discover`.

use std::path::{Path, PathBuf};

use clap::Args;

use shipvoid_recon::config::DateBucket;
use shipvoid_recon::{
    reconcile_with_context, resolve_inputs, InputOverrides, ReconConfig, ReconReport, RunContext,
};

use crate::exit_codes::{EXIT_CONFIG, EXIT_DISCREPANCIES, EXIT_USAGE};
use crate::export;
use crate::CliError;

/// Where the inputs come from and how the config is overridden.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// TOML config file (all settings optional)
    #[arg(long, env = "SHIPVOID_CONFIG")]
    pub config: Option<PathBuf>,

    /// Shipvoid Forecast workbook (skips discovery)
    #[arg(long)]
    pub shipvoid: Option<PathBuf>,

    /// Legacy Unbilled Cartons CSV (skips discovery)
    #[arg(long)]
    pub legacy: Option<PathBuf>,

    /// Directory searched for the newest Shipvoid extract
    #[arg(long, env = "SHIPVOID_SOURCE_PATH")]
    pub source_dir: Option<PathBuf>,

    /// Directory searched for the newest Legacy extract
    #[arg(long, env = "LEGACY_SOURCE_PATH")]
    pub legacy_dir: Option<PathBuf>,

    /// Distribution center code
    #[arg(long, env = "SHIPVOID_DC")]
    pub facility: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Only reconcile these facilities (repeatable)
    #[arg(long = "facility-filter", value_name = "CODE")]
    pub facility_filter: Vec<String>,

    /// Date bucket for grouping: day, week or month
    #[arg(long)]
    pub date_bucket: Option<DateBucket>,

    /// Do not ask the retrieval service for fresh extracts
    #[arg(long)]
    pub skip_download: bool,

    /// Use local files only
    #[arg(long, conflicts_with = "skip_download")]
    pub local: bool,

    /// Print the report as JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Write the JSON report to a file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Write detail rows as CSV
    #[arg(long)]
    pub detail_csv: Option<PathBuf>,

    /// Exit 6 when any discrepancy is found
    #[arg(long)]
    pub strict: bool,
}

fn load_config(args: &SourceArgs) -> Result<ReconConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => ReconConfig::from_file(path)
            .map_err(|e| CliError::new(EXIT_CONFIG, e.to_string()))?,
        None => ReconConfig::default(),
    };

    if let Some(dir) = &args.source_dir {
        config.paths.shipvoid_dir = Some(dir.clone());
    }
    if let Some(dir) = &args.legacy_dir {
        config.paths.legacy_dir = Some(dir.clone());
    }
    if let Some(facility) = &args.facility {
        config.facility = facility.clone();
    }
    Ok(config)
}

fn overrides(args: &SourceArgs) -> InputOverrides {
    InputOverrides {
        shipvoid: args.shipvoid.clone(),
        legacy: args.legacy.clone(),
    }
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    if let (Some(a), Some(b)) = (&args.output, &args.detail_csv) {
        if a == b {
            return Err(CliError::new(EXIT_USAGE, "--output and --detail-csv must be different files"));
        }
    }

    let mut config = load_config(&args.source)?;
    if !args.facility_filter.is_empty() {
        config.facility_filter = args.facility_filter.clone();
    }
    if let Some(bucket) = args.date_bucket {
        config.date_bucket = bucket;
    }
    config.skip_download |= args.skip_download;
    config.local |= args.local;
    config
        .validate()
        .map_err(|e| CliError::new(EXIT_CONFIG, e.to_string()))?;

    let mut ctx = RunContext::new(&config);
    // No remote retriever is linked into this binary
    let inputs = resolve_inputs(&mut ctx, &overrides(&args.source), None, today())
        .map_err(CliError::from_recon)?;
    tracing::debug!(?inputs, "running reconciliation");
    let report = reconcile_with_context(ctx, &inputs.shipvoid, &inputs.legacy)
        .map_err(CliError::from_recon)?;

    let json = export::report_json(&report)?;
    if let Some(path) = &args.output {
        export::write_file(path, json.as_bytes())?;
    }
    if let Some(path) = &args.detail_csv {
        export::write_file(path, &export::detail_csv(&report.details)?)?;
    }
    if args.json {
        println!("{json}");
    }

    print_summary(&report);

    if args.strict && report.summary.totals.has_discrepancies() {
        return Err(CliError::new(EXIT_DISCREPANCIES, "discrepancies found (--strict)"));
    }
    Ok(())
}

fn print_summary(report: &ReconReport) {
    let s = &report.summary;
    let t = &s.totals;
    eprintln!(
        "{}: {} shipvoid / {} legacy records - {} matched ({} quantity mismatches), {} shipvoid-only, {} legacy-only",
        report.meta.config_name,
        s.shipvoid_records,
        s.legacy_records,
        t.matched,
        t.quantity_mismatches,
        t.shipvoid_only,
        t.legacy_only,
    );
    if t.duplicate_keys > 0 || t.invalid > 0 || s.filtered_out > 0 {
        eprintln!(
            "{} duplicate keys ({} records), {} invalid keys, {} filtered out",
            t.duplicate_keys, t.duplicate_records, t.invalid, s.filtered_out,
        );
    }
    let stats = &report.stats;
    eprintln!(
        "forecast: {} containers, {} at risk, potential cost ${}",
        stats.total, stats.at_risk_count, stats.potential_cost,
    );
    if !report.warnings.is_empty() {
        eprintln!("{} warnings (see report)", report.warnings.len());
    }
}

pub fn cmd_validate(path: &Path) -> Result<(), CliError> {
    let config = ReconConfig::from_file(path).map_err(|e| CliError::new(EXIT_CONFIG, e.to_string()))?;
    eprintln!(
        "{}: ok (facility {}, {} shipvoid sheets, group by {:?}, {:?} buckets)",
        path.display(),
        config.facility,
        config.shipvoid.sheets.len(),
        config.group_by,
        config.date_bucket,
    );
    Ok(())
}

pub fn cmd_discover(args: SourceArgs) -> Result<(), CliError> {
    let mut config = load_config(&args)?;
    config.local = true;
    config
        .validate()
        .map_err(|e| CliError::new(EXIT_CONFIG, e.to_string()))?;

    let mut ctx = RunContext::new(&config);
    let inputs = resolve_inputs(&mut ctx, &overrides(&args), None, today())
        .map_err(CliError::from_recon)?;
    println!("shipvoid: {}", inputs.shipvoid.display());
    println!("legacy:   {}", inputs.legacy.display());
    Ok(())
}
