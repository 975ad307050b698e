//! Report serialization for the external renderer: pretty JSON and a flat
//! detail CSV.

use std::path::Path;

use shipvoid_recon::model::DetailRow;
use shipvoid_recon::ReconReport;

use crate::CliError;

pub fn report_json(report: &ReconReport) -> Result<String, CliError> {
    serde_json::to_string_pretty(report)
        .map_err(|e| CliError::error(format!("JSON serialization error: {e}")))
}

/// Detail rows as CSV bytes. Not-applicable cells read `n/a`, absent ones are empty.
pub fn detail_csv(details: &[DetailRow]) -> Result<Vec<u8>, CliError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

    writer
        .write_record(DetailRow::CSV_HEADER)
        .map_err(|e| CliError::error(e.to_string()))?;
    for row in details {
        writer
            .write_record(row.csv_record())
            .map_err(|e| CliError::error(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| CliError::error(format!("CSV flush error: {e}")))
}

pub fn write_file(path: &Path, contents: &[u8]) -> Result<(), CliError> {
    std::fs::write(path, contents)
        .map_err(|e| CliError::error(format!("cannot write {}: {e}", path.display())))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}
