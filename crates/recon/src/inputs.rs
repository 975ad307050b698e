//! Input file resolution: explicit paths, the retrieval collaborator, then
//! local newest-file discovery.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use shipvoid_io::discover::find_newest_any;
use shipvoid_io::SourceKind;

use crate::context::RunContext;
use crate::error::ReconError;
use crate::model::ReconWarning;

/// Files a retrieval collaborator deposited. `None` = not retrieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievedFiles {
    pub shipvoid: Option<PathBuf>,
    pub legacy: Option<PathBuf>,
}

/// Fetches the newest extracts from wherever they are published (a document
/// store, a share) into a local directory. Transport lives behind this trait.
pub trait FileRetrieval {
    fn retrieve(
        &self,
        facility: &str,
        dest: &Path,
    ) -> Result<RetrievedFiles, Box<dyn std::error::Error + Send + Sync>>;
}

/// Paths given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct InputOverrides {
    pub shipvoid: Option<PathBuf>,
    pub legacy: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInputs {
    pub shipvoid: PathBuf,
    pub legacy: PathBuf,
}

fn discover(kind: SourceKind, dir: PathBuf, patterns: &[String]) -> Result<PathBuf, ReconError> {
    let found = find_newest_any(&dir, patterns).map_err(|e| ReconError::Discovery {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })?;
    found.ok_or_else(|| ReconError::NoInput {
        kind,
        dir,
        patterns: patterns.to_vec(),
    })
}

/// Decide which two files to reconcile.
///
/// Explicit paths always win. Otherwise the retriever (when given, and unless
/// the config says `skip_download` or `local`) is asked for fresh copies; a
/// failure there is a warning and local discovery takes over.
pub fn resolve_inputs(
    ctx: &mut RunContext,
    overrides: &InputOverrides,
    retriever: Option<&dyn FileRetrieval>,
    today: NaiveDate,
) -> Result<ResolvedInputs, ReconError> {
    let config = ctx.config;

    if let (Some(shipvoid), Some(legacy)) = (&overrides.shipvoid, &overrides.legacy) {
        return Ok(ResolvedInputs {
            shipvoid: shipvoid.clone(),
            legacy: legacy.clone(),
        });
    }

    let mut retrieved = RetrievedFiles::default();
    match retriever {
        Some(r) if !config.bypass_retrieval() => {
            match r.retrieve(&config.facility, &config.paths.download_dir) {
                Ok(files) => retrieved = files,
                Err(e) => ctx.warn(ReconWarning::Retrieval {
                    message: e.to_string(),
                }),
            }
        }
        Some(_) => tracing::debug!("retrieval bypassed by configuration"),
        None => {}
    }

    let shipvoid = match overrides.shipvoid.clone().or(retrieved.shipvoid) {
        Some(p) => p,
        None => discover(
            SourceKind::Shipvoid,
            config.shipvoid_dir(today),
            &config.paths.shipvoid_patterns,
        )?,
    };
    let legacy = match overrides.legacy.clone().or(retrieved.legacy) {
        Some(p) => p,
        None => discover(SourceKind::Legacy, config.legacy_dir(), &config.paths.legacy_patterns)?,
    };

    tracing::info!(
        shipvoid = %shipvoid.display(),
        legacy = %legacy.display(),
        "resolved input files"
    );
    Ok(ResolvedInputs { shipvoid, legacy })
}
