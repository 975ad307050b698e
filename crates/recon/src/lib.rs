//! `shipvoid-recon` - Shipvoid / Legacy cross-reference reconciliation.
//!
//! Normalizes both extracts to canonical keys, matches them, and folds the
//! outcomes into a report-ready structure. Reading files is delegated to
//! `shipvoid-io`; rendering is left to whoever consumes the report.

pub mod aggregate;
pub mod config;
pub mod context;
pub mod decimal;
pub mod engine;
pub mod error;
pub mod inputs;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod stats;

pub use config::ReconConfig;
pub use context::RunContext;
pub use decimal::Decimal;
pub use engine::{reconcile, reconcile_tables, reconcile_with_context, run, ReconInput};
pub use error::{ConfigError, ReconError, UnparseableValue};
pub use inputs::{resolve_inputs, FileRetrieval, InputOverrides, ResolvedInputs, RetrievedFiles};
pub use model::{DetailRow, MatchResult, NormalizedRecord, ReconReport, ReconWarning, ReconciliationSummary};
