use chrono::{DateTime, Utc};

use crate::config::ReconConfig;
use crate::model::ReconWarning;

/// State scoped to one reconciliation run. Created by the engine per call and
/// handed to every stage; dropped with the report.
#[derive(Debug)]
pub struct RunContext<'a> {
    pub config: &'a ReconConfig,
    pub started_at: DateTime<Utc>,
    warnings: Vec<ReconWarning>,
}

impl<'a> RunContext<'a> {
    pub fn new(config: &'a ReconConfig) -> Self {
        Self {
            config,
            started_at: Utc::now(),
            warnings: Vec::new(),
        }
    }

    /// Record a recovered condition and log it.
    pub fn warn(&mut self, warning: ReconWarning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[ReconWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<ReconWarning> {
        self.warnings
    }
}
