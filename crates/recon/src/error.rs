use std::path::PathBuf;

use shipvoid_io::{LoadError, SourceKind};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    Parse(String),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    /// No extract matched any discovery pattern.
    #[error("no {kind} extract found in {} (patterns: {})", dir.display(), patterns.join(", "))]
    NoInput {
        kind: SourceKind,
        dir: PathBuf,
        patterns: Vec<String>,
    },

    #[error("invalid file pattern '{pattern}': {message}")]
    Discovery { pattern: String, message: String },
}

/// A cell that holds something other than the expected date or number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unparseable {expected} value")]
pub struct UnparseableValue {
    pub expected: &'static str,
}
