use std::path::PathBuf;

use thiserror::Error;

/// Construction-time configuration errors. Fatal: a scheduler is never
/// built from a config that fails validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("tier ladder is empty")]
    EmptyTierLadder,

    #[error("worker count must be at least 1")]
    ZeroWorkers,

    #[error("invalid tier {index}: {reason}")]
    InvalidTier { index: usize, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tier ladder: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },
}
