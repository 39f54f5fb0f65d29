use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use freshframe_core::{SchedulerConfig, TierLadder};

use crate::cli::CliArgs;

/// Read a scheduler config from a TOML file.
pub fn load_file(path: &Path) -> Result<SchedulerConfig> {
    debug!(?path, "Loading config");
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse config: {}", path.display()))
}

/// Resolve the effective scheduler config.
/// Priority: CLI flags > config file > FRESHFRAME_* env vars > defaults.
pub fn resolve(args: &CliArgs) -> Result<SchedulerConfig> {
    let mut config = match &args.config {
        Some(path) => load_file(path)?,
        None => SchedulerConfig::from_env().context("invalid FRESHFRAME_* environment")?,
    };

    if let Some(path) = &args.tiers {
        let ladder = TierLadder::from_json_file(path)
            .with_context(|| format!("failed to load tiers: {}", path.display()))?;
        config.tiers = ladder.to_vec();
    }
    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }

    config.validate().context("invalid scheduler configuration")?;
    Ok(config)
}
