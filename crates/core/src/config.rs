use std::env;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pose::Pose;
use crate::tier::{default_tiers, Tier, TierLadder};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn parse_opt<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                key: key.to_string(),
                value: raw,
            }),
    }
}

pub const ENV_WORKERS: &str = "FRESHFRAME_WORKERS";
pub const ENV_TIERS_FILE: &str = "FRESHFRAME_TIERS_FILE";
pub const ENV_DEDUP: &str = "FRESHFRAME_DEDUP";
pub const ENV_POSITION_EPSILON: &str = "FRESHFRAME_POSITION_EPSILON";
pub const ENV_ROTATION_EPSILON: &str = "FRESHFRAME_ROTATION_EPSILON";

// ── Deduplication policy ──────────────────────────────────────

/// How the pose gate decides that a pose repeats the last accepted one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Duplicate only if all six scalars are bit-for-bit equal.
    Exact,
    /// Duplicate if the squared position distance is below `position_epsilon`
    /// and the summed rotation delta (degrees) is below `rotation_epsilon`.
    Threshold {
        position_epsilon: f64,
        rotation_epsilon: f64,
    },
}

impl DedupPolicy {
    pub const DEFAULT_POSITION_EPSILON: f64 = 1e-6;
    pub const DEFAULT_ROTATION_EPSILON: f64 = 1e-2;

    pub fn threshold() -> Self {
        DedupPolicy::Threshold {
            position_epsilon: Self::DEFAULT_POSITION_EPSILON,
            rotation_epsilon: Self::DEFAULT_ROTATION_EPSILON,
        }
    }

    pub fn is_duplicate(&self, last: &Pose, next: &Pose) -> bool {
        match *self {
            DedupPolicy::Exact => last.bitwise_eq(next),
            DedupPolicy::Threshold {
                position_epsilon,
                rotation_epsilon,
            } => {
                last.position_distance_sq(next) < position_epsilon
                    && last.rotation_delta(next) < rotation_epsilon
            }
        }
    }
}

impl Default for DedupPolicy {
    fn default() -> Self {
        DedupPolicy::Exact
    }
}

// ── Scheduler config ──────────────────────────────────────────

/// Scheduler configuration, typically parsed from TOML or the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of render workers; also the request buffer capacity.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Tier ladder, cheapest first.
    #[serde(default = "default_tiers")]
    pub tiers: Vec<Tier>,
    #[serde(default)]
    pub dedup: DedupPolicy,
}

fn default_worker_count() -> usize { 3 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            tiers: default_tiers(),
            dedup: DedupPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    /// Build config from `FRESHFRAME_*` environment variables (call
    /// `load_dotenv()` first). Unset keys keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_opt)
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(workers) = parse_opt::<usize>(&lookup, ENV_WORKERS)? {
            config.worker_count = workers;
        }
        if let Some(path) = lookup(ENV_TIERS_FILE) {
            config.tiers = TierLadder::from_json_file(path)?.to_vec();
        }

        let position_epsilon = parse_opt::<f64>(&lookup, ENV_POSITION_EPSILON)?;
        let rotation_epsilon = parse_opt::<f64>(&lookup, ENV_ROTATION_EPSILON)?;
        config.dedup = match lookup(ENV_DEDUP).as_deref().map(str::trim) {
            None | Some("exact") => DedupPolicy::Exact,
            Some("threshold") => DedupPolicy::Threshold {
                position_epsilon: position_epsilon
                    .unwrap_or(DedupPolicy::DEFAULT_POSITION_EPSILON),
                rotation_epsilon: rotation_epsilon
                    .unwrap_or(DedupPolicy::DEFAULT_ROTATION_EPSILON),
            },
            Some(other) => {
                return Err(ConfigError::InvalidEnv {
                    key: ENV_DEDUP.to_string(),
                    value: other.to_string(),
                })
            }
        };
        Ok(config)
    }

    /// Check the config and build the tier ladder from it.
    pub fn ladder(&self) -> Result<TierLadder, ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        TierLadder::new(self.tiers.clone())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ladder().map(|_| ())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Scheduler config:");
        tracing::info!("  workers:  {}", self.worker_count);
        let tiers: Vec<String> = self.tiers.iter().map(ToString::to_string).collect();
        tracing::info!("  tiers:    [{}]", tiers.join(", "));
        tracing::info!("  dedup:    {:?}", self.dedup);
    }
}
