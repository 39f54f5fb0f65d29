//! Progressive-quality render tiers.
//!
//! A [`TierLadder`] is the ordered list of render configurations a worker
//! walks through for each request, cheapest first.

use std::fmt;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Vertical FOV matching a 60 degree horizontal FOV at 16:9.
pub const DEFAULT_VERTICAL_FOV: f64 = 35.98339777135764;

/// Largest accepted tier width or height, in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

/// One resolution / field-of-view configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees.
    #[serde(alias = "fov")]
    pub vertical_fov: f64,
}

impl Tier {
    pub fn new(width: u32, height: u32, vertical_fov: f64) -> Self {
        Self {
            width,
            height,
            vertical_fov,
        }
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    fn check(&self, index: usize) -> Result<(), ConfigError> {
        let reason = if self.width == 0 || self.height == 0 {
            Some(format!("zero dimension {}x{}", self.width, self.height))
        } else if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            Some(format!(
                "dimension {}x{} exceeds {MAX_DIMENSION}",
                self.width, self.height
            ))
        } else if !(self.vertical_fov > 0.0 && self.vertical_fov < 180.0) {
            Some(format!("vertical fov {} outside (0, 180)", self.vertical_fov))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ConfigError::InvalidTier { index, reason }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@{:.1}", self.width, self.height, self.vertical_fov)
    }
}

/// The five-tier default, from 0.05x up to full 1280x720.
pub fn default_tiers() -> Vec<Tier> {
    vec![
        Tier::new(64, 36, DEFAULT_VERTICAL_FOV),
        Tier::new(128, 72, DEFAULT_VERTICAL_FOV),
        Tier::new(320, 180, DEFAULT_VERTICAL_FOV),
        Tier::new(640, 360, DEFAULT_VERTICAL_FOV),
        Tier::new(1280, 720, DEFAULT_VERTICAL_FOV),
    ]
}

/// Immutable, non-empty, cheaply clonable list of tiers.
///
/// Order is preserved exactly as given; callers list tiers cheapest first.
#[derive(Debug, Clone, PartialEq)]
pub struct TierLadder {
    tiers: Arc<[Tier]>,
}

impl TierLadder {
    pub fn new(tiers: Vec<Tier>) -> Result<Self, ConfigError> {
        if tiers.is_empty() {
            return Err(ConfigError::EmptyTierLadder);
        }
        for (index, tier) in tiers.iter().enumerate() {
            tier.check(index)?;
        }
        if tiers
            .windows(2)
            .any(|pair| pair[1].pixel_count() < pair[0].pixel_count())
        {
            warn!("tier ladder is not in ascending pixel-count order; keeping the given order");
        }
        Ok(Self {
            tiers: tiers.into(),
        })
    }

    /// Parse the JSON camera-config format: `[{"width", "height", "fov"}, ...]`.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let tiers: Vec<Tier> = serde_json::from_str(json)?;
        Self::new(tiers)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn as_slice(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn to_vec(&self) -> Vec<Tier> {
        self.tiers.to_vec()
    }
}

impl Default for TierLadder {
    fn default() -> Self {
        Self {
            tiers: default_tiers().into(),
        }
    }
}

impl Deref for TierLadder {
    type Target = [Tier];

    fn deref(&self) -> &[Tier] {
        &self.tiers
    }
}
