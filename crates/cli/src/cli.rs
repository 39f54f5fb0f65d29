use std::path::PathBuf;

use clap::Parser;

/// Progressive-resolution render scheduler demo.
///
/// Orbits a synthetic camera around a scene, feeds every pose to the
/// scheduler and polls for the freshest frame at a fixed rate.
#[derive(Parser, Debug)]
#[command(name = "freshframe-demo", about = "Drive the freshframe scheduler with a synthetic camera")]
pub struct CliArgs {
    /// Scheduler config file (TOML). Without it, FRESHFRAME_* env vars are used.
    #[arg(long, env = "FRESHFRAME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Tier ladder file (JSON list of {"width", "height", "fov"}); overrides the config
    #[arg(long)]
    pub tiers: Option<PathBuf>,

    /// Worker count override
    #[arg(long)]
    pub workers: Option<usize>,

    /// How long to run, in seconds
    #[arg(long, env = "FRESHFRAME_DEMO_DURATION", default_value = "5", value_parser = parse_duration_secs)]
    pub duration_secs: f64,

    /// Producer and consumer frame rate
    #[arg(long, env = "FRESHFRAME_DEMO_FPS", default_value = "60")]
    pub fps: u32,

    /// Orbit radius around the scene origin
    #[arg(long, default_value = "6.0")]
    pub orbit_radius: f64,

    /// Orbit speed in degrees per second
    #[arg(long, default_value = "30.0")]
    pub orbit_speed: f64,

    /// Every this many frames the camera stops moving (0 disables)
    #[arg(long, default_value = "120")]
    pub still_every: u64,

    /// Length of each stationary period, in frames
    #[arg(long, default_value = "45")]
    pub still_frames: u64,

    /// Fraction of render calls that fail (0.0 - 1.0)
    #[arg(long, env = "FRESHFRAME_DEMO_FAILURE_RATE", default_value = "0.0")]
    pub failure_rate: f64,

    /// Simulated render cost, in milliseconds per megapixel
    #[arg(long, env = "FRESHFRAME_DEMO_MS_PER_MEGAPIXEL", default_value = "60.0")]
    pub ms_per_megapixel: f64,
}

fn parse_duration_secs(raw: &str) -> Result<f64, String> {
    let secs: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("expected a finite, non-negative number of seconds, got {raw}"));
    }
    Ok(secs)
}
