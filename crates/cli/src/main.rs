mod cli;
mod config;
mod renderer;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use freshframe_scheduler::{Pose, Scheduler, Submission};

use crate::cli::CliArgs;
use crate::renderer::SyntheticRenderer;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    freshframe_core::config::load_dotenv();
    let args = CliArgs::parse();

    let config = config::resolve(&args).context("failed to load configuration")?;
    config.log_summary();

    let renderer = Arc::new(SyntheticRenderer::new(args.ms_per_megapixel, args.failure_rate));
    let scheduler = Scheduler::new(config, renderer).context("failed to start scheduler")?;

    let delivered = run(&scheduler, &args)?;
    for (tier, count) in &delivered {
        info!(tier, count, "frames delivered");
    }

    let metrics = scheduler.metrics();
    scheduler.shutdown();
    println!(
        "{}",
        serde_json::to_string_pretty(&metrics).context("failed to serialize metrics")?
    );
    Ok(())
}

/// Camera pose at `frame`: a slow orbit around the origin that pauses for
/// `still_frames` out of every `still_every` frames.
fn orbit_pose(args: &CliArgs, frame: u64) -> Pose {
    let moving_frame = if args.still_every == 0 {
        frame
    } else {
        let cycle = frame / args.still_every;
        let within = frame % args.still_every;
        let moving_per_cycle = args.still_every.saturating_sub(args.still_frames);
        cycle * moving_per_cycle + within.min(moving_per_cycle)
    };
    let seconds = moving_frame as f64 / f64::from(args.fps.max(1));
    let angle = (args.orbit_speed * seconds).to_radians();
    let position = [
        args.orbit_radius * angle.sin(),
        1.5,
        args.orbit_radius * angle.cos(),
    ];
    // Face the origin.
    let yaw = 180.0 - angle.to_degrees();
    Pose::new(position, [-10.0, yaw, 0.0])
}

/// Run producer and consumer at the configured rate until the duration
/// elapses. Returns delivered frame counts per tier.
fn run(scheduler: &Scheduler, args: &CliArgs) -> Result<BTreeMap<usize, u64>> {
    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(args.fps.max(1)));
    let duration = Duration::try_from_secs_f64(args.duration_secs)
        .with_context(|| format!("invalid duration: {}s", args.duration_secs))?;
    let deadline = Instant::now()
        .checked_add(duration)
        .context("duration too long")?;
    let stop = AtomicBool::new(false);

    Ok(thread::scope(|scope| {
        let consumer = scope.spawn(|| {
            let mut delivered = BTreeMap::new();
            while !stop.load(Ordering::Relaxed) {
                if let Some(frame) = scheduler.take_latest_image() {
                    debug!(
                        seq = frame.stamp.seq,
                        tier = %frame.tier,
                        latency_ms = frame.stamp.age().as_secs_f64() * 1000.0,
                        "frame delivered"
                    );
                    *delivered.entry(frame.tier_index).or_insert(0u64) += 1;
                }
                thread::sleep(frame_interval);
            }
            delivered
        });

        let mut frame = 0u64;
        while Instant::now() < deadline {
            let tick = Instant::now();
            if let Submission::Accepted { stamp, evicted } = scheduler.submit(orbit_pose(args, frame)) {
                debug!(seq = stamp.seq, evicted = ?evicted.map(|r| r.stamp.seq), "pose accepted");
            }
            frame += 1;
            if let Some(rest) = frame_interval.checked_sub(tick.elapsed()) {
                thread::sleep(rest);
            }
        }
        info!(frames = frame, "producer finished");

        stop.store(true, Ordering::Relaxed);
        consumer.join().unwrap_or_default()
    }))
}
