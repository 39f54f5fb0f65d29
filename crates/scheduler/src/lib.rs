//! Stale-work-shedding render scheduler.
//!
//! A producer submits camera poses at its own rate; a small pool of workers
//! renders the freshest pending pose through a progressive [`TierLadder`],
//! and the consumer polls for the newest published [`Frame`].
//!
//! Data flow: [`PoseGate`] → [`RequestBuffer`] → workers (consulting the
//! [`FreshnessArbiter`] before and after every tier) → [`ResultMailbox`].

pub mod arbiter;
pub mod buffer;
pub mod error;
pub mod gate;
pub mod mailbox;
pub mod metrics;
pub mod render;
pub mod runner;

pub use arbiter::FreshnessArbiter;
pub use buffer::RequestBuffer;
pub use error::SchedulerError;
pub use gate::{PoseGate, Submission};
pub use mailbox::ResultMailbox;
pub use metrics::SchedulerMetrics;
pub use render::{RenderError, Renderer};
pub use runner::Scheduler;

pub use freshframe_core::{
    DedupPolicy, Frame, Image, PixelBuffer, Pose, RenderRequest, RequestStamp, SchedulerConfig,
    Tier, TierLadder,
};
