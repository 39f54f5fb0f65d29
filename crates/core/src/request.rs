use std::cmp::Ordering;
use std::time::{Duration, Instant};

use crate::image::Image;
use crate::pose::Pose;
use crate::tier::Tier;

/// Monotonic timestamp of an accepted request.
///
/// Comparison uses `seq` only: sequence numbers are allocated in acceptance
/// order and strictly increase within one scheduler, so two requests never
/// tie even when the wall clock is coarse. `accepted_at` is kept for latency
/// reporting.
#[derive(Debug, Clone, Copy)]
pub struct RequestStamp {
    pub seq: u64,
    pub accepted_at: Instant,
}

impl RequestStamp {
    pub fn new(seq: u64, accepted_at: Instant) -> Self {
        Self { seq, accepted_at }
    }

    /// Time since the request was accepted.
    pub fn age(&self) -> Duration {
        self.accepted_at.elapsed()
    }
}

impl PartialEq for RequestStamp {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for RequestStamp {}

impl PartialOrd for RequestStamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RequestStamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seq.cmp(&other.seq)
    }
}

/// A pose admitted by the gate. Never mutated after creation.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest {
    pub pose: Pose,
    pub stamp: RequestStamp,
}

impl RenderRequest {
    pub fn new(pose: Pose, stamp: RequestStamp) -> Self {
        Self { pose, stamp }
    }
}

/// A published render, as handed to the consumer.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: Image,
    /// Stamp of the request this frame was rendered for.
    pub stamp: RequestStamp,
    /// Position of `tier` in the ladder.
    pub tier_index: usize,
    pub tier: Tier,
    pub pose: Pose,
}
