//! Pose gate: admits changed poses, drops repeats.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use freshframe_core::{DedupPolicy, Pose, RenderRequest, RequestStamp};
use tracing::trace;

use crate::arbiter::FreshnessArbiter;
use crate::buffer::RequestBuffer;

/// What happened to a submitted pose.
#[derive(Debug, Clone, Copy)]
pub enum Submission {
    /// Admitted as a new request. `evicted` is the oldest pending request
    /// dropped to make room, if the buffer was full.
    Accepted {
        stamp: RequestStamp,
        evicted: Option<RenderRequest>,
    },
    /// Matched the last accepted pose; nothing changed.
    Duplicate,
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Submission::Accepted { .. })
    }
}

#[derive(Debug)]
pub struct PoseGate {
    policy: DedupPolicy,
    last_pose: Mutex<Option<Pose>>,
}

impl PoseGate {
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            policy,
            last_pose: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    /// Compare `pose` with the last accepted pose; if it differs, stamp a new
    /// request and offer it to `buffer`.
    ///
    /// Comparison, pose update and stamp allocation happen under the gate's
    /// lock so acceptance order and sequence order agree. The buffer offer
    /// happens after the lock is released.
    pub fn submit(
        &self,
        pose: Pose,
        arbiter: &FreshnessArbiter,
        buffer: &RequestBuffer,
    ) -> Submission {
        let stamp = {
            let mut last = self
                .last_pose
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = last.as_ref() {
                if self.policy.is_duplicate(previous, &pose) {
                    trace!("pose unchanged, skipping");
                    return Submission::Duplicate;
                }
            }
            *last = Some(pose);
            RequestStamp::new(arbiter.accept(), Instant::now())
        };
        let evicted = buffer.offer(RenderRequest::new(pose, stamp));
        Submission::Accepted { stamp, evicted }
    }
}
