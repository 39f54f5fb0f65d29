use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Scheduler operational metrics.
///
/// Per-tier maps are keyed by the tier's index in the ladder.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Poses handed to the gate.
    pub poses_submitted: u64,
    /// Poses dropped as repeats of the last accepted pose.
    pub poses_deduplicated: u64,
    /// Requests admitted to the buffer.
    pub requests_accepted: u64,
    /// Pending requests dropped to admit newer ones.
    pub requests_evicted: u64,
    /// Requests taken by a worker.
    pub requests_claimed: u64,
    /// Requests whose remaining tiers were skipped, either because a newer
    /// request was accepted or because a render failed.
    pub requests_abandoned: u64,
    /// Requests that went through every tier.
    pub requests_completed: u64,
    /// Render attempts that failed (errors, panics, invalid output).
    pub render_failures: u64,
    /// Successful renders by tier.
    pub renders_completed: BTreeMap<usize, u64>,
    /// Average render duration by tier.
    pub avg_render_duration: BTreeMap<usize, Duration>,
    /// Frames installed in the mailbox.
    pub publishes: u64,
    /// Rendered frames refused because a newer result was already out.
    pub publish_rejections: u64,
    /// Frames taken by the consumer.
    pub frames_taken: u64,
    pub last_publish_at: Option<DateTime<Utc>>,
    /// Time from request acceptance to its most recent publish.
    pub last_publish_latency: Option<Duration>,
    /// Workers currently processing a request.
    pub active_workers: usize,
    /// Requests waiting in the buffer when the snapshot was taken.
    pub pending_requests: usize,
}

impl SchedulerMetrics {
    /// Record a successful render of `tier_index`.
    pub fn record_render(&mut self, tier_index: usize, duration: Duration) {
        let count = {
            let count = self.renders_completed.entry(tier_index).or_default();
            *count += 1;
            *count
        };
        let prev_avg = self
            .avg_render_duration
            .get(&tier_index)
            .copied()
            .unwrap_or_default();

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        let new_avg = if count == 1 {
            duration
        } else {
            let prev_nanos = prev_avg.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / count as f64;
            Duration::from_nanos(avg_nanos as u64)
        };
        self.avg_render_duration.insert(tier_index, new_avg);
    }

    /// Record a frame installed in the mailbox.
    pub fn record_publish(&mut self, latency: Duration) {
        self.publishes += 1;
        self.last_publish_at = Some(Utc::now());
        self.last_publish_latency = Some(latency);
    }

    pub fn total_renders(&self) -> u64 {
        self.renders_completed.values().sum()
    }
}
