use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

use tracing::{error, info};
use uuid::Uuid;

use freshframe_core::{Frame, Pose, SchedulerConfig, TierLadder};

use crate::arbiter::FreshnessArbiter;
use crate::buffer::RequestBuffer;
use crate::error::SchedulerError;
use crate::gate::{PoseGate, Submission};
use crate::mailbox::ResultMailbox;
use crate::metrics::SchedulerMetrics;
use crate::render::Renderer;

use super::execution;

/// State shared between the scheduler handle and its workers. Each component
/// synchronizes independently; no code path holds two of their locks at once.
pub(super) struct Shared {
    pub(super) id: Uuid,
    pub(super) ladder: TierLadder,
    pub(super) gate: PoseGate,
    pub(super) buffer: RequestBuffer,
    pub(super) arbiter: FreshnessArbiter,
    pub(super) mailbox: ResultMailbox,
    pub(super) renderer: Arc<dyn Renderer>,
    pub(super) metrics: RwLock<SchedulerMetrics>,
    pub(super) active_workers: AtomicUsize,
}

impl Shared {
    pub(super) fn record(&self, update: impl FnOnce(&mut SchedulerMetrics)) {
        if let Ok(mut m) = self.metrics.write() {
            update(&mut m);
        }
    }
}

/// The render scheduler. Owns a fixed pool of worker threads that render
/// the freshest submitted pose through the tier ladder.
///
/// Dropping the scheduler shuts it down.
pub struct Scheduler {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Validate `config` and start `config.worker_count` workers.
    pub fn new(config: SchedulerConfig, renderer: Arc<dyn Renderer>) -> Result<Self, SchedulerError> {
        let ladder = config.ladder()?;
        let worker_count = config.worker_count;
        let shared = Arc::new(Shared {
            id: Uuid::new_v4(),
            ladder,
            gate: PoseGate::new(config.dedup),
            buffer: RequestBuffer::new(worker_count),
            arbiter: FreshnessArbiter::new(),
            mailbox: ResultMailbox::new(),
            renderer,
            metrics: RwLock::new(SchedulerMetrics::default()),
            active_workers: AtomicUsize::new(0),
        });

        let mut scheduler = Self {
            shared,
            workers: Vec::with_capacity(worker_count),
        };
        for index in 0..worker_count {
            let shared = Arc::clone(&scheduler.shared);
            let spawned = thread::Builder::new()
                .name(format!("freshframe-worker-{index}"))
                .spawn(move || execution::run_worker(shared, index));
            match spawned {
                Ok(handle) => scheduler.workers.push(handle),
                Err(source) => {
                    // Dropping the partially built scheduler joins what did start.
                    return Err(SchedulerError::Spawn { index, source });
                }
            }
        }

        info!(
            scheduler = %scheduler.shared.id,
            workers = worker_count,
            tiers = scheduler.shared.ladder.len(),
            "Scheduler started"
        );
        Ok(scheduler)
    }

    /// Start a scheduler with the default ladder and worker count.
    pub fn with_defaults(renderer: Arc<dyn Renderer>) -> Result<Self, SchedulerError> {
        Self::new(SchedulerConfig::default(), renderer)
    }

    /// Notify a camera pose change. Never blocks; repeats of the last
    /// accepted pose are ignored.
    pub fn submit_pose(&self, position: [f64; 3], rotation: [f64; 3]) {
        self.submit(Pose::new(position, rotation));
    }

    /// Like [`submit_pose`](Self::submit_pose), reporting what the gate did.
    pub fn submit(&self, pose: Pose) -> Submission {
        let shared = &self.shared;
        let submission = shared.gate.submit(pose, &shared.arbiter, &shared.buffer);
        shared.record(|m| {
            m.poses_submitted += 1;
            match submission {
                Submission::Accepted { evicted, .. } => {
                    m.requests_accepted += 1;
                    if evicted.is_some() {
                        m.requests_evicted += 1;
                    }
                }
                Submission::Duplicate => m.poses_deduplicated += 1,
            }
        });
        submission
    }

    /// Take the most recently published frame, if any. A second call with no
    /// publish in between returns `None`.
    pub fn take_latest_image(&self) -> Option<Frame> {
        let frame = self.shared.mailbox.peek_and_clear();
        if frame.is_some() {
            self.shared.record(|m| m.frames_taken += 1);
        }
        frame
    }

    /// Snapshot of the current metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        let mut snapshot = match self.shared.metrics.read() {
            Ok(m) => m.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        snapshot.active_workers = self.shared.active_workers.load(Ordering::Relaxed);
        snapshot.pending_requests = self.shared.buffer.len();
        snapshot
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn worker_count(&self) -> usize {
        self.shared.buffer.capacity()
    }

    pub fn tiers(&self) -> &TierLadder {
        &self.shared.ladder
    }

    /// Number of requests waiting for a worker.
    pub fn pending(&self) -> usize {
        self.shared.buffer.len()
    }

    /// Sequence number of the most recently accepted request (0 if none).
    pub fn last_accepted_seq(&self) -> u64 {
        self.shared.arbiter.last_accepted()
    }

    /// Sequence number of the most recently published frame (0 if none).
    pub fn last_published_seq(&self) -> u64 {
        self.shared.arbiter.last_published()
    }

    /// Stop every worker. Workers finish their in-flight render call first;
    /// pending requests are discarded.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        info!(scheduler = %self.shared.id, "Scheduler shutdown requested");
        let discarded = self.shared.buffer.close();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!(scheduler = %self.shared.id, "worker thread panicked");
            }
        }
        info!(
            scheduler = %self.shared.id,
            discarded,
            "Scheduler stopped"
        );
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
