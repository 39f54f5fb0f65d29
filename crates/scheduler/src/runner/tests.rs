#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, OnceLock, RwLock, Weak};
    use std::time::{Duration, Instant};

    use uuid::Uuid;

    use freshframe_core::{ConfigError, DedupPolicy, Image, PixelBuffer, Pose, RenderRequest, SchedulerConfig, Tier, TierLadder};

    use crate::arbiter::FreshnessArbiter;
    use crate::buffer::RequestBuffer;
    use crate::error::SchedulerError;
    use crate::gate::{PoseGate, Submission};
    use crate::mailbox::ResultMailbox;
    use crate::metrics::SchedulerMetrics;
    use crate::render::{RenderError, Renderer};
    use crate::runner::core::Shared;
    use crate::runner::execution::{process_request, render_tier, RequestOutcome};
    use crate::runner::Scheduler;

    fn ladder() -> Vec<Tier> {
        vec![Tier::new(64, 36, 36.0), Tier::new(128, 72, 36.0), Tier::new(256, 144, 36.0)]
    }

    /// Mock renderer counting calls per tier width.
    struct MockRenderer {
        calls: AtomicUsize,
        fail_width: Option<u32>,
    }

    impl MockRenderer {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0), fail_width: None }
        }

        fn failing_at(width: u32) -> Self {
            Self { calls: AtomicUsize::new(0), fail_width: Some(width) }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }
    }

    impl Renderer for MockRenderer {
        fn render(&self, _pose: &Pose, tier: &Tier) -> Result<Image, RenderError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.fail_width == Some(tier.width) {
                return Err(RenderError::Unavailable("backend offline".into()));
            }
            Ok(Image::blank_for(tier))
        }
    }

    fn shared_with(renderer: Arc<dyn Renderer>, tiers: Vec<Tier>) -> Arc<Shared> {
        Arc::new(Shared {
            id: Uuid::new_v4(),
            ladder: TierLadder::new(tiers).unwrap(),
            gate: PoseGate::new(DedupPolicy::Exact),
            buffer: RequestBuffer::new(2),
            arbiter: FreshnessArbiter::new(),
            mailbox: ResultMailbox::new(),
            renderer,
            metrics: RwLock::new(SchedulerMetrics::default()),
            active_workers: AtomicUsize::new(0),
        })
    }

    /// Admit a pose through the gate and claim it back as a worker would.
    fn admit(shared: &Shared, x: f64) -> RenderRequest {
        let pose = Pose::new([x, 0.0, 0.0], [0.0; 3]);
        match shared.gate.submit(pose, &shared.arbiter, &shared.buffer) {
            Submission::Accepted { .. } => shared.buffer.claim().unwrap(),
            Submission::Duplicate => panic!("pose {x} unexpectedly deduplicated"),
        }
    }

    fn metrics(shared: &Shared) -> SchedulerMetrics {
        shared.metrics.read().unwrap().clone()
    }

    #[test]
    fn current_request_walks_every_tier() {
        let renderer = Arc::new(MockRenderer::new());
        let shared = shared_with(renderer.clone(), ladder());
        let request = admit(&shared, 1.0);

        assert_eq!(process_request(&shared, &request), RequestOutcome::Completed);
        assert_eq!(renderer.call_count(), 3);

        let frame = shared.mailbox.peek_and_clear().unwrap();
        assert_eq!(frame.tier_index, 2);
        assert_eq!(frame.stamp, request.stamp);
        assert_eq!(frame.tier.width, 256);

        let m = metrics(&shared);
        assert_eq!(m.publishes, 3);
        assert_eq!(m.total_renders(), 3);
        assert_eq!(m.publish_rejections, 0);
    }

    #[test]
    fn stale_request_renders_nothing() {
        let renderer = Arc::new(MockRenderer::new());
        let shared = shared_with(renderer.clone(), ladder());
        let old = admit(&shared, 1.0);
        let _new = admit(&shared, 2.0);

        assert_eq!(
            process_request(&shared, &old),
            RequestOutcome::Superseded { at_tier: 0 }
        );
        assert_eq!(renderer.call_count(), 0);
        assert!(shared.mailbox.peek_and_clear().is_none());
    }

    #[test]
    fn newer_acceptance_mid_request_abandons_remaining_tiers() {
        let hook: Arc<OnceLock<Weak<Shared>>> = Arc::new(OnceLock::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let renderer = {
            let hook = Arc::clone(&hook);
            let calls = Arc::clone(&calls);
            move |_pose: &Pose, tier: &Tier| -> Result<Image, RenderError> {
                calls.fetch_add(1, Ordering::Relaxed);
                if let Some(shared) = hook.get().and_then(Weak::upgrade) {
                    // Producer moves the camera while tier 0 renders.
                    shared.arbiter.accept();
                }
                Ok(Image::blank_for(tier))
            }
        };
        let shared = shared_with(Arc::new(renderer), ladder());
        let request = admit(&shared, 1.0);
        hook.set(Arc::downgrade(&shared)).unwrap();

        assert_eq!(
            process_request(&shared, &request),
            RequestOutcome::Superseded { at_tier: 1 }
        );
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        // Tier 0 finished before anything newer was published, so it still counts.
        assert_eq!(shared.mailbox.peek_and_clear().unwrap().tier_index, 0);
    }

    #[test]
    fn late_render_loses_publish_arbitration() {
        let hook: Arc<OnceLock<Weak<Shared>>> = Arc::new(OnceLock::new());
        let renderer = {
            let hook = Arc::clone(&hook);
            move |_pose: &Pose, tier: &Tier| -> Result<Image, RenderError> {
                if let Some(shared) = hook.get().and_then(Weak::upgrade) {
                    // Another worker accepts and publishes a newer request
                    // while this render is in flight.
                    let newer = admit(&shared, 99.0);
                    let published = shared.arbiter.try_publish(
                        freshframe_core::Frame {
                            image: Image::blank_for(tier),
                            stamp: newer.stamp,
                            tier_index: 0,
                            tier: *tier,
                            pose: newer.pose,
                        },
                        &shared.mailbox,
                    );
                    assert!(published);
                }
                Ok(Image::blank_for(tier))
            }
        };
        let shared = shared_with(Arc::new(renderer), ladder());
        let request = admit(&shared, 1.0);
        hook.set(Arc::downgrade(&shared)).unwrap();

        assert_eq!(
            process_request(&shared, &request),
            RequestOutcome::Superseded { at_tier: 1 }
        );
        let frame = shared.mailbox.peek_and_clear().unwrap();
        assert!(frame.stamp > request.stamp);
        assert_eq!(metrics(&shared).publish_rejections, 1);
    }

    #[test]
    fn render_failure_abandons_request() {
        let renderer = Arc::new(MockRenderer::failing_at(128));
        let shared = shared_with(renderer.clone(), ladder());
        let request = admit(&shared, 1.0);

        assert_eq!(
            process_request(&shared, &request),
            RequestOutcome::Failed { at_tier: 1 }
        );
        assert_eq!(renderer.call_count(), 2);
        assert_eq!(shared.mailbox.peek_and_clear().unwrap().tier_index, 0);
    }

    #[test]
    fn panicking_renderer_is_contained() {
        let renderer = |_pose: &Pose, _tier: &Tier| -> Result<Image, RenderError> {
            panic!("gpu fell over");
        };
        let err = render_tier(&renderer, &Pose::default(), &Tier::new(8, 8, 36.0)).unwrap_err();
        match err {
            RenderError::Panicked(msg) => assert!(msg.contains("gpu fell over")),
            other => panic!("expected Panicked, got {other:?}"),
        }
    }

    #[test]
    fn malformed_image_is_a_failure() {
        let renderer = |_pose: &Pose, _tier: &Tier| -> Result<Image, RenderError> {
            Ok(Image::new(8, 8, PixelBuffer::U8(vec![0; 10])))
        };
        let err = render_tier(&renderer, &Pose::default(), &Tier::new(8, 8, 36.0)).unwrap_err();
        assert!(matches!(err, RenderError::InvalidOutput { .. }));
    }

    #[test]
    fn oversized_tier_is_invalid_output_not_a_panic() {
        let renderer = |_pose: &Pose, _tier: &Tier| -> Result<Image, RenderError> {
            Ok(Image::new(1, 1, PixelBuffer::U8(vec![0; 3])))
        };
        let huge = Tier::new(u32::MAX, u32::MAX, 36.0);
        let err = render_tier(&renderer, &Pose::default(), &huge).unwrap_err();
        assert!(matches!(err, RenderError::InvalidOutput { .. }));
    }

    // ── Scheduler lifecycle ──────────────────────────────────────

    fn wait_for<T>(timeout: Duration, mut poll: impl FnMut() -> Option<T>) -> Option<T> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Some(v) = poll() {
                return Some(v);
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        None
    }

    #[test]
    fn scheduler_creation() {
        let scheduler = Scheduler::with_defaults(Arc::new(MockRenderer::new())).unwrap();
        assert_eq!(scheduler.worker_count(), 3);
        assert_eq!(scheduler.tiers().len(), 5);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.metrics().publishes, 0);
        assert!(scheduler.take_latest_image().is_none());
        scheduler.shutdown();
    }

    #[test]
    fn invalid_config_is_fatal() {
        let zero = SchedulerConfig { worker_count: 0, ..SchedulerConfig::default() };
        let err = Scheduler::new(zero, Arc::new(MockRenderer::new())).err().unwrap();
        assert!(matches!(err, SchedulerError::Config(ConfigError::ZeroWorkers)));

        let empty = SchedulerConfig { tiers: vec![], ..SchedulerConfig::default() };
        let err = Scheduler::new(empty, Arc::new(MockRenderer::new())).err().unwrap();
        assert!(matches!(err, SchedulerError::Config(ConfigError::EmptyTierLadder)));

        let huge = SchedulerConfig {
            worker_count: 1,
            tiers: vec![Tier::new(u32::MAX, u32::MAX, 36.0)],
            ..SchedulerConfig::default()
        };
        let err = Scheduler::new(huge, Arc::new(MockRenderer::new())).err().unwrap();
        assert!(matches!(err, SchedulerError::Config(ConfigError::InvalidTier { index: 0, .. })));
    }

    #[test]
    fn independent_instances() {
        let config = SchedulerConfig { worker_count: 1, tiers: ladder(), ..SchedulerConfig::default() };
        let a = Scheduler::new(config.clone(), Arc::new(MockRenderer::new())).unwrap();
        let b = Scheduler::new(config, Arc::new(MockRenderer::new())).unwrap();
        assert_ne!(a.id(), b.id());

        a.submit_pose([1.0, 0.0, 0.0], [0.0; 3]);
        let frame = wait_for(Duration::from_secs(5), || a.take_latest_image()).unwrap();
        assert_eq!(frame.stamp.seq, 1);
        assert_eq!(b.last_accepted_seq(), 0);
        assert!(b.take_latest_image().is_none());
    }

    #[test]
    fn submit_updates_metrics() {
        let config = SchedulerConfig { worker_count: 1, tiers: ladder(), ..SchedulerConfig::default() };
        let scheduler = Scheduler::new(config, Arc::new(MockRenderer::new())).unwrap();
        scheduler.submit_pose([1.0, 2.0, 3.0], [0.0, 90.0, 0.0]);
        scheduler.submit_pose([1.0, 2.0, 3.0], [0.0, 90.0, 0.0]);

        let m = scheduler.metrics();
        assert_eq!(m.poses_submitted, 2);
        assert_eq!(m.poses_deduplicated, 1);
        assert_eq!(m.requests_accepted, 1);
        assert_eq!(scheduler.last_accepted_seq(), 1);
    }

    #[test]
    fn shutdown_joins_idle_and_busy_workers() {
        let renderer = |_pose: &Pose, tier: &Tier| -> Result<Image, RenderError> {
            std::thread::sleep(Duration::from_millis(20));
            Ok(Image::blank_for(tier))
        };
        let config = SchedulerConfig { worker_count: 3, tiers: ladder(), ..SchedulerConfig::default() };
        let scheduler = Scheduler::new(config, Arc::new(renderer)).unwrap();
        scheduler.submit_pose([1.0, 0.0, 0.0], [0.0; 3]);
        std::thread::sleep(Duration::from_millis(5));

        let started = Instant::now();
        scheduler.shutdown();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn worker_survives_failures() {
        let failures_left = Arc::new(AtomicUsize::new(2));
        let renderer = {
            let failures_left = Arc::clone(&failures_left);
            move |_pose: &Pose, tier: &Tier| -> Result<Image, RenderError> {
                let left = failures_left.load(Ordering::SeqCst);
                if left > 0 {
                    failures_left.store(left - 1, Ordering::SeqCst);
                    if left == 1 {
                        panic!("transient panic");
                    }
                    return Err(RenderError::Failed("transient".into()));
                }
                Ok(Image::blank_for(tier))
            }
        };
        let config = SchedulerConfig { worker_count: 1, tiers: vec![Tier::new(8, 8, 36.0)], ..SchedulerConfig::default() };
        let scheduler = Scheduler::new(config, Arc::new(renderer)).unwrap();

        // Each submission waits for the single worker to go idle again.
        for x in 1..=3 {
            scheduler.submit_pose([x as f64, 0.0, 0.0], [0.0; 3]);
            wait_for(Duration::from_secs(5), || {
                let m = scheduler.metrics();
                (m.requests_claimed == x && m.active_workers == 0 && m.pending_requests == 0).then_some(())
            })
            .unwrap();
        }

        let frame = wait_for(Duration::from_secs(5), || scheduler.take_latest_image()).unwrap();
        assert_eq!(frame.stamp.seq, 3);
        let m = scheduler.metrics();
        assert_eq!(m.render_failures, 2);
        assert_eq!(m.requests_abandoned, 2);
        assert_eq!(m.requests_completed, 1);
    }
}
