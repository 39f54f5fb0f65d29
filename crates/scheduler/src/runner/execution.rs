use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info_span, warn};

use freshframe_core::{Frame, Image, Pose, RenderRequest, Tier};

use crate::render::{RenderError, Renderer};

use super::core::Shared;

/// How a claimed request left the tier loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RequestOutcome {
    /// Every tier was rendered (published or not).
    Completed,
    /// A newer request was accepted before tier `at_tier` started.
    Superseded { at_tier: usize },
    /// Rendering tier `at_tier` failed; remaining tiers were skipped.
    Failed { at_tier: usize },
}

/// Worker thread body: claim the freshest request, render it, repeat.
/// Returns only when the request buffer is closed.
pub(super) fn run_worker(shared: Arc<Shared>, index: usize) {
    let span = info_span!("render_worker", scheduler = %shared.id, worker = index);
    let _entered = span.enter();
    debug!("worker started");

    while let Some(request) = shared.buffer.wait_claim() {
        shared.active_workers.fetch_add(1, Ordering::Relaxed);
        shared.record(|m| m.requests_claimed += 1);

        let outcome = process_request(&shared, &request);
        debug!(seq = request.stamp.seq, ?outcome, "request finished");
        shared.record(|m| match outcome {
            RequestOutcome::Completed => m.requests_completed += 1,
            RequestOutcome::Superseded { .. } => m.requests_abandoned += 1,
            RequestOutcome::Failed { .. } => {
                m.render_failures += 1;
                m.requests_abandoned += 1;
            }
        });

        shared.active_workers.fetch_sub(1, Ordering::Relaxed);
    }

    debug!("worker stopped");
}

/// Walk the tier ladder for one request, cheapest tier first.
///
/// Before each tier the request must still be the newest accepted one;
/// otherwise the remaining tiers are abandoned. After each render the frame
/// goes through publish arbitration. No lock is held while rendering.
pub(super) fn process_request(shared: &Shared, request: &RenderRequest) -> RequestOutcome {
    let seq = request.stamp.seq;
    for (tier_index, tier) in shared.ladder.iter().enumerate() {
        if !shared.arbiter.is_still_current(&request.stamp) {
            debug!(seq, tier = tier_index, "request superseded, abandoning");
            return RequestOutcome::Superseded { at_tier: tier_index };
        }

        let started = Instant::now();
        let image = match render_tier(shared.renderer.as_ref(), &request.pose, tier) {
            Ok(image) => image,
            Err(e) => {
                warn!(seq, tier = tier_index, error = %e, "render failed, abandoning request");
                return RequestOutcome::Failed { at_tier: tier_index };
            }
        };
        let elapsed = started.elapsed();
        shared.record(|m| m.record_render(tier_index, elapsed));

        let frame = Frame {
            image,
            stamp: request.stamp,
            tier_index,
            tier: *tier,
            pose: request.pose,
        };
        if shared.arbiter.try_publish(frame, &shared.mailbox) {
            let latency = request.stamp.age();
            debug!(seq, tier = tier_index, ?elapsed, ?latency, "published");
            shared.record(|m| m.record_publish(latency));
        } else {
            debug!(seq, tier = tier_index, "newer result already published, discarding");
            shared.record(|m| m.publish_rejections += 1);
        }
    }
    RequestOutcome::Completed
}

/// One render call with panics and malformed output folded into
/// [`RenderError`].
pub(super) fn render_tier(renderer: &dyn Renderer, pose: &Pose, tier: &Tier) -> Result<Image, RenderError> {
    let image = panic::catch_unwind(AssertUnwindSafe(|| renderer.render(pose, tier)))
        .unwrap_or_else(|payload| Err(RenderError::Panicked(panic_message(&*payload))))?;
    image
        .validate_for(tier)
        .map_err(|(expected, actual)| RenderError::InvalidOutput { expected, actual })?;
    Ok(image)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
