//! Freshness arbitration.
//!
//! Two independent cells: the sequence number of the most recently accepted
//! request and that of the most recently published result. Each is a single
//! atomic, so workers checking staleness never contend with one another or
//! with the gate beyond a cache line.

use std::sync::atomic::{AtomicU64, Ordering};

use freshframe_core::{Frame, RequestStamp};

use crate::mailbox::ResultMailbox;

#[derive(Debug, Default)]
pub struct FreshnessArbiter {
    last_accepted: AtomicU64,
    last_published: AtomicU64,
}

impl FreshnessArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next sequence number and record it as last accepted.
    pub fn accept(&self) -> u64 {
        self.last_accepted.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn last_accepted(&self) -> u64 {
        self.last_accepted.load(Ordering::SeqCst)
    }

    pub fn last_published(&self) -> u64 {
        self.last_published.load(Ordering::SeqCst)
    }

    /// Whether no newer request has been accepted since `stamp`.
    pub fn is_still_current(&self, stamp: &RequestStamp) -> bool {
        stamp.seq >= self.last_accepted.load(Ordering::SeqCst)
    }

    /// Publish `frame` if its request is at least as new as the last
    /// published one. On success the publish cell advances and the frame is
    /// installed in `mailbox`; on failure nothing changes.
    pub fn try_publish(&self, frame: Frame, mailbox: &ResultMailbox) -> bool {
        let seq = frame.stamp.seq;
        let advanced = self
            .last_published
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (seq >= current).then_some(seq)
            })
            .is_ok();
        // The mailbox re-checks under its own lock: a newer publisher may
        // have advanced the cell and installed between our update and here.
        advanced && mailbox.install(frame)
    }
}
