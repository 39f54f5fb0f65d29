//! Single-slot holder for the most recently published frame.

use std::sync::{Mutex, MutexGuard, PoisonError};

use freshframe_core::Frame;

#[derive(Debug, Default)]
struct Slot {
    frame: Option<Frame>,
    /// Highest request sequence ever installed; survives `peek_and_clear`.
    newest_seq: u64,
}

#[derive(Debug, Default)]
pub struct ResultMailbox {
    slot: Mutex<Slot>,
}

impl ResultMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install `frame` unless a frame from a newer request has already been
    /// installed. Returns whether the frame now occupies the slot.
    pub fn install(&self, frame: Frame) -> bool {
        let mut slot = self.lock();
        if frame.stamp.seq < slot.newest_seq {
            return false;
        }
        slot.newest_seq = frame.stamp.seq;
        slot.frame = Some(frame);
        true
    }

    /// Take the held frame, leaving the slot empty.
    pub fn peek_and_clear(&self) -> Option<Frame> {
        self.lock().frame.take()
    }

    pub fn has_frame(&self) -> bool {
        self.lock().frame.is_some()
    }
}
