//! Bounded LIFO request buffer with oldest-first eviction.
//!
//! Capacity equals the worker count. `offer` never blocks: when full, the
//! oldest pending request is dropped to make room. `claim` always hands out
//! the newest request, so an idle worker picks up the freshest pose.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use freshframe_core::RenderRequest;

#[derive(Debug, Default)]
struct BufferState {
    /// Oldest at the front, newest at the back.
    pending: VecDeque<RenderRequest>,
    closed: bool,
}

#[derive(Debug)]
pub struct RequestBuffer {
    capacity: usize,
    state: Mutex<BufferState>,
    available: Condvar,
}

impl RequestBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(BufferState {
                pending: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    // Every critical section is a single container operation, so a panic
    // while holding the lock cannot leave the deque half-updated.
    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit a request, returning the evicted oldest entry if the buffer was
    /// full. A closed buffer drops the request.
    pub fn offer(&self, request: RenderRequest) -> Option<RenderRequest> {
        let evicted = {
            let mut state = self.lock();
            if state.closed {
                return None;
            }
            let evicted = if state.pending.len() >= self.capacity {
                state.pending.pop_front()
            } else {
                None
            };
            state.pending.push_back(request);
            evicted
        };
        self.available.notify_one();
        evicted
    }

    /// Take the newest pending request without waiting.
    pub fn claim(&self) -> Option<RenderRequest> {
        self.lock().pending.pop_back()
    }

    /// Take the newest pending request, waiting for one to be offered.
    /// Returns `None` once the buffer is closed.
    pub fn wait_claim(&self) -> Option<RenderRequest> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(request) = state.pending.pop_back() {
                return Some(request);
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Close the buffer: discard pending requests and wake every waiter.
    /// Returns the number of requests discarded.
    pub fn close(&self) -> usize {
        let discarded = {
            let mut state = self.lock();
            state.closed = true;
            let discarded = state.pending.len();
            state.pending.clear();
            discarded
        };
        self.available.notify_all();
        discarded
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sequence numbers of pending requests, oldest first.
    pub fn pending_seqs(&self) -> Vec<u64> {
        self.lock().pending.iter().map(|r| r.stamp.seq).collect()
    }
}
