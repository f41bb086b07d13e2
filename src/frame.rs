// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Frame ownership primitives shared between the capture worker and the
//! detection task.
//!
//! A [`Frame`] is deliberately not `Clone`: only one task owns a decoded
//! frame at a time, it's moved from the capture worker into a slot or
//! queue, and moved back out by the detection task. This avoids the
//! double-buffer-copy pattern used in earlier, since-removed revisions of
//! this pipeline.

use std::collections::VecDeque;
use std::time::Instant;

use parking_lot::Mutex;

/// A single decoded BGR frame plus its capture timestamp.
#[derive(Debug)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Monotonically increasing per camera, assigned at capture (§3
    /// invariant). Defaults to 0 for call sites (mostly tests) that don't
    /// care about ordering; the capture worker assigns the real sequence
    /// via [`Frame::with_frame_id`].
    pub frame_id: u64,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            frame_id: 0,
            captured_at: Instant::now(),
        }
    }

    /// Attach a monotonic frame id, as the capture worker does for every
    /// frame it publishes.
    pub fn with_frame_id(mut self, frame_id: u64) -> Self {
        self.frame_id = frame_id;
        self
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Explicit deep copy. `Frame` is deliberately not `Clone` — this
    /// method exists for the few call sites the design calls out
    /// (`LatestSlot::peek_copy`, and a capture cycle publishing the same
    /// decoded frame to both the latest-slot and the handoff queue).
    pub fn deep_copy(&self) -> Frame {
        Frame {
            width: self.width,
            height: self.height,
            data: self.data.clone(),
            frame_id: self.frame_id,
            captured_at: self.captured_at,
        }
    }
}

/// Single-slot latest-frame holder. The capture worker `put`s, overwriting
/// whatever was there; the detection task `take`s, leaving the slot empty.
/// Never holds more than one frame, so a slow consumer only ever sees the
/// newest capture.
#[derive(Default)]
pub struct LatestSlot {
    inner: Mutex<Option<Frame>>,
}

impl LatestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever frame is in the slot. Returns the frame it
    /// displaced, if any (the caller typically drops it, incrementing a
    /// drop counter).
    pub fn put(&self, frame: Frame) -> Option<Frame> {
        self.inner.lock().replace(frame)
    }

    /// Remove and return the current frame, if any.
    pub fn take(&self) -> Option<Frame> {
        self.inner.lock().take()
    }

    /// Deep-copy the current frame without removing it, for a reader
    /// (UI sampling) that must not race the detection task's `take`.
    pub fn peek_copy(&self) -> Option<Frame> {
        self.inner.lock().as_ref().map(Frame::deep_copy)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_none()
    }
}

/// Bounded drop-oldest handoff queue between the capture worker and a
/// consumer that may briefly run behind. Capacity is small (2 by default)
/// since it exists purely to absorb short scheduling jitter; anything
/// enqueued beyond capacity evicts the oldest entry rather than blocking
/// the producer.
pub struct HandoffQueue {
    inner: Mutex<VecDeque<Frame>>,
    capacity: usize,
    dropped: std::sync::atomic::AtomicU64,
}

impl HandoffQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
            dropped: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Push a frame, evicting the oldest queued frame if at capacity.
    pub fn offer(&self, frame: Frame) {
        let mut queue = self.inner.lock();
        if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        queue.push_back(frame);
    }

    /// Pop the oldest frame, if any.
    pub fn poll(&self) -> Option<Frame> {
        self.inner.lock().pop_front()
    }

    /// Drain the queue, keeping only the newest entry. Used by a consumer
    /// that wants to catch up after falling behind instead of working
    /// through a backlog frame by frame.
    pub fn drain_to_latest(&self) -> Option<Frame> {
        let mut queue = self.inner.lock();
        let last = queue.pop_back();
        if !queue.is_empty() {
            self.dropped
                .fetch_add(queue.len() as u64, std::sync::atomic::Ordering::Relaxed);
            queue.clear();
        }
        last
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(std::sync::atomic::Ordering::Relaxed)
    }
}
