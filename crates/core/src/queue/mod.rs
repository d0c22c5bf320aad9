use std::collections::VecDeque;

use crate::audio::{SampleBuffer, MAX_BUFFERS};

/// FIFO that holds converted audio back by a fixed number of buffers so the
/// plugin sees audio in step with what is actually audible.
///
/// Buffers come out in arrival order. Once `depth` buffers are queued every
/// push releases exactly one buffer, the oldest. Changing the depth throws
/// away whatever was waiting; reconfiguration is deliberately lossy.
#[derive(Debug)]
pub struct DelayQueue {
    buffers: VecDeque<SampleBuffer>,
    spare: Vec<SampleBuffer>,
    depth: usize,
}

impl DelayQueue {
    pub fn new(depth: i64) -> Self {
        let mut queue = Self {
            buffers: VecDeque::with_capacity(MAX_BUFFERS),
            spare: Vec::new(),
            depth: 1,
        };
        queue.set_depth(depth);
        queue
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Clamps `depth` to `[1, MAX_BUFFERS]` and drops every queued buffer.
    pub fn set_depth(&mut self, depth: i64) {
        self.depth = depth.clamp(1, MAX_BUFFERS as i64) as usize;
        self.clear();
    }

    /// Drops queued buffers and returns to the minimum depth.
    pub fn reset(&mut self) {
        self.set_depth(1);
    }

    /// Enqueues `buffer` and returns the oldest buffer once the delay window
    /// is full.
    pub fn push(&mut self, buffer: SampleBuffer) -> Option<SampleBuffer> {
        self.buffers.push_back(buffer);
        if self.buffers.len() < self.depth {
            return None;
        }
        self.buffers.pop_front()
    }

    /// Hands out a previously released buffer, or a fresh one.
    pub fn take_spare(&mut self) -> SampleBuffer {
        self.spare.pop().unwrap_or_default()
    }

    /// Returns a consumed buffer for reuse by a later delivery.
    pub fn recycle(&mut self, buffer: SampleBuffer) {
        if self.spare.len() < MAX_BUFFERS {
            self.spare.push(buffer);
        }
    }

    fn clear(&mut self) {
        while let Some(buffer) = self.buffers.pop_front() {
            self.recycle(buffer);
        }
    }
}

impl Default for DelayQueue {
    fn default() -> Self {
        Self::new(1)
    }
}
