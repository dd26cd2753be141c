//! FIFO of buffered sample ranges.

use alloc::collections::VecDeque;
use ks_ir::SampleRange;

use crate::accumulator::RangeSink;

/// Ranges awaiting delivery, in playback order.
///
/// Holds only a handful of entries per tick since it is drained every
/// frame. With enough capacity reserved up front, steady-state pushes
/// and pops are allocation-free.
#[derive(Clone, Debug, Default)]
pub struct PlaybackBuffer {
    ranges: VecDeque<SampleRange>,
}

impl PlaybackBuffer {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        Self {
            ranges: VecDeque::new(),
        }
    }

    /// Create a buffer with room for `capacity` ranges.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ranges: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a range. Empty ranges are dropped.
    pub fn push(&mut self, range: SampleRange) {
        if range.is_empty() {
            return;
        }
        self.ranges.push_back(range);
    }

    /// Peek at the next range without removing it.
    pub fn peek(&self) -> Option<&SampleRange> {
        self.ranges.front()
    }

    /// Pop the oldest range.
    pub fn pop(&mut self) -> Option<SampleRange> {
        self.ranges.pop_front()
    }

    /// Drop all ranges, keeping the allocation.
    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns the number of buffered ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Iterate ranges oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &SampleRange> {
        self.ranges.iter()
    }

    /// Sum of samples across all buffered ranges.
    pub fn total_samples(&self) -> i64 {
        self.ranges.iter().map(|r| r.len() as i64).sum()
    }
}

impl RangeSink for PlaybackBuffer {
    fn push_range(&mut self, range: SampleRange) {
        self.push(range);
    }
}
