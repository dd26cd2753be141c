//! Buffered spans of played samples.

/// A contiguous span of samples `[first, last]` played at `speed`.
///
/// Bounds are inclusive and expressed in the authored sample domain.
/// `last == -1` marks an empty (fully consumed) range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleRange {
    pub first: i32,
    pub last: i32,
    /// Effective playback speed while this span played.
    pub speed: f32,
}

impl Default for SampleRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl SampleRange {
    /// The consumed/idle sentinel.
    pub const EMPTY: SampleRange = SampleRange {
        first: 0,
        last: -1,
        speed: 1.0,
    };

    /// Create a span. Callers guarantee `last >= first - 1`.
    pub const fn new(first: i32, last: i32, speed: f32) -> Self {
        Self { first, last, speed }
    }

    /// Returns true if this is the empty sentinel or holds no samples.
    pub fn is_empty(&self) -> bool {
        self.last == -1 || self.last < self.first
    }

    /// Number of samples covered.
    pub fn len(&self) -> i32 {
        if self.is_empty() {
            0
        } else {
            self.last - self.first + 1
        }
    }

    /// Returns true if this span starts right after `prev` ends.
    pub fn follows(&self, prev: &SampleRange) -> bool {
        self.first == prev.last + 1
    }

    /// Mark as consumed.
    pub fn clear(&mut self) {
        *self = Self::EMPTY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_sample_span_has_length_one() {
        let r = SampleRange::new(42, 42, 1.0);
        assert!(!r.is_empty());
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn empty_sentinel() {
        let mut r = SampleRange::new(0, 99, 1.0);
        r.clear();
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
        assert_eq!(r.last, -1);
    }

    #[test]
    fn zero_length_span_is_empty() {
        let r = SampleRange::new(10, 9, 1.0);
        assert!(r.is_empty());
    }

    #[test]
    fn follows_detects_contiguity() {
        let a = SampleRange::new(0, 99, 1.0);
        let b = SampleRange::new(100, 199, 1.0);
        let c = SampleRange::new(50, 60, 1.0);
        assert!(b.follows(&a));
        assert!(!c.follows(&a));
    }
}
