//! Conversion between the runtime and authored sample domains.

use crate::host::LoopPoints;

/// `authored_rate / runtime_rate`, used to express raw engine positions
/// in the authored sample domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateRatio {
    ratio: f64,
}

impl Default for RateRatio {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RateRatio {
    pub const IDENTITY: RateRatio = RateRatio { ratio: 1.0 };

    /// Build the ratio. A zero rate on either side yields the identity.
    pub fn new(authored_rate: u32, runtime_rate: u32) -> Self {
        if authored_rate == 0 || runtime_rate == 0 {
            return Self::IDENTITY;
        }
        Self {
            ratio: authored_rate as f64 / runtime_rate as f64,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Convert a raw engine sample position to the authored domain.
    ///
    /// Rounds to nearest so consecutive conversions do not drift low.
    pub fn to_authored(&self, raw: i64) -> i32 {
        let scaled = libm::round(raw as f64 * self.ratio);
        scaled.clamp(i32::MIN as f64, i32::MAX as f64) as i32
    }
}

/// Loop/extent bounds of the tracked source, authored domain, inclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackWindow {
    pub start: i32,
    pub end: i32,
}

impl PlaybackWindow {
    pub const fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// The whole track. An unknown length (0) yields an unbounded window.
    pub fn full(total_samples: i32) -> Self {
        if total_samples <= 0 {
            Self::new(0, i32::MAX)
        } else {
            Self::new(0, total_samples - 1)
        }
    }

    /// Normalize raw loop points, clamping malformed extents.
    ///
    /// An inverted or negative window collapses to the full track; an end
    /// past the track length is pulled back to the last sample.
    pub fn normalized(points: LoopPoints, ratio: RateRatio, total_samples: i32) -> Self {
        let full = Self::full(total_samples);
        let start = ratio.to_authored(points.start as i64);
        let end = ratio.to_authored(points.end as i64).min(full.end);
        if start < 0 || end < start {
            full
        } else {
            Self::new(start, end)
        }
    }

    /// Returns true if `pos` lies within the window.
    pub fn contains(&self, pos: i32) -> bool {
        pos >= self.start && pos <= self.end
    }
}
