//! Authored track metadata.

use arrayvec::ArrayString;

/// Fixed-capacity track identifier (no heap on the realtime path).
pub type TrackName = ArrayString<64>;

/// Metadata recorded when timing data for a track was authored.
///
/// Supplied by the asset layer when a visor is initialized. Names longer
/// than [`TrackName`] capacity are truncated at a character boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackInfo {
    /// Identifier handed to the downstream consumer with every span
    pub name: TrackName,
    /// Sample rate the timing metadata was authored at
    pub authored_rate: u32,
    /// Track length in authored samples (0 = unknown)
    pub total_samples: u32,
}

impl Default for TrackInfo {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            authored_rate: 44100,
            total_samples: 0,
        }
    }
}

impl TrackInfo {
    /// Create track metadata.
    pub fn new(name: &str, authored_rate: u32, total_samples: u32) -> Self {
        let mut info = Self {
            authored_rate,
            total_samples,
            ..Self::default()
        };
        for ch in name.chars() {
            if info.name.try_push(ch).is_err() {
                break;
            }
        }
        info
    }

    /// Track length as a signed sample count (saturating).
    pub fn total_samples_i32(&self) -> i32 {
        i32::try_from(self.total_samples).unwrap_or(i32::MAX)
    }

    /// Duration in seconds, or 0.0 when the length or rate is unknown.
    pub fn duration_seconds(&self) -> f64 {
        if self.authored_rate == 0 {
            0.0
        } else {
            self.total_samples as f64 / self.authored_rate as f64
        }
    }
}
