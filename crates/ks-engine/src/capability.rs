//! Sample-time queries shared by every kind of tracked source.

/// Read-only view of a source's synchronized playback cursor.
///
/// Positions are in the authored sample domain of the named clip.
pub trait SampleTimeSource {
    /// Delivered cursor for `clip`, or -1 when `clip` is not the one playing.
    fn sample_time_for_clip(&self, clip: &str) -> i32;

    /// Authored length of `clip`, or 0 when unknown or not current.
    fn total_sample_time_for_clip(&self, clip: &str) -> i32;

    fn is_playing(&self) -> bool;

    /// Effective playback speed of the source.
    fn pitch(&self) -> f32;

    fn current_clip_name(&self) -> Option<&str>;

    /// Delivered cursor of whatever clip is current.
    fn sample_time(&self) -> i32 {
        match self.current_clip_name() {
            Some(name) => self.sample_time_for_clip(name),
            None => -1,
        }
    }
}
