//! Playback status.

/// Coarse playback state of a tracked source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlaybackStatus {
    /// Nothing is playing and nothing is left to deliver.
    #[default]
    Stopped,
    /// Samples are advancing or still waiting to be delivered.
    Playing,
    /// Playback is held.
    Paused,
}

impl PlaybackStatus {
    /// Merge two source statuses: playing wins, then paused, then stopped.
    pub fn combine(self, other: PlaybackStatus) -> PlaybackStatus {
        match (self, other) {
            (PlaybackStatus::Playing, _) | (_, PlaybackStatus::Playing) => PlaybackStatus::Playing,
            (PlaybackStatus::Paused, _) | (_, PlaybackStatus::Paused) => PlaybackStatus::Paused,
            _ => PlaybackStatus::Stopped,
        }
    }

    pub fn is_playing(self) -> bool {
        self == PlaybackStatus::Playing
    }
}
