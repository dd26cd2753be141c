//! The host audio engine as seen by the tracking engine.
//!
//! Every query answers `None` when the handle is no longer valid. The
//! tracking engine treats that as "not playing" / "neutral" and keeps
//! going; it never mutates host playback state.

use crate::handle::{BusKey, ChannelKey};

/// Result of polling a channel's playback cursor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PositionPoll {
    /// Raw sample position in the runtime domain
    pub position: u32,
    pub playing: bool,
    pub paused: bool,
}

/// Loop extents in the runtime domain (inclusive).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopPoints {
    pub start: u32,
    pub end: u32,
}

/// DSP-clock scheduling of a channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulePoll {
    /// Clock tick at which the channel begins producing samples
    pub start_tick: Option<u64>,
    /// Clock tick at which the channel stops
    pub end_tick: Option<u64>,
    /// Current engine clock tick
    pub now: u64,
}

impl SchedulePoll {
    /// Returns true once the scheduled start has been reached.
    pub fn has_started(&self) -> bool {
        self.start_tick.map_or(true, |start| self.now >= start)
    }
}

/// Playing/paused flags of a mixing bus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusState {
    pub playing: bool,
    pub paused: bool,
}

/// Read-only view of the host engine.
pub trait AudioHost {
    /// Cursor, playing and paused flags of a channel.
    fn poll_position(&self, channel: ChannelKey) -> Option<PositionPoll>;

    /// Current loop extents of a channel.
    fn poll_loop_points(&self, channel: ChannelKey) -> Option<LoopPoints>;

    /// Scheduled start/end of a channel on the engine clock.
    fn poll_scheduling(&self, channel: ChannelKey) -> Option<SchedulePoll>;

    /// Runtime sample rate of the sound a channel plays.
    fn sound_rate(&self, channel: ChannelKey) -> Option<u32>;

    /// Bus the channel is routed into.
    fn channel_parent(&self, channel: ChannelKey) -> Option<BusKey>;

    /// Parent of a bus (`None` at the top of the tree).
    fn bus_parent(&self, bus: BusKey) -> Option<BusKey>;

    /// The channel's own pitch factor.
    fn channel_pitch(&self, channel: ChannelKey) -> Option<f32>;

    /// Channel playback frequency relative to its sound's native rate.
    fn channel_frequency_ratio(&self, channel: ChannelKey) -> Option<f32>;

    /// Pitch factor of a bus.
    fn bus_pitch(&self, bus: BusKey) -> Option<f32>;

    /// Playing/paused flags of a bus.
    fn bus_state(&self, bus: BusKey) -> Option<BusState>;
}
