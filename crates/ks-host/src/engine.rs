//! The host engine: clock, buses and channels.

use ks_ir::{AudioHost, BusKey, BusState, ChannelKey, LoopPoints, PositionPoll, SchedulePoll};
use slotmap::SlotMap;

use crate::channel::{Channel, Sound};
use crate::error::HostError;
use crate::graph::BusGraph;

/// Called with the channel key whenever a channel stops on its own.
///
/// Runs on whichever thread calls [`HostEngine::advance`], like a native
/// engine callback would.
pub type EndHook = Box<dyn FnMut(ChannelKey) + Send>;

/// A software audio engine advanced in DSP-clock ticks.
pub struct HostEngine {
    /// Output mixing rate; one clock tick per output sample
    mix_rate: u32,
    /// Current DSP clock
    clock: u64,
    graph: BusGraph,
    channels: SlotMap<ChannelKey, Channel>,
    end_hook: Option<EndHook>,
}

impl HostEngine {
    /// Create an engine mixing at `mix_rate` with an empty master bus.
    pub fn new(mix_rate: u32) -> Self {
        Self {
            mix_rate: mix_rate.max(1),
            clock: 0,
            graph: BusGraph::with_master(),
            channels: SlotMap::with_key(),
            end_hook: None,
        }
    }

    pub fn mix_rate(&self) -> u32 {
        self.mix_rate
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn master(&self) -> BusKey {
        self.graph.master()
    }

    pub fn graph(&self) -> &BusGraph {
        &self.graph
    }

    // --- Buses ---

    pub fn add_bus(&mut self, parent: BusKey) -> Result<BusKey, HostError> {
        self.graph.add_bus(parent)
    }

    pub fn remove_bus(&mut self, bus: BusKey) -> Result<(), HostError> {
        self.graph.remove_bus(bus)
    }

    pub fn set_bus_pitch(&mut self, bus: BusKey, pitch: f32) -> Result<(), HostError> {
        self.graph.bus_mut(bus)?.pitch = pitch;
        Ok(())
    }

    pub fn set_bus_paused(&mut self, bus: BusKey, paused: bool) -> Result<(), HostError> {
        self.graph.bus_mut(bus)?.paused = paused;
        Ok(())
    }

    // --- Channels ---

    /// Start `sound` on `bus` immediately.
    pub fn play(&mut self, sound: Sound, bus: BusKey) -> Result<ChannelKey, HostError> {
        if self.graph.bus(bus).is_none() {
            return Err(HostError::UnknownBus(bus));
        }
        Ok(self.channels.insert(Channel::new(sound, Some(bus))))
    }

    /// Schedule `sound` to start at clock tick `start_tick` from `entry`.
    ///
    /// The channel reports playing (not yet advancing) until the clock
    /// reaches `start_tick`.
    pub fn play_scheduled(
        &mut self,
        sound: Sound,
        bus: BusKey,
        start_tick: u64,
        entry: u32,
    ) -> Result<ChannelKey, HostError> {
        let key = self.play(sound, bus)?;
        let channel = self.channel_mut(key)?;
        channel.start_tick = Some(start_tick);
        channel.position = entry as f64;
        Ok(key)
    }

    /// Get a channel by key.
    pub fn channel(&self, key: ChannelKey) -> Option<&Channel> {
        self.channels.get(key)
    }

    /// Get a mutable reference to a channel by key.
    pub fn channel_mut(&mut self, key: ChannelKey) -> Result<&mut Channel, HostError> {
        self.channels
            .get_mut(key)
            .ok_or(HostError::UnknownChannel(key))
    }

    /// Jump the cursor (a seek).
    pub fn set_position(&mut self, key: ChannelKey, position: u32) -> Result<(), HostError> {
        self.channel_mut(key)?.position = position as f64;
        Ok(())
    }

    pub fn set_paused(&mut self, key: ChannelKey, paused: bool) -> Result<(), HostError> {
        self.channel_mut(key)?.paused = paused;
        Ok(())
    }

    pub fn set_pitch(&mut self, key: ChannelKey, pitch: f32) -> Result<(), HostError> {
        self.channel_mut(key)?.pitch = pitch;
        Ok(())
    }

    pub fn set_frequency_ratio(&mut self, key: ChannelKey, ratio: f32) -> Result<(), HostError> {
        self.channel_mut(key)?.frequency_ratio = ratio;
        Ok(())
    }

    /// Replace the loop extents of a playing channel.
    pub fn set_loop_points(&mut self, key: ChannelKey, start: u32, end: u32) -> Result<(), HostError> {
        let channel = self.channel_mut(key)?;
        let length = channel.sound.length;
        if end <= start || end >= length {
            return Err(HostError::InvalidLoop { start, end, length });
        }
        channel.loop_points = LoopPoints { start, end };
        Ok(())
    }

    /// Stop the channel at clock tick `end_tick` (None = play out).
    pub fn set_end_tick(&mut self, key: ChannelKey, end_tick: Option<u64>) -> Result<(), HostError> {
        self.channel_mut(key)?.end_tick = end_tick;
        Ok(())
    }

    /// Stop a channel now. The handle stays valid until released.
    pub fn stop(&mut self, key: ChannelKey) -> Result<(), HostError> {
        let channel = self.channels.get_mut(key).ok_or(HostError::UnknownChannel(key))?;
        if channel.playing {
            channel.playing = false;
            if let Some(hook) = self.end_hook.as_mut() {
                hook(key);
            }
        }
        Ok(())
    }

    /// Destroy a channel; its key goes stale.
    pub fn release_channel(&mut self, key: ChannelKey) -> Result<(), HostError> {
        self.channels
            .remove(key)
            .map(|_| ())
            .ok_or(HostError::UnknownChannel(key))
    }

    /// Count of channels currently playing or scheduled.
    pub fn playing_count(&self) -> usize {
        self.channels.values().filter(|c| c.playing).count()
    }

    // --- Callbacks ---

    pub fn set_end_hook(&mut self, hook: EndHook) {
        self.end_hook = Some(hook);
    }

    pub fn clear_end_hook(&mut self) {
        self.end_hook = None;
    }

    // --- Mixing ---

    /// Advance the DSP clock by `ticks` output samples.
    ///
    /// Every started, unheld channel moves by its effective rate; channels
    /// that reach their sound end or scheduled end stop and fire the end hook.
    pub fn advance(&mut self, ticks: u64) {
        let Self {
            mix_rate,
            clock,
            graph,
            channels,
            end_hook,
        } = self;
        let from = *clock;
        let to = from.saturating_add(ticks);

        for (key, channel) in channels.iter_mut() {
            if !channel.playing {
                continue;
            }
            let mut ended = false;

            if !channel.paused && !graph.is_held(channel.parent) {
                let start = channel.start_tick.map_or(from, |s| s.max(from));
                let stop = channel.end_tick.map_or(to, |e| e.min(to));
                if stop > start {
                    let rate = channel.frequency_ratio as f64
                        * channel.pitch as f64
                        * graph.pitch_product(channel.parent) as f64
                        * channel.sound.rate as f64
                        / *mix_rate as f64;
                    ended = channel.advance((stop - start) as f64 * rate);
                }
            }

            if channel.playing && channel.end_tick.is_some_and(|end| end <= to) {
                channel.playing = false;
                ended = true;
            }

            if ended {
                log::debug!("host: channel {:?} ended at clock {}", key, to);
                if let Some(hook) = end_hook.as_mut() {
                    hook(key);
                }
            }
        }

        *clock = to;
    }

    /// Advance the clock by a duration in seconds (rounded to whole ticks).
    pub fn advance_seconds(&mut self, seconds: f64) {
        if seconds > 0.0 {
            self.advance((seconds * self.mix_rate as f64).round() as u64);
        }
    }
}

impl AudioHost for HostEngine {
    fn poll_position(&self, channel: ChannelKey) -> Option<PositionPoll> {
        let ch = self.channels.get(channel)?;
        Some(PositionPoll {
            position: ch.reported_position(),
            playing: ch.playing,
            paused: ch.paused,
        })
    }

    fn poll_loop_points(&self, channel: ChannelKey) -> Option<LoopPoints> {
        self.channels.get(channel).map(|ch| ch.loop_points)
    }

    fn poll_scheduling(&self, channel: ChannelKey) -> Option<SchedulePoll> {
        let ch = self.channels.get(channel)?;
        Some(SchedulePoll {
            start_tick: ch.start_tick,
            end_tick: ch.end_tick,
            now: self.clock,
        })
    }

    fn sound_rate(&self, channel: ChannelKey) -> Option<u32> {
        self.channels.get(channel).map(|ch| ch.sound.rate)
    }

    fn channel_parent(&self, channel: ChannelKey) -> Option<BusKey> {
        self.channels.get(channel)?.parent
    }

    fn bus_parent(&self, bus: BusKey) -> Option<BusKey> {
        self.graph.bus(bus)?.parent
    }

    fn channel_pitch(&self, channel: ChannelKey) -> Option<f32> {
        self.channels.get(channel).map(|ch| ch.pitch)
    }

    fn channel_frequency_ratio(&self, channel: ChannelKey) -> Option<f32> {
        self.channels.get(channel).map(|ch| ch.frequency_ratio)
    }

    fn bus_pitch(&self, bus: BusKey) -> Option<f32> {
        self.graph.bus(bus).map(|b| b.pitch)
    }

    fn bus_state(&self, bus: BusKey) -> Option<BusState> {
        let state = self.graph.bus(bus)?;
        let playing = self
            .channels
            .values()
            .any(|ch| ch.playing && self.graph.routes_through(ch.parent, bus));
        Some(BusState {
            playing,
            paused: state.paused,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn advance_moves_channel_at_unity_rate() {
        let mut host = HostEngine::new(48000);
        let ch = host.play(Sound::new(48000, 48000), host.master()).unwrap();
        host.advance(1024);
        assert_eq!(host.poll_position(ch).unwrap().position, 1024);
        assert_eq!(host.clock(), 1024);
    }

    #[test]
    fn sound_rate_scales_advance() {
        let mut host = HostEngine::new(48000);
        let ch = host.play(Sound::new(24000, 48000), host.master()).unwrap();
        host.advance(1000);
        assert_eq!(host.poll_position(ch).unwrap().position, 500);
    }

    #[test]
    fn bus_pitch_scales_advance() {
        let mut host = HostEngine::new(1000);
        let music = host.add_bus(host.master()).unwrap();
        host.set_bus_pitch(music, 2.0).unwrap();
        let ch = host.play(Sound::new(1000, 10_000), music).unwrap();
        host.advance(100);
        assert_eq!(host.poll_position(ch).unwrap().position, 200);
    }

    #[test]
    fn paused_bus_holds_channel() {
        let mut host = HostEngine::new(1000);
        let music = host.add_bus(host.master()).unwrap();
        let ch = host.play(Sound::new(1000, 10_000), music).unwrap();
        host.set_bus_paused(music, true).unwrap();
        host.advance(100);
        assert_eq!(host.poll_position(ch).unwrap().position, 0);
        assert!(host.bus_state(music).unwrap().paused);
    }

    #[test]
    fn scheduled_channel_waits_for_start_tick() {
        let mut host = HostEngine::new(1000);
        let ch = host
            .play_scheduled(Sound::new(1000, 10_000), host.master(), 500, 2000)
            .unwrap();
        host.advance(300);
        let poll = host.poll_position(ch).unwrap();
        assert!(poll.playing);
        assert_eq!(poll.position, 2000);
        assert!(!host.poll_scheduling(ch).unwrap().has_started());

        host.advance(300);
        assert_eq!(host.poll_position(ch).unwrap().position, 2100);
        assert!(host.poll_scheduling(ch).unwrap().has_started());
    }

    #[test]
    fn end_tick_freezes_position_and_fires_hook() {
        let mut host = HostEngine::new(1000);
        let ended = Arc::new(Mutex::new(Vec::new()));
        let sink = ended.clone();
        host.set_end_hook(Box::new(move |key| sink.lock().unwrap().push(key)));

        let ch = host.play(Sound::new(1000, 10_000), host.master()).unwrap();
        host.set_end_tick(ch, Some(1000)).unwrap();
        host.advance(900);
        host.advance(300);

        let poll = host.poll_position(ch).unwrap();
        assert!(!poll.playing);
        assert_eq!(poll.position, 1000);
        assert_eq!(*ended.lock().unwrap(), vec![ch]);
    }

    #[test]
    fn released_channel_goes_stale() {
        let mut host = HostEngine::new(1000);
        let ch = host.play(Sound::new(1000, 100), host.master()).unwrap();
        host.release_channel(ch).unwrap();
        assert!(host.poll_position(ch).is_none());
        assert_eq!(host.set_paused(ch, true), Err(HostError::UnknownChannel(ch)));
    }

    #[test]
    fn bus_reports_playing_while_descendant_plays() {
        let mut host = HostEngine::new(1000);
        let music = host.add_bus(host.master()).unwrap();
        let ch = host.play(Sound::new(1000, 100), music).unwrap();
        assert!(host.bus_state(host.master()).unwrap().playing);
        host.advance(200);
        assert!(!host.poll_position(ch).unwrap().playing);
        assert!(!host.bus_state(music).unwrap().playing);
    }

    #[test]
    fn invalid_loop_points_rejected() {
        let mut host = HostEngine::new(1000);
        let ch = host.play(Sound::new(1000, 100), host.master()).unwrap();
        assert_eq!(
            host.set_loop_points(ch, 50, 20),
            Err(HostError::InvalidLoop { start: 50, end: 20, length: 100 })
        );
        assert!(host.set_loop_points(ch, 10, 90).is_ok());
    }
}
