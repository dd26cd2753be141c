//! Accumulation phase: turn engine cursor movement into sample ranges.
//!
//! Once per tick the accumulator polls the primary source (and a queued
//! transition source, if any), detects loop wraps, jumps and handoffs,
//! and appends what was newly played since the previous tick.

use ks_ir::{
    AudioHost, BusKey, ChannelKey, PlaybackStatus, PlaybackWindow, RateRatio, SampleRange, TrackInfo,
};

use crate::speed::{resolve_speed, sanitize_speed};

/// Destination for accumulated ranges.
pub trait RangeSink {
    fn push_range(&mut self, range: SampleRange);
}

/// No raw position has been read yet.
const UNSET: i64 = -1;

/// A source waiting to take over from the primary.
#[derive(Clone, Copy, Debug, PartialEq)]
struct QueuedSource {
    channel: ChannelKey,
    ratio: RateRatio,
    source_rate: u32,
    /// Authored position the source enters the timeline at (pending window start)
    entry: i32,
}

/// Per-source polling state.
#[derive(Clone, Debug)]
pub struct PositionAccumulator {
    /// Source currently being observed
    primary: Option<ChannelKey>,
    /// Source scheduled to take over
    queued: Option<QueuedSource>,
    /// Rate the track's timing data was authored at
    authored_rate: u32,
    /// Runtime rate of the primary's sound
    source_rate: u32,
    /// Authored / runtime conversion for the primary
    ratio: RateRatio,
    /// Authored track length (0 = unknown)
    total_samples: i32,
    /// Last raw engine cursor (runtime domain)
    last_raw: i64,
    /// Loop extents used for wrap detection (authored domain)
    window: PlaybackWindow,
    /// Last resolved effective speed
    current_speed: f32,
}

impl Default for PositionAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionAccumulator {
    /// Create an idle accumulator.
    pub fn new() -> Self {
        Self {
            primary: None,
            queued: None,
            authored_rate: 0,
            source_rate: 0,
            ratio: RateRatio::IDENTITY,
            total_samples: 0,
            last_raw: UNSET,
            window: PlaybackWindow::default(),
            current_speed: 1.0,
        }
    }

    /// Start observing `channel` as the primary source of `track`.
    pub fn init<H>(&mut self, host: &H, track: &TrackInfo, channel: ChannelKey)
    where
        H: AudioHost + ?Sized,
    {
        self.reset();
        self.primary = Some(channel);
        self.authored_rate = track.authored_rate;
        self.source_rate = host.sound_rate(channel).unwrap_or(track.authored_rate);
        self.ratio = RateRatio::new(track.authored_rate, self.source_rate);
        self.total_samples = track.total_samples_i32();
        self.window = self.read_window(host, channel, self.ratio);
        self.last_raw = host
            .poll_position(channel)
            .map_or(UNSET, |poll| poll.position as i64);
        self.current_speed = sanitize_speed(resolve_speed(host, channel, None));
    }

    /// Forget all sources and positions.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Queue `channel` to take over once its scheduled start is reached.
    ///
    /// Replaces any previously queued source.
    pub fn queue<H>(&mut self, host: &H, channel: ChannelKey)
    where
        H: AudioHost + ?Sized,
    {
        let source_rate = host.sound_rate(channel).unwrap_or(self.source_rate);
        let ratio = RateRatio::new(self.authored_rate, source_rate);
        let entry = host
            .poll_position(channel)
            .map_or(self.window.start, |poll| ratio.to_authored(poll.position as i64));

        if let Some(previous) = self.queued {
            log::debug!("replacing queued channel {:?} with {:?}", previous.channel, channel);
        }
        self.queued = Some(QueuedSource {
            channel,
            ratio,
            source_rate,
            entry,
        });
    }

    /// Drop a handle the host reported as gone. Returns true if it was tracked.
    pub fn forget(&mut self, channel: ChannelKey) -> bool {
        let mut found = false;
        if self.primary == Some(channel) {
            self.primary = None;
            found = true;
        }
        if self.queued.is_some_and(|q| q.channel == channel) {
            self.queued = None;
            found = true;
        }
        found
    }

    /// Source currently being observed.
    pub fn primary(&self) -> Option<ChannelKey> {
        self.primary
    }

    /// Source waiting to take over, if any.
    pub fn queued(&self) -> Option<ChannelKey> {
        self.queued.map(|q| q.channel)
    }

    /// Loop extents used for wrap detection (authored domain).
    pub fn window(&self) -> PlaybackWindow {
        self.window
    }

    /// Effective speed recorded with the latest range.
    pub fn current_speed(&self) -> f32 {
        self.current_speed
    }

    /// Runtime sample rate of the primary's sound.
    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    /// Authored / runtime conversion for the primary.
    pub fn ratio(&self) -> RateRatio {
        self.ratio
    }

    /// Returns true while any source handle is held.
    pub fn is_tracking(&self) -> bool {
        self.primary.is_some() || self.queued.is_some()
    }

    /// Last observed position in the authored domain.
    pub fn last_position(&self) -> i32 {
        if self.last_raw == UNSET {
            self.window.start
        } else {
            self.ratio.to_authored(self.last_raw)
        }
    }

    /// Poll the sources and append newly played ranges to `out`.
    ///
    /// Returns the coarse status of the sources themselves (buffer state
    /// is not considered here).
    pub fn accumulate<H, S>(
        &mut self,
        host: &H,
        root: Option<BusKey>,
        root_speed: f32,
        out: &mut S,
    ) -> PlaybackStatus
    where
        H: AudioHost + ?Sized,
        S: RangeSink + ?Sized,
    {
        let mut status = PlaybackStatus::Stopped;
        if let Some(channel) = self.primary {
            status = self.poll_primary(host, channel, root, root_speed, out);
        }
        if self.queued.is_some() {
            status = status.combine(self.poll_queued(host, root, root_speed, out));
        }
        status
    }

    fn poll_primary<H, S>(
        &mut self,
        host: &H,
        channel: ChannelKey,
        root: Option<BusKey>,
        root_speed: f32,
        out: &mut S,
    ) -> PlaybackStatus
    where
        H: AudioHost + ?Sized,
        S: RangeSink + ?Sized,
    {
        let Some(poll) = host.poll_position(channel) else {
            return PlaybackStatus::Stopped;
        };
        if !poll.playing {
            // The cursor stays readable at its final value; deliver what ran
            // since the last poll.
            let end = poll.position as i64;
            if self.last_raw != UNSET && end > self.last_raw {
                let speed = self.current_speed;
                self.advance_to(host, channel, end, speed, out);
                log::debug!("primary {:?} ended at {}", channel, self.last_position());
            }
            return PlaybackStatus::Stopped;
        }
        if poll.paused {
            return PlaybackStatus::Paused;
        }

        let speed = sanitize_speed(resolve_speed(host, channel, root) * root_speed);
        self.current_speed = speed;
        self.advance_to(host, channel, poll.position as i64, speed, out);
        PlaybackStatus::Playing
    }

    /// Record movement of the primary cursor to `raw`.
    fn advance_to<H, S>(&mut self, host: &H, channel: ChannelKey, raw: i64, speed: f32, out: &mut S)
    where
        H: AudioHost + ?Sized,
        S: RangeSink + ?Sized,
    {
        let mut from = self.last_position();

        if self.last_raw != UNSET && raw < self.last_raw {
            let window = self.read_window(host, channel, self.ratio);
            if from <= window.end {
                // Wrapped: the rest of the loop played before the cursor came back.
                out.push_range(SampleRange::new(from, window.end, speed));
                log::debug!(
                    "loop wrap at {} -> [{}, {}]",
                    from,
                    window.start,
                    window.end
                );
                from = window.start;
            } else {
                // Moved back from outside the loop: a seek, nothing to flush.
                from = self.ratio.to_authored(raw);
                log::debug!("backward jump to {}", from);
            }
            self.window = window;
        }

        // TODO: a wrap that lands exactly on the previous cursor reads as no movement;
        // the DSP clock from poll_scheduling could tell the two apart.
        let to = self.ratio.to_authored(raw);
        if to > from {
            out.push_range(SampleRange::new(from, to - 1, speed));
        }
        self.last_raw = raw;
    }

    fn poll_queued<H, S>(
        &mut self,
        host: &H,
        root: Option<BusKey>,
        root_speed: f32,
        out: &mut S,
    ) -> PlaybackStatus
    where
        H: AudioHost + ?Sized,
        S: RangeSink + ?Sized,
    {
        let Some(queued) = self.queued else {
            return PlaybackStatus::Stopped;
        };
        let Some(poll) = host.poll_position(queued.channel) else {
            return PlaybackStatus::Stopped;
        };
        if !poll.playing {
            return PlaybackStatus::Stopped;
        }

        let started = host
            .poll_scheduling(queued.channel)
            .map_or(true, |schedule| schedule.has_started());
        if poll.paused {
            return PlaybackStatus::Paused;
        }
        if !started {
            return PlaybackStatus::Playing;
        }

        self.promote(host, queued, poll.position as i64, root, root_speed, out);
        PlaybackStatus::Playing
    }

    /// Hand the timeline over from the primary to the queued source.
    fn promote<H, S>(
        &mut self,
        host: &H,
        queued: QueuedSource,
        raw: i64,
        root: Option<BusKey>,
        root_speed: f32,
        out: &mut S,
    ) where
        H: AudioHost + ?Sized,
        S: RangeSink + ?Sized,
    {
        // Flush whatever the outgoing primary played since it was last polled.
        if let Some(primary) = self.primary {
            if let Some(poll) = host.poll_position(primary) {
                let tail = poll.position as i64;
                if self.last_raw != UNSET && tail > self.last_raw {
                    let speed = self.current_speed;
                    self.advance_to(host, primary, tail, speed, out);
                }
            }
        }

        let speed = sanitize_speed(resolve_speed(host, queued.channel, root) * root_speed);
        let mut from = queued.entry;
        let to = queued.ratio.to_authored(raw);

        if to < from {
            // The new source already looped before this tick saw it.
            let window = self.read_window(host, queued.channel, queued.ratio);
            if from <= window.end {
                out.push_range(SampleRange::new(from, window.end, speed));
            }
            from = window.start;
        }
        if to > from {
            out.push_range(SampleRange::new(from, to - 1, speed));
        }

        log::debug!(
            "promoted queued channel {:?} (entry {}, now at {})",
            queued.channel,
            queued.entry,
            to
        );

        self.primary = Some(queued.channel);
        self.queued = None;
        self.ratio = queued.ratio;
        self.source_rate = queued.source_rate;
        self.last_raw = raw;
        self.window = self.read_window(host, queued.channel, queued.ratio);
        self.current_speed = speed;
    }

    fn read_window<H>(&self, host: &H, channel: ChannelKey, ratio: RateRatio) -> PlaybackWindow
    where
        H: AudioHost + ?Sized,
    {
        match host.poll_loop_points(channel) {
            Some(points) => PlaybackWindow::normalized(points, ratio, self.total_samples),
            None => PlaybackWindow::full(self.total_samples),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use ks_host::{HostEngine, Sound};

    impl RangeSink for Vec<SampleRange> {
        fn push_range(&mut self, range: SampleRange) {
            self.push(range);
        }
    }

    fn spans(ranges: &[SampleRange]) -> Vec<(i32, i32)> {
        ranges.iter().map(|r| (r.first, r.last)).collect()
    }

    fn looping_host() -> (HostEngine, ChannelKey) {
        let mut host = HostEngine::new(1000);
        let ch = host
            .play(Sound::new(1000, 1000).looping(100, 500), host.master())
            .unwrap();
        (host, ch)
    }

    fn tracking(host: &HostEngine, ch: ChannelKey) -> PositionAccumulator {
        let mut acc = PositionAccumulator::new();
        acc.init(host, &TrackInfo::new("loop", 1000, 1000), ch);
        acc
    }

    #[test]
    fn forward_motion_enqueues_span() {
        let (mut host, ch) = looping_host();
        let mut acc = tracking(&host, ch);
        let mut out = Vec::new();

        host.advance(250);
        let status = acc.accumulate(&host, None, 1.0, &mut out);

        assert_eq!(status, PlaybackStatus::Playing);
        assert_eq!(spans(&out), vec![(0, 249)]);
    }

    #[test]
    fn loop_wrap_flushes_to_loop_end_then_resumes_at_loop_start() {
        let (mut host, ch) = looping_host();
        host.set_position(ch, 480).unwrap();
        let mut acc = tracking(&host, ch);
        let mut out = Vec::new();

        host.set_position(ch, 130).unwrap();
        acc.accumulate(&host, None, 1.0, &mut out);

        assert_eq!(spans(&out), vec![(480, 500), (100, 129)]);
        assert_eq!(acc.window(), PlaybackWindow::new(100, 500));
    }

    #[test]
    fn loop_wrap_across_three_polls() {
        let (mut host, ch) = looping_host();
        host.set_position(ch, 480).unwrap();
        let mut acc = tracking(&host, ch);
        let mut out = Vec::new();

        host.set_position(ch, 495).unwrap();
        acc.accumulate(&host, None, 1.0, &mut out);
        host.set_position(ch, 130).unwrap();
        acc.accumulate(&host, None, 1.0, &mut out);

        assert_eq!(spans(&out), vec![(480, 494), (495, 500), (100, 129)]);
    }

    #[test]
    fn wrap_below_loop_start_never_goes_negative() {
        let (mut host, ch) = looping_host();
        host.set_position(ch, 495).unwrap();
        let mut acc = tracking(&host, ch);
        let mut out = Vec::new();

        host.set_position(ch, 30).unwrap();
        acc.accumulate(&host, None, 1.0, &mut out);

        assert_eq!(spans(&out), vec![(495, 500)]);
        assert!(out.iter().all(|r| r.len() > 0));
    }

    #[test]
    fn wrap_to_before_loop_start_across_three_polls() {
        // Positions are absolute engine samples with loop [100, 500]. The wrap
        // flushes 495..=500; 30 sits before the loop start, so nothing follows.
        let (mut host, ch) = looping_host();
        host.set_position(ch, 480).unwrap();
        let mut acc = tracking(&host, ch);
        let mut out = Vec::new();

        host.set_position(ch, 495).unwrap();
        acc.accumulate(&host, None, 1.0, &mut out);
        host.set_position(ch, 30).unwrap();
        acc.accumulate(&host, None, 1.0, &mut out);

        assert_eq!(spans(&out), vec![(480, 494), (495, 500)]);
        assert_eq!(acc.last_position(), 30);
    }

    #[test]
    fn one_shot_end_between_polls_delivers_final_samples() {
        let mut host = HostEngine::new(1000);
        let ch = host.play(Sound::new(1000, 1000), host.master()).unwrap();
        let mut acc = tracking(&host, ch);
        let mut out = Vec::new();

        host.advance(995);
        assert_eq!(acc.accumulate(&host, None, 1.0, &mut out), PlaybackStatus::Playing);
        host.advance(10);
        assert_eq!(acc.accumulate(&host, None, 1.0, &mut out), PlaybackStatus::Stopped);

        assert_eq!(spans(&out), vec![(0, 994), (995, 999)]);

        // Further polls of the finished source add nothing.
        acc.accumulate(&host, None, 1.0, &mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn stopped_source_flushes_up_to_stop_point() {
        let mut host = HostEngine::new(1000);
        let ch = host.play(Sound::new(1000, 10_000), host.master()).unwrap();
        host.set_end_tick(ch, Some(250)).unwrap();
        let mut acc = tracking(&host, ch);
        let mut out = Vec::new();

        host.advance(200);
        acc.accumulate(&host, None, 1.0, &mut out);
        host.advance(100);
        acc.accumulate(&host, None, 1.0, &mut out);

        assert_eq!(spans(&out), vec![(0, 199), (200, 249)]);
    }

    #[test]
    fn backward_move_outside_loop_is_a_jump() {
        let (mut host, ch) = looping_host();
        host.set_position(ch, 800).unwrap();
        let mut acc = tracking(&host, ch);
        let mut out = Vec::new();

        host.set_position(ch, 200).unwrap();
        acc.accumulate(&host, None, 1.0, &mut out);
        assert!(out.is_empty());

        host.set_position(ch, 260).unwrap();
        acc.accumulate(&host, None, 1.0, &mut out);
        assert_eq!(spans(&out), vec![(200, 259)]);
    }

    #[test]
    fn unchanged_position_enqueues_nothing() {
        let (host, ch) = looping_host();
        let mut acc = tracking(&host, ch);
        let mut out = Vec::new();
        acc.accumulate(&host, None, 1.0, &mut out);
        acc.accumulate(&host, None, 1.0, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn paused_source_skips_position_work() {
        let (mut host, ch) = looping_host();
        let mut acc = tracking(&host, ch);
        let mut out = Vec::new();

        host.set_position(ch, 50).unwrap();
        host.set_paused(ch, true).unwrap();
        let status = acc.accumulate(&host, None, 1.0, &mut out);

        assert_eq!(status, PlaybackStatus::Paused);
        assert!(out.is_empty());
    }

    #[test]
    fn stale_handle_reads_as_stopped() {
        let (mut host, ch) = looping_host();
        let mut acc = tracking(&host, ch);
        host.release_channel(ch).unwrap();
        let mut out = Vec::new();
        assert_eq!(acc.accumulate(&host, None, 1.0, &mut out), PlaybackStatus::Stopped);
        assert!(out.is_empty());
    }

    #[test]
    fn runtime_positions_are_normalized() {
        // Authored at 44100, running at 88200: every raw sample is half an authored one.
        let mut host = HostEngine::new(88200);
        let ch = host.play(Sound::new(88200, 882_000), host.master()).unwrap();
        let mut acc = PositionAccumulator::new();
        acc.init(&host, &TrackInfo::new("hires", 44100, 441_000), ch);
        let mut out = Vec::new();

        host.advance(2000);
        acc.accumulate(&host, None, 1.0, &mut out);

        assert_eq!(spans(&out), vec![(0, 999)]);
    }

    #[test]
    fn range_carries_resolved_speed() {
        let mut host = HostEngine::new(1000);
        let music = host.add_bus(host.master()).unwrap();
        host.set_bus_pitch(music, 2.0).unwrap();
        let ch = host.play(Sound::new(1000, 10_000), music).unwrap();
        let mut acc = tracking(&host, ch);
        let mut out = Vec::new();

        host.advance(100);
        acc.accumulate(&host, Some(host.master()), 0.5, &mut out);

        assert_eq!(spans(&out), vec![(0, 199)]);
        assert!((out[0].speed - 1.0).abs() < 1e-6);
        assert!((acc.current_speed() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn queued_source_waits_for_scheduled_start() {
        let mut host = HostEngine::new(1000);
        let first = host.play(Sound::new(1000, 10_000), host.master()).unwrap();
        host.set_end_tick(first, Some(1000)).unwrap();
        let second = host
            .play_scheduled(Sound::new(1000, 10_000), host.master(), 1000, 1000)
            .unwrap();

        let mut acc = tracking(&host, first);
        acc.queue(&host, second);
        let mut out = Vec::new();

        host.advance(600);
        acc.accumulate(&host, None, 1.0, &mut out);
        assert_eq!(acc.primary(), Some(first));
        assert_eq!(acc.queued(), Some(second));
        assert_eq!(spans(&out), vec![(0, 599)]);
    }

    #[test]
    fn handoff_is_contiguous_and_swaps_once() {
        let mut host = HostEngine::new(1000);
        let first = host.play(Sound::new(1000, 10_000), host.master()).unwrap();
        host.set_end_tick(first, Some(1000)).unwrap();
        let second = host
            .play_scheduled(Sound::new(1000, 10_000), host.master(), 1000, 1000)
            .unwrap();

        let mut acc = tracking(&host, first);
        acc.queue(&host, second);
        let mut out = Vec::new();

        host.advance(900);
        acc.accumulate(&host, None, 1.0, &mut out);
        host.advance(300);
        let status = acc.accumulate(&host, None, 1.0, &mut out);

        assert_eq!(status, PlaybackStatus::Playing);
        assert_eq!(spans(&out), vec![(0, 899), (900, 999), (1000, 1199)]);
        assert_eq!(acc.primary(), Some(second));
        assert_eq!(acc.queued(), None);

        host.advance(100);
        acc.accumulate(&host, None, 1.0, &mut out);
        assert_eq!(out.last().map(|r| (r.first, r.last)), Some((1200, 1299)));
        assert_eq!(acc.primary(), Some(second));
    }

    #[test]
    fn queued_source_that_already_looped_rolls_window() {
        let mut host = HostEngine::new(1000);
        let first = host.play(Sound::new(1000, 1000), host.master()).unwrap();
        host.set_end_tick(first, Some(400)).unwrap();
        let second = host
            .play_scheduled(Sound::new(1000, 1000).looping(200, 499), host.master(), 400, 400)
            .unwrap();

        let mut acc = tracking(&host, first);
        acc.queue(&host, second);
        let mut out = Vec::new();

        host.advance(300);
        acc.accumulate(&host, None, 1.0, &mut out);
        // 400 -> 500 wraps to 200, then on to 250.
        host.advance(250);
        acc.accumulate(&host, None, 1.0, &mut out);

        assert_eq!(
            spans(&out),
            vec![(0, 299), (300, 399), (400, 499), (200, 249)]
        );
        assert_eq!(acc.window(), PlaybackWindow::new(200, 499));
    }

    #[test]
    fn forget_drops_matching_handles() {
        let (host, ch) = looping_host();
        let mut acc = tracking(&host, ch);
        assert!(acc.forget(ch));
        assert!(!acc.is_tracking());
        assert!(!acc.forget(ch));
    }
}
