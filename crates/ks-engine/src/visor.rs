//! Per-source orchestration of the accumulate and drain phases.

use ks_ir::{
    AudioHost, BusKey, ChannelKey, PlaybackStatus, PlaybackWindow, SampleSpanSink, TrackInfo,
};

use crate::accumulator::PositionAccumulator;
use crate::capability::SampleTimeSource;
use crate::consumer::BufferConsumer;
use crate::speed::hierarchy_status;

/// Tracks one playing source and feeds its spans downstream.
///
/// Visors are meant to be pooled: `init` and `reset` are the lifecycle,
/// and neither releases the buffer's allocation.
#[derive(Clone, Debug, Default)]
pub struct ChannelVisor {
    track: TrackInfo,
    accumulator: PositionAccumulator,
    consumer: BufferConsumer,
    status: PlaybackStatus,
    /// Set by `init`, cleared by `reset`
    active: bool,
}

impl ChannelVisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a visor whose buffer holds `reserve` ranges without growing.
    pub fn with_reserve(reserve: usize) -> Self {
        Self {
            consumer: BufferConsumer::with_capacity(reserve),
            ..Self::default()
        }
    }

    /// Begin tracking `channel` as the source of `track`.
    pub fn init<H>(&mut self, host: &H, track: &TrackInfo, channel: ChannelKey)
    where
        H: AudioHost + ?Sized,
    {
        self.reset();
        self.track = *track;
        self.accumulator.init(host, track, channel);
        self.consumer
            .set_processed_sample_time(self.accumulator.last_position() - 1);
        self.active = true;
        log::debug!(
            "visor init: '{}' on {:?} at {} (window {:?})",
            self.track.name,
            channel,
            self.accumulator.last_position(),
            self.accumulator.window()
        );
    }

    /// Return to the idle state, dropping handles and pending ranges.
    pub fn reset(&mut self) {
        if self.active {
            log::debug!("visor reset: '{}'", self.track.name);
        }
        self.accumulator.reset();
        self.consumer.reset();
        self.status = PlaybackStatus::Stopped;
        self.track = TrackInfo::default();
        self.active = false;
    }

    /// Queue `channel` to take over when its scheduled start is reached.
    pub fn queue_transition<H>(&mut self, host: &H, channel: ChannelKey)
    where
        H: AudioHost + ?Sized,
    {
        if !self.active {
            return;
        }
        self.accumulator.queue(host, channel);
    }

    /// Drop a handle the host reported as ended. Pending ranges still drain.
    ///
    /// An outgoing primary with a handoff pending is kept until the queued
    /// source takes over, so its tail can still be flushed.
    pub fn forget_channel(&mut self, channel: ChannelKey) -> bool {
        if self.accumulator.primary() == Some(channel) && self.accumulator.queued().is_some() {
            return false;
        }
        self.accumulator.forget(channel)
    }

    /// Run one frame: poll the host, drain `frame_duration` seconds of
    /// buffered samples into `sink`, and derive the new status.
    pub fn process_update<H, S>(
        &mut self,
        host: &H,
        root: Option<BusKey>,
        root_speed: f32,
        frame_duration: f32,
        sink: &mut S,
    ) -> PlaybackStatus
    where
        H: AudioHost + ?Sized,
        S: SampleSpanSink + ?Sized,
    {
        if !self.active {
            return self.status;
        }

        let coarse = self
            .accumulator
            .accumulate(host, root, root_speed, self.consumer.buffer_mut());
        self.drop_stale(host);

        self.consumer.drain(
            self.track.name.as_str(),
            self.track.authored_rate,
            frame_duration,
            sink,
        );

        let bus = self.bus_status(host, root);
        let status = derive_status(&self.consumer, bus, coarse);
        if status != self.status {
            log::debug!("'{}': {:?} -> {:?}", self.track.name, self.status, status);
            self.status = status;
        }
        status
    }

    /// Bus override for the tracked sources.
    ///
    /// With a handoff pending, the buses only override the sources when
    /// the primary's and the queued source's buses both do.
    fn bus_status<H>(&self, host: &H, root: Option<BusKey>) -> Option<PlaybackStatus>
    where
        H: AudioHost + ?Sized,
    {
        let primary = self
            .accumulator
            .primary()
            .and_then(|channel| hierarchy_status(host, channel, root));
        let Some(queued) = self.accumulator.queued() else {
            return primary;
        };
        let queued = hierarchy_status(host, queued, root)?;
        match self.accumulator.primary() {
            Some(_) => Some(primary?.combine(queued)),
            None => Some(queued),
        }
    }

    fn drop_stale<H>(&mut self, host: &H)
    where
        H: AudioHost + ?Sized,
    {
        let handles = [self.accumulator.primary(), self.accumulator.queued()];
        for channel in handles.into_iter().flatten() {
            if host.poll_position(channel).is_none() {
                log::debug!("'{}': channel {:?} is gone", self.track.name, channel);
                self.accumulator.forget(channel);
            }
        }
    }

    /// Status derived by the latest update.
    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Last sample delivered downstream (authored domain).
    pub fn processed_sample_time(&self) -> i32 {
        self.consumer.processed_sample_time()
    }

    /// Effective speed of the tracked source.
    pub fn current_speed(&self) -> f32 {
        self.accumulator.current_speed()
    }

    /// Source currently being observed.
    pub fn primary(&self) -> Option<ChannelKey> {
        self.accumulator.primary()
    }

    /// Source waiting to take over, if any.
    pub fn queued(&self) -> Option<ChannelKey> {
        self.accumulator.queued()
    }

    /// Current loop extents (authored domain).
    pub fn window(&self) -> PlaybackWindow {
        self.accumulator.window()
    }

    /// Buffered ranges not yet started by the consumer.
    pub fn pending_records(&self) -> usize {
        self.consumer.buffer().len()
    }

    /// Drain state, for inspection.
    pub fn consumer(&self) -> &BufferConsumer {
        &self.consumer
    }

    /// Returns true when nothing is tracked and nothing is left to deliver.
    pub fn is_idle(&self) -> bool {
        !self.active || (!self.accumulator.is_tracking() && !self.consumer.has_pending())
    }

    /// Returns true between `init` and `reset`.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Metadata of the tracked track.
    pub fn track(&self) -> &TrackInfo {
        &self.track
    }
}

/// Combine buffer, bus and source signals into one status.
///
/// Undelivered samples keep the visor `Playing` even after the source
/// stops, so the tail of a track is never cut off.
pub fn derive_status(
    consumer: &BufferConsumer,
    bus: Option<PlaybackStatus>,
    coarse: PlaybackStatus,
) -> PlaybackStatus {
    if consumer.has_pending() {
        PlaybackStatus::Playing
    } else if let Some(bus) = bus {
        bus
    } else {
        coarse
    }
}

impl SampleTimeSource for ChannelVisor {
    fn sample_time_for_clip(&self, clip: &str) -> i32 {
        match self.current_clip_name() {
            Some(name) if name == clip => self.processed_sample_time(),
            _ => -1,
        }
    }

    fn total_sample_time_for_clip(&self, clip: &str) -> i32 {
        match self.current_clip_name() {
            Some(name) if name == clip => self.track.total_samples_i32(),
            _ => 0,
        }
    }

    fn is_playing(&self) -> bool {
        self.status.is_playing()
    }

    fn pitch(&self) -> f32 {
        self.current_speed()
    }

    fn current_clip_name(&self) -> Option<&str> {
        self.active.then(|| self.track.name.as_str())
    }
}
