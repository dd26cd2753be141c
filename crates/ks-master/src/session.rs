//! Session: owns the visor pool and drives every visor once per frame.

use ks_engine::{ChannelVisor, SampleTimeSource};
use ks_ir::{AudioHost, BusKey, ChannelKey, PlaybackStatus, SampleSpanSink, TrackInfo};

use crate::config::{DispatchMode, SessionConfig};
use crate::error::SessionError;
use crate::mailbox::{mailbox, Mailbox, Notice};
use crate::pool::{VisorId, VisorPool, MAX_VISORS};
use crate::registry::{CallbackRegistry, EngineCallbacks};

pub struct Session {
    config: SessionConfig,
    pool: VisorPool,
    registry: CallbackRegistry,
    mailbox: Mailbox,
    /// Visors to return to the pool at the end of an update
    reap: heapless::Vec<VisorId, MAX_VISORS>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let (sender, mailbox) = mailbox(config.mailbox_capacity);
        log::debug!(
            "session: {} visors, {:?} dispatch",
            config.capacity,
            config.dispatch
        );
        Ok(Self {
            pool: VisorPool::new(config.capacity, config.buffer_reserve),
            registry: CallbackRegistry::new(sender),
            mailbox,
            reap: heapless::Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Handle for the host engine's end-of-channel hook.
    pub fn engine_callbacks(&self) -> EngineCallbacks {
        self.registry.callbacks()
    }

    /// Start tracking `channel` as the source of `track`.
    pub fn track<H>(&mut self, host: &H, track: &TrackInfo, channel: ChannelKey) -> Result<VisorId, SessionError>
    where
        H: AudioHost + ?Sized,
    {
        if host.poll_position(channel).is_none() {
            return Err(SessionError::InvalidChannel(channel));
        }
        let Some(id) = self.pool.allocate() else {
            log::warn!("visor pool exhausted, cannot track '{}'", track.name);
            return Err(SessionError::PoolExhausted {
                capacity: self.pool.capacity(),
            });
        };
        if let Some(visor) = self.pool.get_mut(id) {
            visor.init(host, track, channel);
        }
        self.registry.register(channel, id);
        Ok(id)
    }

    /// Queue `channel` to take over from the visor's current source.
    pub fn queue_transition<H>(&mut self, host: &H, id: VisorId, channel: ChannelKey) -> Result<(), SessionError>
    where
        H: AudioHost + ?Sized,
    {
        if host.poll_position(channel).is_none() {
            return Err(SessionError::InvalidChannel(channel));
        }
        let visor = self.pool.get_mut(id).ok_or(SessionError::UnknownVisor(id))?;
        if let Some(previous) = visor.queued() {
            self.registry.unregister(previous);
        }
        visor.queue_transition(host, channel);
        self.registry.register(channel, id);
        Ok(())
    }

    /// Stop tracking and return the visor to the pool.
    pub fn release(&mut self, id: VisorId) -> Result<(), SessionError> {
        if !self.pool.release(id) {
            return Err(SessionError::UnknownVisor(id));
        }
        self.registry.clear_visor(id);
        log::debug!("visor {} released", id);
        Ok(())
    }

    /// Run one frame for every active visor. Returns how many ran.
    pub fn update<H, S>(
        &mut self,
        host: &H,
        root: Option<BusKey>,
        root_speed: f32,
        frame_duration: f32,
        sink: &mut S,
    ) -> usize
    where
        H: AudioHost + ?Sized,
        S: SampleSpanSink + ?Sized,
    {
        self.apply_notices();

        let mut ran = 0;
        for id in 0..self.pool.capacity() {
            let Some(visor) = self.pool.get_mut(id) else {
                continue;
            };
            let status = visor.process_update(host, root, root_speed, frame_duration, sink);
            ran += 1;
            if self.config.auto_release && status == PlaybackStatus::Stopped && self.reap.push(id).is_err() {
                break;
            }
        }

        while let Some(id) = self.reap.pop() {
            self.pool.release(id);
            self.registry.clear_visor(id);
            log::debug!("visor {} stopped, returned to pool", id);
        }
        ran
    }

    /// Apply engine notices received since the last update.
    fn apply_notices(&mut self) {
        while let Some(notice) = self.mailbox.pop() {
            let Notice::ChannelEnded(channel) = notice;
            if self.config.dispatch != DispatchMode::Callback {
                continue;
            }
            let Some(id) = self.registry.unregister(channel) else {
                continue;
            };
            if let Some(visor) = self.pool.get_mut(id) {
                if visor.forget_channel(channel) {
                    log::debug!("visor {}: {:?} ended", id, channel);
                }
            }
        }
    }

    pub fn visor(&self, id: VisorId) -> Option<&ChannelVisor> {
        self.pool.get(id)
    }

    pub fn status(&self, id: VisorId) -> Option<PlaybackStatus> {
        self.pool.get(id).map(ChannelVisor::status)
    }

    pub fn sample_source(&self, id: VisorId) -> Option<&dyn SampleTimeSource> {
        self.pool.get(id).map(|v| v as &dyn SampleTimeSource)
    }

    /// First active visor tracking `clip`.
    pub fn find_clip(&self, clip: &str) -> Option<VisorId> {
        self.pool
            .active_ids()
            .find(|&id| self.pool.get(id).and_then(|v| v.current_clip_name()) == Some(clip))
    }

    pub fn active_ids(&self) -> impl Iterator<Item = VisorId> + '_ {
        self.pool.active_ids()
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }
}
