//! Channels: sounds playing on the host engine.

use ks_ir::{BusKey, LoopPoints};

/// A loaded sound asset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sound {
    /// Runtime sample rate of the decoded sound
    pub rate: u32,
    /// Length in runtime samples
    pub length: u32,
    /// Loop extents (inclusive); defaults to the whole sound
    pub loop_points: LoopPoints,
    /// Remaining loops: -1 = forever, 0 = play once
    pub loop_count: i32,
}

impl Sound {
    /// A one-shot sound.
    pub fn new(rate: u32, length: u32) -> Self {
        Self {
            rate,
            length,
            loop_points: LoopPoints {
                start: 0,
                end: length.saturating_sub(1),
            },
            loop_count: 0,
        }
    }

    /// Loop `[start, end]` forever. Points are taken as given.
    pub fn looping(mut self, start: u32, end: u32) -> Self {
        self.loop_points = LoopPoints { start, end };
        self.loop_count = -1;
        self
    }

    /// Limit the number of loops.
    pub fn loops(mut self, count: i32) -> Self {
        self.loop_count = count;
        self
    }
}

/// Playback state of a single channel.
#[derive(Clone, Debug)]
pub struct Channel {
    pub sound: Sound,
    /// Current position in runtime samples (fractional)
    pub position: f64,
    /// Is the channel producing (or scheduled to produce) audio?
    pub playing: bool,
    pub paused: bool,
    /// Own pitch factor
    pub pitch: f32,
    /// Playback frequency relative to the sound's native rate
    pub frequency_ratio: f32,
    pub loop_points: LoopPoints,
    pub loop_count: i32,
    /// Bus this channel is routed into
    pub parent: Option<BusKey>,
    /// DSP clock tick at which playback begins
    pub start_tick: Option<u64>,
    /// DSP clock tick at which playback ends
    pub end_tick: Option<u64>,
}

impl Channel {
    /// Create a channel for `sound`, playing from the start.
    pub fn new(sound: Sound, parent: Option<BusKey>) -> Self {
        Self {
            sound,
            position: 0.0,
            playing: true,
            paused: false,
            pitch: 1.0,
            frequency_ratio: 1.0,
            loop_points: sound.loop_points,
            loop_count: sound.loop_count,
            parent,
            start_tick: None,
            end_tick: None,
        }
    }

    /// Integer cursor as the engine reports it.
    pub fn reported_position(&self) -> u32 {
        self.position.max(0.0) as u32
    }

    fn loops(&self) -> bool {
        self.loop_count != 0 && self.loop_points.end > self.loop_points.start
    }

    /// Advance by `step` runtime samples, wrapping at the loop end.
    ///
    /// Returns true if the channel reached the end of its sound.
    pub fn advance(&mut self, step: f64) -> bool {
        if !self.playing || step <= 0.0 {
            return false;
        }
        let loop_start = self.loop_points.start as f64;
        let loop_end = self.loop_points.end as f64 + 1.0;
        let was_in_loop = self.position < loop_end;

        self.position += step;
        while self.loops() && was_in_loop && self.position >= loop_end {
            self.position -= loop_end - loop_start;
            if self.loop_count > 0 {
                self.loop_count -= 1;
            }
        }

        let length = self.sound.length as f64;
        if self.position >= length {
            self.position = length;
            self.playing = false;
            return true;
        }
        false
    }
}
