//! Playback-position tracking engine for koreosync.
//!
//! Polls a host audio engine once per visual frame, turns its irregular
//! cursor updates into buffered sample ranges, and replays those ranges
//! against wall-clock frame time for a downstream event consumer.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod accumulator;
mod capability;
mod consumer;
mod range_queue;
pub mod speed;
mod visor;

pub use accumulator::{PositionAccumulator, RangeSink};
pub use capability::SampleTimeSource;
pub use consumer::BufferConsumer;
pub use range_queue::PlaybackBuffer;
pub use speed::{hierarchy_status, resolve_speed};
pub use visor::{derive_status, ChannelVisor};
