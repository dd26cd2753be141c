//! Core types for koreosync.
//!
//! This crate defines the values exchanged between the tracking engine,
//! the host audio engine it observes and the downstream event consumer.
//! The host side is expressed as the [`AudioHost`] trait; the consumer
//! side as [`SampleSpanSink`].
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod event;
mod handle;
mod host;
mod rate;
mod sample_range;
mod status;
mod track;

pub use event::{FrameSlice, SampleSpanSink, SpanEvent};
pub use handle::{BusKey, ChannelKey};
pub use host::{AudioHost, BusState, LoopPoints, PositionPoll, SchedulePoll};
pub use rate::{PlaybackWindow, RateRatio};
pub use sample_range::SampleRange;
pub use status::PlaybackStatus;
pub use track::{TrackInfo, TrackName};
