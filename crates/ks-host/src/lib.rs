//! Software host audio engine for koreosync.
//!
//! Models the parts of a game audio engine the tracking engine observes:
//! a tree of mixing buses, channels playing sounds with loop points and
//! scheduled starts/ends, and a DSP clock advanced in mixing blocks.
//! Implements [`ks_ir::AudioHost`] so tests, benches and the CLI can drive
//! visors without a real audio device.

mod channel;
mod engine;
mod error;
mod graph;

pub use channel::{Channel, Sound};
pub use engine::{EndHook, HostEngine};
pub use error::HostError;
pub use graph::{Bus, BusGraph, MAX_BUS_DEPTH};
