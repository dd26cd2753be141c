//! Host model error types.

use ks_ir::{BusKey, ChannelKey};
use thiserror::Error;

/// Errors returned by mutating calls on the host model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The channel was released or never existed
    #[error("Unknown channel: {0:?}")]
    UnknownChannel(ChannelKey),

    /// The bus was removed or never existed
    #[error("Unknown bus: {0:?}")]
    UnknownBus(BusKey),

    /// The master bus cannot be removed
    #[error("The master bus cannot be removed")]
    MasterBus,

    /// Loop points outside the sound or inverted
    #[error("Invalid loop points [{start}, {end}] for a sound of {length} samples")]
    InvalidLoop { start: u32, end: u32, length: u32 },
}
