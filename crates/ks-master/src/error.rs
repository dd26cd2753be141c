use std::path::PathBuf;

use ks_ir::ChannelKey;
use thiserror::Error;

use crate::pool::VisorId;

/// Failures surfaced by the session API.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("all {capacity} visor slots are in use")]
    PoolExhausted { capacity: usize },

    #[error("no active visor with id {0}")]
    UnknownVisor(VisorId),

    #[error("channel {0:?} is not known to the host")]
    InvalidChannel(ChannelKey),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures loading or validating a session configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}
