//! Session layer for koreosync.
//!
//! Owns a fixed pool of channel visors, routes engine end-of-channel
//! callbacks to them through a bounded mailbox, and drives every active
//! visor once per frame on the caller's thread.

mod config;
mod error;
mod mailbox;
mod pool;
mod registry;
mod session;

pub use config::{DispatchMode, SessionConfig};
pub use error::{ConfigError, SessionError};
pub use mailbox::{mailbox, Mailbox, MailboxSender, Notice};
pub use pool::{VisorId, VisorPool, MAX_VISORS};
pub use registry::{CallbackRegistry, EngineCallbacks};
pub use session::Session;

// Re-export common types so callers don't need ks-ir/ks-engine directly.
pub use ks_engine::{ChannelVisor, SampleTimeSource};
pub use ks_ir::{FrameSlice, PlaybackStatus, SampleSpanSink, SpanEvent, TrackInfo};
