//! Handles into the host audio engine.
//!
//! The tracking engine never owns playback resources. It holds versioned
//! keys; once the host removes the underlying channel or bus, the key goes
//! stale and every query against it answers `None`.

slotmap::new_key_type! {
    /// A leaf playback channel in the host engine.
    pub struct ChannelKey;
}

slotmap::new_key_type! {
    /// A mixing bus (channel group) in the host engine.
    pub struct BusKey;
}
