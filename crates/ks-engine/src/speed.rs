//! Effective playback speed through the bus hierarchy.
//!
//! A channel's speed is its own frequency ratio and pitch multiplied by
//! the pitch of every bus above it, up to (excluding) a caller-chosen
//! root. Invalid handles contribute a neutral factor: callers need a speed
//! estimate every tick, not a perfect one.

use ks_ir::{AudioHost, BusKey, ChannelKey, PlaybackStatus};

/// Upper bound on ancestor walks; the host may mutate its tree under us.
pub const MAX_WALK_DEPTH: usize = 64;

/// Effective speed of `channel`, walking up to (excluding) `root`.
///
/// `root = None` walks the entire hierarchy.
pub fn resolve_speed<H>(host: &H, channel: ChannelKey, root: Option<BusKey>) -> f32
where
    H: AudioHost + ?Sized,
{
    let mut speed = host.channel_frequency_ratio(channel).unwrap_or(1.0)
        * host.channel_pitch(channel).unwrap_or(1.0);

    let mut bus = host.channel_parent(channel);
    let mut depth = 0;
    while let Some(current) = bus {
        if Some(current) == root || depth >= MAX_WALK_DEPTH {
            break;
        }
        speed *= host.bus_pitch(current).unwrap_or(1.0);
        bus = host.bus_parent(current);
        depth += 1;
    }
    speed
}

/// Replace a speed that would stall or poison time math with 1.0.
pub fn sanitize_speed(speed: f32) -> f32 {
    if speed.is_finite() && speed > 0.0 {
        speed
    } else {
        1.0
    }
}

/// Status reported by the buses above `channel`, up to and including `root`.
///
/// Returns `Stopped` if any bus is not playing or is gone, else `Paused` if
/// any bus is paused, else `None` (the hierarchy does not override the channel).
pub fn hierarchy_status<H>(host: &H, channel: ChannelKey, root: Option<BusKey>) -> Option<PlaybackStatus>
where
    H: AudioHost + ?Sized,
{
    let mut paused = false;
    let mut bus = host.channel_parent(channel);
    let mut depth = 0;
    while let Some(current) = bus {
        if depth >= MAX_WALK_DEPTH {
            break;
        }
        let Some(state) = host.bus_state(current) else {
            // Linked to a bus that no longer exists.
            return Some(PlaybackStatus::Stopped);
        };
        if !state.playing {
            return Some(PlaybackStatus::Stopped);
        }
        paused |= state.paused;
        if Some(current) == root {
            break;
        }
        bus = host.bus_parent(current);
        depth += 1;
    }
    paused.then_some(PlaybackStatus::Paused)
}
