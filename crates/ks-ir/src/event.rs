//! Synchronization events delivered to the downstream consumer.

use alloc::vec::Vec;

use crate::track::TrackName;

/// Where a delivered span sits inside the host frame that produced it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameSlice {
    /// Share of the frame elapsed before this span starts (0.0..1.0)
    pub offset_fraction: f32,
    /// Frame time covered by this span, in seconds
    pub length_seconds: f32,
}

impl FrameSlice {
    /// Create a slice descriptor.
    pub const fn new(offset_fraction: f32, length_seconds: f32) -> Self {
        Self {
            offset_fraction,
            length_seconds,
        }
    }
}

/// A delivered span, as recorded by the `Vec` sink.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpanEvent {
    pub track: TrackName,
    /// First sample of the span (authored domain, inclusive)
    pub start: i32,
    /// Last sample of the span (authored domain, inclusive)
    pub end: i32,
    pub slice: FrameSlice,
}

impl SpanEvent {
    /// Number of samples covered by the span.
    pub fn len(&self) -> i32 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Downstream consumer of "this sample range occurred" notifications.
///
/// Invoked synchronously on the host update thread, once per span, in
/// increasing sample order within a track identity.
pub trait SampleSpanSink {
    fn on_sample_span(&mut self, track: &str, start: i32, end: i32, slice: FrameSlice);
}

impl<F> SampleSpanSink for F
where
    F: FnMut(&str, i32, i32, FrameSlice),
{
    fn on_sample_span(&mut self, track: &str, start: i32, end: i32, slice: FrameSlice) {
        self(track, start, end, slice)
    }
}

impl SampleSpanSink for Vec<SpanEvent> {
    fn on_sample_span(&mut self, track: &str, start: i32, end: i32, slice: FrameSlice) {
        let mut name = TrackName::new();
        for ch in track.chars() {
            if name.try_push(ch).is_err() {
                break;
            }
        }
        self.push(SpanEvent {
            track: name,
            start,
            end,
            slice,
        });
    }
}
