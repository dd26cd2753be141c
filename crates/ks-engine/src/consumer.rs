//! Drain phase: replay buffered ranges against wall-clock frame time.
//!
//! The accumulator learns about new samples only when the host engine
//! updates its cursor. The consumer spreads those samples over rendered
//! frames: each frame spends its real elapsed time converting buffered
//! samples into delivered spans, using the speed recorded with each range.

use ks_ir::{FrameSlice, SampleRange, SampleSpanSink};

use crate::range_queue::PlaybackBuffer;

/// Buffered ranges plus the slice currently being drained.
#[derive(Clone, Debug)]
pub struct BufferConsumer {
    buffer: PlaybackBuffer,
    /// Range being drained; `EMPTY` when idle
    in_process: SampleRange,
    /// Last sample handed downstream (authored domain)
    processed_sample_time: i32,
}

impl Default for BufferConsumer {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the span being assembled began.
#[derive(Clone, Copy)]
struct OpenSpan {
    start: i32,
    /// Frame time elapsed when the span began
    began: f64,
}

impl BufferConsumer {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a consumer with room for `capacity` buffered ranges.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: PlaybackBuffer::with_capacity(capacity),
            in_process: SampleRange::EMPTY,
            processed_sample_time: -1,
        }
    }

    pub fn buffer(&self) -> &PlaybackBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut PlaybackBuffer {
        &mut self.buffer
    }

    pub fn in_process(&self) -> SampleRange {
        self.in_process
    }

    pub fn processed_sample_time(&self) -> i32 {
        self.processed_sample_time
    }

    /// Seed the delivered cursor (init time).
    pub fn set_processed_sample_time(&mut self, sample: i32) {
        self.processed_sample_time = sample;
    }

    /// Returns true while anything is left to deliver.
    pub fn has_pending(&self) -> bool {
        !self.in_process.is_empty() || !self.buffer.is_empty()
    }

    /// Samples still waiting to be delivered.
    pub fn pending_samples(&self) -> i64 {
        self.in_process.len() as i64 + self.buffer.total_samples()
    }

    /// Drop everything pending.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.in_process = SampleRange::EMPTY;
        self.processed_sample_time = -1;
    }

    /// Spend `frame_duration` seconds of budget delivering buffered samples.
    ///
    /// Contiguous ranges are merged into one span; a discontinuity (loop
    /// or jump) splits the frame into separately timed spans. Returns the
    /// number of spans delivered.
    pub fn drain<S>(&mut self, track: &str, sample_rate: u32, frame_duration: f32, sink: &mut S) -> usize
    where
        S: SampleSpanSink + ?Sized,
    {
        let frame = frame_duration as f64;
        if !(frame > 0.0) || !frame.is_finite() || sample_rate == 0 {
            return 0;
        }
        let rate = sample_rate as f64;
        let mut time_left = frame;
        let mut emitted = 0;
        let mut open: Option<OpenSpan> = None;

        loop {
            if self.in_process.is_empty() {
                match self.buffer.pop() {
                    Some(next) => self.in_process = next,
                    None => break,
                }
            }
            let record = self.in_process;
            let span = match open {
                Some(span) => span,
                None => {
                    let span = OpenSpan {
                        start: record.first,
                        began: frame - time_left,
                    };
                    open = Some(span);
                    span
                }
            };

            let speed = record.speed as f64;
            let samples = record.len();
            let time_in_record = samples as f64 / rate / speed;

            if time_left < time_in_record {
                let consumed = libm::round(rate * time_left * speed) as i32;
                if consumed >= samples {
                    self.emit(track, span, record.last, frame, frame, sink);
                    self.in_process.clear();
                    emitted += 1;
                } else if consumed > 0 {
                    let end = record.first + consumed - 1;
                    self.emit(track, span, end, frame, frame, sink);
                    self.in_process.first = end + 1;
                    emitted += 1;
                } else if span.start < record.first {
                    // Nothing of this record fits, but merged ranges before it do.
                    self.emit(track, span, record.first - 1, frame - time_left, frame, sink);
                    emitted += 1;
                }
                break;
            } else if time_left == time_in_record {
                self.emit(track, span, record.last, frame, frame, sink);
                self.in_process.clear();
                emitted += 1;
                break;
            }

            time_left -= time_in_record;
            self.in_process.clear();
            match self.buffer.peek().copied() {
                Some(next) if next.follows(&record) => {}
                Some(next) => {
                    if next.first <= record.last {
                        log::trace!("{}: loop boundary after {}", track, record.last);
                    }
                    self.emit(track, span, record.last, frame - time_left, frame, sink);
                    emitted += 1;
                    open = None;
                }
                None => {
                    self.emit(track, span, record.last, frame - time_left, frame, sink);
                    emitted += 1;
                    break;
                }
            }
        }
        emitted
    }

    /// Deliver `[span.start, end]`, which ran until frame time `until`.
    fn emit<S>(&mut self, track: &str, span: OpenSpan, end: i32, until: f64, frame: f64, sink: &mut S)
    where
        S: SampleSpanSink + ?Sized,
    {
        let slice = FrameSlice::new((span.began / frame) as f32, (until - span.began) as f32);
        log::trace!(
            "{}: span [{}, {}] offset {:.3} length {:.4}s",
            track,
            span.start,
            end,
            slice.offset_fraction,
            slice.length_seconds
        );
        self.processed_sample_time = end;
        sink.on_sample_span(track, span.start, end, slice);
    }
}
