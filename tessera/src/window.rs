//! Frame windowing: re-slices a merged datapoint stream into fixed-width,
//! time-aligned frames.
//!
//! [`SeriesFrameIterator`] consumes a [`DatapointSource`] and emits one
//! [`Frame`] per step-aligned window that contains at least one datapoint.
//! Frame boundaries are `start + k * step` for integer `k >= 0`; a
//! datapoint with timestamp `t` belongs to frame `k = (t - start) / step`.
//! Windows are half-open: a datapoint landing exactly on a boundary belongs
//! to the frame *starting* at that boundary, never the previous one.
//!
//! Two policies worth calling out for downstream consumers:
//!
//! - **Sparse skip**: windows with no datapoints are never materialized.
//!   Datapoints only in frames 0 and 3 produce exactly two frames, not
//!   four. Consumers expecting one frame per step must fill gaps
//!   themselves.
//! - A datapoint earlier than the configured start is a configuration
//!   error, surfaced through `err()`, not silently dropped.

use crate::error::{ConfigError, Result, TesseraError};
use crate::frame::Frame;
use crate::point::Datapoint;
use crate::recorder::Recorder;
use crate::source::DatapointSource;

/// Re-slices a merged datapoint stream into fixed-duration frames aligned
/// to a configured start instant.
///
/// Owns its datapoint source and recorder; `reset()` rebinds both to a new
/// series without reallocating. The orchestrator reaches the underlying
/// source through [`source_mut`](SeriesFrameIterator::source_mut).
#[derive(Debug)]
pub struct SeriesFrameIterator<S> {
    source: S,
    recorder: Box<dyn Recorder + Send>,
    start_ns: u64,
    step_ns: u64,
    frame_start_ns: u64,
    frame_end_ns: u64,
    /// Datapoint read past the current frame's boundary, seeding the next.
    pending: Option<Datapoint>,
    exhausted: bool,
    err: Option<TesseraError>,
    released: bool,
}

impl std::fmt::Debug for dyn Recorder + Send {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Recorder")
    }
}

impl<S: DatapointSource> SeriesFrameIterator<S> {
    /// Creates a frame iterator over `source` using `recorder` to
    /// materialize frames.
    ///
    /// The iterator yields nothing until the first [`reset`].
    ///
    /// [`reset`]: SeriesFrameIterator::reset
    pub fn new(source: S, recorder: Box<dyn Recorder + Send>) -> Self {
        Self {
            source,
            recorder,
            start_ns: 0,
            step_ns: 0,
            frame_start_ns: 0,
            frame_end_ns: 0,
            pending: None,
            exhausted: true,
            err: None,
            released: false,
        }
    }

    /// Rebinds the windowing state to a new series.
    ///
    /// Clears buffered state and the recorder (retaining its storage) and
    /// starts windowing from `start_ns` with `step_ns`-wide frames. The
    /// source itself is reset separately via [`source_mut`].
    ///
    /// A zero `step_ns` latches [`ConfigError::ZeroFrameSize`]; the
    /// orchestrator validates this earlier, but the iterator guards its own
    /// division.
    ///
    /// [`source_mut`]: SeriesFrameIterator::source_mut
    pub fn reset(&mut self, start_ns: u64, step_ns: u64) {
        self.start_ns = start_ns;
        self.step_ns = step_ns;
        self.frame_start_ns = 0;
        self.frame_end_ns = 0;
        self.pending = None;
        self.exhausted = false;
        self.recorder.reset();
        self.err = if step_ns == 0 {
            Some(
                ConfigError::ZeroFrameSize {
                    frame_size: std::time::Duration::ZERO,
                }
                .into(),
            )
        } else {
            None
        };
    }

    /// Returns a mutable handle to the underlying datapoint source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Advances to the next non-empty frame.
    ///
    /// Pulls datapoints from the source until one lands past the current
    /// frame's boundary (buffered to seed the next frame) or the source is
    /// exhausted. Returns false once no datapoints remain or an error
    /// latched; a source error observed mid-frame discards the partial
    /// frame.
    pub fn advance(&mut self) -> bool {
        if self.exhausted || self.err.is_some() {
            return false;
        }

        self.recorder.reset();

        let first = match self.pending.take() {
            Some(point) => point,
            None => match self.pull() {
                Some(point) => point,
                None => {
                    self.exhausted = true;
                    return false;
                }
            },
        };
        if first.timestamp_ns < self.start_ns {
            self.err = Some(
                ConfigError::DatapointBeforeStart {
                    timestamp_ns: first.timestamp_ns,
                    start_ns: self.start_ns,
                }
                .into(),
            );
            return false;
        }

        // Sparse skip: the frame index comes from the datapoint, so empty
        // windows between sparse datapoints are never materialized.
        let index = (first.timestamp_ns - self.start_ns) / self.step_ns;
        self.frame_start_ns = self.start_ns + index * self.step_ns;
        self.frame_end_ns = self.frame_start_ns + self.step_ns;
        self.recorder.append(first);

        while let Some(point) = self.pull() {
            if point.timestamp_ns < self.frame_end_ns {
                self.recorder.append(point);
            } else {
                self.pending = Some(point);
                break;
            }
        }

        // A decode error mid-frame would otherwise emit a silently
        // truncated frame.
        self.err.is_none()
    }

    /// Pulls the next datapoint, latching any source error.
    fn pull(&mut self) -> Option<Datapoint> {
        if self.source.advance() {
            return Some(self.source.current());
        }
        if let Some(err) = self.source.err() {
            self.err = Some(TesseraError::Source(err.clone()));
        }
        None
    }

    /// Returns the most recently produced frame.
    ///
    /// Only valid after an [`advance`](SeriesFrameIterator::advance) that
    /// returned true, and only until the next `advance()` or
    /// [`close`](SeriesFrameIterator::close).
    pub fn current(&self) -> Frame<'_> {
        self.recorder
            .snapshot(self.frame_start_ns, self.frame_end_ns)
    }

    /// Returns the latched error, if any.
    pub fn err(&self) -> Option<&TesseraError> {
        self.err.as_ref()
    }

    /// Releases the recorder and closes the source.
    ///
    /// Both releases are attempted even if the first fails; the first error
    /// is returned. Idempotent: the recorder's backing storage is returned
    /// to its origin exactly once.
    ///
    /// # Errors
    ///
    /// Returns the recorder's [`ReleaseError`](crate::error::ReleaseError)
    /// if returning backing storage failed.
    pub fn close(&mut self) -> Result<()> {
        self.pending = None;
        self.exhausted = true;

        let released = if self.released {
            Ok(())
        } else {
            self.released = true;
            self.recorder.release()
        };
        self.source.close();

        released.map_err(TesseraError::Release)
    }
}
