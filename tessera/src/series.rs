//! Series block iteration: the top-level orchestrator.
//!
//! [`SeriesBlockIterator`] drives the external per-series reader, and for
//! each series resets the cross-block merge and frame windowing machinery,
//! exposing the resulting frame stream together with the series identifier
//! and labels. One recorder and one frame iterator serve the entire scan;
//! both are reset, not reallocated, per series, so an unbounded series
//! stream runs in bounded memory.
//!
//! # Iteration protocol
//!
//! ```text
//! {Fresh} --advance(ok)--> {Positioned} --advance(ok)--> {Positioned}
//!                                       --advance(end | error)--> {Done}
//! ```
//!
//! `Done` is terminal: once `advance()` returns false, every subsequent
//! call returns false and `err()` keeps reporting the same latched error.
//! A decode error observed while the caller consumed a series' frames also
//! latches the whole scan — a corrupt segment makes the scan incomplete,
//! which must not be silent.
//!
//! # Single-caller contract
//!
//! No internal locking: one thread drives one iterator instance. Run
//! independent instances over disjoint series ranges for parallelism; the
//! cursor pool and column arena are the only shared resources and are safe
//! for that pattern.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result, TesseraError};
use crate::merge::CrossBlockIterator;
use crate::recorder::{ColumnArena, ColumnarRecorder, FlatRecorder, HeapArena, Recorder};
use crate::source::{CursorPool, SeriesReader};
use crate::window::SeriesFrameIterator;

/// Static frame alignment configuration.
///
/// Serializable so deployments can carry it in config files alongside the
/// rest of their storage settings.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use tessera::FrameConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = FrameConfig {
///     start_ns: 1_640_000_000_000_000_000,
///     frame_size: Duration::from_secs(10),
///     use_columnar_recorder: true,
/// };
/// config.validate()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Reference instant frames are aligned to (nanoseconds).
    ///
    /// Every frame starts at `start_ns + k * frame_size`; datapoints
    /// earlier than this instant are a configuration error.
    pub start_ns: u64,

    /// Fixed step/window width. Must be positive.
    #[serde(with = "duration_serde")]
    pub frame_size: Duration,

    /// Selects the columnar (arena-backed) recorder instead of the flat
    /// default.
    #[serde(default)]
    pub use_columnar_recorder: bool,
}

impl FrameConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the frame size is zero or does not fit in
    /// u64 nanoseconds.
    pub fn validate(&self) -> Result<()> {
        if self.frame_size.is_zero() {
            return Err(ConfigError::ZeroFrameSize {
                frame_size: self.frame_size,
            }
            .into());
        }
        if self.frame_size.as_nanos() > u128::from(u64::MAX) {
            return Err(ConfigError::FrameSizeTooLarge {
                frame_size: self.frame_size,
            }
            .into());
        }
        Ok(())
    }

    /// The frame size in nanoseconds.
    ///
    /// Only meaningful after [`validate`](FrameConfig::validate).
    #[allow(clippy::cast_possible_truncation)] // validate() bounds as_nanos to u64
    pub fn frame_size_ns(&self) -> u64 {
        self.frame_size.as_nanos() as u64
    }
}

/// Construction options for a [`SeriesBlockIterator`].
pub struct Options {
    /// Frame alignment and recorder selection.
    pub frame: FrameConfig,

    /// Pool of segment cursors, supplied by the storage layer and reused
    /// across series for decode-buffer reuse.
    pub cursor_pool: Arc<dyn CursorPool>,

    /// Arena backing the columnar recorder's columns.
    ///
    /// Ignored for the flat recorder; when `None` and the columnar
    /// recorder is selected, a process-local [`HeapArena`] is used.
    pub arena: Option<Arc<dyn ColumnArena>>,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

/// Where the orchestrator is in its iteration lifecycle.
///
/// `Done` is terminal and entered exactly once, whether through clean
/// exhaustion, a latched error, or `close()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterState {
    Fresh,
    Positioned,
    Done,
}

/// Iterates the frame streams of every series supplied by a
/// [`SeriesReader`].
///
/// See the [module docs](self) for the iteration protocol.
#[derive(Debug)]
pub struct SeriesBlockIterator<R> {
    reader: R,
    state: IterState,
    err: Option<TesseraError>,

    start_ns: u64,
    step_ns: u64,

    /// Current series identity, copied out of the reader's live view.
    id: String,
    labels: Vec<(String, String)>,

    frames: SeriesFrameIterator<CrossBlockIterator>,
}

impl<R: SeriesReader> SeriesBlockIterator<R> {
    /// Creates a series block iterator over `reader`.
    ///
    /// Selects the recorder backend once from the options; the choice is
    /// immutable for the iterator's lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the frame configuration is invalid.
    pub fn new(reader: R, options: Options) -> Result<Self> {
        options.frame.validate()?;

        let recorder: Box<dyn Recorder + Send> = if options.frame.use_columnar_recorder {
            let arena = options
                .arena
                .unwrap_or_else(|| Arc::new(HeapArena::new()));
            Box::new(ColumnarRecorder::new(arena))
        } else {
            Box::new(FlatRecorder::new())
        };

        let merge = CrossBlockIterator::new(options.cursor_pool);

        Ok(Self {
            reader,
            state: IterState::Fresh,
            err: None,
            start_ns: options.frame.start_ns,
            step_ns: options.frame.frame_size_ns(),
            id: String::new(),
            labels: Vec::new(),
            frames: SeriesFrameIterator::new(merge, recorder),
        })
    }

    /// Advances to the next series.
    ///
    /// Returns false permanently once the reader is exhausted, the reader
    /// errored, or a previous series' frame stream latched an error. On
    /// success the frame iterator returned by
    /// [`current`](SeriesBlockIterator::current) is reset to the new
    /// series.
    pub fn advance(&mut self) -> bool {
        if self.state == IterState::Done {
            return false;
        }

        // An error latched while the caller consumed the previous series'
        // frames poisons the whole scan; skipping the series would silently
        // produce incomplete results.
        if let Some(err) = self.frames.err() {
            self.err = Some(err.clone());
            self.state = IterState::Done;
            return false;
        }

        if !self.reader.advance() {
            self.err = self.reader.err().cloned().map(TesseraError::Source);
            self.state = IterState::Done;
            return false;
        }

        let entry = self.reader.current();
        entry.id.clone_into(&mut self.id);
        self.labels.clear();
        self.labels.extend_from_slice(entry.labels);
        self.frames.source_mut().reset(entry.records);
        self.frames.reset(self.start_ns, self.step_ns);

        self.state = IterState::Positioned;
        true
    }

    /// Returns the current series' frame iterator, identifier, and labels.
    ///
    /// This is a live view over single-cursor state, not a snapshot: it is
    /// valid only until the next [`advance`](SeriesBlockIterator::advance)
    /// call, and only meaningful after an `advance()` that returned true.
    pub fn current(
        &mut self,
    ) -> (
        &mut SeriesFrameIterator<CrossBlockIterator>,
        &str,
        &[(String, String)],
    ) {
        (&mut self.frames, &self.id, &self.labels)
    }

    /// Returns the latched terminal error, if any.
    pub fn err(&self) -> Option<&TesseraError> {
        self.err.as_ref()
    }

    /// Releases the recorder's backing storage and returns all segment
    /// cursors to their pool.
    ///
    /// Valid from any state and idempotent: arena memory is released
    /// exactly once. Frames obtained from this iterator are invalid after
    /// close.
    ///
    /// # Errors
    ///
    /// Returns the first release failure; all releases are attempted
    /// regardless.
    pub fn close(&mut self) -> Result<()> {
        self.state = IterState::Done;
        self.frames.close()
    }
}

mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(seconds))
    }
}
