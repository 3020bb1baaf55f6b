//! External collaborator seams: segment cursors, cursor pools, and the
//! per-series reader.
//!
//! The iteration engine never touches the on-disk format itself. Encoded
//! block segments are decoded through a [`SegmentCursor`] checked out of a
//! [`CursorPool`], and series are supplied in order by a [`SeriesReader`].
//! All three are traits so the real storage layer can plug in its own
//! codec, decode-buffer pooling, and series grouping.
//!
//! A plain fixed-width reference codec ([`PlainCursor`], [`PlainCursorPool`])
//! is included for tests, benchmarks, and simple in-memory use: segments are
//! a sequence of 16-byte records holding a little-endian u64 timestamp
//! followed by the little-endian bit pattern of an f64 value.

use std::sync::{Arc, Mutex};

use crate::error::SourceError;
use crate::point::{BlockRecord, Datapoint};

/// A cursor over one block's encoded datapoint segment.
///
/// Cursor contract: `advance()` returns false when the segment is exhausted
/// *or* when decoding failed — callers distinguish the two by checking
/// `err()`. Once `err()` is set the cursor stays errored until the next
/// `reset()`.
pub trait SegmentCursor {
    /// Rebinds the cursor to a new block record, discarding prior state.
    ///
    /// Implementations should retain decode buffers across resets; that is
    /// the point of pooling cursors.
    fn reset(&mut self, record: &BlockRecord);

    /// Advances to the next datapoint. Returns false on exhaustion or error.
    fn advance(&mut self) -> bool;

    /// Returns the datapoint at the cursor.
    ///
    /// Only valid after an `advance()` that returned true.
    fn current(&self) -> Datapoint;

    /// Returns the decode error, if one occurred.
    fn err(&self) -> Option<&SourceError>;
}

/// A shared pool of segment cursors.
///
/// The merge iterator checks cursors out once and keeps them across series
/// resets so decode buffers are reused for the whole scan; `close()` checks
/// them back in. Pools must tolerate concurrent checkout from independent
/// iterator instances.
pub trait CursorPool: Send + Sync {
    /// Takes a cursor from the pool, constructing one if none are idle.
    fn checkout(&self) -> Box<dyn SegmentCursor + Send>;

    /// Returns a cursor to the pool.
    fn checkin(&self, cursor: Box<dyn SegmentCursor + Send>);
}

/// The merged, strictly time-ordered datapoint stream consumed by the
/// frame windowing algorithm.
///
/// [`CrossBlockIterator`](crate::merge::CrossBlockIterator) is the
/// production implementation; tests drive the windower with simple
/// vec-backed sources.
pub trait DatapointSource {
    /// Advances to the next datapoint. Returns false on exhaustion or error.
    fn advance(&mut self) -> bool;

    /// Returns the datapoint at the cursor.
    fn current(&self) -> Datapoint;

    /// Returns the first read/decode error encountered, latched.
    fn err(&self) -> Option<&SourceError>;

    /// Releases any underlying per-block resources.
    fn close(&mut self) {}
}

/// One series' identity, labels, and ordered block records, borrowed from
/// the reader.
///
/// The view is valid until the reader's next `advance()`.
#[derive(Debug, Clone, Copy)]
pub struct SeriesEntry<'a> {
    /// Series identifier.
    pub id: &'a str,
    /// Dimensional labels attached to the series.
    pub labels: &'a [(String, String)],
    /// Block records for the series, ordered by block start time.
    pub records: &'a [BlockRecord],
}

/// The external per-series reader collaborator.
///
/// Supplies `(id, labels, block records)` tuples in series order. After a
/// false `advance()`, `err()` distinguishes clean exhaustion from failure
/// and is sticky.
pub trait SeriesReader {
    /// Advances to the next series. Returns false on exhaustion or error.
    fn advance(&mut self) -> bool;

    /// Returns the current series' entry.
    ///
    /// Only valid after an `advance()` that returned true, and only until
    /// the next `advance()`.
    fn current(&self) -> SeriesEntry<'_>;

    /// Returns the sticky error after a false `advance()`, if any.
    fn err(&self) -> Option<&SourceError>;
}

impl<R: SeriesReader + ?Sized> SeriesReader for &mut R {
    fn advance(&mut self) -> bool {
        (**self).advance()
    }

    fn current(&self) -> SeriesEntry<'_> {
        (**self).current()
    }

    fn err(&self) -> Option<&SourceError> {
        (**self).err()
    }
}

/// Byte width of one record in the plain segment layout.
pub const PLAIN_RECORD_SIZE: usize = 16;

/// Encodes datapoints into a plain fixed-width segment.
///
/// The inverse of what [`PlainCursor`] reads: per datapoint, 8 bytes of
/// little-endian timestamp followed by 8 bytes of little-endian f64 bits.
pub fn encode_plain(points: &[Datapoint]) -> Vec<u8> {
    let mut segment = Vec::with_capacity(points.len() * PLAIN_RECORD_SIZE);
    for point in points {
        segment.extend_from_slice(&point.timestamp_ns.to_le_bytes());
        segment.extend_from_slice(&point.value.to_le_bytes());
    }
    segment
}

/// Reference cursor over the plain fixed-width segment layout.
#[derive(Debug, Default)]
pub struct PlainCursor {
    segment: Arc<[u8]>,
    offset: usize,
    block_start_ns: u64,
    current: Datapoint,
    err: Option<SourceError>,
}

impl SegmentCursor for PlainCursor {
    fn reset(&mut self, record: &BlockRecord) {
        self.segment = Arc::clone(&record.segment);
        self.offset = 0;
        self.block_start_ns = record.start_ns;
        self.current = Datapoint::default();
        self.err = None;
    }

    fn advance(&mut self) -> bool {
        if self.err.is_some() || self.offset >= self.segment.len() {
            return false;
        }

        let remaining = self.segment.len() - self.offset;
        if remaining < PLAIN_RECORD_SIZE {
            self.err = Some(SourceError::Decode {
                block_start_ns: self.block_start_ns,
                reason: format!("truncated record: {remaining} trailing bytes"),
            });
            return false;
        }

        let bytes = &self.segment[self.offset..self.offset + PLAIN_RECORD_SIZE];
        let mut timestamp = [0u8; 8];
        let mut value = [0u8; 8];
        timestamp.copy_from_slice(&bytes[..8]);
        value.copy_from_slice(&bytes[8..]);

        self.current = Datapoint {
            timestamp_ns: u64::from_le_bytes(timestamp),
            value: f64::from_le_bytes(value),
        };
        self.offset += PLAIN_RECORD_SIZE;
        true
    }

    fn current(&self) -> Datapoint {
        self.current
    }

    fn err(&self) -> Option<&SourceError> {
        self.err.as_ref()
    }
}

/// A freelist pool of [`PlainCursor`]s.
#[derive(Debug, Default)]
pub struct PlainCursorPool {
    idle: Mutex<Vec<Box<dyn SegmentCursor + Send>>>,
}

impl PlainCursorPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of idle cursors currently held by the pool.
    ///
    /// Useful for verifying that iterators check their cursors back in.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().map_or(0, |idle| idle.len())
    }
}

impl CursorPool for PlainCursorPool {
    fn checkout(&self) -> Box<dyn SegmentCursor + Send> {
        match self.idle.lock() {
            Ok(mut idle) => idle
                .pop()
                .unwrap_or_else(|| Box::new(PlainCursor::default())),
            Err(_) => Box::new(PlainCursor::default()),
        }
    }

    fn checkin(&self, cursor: Box<dyn SegmentCursor + Send>) {
        // A poisoned freelist just drops the cursor; checkin is best-effort.
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(cursor);
        }
    }
}

impl std::fmt::Debug for dyn SegmentCursor + Send {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SegmentCursor")
    }
}
