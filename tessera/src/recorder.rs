//! Frame recorders: stateful accumulators that build frames from
//! individual datapoint appends.
//!
//! Two interchangeable backends implement the [`Recorder`] capability set:
//!
//! - [`FlatRecorder`] — a plain resizable buffer of datapoint pairs.
//!   Release is a no-op; the default, low-setup-cost path.
//! - [`ColumnarRecorder`] — two growable typed columns (timestamps, values)
//!   whose backing storage comes from a shared [`ColumnArena`]. Release is
//!   mandatory and returns the columns to the arena. Chosen when consumers
//!   want zero-copy vectorized batches.
//!
//! Both backends produce [`Frame`]s with an identical logical contract, so
//! the windowing algorithm is agnostic to which is in use. The choice is
//! made once at construction and is immutable for the lifetime of a
//! [`SeriesBlockIterator`](crate::series::SeriesBlockIterator).

use std::sync::{Arc, Mutex};

use crate::error::ReleaseError;
use crate::frame::Frame;
use crate::point::Datapoint;

/// Capability set for accumulating datapoints into a frame-shaped buffer.
///
/// `reset()` retains backing storage so recorders can be reused across an
/// unbounded series stream without reallocation. `release()` returns the
/// backing storage to its origin and must be idempotent; frames produced
/// from a recorder are invalid once it has been released.
pub trait Recorder {
    /// Appends one datapoint to the accumulated run.
    fn append(&mut self, point: Datapoint);

    /// Returns the accumulated run as a frame bounded to `[start_ns, end_ns)`.
    ///
    /// The recorder stays usable for further appends; the frame borrows the
    /// recorder's storage and is invalidated by the next `reset()`,
    /// `append()` after a reset, or `release()`.
    fn snapshot(&self, start_ns: u64, end_ns: u64) -> Frame<'_>;

    /// Clears the accumulated run, retaining backing storage.
    fn reset(&mut self);

    /// Returns backing storage to its origin. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError`] if the storage could not be returned.
    fn release(&mut self) -> Result<(), ReleaseError>;

    /// Number of datapoints accumulated since the last reset.
    fn len(&self) -> usize;

    /// Returns true if nothing has been accumulated since the last reset.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Recorder backed by a plain resizable buffer of datapoint pairs.
#[derive(Debug, Default)]
pub struct FlatRecorder {
    points: Vec<Datapoint>,
}

impl FlatRecorder {
    /// Creates an empty flat recorder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Recorder for FlatRecorder {
    fn append(&mut self, point: Datapoint) {
        self.points.push(point);
    }

    fn snapshot(&self, start_ns: u64, end_ns: u64) -> Frame<'_> {
        Frame::flat(start_ns, end_ns, &self.points)
    }

    fn reset(&mut self) {
        self.points.clear();
    }

    fn release(&mut self) -> Result<(), ReleaseError> {
        // Backing storage is ordinary heap memory; nothing to return.
        Ok(())
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}

/// A pair of typed column buffers handed out by a [`ColumnArena`].
#[derive(Debug, Default)]
pub struct ColumnBuffers {
    /// Timestamp column (nanoseconds).
    pub timestamps: Vec<u64>,
    /// Value column.
    pub values: Vec<f64>,
}

/// A shared arena that owns the columnar recorders' backing storage.
///
/// The engine only consumes the arena; implementations must be safe for
/// multiple independent iterator instances acquiring and returning disjoint
/// buffers in parallel.
pub trait ColumnArena: Send + Sync {
    /// Acquires a cleared pair of column buffers.
    fn acquire(&self) -> ColumnBuffers;

    /// Returns a pair of column buffers to the arena.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError`] if the buffers could not be accepted.
    fn release(&self, buffers: ColumnBuffers) -> Result<(), ReleaseError>;
}

/// Default [`ColumnArena`]: a freelist of column pairs on the ordinary heap.
///
/// Used when no external arena is supplied. Returned buffers keep their
/// capacity, so steady-state iteration acquires without allocating.
#[derive(Debug, Default)]
pub struct HeapArena {
    idle: Mutex<Vec<ColumnBuffers>>,
}

impl HeapArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of idle buffer pairs currently held.
    ///
    /// Useful for verifying that close paths release exactly once.
    pub fn idle_buffers(&self) -> usize {
        self.idle.lock().map_or(0, |idle| idle.len())
    }
}

impl ColumnArena for HeapArena {
    fn acquire(&self) -> ColumnBuffers {
        match self.idle.lock() {
            Ok(mut idle) => {
                let mut buffers = idle.pop().unwrap_or_default();
                buffers.timestamps.clear();
                buffers.values.clear();
                buffers
            }
            Err(_) => ColumnBuffers::default(),
        }
    }

    fn release(&self, buffers: ColumnBuffers) -> Result<(), ReleaseError> {
        let mut idle = self.idle.lock().map_err(|_| ReleaseError::ArenaReturn {
            reason: "arena freelist lock poisoned".to_string(),
        })?;
        idle.push(buffers);
        Ok(())
    }
}

/// Recorder backed by arena-allocated typed columns.
pub struct ColumnarRecorder {
    arena: Arc<dyn ColumnArena>,
    buffers: Option<ColumnBuffers>,
}

impl std::fmt::Debug for ColumnarRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnarRecorder")
            .field("buffers", &self.buffers)
            .finish_non_exhaustive()
    }
}

impl ColumnarRecorder {
    /// Creates a columnar recorder, acquiring its columns from `arena`.
    pub fn new(arena: Arc<dyn ColumnArena>) -> Self {
        let buffers = Some(arena.acquire());
        Self { arena, buffers }
    }
}

impl Recorder for ColumnarRecorder {
    fn append(&mut self, point: Datapoint) {
        // Appending after release re-acquires from the arena.
        let buffers = self.buffers.get_or_insert_with(|| self.arena.acquire());
        buffers.timestamps.push(point.timestamp_ns);
        buffers.values.push(point.value);
    }

    fn snapshot(&self, start_ns: u64, end_ns: u64) -> Frame<'_> {
        match &self.buffers {
            Some(buffers) => {
                Frame::columnar(start_ns, end_ns, &buffers.timestamps, &buffers.values)
            }
            None => Frame::columnar(start_ns, end_ns, &[], &[]),
        }
    }

    fn reset(&mut self) {
        if let Some(buffers) = &mut self.buffers {
            buffers.timestamps.clear();
            buffers.values.clear();
        }
    }

    fn release(&mut self) -> Result<(), ReleaseError> {
        // `take` makes release one-shot: a second call finds no buffers.
        match self.buffers.take() {
            Some(buffers) => self.arena.release(buffers),
            None => Ok(()),
        }
    }

    fn len(&self) -> usize {
        self.buffers
            .as_ref()
            .map_or(0, |buffers| buffers.timestamps.len())
    }
}
