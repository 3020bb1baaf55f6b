//! Cross-block merge: one ordered datapoint stream per series.
//!
//! A series' datapoints are persisted across multiple adjacent retention
//! blocks, each independently encoded. [`CrossBlockIterator`] merges the
//! ordered cursors of all of a series' block records into a single stream
//! of strictly non-decreasing timestamps, spanning arbitrary time gaps
//! between blocks.
//!
//! # Design
//!
//! Block records are disjoint, time-ordered partitions, so the common case
//! is a single-pass concatenation: stream one block's cursor to exhaustion,
//! then the next. Overlap between adjacent blocks (cold writes landing in a
//! neighboring block's range) is detected from record metadata before any
//! datapoint is emitted: records whose time ranges overlap are grouped into
//! a *run*, one cursor is opened per record in the run, and the run is
//! drained with a stable k-way merge. The earlier record wins timestamp
//! ties, runs are almost always of length one, and a run of length one
//! degenerates to plain streaming.
//!
//! Cursors are checked out of the configured pool lazily, retained across
//! `reset()` calls so decode buffers are reused for the whole scan, and
//! checked back in on `close()`. Empty blocks are skipped without error;
//! the first decode error latches and terminates iteration for the series.

use std::sync::Arc;

use crate::error::SourceError;
use crate::point::{BlockRecord, Datapoint};
use crate::source::{CursorPool, DatapointSource, SegmentCursor};

/// An opened cursor together with its pre-fetched next datapoint.
#[derive(Debug)]
struct ActiveCursor {
    cursor: Box<dyn SegmentCursor + Send>,
    head: Option<Datapoint>,
}

/// Merges the ordered datapoint cursors of one series' block records into a
/// single strictly-ordered datapoint cursor.
///
/// Reset per series by the orchestrator; never reallocates its record or
/// cursor buffers across series.
#[derive(Debug)]
pub struct CrossBlockIterator {
    pool: Arc<dyn CursorPool>,
    records: Vec<BlockRecord>,
    /// Index of the first record not yet opened.
    next_record: usize,
    /// Cursors for the run currently being drained.
    active: Vec<ActiveCursor>,
    /// Checked-out cursors kept for reuse across runs and series.
    idle: Vec<Box<dyn SegmentCursor + Send>>,
    current: Datapoint,
    err: Option<SourceError>,
}

impl std::fmt::Debug for dyn CursorPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CursorPool")
    }
}

impl CrossBlockIterator {
    /// Creates a merge iterator drawing segment cursors from `pool`.
    ///
    /// The iterator holds no block records until the first [`reset`].
    ///
    /// [`reset`]: CrossBlockIterator::reset
    pub fn new(pool: Arc<dyn CursorPool>) -> Self {
        Self {
            pool,
            records: Vec::new(),
            next_record: 0,
            active: Vec::new(),
            idle: Vec::new(),
            current: Datapoint::default(),
            err: None,
        }
    }

    /// Discards prior merge state and begins merging `records`.
    ///
    /// Records must be ordered by block start time. Internal buffers keep
    /// their capacity so per-series resets do not allocate in steady state.
    pub fn reset(&mut self, records: &[BlockRecord]) {
        self.park_active();
        self.records.clear();
        self.records.extend_from_slice(records);
        self.next_record = 0;
        self.current = Datapoint::default();
        self.err = None;
    }

    /// Moves all active cursors back to the idle cache.
    fn park_active(&mut self) {
        for active in self.active.drain(..) {
            self.idle.push(active.cursor);
        }
    }

    /// Opens the next run of records, returning true if any opened cursor
    /// produced a datapoint.
    ///
    /// A run is a maximal group of consecutive records whose time ranges
    /// overlap; runs of all-empty blocks are skipped. Returns false when no
    /// records remain or a decode error latched while priming.
    fn open_next_run(&mut self) -> bool {
        self.park_active();

        while self.next_record < self.records.len() {
            let run_start = self.next_record;
            let mut run_end = run_start + 1;
            let mut span_end_ns = self.records[run_start].end_ns();
            while run_end < self.records.len() && self.records[run_end].start_ns < span_end_ns {
                span_end_ns = span_end_ns.max(self.records[run_end].end_ns());
                run_end += 1;
            }
            self.next_record = run_end;

            let mut any_head = false;
            for index in run_start..run_end {
                let mut cursor = self
                    .idle
                    .pop()
                    .unwrap_or_else(|| self.pool.checkout());
                cursor.reset(&self.records[index]);

                let head = if cursor.advance() {
                    Some(cursor.current())
                } else {
                    if let Some(err) = cursor.err() {
                        self.err = Some(err.clone());
                    }
                    None
                };
                any_head = any_head || head.is_some();
                self.active.push(ActiveCursor { cursor, head });

                if self.err.is_some() {
                    return false;
                }
            }

            if any_head {
                return true;
            }
            // Every block in the run was empty; keep scanning.
            self.park_active();
        }

        false
    }

    /// Index of the active cursor holding the smallest head timestamp.
    ///
    /// Strict comparison keeps the scan stable: the earlier block wins
    /// timestamp ties.
    fn smallest_head(&self) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (index, active) in self.active.iter().enumerate() {
            if let Some(head) = active.head {
                let better = match best {
                    None => true,
                    Some((_, best_ts)) => head.timestamp_ns < best_ts,
                };
                if better {
                    best = Some((index, head.timestamp_ns));
                }
            }
        }
        best.map(|(index, _)| index)
    }
}

impl DatapointSource for CrossBlockIterator {
    fn advance(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }

        loop {
            let Some(index) = self.smallest_head() else {
                // Current run drained (or nothing opened yet); open the next.
                if !self.open_next_run() {
                    return false;
                }
                continue;
            };

            let slot = &mut self.active[index];
            let Some(head) = slot.head.take() else {
                return false;
            };
            self.current = head;

            // Pre-fetch the emitting cursor's next datapoint. A decode
            // error here latches, but the datapoint already in hand is
            // still emitted; the next advance() observes the error.
            if slot.cursor.advance() {
                slot.head = Some(slot.cursor.current());
            } else if let Some(err) = slot.cursor.err() {
                self.err = Some(err.clone());
            }

            return true;
        }
    }

    fn current(&self) -> Datapoint {
        self.current
    }

    fn err(&self) -> Option<&SourceError> {
        self.err.as_ref()
    }

    fn close(&mut self) {
        self.park_active();
        for cursor in self.idle.drain(..) {
            self.pool.checkin(cursor);
        }
        self.records.clear();
    }
}
