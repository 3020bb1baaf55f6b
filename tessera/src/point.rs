//! Core value types: datapoints and block records.

use std::sync::Arc;

/// A single timestamped sample.
///
/// Timestamps are u64 nanoseconds since the epoch, values are f64, and the
/// type is `Copy` — datapoints are passed by value throughout the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Datapoint {
    /// Sample timestamp in nanoseconds.
    pub timestamp_ns: u64,
    /// Sample value.
    pub value: f64,
}

impl Datapoint {
    /// Creates a new datapoint.
    pub fn new(timestamp_ns: u64, value: f64) -> Self {
        Self {
            timestamp_ns,
            value,
        }
    }
}

/// An opaque handle to one retention block's encoded segment.
///
/// A block record pairs the block's time bounds with the raw encoded bytes
/// of one series' datapoints in that block. Records are produced by the
/// external per-series reader and are immutable once handed to the merge
/// iterator; the segment is reference-counted so records clone cheaply.
///
/// Decoding is delegated to a [`SegmentCursor`](crate::source::SegmentCursor)
/// obtained from the configured cursor pool.
#[derive(Debug, Clone)]
pub struct BlockRecord {
    /// Start of the block's time range (nanoseconds, inclusive).
    pub start_ns: u64,
    /// Width of the block's time range (nanoseconds).
    pub size_ns: u64,
    /// The encoded datapoint segment for this block.
    pub segment: Arc<[u8]>,
}

impl BlockRecord {
    /// Creates a new block record.
    pub fn new(start_ns: u64, size_ns: u64, segment: impl Into<Arc<[u8]>>) -> Self {
        Self {
            start_ns,
            size_ns,
            segment: segment.into(),
        }
    }

    /// Returns the exclusive end of the block's time range, saturating at
    /// `u64::MAX`.
    pub fn end_ns(&self) -> u64 {
        self.start_ns.saturating_add(self.size_ns)
    }
}
