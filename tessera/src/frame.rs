//! Materialized time-bounded frames of datapoints.
//!
//! A [`Frame`] is the unit handed to downstream consumers: every datapoint
//! whose timestamp falls in the half-open window `[start_ns, end_ns)`,
//! backed either by two typed columns (columnar recorder) or a flat run of
//! datapoint pairs (flat recorder). The accessor surface is identical in
//! shape for both backings so consumers never branch on which recorder
//! produced the frame; columnar consumers additionally get zero-copy access
//! to the raw columns.
//!
//! Frames borrow the recorder that produced them and are valid only until
//! the frame iterator's next `advance()` or its `close()`.

use crate::point::Datapoint;

/// A time-bounded run of datapoints produced by a recorder snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    start_ns: u64,
    end_ns: u64,
    backing: Backing<'a>,
}

/// The two storage shapes a frame can borrow.
#[derive(Debug, Clone, Copy)]
enum Backing<'a> {
    Columnar {
        timestamps: &'a [u64],
        values: &'a [f64],
    },
    Flat(&'a [Datapoint]),
}

impl<'a> Frame<'a> {
    /// Creates a frame over columnar storage.
    pub(crate) fn columnar(
        start_ns: u64,
        end_ns: u64,
        timestamps: &'a [u64],
        values: &'a [f64],
    ) -> Self {
        debug_assert_eq!(timestamps.len(), values.len());
        Self {
            start_ns,
            end_ns,
            backing: Backing::Columnar { timestamps, values },
        }
    }

    /// Creates a frame over flat storage.
    pub(crate) fn flat(start_ns: u64, end_ns: u64, points: &'a [Datapoint]) -> Self {
        Self {
            start_ns,
            end_ns,
            backing: Backing::Flat(points),
        }
    }

    /// Start of the frame's window in nanoseconds (inclusive).
    pub fn start_ns(&self) -> u64 {
        self.start_ns
    }

    /// End of the frame's window in nanoseconds (exclusive).
    pub fn end_ns(&self) -> u64 {
        self.end_ns
    }

    /// Number of datapoints in the frame.
    pub fn len(&self) -> usize {
        match self.backing {
            Backing::Columnar { timestamps, .. } => timestamps.len(),
            Backing::Flat(points) => points.len(),
        }
    }

    /// Returns true if the frame holds no datapoints.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the datapoint at `index`, or `None` if out of bounds.
    pub fn datapoint(&self, index: usize) -> Option<Datapoint> {
        match self.backing {
            Backing::Columnar { timestamps, values } => {
                let timestamp_ns = *timestamps.get(index)?;
                let value = *values.get(index)?;
                Some(Datapoint {
                    timestamp_ns,
                    value,
                })
            }
            Backing::Flat(points) => points.get(index).copied(),
        }
    }

    /// Returns the timestamp column for zero-copy vectorized access.
    ///
    /// `None` when the frame is backed by the flat recorder.
    pub fn timestamps(&self) -> Option<&'a [u64]> {
        match self.backing {
            Backing::Columnar { timestamps, .. } => Some(timestamps),
            Backing::Flat(_) => None,
        }
    }

    /// Returns the value column for zero-copy vectorized access.
    ///
    /// `None` when the frame is backed by the flat recorder.
    pub fn values(&self) -> Option<&'a [f64]> {
        match self.backing {
            Backing::Columnar { values, .. } => Some(values),
            Backing::Flat(_) => None,
        }
    }

    /// Returns an iterator over the frame's datapoints in timestamp order.
    pub fn iter(&self) -> FrameIter<'a> {
        FrameIter {
            backing: self.backing,
            index: 0,
        }
    }
}

impl<'a> IntoIterator for &Frame<'a> {
    type Item = Datapoint;
    type IntoIter = FrameIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a frame's datapoints.
#[derive(Debug)]
pub struct FrameIter<'a> {
    backing: Backing<'a>,
    index: usize,
}

impl Iterator for FrameIter<'_> {
    type Item = Datapoint;

    fn next(&mut self) -> Option<Self::Item> {
        let point = match self.backing {
            Backing::Columnar { timestamps, values } => {
                let timestamp_ns = *timestamps.get(self.index)?;
                let value = *values.get(self.index)?;
                Datapoint {
                    timestamp_ns,
                    value,
                }
            }
            Backing::Flat(points) => *points.get(self.index)?,
        };
        self.index += 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.backing {
            Backing::Columnar { timestamps, .. } => timestamps.len(),
            Backing::Flat(points) => points.len(),
        }
        .saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}
