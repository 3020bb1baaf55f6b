//! Shared fixtures for the integration tests: an in-memory series reader
//! over plain-encoded block segments.

use tessera::error::SourceError;
use tessera::source::{SeriesEntry, SeriesReader, encode_plain};
use tessera::{BlockRecord, Datapoint};

/// Nanoseconds per second.
pub const SEC: u64 = 1_000_000_000;

/// One in-memory series: identity, labels, and its block records.
#[derive(Debug, Clone)]
pub struct MemSeries {
    pub id: String,
    pub labels: Vec<(String, String)>,
    pub records: Vec<BlockRecord>,
}

/// In-memory [`SeriesReader`] used to drive the orchestrator in tests.
///
/// Optionally reports a terminal error after the last series, mimicking a
/// reader that fails partway through a scan.
#[derive(Debug, Default)]
pub struct MemReader {
    series: Vec<MemSeries>,
    position: usize,
    terminal_err: Option<SourceError>,
    err: Option<SourceError>,
}

impl MemReader {
    pub fn new(series: Vec<MemSeries>) -> Self {
        Self {
            series,
            ..Self::default()
        }
    }

    pub fn failing_after(series: Vec<MemSeries>, err: SourceError) -> Self {
        Self {
            series,
            terminal_err: Some(err),
            ..Self::default()
        }
    }
}

impl SeriesReader for MemReader {
    fn advance(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        if self.position >= self.series.len() {
            self.err = self.terminal_err.take();
            return false;
        }
        self.position += 1;
        true
    }

    fn current(&self) -> SeriesEntry<'_> {
        let series = &self.series[self.position - 1];
        SeriesEntry {
            id: &series.id,
            labels: &series.labels,
            records: &series.records,
        }
    }

    fn err(&self) -> Option<&SourceError> {
        self.err.as_ref()
    }
}

/// Builds a block record spanning `[start_s, start_s + size_s)` seconds
/// whose plain-encoded segment holds one datapoint per listed second, with
/// the timestamp (in seconds) doubling as the value.
pub fn block(start_s: u64, size_s: u64, timestamps_s: &[u64]) -> BlockRecord {
    let points: Vec<Datapoint> = timestamps_s
        .iter()
        .map(|&t| Datapoint::new(t * SEC, t as f64))
        .collect();
    BlockRecord::new(start_s * SEC, size_s * SEC, encode_plain(&points))
}

/// Builds a single-block series named `id` with a `host` label.
pub fn single_block_series(id: &str, timestamps_s: &[u64]) -> MemSeries {
    MemSeries {
        id: id.to_string(),
        labels: vec![("host".to_string(), id.to_string())],
        records: vec![block(0, 1_000, timestamps_s)],
    }
}
