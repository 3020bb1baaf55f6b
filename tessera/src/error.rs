//! Error types for the tessera frame iteration engine.

use std::time::Duration;

use thiserror::Error;

/// The main error type for all tessera operations.
///
/// This enum covers the three error classes the iteration engine can
/// observe: configuration mistakes, read/decode failures in the external
/// data sources, and failures while returning backing storage.
///
/// All variants carry owned, cheap payloads so errors are `Clone` and
/// `PartialEq`. The iterators latch the first error they see and report it
/// on every subsequent call, which requires handing out the same error more
/// than once.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TesseraError {
    /// Invalid configuration or a data-dependent configuration violation.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Read or decode failure reported by an external source.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Failure while releasing backing storage.
    #[error("release error: {0}")]
    Release(#[from] ReleaseError),
}

/// Errors caused by invalid configuration.
///
/// Static violations are rejected at construction time; data-dependent
/// violations surface through the iterators' `err()` accessor at first
/// occurrence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The frame size (step) must be a positive duration.
    #[error("frame size must be positive, got {frame_size:?}")]
    ZeroFrameSize {
        /// The rejected frame size.
        frame_size: Duration,
    },

    /// The frame size does not fit in u64 nanoseconds.
    #[error("frame size {frame_size:?} exceeds u64 nanoseconds")]
    FrameSizeTooLarge {
        /// The rejected frame size.
        frame_size: Duration,
    },

    /// A datapoint precedes the configured alignment start.
    ///
    /// Frames are aligned to `start + k * step` for `k >= 0`; a timestamp
    /// earlier than `start` has no frame and indicates a misconfigured
    /// start instant, not droppable data.
    #[error("datapoint timestamp {timestamp_ns} precedes frame start {start_ns}")]
    DatapointBeforeStart {
        /// The offending datapoint timestamp (nanoseconds).
        timestamp_ns: u64,
        /// The configured alignment start (nanoseconds).
        start_ns: u64,
    },
}

/// Read or decode errors reported by the external data sources.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// A block segment cursor failed to decode a datapoint.
    #[error("failed to decode segment for block starting at {block_start_ns}: {reason}")]
    Decode {
        /// Start timestamp of the block whose segment failed (nanoseconds).
        block_start_ns: u64,
        /// Description of the decode failure.
        reason: String,
    },

    /// The per-series reader failed while advancing.
    #[error("series reader failed: {reason}")]
    Reader {
        /// Description of the reader failure.
        reason: String,
    },
}

/// Errors raised while returning backing storage to its origin.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReleaseError {
    /// The arena rejected or failed to accept returned column buffers.
    #[error("failed to return column buffers to arena: {reason}")]
    ArenaReturn {
        /// Description of the failure.
        reason: String,
    },
}

/// Type alias for `Result<T, TesseraError>`.
pub type Result<T> = std::result::Result<T, TesseraError>;
