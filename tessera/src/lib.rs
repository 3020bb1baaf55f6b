//! # tessera
//!
//! Cross-block time-series frame iteration engine.
//!
//! tessera takes the raw, time-partitioned, encoded storage segments of a
//! time series — persisted across multiple adjacent retention blocks — and
//! produces a single logically ordered stream of fixed-width, time-aligned
//! *frames* suitable for vectorized downstream consumption (aggregation,
//! repair comparison, export).
//!
//! **Status**: This crate is in early development. The API is not yet stable.
//!
//! ## Key Properties
//!
//! - Merges N independently-encoded block segments into one monotonic
//!   datapoint stream, tolerating empty blocks, time gaps, and overlap
//!   between adjacent blocks
//! - Re-windows that stream into caller-specified frame boundaries,
//!   independent of how the underlying blocks are partitioned
//! - Two interchangeable frame backings — arena-backed typed columns or a
//!   flat datapoint buffer — behind one recorder capability, invisible to
//!   the windowing algorithm
//! - Bounded, reusable memory over an unbounded series stream: one
//!   recorder, one merge iterator, and one frame iterator serve the whole
//!   scan, reset per series
//! - Pull-based and single-threaded: no background work, no locking; run
//!   independent iterators over disjoint series ranges for parallelism
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tessera::{FrameConfig, Options, PlainCursorPool, SeriesBlockIterator};
//!
//! # fn scan(reader: impl tessera::SeriesReader) -> tessera::Result<()> {
//! let options = Options {
//!     frame: FrameConfig {
//!         start_ns: 1_640_000_000_000_000_000,
//!         frame_size: Duration::from_secs(10),
//!         use_columnar_recorder: true,
//!     },
//!     cursor_pool: Arc::new(PlainCursorPool::new()),
//!     arena: None,
//! };
//!
//! let mut iter = SeriesBlockIterator::new(reader, options)?;
//! while iter.advance() {
//!     let (frames, id, _labels) = iter.current();
//!     while frames.advance() {
//!         let frame = frames.current();
//!         println!("{id}: {} points in [{}, {})", frame.len(), frame.start_ns(), frame.end_ns());
//!     }
//! }
//! iter.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`SeriesBlockIterator`] — Top-level orchestrator over the per-series
//!   reader
//! - [`SeriesFrameIterator`] — Windows a merged datapoint stream into
//!   frames
//! - [`CrossBlockIterator`] — Merges one series' block cursors in time
//!   order
//! - [`Recorder`] — Accumulates datapoints into frame-shaped buffers
//! - [`Frame`] — One materialized, time-bounded run of datapoints
//!
//! ## Modules
//!
//! For lower-level access, the individual modules are also public:
//!
//! - [`series`] — Orchestrator, options, frame configuration
//! - [`window`] — Frame windowing over a datapoint source
//! - [`merge`] — Cross-block merge iteration
//! - [`recorder`] — Recorder backends and the column arena seam
//! - [`frame`] — Frame accessor surface
//! - [`source`] — External collaborator traits and the plain codec
//! - [`point`] — Datapoint and block record value types
//! - [`error`] — Error types

pub mod error;
pub mod frame;
pub mod merge;
pub mod point;
pub mod recorder;
pub mod series;
pub mod source;
pub mod window;

// Re-export primary API types at crate root for convenience.
pub use error::{Result, TesseraError};
pub use frame::Frame;
pub use merge::CrossBlockIterator;
pub use point::{BlockRecord, Datapoint};
pub use recorder::{ColumnArena, ColumnBuffers, ColumnarRecorder, FlatRecorder, HeapArena, Recorder};
pub use series::{FrameConfig, Options, SeriesBlockIterator};
pub use source::{
    CursorPool, DatapointSource, PlainCursor, PlainCursorPool, SegmentCursor, SeriesEntry,
    SeriesReader,
};
pub use window::SeriesFrameIterator;
