//! Integration tests for the orchestrator lifecycle: latched termination,
//! resource release, and scan-level error handling.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MemReader, MemSeries, SEC, block, single_block_series};
use tessera::error::{ConfigError, SourceError, TesseraError};
use tessera::{
    BlockRecord, FrameConfig, HeapArena, Options, PlainCursorPool, SeriesBlockIterator,
};

fn options_with(
    pool: Arc<PlainCursorPool>,
    arena: Option<Arc<HeapArena>>,
    columnar: bool,
) -> Options {
    Options {
        frame: FrameConfig {
            start_ns: 0,
            frame_size: Duration::from_secs(10),
            use_columnar_recorder: columnar,
        },
        cursor_pool: pool,
        arena: arena.map(|a| a as _),
    }
}

#[test]
fn test_reader_error_latches_terminally() {
    let reader = MemReader::failing_after(
        vec![single_block_series("ok", &[1])],
        SourceError::Reader {
            reason: "connection reset".to_string(),
        },
    );
    let pool = Arc::new(PlainCursorPool::new());
    let mut iter = SeriesBlockIterator::new(reader, options_with(pool, None, false)).unwrap();

    assert!(iter.advance());
    assert!(!iter.advance());
    let latched = iter.err().cloned();
    assert!(matches!(
        latched,
        Some(TesseraError::Source(SourceError::Reader { .. }))
    ));

    // Careless extra calls observe the same terminal outcome.
    for _ in 0..3 {
        assert!(!iter.advance());
        assert_eq!(iter.err().cloned(), latched);
    }
}

#[test]
fn test_corrupt_segment_latches_whole_scan() {
    // A truncated segment in the first series must poison the scan: the
    // second series is never reached.
    let mut bad = block(0, 10, &[1, 2]);
    let mut bytes = bad.segment.to_vec();
    bytes.truncate(bytes.len() - 5);
    bad.segment = bytes.into();

    let reader = MemReader::new(vec![
        MemSeries {
            id: "corrupt".to_string(),
            labels: vec![],
            records: vec![bad],
        },
        single_block_series("never-reached", &[5]),
    ]);
    let pool = Arc::new(PlainCursorPool::new());
    let mut iter = SeriesBlockIterator::new(reader, options_with(pool, None, false)).unwrap();

    assert!(iter.advance());
    let (frames, _, _) = iter.current();
    while frames.advance() {}
    assert!(matches!(
        frames.err(),
        Some(TesseraError::Source(SourceError::Decode { .. }))
    ));

    // The orchestrator observes the frame-level error and terminates.
    assert!(!iter.advance());
    assert!(matches!(
        iter.err(),
        Some(TesseraError::Source(SourceError::Decode { .. }))
    ));
    assert!(!iter.advance());
}

#[test]
fn test_datapoint_before_start_is_a_config_error() {
    let reader = MemReader::new(vec![single_block_series("early", &[5])]);
    let pool = Arc::new(PlainCursorPool::new());
    let mut iter = SeriesBlockIterator::new(
        reader,
        Options {
            frame: FrameConfig {
                start_ns: 100 * SEC,
                frame_size: Duration::from_secs(10),
                use_columnar_recorder: false,
            },
            cursor_pool: pool,
            arena: None,
        },
    )
    .unwrap();

    assert!(iter.advance());
    let (frames, _, _) = iter.current();
    assert!(!frames.advance());
    assert!(matches!(
        frames.err(),
        Some(TesseraError::Config(
            ConfigError::DatapointBeforeStart { .. }
        ))
    ));
    assert!(!iter.advance());
}

#[test]
fn test_close_releases_arena_memory_exactly_once() {
    let pool = Arc::new(PlainCursorPool::new());
    let arena = Arc::new(HeapArena::new());
    let reader = MemReader::new(vec![single_block_series("m", &[1])]);
    let mut iter = SeriesBlockIterator::new(
        reader,
        options_with(Arc::clone(&pool), Some(Arc::clone(&arena)), true),
    )
    .unwrap();

    assert!(iter.advance());
    let (frames, _, _) = iter.current();
    while frames.advance() {}

    assert_eq!(arena.idle_buffers(), 0);
    iter.close().unwrap();
    assert_eq!(arena.idle_buffers(), 1);

    // Second close must not double-release.
    iter.close().unwrap();
    assert_eq!(arena.idle_buffers(), 1);
}

#[test]
fn test_early_close_releases_all_resources() {
    // Aborting mid-scan still returns cursors and arena memory.
    let pool = Arc::new(PlainCursorPool::new());
    let arena = Arc::new(HeapArena::new());
    let reader = MemReader::new(vec![
        single_block_series("a", &[1, 2, 3]),
        single_block_series("b", &[4]),
    ]);
    let mut iter = SeriesBlockIterator::new(
        reader,
        options_with(Arc::clone(&pool), Some(Arc::clone(&arena)), true),
    )
    .unwrap();

    assert!(iter.advance());
    let (frames, _, _) = iter.current();
    assert!(frames.advance()); // abandon the rest of the stream

    iter.close().unwrap();
    assert_eq!(arena.idle_buffers(), 1);
    assert_eq!(pool.idle_count(), 1);

    // Close latches the iterator shut.
    assert!(!iter.advance());
}

#[test]
fn test_multi_series_scan_reuses_cursors_and_buffers() {
    let pool = Arc::new(PlainCursorPool::new());
    let arena = Arc::new(HeapArena::new());
    let series: Vec<MemSeries> = (0..8)
        .map(|i| single_block_series(&format!("series-{i}"), &[1, 15, 32]))
        .collect();
    let mut iter = SeriesBlockIterator::new(
        MemReader::new(series),
        options_with(Arc::clone(&pool), Some(Arc::clone(&arena)), true),
    )
    .unwrap();

    let mut ids = Vec::new();
    let mut total_frames = 0;
    while iter.advance() {
        let (frames, id, labels) = iter.current();
        assert_eq!(labels.len(), 1);
        ids.push(id.to_string());
        while frames.advance() {
            total_frames += 1;
            assert!(!frames.current().is_empty());
        }
    }
    assert!(iter.err().is_none());
    assert_eq!(ids.len(), 8);
    assert_eq!(total_frames, 8 * 3);

    iter.close().unwrap();
    // One cursor and one buffer pair served the entire scan.
    assert_eq!(pool.idle_count(), 1);
    assert_eq!(arena.idle_buffers(), 1);
}

#[test]
fn test_close_valid_from_fresh_state() {
    let pool = Arc::new(PlainCursorPool::new());
    let reader = MemReader::new(vec![single_block_series("m", &[1])]);
    let mut iter = SeriesBlockIterator::new(reader, options_with(pool, None, false)).unwrap();

    iter.close().unwrap();
    assert!(!iter.advance());
    assert!(iter.err().is_none());
}

#[test]
fn test_live_view_invalidated_by_advance() {
    // Current() is a cursor view: after advancing, it reflects the new
    // series, and the id/label buffers are reused in place.
    let pool = Arc::new(PlainCursorPool::new());
    let reader = MemReader::new(vec![
        single_block_series("first", &[1]),
        single_block_series("second", &[2]),
    ]);
    let mut iter = SeriesBlockIterator::new(reader, options_with(pool, None, false)).unwrap();

    assert!(iter.advance());
    assert_eq!(iter.current().1, "first");
    assert!(iter.advance());
    let (frames, id, labels) = iter.current();
    assert_eq!(id, "second");
    assert_eq!(labels[0].1, "second");
    assert!(frames.advance());
    assert_eq!(frames.current().datapoint(0).map(|p| p.timestamp_ns), Some(2 * SEC));
}

#[test]
fn test_empty_reader_is_clean_exhaustion() {
    let pool = Arc::new(PlainCursorPool::new());
    let mut iter =
        SeriesBlockIterator::new(MemReader::new(vec![]), options_with(pool, None, false)).unwrap();

    assert!(!iter.advance());
    assert!(iter.err().is_none());
    iter.close().unwrap();
}

#[test]
fn test_multi_block_series_round_trip() {
    let pool = Arc::new(PlainCursorPool::new());
    let series = MemSeries {
        id: "multi".to_string(),
        labels: vec![("role".to_string(), "db".to_string())],
        records: vec![
            block(0, 20, &[2, 5, 8]),
            BlockRecord::new(20 * SEC, 20 * SEC, common_segment(&[21, 25])),
            block(40, 20, &[41]),
        ],
    };
    let mut iter = SeriesBlockIterator::new(
        MemReader::new(vec![series]),
        options_with(pool, None, false),
    )
    .unwrap();

    assert!(iter.advance());
    let (frames, _, labels) = iter.current();
    assert_eq!(labels[0].0, "role");

    let mut seen = Vec::new();
    while frames.advance() {
        let frame = frames.current();
        seen.push((
            frame.start_ns() / SEC,
            frame.iter().map(|p| p.timestamp_ns / SEC).collect::<Vec<_>>(),
        ));
    }
    assert_eq!(
        seen,
        vec![
            (0, vec![2, 5, 8]),
            (20, vec![21, 25]),
            (40, vec![41]),
        ]
    );
    iter.close().unwrap();
}

/// Plain-encodes datapoints whose second-granularity timestamps double as
/// values.
fn common_segment(timestamps_s: &[u64]) -> Vec<u8> {
    use tessera::Datapoint;
    use tessera::source::encode_plain;
    let points: Vec<Datapoint> = timestamps_s
        .iter()
        .map(|&t| Datapoint::new(t * SEC, t as f64))
        .collect();
    encode_plain(&points)
}
