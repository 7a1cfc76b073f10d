use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::error::{Result, TransferError};
use crate::models::{ChunkMeta, SourceType};

/// Yields chunk descriptors until exhausted.
///
/// Must be safe to call from many reader workers at once; once `next` returns
/// `None` it must keep returning `None`.
pub trait ChunkPool: Send + Sync {
    fn next(&self) -> Option<ChunkMeta>;
}

/// FIFO pool over a fixed set of chunk descriptors
#[derive(Debug, Default)]
pub struct VecChunkPool {
    chunks: Mutex<VecDeque<ChunkMeta>>,
}

impl VecChunkPool {
    pub fn new(chunks: impl IntoIterator<Item = ChunkMeta>) -> Self {
        Self {
            chunks: Mutex::new(chunks.into_iter().collect()),
        }
    }

    /// Split `[start, end)` into consecutive windows of at most `step`
    pub fn time_windows(
        source: SourceType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<Self> {
        if step <= Duration::zero() {
            return Err(TransferError::ConfigurationError(format!(
                "chunk time window must be positive, got {step}"
            )));
        }

        let mut chunks = Vec::new();
        let mut window_start = start;
        while window_start < end {
            let window_end = (window_start + step).min(end);
            chunks.push(ChunkMeta::time_window(source, window_start, window_end));
            window_start = window_end;
        }

        Ok(Self::new(chunks))
    }

    /// Split `total_rows` into spans of at most `rows_per_chunk`
    pub fn row_spans(source: SourceType, total_rows: u64, rows_per_chunk: u64) -> Result<Self> {
        if rows_per_chunk == 0 {
            return Err(TransferError::ConfigurationError(
                "rows per chunk must be greater than 0".to_string(),
            ));
        }

        let chunks = (0..total_rows)
            .step_by(rows_per_chunk as usize)
            .map(|index| ChunkMeta::row_span(source, index, rows_per_chunk.min(total_rows - index)));

        Ok(Self::new(chunks))
    }

    pub fn remaining(&self) -> usize {
        self.chunks.lock().len()
    }
}

impl ChunkPool for VecChunkPool {
    fn next(&self) -> Option<ChunkMeta> {
        self.chunks.lock().pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkRange;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_time_windows_cover_range() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 12, 0).unwrap();
        let pool = VecChunkPool::time_windows(SourceType::VictoriaMetrics, start, end, Duration::minutes(5)).unwrap();
        assert_eq!(pool.remaining(), 3);

        let mut cursor = start;
        while let Some(meta) = pool.next() {
            let ChunkRange::TimeWindow { start, end: window_end } = meta.range else {
                panic!("expected a time window");
            };
            assert_eq!(start, cursor);
            cursor = window_end;
        }
        assert_eq!(cursor, end);
        assert!(pool.next().is_none());
    }

    #[test]
    fn test_invalid_steps() {
        let now = Utc::now();
        assert!(VecChunkPool::time_windows(SourceType::VictoriaMetrics, now, now, Duration::zero()).is_err());
        assert!(VecChunkPool::row_spans(SourceType::ClickHouse, 10, 0).is_err());
    }

    #[test]
    fn test_row_spans() {
        let pool = VecChunkPool::row_spans(SourceType::ClickHouse, 25, 10).unwrap();
        let spans: Vec<ChunkRange> = std::iter::from_fn(|| pool.next()).map(|m| m.range).collect();
        assert_eq!(
            spans,
            vec![
                ChunkRange::RowSpan { index: 0, rows: 10 },
                ChunkRange::RowSpan { index: 10, rows: 10 },
                ChunkRange::RowSpan { index: 20, rows: 5 },
            ]
        );
    }

    #[test]
    fn test_concurrent_callers_get_each_chunk_once() {
        let pool = Arc::new(VecChunkPool::row_spans(SourceType::ClickHouse, 1000, 1).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || std::iter::from_fn(|| pool.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for meta in handle.join().unwrap() {
                assert!(seen.insert(meta.default_filename()));
            }
        }
        assert_eq!(seen.len(), 1000);
    }
}
