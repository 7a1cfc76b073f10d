use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrics_transfer::error::{Result, TransferError};
use metrics_transfer::models::{Chunk, ChunkMeta, ChunkRange, SourceType};
use metrics_transfer::transfer::ChunkSource;

/// Deterministic chunk content; sizes differ per descriptor
pub fn chunk_content(meta: &ChunkMeta) -> Vec<u8> {
    match meta.range {
        ChunkRange::RowSpan { index, rows } => format!("{index}\t{rows}\n")
            .repeat(rows as usize)
            .into_bytes(),
        ChunkRange::TimeWindow { start, end } => {
            let samples = (end - start).num_minutes().max(1) as usize;
            format!("{}:{}|", meta.source, start.timestamp())
                .repeat(samples)
                .into_bytes()
        }
    }
}

/// Two row spans for ClickHouse and three time windows for VictoriaMetrics
pub fn mixed_chunk_metas() -> Vec<ChunkMeta> {
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    vec![
        ChunkMeta::row_span(SourceType::ClickHouse, 0, 4),
        ChunkMeta::row_span(SourceType::ClickHouse, 4, 9),
        ChunkMeta::time_window(
            SourceType::VictoriaMetrics,
            base,
            base + chrono::Duration::minutes(5),
        ),
        ChunkMeta::time_window(
            SourceType::VictoriaMetrics,
            base + chrono::Duration::minutes(5),
            base + chrono::Duration::minutes(30),
        ),
        ChunkMeta::time_window(
            SourceType::VictoriaMetrics,
            base + chrono::Duration::minutes(30),
            base + chrono::Duration::minutes(31),
        ),
    ]
}

/// In-memory source that serves deterministic chunks and records writes
#[derive(Debug)]
pub struct RecordingSource {
    source_type: SourceType,
    read_delay: Option<Duration>,
    fail_read: Option<String>,
    panic_read: Option<String>,
    fail_write: bool,
    fail_finalize: bool,
    reads: AtomicUsize,
    writes: Mutex<Vec<(String, Vec<u8>)>>,
    finalize_calls: AtomicUsize,
}

impl RecordingSource {
    pub fn new(source_type: SourceType) -> Self {
        Self {
            source_type,
            read_delay: None,
            fail_read: None,
            panic_read: None,
            fail_write: false,
            fail_finalize: false,
            reads: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
            finalize_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Fail reading the chunk whose default filename matches
    pub fn failing_read(mut self, filename: impl Into<String>) -> Self {
        self.fail_read = Some(filename.into());
        self
    }

    /// Panic while reading the chunk whose default filename matches
    pub fn panicking_read(mut self, filename: impl Into<String>) -> Self {
        self.panic_read = Some(filename.into());
        self
    }

    pub fn failing_write(mut self) -> Self {
        self.fail_write = true;
        self
    }

    pub fn failing_finalize(mut self) -> Self {
        self.fail_finalize = true;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<(String, Vec<u8>)> {
        self.writes.lock().clone()
    }

    pub fn finalize_calls(&self) -> usize {
        self.finalize_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChunkSource for RecordingSource {
    fn source_type(&self) -> SourceType {
        self.source_type
    }

    async fn read_chunk(&self, meta: &ChunkMeta) -> Result<Chunk> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        self.reads.fetch_add(1, Ordering::SeqCst);

        let filename = meta.default_filename();
        if self.panic_read.as_deref() == Some(filename.as_str()) {
            panic!("reader crashed on {filename}");
        }
        if self.fail_read.as_deref() == Some(filename.as_str()) {
            return Err(TransferError::SourceError(format!(
                "failed to read {filename}"
            )));
        }

        Ok(Chunk::new(self.source_type, filename, chunk_content(meta)))
    }

    async fn write_chunk(&self, filename: &str, content: &[u8]) -> Result<()> {
        if self.fail_write {
            return Err(TransferError::SourceError(format!(
                "failed to write {filename}"
            )));
        }
        self.writes
            .lock()
            .push((filename.to_string(), content.to_vec()));
        Ok(())
    }

    async fn finalize_writes(&self) -> Result<()> {
        self.finalize_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_finalize {
            return Err(TransferError::SourceError("failed to flush".to_string()));
        }
        Ok(())
    }
}

/// Cloneable in-memory sink usable as a piped archive target
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// All `(path, content)` entries of an archive, in stream order
pub fn archive_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    use std::io::Read;

    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(bytes));
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            (path, content)
        })
        .collect()
}
