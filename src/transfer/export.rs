//! Export pipeline: N reader workers feeding one archive writer.
//!
//! The first worker failure cancels a run-scoped child token so that the rest
//! of the pipeline unwinds instead of blocking on the queue.

use chrono::Utc;
use parking_lot::Mutex;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{find_source, ChunkPool, ChunkSource, Transferer};
use crate::archive::{ArchiveOutput, ArchiveWriter};
use crate::constants::MAX_CHUNKS_IN_MEMORY;
use crate::error::{Result, TransferError};
use crate::load::{LoadStatus, LoadStatusGetter};
use crate::logging::{log_chunk_operation, log_error};
use crate::models::{Chunk, Meta};

/// Outcome of a successful export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Archive file written, `None` when streamed to a caller-supplied writer
    pub archive_path: Option<PathBuf>,
    pub chunks_written: usize,
    pub max_chunk_size: u64,
}

/// Holds the first root-cause failure of a run and cancels the run on any failure.
#[derive(Debug)]
struct FailureSlot {
    first: Mutex<Option<TransferError>>,
    cancel: CancellationToken,
}

impl FailureSlot {
    fn new(cancel: CancellationToken) -> Self {
        Self {
            first: Mutex::new(None),
            cancel,
        }
    }

    fn record(&self, error: &TransferError) {
        if !error.is_cancelled() {
            let mut first = self.first.lock();
            if first.is_none() {
                *first = Some(error.clone());
            }
        }
        self.cancel.cancel();
    }

    fn take(&self) -> Option<TransferError> {
        self.first.lock().take()
    }
}

/// State shared by all reader workers of one run
struct ReaderContext {
    run_id: Uuid,
    sources: Vec<Arc<dyn ChunkSource>>,
    status: Arc<dyn LoadStatusGetter>,
    pool: Arc<dyn ChunkPool>,
    wait_interval: Duration,
    cancel: CancellationToken,
}

impl Transferer {
    /// Export every chunk the pool yields into a single archive.
    ///
    /// Succeeds only if every reader and the writer succeed. On failure the
    /// archive framing is still closed, without the metadata entry.
    pub async fn export(
        &self,
        cancel: &CancellationToken,
        status: Arc<dyn LoadStatusGetter>,
        meta: Meta,
        pool: Arc<dyn ChunkPool>,
        output: ArchiveOutput,
    ) -> Result<ExportSummary> {
        let run_id = Uuid::new_v4();
        let (stream, archive_path) = output.open(Utc::now())?;

        info!(
            run_id = %run_id,
            read_workers = self.read_workers,
            archive = ?archive_path,
            "🚀 EXPORT: Starting export"
        );

        let run_cancel = cancel.child_token();
        let failures = Arc::new(FailureSlot::new(run_cancel.clone()));
        let (queue_tx, queue_rx) = mpsc::channel::<Chunk>(MAX_CHUNKS_IN_MEMORY);

        let writer = {
            let cancel = run_cancel.clone();
            let failures = failures.clone();
            tokio::task::spawn_blocking(move || {
                let result = write_archive(run_id, stream, queue_rx, meta, &cancel);
                if let Err(e) = &result {
                    failures.record(e);
                }
                result
            })
        };

        let context = Arc::new(ReaderContext {
            run_id,
            sources: self.sources.clone(),
            status,
            pool,
            wait_interval: self.wait_interval,
            cancel: run_cancel.clone(),
        });

        let mut readers = JoinSet::new();
        for worker in 0..self.read_workers {
            readers.spawn(read_chunks(context.clone(), worker, queue_tx.clone()));
        }

        // Owns the queue sender until every reader is done, then closes the queue.
        let supervisor = {
            let failures = failures.clone();
            tokio::spawn(async move {
                let mut results = Vec::new();
                while let Some(joined) = readers.join_next().await {
                    let result = joined.map_err(TransferError::from).and_then(|r| r);
                    if let Err(e) = &result {
                        failures.record(e);
                    }
                    results.push(result);
                }
                drop(queue_tx);
                results
            })
        };

        let reader_results = supervisor.await?;
        let writer_result = writer.await.map_err(TransferError::from).and_then(|r| r);

        if let Some(e) = failures.take() {
            log_error("export", "run", &e.to_string(), Some(&run_id.to_string()));
            return Err(e);
        }
        for result in reader_results {
            result?;
        }
        let (chunks_written, max_chunk_size) = writer_result?;

        info!(
            run_id = %run_id,
            chunks_written = chunks_written,
            max_chunk_size = max_chunk_size,
            "✅ EXPORT: Export completed"
        );

        Ok(ExportSummary {
            archive_path,
            chunks_written,
            max_chunk_size,
        })
    }
}

async fn read_chunks(
    context: Arc<ReaderContext>,
    worker: usize,
    queue: mpsc::Sender<Chunk>,
) -> Result<()> {
    let run_id = context.run_id;
    loop {
        if context.cancel.is_cancelled() {
            debug!(run_id = %run_id, worker = worker, "Cancelled, stopping chunks reading");
            return Err(TransferError::Cancelled);
        }

        match context.status.latest_status() {
            LoadStatus::Ok => {}
            LoadStatus::Wait => {
                debug!(
                    run_id = %run_id,
                    worker = worker,
                    wait_ms = context.wait_interval.as_millis() as u64,
                    "⏳ EXPORT: Got wait load status, putting chunks reading to sleep"
                );
                tokio::select! {
                    biased;
                    _ = context.cancel.cancelled() => return Err(TransferError::Cancelled),
                    _ = tokio::time::sleep(context.wait_interval) => continue,
                }
            }
            LoadStatus::Terminate => {
                warn!(run_id = %run_id, worker = worker, "🛑 EXPORT: Got terminate load status, stopping chunks reading");
                return Err(TransferError::Terminated(format!(
                    "reader worker {worker} stopped"
                )));
            }
            other => return Err(TransferError::UnknownLoadStatus(other)),
        }

        let Some(chunk_meta) = context.pool.next() else {
            debug!(run_id = %run_id, worker = worker, "Pool is empty, stopping chunks reading");
            return Ok(());
        };

        let source = find_source(&context.sources, chunk_meta.source)
            .ok_or(TransferError::MissingSource(chunk_meta.source))?;

        let chunk = tokio::select! {
            biased;
            _ = context.cancel.cancelled() => return Err(TransferError::Cancelled),
            chunk = source.read_chunk(&chunk_meta) => chunk?,
        };

        log_chunk_operation("read", chunk.source, &chunk.filename, chunk.size(), "ok");

        tokio::select! {
            biased;
            _ = context.cancel.cancelled() => return Err(TransferError::Cancelled),
            sent = queue.send(chunk) => sent.map_err(|_| TransferError::Cancelled)?,
        }
    }
}

/// Drain the queue into the archive until every reader is done.
fn write_archive(
    run_id: Uuid,
    stream: Box<dyn Write + Send>,
    mut queue: mpsc::Receiver<Chunk>,
    mut meta: Meta,
    cancel: &CancellationToken,
) -> Result<(usize, u64)> {
    let mut writer = ArchiveWriter::new(stream);

    while let Some(chunk) = queue.blocking_recv() {
        if cancel.is_cancelled() {
            break;
        }

        if let Err(e) = writer.append_chunk(&chunk) {
            close_incomplete(run_id, writer);
            return Err(e);
        }
        meta.observe_chunk_size(chunk.size());
        log_chunk_operation("write", chunk.source, &chunk.filename, chunk.size(), "ok");
    }

    if cancel.is_cancelled() {
        debug!(run_id = %run_id, "Cancelled, stopping chunks writing");
        close_incomplete(run_id, writer);
        return Err(TransferError::Cancelled);
    }

    let chunks_written = writer.chunks_written();
    writer.finish(&meta)?;
    debug!(run_id = %run_id, chunks_written = chunks_written, "Chunks queue is closed, archive finished");

    Ok((chunks_written, meta.max_chunk_size))
}

fn close_incomplete<W: Write>(run_id: Uuid, writer: ArchiveWriter<W>) {
    let chunks_written = writer.chunks_written();
    match writer.abort() {
        Ok(_) => warn!(
            run_id = %run_id,
            chunks_written = chunks_written,
            "⚠️ EXPORT: Archive closed without metadata"
        ),
        Err(e) => error!(run_id = %run_id, error = %e, "❌ EXPORT: Failed to close archive"),
    }
}
