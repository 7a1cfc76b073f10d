//! Import pipeline: sequential archive entries dispatched to sources.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::Transferer;
use crate::archive::{read_records, ArchiveInput, ArchiveRecord};
use crate::error::{Result, TransferError};
use crate::logging::{log_chunk_operation, log_error};
use crate::models::Meta;

/// Outcome of a successful import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub chunks_imported: usize,
    /// Chunks whose source is not configured for this run
    pub chunks_skipped: usize,
    pub meta_found: bool,
}

impl Transferer {
    /// Import every chunk of an archive into the matching configured source.
    ///
    /// Entries for sources that are not configured are skipped. All configured
    /// sources are finalized once the archive is exhausted.
    pub async fn import(
        &self,
        cancel: &CancellationToken,
        input: ArchiveInput,
        runtime_meta: &Meta,
    ) -> Result<ImportSummary> {
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, input = ?input, "🚀 IMPORT: Starting import");

        let result = self.run_import(run_id, cancel, input, runtime_meta).await;
        if let Err(e) = &result {
            log_error("import", "run", &e.to_string(), Some(&run_id.to_string()));
        }
        result
    }

    async fn run_import(
        &self,
        run_id: Uuid,
        cancel: &CancellationToken,
        input: ArchiveInput,
        runtime_meta: &Meta,
    ) -> Result<ImportSummary> {
        let stream = input.open()?;

        // Entries must be consumed in stream order, one at a time.
        let (record_tx, mut record_rx) = mpsc::channel::<ArchiveRecord>(1);
        let reader = {
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                read_records(stream, |record| {
                    if cancel.is_cancelled() {
                        return Err(TransferError::Cancelled);
                    }
                    record_tx
                        .blocking_send(record)
                        .map_err(|_| TransferError::Cancelled)
                })
            })
        };

        let mut summary = ImportSummary::default();
        let dispatched = self
            .dispatch_records(run_id, cancel, &mut record_rx, runtime_meta, &mut summary)
            .await;
        drop(record_rx);
        let read = reader.await.map_err(TransferError::from).and_then(|r| r);

        dispatched?;
        read?;

        if !summary.meta_found {
            warn!(
                run_id = %run_id,
                "⚠️ IMPORT: No metadata found in archive, skipping version check"
            );
        }

        for source in &self.sources {
            source.finalize_writes().await?;
            debug!(run_id = %run_id, source = %source.source_type(), "Finalized writes");
        }

        info!(
            run_id = %run_id,
            chunks_imported = summary.chunks_imported,
            chunks_skipped = summary.chunks_skipped,
            "✅ IMPORT: Import completed"
        );

        Ok(summary)
    }

    async fn dispatch_records(
        &self,
        run_id: Uuid,
        cancel: &CancellationToken,
        records: &mut mpsc::Receiver<ArchiveRecord>,
        runtime_meta: &Meta,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        loop {
            let record = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransferError::Cancelled),
                record = records.recv() => record,
            };

            let Some(record) = record else {
                return Ok(());
            };

            match record {
                ArchiveRecord::Meta(Ok(meta)) => {
                    summary.meta_found = true;
                    if meta.check_compatibility(runtime_meta) {
                        debug!(run_id = %run_id, version = %meta.version, "Archive metadata is compatible");
                    }
                }
                ArchiveRecord::Meta(Err(e)) => {
                    summary.meta_found = true;
                    warn!(run_id = %run_id, error = %e, "⚠️ IMPORT: Failed to parse archive metadata");
                }
                ArchiveRecord::Chunk(chunk) => {
                    let Some(source) = self.source_by_type(chunk.source) else {
                        warn!(
                            run_id = %run_id,
                            source = %chunk.source,
                            filename = %chunk.filename,
                            "⚠️ IMPORT: Source is not configured, skipping chunk"
                        );
                        summary.chunks_skipped += 1;
                        continue;
                    };

                    source.write_chunk(&chunk.filename, &chunk.content).await?;
                    log_chunk_operation("import", chunk.source, &chunk.filename, chunk.size(), "ok");
                    summary.chunks_imported += 1;
                }
            }
        }
    }
}
