//! # Transfer Pipeline
//!
//! Moves chunks between backend sources and a portable archive.
//!
//! ## Export
//!
//! ```text
//! ChunkPool ──▶ reader worker ×N ──▶ bounded queue (4) ──▶ archive writer ×1 ──▶ tar.gz
//!                   │
//!                   └── obeys LoadStatusGetter (OK / WAIT / TERMINATE)
//! ```
//!
//! ## Import
//!
//! ```text
//! tar.gz ──▶ sequential entries ──▶ {source}/{filename} ──▶ ChunkSource::write_chunk
//! ```
//!
//! ## Key Components
//!
//! - [`Transferer`] - Owns the configured sources and runs both pipelines
//! - [`ChunkSource`] - Backend adapter seam
//! - [`pool`] - Work item pool seam and a FIFO implementation

pub mod export;
pub mod import;
pub mod pool;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{Result, TransferError};
use crate::models::{Chunk, ChunkMeta, SourceType};

pub use export::ExportSummary;
pub use import::ImportSummary;
pub use pool::{ChunkPool, VecChunkPool};

/// Adapter between one backend store and archive chunks.
///
/// Export calls `read_chunk` from many reader workers concurrently; import calls
/// `write_chunk` sequentially, then `finalize_writes` once.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// Backend this adapter serves
    fn source_type(&self) -> SourceType;

    /// Materialize the chunk a descriptor identifies
    async fn read_chunk(&self, meta: &ChunkMeta) -> Result<Chunk>;

    /// Restore one archived chunk
    async fn write_chunk(&self, filename: &str, content: &[u8]) -> Result<()>;

    /// Flush anything buffered by `write_chunk`
    async fn finalize_writes(&self) -> Result<()>;
}

/// Runs export and import pipelines over a fixed set of sources
#[derive(Clone)]
pub struct Transferer {
    sources: Vec<Arc<dyn ChunkSource>>,
    read_workers: usize,
    wait_interval: Duration,
}

impl Transferer {
    pub fn new(sources: Vec<Arc<dyn ChunkSource>>, config: &PipelineConfig) -> Result<Self> {
        if sources.is_empty() {
            return Err(TransferError::ConfigurationError(
                "failed to create transferer with no sources".to_string(),
            ));
        }

        let read_workers = config.effective_workers();
        if config.wait_interval_ms == 0 {
            return Err(TransferError::ConfigurationError(
                "pipeline.wait_interval_ms must be greater than 0".to_string(),
            ));
        }

        info!(
            sources = ?sources.iter().map(|s| s.source_type()).collect::<Vec<_>>(),
            read_workers = read_workers,
            "🏗️ TRANSFER: Created transferer"
        );

        Ok(Self {
            sources,
            read_workers,
            wait_interval: config.wait_interval(),
        })
    }

    pub fn read_workers(&self) -> usize {
        self.read_workers
    }

    pub fn source_types(&self) -> Vec<SourceType> {
        self.sources.iter().map(|s| s.source_type()).collect()
    }

    fn source_by_type(&self, source_type: SourceType) -> Option<Arc<dyn ChunkSource>> {
        find_source(&self.sources, source_type)
    }
}

impl std::fmt::Debug for Transferer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transferer")
            .field("sources", &self.source_types())
            .field("read_workers", &self.read_workers)
            .field("wait_interval", &self.wait_interval)
            .finish()
    }
}

fn find_source(
    sources: &[Arc<dyn ChunkSource>],
    source_type: SourceType,
) -> Option<Arc<dyn ChunkSource>> {
    sources
        .iter()
        .find(|s| s.source_type() == source_type)
        .cloned()
}
