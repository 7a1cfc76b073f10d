#![allow(clippy::doc_markdown)] // Allow technical terms like ClickHouse, VictoriaMetrics in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Metrics Transfer
//!
//! Export and import of monitoring data between metric backends and a portable
//! gzip-compressed tar archive.
//!
//! ## Overview
//!
//! Export runs a pool of reader workers that materialize chunks from backend
//! sources and hand them through a small bounded queue to a single archive
//! writer. Readers throttle themselves against a load checker that polls the
//! monitored server and publishes OK, WAIT or TERMINATE. Import reads the
//! archive back in stream order and hands each chunk to the matching source.
//!
//! ## Module Organization
//!
//! - [`transfer`] - Export and import pipelines, source and pool seams
//! - [`load`] - Thresholds, load status and the polling load checker
//! - [`archive`] - Archive framing, entry layout and target resolution
//! - [`models`] - Chunks, chunk descriptors and archive metadata
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use metrics_transfer::config::ConfigLoader;
//! use metrics_transfer::load::LoadChecker;
//! use metrics_transfer::models::Meta;
//! use metrics_transfer::transfer::{ChunkPool, ChunkSource, Transferer};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(
//! #     sources: Vec<Arc<dyn ChunkSource>>,
//! #     pool: Arc<dyn ChunkPool>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load(None)?;
//! let cancel = CancellationToken::new();
//!
//! let checker = LoadChecker::from_config(&config.load_checker, &cancel).await?;
//! let transferer = Transferer::new(sources, &config.pipeline)?;
//!
//! let summary = transferer
//!     .export(
//!         &cancel,
//!         Arc::new(checker),
//!         Meta::for_runtime(None),
//!         pool,
//!         config.archive.output(),
//!     )
//!     .await?;
//! println!("wrote {} chunks", summary.chunks_written);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod constants;
pub mod error;
pub mod load;
pub mod logging;
pub mod models;
pub mod transfer;

pub use archive::{ArchiveInput, ArchiveOutput};
pub use config::{ConfigLoader, TransferConfig};
pub use error::{Result, TransferError};
pub use load::{LoadChecker, LoadStatus, LoadStatusGetter, Threshold, ThresholdKey};
pub use models::{Chunk, ChunkMeta, ChunkRange, Meta, SourceType};
pub use transfer::{
    ChunkPool, ChunkSource, ExportSummary, ImportSummary, Transferer, VecChunkPool,
};
