//! # Archive Codec
//!
//! Gzip-compressed tar framing for exported chunks. Each chunk is a regular
//! file at `{source}/{filename}` with mode 0600; a single `meta.json` entry
//! holding [`Meta`](crate::models::Meta) is written after all chunks.

pub mod path;
pub mod reader;
pub mod writer;

use chrono::{DateTime, Utc};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::PathBuf;

use crate::error::{Result, TransferError};

pub use path::{auto_archive_filename, create_archive_file, resolve_archive_path};
pub use reader::{classify_entry_path, read_records, ArchiveRecord, EntryPath};
pub use writer::ArchiveWriter;

/// Destination of an export archive
pub enum ArchiveOutput {
    /// File at a resolved path; see [`resolve_archive_path`]
    File(Option<PathBuf>),
    /// Caller-supplied stream, e.g. stdout
    Writer(Box<dyn Write + Send>),
}

impl ArchiveOutput {
    pub fn stdout() -> Self {
        ArchiveOutput::Writer(Box::new(std::io::stdout()))
    }

    /// Open the destination, returning the stream and the file path if any.
    pub fn open(self, now: DateTime<Utc>) -> Result<(Box<dyn Write + Send>, Option<PathBuf>)> {
        match self {
            ArchiveOutput::File(custom) => {
                let path = resolve_archive_path(custom.as_deref(), now)?;
                let file = create_archive_file(&path)?;
                Ok((Box::new(BufWriter::new(file)), Some(path)))
            }
            ArchiveOutput::Writer(writer) => Ok((writer, None)),
        }
    }
}

impl fmt::Debug for ArchiveOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveOutput::File(path) => f.debug_tuple("File").field(path).finish(),
            ArchiveOutput::Writer(_) => f.write_str("Writer"),
        }
    }
}

/// Origin of an archive to import
pub enum ArchiveInput {
    File(PathBuf),
    /// Caller-supplied stream, e.g. stdin
    Reader(Box<dyn Read + Send>),
}

impl ArchiveInput {
    pub fn stdin() -> Self {
        ArchiveInput::Reader(Box::new(std::io::stdin()))
    }

    pub fn open(self) -> Result<Box<dyn Read + Send>> {
        match self {
            ArchiveInput::File(path) => {
                let file = File::open(&path).map_err(|e| {
                    TransferError::ArchiveError(format!(
                        "failed to open {}: {e}",
                        path.display()
                    ))
                })?;
                Ok(Box::new(file))
            }
            ArchiveInput::Reader(reader) => Ok(reader),
        }
    }
}

impl fmt::Debug for ArchiveInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveInput::File(path) => f.debug_tuple("File").field(path).finish(),
            ArchiveInput::Reader(_) => f.write_str("Reader"),
        }
    }
}
