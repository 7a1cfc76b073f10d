use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use tar::{Builder, EntryType, Header};

use crate::constants::archive::{CHUNK_ENTRY_MODE, META_FILENAME};
use crate::error::Result;
use crate::models::{Chunk, Meta};

/// Streaming gzip-compressed tar writer for chunk archives.
///
/// Chunks are appended under `{source}/{filename}`; the metadata entry is
/// appended by [`ArchiveWriter::finish`] and is always the last entry.
pub struct ArchiveWriter<W: Write> {
    builder: Builder<GzEncoder<W>>,
    chunks_written: usize,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            builder: Builder::new(GzEncoder::new(inner, Compression::best())),
            chunks_written: 0,
        }
    }

    pub fn chunks_written(&self) -> usize {
        self.chunks_written
    }

    pub fn append_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        self.append_entry(&chunk.archive_path(), &chunk.content)?;
        self.chunks_written += 1;
        Ok(())
    }

    /// Append the metadata entry and close the tar and gzip framing.
    pub fn finish(mut self, meta: &Meta) -> Result<W> {
        let content = serde_json::to_vec(meta)?;
        self.append_entry(META_FILENAME, &content)?;
        self.close()
    }

    /// Close the framing without a metadata entry, leaving a readable but
    /// incomplete archive.
    pub fn abort(self) -> Result<W> {
        self.close()
    }

    fn append_entry(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let mut header = Header::new_ustar();
        header.set_entry_type(EntryType::Regular);
        header.set_size(content.len() as u64);
        header.set_mode(CHUNK_ENTRY_MODE);
        header.set_mtime(Utc::now().timestamp().max(0) as u64);

        self.builder.append_data(&mut header, path, content)?;
        Ok(())
    }

    fn close(self) -> Result<W> {
        let encoder = self.builder.into_inner()?;
        let mut inner = encoder.finish()?;
        inner.flush()?;
        Ok(inner)
    }
}
