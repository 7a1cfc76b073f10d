use flate2::read::GzDecoder;
use std::io::Read;
use tar::{Archive, Entry, EntryType};
use tracing::debug;

use crate::constants::archive::{MAX_PREALLOCATED_ENTRY_SIZE, META_FILENAME};
use crate::error::{Result, TransferError};
use crate::models::{Chunk, Meta, SourceType};

/// A decoded archive entry
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveRecord {
    /// The reserved metadata entry; `Err` carries the decode failure
    Meta(std::result::Result<Meta, String>),
    Chunk(Chunk),
}

/// Where an entry path points to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPath {
    Meta,
    Chunk { source: SourceType, filename: String },
}

/// Classify an entry path as the metadata entry or a `{source}/{filename}` chunk.
pub fn classify_entry_path(path: &str) -> Result<EntryPath> {
    if path == META_FILENAME {
        return Ok(EntryPath::Meta);
    }

    let Some((dir, filename)) = path.rsplit_once('/') else {
        return Err(TransferError::CorruptedArchive(format!(
            "entry outside of a source directory: {path}"
        )));
    };

    let source: SourceType = dir
        .parse()
        .map_err(|e: String| TransferError::CorruptedArchive(format!("found {e}")))?;

    if filename.is_empty() {
        return Err(TransferError::CorruptedArchive(format!(
            "entry without a filename: {path}"
        )));
    }

    Ok(EntryPath::Chunk {
        source,
        filename: filename.to_string(),
    })
}

/// Read archive entries sequentially in stream order, handing each decoded
/// record to `on_record`. Stops at the first error from either side.
pub fn read_records<R: Read>(
    reader: R,
    mut on_record: impl FnMut(ArchiveRecord) -> Result<()>,
) -> Result<()> {
    let mut archive = Archive::new(GzDecoder::new(reader));

    let entries = archive
        .entries()
        .map_err(|e| TransferError::ArchiveError(format!("failed to open archive: {e}")))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| {
            TransferError::ArchiveError(format!("failed to read file from archive: {e}"))
        })?;

        let path = entry
            .path()
            .map_err(|e| TransferError::CorruptedArchive(format!("invalid entry path: {e}")))?
            .to_string_lossy()
            .into_owned();

        if entry.header().entry_type() != EntryType::Regular {
            debug!(path = %path, "Skipping non-file archive entry");
            continue;
        }

        let record = match classify_entry_path(&path)? {
            EntryPath::Meta => {
                ArchiveRecord::Meta(serde_json::from_reader(&mut entry).map_err(|e| e.to_string()))
            }
            EntryPath::Chunk { source, filename } => {
                let content = read_entry_content(&mut entry, &path)?;
                ArchiveRecord::Chunk(Chunk::new(source, filename, content))
            }
        };

        on_record(record)?;
    }

    Ok(())
}

/// Read exactly the number of bytes the entry header declares.
///
/// The header size is untrusted, so it only caps the read and bounds the
/// initial buffer.
fn read_entry_content<R: Read>(entry: &mut Entry<'_, R>, path: &str) -> Result<Vec<u8>> {
    let declared = entry.size();
    let mut content = Vec::with_capacity(declared.min(MAX_PREALLOCATED_ENTRY_SIZE) as usize);

    entry
        .take(declared)
        .read_to_end(&mut content)
        .map_err(|e| TransferError::ArchiveError(format!("failed to read {path}: {e}")))?;

    if content.len() as u64 != declared {
        return Err(TransferError::CorruptedArchive(format!(
            "entry {path} declares {declared} bytes but holds {}",
            content.len()
        )));
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveWriter;

    #[test]
    fn test_classify_entry_paths() {
        assert_eq!(classify_entry_path("meta.json").unwrap(), EntryPath::Meta);
        assert_eq!(
            classify_entry_path("vm/10-20.bin").unwrap(),
            EntryPath::Chunk {
                source: SourceType::VictoriaMetrics,
                filename: "10-20.bin".to_string()
            }
        );

        for corrupted in ["pg/1.tsv", "loose.bin", "ch/", "vm/nested/1.bin"] {
            assert!(
                matches!(
                    classify_entry_path(corrupted),
                    Err(TransferError::CorruptedArchive(_))
                ),
                "{corrupted} should be corrupted"
            );
        }
    }

    #[test]
    fn test_read_records_in_stream_order() {
        let mut writer = ArchiveWriter::new(Vec::new());
        writer
            .append_chunk(&Chunk::new(SourceType::ClickHouse, "0-2.tsv", b"r1\nr2\n".to_vec()))
            .unwrap();
        writer
            .append_chunk(&Chunk::new(SourceType::VictoriaMetrics, "5-6.bin", vec![]))
            .unwrap();
        let meta = Meta::for_runtime(Some("2.41.0".to_string()));
        let bytes = writer.finish(&meta).unwrap();

        let mut records = Vec::new();
        read_records(bytes.as_slice(), |record| {
            records.push(record);
            Ok(())
        })
        .unwrap();

        assert_eq!(
            records,
            vec![
                ArchiveRecord::Chunk(Chunk::new(SourceType::ClickHouse, "0-2.tsv", b"r1\nr2\n".to_vec())),
                ArchiveRecord::Chunk(Chunk::new(SourceType::VictoriaMetrics, "5-6.bin", vec![])),
                ArchiveRecord::Meta(Ok(meta)),
            ]
        );
    }

    #[test]
    fn test_callback_error_stops_reading() {
        let mut writer = ArchiveWriter::new(Vec::new());
        for i in 0..3 {
            writer
                .append_chunk(&Chunk::new(SourceType::ClickHouse, format!("{i}.tsv"), vec![1]))
                .unwrap();
        }
        let bytes = writer.abort().unwrap();

        let mut calls = 0;
        let result = read_records(bytes.as_slice(), |_| {
            calls += 1;
            Err(TransferError::Cancelled)
        });

        assert_eq!(result, Err(TransferError::Cancelled));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_oversized_entry_header_is_corrupted() {
        let mut header = tar::Header::new_ustar();
        header.set_path("ch/0-1.tsv").unwrap();
        header.set_entry_type(EntryType::Regular);
        header.set_mode(0o600);
        header.set_size(1 << 40);
        header.set_cksum();

        let mut builder = tar::Builder::new(flate2::write::GzEncoder::new(
            Vec::new(),
            flate2::Compression::best(),
        ));
        builder.append(&header, &b"abc"[..]).unwrap();
        let bytes = builder.into_inner().unwrap().finish().unwrap();

        let mut calls = 0;
        let result = read_records(bytes.as_slice(), |_| {
            calls += 1;
            Ok(())
        });

        assert!(
            matches!(result, Err(TransferError::CorruptedArchive(_))),
            "got {result:?}"
        );
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_not_gzip_is_archive_error() {
        let result = read_records(&b"definitely not gzip"[..], |_| Ok(()));
        assert!(matches!(result, Err(TransferError::ArchiveError(_))));
    }
}
