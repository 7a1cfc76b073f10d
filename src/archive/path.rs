use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{is_separator, Path, PathBuf};

use crate::constants::archive::{AUTO_FILENAME_EXTENSION, AUTO_FILENAME_PREFIX};
use crate::error::{Result, TransferError};

/// Archive name used when no explicit file name is given
pub fn auto_archive_filename(ts: DateTime<Utc>) -> String {
    format!(
        "{AUTO_FILENAME_PREFIX}-{}.{AUTO_FILENAME_EXTENSION}",
        ts.timestamp()
    )
}

/// Resolve where an export archive goes.
///
/// - no custom path: auto-named file in the working directory
/// - existing directory, or a path ending in a separator: auto-named file inside it
/// - anything else: the custom path as given
pub fn resolve_archive_path(custom: Option<&Path>, ts: DateTime<Utc>) -> Result<PathBuf> {
    let auto = auto_archive_filename(ts);

    let Some(custom) = custom.filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(PathBuf::from(auto));
    };

    match fs::metadata(custom) {
        Ok(info) if info.is_dir() => return Ok(custom.join(auto)),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(TransferError::ArchiveError(format!(
                "failed to get custom path info: {e}"
            )))
        }
    }

    if custom.to_string_lossy().ends_with(is_separator) {
        return Ok(custom.join(auto));
    }

    Ok(custom.to_path_buf())
}

/// Create the archive file, including any missing parent directories
pub fn create_archive_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            TransferError::ArchiveError(format!(
                "failed to create folders for {}: {e}",
                path.display()
            ))
        })?;
    }

    File::create(path).map_err(|e| {
        TransferError::ArchiveError(format!("failed to create {}: {e}", path.display()))
    })
}
