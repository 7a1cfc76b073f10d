use serde::{Deserialize, Serialize};
use tracing::warn;

/// Archive-level metadata, written once as the last archive entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Meta {
    /// Version of the tool that produced the archive
    pub version: String,
    /// Version of the monitoring server the data was exported from, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
    /// Largest chunk content size in the archive, in bytes
    #[serde(default)]
    pub max_chunk_size: u64,
}

impl Meta {
    /// Metadata describing the running tool.
    pub fn for_runtime(server_version: Option<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            server_version,
            max_chunk_size: 0,
        }
    }

    /// Track a written chunk's size, keeping the running maximum.
    pub fn observe_chunk_size(&mut self, size: u64) {
        if size > self.max_chunk_size {
            self.max_chunk_size = size;
        }
    }

    /// Compare archive metadata against the runtime's own, logging mismatches.
    ///
    /// Returns `true` when the archive is considered compatible. Mismatches are
    /// never fatal.
    pub fn check_compatibility(&self, runtime: &Meta) -> bool {
        let mut compatible = true;

        if self.version != runtime.version {
            warn!(
                archive_version = %self.version,
                runtime_version = %runtime.version,
                "⚠️ META: Archive was produced by a different tool version"
            );
            compatible = false;
        }

        if let (Some(archive), Some(current)) = (&self.server_version, &runtime.server_version) {
            if archive != current {
                warn!(
                    archive_server_version = %archive,
                    runtime_server_version = %current,
                    "⚠️ META: Archive was exported from a different server version"
                );
                compatible = false;
            }
        }

        compatible
    }
}
