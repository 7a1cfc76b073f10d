//! # System Constants
//!
//! Fixed operational boundaries of the transfer pipeline and the archive format.

use std::time::Duration;

/// Capacity of the queue between reader workers and the archive writer.
///
/// Kept small so in-memory chunk buffering stays bounded regardless of how many
/// reader workers are running.
pub const MAX_CHUNKS_IN_MEMORY: usize = 4;

/// Interval between load status checks, and the time a reader sleeps on WAIT.
pub const LOAD_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Consecutive WAIT cycles tolerated before the load checker escalates to TERMINATE.
pub const MAX_WAIT_STATUS_IN_SEQUENCE: u32 = 10;

/// Default timeout for a single request to the load check endpoint.
pub const DEFAULT_LOAD_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Archive layout constants
pub mod archive {
    /// Reserved entry name holding the serialized archive metadata.
    pub const META_FILENAME: &str = "meta.json";

    /// Prefix of automatically generated archive file names.
    pub const AUTO_FILENAME_PREFIX: &str = "metrics-dump";

    /// Extension of automatically generated archive file names.
    pub const AUTO_FILENAME_EXTENSION: &str = "tar.gz";

    /// Permission bits recorded on every chunk entry.
    pub const CHUNK_ENTRY_MODE: u32 = 0o600;

    /// Upper bound on the buffer reserved up front for one entry (1 MiB).
    pub const MAX_PREALLOCATED_ENTRY_SIZE: u64 = 1 << 20;
}

/// Metrics query protocol constants
pub mod query {
    /// Path of the instant query API, relative to the endpoint.
    pub const INSTANT_QUERY_PATH: &str = "/api/v1/query";

    /// Expected `status` field of a successful query response.
    pub const SUCCESS_STATUS: &str = "success";
}
