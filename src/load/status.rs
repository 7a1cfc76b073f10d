use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of current system load.
///
/// `None` is never published by the load checker; it only marks "no status".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadStatus {
    None,
    Ok,
    Wait,
    Terminate,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadStatus::None => "NONE",
            LoadStatus::Ok => "OK",
            LoadStatus::Wait => "WAIT",
            LoadStatus::Terminate => "TERMINATE",
        };
        f.write_str(name)
    }
}

/// Source of the latest load status consulted by pipeline readers.
///
/// Implementations must answer without blocking on I/O.
pub trait LoadStatusGetter: Send + Sync {
    fn latest_status(&self) -> LoadStatus;
}

/// A fixed status, for runs without load checking.
impl LoadStatusGetter for LoadStatus {
    fn latest_status(&self) -> LoadStatus {
        *self
    }
}
