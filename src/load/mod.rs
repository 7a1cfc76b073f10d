//! # Load-Based Backpressure
//!
//! Classifies the load of the monitored server into OK/WAIT/TERMINATE so export
//! readers can throttle themselves.
//!
//! ## Key Components
//!
//! - [`threshold`] - Threshold keys, queries and list parsing
//! - [`checker`] - The polling [`LoadChecker`] and its escalation rule
//! - [`query_client`] - Instant query HTTP client
//! - [`status`] - [`LoadStatus`] and the reader-facing [`LoadStatusGetter`]

pub mod checker;
pub mod query_client;
pub mod status;
pub mod threshold;

pub use checker::{LoadChecker, LoadCheckerSettings};
pub use query_client::{parse_metric_response, MetricQuery, PromQueryClient};
pub use status::{LoadStatus, LoadStatusGetter};
pub use threshold::{parse_threshold_list, Threshold, ThresholdError, ThresholdKey};
