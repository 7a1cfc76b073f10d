//! # Load Checker
//!
//! Polls the load check endpoint on a fixed interval and publishes a single
//! OK/WAIT/TERMINATE status that pipeline readers obey.
//!
//! The status starts as WAIT so nothing races ahead of the first measurement,
//! and a run of consecutive WAIT cycles longer than the configured bound is
//! escalated to TERMINATE so an export cannot stall forever under sustained load.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::config::LoadCheckerConfig;
use crate::constants::{LOAD_POLL_INTERVAL, MAX_WAIT_STATUS_IN_SEQUENCE};
use crate::error::{Result, TransferError};

use super::query_client::{MetricQuery, PromQueryClient};
use super::status::{LoadStatus, LoadStatusGetter};
use super::threshold::{parse_threshold_list, Threshold};

/// Timing and escalation settings for a [`LoadChecker`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadCheckerSettings {
    /// Interval between status checks
    pub poll_interval: Duration,
    /// Consecutive WAIT cycles tolerated before escalating to TERMINATE
    pub max_wait_cycles: u32,
}

impl LoadCheckerSettings {
    /// Reject settings the polling loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(TransferError::ConfigurationError(
                "load check poll interval must be greater than 0".to_string(),
            ));
        }
        if self.max_wait_cycles == 0 {
            return Err(TransferError::ConfigurationError(
                "max consecutive wait cycles must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LoadCheckerSettings {
    fn default() -> Self {
        Self {
            poll_interval: LOAD_POLL_INTERVAL,
            max_wait_cycles: MAX_WAIT_STATUS_IN_SEQUENCE,
        }
    }
}

/// Background load checker publishing the latest [`LoadStatus`]
pub struct LoadChecker {
    inner: Arc<LoadCheckerInner>,
    /// Stops the polling task when the checker is dropped
    _poller: Option<DropGuard>,
}

struct LoadCheckerInner {
    query: Arc<dyn MetricQuery>,
    thresholds: Vec<Threshold>,
    max_wait_cycles: u32,
    latest_status: RwLock<LoadStatus>,
    /// Only touched by the status update cycle
    wait_status_counter: AtomicU32,
    /// Serializes update cycles from the poller and `refresh`
    update_lock: tokio::sync::Mutex<()>,
}

impl LoadChecker {
    /// Create a load checker, run one status check, and start polling if there is
    /// anything to check.
    ///
    /// Polling stops when `cancel` is cancelled or the checker is dropped.
    pub async fn new(
        thresholds: Vec<Threshold>,
        query: Arc<dyn MetricQuery>,
        settings: LoadCheckerSettings,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        settings.validate()?;

        info!(
            thresholds = thresholds.len(),
            poll_interval_ms = settings.poll_interval.as_millis() as u64,
            max_wait_cycles = settings.max_wait_cycles,
            "🌡️ LOAD: Creating load checker"
        );

        let inner = Arc::new(LoadCheckerInner {
            query,
            thresholds,
            max_wait_cycles: settings.max_wait_cycles,
            latest_status: RwLock::new(LoadStatus::Wait),
            wait_status_counter: AtomicU32::new(0),
            update_lock: tokio::sync::Mutex::new(()),
        });

        inner.update_status().await;

        let poller = if inner.thresholds.is_empty() {
            debug!("No thresholds configured: load status updates disabled");
            None
        } else {
            let token = cancel.child_token();
            tokio::spawn(run_status_update(
                inner.clone(),
                settings.poll_interval,
                token.clone(),
            ));
            Some(token.drop_guard())
        };

        Ok(Self {
            inner,
            _poller: poller,
        })
    }

    /// Build a load checker from configuration, querying the configured endpoint over HTTP.
    pub async fn from_config(config: &LoadCheckerConfig, cancel: &CancellationToken) -> Result<Self> {
        let thresholds = parse_threshold_list(&config.max_load, &config.critical_load)?;

        let query: Arc<dyn MetricQuery> = if thresholds.is_empty() {
            Arc::new(NoopQuery)
        } else {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                TransferError::ConfigurationError(
                    "load thresholds are set but no load check endpoint is configured".to_string(),
                )
            })?;
            Arc::new(PromQueryClient::new(endpoint, config.request_timeout())?)
        };

        Self::new(thresholds, query, config.settings(), cancel).await
    }

    pub fn thresholds(&self) -> &[Threshold] {
        &self.inner.thresholds
    }

    /// Run a single evaluation cycle and publish its result.
    ///
    /// Waits for an in-flight poller cycle to finish first.
    pub async fn refresh(&self) -> LoadStatus {
        self.inner.update_status().await
    }

    /// Number of consecutive cycles that evaluated to WAIT
    pub fn consecutive_waits(&self) -> u32 {
        self.inner.wait_status_counter.load(Ordering::Acquire)
    }
}

impl LoadStatusGetter for LoadChecker {
    fn latest_status(&self) -> LoadStatus {
        *self.inner.latest_status.read()
    }
}

impl std::fmt::Debug for LoadChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadChecker")
            .field("thresholds", &self.inner.thresholds)
            .field("latest_status", &self.latest_status())
            .field("consecutive_waits", &self.consecutive_waits())
            .finish()
    }
}

async fn run_status_update(
    inner: Arc<LoadCheckerInner>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    debug!("Started load status update");

    let mut ticker = interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Cancelled: stopping load status update");
                return;
            }
            _ = ticker.tick() => {
                inner.update_status().await;
            }
        }
    }
}

impl LoadCheckerInner {
    async fn update_status(&self) -> LoadStatus {
        let _cycle = self.update_lock.lock().await;

        let mut status = match self.check_metrics_load().await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Error while checking metrics load");
                LoadStatus::Wait
            }
        };

        if status == LoadStatus::Wait {
            let waits = self.wait_status_counter.fetch_add(1, Ordering::AcqRel) + 1;
            if waits > self.max_wait_cycles {
                warn!(
                    consecutive_waits = waits,
                    max_wait_cycles = self.max_wait_cycles,
                    "🚨 LOAD: Too many {} in a sequence, escalating to {}",
                    LoadStatus::Wait,
                    LoadStatus::Terminate
                );
                status = LoadStatus::Terminate;
            }
        } else {
            self.wait_status_counter.store(0, Ordering::Release);
        }

        *self.latest_status.write() = status;
        debug!(status = %status, "Load status updated");

        status
    }

    async fn check_metrics_load(&self) -> Result<LoadStatus> {
        let mut load_status = LoadStatus::Ok;

        for threshold in &self.thresholds {
            let value = self
                .query
                .current_value(&threshold.query)
                .await
                .map_err(|e| {
                    TransferError::LoadCheckError(format!(
                        "failed to retrieve threshold value for {}: {e}",
                        threshold.key
                    ))
                })?;

            if value >= threshold.critical_load {
                debug!(
                    key = %threshold.key,
                    value = value,
                    critical_load = threshold.critical_load,
                    "Threshold exceeds critical load limit"
                );
                return Ok(LoadStatus::Terminate);
            }

            if value >= threshold.max_load {
                debug!(
                    key = %threshold.key,
                    value = value,
                    max_load = threshold.max_load,
                    "Threshold exceeds max load limit, continue checking"
                );
                load_status = LoadStatus::Wait;
            }
        }

        Ok(load_status)
    }
}

/// Stand-in query for checkers with nothing to check
struct NoopQuery;

#[async_trait::async_trait]
impl MetricQuery for NoopQuery {
    async fn current_value(&self, query: &str) -> Result<f64> {
        Err(TransferError::LoadCheckError(format!(
            "no load check endpoint configured for query {query}"
        )))
    }
}
