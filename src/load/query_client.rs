//! # Metrics Query Client
//!
//! Samples load metrics through a Prometheus-compatible instant query endpoint.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::constants::query::{INSTANT_QUERY_PATH, SUCCESS_STATUS};
use crate::error::{Result, TransferError};

/// Fetches the current scalar value of a metric query
#[async_trait]
pub trait MetricQuery: Send + Sync {
    async fn current_value(&self, query: &str) -> Result<f64>;
}

/// HTTP client for `GET {endpoint}/api/v1/query?query=...`
#[derive(Debug, Clone)]
pub struct PromQueryClient {
    client: Client,
    endpoint: String,
}

impl PromQueryClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        if endpoint.is_empty() {
            return Err(TransferError::ConfigurationError(
                "load check endpoint must not be empty".to_string(),
            ));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            TransferError::ConfigurationError(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MetricQuery for PromQueryClient {
    async fn current_value(&self, query: &str) -> Result<f64> {
        let url = format!("{}{}", self.endpoint, INSTANT_QUERY_PATH);

        debug!(url = %url, query = %query, "Sending HTTP request to load checker endpoint");

        let response = self
            .client
            .get(&url)
            .query(&[("query", query)])
            .send()
            .await
            .map_err(|e| {
                TransferError::LoadCheckError(format!(
                    "failed to send request to load checker endpoint: {e}"
                ))
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            TransferError::LoadCheckError(format!("failed to read load checker response: {e}"))
        })?;

        if status != StatusCode::OK {
            return Err(TransferError::LoadCheckError(format!(
                "non-ok response: status {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&body)
            )));
        }

        let value = parse_metric_response(&body)?;
        debug!(value = value, "Got threshold value from load checker endpoint");
        Ok(value)
    }
}

#[derive(Debug, Deserialize)]
struct MetricResponse {
    status: String,
    #[serde(default)]
    data: MetricData,
}

#[derive(Debug, Default, Deserialize)]
struct MetricData {
    #[serde(default)]
    result: Vec<MetricResult>,
}

#[derive(Debug, Deserialize)]
struct MetricResult {
    #[serde(default)]
    metric: MetricLabels,
    #[serde(default)]
    value: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct MetricLabels {
    instance: Option<String>,
}

/// Extract the scalar value from an instant query response body.
///
/// Requires `status == "success"`, exactly one result, and a `[timestamp, "value"]`
/// pair whose second element is a numeric string.
pub fn parse_metric_response(body: &[u8]) -> Result<f64> {
    let response: MetricResponse = serde_json::from_slice(body).map_err(|e| {
        TransferError::LoadCheckError(format!("error parsing threshold response: {e}"))
    })?;

    if response.status != SUCCESS_STATUS {
        return Err(TransferError::LoadCheckError(format!(
            "status is not success: {}",
            response.status
        )));
    }

    let [result] = response.data.result.as_slice() else {
        return Err(TransferError::LoadCheckError(format!(
            "expected exactly one result, got {}",
            response.data.result.len()
        )));
    };

    let [_, value] = result.value.as_slice() else {
        return Err(TransferError::LoadCheckError(format!(
            "unexpected number of values: {}",
            result.value.len()
        )));
    };

    let raw = value
        .as_str()
        .ok_or_else(|| TransferError::LoadCheckError("value is not string".to_string()))?;

    let parsed = raw.parse::<f64>().map_err(|e| {
        TransferError::LoadCheckError(format!("parsing value '{raw}' error: {e}"))
    })?;

    if let Some(instance) = &result.metric.instance {
        debug!(instance = %instance, value = parsed, "Parsed metric value");
    }

    Ok(parsed)
}
