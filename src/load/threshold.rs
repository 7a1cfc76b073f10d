//! # Load Thresholds
//!
//! Named load metrics with a soft (max) and a hard (critical) trip point, parsed
//! from two independent `KEY=VALUE` / `KEY:VALUE` lists.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TransferError};

/// Metric a threshold is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThresholdKey {
    Cpu,
    Ram,
}

impl ThresholdKey {
    /// All keys in evaluation order
    pub const ALL: [ThresholdKey; 2] = [ThresholdKey::Cpu, ThresholdKey::Ram];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdKey::Cpu => "CPU",
            ThresholdKey::Ram => "RAM",
        }
    }

    /// Instant query sampling this metric, as a percentage of capacity.
    pub fn query(&self) -> &'static str {
        match self {
            ThresholdKey::Cpu => {
                r#"100 - (avg by (instance) (rate(node_cpu_seconds_total{mode="idle",node_name="pmm-server"}[5s])) * 100)"#
            }
            ThresholdKey::Ram => {
                r#"100 * (1 - ((avg_over_time(node_memory_MemFree_bytes{node_name="pmm-server"}[5s]) + avg_over_time(node_memory_Cached_bytes{node_name="pmm-server"}[5s]) + avg_over_time(node_memory_Buffers_bytes{node_name="pmm-server"}[5s])) / avg_over_time(node_memory_MemTotal_bytes{node_name="pmm-server"}[5s])))"#
            }
        }
    }
}

impl fmt::Display for ThresholdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThresholdKey {
    type Err = ThresholdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ThresholdKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ThresholdError::UndefinedKey(s.to_string()))
    }
}

/// A load metric with its trip points.
///
/// A bound that was not specified is zero, which trips on any reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub key: ThresholdKey,
    pub query: String,
    pub max_load: f64,
    pub critical_load: f64,
}

/// Errors parsing a single threshold list
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThresholdError {
    #[error("invalid syntax '{0}': must be K=V or K:V")]
    InvalidSyntax(String),

    #[error("undefined key: {0}")]
    UndefinedKey(String),

    #[error("can't parse number '{value}' for {key}: {reason}")]
    InvalidNumber {
        key: ThresholdKey,
        value: String,
        reason: String,
    },
}

/// Parse the max and critical lists into thresholds, ordered by [`ThresholdKey::ALL`].
///
/// Keys absent from both lists produce no threshold.
pub fn parse_threshold_list(max: &str, critical: &str) -> Result<Vec<Threshold>> {
    let max_values = parse_threshold_values(max).map_err(|e| {
        TransferError::ConfigurationError(format!("invalid max load list: {e}"))
    })?;
    let critical_values = parse_threshold_values(critical).map_err(|e| {
        TransferError::ConfigurationError(format!("invalid critical load list: {e}"))
    })?;

    let thresholds = ThresholdKey::ALL
        .into_iter()
        .filter_map(|key| {
            let max_load = max_values.get(&key);
            let critical_load = critical_values.get(&key);

            if max_load.is_none() && critical_load.is_none() {
                return None;
            }

            Some(Threshold {
                key,
                query: key.query().to_string(),
                max_load: max_load.copied().unwrap_or_default(),
                critical_load: critical_load.copied().unwrap_or_default(),
            })
        })
        .collect();

    Ok(thresholds)
}

fn parse_threshold_values(list: &str) -> std::result::Result<HashMap<ThresholdKey, f64>, ThresholdError> {
    let mut values = HashMap::new();

    let list = list.trim();
    if list.is_empty() {
        return Ok(values);
    }

    for pair in list.split(',') {
        let separator = if pair.contains(':') { ':' } else { '=' };

        let parts: Vec<&str> = pair.split(separator).collect();
        let [key, value] = parts.as_slice() else {
            return Err(ThresholdError::InvalidSyntax(pair.to_string()));
        };

        let key: ThresholdKey = key.trim().parse()?;
        let value = value.trim();
        let parsed = value.parse::<f64>().map_err(|e| ThresholdError::InvalidNumber {
            key,
            value: value.to_string(),
            reason: e.to_string(),
        })?;

        values.insert(key, parsed);
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_lists() {
        let thresholds = parse_threshold_list("RAM=80, CPU:70", "CPU=90,RAM:95").unwrap();
        assert_eq!(thresholds.len(), 2);

        assert_eq!(thresholds[0].key, ThresholdKey::Cpu);
        assert_eq!(thresholds[0].max_load, 70.0);
        assert_eq!(thresholds[0].critical_load, 90.0);
        assert_eq!(thresholds[0].query, ThresholdKey::Cpu.query());

        assert_eq!(thresholds[1].key, ThresholdKey::Ram);
        assert_eq!(thresholds[1].max_load, 80.0);
        assert_eq!(thresholds[1].critical_load, 95.0);
    }

    #[test]
    fn test_unset_bound_is_zero() {
        let thresholds = parse_threshold_list("", "CPU=200").unwrap();
        assert_eq!(
            thresholds,
            vec![Threshold {
                key: ThresholdKey::Cpu,
                query: ThresholdKey::Cpu.query().to_string(),
                max_load: 0.0,
                critical_load: 200.0,
            }]
        );
    }

    #[test]
    fn test_empty_lists_produce_no_thresholds() {
        assert!(parse_threshold_list("", "").unwrap().is_empty());
        assert!(parse_threshold_list("   ", "\t").unwrap().is_empty());
    }

    #[test]
    fn test_key_in_neither_list_is_omitted() {
        let thresholds = parse_threshold_list("RAM=50", "RAM=60").unwrap();
        assert_eq!(thresholds.len(), 1);
        assert_eq!(thresholds[0].key, ThresholdKey::Ram);
    }

    #[test]
    fn test_undefined_key() {
        let err = parse_threshold_list("DISK=10", "").unwrap_err();
        assert_eq!(
            err,
            TransferError::ConfigurationError("invalid max load list: undefined key: DISK".to_string())
        );

        let err = parse_threshold_list("", "cpu=10").unwrap_err();
        assert!(err.to_string().contains("invalid critical load list"));
        assert!(err.to_string().contains("undefined key: cpu"));
    }

    #[test]
    fn test_invalid_number() {
        let err = parse_threshold_list("CPU=high", "").unwrap_err();
        assert!(err.to_string().contains("can't parse number 'high' for CPU"));
    }

    #[test]
    fn test_invalid_syntax() {
        assert!(parse_threshold_list("CPU", "").is_err());
        assert!(parse_threshold_list("CPU=1=2", "").is_err());
        assert!(parse_threshold_list("CPU=1,", "").is_err());
    }

    #[test]
    fn test_separator_detected_per_pair() {
        let values = parse_threshold_values("CPU:1.5,RAM=2.5").unwrap();
        assert_eq!(values[&ThresholdKey::Cpu], 1.5);
        assert_eq!(values[&ThresholdKey::Ram], 2.5);
    }
}
