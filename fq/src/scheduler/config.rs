//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What `stop` does with requests that are still queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
    /// Dispatch everything still queued, in fair order
    #[default]
    Drain,
    /// Complete every queued request with `SchedulerError::Stopped`
    Fail,
}

impl std::fmt::Display for ShutdownPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Drain => write!(f, "drain"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

impl std::str::FromStr for ShutdownPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drain" => Ok(Self::Drain),
            "fail" => Ok(Self::Fail),
            _ => Err(format!("Unknown shutdown policy: {}. Use: drain or fail", s)),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Policy applied to queued requests on stop
    #[serde(rename = "shutdown-policy", default)]
    pub shutdown_policy: ShutdownPolicy,

    /// How long stop waits for the dispatcher task before aborting it
    #[serde(rename = "stop-timeout-ms", default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

fn default_stop_timeout_ms() -> u64 {
    5_000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            shutdown_policy: ShutdownPolicy::Drain,
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl SchedulerConfig {
    /// Get the stop timeout as a Duration
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}
