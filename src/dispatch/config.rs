/*!
 * Dispatcher Configuration
 *
 * Runtime configuration for the worker thread and shutdown behavior
 */

use crate::core::limits::{
    DEFAULT_REALTIME_PRIORITY, DEFAULT_WORKER_THREAD_NAME, ENV_RT_PRIORITY, ENV_SHUTDOWN_POLICY,
    ENV_THREAD_NAME,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// Scheduling class applied to the worker thread at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum LatencyClass {
    /// Keep the default time-shared class
    Normal,
    /// Fixed-priority real-time class (SCHED_FIFO on Linux, no-op elsewhere)
    Realtime { priority: i32 },
}

impl Default for LatencyClass {
    fn default() -> Self {
        LatencyClass::Realtime {
            priority: DEFAULT_REALTIME_PRIORITY,
        }
    }
}

impl FromStr for LatencyClass {
    type Err = String;

    /// Accepts `normal`, `0`, or a real-time priority
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("normal") {
            return Ok(LatencyClass::Normal);
        }
        match s.parse::<i32>() {
            Ok(0) => Ok(LatencyClass::Normal),
            Ok(priority) if priority > 0 => Ok(LatencyClass::Realtime { priority }),
            _ => Err(format!("invalid latency class: {s}")),
        }
    }
}

/// Fate of operations still queued when shutdown begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPolicy {
    /// Fail pending blocking calls with `Terminated`, discard pending
    /// fire-and-forget calls
    #[default]
    Abandon,
    /// Execute every pending operation before destroying the engine
    Drain,
}

impl FromStr for ShutdownPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abandon" => Ok(ShutdownPolicy::Abandon),
            "drain" => Ok(ShutdownPolicy::Drain),
            other => Err(format!("invalid shutdown policy: {other}")),
        }
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Name of the worker thread
    pub thread_name: String,
    /// Scheduling class applied by the worker to itself
    pub latency_class: LatencyClass,
    /// What happens to queued operations at shutdown
    pub shutdown_policy: ShutdownPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
            latency_class: LatencyClass::default(),
            shutdown_policy: ShutdownPolicy::default(),
        }
    }
}

impl DispatcherConfig {
    /// Configuration for latency-sensitive composition (the default)
    pub fn realtime() -> Self {
        Self::default()
    }

    /// Configuration that never touches the scheduling class
    pub fn portable() -> Self {
        Self {
            latency_class: LatencyClass::Normal,
            ..Self::default()
        }
    }

    /// Defaults overridden by environment variables
    ///
    /// Environment variables:
    /// - RENDER_DISPATCH_THREAD_NAME: worker thread name
    /// - RENDER_DISPATCH_RT_PRIORITY: SCHED_FIFO priority, `0`/`normal` to disable
    /// - RENDER_DISPATCH_SHUTDOWN: `abandon` or `drain`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(name) = std::env::var(ENV_THREAD_NAME) {
            if !name.is_empty() {
                config.thread_name = name;
            }
        }
        if let Ok(value) = std::env::var(ENV_RT_PRIORITY) {
            match value.parse() {
                Ok(class) => config.latency_class = class,
                Err(e) => warn!(error = %e, var = ENV_RT_PRIORITY, "Ignoring invalid value"),
            }
        }
        if let Ok(value) = std::env::var(ENV_SHUTDOWN_POLICY) {
            match value.parse() {
                Ok(policy) => config.shutdown_policy = policy,
                Err(e) => warn!(error = %e, var = ENV_SHUTDOWN_POLICY, "Ignoring invalid value"),
            }
        }

        config
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_latency_class(mut self, class: LatencyClass) -> Self {
        self.latency_class = class;
        self
    }

    pub fn with_shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown_policy = policy;
        self
    }
}
