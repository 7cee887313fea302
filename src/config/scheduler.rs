//! Scheduler configuration: timing, queue bounds and resource limits.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::pool::{WorkerPoolConfig, DEFAULT_THREAD_STACK_SIZE};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "SCHEDULER_";

/// Upper bound for the loop, backoff and admission poll intervals (one hour).
pub const MAX_INTERVAL_MS: u64 = 60 * 60 * 1000;

/// Admission limit for one gated resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimitConfig {
    /// Maximum admissions per window.
    pub limit: usize,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl ResourceLimitConfig {
    /// Window as a duration.
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Validate limit values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.limit == 0 {
            return Err("limit must be greater than 0".into());
        }
        if self.window_secs == 0 {
            return Err("window_secs must be greater than 0".into());
        }
        Ok(())
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Concurrent worker threads.
    pub worker_count: usize,
    /// Maximum queued tasks before `submit` is rejected.
    pub max_queue_depth: usize,
    /// Longest the loop sleeps between due-time checks, in milliseconds.
    pub poll_interval_ms: u64,
    /// Delay before retrying a task denied admission, in milliseconds.
    pub backoff_interval_ms: u64,
    /// Retry interval for blocking admission waits, in milliseconds.
    pub admission_poll_interval_ms: u64,
    /// Stack size per worker thread in bytes.
    pub thread_stack_size: usize,
    /// Admission limits keyed by resource name.
    pub resources: HashMap<String, ResourceLimitConfig>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get().max(1),
            max_queue_depth: 10_000,
            poll_interval_ms: 100,
            backoff_interval_ms: 250,
            admission_poll_interval_ms: 100,
            thread_stack_size: DEFAULT_THREAD_STACK_SIZE,
            resources: HashMap::new(),
        }
    }
}

impl SchedulerConfig {
    /// Loop sleep bound.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Re-enqueue delay after an admission denial.
    #[must_use]
    pub const fn backoff_interval(&self) -> Duration {
        Duration::from_millis(self.backoff_interval_ms)
    }

    /// Retry interval for `wait_and_admit`.
    #[must_use]
    pub const fn admission_poll_interval(&self) -> Duration {
        Duration::from_millis(self.admission_poll_interval_ms)
    }

    /// Worker pool settings derived from this configuration.
    #[must_use]
    pub const fn worker_pool(&self) -> WorkerPoolConfig {
        WorkerPoolConfig {
            worker_count: self.worker_count,
            thread_stack_size: self.thread_stack_size,
        }
    }

    /// Add or replace a resource limit.
    #[must_use]
    pub fn with_resource(mut self, name: impl Into<String>, limit: usize, window_secs: u64) -> Self {
        self.resources
            .insert(name.into(), ResourceLimitConfig { limit, window_secs });
        self
    }

    /// Validate all values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        self.worker_pool().validate()?;
        if self.max_queue_depth == 0 {
            return Err("max_queue_depth must be greater than 0".into());
        }
        for (field, value) in [
            ("poll_interval_ms", self.poll_interval_ms),
            ("backoff_interval_ms", self.backoff_interval_ms),
            ("admission_poll_interval_ms", self.admission_poll_interval_ms),
        ] {
            if value == 0 {
                return Err(format!("{field} must be greater than 0"));
            }
            if value > MAX_INTERVAL_MS {
                return Err(format!("{field} must be at most {MAX_INTERVAL_MS}"));
            }
        }
        for (name, limit) in &self.resources {
            if name.trim().is_empty() {
                return Err("resource names must not be empty".into());
            }
            limit
                .validate()
                .map_err(|e| format!("resource `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from defaults overridden by `SCHEDULER_*`
    /// environment variables, loading a `.env` file first if present.
    ///
    /// Recognised variables: `SCHEDULER_WORKER_COUNT`,
    /// `SCHEDULER_MAX_QUEUE_DEPTH`, `SCHEDULER_POLL_INTERVAL_MS`,
    /// `SCHEDULER_BACKOFF_INTERVAL_MS`, `SCHEDULER_ADMISSION_POLL_INTERVAL_MS`,
    /// `SCHEDULER_THREAD_STACK_SIZE`, and `SCHEDULER_RESOURCES` holding
    /// comma-separated `name=limit/window_secs` entries.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse, or a
    /// validation message.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_vars(std::env::vars())
    }

    /// Build configuration from an explicit set of variables.
    ///
    /// # Errors
    ///
    /// See [`SchedulerConfig::from_env`].
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut cfg = Self::default();
        for (key, value) in vars {
            let Some(key) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();
            match key {
                "WORKER_COUNT" => cfg.worker_count = parse_var(key, value)?,
                "MAX_QUEUE_DEPTH" => cfg.max_queue_depth = parse_var(key, value)?,
                "POLL_INTERVAL_MS" => cfg.poll_interval_ms = parse_var(key, value)?,
                "BACKOFF_INTERVAL_MS" => cfg.backoff_interval_ms = parse_var(key, value)?,
                "ADMISSION_POLL_INTERVAL_MS" => {
                    cfg.admission_poll_interval_ms = parse_var(key, value)?;
                }
                "THREAD_STACK_SIZE" => cfg.thread_stack_size = parse_var(key, value)?,
                "RESOURCES" => cfg.resources = parse_resources(value)?,
                _ => {}
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{ENV_PREFIX}{key}: cannot parse `{value}`"))
}

/// Parse `name=limit/window_secs,name=limit/window_secs`.
fn parse_resources(value: &str) -> Result<HashMap<String, ResourceLimitConfig>, String> {
    let mut resources = HashMap::new();
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, rate) = entry
            .split_once('=')
            .ok_or_else(|| format!("{ENV_PREFIX}RESOURCES: expected name=limit/window_secs, got `{entry}`"))?;
        let (limit, window) = rate
            .split_once('/')
            .ok_or_else(|| format!("{ENV_PREFIX}RESOURCES: expected limit/window_secs, got `{rate}`"))?;
        resources.insert(
            name.trim().to_string(),
            ResourceLimitConfig {
                limit: parse_var("RESOURCES", limit.trim())?,
                window_secs: parse_var("RESOURCES", window.trim())?,
            },
        );
    }
    Ok(resources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_vars_override_defaults() {
        let cfg = SchedulerConfig::from_vars([
            ("SCHEDULER_WORKER_COUNT", "3"),
            ("SCHEDULER_BACKOFF_INTERVAL_MS", "50"),
            ("SCHEDULER_RESOURCES", "gpt=2/1, gemini=60/60"),
            ("UNRELATED", "x"),
        ])
        .unwrap();
        assert_eq!(cfg.worker_count, 3);
        assert_eq!(cfg.backoff_interval_ms, 50);
        assert_eq!(cfg.resources["gpt"], ResourceLimitConfig { limit: 2, window_secs: 1 });
        assert_eq!(cfg.resources["gemini"].limit, 60);
    }

    #[test]
    fn bad_env_value_names_variable() {
        let err = SchedulerConfig::from_vars([("SCHEDULER_WORKER_COUNT", "many")]).unwrap_err();
        assert!(err.contains("SCHEDULER_WORKER_COUNT"));
    }

    #[test]
    fn intervals_are_capped() {
        for field in ["POLL_INTERVAL_MS", "BACKOFF_INTERVAL_MS", "ADMISSION_POLL_INTERVAL_MS"] {
            let key = format!("{ENV_PREFIX}{field}");
            let err = SchedulerConfig::from_vars([(key.as_str(), "18446744073709551615")])
                .unwrap_err();
            assert!(err.contains("at most"), "{field}: {err}");

            let at_cap = MAX_INTERVAL_MS.to_string();
            assert!(SchedulerConfig::from_vars([(key.as_str(), at_cap.as_str())]).is_ok());
        }
    }

    #[test]
    fn malformed_resource_entry_rejected() {
        assert!(SchedulerConfig::from_vars([("SCHEDULER_RESOURCES", "gpt=2")]).is_err());
        assert!(SchedulerConfig::from_vars([("SCHEDULER_RESOURCES", "gpt")]).is_err());
    }
}
