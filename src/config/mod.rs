//! Environment-driven runtime configuration.
//!
//! All options are optional and read from `MONOLITH_*` environment
//! variables at process start (a `.env` file is honored if present). No
//! hot reload is performed; restart the supervisor to pick up changes.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Runtime configuration for the supervisor and its workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonolithConfig {
    /// Number of worker threads to spawn. Env: `MONOLITH_NUM_WORKERS`.
    pub num_workers: usize,
    /// Cooperative scheduling quantum in milliseconds. Env:
    /// `MONOLITH_QUANTUM_MS`.
    pub quantum_ms: u64,
    /// Logical memory pool capacity per worker, in bytes. Env:
    /// `MONOLITH_MEMORY_POOL_BYTES`.
    pub memory_pool_bytes: usize,
    /// Log level name (`DEBUG`, `INFO`, `WARNING`, `ERROR`). Env:
    /// `MONOLITH_LOG_LEVEL`.
    pub log_level: String,
    /// Prometheus `/metrics` HTTP port; 0 disables. Env:
    /// `MONOLITH_METRICS_PORT`.
    pub metrics_port: u16,
    /// Submit-side send timeout in seconds. Env:
    /// `MONOLITH_IPC_SEND_TIMEOUT`.
    pub ipc_send_timeout_secs: f64,
    /// Health HTTP port; 0 disables. Env: `MONOLITH_HEALTH_PORT`.
    pub health_port: u16,
}

impl Default for MonolithConfig {
    fn default() -> Self {
        Self {
            num_workers: 4,
            quantum_ms: 10,
            memory_pool_bytes: 64 * 1024 * 1024,
            log_level: "INFO".to_string(),
            metrics_port: 9100,
            ipc_send_timeout_secs: 5.0,
            health_port: 8080,
        }
    }
}

impl MonolithConfig {
    /// Submit-side send timeout as a [`Duration`].
    #[must_use]
    pub fn ipc_send_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.ipc_send_timeout_secs.max(0.0))
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// A human-readable message naming the offending option.
    pub fn validate(&self) -> Result<(), String> {
        if self.num_workers == 0 {
            return Err("num_workers must be greater than 0".into());
        }
        if self.quantum_ms == 0 {
            return Err("quantum_ms must be greater than 0".into());
        }
        if self.memory_pool_bytes == 0 {
            return Err("memory_pool_bytes must be greater than 0".into());
        }
        if self.ipc_send_timeout_secs <= 0.0 {
            return Err("ipc_send_timeout must be greater than 0".into());
        }
        Ok(())
    }
}

/// Load configuration from the process environment.
///
/// Unset or unparseable variables fall back to their defaults.
#[must_use]
pub fn load_config() -> MonolithConfig {
    let _ = dotenvy::dotenv();
    let defaults = MonolithConfig::default();
    MonolithConfig {
        num_workers: env_or("MONOLITH_NUM_WORKERS", defaults.num_workers),
        quantum_ms: env_or("MONOLITH_QUANTUM_MS", defaults.quantum_ms),
        memory_pool_bytes: env_or("MONOLITH_MEMORY_POOL_BYTES", defaults.memory_pool_bytes),
        log_level: env::var("MONOLITH_LOG_LEVEL").unwrap_or(defaults.log_level),
        metrics_port: env_or("MONOLITH_METRICS_PORT", defaults.metrics_port),
        ipc_send_timeout_secs: env_or("MONOLITH_IPC_SEND_TIMEOUT", defaults.ipc_send_timeout_secs),
        health_port: env_or("MONOLITH_HEALTH_PORT", defaults.health_port),
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}
