//! Agent configuration.

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use sysinfo::System;

/// Node name placeholder that resolves to the machine hostname.
pub const HOSTNAME_PLACEHOLDER: &str = "hostname";

/// Per-resource configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Polling interval
    pub interval: Duration,
    /// Whether to emit the extended metric set
    pub extended: bool,
}

impl ResourceConfig {
    pub fn new(interval: Duration, extended: bool) -> Self {
        Self { interval, extended }
    }
}

/// Configuration for the whole agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Address of the statsd collector
    pub statsd_address: String,
    /// Node name used to namespace every metric
    pub node_name: String,
    /// Emit extended metrics
    pub extended: bool,
    /// CPU polling interval
    pub cpu_interval: Duration,
    /// Memory polling interval
    pub memory_interval: Duration,
    /// Disk polling interval
    pub disk_interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            statsd_address: crate::DEFAULT_STATSD_ADDRESS.to_string(),
            node_name: HOSTNAME_PLACEHOLDER.to_string(),
            extended: false,
            cpu_interval: crate::DEFAULT_CPU_INTERVAL,
            memory_interval: crate::DEFAULT_MEMORY_INTERVAL,
            disk_interval: crate::DEFAULT_DISK_INTERVAL,
        }
    }
}

impl AgentConfig {
    /// Set the statsd collector address.
    pub fn with_statsd_address(mut self, address: impl Into<String>) -> Self {
        self.statsd_address = address.into();
        self
    }

    /// Set the node name.
    pub fn with_node_name(mut self, name: impl Into<String>) -> Self {
        self.node_name = name.into();
        self
    }

    /// Enable or disable extended metrics.
    pub fn with_extended(mut self, extended: bool) -> Self {
        self.extended = extended;
        self
    }

    pub fn with_cpu_interval(mut self, interval: Duration) -> Self {
        self.cpu_interval = interval;
        self
    }

    pub fn with_memory_interval(mut self, interval: Duration) -> Self {
        self.memory_interval = interval;
        self
    }

    pub fn with_disk_interval(mut self, interval: Duration) -> Self {
        self.disk_interval = interval;
        self
    }

    pub fn cpu(&self) -> ResourceConfig {
        ResourceConfig::new(self.cpu_interval, self.extended)
    }

    pub fn memory(&self) -> ResourceConfig {
        ResourceConfig::new(self.memory_interval, self.extended)
    }

    pub fn disk(&self) -> ResourceConfig {
        ResourceConfig::new(self.disk_interval, self.extended)
    }

    /// Check the configuration before anything is started.
    pub fn validate(&self) -> Result<()> {
        if self.statsd_address.trim().is_empty() {
            return Err(AgentError::config_error("statsd address must not be empty"));
        }

        for (name, interval) in [
            ("cpu", self.cpu_interval),
            ("memory", self.memory_interval),
            ("disk", self.disk_interval),
        ] {
            if interval.is_zero() {
                return Err(AgentError::config_error(format!(
                    "{name} interval must be greater than zero"
                )));
            }
        }

        Ok(())
    }

    /// Resolve the node name, looking up the hostname for the placeholder.
    pub fn resolve_node_name(&self) -> Result<String> {
        if self.node_name != HOSTNAME_PLACEHOLDER {
            return Ok(self.node_name.clone());
        }

        System::host_name()
            .filter(|host| !host.is_empty())
            .ok_or(AgentError::Hostname)
    }
}

/// Parse a duration string such as `"5s"`, `"250ms"` or `"1m30s"`.
pub fn parse_interval(value: &str) -> Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| AgentError::config_error(format!("invalid duration {value:?}: {e}")))
}
