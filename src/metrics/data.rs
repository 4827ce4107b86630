//! Data structures for kernel counter snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cumulative jiffies per CPU mode, from the aggregate `cpu` line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

/// One reading of the CPU counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuStat {
    /// Aggregate time spent in each mode since boot
    pub times: CpuTimes,
    /// Interrupts serviced since boot
    pub interrupts: u64,
    /// Context switches since boot
    pub context_switches: u64,
    /// Processes currently runnable
    pub procs_running: u64,
    /// Processes currently blocked on I/O
    pub procs_blocked: u64,
}

/// One reading of the memory counters, in kilobytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStat {
    pub total: u64,
    pub free: u64,
    pub buffers: u64,
    pub cached: u64,
    pub active: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

/// Usage of one mounted filesystem, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskStat {
    /// Mount point
    pub path: String,
    pub total: u64,
    pub free: u64,
    pub used: u64,
}

/// Everything the agent can see at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSnapshot {
    /// When the readings were taken
    pub captured_at: DateTime<Utc>,
    /// Node name metrics would be reported under
    pub node: String,
    pub cpu: CpuStat,
    pub memory: MemoryStat,
    pub disks: Vec<DiskStat>,
}

impl HostSnapshot {
    /// Create an empty snapshot stamped with the current time.
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            captured_at: Utc::now(),
            node: node.into(),
            cpu: CpuStat::default(),
            memory: MemoryStat::default(),
            disks: Vec::new(),
        }
    }
}
