//! Scripted snapshot source shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use system_stats::{AgentError, CpuStat, CpuTimes, DiskStat, MemoryStat, Result, SnapshotSource};

/// Snapshot source replaying scripted readings.
///
/// `None` entries in a script become snapshot failures. Once a script runs
/// out, the last reading is repeated.
#[derive(Default)]
pub struct FakeSource {
    pub cpu: Mutex<VecDeque<Option<CpuStat>>>,
    pub memory: Mutex<VecDeque<Option<MemoryStat>>>,
    pub disks: Vec<DiskStat>,
    pub broken_paths: Vec<PathBuf>,
    pub mounts_fail: bool,
    pub fetch_delay: Option<Duration>,
}

impl FakeSource {
    pub fn with_cpu(readings: Vec<Option<CpuStat>>) -> Self {
        Self {
            cpu: Mutex::new(readings.into()),
            ..Self::default()
        }
    }

    fn next<T: Clone>(script: &Mutex<VecDeque<Option<T>>>, what: &str) -> Result<T> {
        let mut script = script.lock().unwrap();
        let reading = if script.len() > 1 {
            script.pop_front().flatten()
        } else {
            script.front().cloned().flatten()
        };
        reading.ok_or_else(|| AgentError::snapshot_error(format!("{what} unavailable")))
    }

    async fn delay(&self) {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SnapshotSource for FakeSource {
    async fn cpu(&self) -> Result<CpuStat> {
        self.delay().await;
        Self::next(&self.cpu, "cpu")
    }

    async fn memory(&self) -> Result<MemoryStat> {
        self.delay().await;
        Self::next(&self.memory, "memory")
    }

    async fn disk(&self, path: &Path) -> Result<DiskStat> {
        self.delay().await;
        if self.broken_paths.iter().any(|broken| broken == path) {
            return Err(AgentError::snapshot_error("device gone"));
        }
        self.disks
            .iter()
            .find(|disk| Path::new(&disk.path) == path)
            .cloned()
            .ok_or_else(|| AgentError::snapshot_error("not mounted"))
    }

    async fn mounts(&self) -> Result<Vec<PathBuf>> {
        if self.mounts_fail {
            return Err(AgentError::discovery_error("fstab unreadable"));
        }
        let mut paths: Vec<PathBuf> = self.disks.iter().map(|d| PathBuf::from(&d.path)).collect();
        paths.extend(self.broken_paths.iter().cloned());
        Ok(paths)
    }
}

pub fn cpu_stat(busy: u64, idle: u64) -> CpuStat {
    CpuStat {
        times: CpuTimes {
            user: busy,
            idle,
            ..CpuTimes::default()
        },
        ..CpuStat::default()
    }
}

pub fn disk(path: &str, total: u64, used: u64) -> DiskStat {
    DiskStat {
        path: path.to_string(),
        total,
        free: total.saturating_sub(used),
        used,
    }
}
