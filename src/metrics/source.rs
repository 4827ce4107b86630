//! Snapshot source abstraction.

use crate::error::Result;
use crate::metrics::data::{CpuStat, DiskStat, MemoryStat};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Provider of point-in-time kernel counter snapshots.
///
/// Every call returns a fresh reading; nothing is cached between calls.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Read the CPU counters.
    async fn cpu(&self) -> Result<CpuStat>;

    /// Read the memory counters.
    async fn memory(&self) -> Result<MemoryStat>;

    /// Read usage for the filesystem mounted at `path`.
    async fn disk(&self, path: &Path) -> Result<DiskStat>;

    /// Discover the mount points worth monitoring.
    async fn mounts(&self) -> Result<Vec<PathBuf>>;
}
