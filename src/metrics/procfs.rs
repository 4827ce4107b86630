//! Linux snapshot source backed by `/proc`, `/etc/fstab` and `statvfs`.

use crate::error::{AgentError, Result};
use crate::metrics::data::{CpuStat, CpuTimes, DiskStat, MemoryStat};
use crate::metrics::source::SnapshotSource;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Snapshot source reading kernel-exposed stat files.
#[derive(Debug, Clone)]
pub struct ProcSource {
    stat_path: PathBuf,
    meminfo_path: PathBuf,
    fstab_path: PathBuf,
}

impl Default for ProcSource {
    fn default() -> Self {
        Self {
            stat_path: PathBuf::from("/proc/stat"),
            meminfo_path: PathBuf::from("/proc/meminfo"),
            fstab_path: PathBuf::from("/etc/fstab"),
        }
    }
}

impl ProcSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read counters from a different `/proc` root, e.g. a host mount in a container.
    pub fn with_proc_root(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        self.stat_path = root.join("stat");
        self.meminfo_path = root.join("meminfo");
        self
    }

    /// Discover mount points from a different fstab.
    pub fn with_fstab(mut self, path: impl Into<PathBuf>) -> Self {
        self.fstab_path = path.into();
        self
    }
}

#[async_trait]
impl SnapshotSource for ProcSource {
    async fn cpu(&self) -> Result<CpuStat> {
        let stat = fs::read_to_string(&self.stat_path).await?;
        parse_stat(&stat)
    }

    async fn memory(&self) -> Result<MemoryStat> {
        let meminfo = fs::read_to_string(&self.meminfo_path).await?;
        parse_meminfo(&meminfo)
    }

    async fn disk(&self, path: &Path) -> Result<DiskStat> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || read_disk(&path))
            .await
            .map_err(|e| AgentError::snapshot_error(format!("disk reader failed: {e}")))?
    }

    async fn mounts(&self) -> Result<Vec<PathBuf>> {
        let fstab = fs::read_to_string(&self.fstab_path).await.map_err(|e| {
            AgentError::discovery_error(format!(
                "failed to read {}: {e}",
                self.fstab_path.display()
            ))
        })?;
        Ok(parse_fstab(&fstab))
    }
}

/// Usage of the filesystem holding `path`. Reserved blocks count as free,
/// so `used` is what is actually allocated.
#[cfg(unix)]
fn read_disk(path: &Path) -> Result<DiskStat> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(|e| {
        AgentError::snapshot_error(format!("statvfs {}: {e}", path.display()))
    })?;

    let fragment = stat.fragment_size() as u64;
    let total = (stat.blocks() as u64).saturating_mul(fragment);
    let free = (stat.blocks_free() as u64).saturating_mul(fragment);

    Ok(DiskStat {
        path: path.to_string_lossy().to_string(),
        total,
        free,
        used: total.saturating_sub(free),
    })
}

#[cfg(not(unix))]
fn read_disk(path: &Path) -> Result<DiskStat> {
    Err(AgentError::snapshot_error(format!(
        "disk usage for {} is not supported on this platform",
        path.display()
    )))
}

/// Parse the aggregate counters out of `/proc/stat`.
pub fn parse_stat(contents: &str) -> Result<CpuStat> {
    let mut stat = CpuStat::default();
    let mut found_cpu = false;

    for line in contents.lines() {
        let mut fields = line.split_whitespace();
        let Some(key) = fields.next() else {
            continue;
        };

        match key {
            "cpu" => {
                let values = fields
                    .map(|field| parse_u64(field, "cpu"))
                    .collect::<Result<Vec<_>>>()?;
                stat.times = cpu_times(&values)?;
                found_cpu = true;
            }
            "intr" => stat.interrupts = first_value(fields, key)?,
            "ctxt" => stat.context_switches = first_value(fields, key)?,
            "procs_running" => stat.procs_running = first_value(fields, key)?,
            "procs_blocked" => stat.procs_blocked = first_value(fields, key)?,
            _ => {}
        }
    }

    if !found_cpu {
        return Err(AgentError::parse_error("no aggregate cpu line in stat"));
    }

    Ok(stat)
}

/// Older kernels report fewer columns; missing trailing modes read as zero.
fn cpu_times(values: &[u64]) -> Result<CpuTimes> {
    if values.len() < 4 {
        return Err(AgentError::parse_error(format!(
            "cpu line has {} columns, expected at least 4",
            values.len()
        )));
    }

    let at = |i: usize| values.get(i).copied().unwrap_or(0);
    Ok(CpuTimes {
        user: at(0),
        nice: at(1),
        system: at(2),
        idle: at(3),
        iowait: at(4),
        irq: at(5),
        softirq: at(6),
        steal: at(7),
        guest: at(8),
        guest_nice: at(9),
    })
}

fn first_value<'a>(mut fields: impl Iterator<Item = &'a str>, key: &str) -> Result<u64> {
    let field = fields
        .next()
        .ok_or_else(|| AgentError::parse_error(format!("{key} has no value")))?;
    parse_u64(field, key)
}

fn parse_u64(field: &str, key: &str) -> Result<u64> {
    field
        .parse()
        .map_err(|_| AgentError::parse_error(format!("{key}: invalid number {field:?}")))
}

/// Parse `/proc/meminfo`. Values stay in the file's kB unit.
pub fn parse_meminfo(contents: &str) -> Result<MemoryStat> {
    let mut stat = MemoryStat::default();
    let mut found_total = false;

    for line in contents.lines() {
        let Some((key, value_str)) = line.split_once(':') else {
            continue;
        };
        let Some(value_kb) = value_str.split_whitespace().next() else {
            continue;
        };

        let slot = match key {
            "MemTotal" => {
                found_total = true;
                &mut stat.total
            }
            "MemFree" => &mut stat.free,
            "Buffers" => &mut stat.buffers,
            "Cached" => &mut stat.cached,
            "Active" => &mut stat.active,
            "SwapTotal" => &mut stat.swap_total,
            "SwapFree" => &mut stat.swap_free,
            _ => continue,
        };
        *slot = parse_u64(value_kb, key)?;
    }

    if !found_total {
        return Err(AgentError::parse_error("no MemTotal in meminfo"));
    }

    Ok(stat)
}

/// Mount points listed in an fstab. Entries such as `swap` or `none` that
/// are not absolute paths are skipped.
pub fn parse_fstab(contents: &str) -> Vec<PathBuf> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter(|mount| mount.starts_with('/'))
        .map(|mount| PathBuf::from(mount.replace("\\040", " ")))
        .collect()
}
