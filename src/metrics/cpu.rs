//! CPU resource.
//!
//! Reports the following metrics:
//!
//! - `usage` (gauge): utilization percent over the last interval
//!
//! With extended metrics enabled:
//!
//! - `running` (gauge): runnable processes
//! - `blocked` (gauge): processes blocked on I/O
//! - `interrupts` (counter): interrupts since the previous sample
//! - `switches` (counter): context switches since the previous sample
//!
//! The first sample is taken against a zero baseline, so its `usage` covers
//! the time since boot and its counters carry the full cumulative totals.

use crate::config::ResourceConfig;
use crate::error::Result;
use crate::metrics::data::{CpuStat, CpuTimes};
use crate::metrics::resource::Resource;
use crate::metrics::source::SnapshotSource;
use crate::metrics::window::{gauge_value, percent, SampleWindow};
use crate::sink::{publish, Metric, MetricSink};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Cumulative values carried from one tick to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTotals {
    pub total: u64,
    pub idle: u64,
    pub interrupts: u64,
    pub switches: u64,
}

impl CpuTotals {
    pub fn from_stat(stat: &CpuStat) -> Self {
        let (total, idle) = jiffies(&stat.times);
        Self {
            total,
            idle,
            interrupts: stat.interrupts,
            switches: stat.context_switches,
        }
    }
}

/// Total and idle jiffies. Guest time is already counted in user and nice,
/// so it is moved out of them before summing. Sums saturate at `u64::MAX`.
pub fn jiffies(t: &CpuTimes) -> (u64, u64) {
    let user = t.user.saturating_sub(t.guest);
    let nice = t.nice.saturating_sub(t.guest_nice);
    let idle = t.idle.saturating_add(t.iowait);
    let system = t.system.saturating_add(t.irq).saturating_add(t.softirq);
    let virt = t.guest.saturating_add(t.guest_nice);
    let total = [nice, idle, system, t.steal, virt]
        .into_iter()
        .fold(user, u64::saturating_add);
    (total, idle)
}

/// CPU utilization resource.
pub struct CpuResource {
    config: ResourceConfig,
    source: Arc<dyn SnapshotSource>,
    window: SampleWindow<CpuTotals>,
}

impl CpuResource {
    pub fn new(config: ResourceConfig, source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            config,
            source,
            window: SampleWindow::new(),
        }
    }

    /// Derive metrics from one snapshot and advance the window.
    pub fn derive(&mut self, stat: &CpuStat) -> Vec<Metric> {
        let current = CpuTotals::from_stat(stat);
        let prev = self.window.advance(current);

        let dt = current.total.saturating_sub(prev.total);
        let di = current.idle.saturating_sub(prev.idle);
        let mut metrics = vec![Metric::gauge("usage", percent(dt.saturating_sub(di), dt))];

        if self.config.extended {
            metrics.push(Metric::gauge("running", gauge_value(stat.procs_running)));
            metrics.push(Metric::gauge("blocked", gauge_value(stat.procs_blocked)));
            metrics.push(Metric::count(
                "interrupts",
                gauge_value(current.interrupts.saturating_sub(prev.interrupts)),
            ));
            metrics.push(Metric::count(
                "switches",
                gauge_value(current.switches.saturating_sub(prev.switches)),
            ));
        }

        metrics
    }
}

#[async_trait]
impl Resource for CpuResource {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn interval(&self) -> Duration {
        self.config.interval
    }

    async fn report(&mut self, sink: &dyn MetricSink) -> Result<()> {
        let stat = self.source.cpu().await?;
        let metrics = self.derive(&stat);
        publish(sink, self.name(), &metrics).await;
        Ok(())
    }
}
