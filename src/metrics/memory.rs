//! Memory resource.
//!
//! Reports `percent` and `swap.percent` gauges. Extended mode adds `total`,
//! `used`, `free`, `active`, `swap.total` and `swap.free` in bytes.
//!
//! `/proc/meminfo` reports kibibytes, so raw values are scaled by 1024 rather
//! than 1000. Byte gauges come out about 2.4% larger than a decimal kilobyte
//! conversion would give.

use crate::config::ResourceConfig;
use crate::error::Result;
use crate::metrics::data::MemoryStat;
use crate::metrics::resource::Resource;
use crate::metrics::source::SnapshotSource;
use crate::metrics::window::{gauge_value, percent};
use crate::sink::{publish, Metric, MetricSink};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Bytes per unit reported by the snapshot source (meminfo uses kB).
pub const BYTES_PER_UNIT: u64 = 1024;

/// Memory in use, excluding buffers and page cache.
pub fn used(stat: &MemoryStat) -> u64 {
    stat.total
        .saturating_sub(stat.free)
        .saturating_sub(stat.buffers)
        .saturating_sub(stat.cached)
}

fn bytes(units: u64) -> i64 {
    gauge_value(units.saturating_mul(BYTES_PER_UNIT))
}

/// Memory usage resource. Every metric is instantaneous, so no window is kept.
pub struct MemoryResource {
    config: ResourceConfig,
    source: Arc<dyn SnapshotSource>,
}

impl MemoryResource {
    pub fn new(config: ResourceConfig, source: Arc<dyn SnapshotSource>) -> Self {
        Self { config, source }
    }

    pub fn derive(&self, stat: &MemoryStat) -> Vec<Metric> {
        let used = used(stat);
        let swap_used = stat.swap_total.saturating_sub(stat.swap_free);

        let mut metrics = vec![
            Metric::gauge("percent", percent(used, stat.total)),
            Metric::gauge("swap.percent", percent(swap_used, stat.swap_total)),
        ];

        if self.config.extended {
            metrics.extend([
                Metric::gauge("total", bytes(stat.total)),
                Metric::gauge("used", bytes(used)),
                Metric::gauge("free", bytes(stat.free)),
                Metric::gauge("active", bytes(stat.active)),
                Metric::gauge("swap.total", bytes(stat.swap_total)),
                Metric::gauge("swap.free", bytes(stat.swap_free)),
            ]);
        }

        metrics
    }
}

#[async_trait]
impl Resource for MemoryResource {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn interval(&self) -> Duration {
        self.config.interval
    }

    async fn report(&mut self, sink: &dyn MetricSink) -> Result<()> {
        let stat = self.source.memory().await?;
        publish(sink, self.name(), &self.derive(&stat)).await;
        Ok(())
    }
}
