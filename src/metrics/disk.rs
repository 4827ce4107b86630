//! Disk resource.
//!
//! Reports `<path>.percent`, `<path>.free` and `<path>.used` gauges for every
//! mount point discovered when the resource starts.

use crate::config::ResourceConfig;
use crate::error::Result;
use crate::metrics::data::DiskStat;
use crate::metrics::resource::Resource;
use crate::metrics::source::SnapshotSource;
use crate::metrics::window::{gauge_value, percent};
use crate::sink::{publish, Metric, MetricSink};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Filesystem usage resource.
pub struct DiskResource {
    config: ResourceConfig,
    source: Arc<dyn SnapshotSource>,
    paths: Vec<PathBuf>,
}

impl DiskResource {
    pub fn new(config: ResourceConfig, source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            config,
            source,
            paths: Vec::new(),
        }
    }

    /// Mount points being monitored. Empty until the resource is prepared.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn derive(stat: &DiskStat) -> Vec<Metric> {
        let path = &stat.path;
        vec![
            Metric::gauge(format!("{path}.percent"), percent(stat.used, stat.total)),
            Metric::gauge(format!("{path}.free"), gauge_value(stat.free)),
            Metric::gauge(format!("{path}.used"), gauge_value(stat.used)),
        ]
    }
}

#[async_trait]
impl Resource for DiskResource {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn interval(&self) -> Duration {
        self.config.interval
    }

    async fn prepare(&mut self) -> Result<()> {
        self.paths = self.source.mounts().await?;
        if self.paths.is_empty() {
            warn!(resource = self.name(), "no mount points discovered");
        } else {
            info!(resource = self.name(), paths = ?self.paths, "discovered mount points");
        }
        Ok(())
    }

    async fn report(&mut self, sink: &dyn MetricSink) -> Result<()> {
        for path in &self.paths {
            match self.source.disk(path).await {
                Ok(stat) => {
                    publish(sink, self.name(), &Self::derive(&stat)).await;
                }
                Err(e) => {
                    error!(resource = self.name(), path = %path.display(), error = %e, "failed to read disk");
                }
            }
        }
        Ok(())
    }
}
