//! Collector driving a set of resources.

use crate::config::AgentConfig;
use crate::error::Result;
use crate::metrics::{
    cpu::CpuResource,
    data::HostSnapshot,
    disk::DiskResource,
    memory::MemoryResource,
    resource::{Resource, ResourceHandle},
    source::SnapshotSource,
};
use crate::sink::{MetricSink, Namespaced};
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Owns every registered resource and fans out start and stop.
///
/// Resources start in registration order. Each one gets the shared sink
/// namespaced by its own name.
pub struct Collector {
    sink: Arc<dyn MetricSink>,
    resources: Vec<ResourceHandle>,
}

impl Collector {
    /// Create an empty collector emitting to `sink`.
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self {
            sink,
            resources: Vec::new(),
        }
    }

    /// Create a collector with the memory, CPU and disk resources registered.
    pub fn with_defaults(
        sink: Arc<dyn MetricSink>,
        source: Arc<dyn SnapshotSource>,
        config: &AgentConfig,
    ) -> Self {
        let mut collector = Self::new(sink);
        collector.add(MemoryResource::new(config.memory(), source.clone()));
        collector.add(CpuResource::new(config.cpu(), source.clone()));
        collector.add(DiskResource::new(config.disk(), source));
        collector
    }

    /// Register a resource. Must be called before [`Collector::start`].
    pub fn add(&mut self, resource: impl Resource) {
        self.resources.push(ResourceHandle::new(resource));
    }

    /// Names of the registered resources, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.resources.iter().map(ResourceHandle::name).collect()
    }

    /// Start every resource in registration order.
    ///
    /// Stops at the first failure and returns it. Resources started before
    /// the failure keep running; call [`Collector::stop`] regardless.
    pub async fn start(&mut self) -> Result<()> {
        for handle in &mut self.resources {
            let sink: Arc<dyn MetricSink> =
                Arc::new(Namespaced::new(self.sink.clone(), handle.name()));
            if let Err(e) = handle.start(sink).await {
                error!(resource = handle.name(), error = %e, "failed to start resource");
                return Err(e);
            }
        }

        info!(resources = ?self.names(), "collector started");
        Ok(())
    }

    /// Signal every resource and wait until all of their loops have exited.
    ///
    /// Every resource is stopped even if some fail; the first error is
    /// returned.
    pub async fn stop(&mut self) -> Result<()> {
        for handle in &self.resources {
            handle.signal();
        }

        let results = join_all(self.resources.iter_mut().map(ResourceHandle::join)).await;

        let mut first = None;
        for (name, result) in self.names().into_iter().zip(results) {
            if let Err(e) = result {
                warn!(resource = name, error = %e, "failed to stop resource");
                first.get_or_insert(e);
            }
        }

        info!("collector stopped");
        first.map_or(Ok(()), Err)
    }
}

/// Take one reading of every subsystem without starting any loops.
///
/// Disks that cannot be read are left out of the snapshot.
pub async fn take_snapshot(
    source: &dyn SnapshotSource,
    node: impl Into<String>,
) -> Result<HostSnapshot> {
    let mut snapshot = HostSnapshot::new(node);
    snapshot.cpu = source.cpu().await?;
    snapshot.memory = source.memory().await?;

    for path in source.mounts().await? {
        match source.disk(&path).await {
            Ok(stat) => snapshot.disks.push(stat),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping disk"),
        }
    }

    Ok(snapshot)
}
