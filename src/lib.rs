//! # System Stats - host metrics agent
//!
//! Periodically samples CPU, memory and disk counters and reports them as
//! statsd gauges and counters.
//!
//! ## Features
//!
//! - **Independent resources**: every resource polls on its own interval in
//!   its own task
//! - **Counter derivation**: cumulative kernel counters become rates and
//!   percentages, with non-finite results reported as zero
//! - **Coordinated shutdown**: one stop call signals every loop and waits for
//!   all of them
//! - **Library + Binary**: use as a crate or run `system-stats`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use system_stats::{AgentConfig, Collector, ProcSource, StatsdSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig::default();
//!     let sink = Arc::new(StatsdSink::dial(&config.statsd_address).await?);
//!     let mut collector = Collector::with_defaults(sink, Arc::new(ProcSource::new()), &config);
//!
//!     collector.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     collector.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod sink;
pub mod statsd;

use std::time::Duration;

// Re-export public API
pub use config::{AgentConfig, ResourceConfig};
pub use error::{AgentError, Result};
pub use metrics::{
    collector::{take_snapshot, Collector},
    cpu::CpuResource,
    data::{CpuStat, CpuTimes, DiskStat, HostSnapshot, MemoryStat},
    disk::DiskResource,
    memory::MemoryResource,
    procfs::ProcSource,
    resource::{Resource, ResourceHandle},
    source::SnapshotSource,
};
pub use sink::{Metric, MetricSink, Namespaced, RecordingSink};
pub use statsd::StatsdSink;

/// The default statsd collector address
pub const DEFAULT_STATSD_ADDRESS: &str = "127.0.0.1:8125";

/// The default CPU polling interval
pub const DEFAULT_CPU_INTERVAL: Duration = Duration::from_secs(5);

/// The default memory polling interval
pub const DEFAULT_MEMORY_INTERVAL: Duration = Duration::from_secs(10);

/// The default disk polling interval
pub const DEFAULT_DISK_INTERVAL: Duration = Duration::from_secs(30);
