//! Metric sinks.
//!
//! A [`MetricSink`] is the only object shared between the polling loops of
//! every resource, so implementations must be safe to call concurrently.

use crate::error::{AgentError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Receiver of gauge and counter emissions.
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// Record the current value of a gauge.
    async fn gauge(&self, name: &str, value: i64) -> Result<()>;

    /// Increment a counter by `delta`.
    async fn incr_by(&self, name: &str, delta: i64) -> Result<()>;

    /// Increment a counter by one.
    async fn incr(&self, name: &str) -> Result<()> {
        self.incr_by(name, 1).await
    }
}

/// A single metric emission produced by a derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Metric {
    Gauge { name: String, value: i64 },
    Count { name: String, delta: i64 },
}

impl Metric {
    pub fn gauge(name: impl Into<String>, value: i64) -> Self {
        Self::Gauge {
            name: name.into(),
            value,
        }
    }

    pub fn count(name: impl Into<String>, delta: i64) -> Self {
        Self::Count {
            name: name.into(),
            delta,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Gauge { name, .. } | Self::Count { name, .. } => name,
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            Self::Gauge { value, .. } => *value,
            Self::Count { delta, .. } => *delta,
        }
    }

    /// Send this metric to a sink.
    pub async fn send(&self, sink: &dyn MetricSink) -> Result<()> {
        match self {
            Self::Gauge { name, value } => sink.gauge(name, *value).await,
            Self::Count { name, delta } => sink.incr_by(name, *delta).await,
        }
    }
}

/// Send a batch of metrics, logging failed emissions instead of stopping.
///
/// Returns the number of metrics that were accepted by the sink.
pub async fn publish(sink: &dyn MetricSink, resource: &str, metrics: &[Metric]) -> usize {
    let mut sent = 0;
    for metric in metrics {
        match metric.send(sink).await {
            Ok(()) => sent += 1,
            Err(e) => warn!(resource, metric = metric.name(), error = %e, "failed to emit metric"),
        }
    }
    sent
}

/// Sink wrapper that prefixes every metric name with `<prefix>.`.
#[derive(Clone)]
pub struct Namespaced {
    inner: Arc<dyn MetricSink>,
    prefix: String,
}

impl Namespaced {
    pub fn new(inner: Arc<dyn MetricSink>, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    fn qualify(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.prefix, name)
        }
    }
}

#[async_trait]
impl MetricSink for Namespaced {
    async fn gauge(&self, name: &str, value: i64) -> Result<()> {
        self.inner.gauge(&self.qualify(name), value).await
    }

    async fn incr_by(&self, name: &str, delta: i64) -> Result<()> {
        self.inner.incr_by(&self.qualify(name), delta).await
    }
}

/// In-memory sink that records every emission.
///
/// A failing recorder rejects every emission, which is how tests check that
/// sink errors never stop a polling loop.
#[derive(Debug, Default)]
pub struct RecordingSink {
    metrics: Mutex<Vec<Metric>>,
    failing: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            metrics: Mutex::default(),
            failing: true,
        }
    }

    /// Everything recorded so far, in emission order.
    pub fn metrics(&self) -> Vec<Metric> {
        self.metrics
            .lock()
            .map(|metrics| metrics.clone())
            .unwrap_or_default()
    }

    /// Values recorded under `name`, in emission order.
    pub fn values(&self, name: &str) -> Vec<i64> {
        self.metrics()
            .iter()
            .filter(|metric| metric.name() == name)
            .map(Metric::value)
            .collect()
    }

    fn record(&self, metric: Metric) -> Result<()> {
        if self.failing {
            return Err(AgentError::sink_error(format!(
                "rejected {}",
                metric.name()
            )));
        }

        self.metrics
            .lock()
            .map_err(|_| AgentError::sink_error("recording sink poisoned"))?
            .push(metric);
        Ok(())
    }
}

#[async_trait]
impl MetricSink for RecordingSink {
    async fn gauge(&self, name: &str, value: i64) -> Result<()> {
        self.record(Metric::gauge(name, value))
    }

    async fn incr_by(&self, name: &str, delta: i64) -> Result<()> {
        self.record(Metric::count(name, delta))
    }
}
