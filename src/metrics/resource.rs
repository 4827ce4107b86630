//! Resource contract and the polling loop shared by every resource.

use crate::error::{AgentError, Result};
use crate::sink::MetricSink;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// A periodically sampled data source.
///
/// Implementations own their derivation state; it is only ever touched from
/// the resource's own polling loop.
#[async_trait]
pub trait Resource: Send + 'static {
    /// Static identifier, used to namespace emitted metrics.
    fn name(&self) -> &'static str;

    /// How often [`Resource::report`] runs.
    fn interval(&self) -> Duration;

    /// One-time setup before the polling loop starts. A failure here keeps
    /// the resource from ever running.
    async fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    /// Take one snapshot and emit the derived metrics.
    ///
    /// An error means the snapshot could not be taken; the loop logs it and
    /// waits for the next tick.
    async fn report(&mut self, sink: &dyn MetricSink) -> Result<()>;
}

enum State {
    Idle(Box<dyn Resource>),
    Running {
        cancel: CancellationToken,
        task: JoinHandle<()>,
    },
    Stopped,
}

/// Start/stop lifecycle around one [`Resource`].
///
/// A handle moves from idle to running to stopped exactly once and cannot be
/// restarted. Stopping an idle handle is allowed and simply retires it.
pub struct ResourceHandle {
    name: &'static str,
    state: State,
}

impl ResourceHandle {
    pub fn new(resource: impl Resource) -> Self {
        Self::from_boxed(Box::new(resource))
    }

    pub fn from_boxed(resource: Box<dyn Resource>) -> Self {
        Self {
            name: resource.name(),
            state: State::Idle(resource),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    /// Prepare the resource and spawn its polling loop. Returns as soon as
    /// the loop is spawned.
    pub async fn start(&mut self, sink: Arc<dyn MetricSink>) -> Result<()> {
        let mut resource = match std::mem::replace(&mut self.state, State::Stopped) {
            State::Idle(resource) => resource,
            other => {
                self.state = other;
                return Err(AgentError::AlreadyStarted {
                    resource: self.name,
                });
            }
        };

        let interval = resource.interval();
        if interval.is_zero() {
            return Err(AgentError::config_error(format!(
                "{} interval must be greater than zero",
                self.name
            )));
        }

        if let Err(e) = resource.prepare().await {
            error!(resource = self.name, error = %e, "resource disabled, will not report");
            return Err(e);
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll(resource, sink, interval, cancel.clone()));
        info!(resource = self.name, interval = ?interval, "resource started");

        self.state = State::Running { cancel, task };
        Ok(())
    }

    /// Signal the polling loop to exit without waiting for it.
    pub fn signal(&self) {
        if let State::Running { cancel, .. } = &self.state {
            cancel.cancel();
        }
    }

    /// Wait for a signalled loop to exit. Idle handles are retired.
    pub async fn join(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Stopped) {
            State::Running { cancel, task } => {
                cancel.cancel();
                task.await.map_err(|source| AgentError::Task {
                    resource: self.name,
                    source,
                })
            }
            State::Idle(_) | State::Stopped => Ok(()),
        }
    }

    /// Signal the loop and wait for it to exit.
    pub async fn stop(&mut self) -> Result<()> {
        self.signal();
        self.join().await
    }
}

/// The polling loop. Termination is only observed between ticks, so a
/// report in progress always completes.
async fn poll(
    mut resource: Box<dyn Resource>,
    sink: Arc<dyn MetricSink>,
    period: Duration,
    cancel: CancellationToken,
) {
    let name = resource.name();
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(resource = name, "exiting");
                return;
            }
            _ = ticker.tick() => {
                if let Err(e) = resource.report(sink.as_ref()).await {
                    error!(resource = name, error = %e, "failed to take snapshot");
                }
            }
        }
    }
}
