//! UDP statsd sink used by the agent binary.

use crate::error::{AgentError, Result};
use crate::sink::MetricSink;
use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::debug;

/// Statsd client writing one datagram per emission.
#[derive(Debug)]
pub struct StatsdSink {
    socket: UdpSocket,
}

impl StatsdSink {
    /// Bind a local socket and connect it to the collector address.
    pub async fn dial(address: &str) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(address).await.map_err(|e| {
            AgentError::sink_error(format!("could not connect to {address}: {e}"))
        })?;

        debug!(address, "statsd socket connected");
        Ok(Self { socket })
    }

    async fn send(&self, line: String) -> Result<()> {
        self.socket
            .send(line.as_bytes())
            .await
            .map_err(|e| AgentError::sink_error(format!("send failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl MetricSink for StatsdSink {
    async fn gauge(&self, name: &str, value: i64) -> Result<()> {
        self.send(format!("{name}:{value}|g")).await
    }

    async fn incr_by(&self, name: &str, delta: i64) -> Result<()> {
        self.send(format!("{name}:{delta}|c")).await
    }
}
