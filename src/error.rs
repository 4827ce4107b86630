//! Error handling for the system stats agent.

/// A specialized `Result` type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// The main error type for agent operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Kernel counter file could not be parsed
    #[error("Failed to parse system information: {0}")]
    Parse(String),

    /// A snapshot could not be taken
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Metric emission failed
    #[error("Sink error: {0}")]
    Sink(String),

    /// Mount point discovery failed
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Hostname could not be resolved for the node name
    #[error("Could not resolve hostname")]
    Hostname,

    /// Start was called on a resource that is running or already stopped
    #[error("Resource {resource} was already started")]
    AlreadyStarted { resource: &'static str },

    /// A polling task panicked or was cancelled by the runtime
    #[error("Polling task for {resource} failed: {source}")]
    Task {
        resource: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
}

impl AgentError {
    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new snapshot error
    pub fn snapshot_error(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }

    /// Create a new sink error
    pub fn sink_error(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Create a new discovery error
    pub fn discovery_error(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
