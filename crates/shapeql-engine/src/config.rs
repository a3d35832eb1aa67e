use std::time::Duration;

/// Execution settings shared by every operation of an [`Executor`](crate::Executor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Whether sibling query fields and list elements may resolve concurrently. Mutation root
    /// fields always resolve one after the other.
    pub concurrent: bool,
    /// Trips the operation's cancellation token once elapsed.
    pub timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            concurrent: true,
            timeout: None,
        }
    }
}

/// Subscription session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a client has to send `connection_init`.
    pub init_timeout: Duration,
    /// How often the server pings (or sends `ka` with the legacy protocol).
    pub keep_alive_interval: Duration,
    /// How long the server waits for a `pong` before closing the connection.
    pub keep_alive_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            init_timeout: Duration::from_secs(10),
            keep_alive_interval: Duration::from_secs(15),
            keep_alive_timeout: Duration::from_secs(10),
        }
    }
}
