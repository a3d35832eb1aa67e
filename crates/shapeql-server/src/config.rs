//! Server configuration, read from a TOML file.
//!
//! Every section and key is optional:
//!
//! ```toml
//! [network]
//! listen_address = "0.0.0.0:4000"
//!
//! [graph]
//! path = "/graphql"
//! websocket_path = "/graphql/ws"
//!
//! [execution]
//! concurrent = true
//! timeout = "30s"
//!
//! [subscriptions]
//! init_timeout = "10s"
//! keep_alive_interval = "15s"
//! keep_alive_timeout = "10s"
//!
//! [log]
//! filter = "info,shapeql_engine=debug"
//! style = "json"
//! ```

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::Path,
    time::Duration,
};

use duration_str::{deserialize_duration, deserialize_option_duration};
use shapeql_engine::{ExecutorConfig, SessionConfig};

use crate::{Error, Result};

const DEFAULT_LISTEN_ADDRESS: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5000);

#[derive(Debug, Default, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub network: NetworkConfig,
    pub graph: GraphConfig,
    pub execution: ExecutionConfig,
    pub subscriptions: SubscriptionsConfig,
    pub log: LogConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;

        text.parse()
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            concurrent: self.execution.concurrent,
            timeout: self.execution.timeout,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            init_timeout: self.subscriptions.init_timeout,
            keep_alive_interval: self.subscriptions.keep_alive_interval,
            keep_alive_timeout: self.subscriptions.keep_alive_timeout,
        }
    }

    fn validate(self) -> Result<Config> {
        for path in [&self.graph.path, &self.graph.websocket_path] {
            if !path.starts_with('/') {
                return Err(Error::InvalidConfig(format!("path {path:?} must start with a slash")));
            }
        }

        if self.graph.path == self.graph.websocket_path {
            return Err(Error::InvalidConfig(
                "graph.path and graph.websocket_path must differ".to_string(),
            ));
        }

        if self.subscriptions.keep_alive_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "subscriptions.keep_alive_interval must not be zero".to_string(),
            ));
        }

        Ok(self)
    }
}

impl std::str::FromStr for Config {
    type Err = Error;

    fn from_str(text: &str) -> Result<Config> {
        toml::from_str::<Config>(text)?.validate()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    pub listen_address: SocketAddr,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            listen_address: DEFAULT_LISTEN_ADDRESS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Queries and mutations, over GET and POST.
    pub path: String,
    /// Subscriptions, over a websocket.
    pub websocket_path: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            path: "/graphql".to_string(),
            websocket_path: "/graphql/ws".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionConfig {
    pub concurrent: bool,
    #[serde(deserialize_with = "deserialize_option_duration")]
    pub timeout: Option<Duration>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        let ExecutorConfig { concurrent, timeout } = ExecutorConfig::default();
        ExecutionConfig { concurrent, timeout }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubscriptionsConfig {
    #[serde(deserialize_with = "deserialize_duration")]
    pub init_timeout: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub keep_alive_interval: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub keep_alive_timeout: Duration,
}

impl Default for SubscriptionsConfig {
    fn default() -> Self {
        let SessionConfig {
            init_timeout,
            keep_alive_interval,
            keep_alive_timeout,
        } = SessionConfig::default();

        SubscriptionsConfig {
            init_timeout,
            keep_alive_interval,
            keep_alive_timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// An `EnvFilter` directive. `RUST_LOG` takes precedence when set.
    pub filter: String,
    pub style: LogStyle,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: "info".to_string(),
            style: LogStyle::default(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStyle {
    /// Standard text
    #[default]
    Text,
    /// JSON objects
    Json,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::{Config, LogStyle};

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = "".parse().unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.network.listen_address.to_string(), "127.0.0.1:5000");
        assert_eq!(config.graph.path, "/graphql");
        assert_eq!(config.graph.websocket_path, "/graphql/ws");
        assert!(config.execution.concurrent);
        assert_eq!(config.execution.timeout, None);
        assert_eq!(config.session_config(), shapeql_engine::SessionConfig::default());
    }

    #[test]
    fn all_settings() {
        let input = indoc! {r#"
            [network]
            listen_address = "0.0.0.0:4000"

            [graph]
            path = "/api"
            websocket_path = "/api/ws"

            [execution]
            concurrent = false
            timeout = "2m"

            [subscriptions]
            init_timeout = "3s"
            keep_alive_interval = "20s"
            keep_alive_timeout = "500ms"

            [log]
            filter = "debug"
            style = "json"
        "#};

        let config: Config = input.parse().unwrap();

        assert_eq!(config.network.listen_address.to_string(), "0.0.0.0:4000");
        assert_eq!(config.graph.path, "/api");
        assert_eq!(config.graph.websocket_path, "/api/ws");

        let executor = config.executor_config();
        assert!(!executor.concurrent);
        assert_eq!(executor.timeout, Some(Duration::from_secs(120)));

        let session = config.session_config();
        assert_eq!(session.init_timeout, Duration::from_secs(3));
        assert_eq!(session.keep_alive_interval, Duration::from_secs(20));
        assert_eq!(session.keep_alive_timeout, Duration::from_millis(500));

        assert_eq!(config.log.filter, "debug");
        assert_eq!(config.log.style, LogStyle::Json);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let input = indoc! {r#"
            [graph]
            paht = "/graphql"
        "#};

        let error = input.parse::<Config>().unwrap_err().to_string();
        assert!(error.contains("unknown field `paht`"), "{error}");
    }

    #[test]
    fn endpoints_must_not_collide() {
        let input = indoc! {r#"
            [graph]
            path = "/graphql"
            websocket_path = "/graphql"
        "#};

        let error = input.parse::<Config>().unwrap_err().to_string();
        assert_eq!(
            error,
            "invalid configuration: graph.path and graph.websocket_path must differ"
        );

        let error = "[graph]\npath = \"graphql\"".parse::<Config>().unwrap_err().to_string();
        assert_eq!(error, "invalid configuration: path \"graphql\" must start with a slash");
    }

    #[test]
    fn missing_file() {
        let error = Config::load("/definitely/not/here.toml").unwrap_err().to_string();
        assert!(error.starts_with("reading /definitely/not/here.toml: "), "{error}");
    }
}
