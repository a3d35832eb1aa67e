//! Serves a [`shapeql_engine::Executor`] over HTTP, with subscriptions over a websocket.

mod config;
mod error;
mod server;
pub mod telemetry;

pub use config::{Config, ExecutionConfig, GraphConfig, LogConfig, LogStyle, NetworkConfig, SubscriptionsConfig};
pub use error::{Error, Result};
pub use server::{router, serve};
