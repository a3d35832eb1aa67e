//! Message definitions for the [GraphQLOverWebsocket protocol][1] and the legacy
//! [`graphql-ws` protocol][2].
//!
//! [1]: https://github.com/enisdenjo/graphql-ws/blob/master/PROTOCOL.md
//! [2]: https://github.com/apollographql/subscriptions-transport-ws/blob/master/PROTOCOL.md

use crate::{Request, Response, ServerError};

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(super) enum Event {
    /// The payload is accepted and ignored.
    ConnectionInit {},
    Subscribe {
        id: String,
        payload: Request,
    },
    Complete {
        id: String,
    },
    Ping {
        #[serde(default)]
        payload: Option<serde_json::Value>,
    },
    Pong {},
}

#[derive(Debug, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(super) enum Message<'a> {
    ConnectionAck,
    Next {
        id: &'a str,
        payload: &'a Response,
    },
    Error {
        id: &'a str,
        payload: &'a [ServerError],
    },
    Complete {
        id: &'a str,
    },
    Ping,
    Pong {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<&'a serde_json::Value>,
    },
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(super) enum LegacyEvent {
    /// The payload is accepted and ignored.
    ConnectionInit {},
    Start {
        id: String,
        payload: Request,
    },
    Stop {
        id: String,
    },
    ConnectionTerminate,
}

#[derive(Debug, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(super) enum LegacyMessage<'a> {
    ConnectionAck,
    ConnectionError {
        payload: LegacyErrorPayload<'a>,
    },
    #[serde(rename = "ka")]
    KeepAlive,
    Data {
        id: &'a str,
        payload: &'a Response,
    },
    Error {
        id: &'a str,
        payload: &'a [ServerError],
    },
    Complete {
        id: &'a str,
    },
}

#[derive(Debug, serde::Serialize)]
pub(super) struct LegacyErrorPayload<'a> {
    pub message: &'a str,
}
