use crate::{Request, Response, ServerError};

use super::messages::{Event, LegacyErrorPayload, LegacyEvent, LegacyMessage, Message};

/// The subscription sub-protocol spoken on a connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::IntoStaticStr, strum::EnumIter)]
pub enum Protocol {
    #[default]
    #[strum(serialize = "graphql-transport-ws")]
    GraphqlTransportWs,
    #[strum(serialize = "graphql-ws")]
    GraphqlWs,
}

impl Protocol {
    /// Picks the first sub-protocol the client offers that is supported, defaulting to
    /// `graphql-transport-ws`.
    pub fn negotiate<'a>(offered: impl IntoIterator<Item = &'a str>) -> Protocol {
        offered
            .into_iter()
            .find_map(|name| name.trim().parse().ok())
            .unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Every supported sub-protocol name.
    pub fn names() -> impl Iterator<Item = &'static str> {
        <Protocol as strum::IntoEnumIterator>::iter().map(Protocol::name)
    }

    pub(super) fn decode(self, text: &str) -> Result<ClientEvent, serde_json::Error> {
        Ok(match self {
            Protocol::GraphqlTransportWs => match serde_json::from_str(text)? {
                Event::ConnectionInit { .. } => ClientEvent::Init,
                Event::Subscribe { id, payload } => ClientEvent::Subscribe { id, request: payload },
                Event::Complete { id } => ClientEvent::Stop { id },
                Event::Ping { payload } => ClientEvent::Ping(payload),
                Event::Pong { .. } => ClientEvent::Pong,
            },
            Protocol::GraphqlWs => match serde_json::from_str(text)? {
                LegacyEvent::ConnectionInit { .. } => ClientEvent::Init,
                LegacyEvent::Start { id, payload } => ClientEvent::Subscribe { id, request: payload },
                LegacyEvent::Stop { id } => ClientEvent::Stop { id },
                LegacyEvent::ConnectionTerminate => ClientEvent::Terminate,
            },
        })
    }

    /// Renders an event for the wire. Events the protocol has no message for produce nothing.
    pub(super) fn encode(self, event: &ServerEvent) -> Option<Frame> {
        let text = match (self, event) {
            (_, ServerEvent::Close { code, reason }) => {
                return Some(Frame::Close {
                    code: *code,
                    reason: reason.clone(),
                })
            }
            (Protocol::GraphqlTransportWs, event) => serde_json::to_string(&match event {
                ServerEvent::Ack => Message::ConnectionAck,
                ServerEvent::KeepAlive => Message::Ping,
                ServerEvent::Pong(payload) => Message::Pong {
                    payload: payload.as_ref(),
                },
                ServerEvent::Next { id, response } => Message::Next { id, payload: response },
                ServerEvent::Error { id, errors } => Message::Error { id, payload: errors },
                ServerEvent::Complete { id } => Message::Complete { id },
                ServerEvent::ConnectionError(_) | ServerEvent::Close { .. } => return None,
            }),
            (Protocol::GraphqlWs, event) => serde_json::to_string(&match event {
                ServerEvent::Ack => LegacyMessage::ConnectionAck,
                ServerEvent::KeepAlive => LegacyMessage::KeepAlive,
                ServerEvent::Next { id, response } => LegacyMessage::Data { id, payload: response },
                ServerEvent::Error { id, errors } => LegacyMessage::Error { id, payload: errors },
                ServerEvent::Complete { id } => LegacyMessage::Complete { id },
                ServerEvent::ConnectionError(message) => LegacyMessage::ConnectionError {
                    payload: LegacyErrorPayload { message },
                },
                ServerEvent::Pong(_) | ServerEvent::Close { .. } => return None,
            }),
        };

        match text {
            Ok(text) => Some(Frame::Text(text)),
            Err(err) => {
                tracing::warn!("could not encode websocket message: {err}");
                None
            }
        }
    }
}

/// A frame to write to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close { code: u16, reason: String },
}

/// A client message, independent of the protocol it arrived in.
#[derive(Debug)]
pub(super) enum ClientEvent {
    Init,
    Subscribe { id: String, request: Request },
    Stop { id: String },
    Ping(Option<serde_json::Value>),
    Pong,
    Terminate,
}

/// A server message, independent of the protocol it is sent in.
#[derive(Debug)]
pub(super) enum ServerEvent {
    Ack,
    KeepAlive,
    Pong(Option<serde_json::Value>),
    Next { id: String, response: Response },
    Error { id: String, errors: Vec<ServerError> },
    Complete { id: String },
    ConnectionError(String),
    Close { code: u16, reason: String },
}

impl ServerEvent {
    pub fn close(code: u16, reason: impl Into<String>) -> Self {
        ServerEvent::Close {
            code,
            reason: reason.into(),
        }
    }
}
