//! Subscriptions over a persistent connection.
//!
//! The transport is left to the embedder: a [`Session`] consumes the text of incoming messages
//! and produces [`Frame`]s, speaking either `graphql-transport-ws` or the legacy `graphql-ws`
//! protocol.

mod messages;
mod protocol;
mod session;

pub use protocol::{Frame, Protocol};
pub use session::Session;
