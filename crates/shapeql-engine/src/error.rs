use std::fmt;

use async_graphql_parser::Pos;
use shapeql_schema::{NativeKind, NativeType, Reflect};

use crate::{
    response::{ResponsePath, ServerError},
    Value,
};

/// An error produced while resolving a single field.
///
/// Resolvers return it as the second result of a function field. It ends up in the response
/// `errors` list with the location and path of the field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FieldError {
    message: String,
}

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        FieldError {
            message: message.into(),
        }
    }

    /// A fault that is not the client's doing.
    pub fn internal(message: impl fmt::Display) -> Self {
        FieldError::new(format!("internal error: {message}"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn unexpected(expected: &str, found: &Value) -> Self {
        FieldError::new(format!("expected {expected}, found {}", found.kind_name()))
    }

    pub(crate) fn into_server_error(self, pos: Pos, path: &ResponsePath) -> ServerError {
        ServerError::new(self.message).at(pos).with_path(path)
    }
}

impl Reflect for FieldError {
    fn native_type() -> NativeType {
        NativeType::new::<Self>(None, NativeKind::Error)
    }
}
