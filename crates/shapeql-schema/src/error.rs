/// Everything that can go wrong while deriving a schema.
///
/// Any of these aborts the whole build: there is no partial schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("{location}: unhandled type {native}")]
    UnhandledType { location: String, native: String },
    #[error("{location}: cannot resolve the element type of {native}")]
    MissingElementType { location: String, native: String },
    #[error("{location}: function has no return value")]
    NoReturnValue { location: String },
    #[error("{location}: {reason}")]
    InvalidFunction { location: String, reason: String },
    #[error("{location}: cannot infer a name for an anonymous type")]
    AnonymousType { location: String },
    #[error("same name used for different GraphQL types: {name} is used as both {first} and {second}")]
    ConflictingKinds {
        name: String,
        first: &'static str,
        second: &'static str,
    },
    #[error("type name {name} is used by two different types")]
    DuplicateTypeName { name: String },
    #[error("{owner}: duplicate field {name}")]
    DuplicateField { owner: String, name: String },
    #[error("{location}: invalid name {name:?}")]
    InvalidName { location: String, name: String },
    #[error("{location}: malformed metadata {meta:?}: {reason}")]
    Metadata {
        location: String,
        meta: String,
        reason: String,
    },
    #[error("{location}: metadata declares {declared} arguments but the function takes {actual}")]
    ArgumentCount {
        location: String,
        declared: usize,
        actual: usize,
    },
    #[error("{location}: unknown type {name}")]
    UnknownType { location: String, name: String },
    #[error("{location}: {native} cannot be used as {name}")]
    IncompatibleType {
        location: String,
        native: String,
        name: String,
    },
    #[error("{location}: invalid default value {literal}: {reason}")]
    InvalidDefault {
        location: String,
        literal: String,
        reason: String,
    },
    #[error("enum {name}: {reason}")]
    InvalidEnum { name: String, reason: String },
    #[error("{location}: {reason}")]
    InvalidEmbedding { location: String, reason: String },
    #[error("{kind} type {name} defines no fields")]
    EmptyType { kind: &'static str, name: String },
    #[error("a schema needs a query root type")]
    MissingQuery,
}
