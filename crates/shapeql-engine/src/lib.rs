//! Executes GraphQL operations against live Rust values.
//!
//! Records declared with [`record!`] hold plain values, resolver functions ([`Func`]) and
//! collections. Together with a [`Schema`] derived from the same types, an [`Executor`] answers
//! queries and mutations, and a [`websocket::Session`] serves subscriptions.

mod binder;
mod coerce;
mod config;
mod context;
mod error;
mod executor;
mod func;
mod object;
mod request;
mod response;
mod value;
pub mod websocket;

pub use config::{ExecutorConfig, SessionConfig};
pub use context::Context;
pub use error::FieldError;
pub use executor::{Executor, ExecutorBuilder};
pub use func::{Call, EventStream, Func, IntoFieldResult, IntoInvocable, Invocable, Param, ResolverFuture};
#[doc(hidden)]
pub use object::__input_field;
pub use object::{Implementor, Object};
pub use request::Request;
pub use response::{Location, PathSegment, Response, ServerError};
pub use value::{FromValue, SourceStream, ToValue, Value};

pub use shapeql_schema::{
    BuildError, CacheHint, EnumTable, NativeField, NativeKind, NativeType, Reflect, Schema, SchemaBuilder,
};
