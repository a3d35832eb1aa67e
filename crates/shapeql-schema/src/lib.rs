//! Derives a GraphQL schema from native Rust type descriptions.
//!
//! Types describe themselves through [`Reflect`]. The [`SchemaBuilder`] walks those descriptions
//! from the root types, memoizing on type identity, and produces an immutable [`Schema`]: a graph
//! of named [`TypeNode`]s plus its rendered schema text.

mod builder;
mod descriptor;
mod enums;
mod error;
mod literal;
mod meta;
pub mod names;
pub mod native;
mod node;
mod schema;
mod sdl;
mod type_ref;

pub use async_graphql_parser::types::OperationType;
pub use async_graphql_value::ConstValue;
pub use builder::SchemaBuilder;
pub use enums::EnumTable;
pub use error::BuildError;
pub use meta::{ArgumentMeta, FieldMeta};
pub use native::{NativeField, NativeKind, NativeType, Reflect, TypeThunk};
pub use node::{ArgumentNode, Binding, CacheHint, EnumValue, FieldNode, TypeKind, TypeNode};
pub use schema::Schema;
pub use type_ref::TypeRef;
