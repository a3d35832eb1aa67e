use std::sync::Arc;

use shapeql_schema::{Binding, FieldNode};

use crate::{FieldError, Invocable, Object, Value};

/// The record a field is read from, together with its position in the collection it was read
/// from (if any).
#[derive(Clone)]
pub(crate) struct Parent {
    pub object: Arc<dyn Object>,
    pub key: Option<Value>,
}

impl Parent {
    pub fn new(object: Arc<dyn Object>, key: Option<Value>) -> Self {
        Parent { object, key }
    }
}

/// What the engine does to obtain a field's value.
pub(crate) enum Capability {
    /// The record holds the value itself.
    Direct(Value),
    /// A resolver to call with the field's arguments.
    Invocable(Invocable),
    /// A list or map whose elements become list items. Elements carry their index or key.
    Collection(Value),
    /// One element of a collection, selected by an argument.
    Subscript { collection: Value, argument: String },
    /// The index or key the parent record was read under.
    Key(Value),
}

impl Capability {
    pub fn bind(field: &FieldNode, parent: &Parent) -> Result<Capability, FieldError> {
        match &field.binding {
            Binding::Field { native } => Ok(match read(parent, native)? {
                Value::Function(invocable) => Capability::Invocable(invocable),
                value @ (Value::List(_) | Value::Map(_)) => Capability::Collection(value),
                value => Capability::Direct(value),
            }),
            Binding::Subscript { native, argument } => Ok(Capability::Subscript {
                collection: read(parent, native)?,
                argument: argument.clone(),
            }),
            Binding::CollectionKey => parent
                .key
                .clone()
                .map(Capability::Key)
                .ok_or_else(|| FieldError::internal(format!("{} is only available on collection elements", field.name))),
        }
    }
}

fn read(parent: &Parent, native: &str) -> Result<Value, FieldError> {
    parent
        .object
        .field(native)
        .ok_or_else(|| FieldError::internal(format!("record has no field {native}")))
}

/// Looks up the element a subscript accessor selects.
pub(crate) fn subscript(collection: &Value, key: &Value) -> Result<Value, FieldError> {
    let describe = || match key {
        Value::String(key) => format!("{key:?}"),
        Value::Int(index) => index.to_string(),
        other => other.kind_name().to_string(),
    };
    match collection {
        Value::List(_) | Value::Map(_) => collection
            .element(key)
            .cloned()
            .ok_or_else(|| FieldError::new(format!("{} not found", describe()))),
        other => Err(FieldError::unexpected("a collection", other)),
    }
}
