//! Live values as the engine sees them.
//!
//! Resolver state is ordinary Rust data. Everything the engine reads out of it passes through
//! [`ToValue`] and ends up as a [`Value`]; everything it hands to resolvers is a [`Value`] decoded
//! through [`FromValue`].

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::{Arc, Mutex},
};

use futures_util::{stream::BoxStream, Stream, StreamExt};
use indexmap::IndexMap;

use crate::{FieldError, Invocable, Object};

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    /// Key/value pairs in iteration order. Associative collections on output, input objects
    /// keyed by Rust field name on input.
    Map(Vec<(Value, Value)>),
    Object(Arc<dyn Object>),
    Function(Invocable),
    Stream(SourceStream),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Stream(_) => "stream",
        }
    }

    /// Removes the entry with the given string key from a map value.
    pub fn take_entry(&mut self, key: &str) -> Option<Value> {
        let Value::Map(entries) = self else {
            return None;
        };
        let position = entries
            .iter()
            .position(|(entry, _)| matches!(entry, Value::String(name) if name == key))?;
        Some(entries.remove(position).1)
    }

    /// Looks up an element of a list (by index) or a map (by key).
    pub fn element(&self, key: &Value) -> Option<&Value> {
        match (self, key) {
            (Value::List(items), Value::Int(index)) => usize::try_from(*index).ok().and_then(|index| items.get(index)),
            (Value::Map(entries), key) => entries
                .iter()
                .find(|(entry, _)| entry.same_key(key))
                .map(|(_, value)| value),
            _ => None,
        }
    }

    fn same_key(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(a), Value::String(b)) | (Value::String(b), Value::Int(a)) => b.parse() == Ok(*a),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Value::Int(value) => f.debug_tuple("Int").field(value).finish(),
            Value::Float(value) => f.debug_tuple("Float").field(value).finish(),
            Value::String(value) => f.debug_tuple("String").field(value).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Value::Object(_) => f.write_str("Object(..)"),
            Value::Function(_) => f.write_str("Function(..)"),
            Value::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// An event source produced by a subscription resolver. It can be consumed once.
#[derive(Clone)]
pub struct SourceStream(Arc<Mutex<Option<BoxStream<'static, Value>>>>);

impl SourceStream {
    pub fn new(stream: impl Stream<Item = Value> + Send + 'static) -> Self {
        SourceStream(Arc::new(Mutex::new(Some(stream.boxed()))))
    }

    pub fn take(&self) -> Option<BoxStream<'static, Value>> {
        self.0.lock().ok()?.take()
    }
}

/// Converts resolver state into a [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Decodes an argument or input field.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, FieldError>;
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, FieldError> {
        Ok(value)
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, FieldError> {
        match value {
            Value::Bool(value) => Ok(value),
            other => Err(FieldError::unexpected("boolean", &other)),
        }
    }
}

macro_rules! impl_int {
    ($($ty:ty),*) => {
        $(
            impl ToValue for $ty {
                #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
                fn to_value(&self) -> Value {
                    i64::try_from(*self).map_or_else(|_| Value::Float(*self as f64), Value::Int)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, FieldError> {
                    // IDs reach integer parameters as text.
                    let number = match value {
                        Value::Int(number) => number,
                        Value::String(text) => text
                            .parse::<i64>()
                            .map_err(|_| FieldError::new(format!("{text:?} is not an integer")))?,
                        other => return Err(FieldError::unexpected("integer", &other)),
                    };
                    <$ty>::try_from(number)
                        .map_err(|_| FieldError::new(format!("{number} is out of range for {}", stringify!($ty))))
                }
            }
        )*
    };
}

impl_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl FromValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: Value) -> Result<Self, FieldError> {
        match value {
            Value::Float(number) => Ok(number),
            Value::Int(number) => Ok(number as f64),
            other => Err(FieldError::unexpected("float", &other)),
        }
    }
}

impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Result<Self, FieldError> {
        f64::from_value(value).map(|number| number as f32)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_owned())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, FieldError> {
        match value {
            Value::String(text) => Ok(text),
            other => Err(FieldError::unexpected("string", &other)),
        }
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for Arc<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: FromValue> FromValue for Arc<T> {
    fn from_value(value: Value) -> Result<Self, FieldError> {
        T::from_value(value).map(Arc::new)
    }
}

impl<T: ToValue + ?Sized> ToValue for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: FromValue> FromValue for Box<T> {
    fn from_value(value: Value) -> Result<Self, FieldError> {
        T::from_value(value).map(Box::new)
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, FieldError> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, FieldError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(FieldError::unexpected("list", &other)),
        }
    }
}

impl<T: ToValue, const N: usize> ToValue for [T; N] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_value).collect())
    }
}

fn entries<'a, K, V>(iter: impl Iterator<Item = (&'a K, &'a V)>) -> Value
where
    K: ToValue + 'a,
    V: ToValue + 'a,
{
    Value::Map(iter.map(|(key, value)| (key.to_value(), value.to_value())).collect())
}

impl<K: ToValue, V: ToValue, S> ToValue for HashMap<K, V, S> {
    fn to_value(&self) -> Value {
        entries(self.iter())
    }
}

impl<K: ToValue, V: ToValue> ToValue for BTreeMap<K, V> {
    fn to_value(&self) -> Value {
        entries(self.iter())
    }
}

impl<K: ToValue, V: ToValue, S> ToValue for IndexMap<K, V, S> {
    fn to_value(&self) -> Value {
        entries(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_accept_numeric_text() {
        assert_eq!(i32::from_value(Value::String("42".into())), Ok(42));
        assert_eq!(u8::from_value(Value::Int(7)), Ok(7));

        let err = u8::from_value(Value::Int(300)).unwrap_err();
        assert_eq!(err.message(), "300 is out of range for u8");

        let err = i64::from_value(Value::String("forty".into())).unwrap_err();
        assert_eq!(err.message(), "\"forty\" is not an integer");
    }

    #[test]
    fn options_and_lists() {
        assert_eq!(Option::<bool>::from_value(Value::Null), Ok(None));
        assert_eq!(
            Vec::<Option<i32>>::from_value(Value::List(vec![Value::Int(1), Value::Null])),
            Ok(vec![Some(1), None])
        );

        let err = Vec::<i32>::from_value(Value::Bool(true)).unwrap_err();
        assert_eq!(err.message(), "expected list, found boolean");
    }

    #[test]
    fn map_lookup() {
        let map = BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 2)]).to_value();
        assert!(matches!(map.element(&Value::String("b".into())), Some(Value::Int(2))));
        assert!(map.element(&Value::String("c".into())).is_none());

        let list = vec![10, 20].to_value();
        assert!(matches!(list.element(&Value::Int(1)), Some(Value::Int(20))));
        assert!(list.element(&Value::Int(2)).is_none());
        assert!(list.element(&Value::Int(-1)).is_none());

        let by_number = HashMap::from([(3_u32, "three")]).to_value();
        assert!(matches!(by_number.element(&Value::String("3".into())), Some(Value::String(text)) if text == "three"));
    }

    #[test]
    fn input_records() {
        let mut record = Value::Map(vec![(Value::String("name".into()), Value::String("Rex".into()))]);
        assert!(matches!(record.take_entry("name"), Some(Value::String(name)) if name == "Rex"));
        assert!(record.take_entry("name").is_none());
    }
}
