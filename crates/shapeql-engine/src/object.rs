//! Records: the composite values resolvers hand to the engine.
//!
//! Output records implement [`Object`] so the engine can read their fields by Rust name. Input
//! records implement [`FromValue`] so arguments can be decoded into them. Both are usually
//! declared with [`record!`](crate::record) and [`input!`](crate::input).

use std::{any::TypeId, fmt, marker::PhantomData, sync::Arc};

use shapeql_schema::{NativeType, Reflect};

use crate::{FieldError, FromValue, ToValue, Value};

/// A live output record.
pub trait Object: Send + Sync + 'static {
    /// The value of the Rust field with the given name, looking through embedded records.
    fn field(&self, name: &str) -> Option<Value>;

    /// Identifies the object type of this record in the schema.
    fn native_type_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}

impl<T: Object + ?Sized> Object for Arc<T> {
    fn field(&self, name: &str) -> Option<Value> {
        (**self).field(name)
    }

    fn native_type_id(&self) -> TypeId {
        (**self).native_type_id()
    }
}

/// A value of any record embedding `M`.
///
/// Interface- and union-typed fields hold this. The concrete record types have to be known to
/// the schema, either because they are reachable from a root or through
/// [`SchemaBuilder::with_type`](shapeql_schema::SchemaBuilder::with_type).
pub struct Implementor<M> {
    object: Arc<dyn Object>,
    marker: PhantomData<fn() -> M>,
}

impl<M> Implementor<M> {
    pub fn new(object: impl Object) -> Self {
        Implementor {
            object: Arc::new(object),
            marker: PhantomData,
        }
    }
}

impl<M> Clone for Implementor<M> {
    fn clone(&self) -> Self {
        Implementor {
            object: Arc::clone(&self.object),
            marker: PhantomData,
        }
    }
}

impl<M> fmt::Debug for Implementor<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementor").finish_non_exhaustive()
    }
}

impl<M: Reflect> Reflect for Implementor<M> {
    fn native_type() -> NativeType {
        M::native_type()
    }
}

impl<M> ToValue for Implementor<M> {
    fn to_value(&self) -> Value {
        Value::Object(Arc::clone(&self.object))
    }
}

#[doc(hidden)]
pub fn __input_field<T: FromValue>(record: &mut Value, name: &str) -> Result<T, FieldError> {
    T::from_value(record.take_entry(name).unwrap_or(Value::Null))
        .map_err(|err| FieldError::new(format!("{name}: {}", err.message())))
}

/// Declares an output record: the struct itself (deriving `Clone`) plus its [`Reflect`],
/// [`Object`] and [`ToValue`] implementations.
///
/// ```ignore
/// record! {
///     pub struct Query {
///         #[field = "random(low: Int = 1, high: Int = 6)"]
///         pub random: Func<fn(i32, i32) -> Result<i32, FieldError>>,
///         pub message: String,
///         #[embed]
///         pub node: Node,
///     }
/// }
/// ```
///
/// Fields accept doc comments followed by at most one of `#[field = "<metadata>"]` or `#[embed]`.
#[macro_export]
macro_rules! record {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident {
            $($body:tt)*
        }
    ) => {
        $crate::__munch_fields! {
            @record { $(#[$attr])* $vis struct $name } []
            $($body)*
        }
    };
}

/// Declares an input record: the struct plus its [`Reflect`] and [`FromValue`]
/// implementations. Fields follow the [`record!`](crate::record) syntax.
#[macro_export]
macro_rules! input {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident {
            $($body:tt)*
        }
    ) => {
        $crate::__munch_fields! {
            @input { $(#[$attr])* $vis struct $name } []
            $($body)*
        }
    };
}

/// Implements [`Reflect`], [`ToValue`] and [`FromValue`] for a custom scalar through its
/// `Display` and `FromStr` implementations. The schema name defaults to the type name.
#[macro_export]
macro_rules! scalar {
    ($ty:ident) => {
        $crate::scalar!($ty as stringify!($ty));
    };
    ($ty:ty as $name:expr) => {
        impl $crate::Reflect for $ty {
            fn native_type() -> $crate::NativeType {
                $crate::NativeType::scalar::<Self>($name)
            }
        }

        impl $crate::ToValue for $ty {
            fn to_value(&self) -> $crate::Value {
                $crate::Value::String(::std::string::ToString::to_string(self))
            }
        }

        impl $crate::FromValue for $ty {
            fn from_value(value: $crate::Value) -> ::std::result::Result<Self, $crate::FieldError> {
                match value {
                    $crate::Value::String(text) => <$ty as ::std::str::FromStr>::from_str(&text)
                        .map_err(|err| $crate::FieldError::new(format!("invalid {}: {err}", $name))),
                    other => Err($crate::FieldError::new(format!(
                        "expected {}, found {}",
                        $name,
                        other.kind_name()
                    ))),
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __munch_fields {
    (@$kind:ident $head:tt [$($fields:tt)*]) => {
        $crate::__expand_record! { @$kind $head [$($fields)*] }
    };
    (@$kind:ident $head:tt [$($fields:tt)*]
        $(#[doc = $doc:literal])*
        #[embed]
        $fvis:vis $fname:ident : $fty:ty
        $(, $($rest:tt)*)?
    ) => {
        $crate::__munch_fields! {
            @$kind $head [$($fields)* { embed ($(#[doc = $doc])*) ($fvis) $fname ($fty) "" }]
            $($($rest)*)?
        }
    };
    (@$kind:ident $head:tt [$($fields:tt)*]
        $(#[doc = $doc:literal])*
        #[field = $meta:literal]
        $fvis:vis $fname:ident : $fty:ty
        $(, $($rest:tt)*)?
    ) => {
        $crate::__munch_fields! {
            @$kind $head [$($fields)* { field ($(#[doc = $doc])*) ($fvis) $fname ($fty) $meta }]
            $($($rest)*)?
        }
    };
    (@$kind:ident $head:tt [$($fields:tt)*]
        $(#[doc = $doc:literal])*
        $fvis:vis $fname:ident : $fty:ty
        $(, $($rest:tt)*)?
    ) => {
        $crate::__munch_fields! {
            @$kind $head [$($fields)* { field ($(#[doc = $doc])*) ($fvis) $fname ($fty) "" }]
            $($($rest)*)?
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __expand_record {
    (@record { $(#[$attr:meta])* $vis:vis struct $name:ident }
        [$({ $kind:ident ($(#[doc = $doc:literal])*) ($fvis:vis) $fname:ident ($fty:ty) $meta:literal })*]
    ) => {
        $(#[$attr])*
        #[derive(Clone)]
        $vis struct $name {
            $($(#[doc = $doc])* $fvis $fname: $fty,)*
        }

        $crate::__expand_record!(@reflect $name [$({ $kind $fname ($fty) $meta })*]);

        impl $crate::Object for $name {
            fn field(&self, name: &str) -> ::std::option::Option<$crate::Value> {
                $(
                    if name == stringify!($fname) {
                        return Some($crate::ToValue::to_value(&self.$fname));
                    }
                )*
                $($crate::__expand_record!(@lookup $kind self $fname name);)*
                None
            }
        }

        impl $crate::ToValue for $name {
            fn to_value(&self) -> $crate::Value {
                $crate::Value::Object(::std::sync::Arc::new(::std::clone::Clone::clone(self)))
            }
        }
    };
    (@input { $(#[$attr:meta])* $vis:vis struct $name:ident }
        [$({ $kind:ident ($(#[doc = $doc:literal])*) ($fvis:vis) $fname:ident ($fty:ty) $meta:literal })*]
    ) => {
        $(#[$attr])*
        $vis struct $name {
            $($(#[doc = $doc])* $fvis $fname: $fty,)*
        }

        $crate::__expand_record!(@reflect $name [$({ $kind $fname ($fty) $meta })*]);

        impl $crate::FromValue for $name {
            fn from_value(mut value: $crate::Value) -> ::std::result::Result<Self, $crate::FieldError> {
                if !matches!(value, $crate::Value::Map(_)) {
                    return Err($crate::FieldError::new(format!(
                        "expected {}, found {}",
                        stringify!($name),
                        value.kind_name()
                    )));
                }
                Ok($name {
                    $($fname: $crate::__input_field(&mut value, stringify!($fname))?,)*
                })
            }
        }
    };
    (@reflect $name:ident [$({ $kind:ident $fname:ident ($fty:ty) $meta:literal })*]) => {
        impl $crate::Reflect for $name {
            fn native_type() -> $crate::NativeType {
                $crate::NativeType::record::<Self>(
                    stringify!($name),
                    vec![$($crate::__expand_record!(@field $kind $fname ($fty) $meta)),*],
                )
            }
        }
    };
    (@field field $fname:ident ($fty:ty) $meta:literal) => {
        $crate::NativeField::new(stringify!($fname), $meta, <$fty as $crate::Reflect>::native_type)
    };
    (@field embed $fname:ident ($fty:ty) $meta:literal) => {
        $crate::NativeField::embedded(stringify!($fname), <$fty as $crate::Reflect>::native_type)
    };
    (@lookup field $this:tt $fname:ident $name:ident) => {};
    (@lookup embed $this:tt $fname:ident $name:ident) => {
        if let Some(value) = $crate::Object::field(&$this.$fname, $name) {
            return Some(value);
        }
    };
}

#[cfg(test)]
mod tests {
    use shapeql_schema::{NativeKind, Reflect};

    use crate::{FromValue, Object, Value};

    crate::record! {
        #[derive(Debug)]
        struct Named {
            name: String,
        }
    }

    crate::record! {
        /// A dog.
        #[derive(Debug)]
        struct Dog {
            #[embed]
            named: Named,
            #[field = "barks: Boolean"]
            barks: bool,
            /// How old.
            age: u8
        }
    }

    crate::input! {
        #[derive(Debug, PartialEq)]
        struct Filter {
            prefix: Option<String>,
            #[field = "limit = 10"]
            limit: i32,
        }
    }

    #[test]
    fn record_descriptions() {
        let native = Dog::native_type();
        assert_eq!(native.name(), Some("Dog"));

        let NativeKind::Record(fields) = native.kind() else {
            panic!("expected a record");
        };
        let fields: Vec<_> = fields.iter().map(|field| (field.name, field.meta, field.embedded)).collect();
        assert_eq!(
            fields,
            [("named", "", true), ("barks", "barks: Boolean", false), ("age", "", false)]
        );
    }

    #[test]
    fn fields_are_read_through_embedded_records() {
        let dog = Dog {
            named: Named { name: "Rex".into() },
            barks: true,
            age: 3,
        };

        assert!(matches!(dog.field("name"), Some(Value::String(name)) if name == "Rex"));
        assert!(matches!(dog.field("age"), Some(Value::Int(3))));
        assert!(dog.field("color").is_none());
        assert_eq!(dog.native_type_id(), std::any::TypeId::of::<Dog>());
    }

    #[test]
    fn input_records_decode_by_rust_name() {
        let value = Value::Map(vec![
            (Value::String("limit".into()), Value::Int(5)),
            (Value::String("prefix".into()), Value::Null),
        ]);
        assert_eq!(
            Filter::from_value(value),
            Ok(Filter {
                prefix: None,
                limit: 5
            })
        );

        let err = Filter::from_value(Value::Map(Vec::new())).unwrap_err();
        assert_eq!(err.message(), "limit: expected integer, found null");

        let err = Filter::from_value(Value::Int(1)).unwrap_err();
        assert_eq!(err.message(), "expected Filter, found integer");
    }
}
