//! Native type descriptions.
//!
//! Rust has no runtime reflection, so every type that takes part in a schema describes
//! itself through [`Reflect`]. A description is a [`NativeType`]: the identity of the
//! Rust type, its declared name (if any) and one [`NativeKind`] out of a small closed set.
//! The type graph builder is a visitor over those kinds.

use std::{
    any::TypeId,
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use indexmap::IndexMap;

/// Lazily produces a description. Record fields refer to their types through thunks so
/// that self-referential types can be described without recursing forever.
pub type TypeThunk = fn() -> NativeType;

/// A type that can describe its own shape.
pub trait Reflect: Sized + 'static {
    fn native_type() -> NativeType;

    /// The result values of a function returning `Self`.
    ///
    /// Plain types produce a single result. `Result<T, E>` produces the value and the error,
    /// tuples produce one result per element and `()` produces none.
    fn results() -> Vec<TypeThunk> {
        vec![Self::native_type]
    }
}

#[derive(Clone)]
pub struct NativeType {
    id: TypeId,
    name: Option<&'static str>,
    kind: NativeKind,
}

#[derive(Clone)]
pub enum NativeKind {
    Bool,
    Int,
    Float,
    String,
    /// A leaf type that can be decoded from and encoded to text.
    Scalar,
    Record(Vec<NativeField>),
    Sequence(TypeThunk),
    Array(usize, TypeThunk),
    Map { key: TypeThunk, value: TypeThunk },
    Optional(TypeThunk),
    Function(FunctionSignature),
    /// A source of events, only meaningful for subscription fields.
    Stream(TypeThunk),
    Error,
    /// The cancellation context a resolver may ask for as its first parameter.
    Context,
    /// Describable, but has no schema counterpart (`()`, tuples, ...).
    Opaque,
}

#[derive(Clone)]
pub struct FunctionSignature {
    pub params: Vec<TypeThunk>,
    pub results: Vec<TypeThunk>,
}

#[derive(Clone)]
pub struct NativeField {
    /// The Rust field name, used to locate the live value at execution time.
    pub name: &'static str,
    /// The field metadata annotation.
    pub meta: &'static str,
    pub ty: TypeThunk,
    /// Embedded records contribute interfaces or union membership.
    pub embedded: bool,
}

impl NativeField {
    pub const fn new(name: &'static str, meta: &'static str, ty: TypeThunk) -> Self {
        NativeField {
            name,
            meta,
            ty,
            embedded: false,
        }
    }

    pub const fn embedded(name: &'static str, ty: TypeThunk) -> Self {
        NativeField {
            name,
            meta: "",
            ty,
            embedded: true,
        }
    }
}

impl NativeType {
    pub fn new<T: ?Sized + 'static>(name: Option<&'static str>, kind: NativeKind) -> Self {
        NativeType {
            id: TypeId::of::<T>(),
            name,
            kind,
        }
    }

    /// Describes a named record.
    pub fn record<T: ?Sized + 'static>(name: &'static str, fields: Vec<NativeField>) -> Self {
        Self::new::<T>(Some(name), NativeKind::Record(fields))
    }

    /// Describes a record without a declared name. Its schema name has to be inferred from
    /// the field or argument it is reached through.
    pub fn anonymous_record<T: ?Sized + 'static>(fields: Vec<NativeField>) -> Self {
        Self::new::<T>(None, NativeKind::Record(fields))
    }

    /// Describes a custom scalar.
    pub fn scalar<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self::new::<T>(Some(name), NativeKind::Scalar)
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    pub fn kind(&self) -> &NativeKind {
        &self.kind
    }

    pub fn fields(&self) -> &[NativeField] {
        match &self.kind {
            NativeKind::Record(fields) => fields,
            _ => &[],
        }
    }

    /// Strips optional indirections.
    pub fn without_indirection(&self) -> NativeType {
        match &self.kind {
            NativeKind::Optional(inner) => inner().without_indirection(),
            _ => self.clone(),
        }
    }

    pub fn describe(&self) -> String {
        match (&self.kind, self.name) {
            (_, Some(name)) => name.to_string(),
            (NativeKind::Bool, _) => "bool".into(),
            (NativeKind::Int, _) => "integer".into(),
            (NativeKind::Float, _) => "float".into(),
            (NativeKind::String, _) => "string".into(),
            (NativeKind::Scalar, _) => "scalar".into(),
            (NativeKind::Record(_), _) => "anonymous record".into(),
            (NativeKind::Sequence(item), _) => format!("sequence of {}", item().describe()),
            (NativeKind::Array(len, item), _) => format!("array of {len} {}", item().describe()),
            (NativeKind::Map { key, value }, _) => {
                format!("map from {} to {}", key().describe(), value().describe())
            }
            (NativeKind::Optional(inner), _) => format!("optional {}", inner().describe()),
            (NativeKind::Function(_), _) => "function".into(),
            (NativeKind::Stream(item), _) => format!("stream of {}", item().describe()),
            (NativeKind::Error, _) => "error".into(),
            (NativeKind::Context, _) => "context".into(),
            (NativeKind::Opaque, _) => "opaque type".into(),
        }
    }
}

impl fmt::Debug for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

macro_rules! impl_reflect_leaf {
    ($kind:ident => $($ty:ty),*) => {
        $(
            impl Reflect for $ty {
                fn native_type() -> NativeType {
                    NativeType::new::<$ty>(None, NativeKind::$kind)
                }
            }
        )*
    };
}

impl_reflect_leaf!(Bool => bool);
impl_reflect_leaf!(Int => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
impl_reflect_leaf!(Float => f32, f64);
impl_reflect_leaf!(String => String, &'static str);

impl Reflect for () {
    fn native_type() -> NativeType {
        NativeType::new::<()>(None, NativeKind::Opaque)
    }

    fn results() -> Vec<TypeThunk> {
        Vec::new()
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn native_type() -> NativeType {
        NativeType::new::<Self>(None, NativeKind::Optional(T::native_type))
    }
}

impl<T: Reflect> Reflect for Arc<T> {
    fn native_type() -> NativeType {
        T::native_type()
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn native_type() -> NativeType {
        T::native_type()
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn native_type() -> NativeType {
        NativeType::new::<Self>(None, NativeKind::Sequence(T::native_type))
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn native_type() -> NativeType {
        NativeType::new::<Self>(None, NativeKind::Array(N, T::native_type))
    }
}

impl<K: Reflect, V: Reflect, S: 'static> Reflect for HashMap<K, V, S> {
    fn native_type() -> NativeType {
        NativeType::new::<Self>(
            None,
            NativeKind::Map {
                key: K::native_type,
                value: V::native_type,
            },
        )
    }
}

impl<K: Reflect, V: Reflect> Reflect for BTreeMap<K, V> {
    fn native_type() -> NativeType {
        NativeType::new::<Self>(
            None,
            NativeKind::Map {
                key: K::native_type,
                value: V::native_type,
            },
        )
    }
}

impl<K: Reflect, V: Reflect, S: 'static> Reflect for IndexMap<K, V, S> {
    fn native_type() -> NativeType {
        NativeType::new::<Self>(
            None,
            NativeKind::Map {
                key: K::native_type,
                value: V::native_type,
            },
        )
    }
}

impl<T: Reflect, E: Reflect> Reflect for Result<T, E> {
    fn native_type() -> NativeType {
        NativeType::new::<Self>(None, NativeKind::Opaque)
    }

    fn results() -> Vec<TypeThunk> {
        vec![T::native_type, E::native_type]
    }
}

macro_rules! impl_reflect_tuple {
    ($($item:ident),+) => {
        impl<$($item: Reflect),+> Reflect for ($($item,)+) {
            fn native_type() -> NativeType {
                NativeType::new::<Self>(None, NativeKind::Opaque)
            }

            fn results() -> Vec<TypeThunk> {
                vec![$(<$item as Reflect>::native_type as TypeThunk),+]
            }
        }
    };
}

impl_reflect_tuple!(A, B);
impl_reflect_tuple!(A, B, C);

macro_rules! impl_reflect_fn {
    ($($param:ident),*) => {
        impl<$($param: Reflect,)* R: Reflect> Reflect for fn($($param),*) -> R {
            fn native_type() -> NativeType {
                NativeType::new::<Self>(
                    None,
                    NativeKind::Function(FunctionSignature {
                        params: vec![$(<$param as Reflect>::native_type as TypeThunk),*],
                        results: R::results(),
                    }),
                )
            }
        }
    };
}

impl_reflect_fn!();
impl_reflect_fn!(A);
impl_reflect_fn!(A, B);
impl_reflect_fn!(A, B, C);
impl_reflect_fn!(A, B, C, D);
