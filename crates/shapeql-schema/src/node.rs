use std::{any::TypeId, collections::BTreeSet};

use async_graphql_value::ConstValue;
use indexmap::IndexMap;

use crate::TypeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
pub enum TypeKind {
    #[strum(serialize = "scalar")]
    Scalar,
    #[strum(serialize = "enum")]
    Enum,
    #[strum(serialize = "object")]
    Object,
    #[strum(serialize = "interface")]
    Interface,
    #[strum(serialize = "input")]
    Input,
    #[strum(serialize = "union")]
    Union,
}

impl TypeKind {
    pub fn is_composite(self) -> bool {
        matches!(self, TypeKind::Object | TypeKind::Interface | TypeKind::Union)
    }

    pub fn is_abstract(self) -> bool {
        matches!(self, TypeKind::Interface | TypeKind::Union)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeNode {
    pub kind: TypeKind,
    pub name: String,
    pub description: Option<String>,
    /// Object, interface and input fields in declaration order.
    pub fields: IndexMap<String, FieldNode>,
    pub implements: BTreeSet<String>,
    pub members: BTreeSet<String>,
    pub values: Vec<EnumValue>,
    /// The Rust type this node was derived from. Enums and built-in scalars have none.
    pub native: Option<TypeId>,
}

impl TypeNode {
    pub(crate) fn new(kind: TypeKind, name: impl Into<String>, native: Option<TypeId>) -> Self {
        TypeNode {
            kind,
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
            implements: BTreeSet::new(),
            members: BTreeSet::new(),
            values: Vec::new(),
            native,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.fields.get(name)
    }

    pub fn enum_value(&self, ordinal: i64) -> Option<&EnumValue> {
        usize::try_from(ordinal).ok().and_then(|index| self.values.get(index))
    }

    pub fn enum_ordinal(&self, name: &str) -> Option<usize> {
        self.values.iter().position(|value| value.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub name: String,
    pub ty: TypeRef,
    pub arguments: IndexMap<String, ArgumentNode>,
    pub description: Option<String>,
    pub binding: Binding,
    pub cache: CacheHint,
}

impl FieldNode {
    pub fn is_nullable(&self) -> bool {
        self.ty.is_nullable()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentNode {
    pub name: String,
    pub ty: TypeRef,
    pub default: Option<ConstValue>,
    pub description: Option<String>,
}

/// Where the live value of a field is found at execution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// The record field with this Rust name. It holds a plain value, a resolver function or
    /// a collection.
    Field { native: String },
    /// One element of the collection held by the record field, selected by an argument.
    Subscript { native: String, argument: String },
    /// The index or key of the current element within the collection it was read from.
    CollectionKey,
}

/// A per-field caching hint.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheHint {
    #[default]
    Inherit,
    NoCache,
    MaxAge(u32),
}

impl CacheHint {
    /// Combines the hints of two fields of the same response.
    #[must_use]
    pub fn merge(self, other: CacheHint) -> CacheHint {
        match (self, other) {
            (CacheHint::NoCache, _) | (_, CacheHint::NoCache) => CacheHint::NoCache,
            (CacheHint::MaxAge(a), CacheHint::MaxAge(b)) => CacheHint::MaxAge(a.min(b)),
            (CacheHint::Inherit, hint) | (hint, CacheHint::Inherit) => hint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_hints_merge_to_the_most_restrictive() {
        assert_eq!(CacheHint::Inherit.merge(CacheHint::MaxAge(30)), CacheHint::MaxAge(30));
        assert_eq!(CacheHint::MaxAge(60).merge(CacheHint::MaxAge(30)), CacheHint::MaxAge(30));
        assert_eq!(CacheHint::MaxAge(60).merge(CacheHint::NoCache), CacheHint::NoCache);
        assert_eq!(CacheHint::Inherit.merge(CacheHint::Inherit), CacheHint::Inherit);
    }
}
