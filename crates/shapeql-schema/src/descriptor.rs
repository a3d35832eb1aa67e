//! Maps native type descriptions to type references, registering the named types they
//! introduce along the way.

use crate::{
    names,
    native::{NativeKind, NativeType, TypeThunk},
    BuildError, SchemaBuilder, TypeKind, TypeNode, TypeRef,
};

/// Where a type is used.
#[derive(Clone, Copy)]
pub(crate) struct Site<'s> {
    pub location: &'s str,
    /// The `:TypeName` of the field metadata.
    pub override_name: Option<&'s str>,
    /// Names anonymous records after the field or argument they are reached through.
    pub infer_name: &'s str,
    pub input: bool,
    /// Event streams are only accepted by subscription root fields.
    pub stream: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub ty: TypeRef,
    pub is_scalar: bool,
}

impl SchemaBuilder<'_> {
    pub(crate) fn resolve(&mut self, native: &NativeType, site: &Site<'_>) -> Result<Resolved, BuildError> {
        match native.kind() {
            NativeKind::Bool => self.leaf(native, names::BOOLEAN, site),
            NativeKind::Int => self.leaf(native, names::INT, site),
            NativeKind::Float => self.leaf(native, names::FLOAT, site),
            NativeKind::String => self.leaf(native, names::STRING, site),
            NativeKind::Scalar => {
                let name = self.add_scalar(native, site)?;
                self.leaf(native, name, site)
            }
            NativeKind::Record(_) => self.composite(native, site),
            NativeKind::Sequence(item) | NativeKind::Array(_, item) => self.list(native, *item, site),
            NativeKind::Map { value, .. } if !site.input => self.list(native, *value, site),
            NativeKind::Optional(inner) => {
                let resolved = self.resolve(&inner(), site)?;
                Ok(Resolved {
                    ty: resolved.ty.nullable(),
                    ..resolved
                })
            }
            NativeKind::Stream(item) if site.stream => self.resolve(&item(), &Site { stream: false, ..*site }),
            _ => Err(BuildError::UnhandledType {
                location: site.location.to_string(),
                native: native.describe(),
            }),
        }
    }

    fn leaf(&self, native: &NativeType, builtin: &str, site: &Site<'_>) -> Result<Resolved, BuildError> {
        let name = match site.override_name {
            None => builtin,
            Some(name) if name == builtin => name,
            Some(name) if name == names::ID && matches!(native.kind(), NativeKind::Int | NativeKind::String) => name,
            Some(name) if matches!(native.kind(), NativeKind::Int) && self.enums.contains(name) => name,
            Some(name) if self.types.contains_key(name) || names::is_builtin_scalar(name) => {
                return Err(BuildError::IncompatibleType {
                    location: site.location.to_string(),
                    native: native.describe(),
                    name: name.to_string(),
                })
            }
            Some(name) => {
                return Err(BuildError::UnknownType {
                    location: site.location.to_string(),
                    name: name.to_string(),
                })
            }
        };

        Ok(Resolved {
            ty: TypeRef::named(name).non_null(),
            is_scalar: true,
        })
    }

    fn add_scalar(&mut self, native: &NativeType, site: &Site<'_>) -> Result<&'static str, BuildError> {
        let Some(name) = native.name() else {
            return Err(BuildError::AnonymousType {
                location: site.location.to_string(),
            });
        };

        match self.types.get(name) {
            Some(node) if node.kind == TypeKind::Scalar && node.native == Some(native.id()) => {}
            Some(_) => return Err(BuildError::DuplicateTypeName { name: name.to_string() }),
            None => {
                self.claim_name(name, site.location)?;
                tracing::debug!(name, "adding custom scalar");
                self.types.insert(
                    name.to_string(),
                    TypeNode::new(TypeKind::Scalar, name, Some(native.id())),
                );
            }
        }

        Ok(name)
    }

    fn composite(&mut self, native: &NativeType, site: &Site<'_>) -> Result<Resolved, BuildError> {
        let kind = if site.input { TypeKind::Input } else { TypeKind::Object };

        let inferred;
        let preferred = match (site.override_name, native.name()) {
            (Some(name), _) => Some(name),
            (None, Some(_)) => None,
            (None, None) if site.infer_name.is_empty() => {
                return Err(BuildError::AnonymousType {
                    location: site.location.to_string(),
                })
            }
            (None, None) => {
                inferred = names::type_name(site.infer_name);
                Some(inferred.as_str())
            }
        };

        let name = self.add(preferred, native, kind)?;

        if let Some(expected) = site.override_name.filter(|expected| *expected != name) {
            return Err(BuildError::IncompatibleType {
                location: site.location.to_string(),
                native: name,
                name: expected.to_string(),
            });
        }

        Ok(Resolved {
            ty: TypeRef::named(name).non_null(),
            is_scalar: false,
        })
    }

    fn list(&mut self, native: &NativeType, item: TypeThunk, site: &Site<'_>) -> Result<Resolved, BuildError> {
        let item = self.resolve(&item(), site).map_err(|err| match err {
            BuildError::UnhandledType { location, .. } => BuildError::MissingElementType {
                location,
                native: native.describe(),
            },
            err => err,
        })?;

        Ok(Resolved {
            ty: item.ty.list().non_null(),
            is_scalar: item.is_scalar,
        })
    }

    /// The key type and the element description of a collection.
    pub(crate) fn collection_parts(
        &self,
        location: &str,
        native: &NativeType,
    ) -> Result<Option<(TypeRef, NativeType)>, BuildError> {
        match native.without_indirection().kind() {
            NativeKind::Sequence(item) | NativeKind::Array(_, item) => {
                Ok(Some((TypeRef::named(names::INT).non_null(), item())))
            }
            NativeKind::Map { key, value } => {
                let key = key();
                let key_type = match key.kind() {
                    NativeKind::String => names::STRING,
                    NativeKind::Int => names::INT,
                    _ => {
                        return Err(BuildError::IncompatibleType {
                            location: location.to_string(),
                            native: key.describe(),
                            name: "a map key".into(),
                        })
                    }
                };
                Ok(Some((TypeRef::named(key_type).non_null(), value())))
            }
            _ => Ok(None),
        }
    }

    pub(crate) fn claim_name(&self, name: &str, location: &str) -> Result<(), BuildError> {
        if !names::is_valid_name(name) || names::is_reserved(name) || names::is_builtin_scalar(name) {
            return Err(BuildError::InvalidName {
                location: location.to_string(),
                name: name.to_string(),
            });
        }
        if self.types.contains_key(name) {
            return Err(BuildError::DuplicateTypeName { name: name.to_string() });
        }
        Ok(())
    }
}
