use std::{
    any::TypeId,
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
};

use async_graphql_parser::types::OperationType;
use indexmap::IndexMap;

use crate::{
    descriptor::Site,
    literal,
    meta::FieldMeta,
    names,
    native::{NativeField, NativeKind, NativeType, Reflect, TypeThunk},
    ArgumentNode, Binding, BuildError, CacheHint, EnumTable, FieldNode, Schema, TypeKind, TypeNode, TypeRef,
};

/// Derives a [`Schema`] from native type descriptions.
///
/// ```ignore
/// let schema = Schema::builder(&enums)
///     .query::<Query>()
///     .mutation::<Mutation>()
///     .finish()?;
/// ```
///
/// The first error aborts the build and is returned by [`SchemaBuilder::finish`].
pub struct SchemaBuilder<'a> {
    pub(crate) enums: &'a EnumTable,
    pub(crate) types: BTreeMap<String, TypeNode>,
    used_as: HashMap<TypeId, (String, TypeKind)>,
    in_progress: HashSet<TypeId>,
    query: Option<String>,
    mutation: Option<String>,
    subscription: Option<String>,
    subscription_root: Option<TypeId>,
    collection_keys: Vec<CollectionKey>,
    defaults: Vec<DefaultCheck>,
    error: Option<BuildError>,
}

/// A fabricated field exposing the index or key of a collection element.
struct CollectionKey {
    owner: String,
    name: String,
    ty: TypeRef,
    location: String,
}

/// Default values are checked once every type they may refer to exists.
struct DefaultCheck {
    owner: String,
    field: String,
    argument: String,
    literal: String,
    location: String,
}

#[derive(Default)]
struct Collected {
    fields: IndexMap<String, FieldNode>,
    implements: BTreeSet<String>,
}

impl Collected {
    fn insert(&mut self, owner: &str, field: FieldNode) -> Result<(), BuildError> {
        if self.fields.contains_key(&field.name) {
            return Err(BuildError::DuplicateField {
                owner: owner.to_string(),
                name: field.name,
            });
        }
        self.fields.insert(field.name.clone(), field);
        Ok(())
    }
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(enums: &'a EnumTable) -> Self {
        let types = enums
            .iter()
            .map(|(name, values)| {
                let mut node = TypeNode::new(TypeKind::Enum, name, None);
                node.values = values.to_vec();
                (name.to_string(), node)
            })
            .collect();

        SchemaBuilder {
            enums,
            types,
            used_as: HashMap::new(),
            in_progress: HashSet::new(),
            query: None,
            mutation: None,
            subscription: None,
            subscription_root: None,
            collection_keys: Vec::new(),
            defaults: Vec::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn query<T: Reflect>(self) -> Self {
        self.root::<T>(OperationType::Query, names::QUERY)
    }

    #[must_use]
    pub fn mutation<T: Reflect>(self) -> Self {
        self.root::<T>(OperationType::Mutation, names::MUTATION)
    }

    #[must_use]
    pub fn subscription<T: Reflect>(self) -> Self {
        self.root::<T>(OperationType::Subscription, names::SUBSCRIPTION)
    }

    /// Adds an object type that is not reachable from the roots, typically an implementor of
    /// an interface or a union member.
    #[must_use]
    pub fn with_type<T: Reflect>(mut self) -> Self {
        if self.error.is_none() {
            if let Err(err) = self.add(None, &T::native_type(), TypeKind::Object) {
                self.error = Some(err);
            }
        }
        self
    }

    fn root<T: Reflect>(mut self, operation: OperationType, default_name: &str) -> Self {
        if self.error.is_some() {
            return self;
        }

        let native = T::native_type();
        if operation == OperationType::Subscription {
            self.subscription_root = Some(native.id());
        }

        let preferred = native.name().is_none().then_some(default_name);
        match self.add(preferred, &native, TypeKind::Object) {
            Ok(name) => match operation {
                OperationType::Query => self.query = Some(name),
                OperationType::Mutation => self.mutation = Some(name),
                OperationType::Subscription => self.subscription = Some(name),
            },
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Adds the record described by `native` as a type of the given kind and returns its name.
    ///
    /// Types are memoized by native identity. Adding a type again returns the existing name and
    /// upgrades an object to an interface or union if asked to. A type is never both an input and
    /// an output type.
    pub fn add(&mut self, preferred: Option<&str>, native: &NativeType, kind: TypeKind) -> Result<String, BuildError> {
        if let Some((name, existing)) = self.used_as.get(&native.id()).cloned() {
            return self.upgrade(native.id(), name, existing, kind);
        }

        let location = preferred.map(str::to_string).unwrap_or_else(|| native.describe());
        let NativeKind::Record(fields) = native.kind() else {
            return Err(BuildError::UnhandledType {
                location,
                native: native.describe(),
            });
        };
        if !matches!(
            kind,
            TypeKind::Object | TypeKind::Interface | TypeKind::Union | TypeKind::Input
        ) {
            return Err(BuildError::UnhandledType {
                location,
                native: native.describe(),
            });
        }

        let Some(name) = preferred.or(native.name()).map(str::to_string) else {
            return Err(BuildError::AnonymousType { location });
        };
        self.claim_name(&name, &location)?;

        tracing::debug!(name = %name, %kind, "adding type");
        self.used_as.insert(native.id(), (name.clone(), kind));
        self.types
            .insert(name.clone(), TypeNode::new(kind, &name, Some(native.id())));

        self.in_progress.insert(native.id());
        let collected = match kind {
            TypeKind::Input => self.input_fields(&name, fields)?,
            _ => self.output_fields(&name, native.id(), fields)?,
        };
        self.in_progress.remove(&native.id());

        if let Some(node) = self.types.get_mut(&name) {
            node.fields = collected.fields;
            node.implements.extend(collected.implements);
        }

        Ok(name)
    }

    fn upgrade(
        &mut self,
        id: TypeId,
        name: String,
        existing: TypeKind,
        requested: TypeKind,
    ) -> Result<String, BuildError> {
        match (existing, requested) {
            (existing, requested) if existing == requested => {}
            (TypeKind::Interface | TypeKind::Union, TypeKind::Object) => {}
            (TypeKind::Object, TypeKind::Interface | TypeKind::Union) => {
                tracing::debug!(name = %name, from = %existing, to = %requested, "upgrading type");
                if let Some((_, kind)) = self.used_as.get_mut(&id) {
                    *kind = requested;
                }
                if let Some(node) = self.types.get_mut(&name) {
                    node.kind = requested;
                }
            }
            (first, second) => {
                return Err(BuildError::ConflictingKinds {
                    name,
                    first: first.into(),
                    second: second.into(),
                })
            }
        }
        Ok(name)
    }

    fn output_fields(&mut self, owner: &str, owner_id: TypeId, fields: &[NativeField]) -> Result<Collected, BuildError> {
        let mut collected = Collected::default();

        for field in fields {
            if field.embedded {
                self.embed(owner, field, &mut collected)?;
            } else if let Some(node) = self.output_field(owner, owner_id, field)? {
                collected.insert(owner, node)?;
            }
        }

        Ok(collected)
    }

    fn embed(&mut self, owner: &str, field: &NativeField, collected: &mut Collected) -> Result<(), BuildError> {
        let location = format!("{owner}.{}", field.name);
        let embedded = (field.ty)();

        if !matches!(embedded.kind(), NativeKind::Record(_)) {
            return Err(BuildError::InvalidEmbedding {
                location,
                reason: format!("cannot embed {}", embedded.describe()),
            });
        }
        if self.in_progress.contains(&embedded.id()) {
            return Err(BuildError::InvalidEmbedding {
                location,
                reason: format!("{} embeds itself", embedded.describe()),
            });
        }

        // An empty record is a marker: everything embedding it is a member of the union named
        // after it.
        if embedded.fields().is_empty() {
            let union = self.add(None, &embedded, TypeKind::Union)?;
            if let Some(node) = self.types.get_mut(&union) {
                node.members.insert(owner.to_string());
            }
            return Ok(());
        }

        let interface = self.add(None, &embedded, TypeKind::Interface)?;
        let Some(node) = self.types.get(&interface) else {
            return Ok(());
        };

        collected.implements.insert(interface.clone());
        collected.implements.extend(node.implements.iter().cloned());
        for field in node.fields.values() {
            collected.insert(owner, field.clone())?;
        }

        Ok(())
    }

    fn output_field(
        &mut self,
        owner: &str,
        owner_id: TypeId,
        field: &NativeField,
    ) -> Result<Option<FieldNode>, BuildError> {
        let location = format!("{owner}.{}", field.name);
        let meta = parse_meta(&location, field.meta)?;
        if meta.skip {
            return Ok(None);
        }

        let name = field_name(&location, meta.name.as_deref(), field.name)?;
        let stream = self.subscription_root == Some(owner_id);

        let native = (field.ty)();
        let (result, params) = match native.kind() {
            NativeKind::Function(signature) => (
                function_result(&location, &signature.results)?,
                Some(signature.params.as_slice()),
            ),
            _ => (native.clone(), None),
        };

        if stream && !matches!(result.without_indirection().kind(), NativeKind::Stream(_)) {
            return Err(BuildError::InvalidFunction {
                location,
                reason: "subscription fields must produce an event stream".into(),
            });
        }

        let mut arguments = self.arguments(owner, &name, &location, &meta, params)?;
        let site = Site {
            location: &location,
            override_name: meta.type_name.as_deref(),
            infer_name: field.name,
            input: false,
            stream,
        };

        let (mut ty, binding) = match meta.subscript.as_deref() {
            Some(argument) => {
                let parts = if params.is_some() {
                    None
                } else {
                    self.collection_parts(&location, &result)?
                };
                let Some((key, element)) = parts else {
                    return Err(BuildError::Metadata {
                        location,
                        meta: field.meta.to_string(),
                        reason: "subscript needs a collection field".into(),
                    });
                };
                if !names::is_valid_name(argument) || names::is_reserved(argument) {
                    return Err(BuildError::InvalidName {
                        location,
                        name: argument.to_string(),
                    });
                }

                let element = self.resolve(&element, &site)?;
                arguments.insert(
                    argument.to_string(),
                    ArgumentNode {
                        name: argument.to_string(),
                        ty: key,
                        default: None,
                        description: None,
                    },
                );
                let binding = Binding::Subscript {
                    native: field.name.to_string(),
                    argument: argument.to_string(),
                };
                (element.ty, binding)
            }
            None => {
                let binding = Binding::Field {
                    native: field.name.to_string(),
                };
                (self.resolve(&result, &site)?.ty, binding)
            }
        };

        if let Some(id_field) = meta.id_field.as_deref() {
            let parts = self
                .collection_parts(&location, &result)?
                .filter(|(_, element)| matches!(element.without_indirection().kind(), NativeKind::Record(_)));
            let Some((key, _)) = parts else {
                return Err(BuildError::Metadata {
                    location,
                    meta: field.meta.to_string(),
                    reason: "id_field needs a collection of records".into(),
                });
            };
            if !names::is_valid_name(id_field) || names::is_reserved(id_field) {
                return Err(BuildError::InvalidName {
                    location,
                    name: id_field.to_string(),
                });
            }

            self.collection_keys.push(CollectionKey {
                owner: ty.named_type().to_string(),
                name: id_field.to_string(),
                ty: key,
                location: location.clone(),
            });
        }

        if meta.nullable {
            ty = ty.nullable();
        }

        Ok(Some(FieldNode {
            name,
            ty,
            arguments,
            description: meta.description,
            binding,
            cache: meta.cache,
        }))
    }

    fn arguments(
        &mut self,
        owner: &str,
        field: &str,
        location: &str,
        meta: &FieldMeta,
        params: Option<&[TypeThunk]>,
    ) -> Result<IndexMap<String, ArgumentNode>, BuildError> {
        let declared = meta.arguments.as_deref().unwrap_or_default();
        let params = params.unwrap_or_default().iter().map(|param| param()).collect::<Vec<_>>();

        // A leading context parameter is supplied by the engine, not by the query.
        let params = match params.split_first() {
            Some((first, rest)) if matches!(first.kind(), NativeKind::Context) => rest,
            _ => params.as_slice(),
        };

        if declared.len() != params.len() {
            return Err(BuildError::ArgumentCount {
                location: location.to_string(),
                declared: declared.len(),
                actual: params.len(),
            });
        }

        let mut arguments = IndexMap::new();
        for (declared, param) in declared.iter().zip(params) {
            let location = format!("{location}({})", declared.name);

            if !names::is_valid_name(&declared.name) || names::is_reserved(&declared.name) {
                return Err(BuildError::InvalidName {
                    location,
                    name: declared.name.clone(),
                });
            }
            if matches!(
                param.kind(),
                NativeKind::Context | NativeKind::Error | NativeKind::Function(_) | NativeKind::Stream(_)
            ) {
                return Err(BuildError::InvalidFunction {
                    location,
                    reason: format!("{} cannot be an argument", param.describe()),
                });
            }
            if arguments.contains_key(&declared.name) {
                return Err(BuildError::DuplicateField {
                    owner: format!("{owner}.{field}"),
                    name: declared.name.clone(),
                });
            }

            let site = Site {
                location: &location,
                override_name: declared.type_name.as_deref(),
                infer_name: &declared.name,
                input: true,
                stream: false,
            };
            let ty = self.resolve(param, &site)?.ty;

            let default = match declared.default.as_deref() {
                Some(literal) => {
                    let value = literal::parse(literal).map_err(|reason| BuildError::InvalidDefault {
                        location: location.clone(),
                        literal: literal.to_string(),
                        reason,
                    })?;
                    self.defaults.push(DefaultCheck {
                        owner: owner.to_string(),
                        field: field.to_string(),
                        argument: declared.name.clone(),
                        literal: literal.to_string(),
                        location: location.clone(),
                    });
                    Some(value)
                }
                None => None,
            };

            arguments.insert(
                declared.name.clone(),
                ArgumentNode {
                    name: declared.name.clone(),
                    ty,
                    default,
                    description: declared.description.clone(),
                },
            );
        }

        Ok(arguments)
    }

    fn input_fields(&mut self, owner: &str, fields: &[NativeField]) -> Result<Collected, BuildError> {
        let mut collected = Collected::default();

        for field in fields {
            let location = format!("{owner}.{}", field.name);
            if field.embedded {
                return Err(BuildError::InvalidEmbedding {
                    location,
                    reason: "input types cannot embed other types".into(),
                });
            }

            let meta = parse_meta(&location, field.meta)?;
            if meta.skip {
                continue;
            }
            if meta.arguments.as_ref().is_some_and(|arguments| !arguments.is_empty())
                || meta.subscript.is_some()
                || meta.id_field.is_some()
            {
                return Err(BuildError::Metadata {
                    location,
                    meta: field.meta.to_string(),
                    reason: "input fields take a name, a type and nullable only".into(),
                });
            }

            let name = field_name(&location, meta.name.as_deref(), field.name)?;
            let site = Site {
                location: &location,
                override_name: meta.type_name.as_deref(),
                infer_name: field.name,
                input: true,
                stream: false,
            };
            let mut ty = self.resolve(&(field.ty)(), &site)?.ty;
            if meta.nullable {
                ty = ty.nullable();
            }

            collected.insert(
                owner,
                FieldNode {
                    name,
                    ty,
                    arguments: IndexMap::new(),
                    description: meta.description,
                    binding: Binding::Field {
                        native: field.name.to_string(),
                    },
                    cache: CacheHint::Inherit,
                },
            )?;
        }

        Ok(collected)
    }

    pub fn finish(mut self) -> Result<Schema, BuildError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        let Some(query) = self.query.take() else {
            return Err(BuildError::MissingQuery);
        };

        for key in std::mem::take(&mut self.collection_keys) {
            self.add_collection_key(key)?;
        }
        self.check_defaults()?;
        self.check_types()?;

        tracing::debug!(types = self.types.len(), "schema built");
        Ok(Schema::new(self.types, query, self.mutation, self.subscription))
    }

    fn add_collection_key(&mut self, key: CollectionKey) -> Result<(), BuildError> {
        let Some(node) = self.types.get_mut(&key.owner) else {
            return Ok(());
        };

        match node.fields.get(&key.name) {
            Some(existing) if existing.binding == Binding::CollectionKey && existing.ty == key.ty => Ok(()),
            Some(existing) if existing.binding == Binding::CollectionKey => Err(BuildError::IncompatibleType {
                location: key.location,
                native: existing.ty.to_string(),
                name: key.ty.to_string(),
            }),
            Some(_) => Err(BuildError::DuplicateField {
                owner: key.owner,
                name: key.name,
            }),
            None => {
                node.fields.insert(
                    key.name.clone(),
                    FieldNode {
                        name: key.name,
                        ty: key.ty,
                        arguments: IndexMap::new(),
                        description: None,
                        binding: Binding::CollectionKey,
                        cache: CacheHint::Inherit,
                    },
                );
                Ok(())
            }
        }
    }

    fn check_defaults(&self) -> Result<(), BuildError> {
        for check in &self.defaults {
            let argument = self
                .types
                .get(&check.owner)
                .and_then(|node| node.fields.get(&check.field))
                .and_then(|field| field.arguments.get(&check.argument));
            let Some(ArgumentNode {
                ty, default: Some(value), ..
            }) = argument
            else {
                continue;
            };

            literal::validate(value, ty, &self.types).map_err(|reason| BuildError::InvalidDefault {
                location: check.location.clone(),
                literal: check.literal.clone(),
                reason,
            })?;
        }
        Ok(())
    }

    fn check_types(&self) -> Result<(), BuildError> {
        for node in self.types.values() {
            match node.kind {
                TypeKind::Object | TypeKind::Interface | TypeKind::Input if node.fields.is_empty() => {
                    return Err(BuildError::EmptyType {
                        kind: node.kind.into(),
                        name: node.name.clone(),
                    })
                }
                TypeKind::Union => {
                    let not_an_object = node
                        .members
                        .iter()
                        .find(|member| self.types.get(*member).map(|member| member.kind) != Some(TypeKind::Object));
                    if let Some(member) = not_an_object {
                        return Err(BuildError::InvalidEmbedding {
                            location: node.name.clone(),
                            reason: format!("union member {member} is not an object type"),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn parse_meta(location: &str, meta: &str) -> Result<FieldMeta, BuildError> {
    FieldMeta::parse(meta).map_err(|reason| BuildError::Metadata {
        location: location.to_string(),
        meta: meta.to_string(),
        reason,
    })
}

fn field_name(location: &str, explicit: Option<&str>, native: &str) -> Result<String, BuildError> {
    let name = explicit.map(str::to_string).unwrap_or_else(|| names::field_name(native));
    if !names::is_valid_name(&name) || names::is_reserved(&name) {
        return Err(BuildError::InvalidName {
            location: location.to_string(),
            name,
        });
    }
    Ok(name)
}

fn function_result(location: &str, results: &[TypeThunk]) -> Result<NativeType, BuildError> {
    match results {
        [] => Err(BuildError::NoReturnValue {
            location: location.to_string(),
        }),
        [value] => Ok(value()),
        [value, error] if matches!(error().kind(), NativeKind::Error) => Ok(value()),
        [_, _] => Err(BuildError::InvalidFunction {
            location: location.to_string(),
            reason: "the second result of a resolver must be an error".into(),
        }),
        _ => Err(BuildError::InvalidFunction {
            location: location.to_string(),
            reason: "a resolver returns at most a value and an error".into(),
        }),
    }
}
