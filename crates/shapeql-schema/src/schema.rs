use std::{
    any::TypeId,
    collections::{BTreeMap, HashMap},
};

use async_graphql_parser::types::OperationType;

use crate::{sdl, EnumTable, SchemaBuilder, TypeKind, TypeNode};

/// An immutable, fully validated type graph together with its rendered schema text.
#[derive(Debug)]
pub struct Schema {
    types: BTreeMap<String, TypeNode>,
    query: String,
    mutation: Option<String>,
    subscription: Option<String>,
    objects: HashMap<TypeId, String>,
    sdl: String,
}

impl Schema {
    pub fn builder(enums: &EnumTable) -> SchemaBuilder<'_> {
        SchemaBuilder::new(enums)
    }

    pub(crate) fn new(
        types: BTreeMap<String, TypeNode>,
        query: String,
        mutation: Option<String>,
        subscription: Option<String>,
    ) -> Self {
        let objects = types
            .values()
            .filter(|node| node.kind == TypeKind::Object)
            .filter_map(|node| Some((node.native?, node.name.clone())))
            .collect();

        let sdl = sdl::render(&types, &query, mutation.as_deref(), subscription.as_deref());

        Schema {
            types,
            query,
            mutation,
            subscription,
            objects,
            sdl,
        }
    }

    /// The schema text. Identical for identical inputs.
    pub fn sdl(&self) -> &str {
        &self.sdl
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeNode> {
        self.types.values()
    }

    pub fn type_node(&self, name: &str) -> Option<&TypeNode> {
        self.types.get(name)
    }

    pub fn root_name(&self, operation: OperationType) -> Option<&str> {
        match operation {
            OperationType::Query => Some(&self.query),
            OperationType::Mutation => self.mutation.as_deref(),
            OperationType::Subscription => self.subscription.as_deref(),
        }
    }

    pub fn root_type(&self, operation: OperationType) -> Option<&TypeNode> {
        self.root_name(operation).and_then(|name| self.types.get(name))
    }

    /// The object type derived from the given Rust type.
    pub fn object_for(&self, native: TypeId) -> Option<&TypeNode> {
        self.objects.get(&native).and_then(|name| self.types.get(name))
    }

    /// Whether an object of type `object` may appear where `parent` is expected.
    pub fn is_possible_type(&self, parent: &str, object: &str) -> bool {
        if parent == object {
            return true;
        }
        let implements = self
            .types
            .get(object)
            .is_some_and(|node| node.implements.contains(parent));
        let member = self.types.get(parent).is_some_and(|node| node.members.contains(object));
        implements || member
    }
}
