//! Default value literals.

use std::collections::BTreeMap;

use async_graphql_parser::types::{DocumentOperations, Selection};
use async_graphql_value::ConstValue;

use crate::{names, TypeKind, TypeNode, TypeRef};

/// Parses a literal written in query syntax (`1`, `"text"`, `[RED, GREEN]`, `{a: 1}`).
pub(crate) fn parse(literal: &str) -> Result<ConstValue, String> {
    let document = async_graphql_parser::parse_query(format!("{{ f(v: {literal}) }}")).map_err(|err| err.to_string())?;

    let DocumentOperations::Single(operation) = document.operations else {
        return Err("not a single value".into());
    };

    let value = operation
        .node
        .selection_set
        .node
        .items
        .into_iter()
        .find_map(|selection| match selection.node {
            Selection::Field(field) => field.node.arguments.into_iter().next(),
            _ => None,
        })
        .ok_or_else(|| "not a single value".to_string())?
        .1
        .node;

    value
        .into_const()
        .ok_or_else(|| "variables are not allowed in default values".into())
}

/// Checks a literal against the type it is a default for.
pub(crate) fn validate(value: &ConstValue, ty: &TypeRef, types: &BTreeMap<String, TypeNode>) -> Result<(), String> {
    match (ty, value) {
        (TypeRef::NonNull(_), ConstValue::Null) => Err(format!("null is not a valid {ty}")),
        (TypeRef::NonNull(inner), value) => validate(value, inner, types),
        (_, ConstValue::Null) => Ok(()),
        (TypeRef::List(item), ConstValue::List(items)) => items.iter().try_for_each(|value| validate(value, item, types)),
        // A single value is accepted where a list is expected.
        (TypeRef::List(item), value) => validate(value, item, types),
        (TypeRef::Named(name), value) => validate_named(value, name, types),
    }
}

fn validate_named(value: &ConstValue, name: &str, types: &BTreeMap<String, TypeNode>) -> Result<(), String> {
    let mismatch = || Err(format!("{value} is not a valid {name}"));

    match name {
        names::INT => match value {
            ConstValue::Number(number) if number.as_i64().is_some_and(|n| i32::try_from(n).is_ok()) => Ok(()),
            _ => mismatch(),
        },
        names::FLOAT => match value {
            ConstValue::Number(_) => Ok(()),
            _ => mismatch(),
        },
        names::STRING => match value {
            ConstValue::String(_) => Ok(()),
            _ => mismatch(),
        },
        names::ID => match value {
            ConstValue::String(_) => Ok(()),
            ConstValue::Number(number) if number.is_i64() || number.is_u64() => Ok(()),
            _ => mismatch(),
        },
        names::BOOLEAN => match value {
            ConstValue::Boolean(_) => Ok(()),
            _ => mismatch(),
        },
        _ => {
            let Some(node) = types.get(name) else {
                return Err(format!("unknown type {name}"));
            };
            match (node.kind, value) {
                (TypeKind::Enum, ConstValue::Enum(value)) if node.enum_ordinal(value).is_some() => Ok(()),
                (TypeKind::Enum, ConstValue::Enum(value)) => Err(format!("{value} is not a value of {name}")),
                (TypeKind::Scalar, ConstValue::String(_)) => Ok(()),
                (TypeKind::Input, ConstValue::Object(fields)) => {
                    if let Some(unknown) = fields.keys().find(|key| !node.fields.contains_key(key.as_str())) {
                        return Err(format!("{name} has no field {unknown}"));
                    }
                    node.fields.values().try_for_each(|field| match fields.get(field.name.as_str()) {
                        Some(value) => validate(value, &field.ty, types),
                        None if field.is_nullable() => Ok(()),
                        None => Err(format!("missing required field {} of {name}", field.name)),
                    })
                }
                _ => mismatch(),
            }
        }
    }
}
