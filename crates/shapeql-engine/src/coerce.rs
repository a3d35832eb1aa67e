//! Argument coercion: query literals and variables to native values.

use std::{collections::HashMap, convert::Infallible};

use async_graphql_parser::{
    types::{Field, VariableDefinition},
    Positioned,
};
use async_graphql_value::{ConstValue, Name};
use shapeql_schema::{names, Binding, FieldNode, Schema, TypeKind, TypeRef};

use crate::{response::ServerError, FieldError, Value};

pub(crate) type Variables = HashMap<String, ConstValue>;

/// The variables of an operation: supplied JSON values, or the defaults of their definitions.
/// Variables with neither are left out, so arguments bound to them count as omitted.
pub(crate) fn variables(
    definitions: &[Positioned<VariableDefinition>],
    supplied: Option<serde_json::Map<String, serde_json::Value>>,
) -> Result<Variables, ServerError> {
    let mut supplied = supplied.unwrap_or_default();
    let mut variables = Variables::new();

    for Positioned { node: definition, pos } in definitions {
        let name = definition.name.node.as_str();
        let value = match supplied.remove(name) {
            Some(value) => ConstValue::from_json(value)
                .map_err(|err| ServerError::new(format!("invalid value for variable ${name}: {err}")).at(*pos))?,
            None => match &definition.default_value {
                Some(default) => default.node.clone(),
                None if !definition.var_type.node.nullable => {
                    return Err(ServerError::new(format!("missing value for variable ${name}")).at(*pos));
                }
                None => continue,
            },
        };
        variables.insert(name.to_string(), value);
    }

    Ok(variables)
}

pub(crate) fn resolve(value: async_graphql_value::Value, variables: &Variables) -> ConstValue {
    value
        .into_const_with(|name: Name| Ok::<_, Infallible>(variables.get(name.as_str()).cloned().unwrap_or(ConstValue::Null)))
        .unwrap_or_else(|never| match never {})
}

/// Coerces the arguments of a field, in declaration order.
pub(crate) fn arguments(
    schema: &Schema,
    node: &FieldNode,
    field: &Field,
    variables: &Variables,
) -> Result<Vec<(String, Value)>, FieldError> {
    if let Some((name, _)) = field
        .arguments
        .iter()
        .find(|(name, _)| !node.arguments.contains_key(name.node.as_str()))
    {
        return Err(FieldError::new(format!(
            "unknown argument {} on field {}",
            name.node, node.name
        )));
    }

    node.arguments
        .values()
        .map(|argument| {
            let supplied = field.get_argument(&argument.name).filter(|value| match &value.node {
                async_graphql_value::Value::Variable(name) => variables.contains_key(name.as_str()),
                _ => true,
            });
            let value = match supplied {
                Some(value) => resolve(value.node.clone(), variables),
                None => match &argument.default {
                    Some(default) => default.clone(),
                    None if !argument.ty.is_nullable() => {
                        return Err(FieldError::new(format!("missing required argument {}", argument.name)));
                    }
                    None => ConstValue::Null,
                },
            };
            let value = coerce(schema, value, &argument.ty)
                .map_err(|reason| FieldError::new(format!("argument {}: {reason}", argument.name)))?;
            Ok((argument.name.clone(), value))
        })
        .collect()
}

/// Coerces an input value to the given type.
pub(crate) fn coerce(schema: &Schema, value: ConstValue, ty: &TypeRef) -> Result<Value, String> {
    match ty {
        TypeRef::NonNull(inner) => match value {
            ConstValue::Null => Err(format!("null is not a valid {ty}")),
            value => coerce(schema, value, inner),
        },
        TypeRef::List(item) => match value {
            ConstValue::Null => Ok(Value::Null),
            ConstValue::List(items) => items
                .into_iter()
                .map(|value| coerce(schema, value, item))
                .collect::<Result<_, _>>()
                .map(Value::List),
            value => Ok(Value::List(vec![coerce(schema, value, item)?])),
        },
        TypeRef::Named(name) => match value {
            ConstValue::Null => Ok(Value::Null),
            value => coerce_named(schema, value, name),
        },
    }
}

fn coerce_named(schema: &Schema, value: ConstValue, name: &str) -> Result<Value, String> {
    let mismatch = |value: &ConstValue| Err(format!("{value} is not a valid {name}"));

    match name {
        names::INT => match &value {
            ConstValue::Number(number) => match number.as_i64().filter(|n| i32::try_from(*n).is_ok()) {
                Some(n) => Ok(Value::Int(n)),
                None => mismatch(&value),
            },
            _ => mismatch(&value),
        },
        names::FLOAT => match &value {
            ConstValue::Number(number) => number.as_f64().map(Value::Float).ok_or_else(|| format!("{value} is not a valid {name}")),
            _ => mismatch(&value),
        },
        names::STRING => match value {
            ConstValue::String(text) => Ok(Value::String(text)),
            value => mismatch(&value),
        },
        names::BOOLEAN => match value {
            ConstValue::Boolean(value) => Ok(Value::Bool(value)),
            value => mismatch(&value),
        },
        names::ID => match value {
            ConstValue::String(text) => Ok(Value::String(text)),
            ConstValue::Number(number) if number.is_i64() || number.is_u64() => Ok(Value::String(number.to_string())),
            value => mismatch(&value),
        },
        _ => {
            let node = schema.type_node(name).ok_or_else(|| format!("unknown type {name}"))?;
            match node.kind {
                TypeKind::Enum => {
                    let ordinal = match &value {
                        // Variables carry enum values as strings.
                        ConstValue::Enum(value) => node.enum_ordinal(value),
                        ConstValue::String(value) => node.enum_ordinal(value),
                        _ => None,
                    };
                    match ordinal.and_then(|ordinal| i64::try_from(ordinal).ok()) {
                        Some(ordinal) => Ok(Value::Int(ordinal)),
                        None => mismatch(&value),
                    }
                }
                TypeKind::Scalar => match value {
                    ConstValue::String(text) => Ok(Value::String(text)),
                    value => mismatch(&value),
                },
                TypeKind::Input => {
                    let mut fields = match value {
                        ConstValue::Object(fields) => fields,
                        value => return mismatch(&value),
                    };
                    let mut record = Vec::with_capacity(node.fields.len());
                    for field in node.fields.values() {
                        let value = fields.shift_remove(field.name.as_str()).unwrap_or(ConstValue::Null);
                        let value = coerce(schema, value, &field.ty).map_err(|reason| format!("{}: {reason}", field.name))?;
                        let native = match &field.binding {
                            Binding::Field { native } => native.clone(),
                            _ => field.name.clone(),
                        };
                        record.push((Value::String(native), value));
                    }
                    if let Some(unknown) = fields.keys().next() {
                        return Err(format!("unknown field {unknown} for {name}"));
                    }
                    Ok(Value::Map(record))
                }
                TypeKind::Object | TypeKind::Interface | TypeKind::Union => Err(format!("{name} is not an input type")),
            }
        }
    }
}
