use std::{collections::BTreeMap, fmt::Write};

use async_graphql_value::ConstValue;
use itertools::Itertools;

use crate::{ArgumentNode, FieldNode, TypeKind, TypeNode};

const INDENT: &str = "  ";

/// Renders the type graph: one block per type in name order, followed by the schema
/// definition.
pub(crate) fn render(
    types: &BTreeMap<String, TypeNode>,
    query: &str,
    mutation: Option<&str>,
    subscription: Option<&str>,
) -> String {
    let mut sdl = String::new();

    for node in types.values() {
        export_type(node, &mut sdl);
        writeln!(sdl).ok();
    }

    writeln!(sdl, "schema {{").ok();
    writeln!(sdl, "{INDENT}query: {query}").ok();
    if let Some(mutation) = mutation {
        writeln!(sdl, "{INDENT}mutation: {mutation}").ok();
    }
    if let Some(subscription) = subscription {
        writeln!(sdl, "{INDENT}subscription: {subscription}").ok();
    }
    writeln!(sdl, "}}").ok();

    sdl
}

fn export_type(node: &TypeNode, sdl: &mut String) {
    export_description(sdl, node.description.as_deref(), "");

    match node.kind {
        TypeKind::Scalar => {
            writeln!(sdl, "scalar {}", node.name).ok();
        }
        TypeKind::Enum => {
            writeln!(sdl, "enum {} {{", node.name).ok();
            for value in &node.values {
                export_description(sdl, value.description.as_deref(), INDENT);
                writeln!(sdl, "{INDENT}{}", value.name).ok();
            }
            writeln!(sdl, "}}").ok();
        }
        TypeKind::Union => {
            writeln!(sdl, "union {} = {}", node.name, node.members.iter().join(" | ")).ok();
        }
        TypeKind::Object | TypeKind::Interface | TypeKind::Input => {
            let keyword = match node.kind {
                TypeKind::Object => "type",
                TypeKind::Interface => "interface",
                _ => "input",
            };
            write!(sdl, "{keyword} {} ", node.name).ok();
            if !node.implements.is_empty() {
                write!(sdl, "implements {} ", node.implements.iter().join(" & ")).ok();
            }
            writeln!(sdl, "{{").ok();
            for field in node.fields.values() {
                export_field(sdl, field);
            }
            writeln!(sdl, "}}").ok();
        }
    }
}

fn export_field(sdl: &mut String, field: &FieldNode) {
    export_description(sdl, field.description.as_deref(), INDENT);

    if field.arguments.is_empty() {
        writeln!(sdl, "{INDENT}{}: {}", field.name, field.ty).ok();
        return;
    }

    let multiline = field.arguments.values().any(|argument| argument.description.is_some());
    if multiline {
        writeln!(sdl, "{INDENT}{}(", field.name).ok();
        for argument in field.arguments.values() {
            export_description(sdl, argument.description.as_deref(), "    ");
            writeln!(sdl, "{INDENT}{INDENT}{}", export_argument(argument)).ok();
        }
        writeln!(sdl, "{INDENT}): {}", field.ty).ok();
    } else {
        let arguments = field.arguments.values().map(export_argument).join(", ");
        writeln!(sdl, "{INDENT}{}({arguments}): {}", field.name, field.ty).ok();
    }
}

fn export_argument(argument: &ArgumentNode) -> String {
    let mut out = format!("{}: {}", argument.name, argument.ty);
    if let Some(default) = &argument.default {
        out.push_str(" = ");
        export_value(&mut out, default);
    }
    out
}

fn export_description(sdl: &mut String, description: Option<&str>, indent: &str) {
    if let Some(description) = description {
        let description = description.replace('\n', &format!("\n{indent}"));
        writeln!(sdl, "{indent}\"\"\"\n{indent}{description}\n{indent}\"\"\"").ok();
    }
}

fn export_value(out: &mut String, value: &ConstValue) {
    match value {
        ConstValue::Null => out.push_str("null"),
        ConstValue::Number(number) => {
            write!(out, "{number}").ok();
        }
        ConstValue::String(string) => {
            out.push('"');
            for c in string.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    c => out.push(c),
                }
            }
            out.push('"');
        }
        ConstValue::Boolean(value) => {
            write!(out, "{value}").ok();
        }
        ConstValue::Enum(name) => out.push_str(name),
        ConstValue::Binary(bytes) => {
            write!(out, "{:?}", String::from_utf8_lossy(bytes)).ok();
        }
        ConstValue::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                export_value(out, item);
            }
            out.push(']');
        }
        ConstValue::Object(fields) => {
            out.push('{');
            for (i, (name, value)) in fields.iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                write!(out, "{name}: ").ok();
                export_value(out, value);
            }
            out.push('}');
        }
    }
}
