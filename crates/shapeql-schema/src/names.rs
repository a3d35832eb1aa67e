use heck::{ToLowerCamelCase, ToUpperCamelCase};

pub const INT: &str = "Int";
pub const FLOAT: &str = "Float";
pub const STRING: &str = "String";
pub const BOOLEAN: &str = "Boolean";
pub const ID: &str = "ID";

pub const QUERY: &str = "Query";
pub const MUTATION: &str = "Mutation";
pub const SUBSCRIPTION: &str = "Subscription";

pub const TYPENAME: &str = "__typename";

pub fn is_builtin_scalar(name: &str) -> bool {
    matches!(name, INT | FLOAT | STRING | BOOLEAN | ID)
}

/// Checks a name against `[_A-Za-z][_0-9A-Za-z]*`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

pub fn is_reserved(name: &str) -> bool {
    name.starts_with("__")
}

pub(crate) fn field_name(native: &str) -> String {
    native.to_lower_camel_case()
}

pub(crate) fn type_name(native: &str) -> String {
    native.to_upper_camel_case()
}
