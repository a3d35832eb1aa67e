use std::collections::{BTreeMap, HashSet};

use crate::{names, BuildError, EnumValue};

/// The process-wide table of enum types.
///
/// Enums are represented natively by a small integer: ordinal `i` is the `i`-th value.
/// A value may carry a description, written `VALUE#description`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumTable {
    enums: BTreeMap<String, Vec<EnumValue>>,
}

impl EnumTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enum<I, S>(mut self, name: &str, values: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert(name, values)?;
        Ok(self)
    }

    pub fn insert<I, S>(&mut self, name: &str, values: I) -> Result<(), BuildError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let invalid = |reason: String| BuildError::InvalidEnum {
            name: name.to_string(),
            reason,
        };

        if !names::is_valid_name(name) || names::is_reserved(name) || names::is_builtin_scalar(name) {
            return Err(invalid("not a valid enum name".into()));
        }
        if self.enums.contains_key(name) {
            return Err(invalid("declared twice".into()));
        }

        let mut seen = HashSet::new();
        let mut parsed = Vec::new();
        for value in values {
            let (value, description) = match value.as_ref().split_once('#') {
                Some((value, description)) => (value.trim(), Some(description.trim().to_string())),
                None => (value.as_ref().trim(), None),
            };

            if !names::is_valid_name(value) || names::is_reserved(value) {
                return Err(invalid(format!("invalid value {value:?}")));
            }
            if matches!(value, "true" | "false" | "null") {
                return Err(invalid(format!("{value} cannot be used as an enum value")));
            }
            if !seen.insert(value.to_string()) {
                return Err(invalid(format!("duplicate value {value}")));
            }

            parsed.push(EnumValue {
                name: value.to_string(),
                description: description.filter(|description| !description.is_empty()),
            });
        }

        if parsed.is_empty() {
            return Err(invalid("an enum needs at least one value".into()));
        }

        self.enums.insert(name.to_string(), parsed);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&[EnumValue]> {
        self.enums.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.enums.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[EnumValue])> {
        self.enums.iter().map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_follow_declaration_order() {
        let table = EnumTable::new()
            .with_enum("Color", ["RED", "GREEN # the nice one", "BLUE"])
            .unwrap();
        let values = table.get("Color").unwrap();
        assert_eq!(values[1].name, "GREEN");
        assert_eq!(values[1].description.as_deref(), Some("the nice one"));
        assert_eq!(values[2].name, "BLUE");
    }

    #[test]
    fn rejects_bad_values() {
        let err = EnumTable::new().with_enum("Color", ["RED", "RED"]).unwrap_err();
        assert_eq!(err.to_string(), "enum Color: duplicate value RED");

        assert!(EnumTable::new().with_enum("Flag", ["true"]).is_err());
        assert!(EnumTable::new().with_enum("Flag", ["__A"]).is_err());
        assert!(EnumTable::new().with_enum("Flag", ["a-b"]).is_err());
        assert!(EnumTable::new().with_enum("Int", ["A"]).is_err());
        assert!(EnumTable::new().with_enum("Empty", Vec::<&str>::new()).is_err());
    }
}
