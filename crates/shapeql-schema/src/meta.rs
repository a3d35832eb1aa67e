//! The per-field metadata annotation.
//!
//! ```text
//! name(arg:Type=default#description, ...):TypeName,option,option#description
//! ```
//!
//! Every part is optional. A lone `-` excludes the field from the schema.

use crate::node::CacheHint;

pub(crate) const DEFAULT_KEY_ARGUMENT: &str = "id";

const OPTIONS: [&str; 4] = ["nullable", "subscript", "id_field", "no_cache"];

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FieldMeta {
    pub skip: bool,
    pub name: Option<String>,
    /// `None` when the annotation has no parenthesised argument list.
    pub arguments: Option<Vec<ArgumentMeta>>,
    pub type_name: Option<String>,
    pub nullable: bool,
    pub subscript: Option<String>,
    pub id_field: Option<String>,
    pub cache: CacheHint,
    pub description: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ArgumentMeta {
    pub name: String,
    pub type_name: Option<String>,
    /// The default value literal, as written.
    pub default: Option<String>,
    pub description: Option<String>,
}

impl FieldMeta {
    pub fn parse(meta: &str) -> Result<Self, String> {
        let meta = meta.trim();
        if meta == "-" {
            return Ok(FieldMeta {
                skip: true,
                ..Default::default()
            });
        }

        let (body, description) = split_description(meta);
        let mut result = FieldMeta {
            description,
            ..Default::default()
        };

        let mut parts = split_top_level(body, ',')?.into_iter();
        if let Some(head) = parts.next() {
            result.parse_head(head.trim())?;
        }
        for option in parts {
            result.parse_option(option.trim())?;
        }

        Ok(result)
    }

    fn parse_head(&mut self, head: &str) -> Result<(), String> {
        let name_end = head.find(['(', ':']).unwrap_or(head.len());
        let name = head[..name_end].trim();
        if OPTIONS.contains(&name) || name.starts_with("cache=") {
            return Err(format!("{name:?} is an option, write it as \",{name}\""));
        }
        if !name.is_empty() {
            self.name = Some(name.to_string());
        }

        let mut rest = &head[name_end..];
        if rest.starts_with('(') {
            let close = closing_paren(rest)?;
            self.arguments = Some(parse_arguments(&rest[1..close])?);
            rest = rest[close + 1..].trim_start();
        }

        if let Some(type_name) = rest.strip_prefix(':') {
            let type_name = type_name.trim();
            if type_name.is_empty() {
                return Err("missing type name after ':'".into());
            }
            self.type_name = Some(plain_type_name(type_name)?);
            rest = "";
        }

        if !rest.trim().is_empty() {
            return Err(format!("unexpected {:?}", rest.trim()));
        }

        Ok(())
    }

    fn parse_option(&mut self, option: &str) -> Result<(), String> {
        match option.split_once('=') {
            None => match option {
                "" => {}
                "nullable" => self.nullable = true,
                "subscript" => self.subscript = Some(DEFAULT_KEY_ARGUMENT.to_string()),
                "id_field" => self.id_field = Some(DEFAULT_KEY_ARGUMENT.to_string()),
                "no_cache" => self.cache = CacheHint::NoCache,
                other => return Err(format!("unknown option {other:?}")),
            },
            Some((key, value)) => {
                let value = value.trim();
                if value.is_empty() {
                    return Err(format!("option {:?} needs a value", key.trim()));
                }
                match key.trim() {
                    "subscript" => self.subscript = Some(value.to_string()),
                    "id_field" => self.id_field = Some(value.to_string()),
                    "cache" => {
                        let seconds = value
                            .parse()
                            .map_err(|_| format!("cache duration {value:?} is not a number of seconds"))?;
                        self.cache = CacheHint::MaxAge(seconds);
                    }
                    other => return Err(format!("unknown option {other:?}")),
                }
            }
        }

        Ok(())
    }
}

fn parse_arguments(list: &str) -> Result<Vec<ArgumentMeta>, String> {
    if list.trim().is_empty() {
        return Ok(Vec::new());
    }

    split_top_level(list, ',')?
        .into_iter()
        .map(|argument| parse_argument(argument.trim()))
        .collect()
}

fn parse_argument(text: &str) -> Result<ArgumentMeta, String> {
    let (text, description) = split_description(text);

    let (declaration, default) = match find_top_level(text, '=')? {
        Some(index) => {
            let literal = text[index + 1..].trim();
            if literal.is_empty() {
                return Err(format!("missing default value in {text:?}"));
            }
            (&text[..index], Some(literal.to_string()))
        }
        None => (text, None),
    };

    let (name, type_name) = match declaration.split_once(':') {
        Some((name, type_name)) => {
            let type_name = type_name.trim();
            if type_name.is_empty() {
                return Err(format!("missing type name in {text:?}"));
            }
            (name.trim(), Some(plain_type_name(type_name)?))
        }
        None => (declaration.trim(), None),
    };

    if name.is_empty() {
        return Err("missing argument name".into());
    }

    Ok(ArgumentMeta {
        name: name.to_string(),
        type_name,
        default,
        description,
    })
}

/// Type overrides name the type only. List and non-null wrappers come from the native type.
fn plain_type_name(type_name: &str) -> Result<String, String> {
    if type_name.contains(['!', '[', ']']) {
        return Err(format!(
            "type override {type_name:?} must be a plain type name, wrappers follow the native type"
        ));
    }
    Ok(type_name.to_string())
}

fn split_description(text: &str) -> (&str, Option<String>) {
    match find_top_level(text, '#') {
        Ok(Some(index)) => {
            let description = text[index + 1..].trim();
            let description = (!description.is_empty()).then(|| description.to_string());
            (text[..index].trim(), description)
        }
        _ => (text, None),
    }
}

/// Finds `needle` outside of string literals and brackets.
fn find_top_level(text: &str, needle: char) -> Result<Option<usize>, String> {
    let mut scanner = Scanner::default();
    for (index, c) in text.char_indices() {
        if scanner.is_top_level() && !scanner.in_string && c == needle {
            return Ok(Some(index));
        }
        scanner.feed(c)?;
    }
    Ok(None)
}

fn split_top_level(text: &str, separator: char) -> Result<Vec<&str>, String> {
    let mut scanner = Scanner::default();
    let mut parts = Vec::new();
    let mut start = 0;
    for (index, c) in text.char_indices() {
        if scanner.is_top_level() && !scanner.in_string && c == separator {
            parts.push(&text[start..index]);
            start = index + c.len_utf8();
            continue;
        }
        scanner.feed(c)?;
    }
    if scanner.in_string || !scanner.is_top_level() {
        return Err(format!("unbalanced brackets or quotes in {text:?}"));
    }
    parts.push(&text[start..]);
    Ok(parts)
}

fn closing_paren(text: &str) -> Result<usize, String> {
    let mut scanner = Scanner::default();
    for (index, c) in text.char_indices() {
        scanner.feed(c)?;
        if scanner.is_top_level() && !scanner.in_string {
            return Ok(index);
        }
    }
    Err(format!("missing ')' in {text:?}"))
}

#[derive(Default)]
struct Scanner {
    depth: Vec<char>,
    in_string: bool,
    escaped: bool,
}

impl Scanner {
    fn is_top_level(&self) -> bool {
        self.depth.is_empty()
    }

    fn feed(&mut self, c: char) -> Result<(), String> {
        if self.in_string {
            match c {
                _ if self.escaped => self.escaped = false,
                '\\' => self.escaped = true,
                '"' => self.in_string = false,
                _ => {}
            }
            return Ok(());
        }

        match c {
            '"' => self.in_string = true,
            '(' => self.depth.push(')'),
            '[' => self.depth.push(']'),
            '{' => self.depth.push('}'),
            ')' | ']' | '}' => {
                if self.depth.pop() != Some(c) {
                    return Err(format!("unexpected '{c}'"));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_annotation() {
        assert_eq!(FieldMeta::parse("").unwrap(), FieldMeta::default());
    }

    #[test]
    fn skipped_field() {
        assert!(FieldMeta::parse("-").unwrap().skip);
    }

    #[test]
    fn arguments_with_types_and_defaults() {
        let meta = FieldMeta::parse("random(low: Int = 1, high=6 # upper bound):Dice,nullable # roll it").unwrap();
        assert_eq!(
            meta,
            FieldMeta {
                name: Some("random".into()),
                arguments: Some(vec![
                    ArgumentMeta {
                        name: "low".into(),
                        type_name: Some("Int".into()),
                        default: Some("1".into()),
                        description: None,
                    },
                    ArgumentMeta {
                        name: "high".into(),
                        type_name: None,
                        default: Some("6".into()),
                        description: Some("upper bound".into()),
                    },
                ]),
                type_name: Some("Dice".into()),
                nullable: true,
                description: Some("roll it".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn literals_keep_separators() {
        let meta = FieldMeta::parse(r##"greet(names=["a, b", "#c"], punctuation="=")"##).unwrap();
        let arguments = meta.arguments.unwrap();
        assert_eq!(arguments[0].default.as_deref(), Some(r##"["a, b", "#c"]"##));
        assert_eq!(arguments[1].default.as_deref(), Some(r#""=""#));
    }

    #[test]
    fn options() {
        let meta = FieldMeta::parse(",subscript=index,no_cache").unwrap();
        assert_eq!(meta.name, None);
        assert_eq!(meta.subscript.as_deref(), Some("index"));
        assert_eq!(meta.cache, CacheHint::NoCache);

        let meta = FieldMeta::parse("items,id_field,cache=60").unwrap();
        assert_eq!(meta.id_field.as_deref(), Some("id"));
        assert_eq!(meta.cache, CacheHint::MaxAge(60));
    }

    #[test]
    fn empty_argument_list() {
        let meta = FieldMeta::parse("now()").unwrap();
        assert_eq!(meta.arguments, Some(Vec::new()));
    }

    #[test]
    fn malformed() {
        assert!(FieldMeta::parse("f(a").is_err());
        assert!(FieldMeta::parse("f(a=)").is_err());
        assert!(FieldMeta::parse("f,frobnicate").is_err());
        assert!(FieldMeta::parse("f,cache=soon").is_err());
        assert!(FieldMeta::parse("f(a) junk").is_err());
    }

    #[test]
    fn options_are_not_names() {
        assert_eq!(
            FieldMeta::parse("nullable").unwrap_err(),
            r#""nullable" is an option, write it as ",nullable""#
        );
        assert!(FieldMeta::parse("cache=30").is_err());
        assert!(FieldMeta::parse(",nullable").unwrap().nullable);
    }

    #[test]
    fn type_overrides_are_plain_names() {
        assert_eq!(
            FieldMeta::parse("search(filter: Search!)").unwrap_err(),
            r#"type override "Search!" must be a plain type name, wrappers follow the native type"#
        );
        assert!(FieldMeta::parse("colors:[Color]").is_err());
        assert_eq!(FieldMeta::parse("search(filter: Search)").unwrap().arguments.unwrap()[0].type_name.as_deref(), Some("Search"));
    }
}
