use std::fmt;

use async_graphql_parser::Pos;
use shapeql_schema::CacheHint;

/// The result of executing one operation, or of one subscription event.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Response {
    /// Absent when the request failed before execution started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ServerError>,
    /// The aggregated cache hint of every resolved field.
    #[serde(skip)]
    pub cache: CacheHint,
}

impl Response {
    pub(crate) fn request_error(error: ServerError) -> Self {
        Response {
            errors: vec![error],
            ..Default::default()
        }
    }

    /// An operation that was cancelled or timed out. Nothing it produced is kept.
    pub(crate) fn aborted(message: &str) -> Self {
        Response {
            data: Some(serde_json::Value::Null),
            errors: vec![ServerError::new(message)],
            cache: CacheHint::NoCache,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ServerError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
}

impl ServerError {
    pub fn new(message: impl Into<String>) -> Self {
        ServerError {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
        }
    }

    #[must_use]
    pub(crate) fn at(mut self, pos: Pos) -> Self {
        self.locations.push(Location {
            line: pos.line,
            column: pos.column,
        });
        self
    }

    #[must_use]
    pub(crate) fn with_path(mut self, path: &ResponsePath) -> Self {
        self.path = path.0.clone();
        self
    }
}

impl From<async_graphql_parser::Error> for ServerError {
    fn from(err: async_graphql_parser::Error) -> Self {
        let positions: Vec<Pos> = err.positions().collect();
        positions
            .into_iter()
            .fold(ServerError::new(err.to_string()), ServerError::at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// The position of a value within the response, used to report errors.
#[derive(Debug, Default, Clone)]
pub(crate) struct ResponsePath(Vec<PathSegment>);

impl ResponsePath {
    pub fn child(&self, segment: impl Into<PathSegment>) -> ResponsePath {
        let mut path = self.0.clone();
        path.push(segment.into());
        ResponsePath(path)
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Field(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl fmt::Display for ResponsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Field(key) => f.write_str(key)?,
                PathSegment::Index(index) => write!(f, "{index}")?,
            }
        }
        Ok(())
    }
}
