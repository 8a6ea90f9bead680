//! Field lookup within a [`ParsedRecord`].
//!
//! A field path is first looked up as an exact top-level key, then as a nested path where `.`
//! separates object keys and `[n]` indexes into arrays, e.g. `address.lines[0]`. The keys map,
//! the new image and the old image are probed in that order and the first map holding a value
//! wins. A `null` value counts as found.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bail;
use crate::error::{ErrorKind, IndexerResult};
use crate::types::{Document, ParsedRecord};

/// One field path or an ordered list of paths whose values are joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    Single(String),
    List(Vec<String>),
}

impl FieldSpec {
    pub fn paths(&self) -> &[String] {
        match self {
            FieldSpec::Single(path) => std::slice::from_ref(path),
            FieldSpec::List(paths) => paths,
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(path: &str) -> Self {
        FieldSpec::Single(path.to_string())
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSpec::Single(path) => write!(f, "{path}"),
            FieldSpec::List(paths) => write!(f, "[{}]", paths.join(", ")),
        }
    }
}

/// Resolves `path` against the keys map, then the new image, then the old image.
pub fn resolve<'a>(record: &'a ParsedRecord, path: &str) -> IndexerResult<&'a Value> {
    for image in record.images().into_iter().flatten() {
        if let Some(value) = lookup(image, path) {
            return Ok(value);
        }
    }

    bail!(
        ErrorKind::FieldNotFound,
        "Field could not be resolved",
        format!("field `{path}` was not found in the record keys, new image or old image")
    );
}

/// Resolves every path of `spec` and joins the stringified values with `separator`.
pub fn resolve_list(
    record: &ParsedRecord,
    spec: &FieldSpec,
    separator: &str,
) -> IndexerResult<String> {
    let parts = spec
        .paths()
        .iter()
        .map(|path| resolve(record, path).map(value_to_string))
        .collect::<IndexerResult<Vec<_>>>()?;

    Ok(parts.join(separator))
}

/// Renders a value as an identity part.
///
/// Strings are taken verbatim, `null` becomes the empty string and every other value its
/// compact JSON text.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Looks up `path` in one map, preferring an exact key match.
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    if let Some(value) = document.get(path) {
        return Some(value);
    }

    let mut segments = parse_path(path)?.into_iter();
    let Some(Segment::Key(first)) = segments.next() else {
        return None;
    };

    segments.try_fold(document.get(first)?, |current, segment| match segment {
        Segment::Key(key) => current.as_object()?.get(key),
        Segment::Index(index) => current.as_array()?.get(index),
    })
}

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Splits `a.b[0].c` into segments, returning `None` for malformed paths.
fn parse_path(path: &str) -> Option<Vec<Segment<'_>>> {
    let mut segments = Vec::new();

    for part in path.split('.') {
        let (key, mut rest) = match part.find('[') {
            Some(position) => part.split_at(position),
            None => (part, ""),
        };

        if !key.is_empty() {
            segments.push(Segment::Key(key));
        } else if segments.is_empty() || rest.is_empty() {
            return None;
        }

        while !rest.is_empty() {
            let close = rest.find(']')?;
            let index = rest.get(1..close)?.parse::<usize>().ok()?;
            segments.push(Segment::Index(index));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return None;
            }
        }
    }

    Some(segments)
}
