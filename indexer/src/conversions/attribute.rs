//! Decoding of typed attribute values.
//!
//! Change records carry their images as maps of typed attribute values, each a single entry
//! object such as `{"S": "k1"}` or `{"N": "5"}`. This module turns them into plain JSON.

use serde_json::{Map, Number, Value};

use crate::bail;
use crate::error::{ErrorKind, IndexerError, IndexerResult};
use crate::types::Document;

/// Decodes every attribute of an image into a plain [`Document`].
pub fn decode_image(image: &Map<String, Value>) -> IndexerResult<Document> {
    image
        .iter()
        .map(|(name, attribute)| {
            let value = decode_attribute(attribute)?;
            Ok::<_, IndexerError>((name.clone(), value))
        })
        .collect()
}

/// Decodes one typed attribute value.
pub fn decode_attribute(attribute: &Value) -> IndexerResult<Value> {
    let Some((tag, value)) = single_entry(attribute) else {
        bail!(
            ErrorKind::ConversionError,
            "Invalid attribute value",
            format!("attribute value must be an object with exactly one type tag, got {attribute}")
        );
    };

    match tag {
        "S" | "B" => expect_string(tag, value).map(|s| Value::String(s.to_string())),
        "N" => parse_number(expect_string(tag, value)?).map(Value::Number),
        "BOOL" => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            other => bail!(
                ErrorKind::ConversionError,
                "Invalid attribute value",
                format!("`BOOL` attribute must hold a boolean, got {other}")
            ),
        },
        "NULL" => Ok(Value::Null),
        "M" => match value {
            Value::Object(map) => decode_image(map).map(Value::Object),
            other => bail!(
                ErrorKind::ConversionError,
                "Invalid attribute value",
                format!("`M` attribute must hold an object, got {other}")
            ),
        },
        "L" => expect_array(tag, value)?
            .iter()
            .map(decode_attribute)
            .collect::<IndexerResult<Vec<_>>>()
            .map(Value::Array),
        "SS" | "BS" => expect_array(tag, value)?
            .iter()
            .map(|item| expect_string(tag, item).map(|s| Value::String(s.to_string())))
            .collect::<IndexerResult<Vec<_>>>()
            .map(Value::Array),
        "NS" => expect_array(tag, value)?
            .iter()
            .map(|item| parse_number(expect_string(tag, item)?).map(Value::Number))
            .collect::<IndexerResult<Vec<_>>>()
            .map(Value::Array),
        other => bail!(
            ErrorKind::ConversionError,
            "Unknown attribute type",
            format!("attribute type `{other}` is not supported")
        ),
    }
}

/// Parses a numeric attribute into the narrowest JSON number.
pub fn parse_number(s: &str) -> IndexerResult<Number> {
    let s = s.trim();

    if let Ok(n) = s.parse::<i64>() {
        return Ok(Number::from(n));
    }

    if let Ok(n) = s.parse::<u64>() {
        return Ok(Number::from(n));
    }

    match s.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) => Ok(n),
        None => bail!(
            ErrorKind::ConversionError,
            "Invalid numeric attribute",
            format!("`{s}` is not a finite number")
        ),
    }
}

fn single_entry(attribute: &Value) -> Option<(&str, &Value)> {
    let object = attribute.as_object()?;
    if object.len() != 1 {
        return None;
    }

    object.iter().next().map(|(tag, value)| (tag.as_str(), value))
}

fn expect_string<'a>(tag: &str, value: &'a Value) -> IndexerResult<&'a str> {
    match value {
        Value::String(s) => Ok(s),
        other => bail!(
            ErrorKind::ConversionError,
            "Invalid attribute value",
            format!("`{tag}` attribute must hold a string, got {other}")
        ),
    }
}

fn expect_array<'a>(tag: &str, value: &'a Value) -> IndexerResult<&'a Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => bail!(
            ErrorKind::ConversionError,
            "Invalid attribute value",
            format!("`{tag}` attribute must hold an array, got {other}")
        ),
    }
}
