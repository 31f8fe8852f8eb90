//! JSON encoder for the `Properties` column
//!
//! Converts an event's property map into the JSON text stored alongside the
//! rendered message. The column is a diagnostic dump for observability
//! consumers, not a parseable protocol; round-tripping is not a goal, but
//! the output shape is part of the sink's contract.

use crate::events::{PropertyValue, ScalarValue};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Type tags whose structured values are key/value pairs. The tag is a
/// stringly-typed hook exposed by the host and matched by prefix.
const KEY_VALUE_TAG_PREFIXES: &[&str] = &["DictionaryEntry", "KeyValuePair"];

/// Encode a property map as a JSON object string.
pub(crate) fn encode(properties: &BTreeMap<String, PropertyValue>) -> String {
    let mut map = Map::with_capacity(properties.len());
    for (name, value) in properties {
        map.insert(name.clone(), encode_value(value));
    }
    Value::Object(map).to_string()
}

fn encode_value(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Scalar(scalar) => encode_scalar(scalar),
        PropertyValue::Sequence(items) => Value::Array(items.iter().map(encode_value).collect()),
        PropertyValue::Mapping(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (name, value) in entries {
                map.insert(name.clone(), encode_value(value));
            }
            Value::Object(map)
        }
        PropertyValue::Structured { type_tag, fields } => {
            encode_structured(type_tag.as_deref(), fields)
        }
    }
}

fn encode_scalar(scalar: &ScalarValue) -> Value {
    match scalar {
        ScalarValue::Null => Value::Null,
        ScalarValue::Bool(b) => Value::Bool(*b),
        ScalarValue::Int(i) => Value::Number((*i).into()),
        // Non-finite floats have no JSON form
        ScalarValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        ScalarValue::String(s) => Value::String(s.clone()),
    }
}

/// Structured values normally become an object over their named fields.
/// Key/value-pair tags instead collapse to `{<key>: <value>}`, where the
/// first field supplies the key and the second the value.
fn encode_structured(type_tag: Option<&str>, fields: &[(String, PropertyValue)]) -> Value {
    if let Some(tag) = type_tag {
        if is_key_value_tag(tag) && fields.len() >= 2 {
            let mut map = Map::with_capacity(1);
            map.insert(key_string(&fields[0].1), encode_value(&fields[1].1));
            return Value::Object(map);
        }
    }
    let mut map = Map::with_capacity(fields.len());
    for (name, value) in fields {
        map.insert(name.clone(), encode_value(value));
    }
    Value::Object(map)
}

fn is_key_value_tag(tag: &str) -> bool {
    KEY_VALUE_TAG_PREFIXES
        .iter()
        .any(|prefix| tag.starts_with(prefix))
}

/// Key position of a key/value pair: string scalars verbatim, anything
/// else by its JSON text.
fn key_string(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Scalar(ScalarValue::String(s)) => s.clone(),
        other => encode_value(other).to_string(),
    }
}
