// Log events that producers hand to the sink
//
// The event model is deliberately host-shaped: the host logging pipeline
// renders the message template and stringifies exceptions before an event
// reaches the sink, so the sink only ever moves opaque strings plus a
// structured property tree. Using enums keeps the property tree a closed,
// pattern-matchable variant rather than a dynamic object facility.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Severity of a log event, ordered from least to most severe.
///
/// The variant names are what lands in the `Level` column, so they stay
/// Pascal-cased and within the column's 10-character width.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Level {
    #[default]
    Verbose,
    Debug,
    Information,
    Warning,
    Error,
    Fatal,
}

impl Level {
    /// The name stored in the `Level` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Verbose => "Verbose",
            Level::Debug => "Debug",
            Level::Information => "Information",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Fatal => "Fatal",
        }
    }
}

/// A primitive property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// A structured property value: scalar, sequence, mapping, or a typed
/// object with ordered named fields.
///
/// `Mapping` is a `BTreeMap` so the encoded `Properties` column is
/// deterministic; `Structured` keeps its field order because key/value-pair
/// type tags identify fields positionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Scalar(ScalarValue),
    Sequence(Vec<PropertyValue>),
    Mapping(BTreeMap<String, PropertyValue>),
    Structured {
        type_tag: Option<String>,
        fields: Vec<(String, PropertyValue)>,
    },
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Scalar(ScalarValue::Bool(value))
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Scalar(ScalarValue::Int(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Scalar(ScalarValue::Float(value))
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Scalar(ScalarValue::String(value.to_string()))
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Scalar(ScalarValue::String(value))
    }
}

/// One structured log record, as produced by the host pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    /// Wall-clock instant with its original timezone offset.
    pub timestamp: DateTime<FixedOffset>,
    pub level: Level,
    /// The pre-render template, opaque to the sink.
    pub message_template: String,
    /// The host's rendering of the template; this is what gets stored.
    pub rendered_message: String,
    /// Stringified error chain, if any.
    pub exception: Option<String>,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl LogEvent {
    /// Create an event with no exception and no properties.
    ///
    /// The message template defaults to the rendered message; hosts that
    /// distinguish the two set it via [`LogEvent::message_template`].
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        level: Level,
        rendered_message: impl Into<String>,
    ) -> Self {
        let rendered_message = rendered_message.into();
        Self {
            timestamp,
            level,
            message_template: rendered_message.clone(),
            rendered_message,
            exception: None,
            properties: BTreeMap::new(),
        }
    }

    /// Set the pre-render message template.
    pub fn message_template(mut self, template: impl Into<String>) -> Self {
        self.message_template = template.into();
        self
    }

    /// Attach a stringified exception.
    pub fn exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    /// Attach one named property.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}
