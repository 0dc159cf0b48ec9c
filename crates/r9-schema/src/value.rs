//! Raw and normalized property values.
//!
//! [`RawValue`] is what an element-graph provider hands over: untrusted,
//! loosely typed, possibly a number where text was expected. [`FieldValue`]
//! is what survives validation: a string or a finite number, nothing else.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// An untrusted property value as read from a source element.
///
/// Absent and null values are represented by `Option::None` at the call
/// site, never by a variant here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// A boolean property.
    Boolean(bool),
    /// An integral property.
    Integer(i64),
    /// A floating-point property.
    Decimal(f64),
    /// A text property.
    Text(String),
}

impl RawValue {
    /// The string form every validator works from.
    ///
    /// Integers render without a fractional part, decimals in their
    /// shortest round-trip form, booleans as `True` / `False`.
    pub fn to_text(&self) -> String {
        match self {
            RawValue::Boolean(true) => "True".to_string(),
            RawValue::Boolean(false) => "False".to_string(),
            RawValue::Integer(i) => i.to_string(),
            RawValue::Decimal(f) => f.to_string(),
            RawValue::Text(s) => s.clone(),
        }
    }

    /// Convert a JSON value. Null maps to `None`; arrays and objects are
    /// kept as their JSON text so validation fails on them with a literal.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(RawValue::Boolean(*b)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => RawValue::Integer(i),
                None => RawValue::Decimal(n.as_f64().unwrap_or(f64::NAN)),
            }),
            Value::String(s) => Some(RawValue::Text(s.clone())),
            other => Some(RawValue::Text(other.to_string())),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Integer(i)
    }
}

impl From<f64> for RawValue {
    fn from(f: f64) -> Self {
        RawValue::Decimal(f)
    }
}

/// A validated, normalized field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Normalized text.
    Text(String),
    /// A finite number.
    Number(f64),
}

impl FieldValue {
    /// The text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }

    /// The number, if this is a numeric value.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    /// JSON rendering of the value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Text(s) => serde_json::Value::String(s.clone()),
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A named collection of raw properties.
///
/// Providers implement this for their element type. A property whose value
/// is null must be reported as `None`.
pub trait PropertySource {
    /// Value of the property called `name`, if present and non-null.
    fn property(&self, name: &str) -> Option<RawValue>;
}

impl PropertySource for BTreeMap<String, RawValue> {
    fn property(&self, name: &str) -> Option<RawValue> {
        self.get(name).cloned()
    }
}

impl PropertySource for HashMap<String, RawValue> {
    fn property(&self, name: &str) -> Option<RawValue> {
        self.get(name).cloned()
    }
}

impl PropertySource for BTreeMap<String, Option<RawValue>> {
    fn property(&self, name: &str) -> Option<RawValue> {
        self.get(name).cloned().flatten()
    }
}

impl PropertySource for serde_json::Map<String, serde_json::Value> {
    fn property(&self, name: &str) -> Option<RawValue> {
        self.get(name).and_then(RawValue::from_json)
    }
}
