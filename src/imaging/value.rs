//! Transformation arguments.
//!
//! Requests arrive from a loosely typed host (JSON today). Before anything in
//! the registry looks at them they are converted into the closed
//! [`ArgumentValue`] union, so each validator narrows the argument with an
//! exhaustive `match` instead of poking at dynamic types.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A single transformation argument.
///
/// `Map` uses a `BTreeMap`: key order carries no meaning for any
/// transformation, and a sorted map keeps error messages deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ArgumentValue {
    #[default]
    None,
    Integer(i64),
    Double(f64),
    String(String),
    List(Vec<ArgumentValue>),
    Map(BTreeMap<String, ArgumentValue>),
}

impl ArgumentValue {
    pub fn is_none(&self) -> bool {
        matches!(self, ArgumentValue::None)
    }

    /// Numeric view of the value. `Integer` and `Double` coerce into each
    /// other; every other tag yields `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgumentValue::Integer(i) => Some(*i as f64),
            ArgumentValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Short tag name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgumentValue::None => "null",
            ArgumentValue::Integer(_) => "integer",
            ArgumentValue::Double(_) => "double",
            ArgumentValue::String(_) => "string",
            ArgumentValue::List(_) => "list",
            ArgumentValue::Map(_) => "map",
        }
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentValue::None => write!(f, "null"),
            ArgumentValue::Integer(i) => write!(f, "{i}"),
            ArgumentValue::Double(d) => write!(f, "{d}"),
            ArgumentValue::String(s) => write!(f, "{s:?}"),
            ArgumentValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            ArgumentValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<i64> for ArgumentValue {
    fn from(value: i64) -> Self {
        ArgumentValue::Integer(value)
    }
}

impl From<f64> for ArgumentValue {
    fn from(value: f64) -> Self {
        ArgumentValue::Double(value)
    }
}

impl From<&str> for ArgumentValue {
    fn from(value: &str) -> Self {
        ArgumentValue::String(value.to_string())
    }
}

impl From<Vec<ArgumentValue>> for ArgumentValue {
    fn from(value: Vec<ArgumentValue>) -> Self {
        ArgumentValue::List(value)
    }
}

/// Returned when a JSON value has no counterpart in [`ArgumentValue`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0} values are not valid transformation arguments")]
pub struct UnsupportedJson(pub &'static str);

impl TryFrom<&serde_json::Value> for ArgumentValue {
    type Error = UnsupportedJson;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        Ok(match value {
            Value::Null => ArgumentValue::None,
            Value::Bool(_) => return Err(UnsupportedJson("boolean")),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ArgumentValue::Integer(i),
                // u64 beyond i64::MAX and all non-integral numbers
                None => ArgumentValue::Double(n.as_f64().ok_or(UnsupportedJson("number"))?),
            },
            Value::String(s) => ArgumentValue::String(s.clone()),
            Value::Array(items) => ArgumentValue::List(
                items
                    .iter()
                    .map(ArgumentValue::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => ArgumentValue::Map(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), ArgumentValue::try_from(v)?)))
                    .collect::<Result<_, UnsupportedJson>>()?,
            ),
        })
    }
}
