//! The configuration value union and its text envelope.
//!
//! Responsibilities:
//! - Model the value kinds a resolver can hold (string, integer, boolean,
//!   list, structured).
//! - Encode structured values for text-only backends and decode them back.
//! - Provide the shared boolean/integer parsing used by the typed accessors.
//!
//! Invariants:
//! - `from_text(to_text(v)) == v` for every structured value.
//! - A malformed envelope decodes to the raw string unchanged, never an error.

use serde_json::Value;
use std::fmt;

use crate::constants::{FALSY_STATES, JSON_ENVELOPE_PREFIX, TRUTHY_STATES};

/// A configuration value as held by the resolver's mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
    /// An arbitrary serializable value, carried through text-only backends
    /// inside the JSON envelope.
    Structured(Value),
}

impl ConfigValue {
    /// The string form, for `Str` values only.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as a boolean using the shared truthy/falsy sets.
    /// Unrecognized strings yield `None`, not an error.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::Int(0) => Some(false),
            ConfigValue::Int(1) => Some(true),
            ConfigValue::Str(s) => parse_bool(s),
            ConfigValue::Structured(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Interpret the value as an integer. Non-numeric strings yield `None`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(n) => Some(*n),
            ConfigValue::Str(s) => s.trim().parse().ok(),
            ConfigValue::Structured(Value::Number(n)) => n.as_i64(),
            _ => None,
        }
    }

    /// Interpret the value as a list of strings.
    ///
    /// Strings split on commas; an existing list is returned unchanged; an
    /// empty string yields an empty list so the result is always safe to
    /// iterate.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            ConfigValue::List(items) => items.clone(),
            ConfigValue::Str(s) if s.is_empty() => Vec::new(),
            ConfigValue::Str(s) => s.split(',').map(str::to_string).collect(),
            ConfigValue::Structured(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            other => vec![other.to_text()],
        }
    }

    /// Render the value for a text-only backend (process environment, cache,
    /// secret store). Structured values are wrapped in the JSON envelope.
    pub fn to_text(&self) -> String {
        match self {
            ConfigValue::Str(s) => s.clone(),
            ConfigValue::Int(n) => n.to_string(),
            ConfigValue::Bool(b) => b.to_string(),
            ConfigValue::List(items) => items.join(","),
            ConfigValue::Structured(value) => {
                format!("{JSON_ENVELOPE_PREFIX}{value}")
            }
        }
    }

    /// Decode a value read back from a text-only backend.
    ///
    /// Only an exact envelope prefix triggers decoding; a payload that fails
    /// to parse falls back to the raw string unchanged.
    pub fn from_text(raw: &str) -> ConfigValue {
        if let Some(payload) = raw.strip_prefix(JSON_ENVELOPE_PREFIX) {
            if let Ok(value) = serde_json::from_str(payload) {
                return ConfigValue::Structured(value);
            }
        }
        ConfigValue::Str(raw.to_string())
    }

    /// Coerce boolean-state and all-digit strings to their typed form, used
    /// by attribute-style access. Everything else passes through unchanged.
    pub fn coerced(self) -> ConfigValue {
        match self {
            ConfigValue::Str(s) => {
                if let Some(b) = parse_bool(&s) {
                    ConfigValue::Bool(b)
                } else if let Ok(n) = s.trim().parse::<i64>() {
                    ConfigValue::Int(n)
                } else {
                    ConfigValue::Str(s)
                }
            }
            other => other,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Str(s) => f.write_str(s),
            ConfigValue::Int(n) => write!(f, "{n}"),
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::List(items) => f.write_str(&items.join(",")),
            ConfigValue::Structured(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Str(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Str(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        ConfigValue::Int(n)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(items: Vec<String>) -> Self {
        ConfigValue::List(items)
    }
}

impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => ConfigValue::Str(s),
            Value::Bool(b) => ConfigValue::Bool(b),
            Value::Number(n) if n.is_i64() => ConfigValue::Int(n.as_i64().unwrap_or_default()),
            other => ConfigValue::Structured(other),
        }
    }
}

/// Parse a boolean from its conventional string forms, case-insensitively.
/// Unrecognized strings yield `None` so callers can apply their own fallback.
pub fn parse_bool(raw: &str) -> Option<bool> {
    let lowered = raw.trim().to_ascii_lowercase();
    if TRUTHY_STATES.contains(&lowered.as_str()) {
        Some(true)
    } else if FALSY_STATES.contains(&lowered.as_str()) {
        Some(false)
    } else {
        None
    }
}
