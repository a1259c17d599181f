//! Typed read accessors for the resolver.
//!
//! Responsibilities:
//! - Implement the precedence chain for every read: explicit mapping →
//!   process environment → source readers → caller fallback.
//! - Provide the typed views (bool, int, list, dict, section) over resolved
//!   values.
//!
//! Invariants:
//! - Section-qualified lookups consult the mapping for a section-keyed entry
//!   and then the INI store; they never fall through to the environment or
//!   the readers.
//! - "Missing" is an explicit `None`; a present-but-empty value still
//!   resolves.
//! - `exists`/`contains` agree with `get`'s notion of "found".

use std::collections::HashMap;

use super::Resolver;
use crate::environ;
use crate::error::ConfigError;
use crate::value::ConfigValue;

impl Resolver {
    /// Resolve a key through the source chain. Values read from text-only
    /// sources are envelope-decoded transparently.
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        self.get_from(None, key)
    }

    /// Section-qualified resolution: with a section, the mapping is checked
    /// for a section-keyed entry and then the INI store is consulted.
    pub fn get_from(&self, section: Option<&str>, key: &str) -> Option<ConfigValue> {
        if let Some(section) = section {
            if let Some(value) = self.mapping.get(section) {
                return Some(value.clone());
            }
            return self
                .ini
                .get_from(section, key)
                .map(|raw| ConfigValue::Str(raw.to_string()));
        }

        if let Some(value) = self.mapping.get(key) {
            return Some(value.clone());
        }
        if let Some(raw) = environ::raw(key) {
            return Some(ConfigValue::from_text(&raw));
        }
        self.readers
            .borrow_mut()
            .lookup(key)
            .map(|raw| ConfigValue::from_text(&raw))
    }

    /// Resolve a key, falling back to the supplied value when nothing is
    /// found.
    pub fn get_or(&self, key: &str, fallback: impl Into<ConfigValue>) -> ConfigValue {
        self.get(key).unwrap_or_else(|| fallback.into())
    }

    /// Resolve a key as a boolean using the conventional truthy/falsy sets.
    /// An unrecognized value yields `None`, never an error.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_bool_from(None, key)
    }

    /// Section-qualified [`Self::get_bool`].
    pub fn get_bool_from(&self, section: Option<&str>, key: &str) -> Option<bool> {
        self.get_from(section, key).and_then(|v| v.as_bool())
    }

    /// Resolve a key as an integer. A non-numeric value yields `None`.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get_int_from(None, key)
    }

    /// Section-qualified [`Self::get_int`].
    pub fn get_int_from(&self, section: Option<&str>, key: &str) -> Option<i64> {
        self.get_from(section, key).and_then(|v| v.as_int())
    }

    /// Resolve a key as a list of strings: comma-split for strings, returned
    /// unchanged for lists, and empty when nothing resolves — the result is
    /// always safe to iterate.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key).map(|v| v.to_list()).unwrap_or_default()
    }

    /// Resolve a key as a structured dictionary.
    ///
    /// Consults only the explicit mapping and the process environment;
    /// structured dictionaries are expected to be explicitly set or loaded,
    /// never read from a remote text store.
    pub fn get_dict(&self, key: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
        let value = self.mapping.get(key).cloned().or_else(|| {
            environ::raw(key).map(|raw| ConfigValue::from_text(&raw))
        })?;
        match value {
            ConfigValue::Structured(serde_json::Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// Snapshot an INI section, empty if the section is absent.
    pub fn section(&self, name: &str) -> HashMap<String, String> {
        self.ini.section(name)
    }

    /// Attribute-style access: resolves like [`Self::get`], coerces
    /// boolean-state and all-digit strings, and distinguishes "missing" from
    /// "present but falsy" by failing with [`ConfigError::MissingKey`].
    pub fn attr(&self, key: &str) -> Result<ConfigValue, ConfigError> {
        self.get(key)
            .map(ConfigValue::coerced)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    /// Probe the chain for a key without returning its value. Agrees with
    /// [`Self::get`]'s notion of "found".
    pub fn exists(&self, key: &str) -> bool {
        if self.mapping.contains_key(key) || environ::contains(key) {
            return true;
        }
        self.readers.borrow_mut().probe(key)
    }

    /// Container-membership form of [`Self::exists`].
    pub fn contains(&self, key: &str) -> bool {
        self.exists(key)
    }
}
