//! Centralized process-environment access.
//!
//! Responsibilities:
//! - Funnel every read and write of process environment variables through one
//!   module so the override discipline is enforced in exactly one place.
//!
//! Does NOT handle:
//! - Value typing or envelope decoding (see `value.rs`).
//!
//! Invariants:
//! - `publish` never clobbers an existing variable unless `override` is set.
//! - This module contains the crate's only environment mutation.

use crate::value::parse_bool;

/// Read a variable, returning `None` if unset, empty, or whitespace-only.
/// The value is trimmed. Used for toggles and settings.
pub(crate) fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == s.len() {
            Some(s)
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Read a variable verbatim. Unlike [`var`], an empty value is still a
/// present value — resolution must distinguish "missing" from
/// "present but empty".
pub(crate) fn raw(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Whether a variable is present at all.
pub(crate) fn contains(key: &str) -> bool {
    std::env::var_os(key).is_some()
}

/// Read a boolean toggle, falling back to `default` when unset or
/// unrecognized.
pub(crate) fn flag(key: &str, default: bool) -> bool {
    var(key).and_then(|v| parse_bool(&v)).unwrap_or(default)
}

/// Write a variable, honoring the override flag: when `override_existing` is
/// false a variable that is already present is left untouched.
pub(crate) fn publish(key: &str, value: &str, override_existing: bool) {
    if override_existing || !contains(key) {
        // SAFETY: environment mutation is confined to this module, and the
        // resolver's single-threaded configuration contract means no other
        // thread is reading the environment concurrently.
        unsafe { std::env::set_var(key, value) };
    }
}

/// Publish a batch of key/value pairs, honoring the override flag per key.
pub(crate) fn publish_pairs<'a, I>(pairs: I, override_existing: bool)
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    for (key, value) in pairs {
        publish(key, value, override_existing);
    }
}
