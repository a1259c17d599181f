//! The capability contract every source reader implements.
//!
//! Responsibilities:
//! - Define the uniform get/exists/set/delete/close surface over one backend.
//!
//! Does NOT handle:
//! - Connection management or settings parsing (each reader owns its own).
//! - Value typing or envelope decoding (the resolver's concern).
//!
//! Invariants:
//! - Every call on a disabled reader returns `ReaderError::NotConfigured`.
//! - Readers perform no local caching; each call round-trips to the backend.

use crate::error::ReaderError;

/// Uniform adapter over one external key-value backend.
pub trait SourceReader {
    /// Short stable name used for registration and log context.
    fn name(&self) -> &'static str;

    /// Whether the backend connection was established and is still open.
    fn enabled(&self) -> bool;

    /// Fetch a value, `None` when the key is absent from the backend.
    fn get(&mut self, key: &str) -> Result<Option<String>, ReaderError>;

    /// Probe for a key without returning its value.
    fn exists(&mut self, key: &str) -> Result<bool, ReaderError>;

    /// Store a value, with an optional time-to-live in seconds.
    fn set(&mut self, key: &str, value: &str, ttl: Option<u64>) -> Result<(), ReaderError>;

    /// Remove a key; returns whether anything was deleted.
    fn delete(&mut self, key: &str) -> Result<bool, ReaderError>;

    /// Release the backend connection. Subsequent calls fail with
    /// `NotConfigured`. Closing twice is harmless.
    fn close(&mut self);
}
