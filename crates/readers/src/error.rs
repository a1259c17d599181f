//! Error types for source readers.
//!
//! Responsibilities:
//! - Distinguish "reader never connected" from "live backend call failed".
//! - Keep backend error detail as plain text; never echo secret values.
//!
//! Invariants:
//! - `NotConfigured` is the only variant a disabled reader ever returns.
//! - Callers resolving a configuration chain treat `NotConfigured` as
//!   "no value from this source", not as a failure.

use thiserror::Error;

/// Errors raised by source-reader capability calls.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// The reader is disabled because its backend was unreachable at
    /// construction time (or it has been closed).
    #[error("{0} reader is not configured")]
    NotConfigured(&'static str),

    /// A call to a live backend failed.
    #[error("{reader} backend error: {message}")]
    Backend {
        reader: &'static str,
        message: String,
    },

    /// Connection settings were incomplete or unparseable.
    #[error("invalid reader settings for {var}: {message}")]
    InvalidSettings { var: String, message: String },
}
