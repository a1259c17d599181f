//! Source-reader adapters for remote key-value backends.
//!
//! This crate provides uniform wrappers around the external stores a
//! configuration resolver can consult at runtime: a cache store (Redis), an
//! object-cache store (Memcached), and a secret store (HashiCorp Vault).
//!
//! Every reader follows the same degradation contract: constructing a reader
//! against an unreachable backend never returns an error. The reader comes
//! back disabled, and each subsequent capability call fails with
//! [`ReaderError::NotConfigured`], which callers treat as "this source yields
//! no value". A process must be able to start with file/environment-only
//! configuration even when every remote backend is down.

mod cache;
mod error;
mod object_cache;
mod reader;
mod settings;
mod vault;

pub use cache::CacheReader;
pub use error::ReaderError;
pub use object_cache::ObjectCacheReader;
pub use reader::SourceReader;
pub use settings::{CacheSettings, ObjectCacheSettings, VaultSettings};
pub use vault::VaultReader;
