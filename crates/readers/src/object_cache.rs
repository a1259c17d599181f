//! Memcached-backed object-cache reader.
//!
//! Responsibilities:
//! - Wrap a Memcached client behind the `SourceReader` contract.
//! - Degrade to a disabled reader when the server is unreachable.
//!
//! Invariants:
//! - Construction never fails; an unreachable server yields a disabled reader.
//! - Memcached has no EXISTS command, so `exists` is a `get` probe.

use tracing::warn;

use crate::error::ReaderError;
use crate::reader::SourceReader;
use crate::settings::ObjectCacheSettings;

const READER_NAME: &str = "object-cache";

/// `SourceReader` over a Memcached server.
pub struct ObjectCacheReader {
    client: Option<memcache::Client>,
    url: String,
}

impl ObjectCacheReader {
    /// Open a connection for the given settings.
    ///
    /// An unreachable server is logged and produces a disabled reader; it is
    /// never an error from the caller's perspective.
    pub fn connect(settings: &ObjectCacheSettings) -> Self {
        let url = settings.url();
        match memcache::connect(url.as_str()) {
            Ok(client) => Self {
                client: Some(client),
                url,
            },
            Err(err) => {
                warn!(url = %url, error = %err, "object-cache backend unreachable, reader disabled");
                Self { client: None, url }
            }
        }
    }

    /// The connection URL this reader was built with.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn client(&mut self) -> Result<&memcache::Client, ReaderError> {
        self.client
            .as_ref()
            .ok_or(ReaderError::NotConfigured(READER_NAME))
    }

    fn backend_err(err: memcache::MemcacheError) -> ReaderError {
        ReaderError::Backend {
            reader: READER_NAME,
            message: err.to_string(),
        }
    }
}

impl SourceReader for ObjectCacheReader {
    fn name(&self) -> &'static str {
        READER_NAME
    }

    fn enabled(&self) -> bool {
        self.client.is_some()
    }

    fn get(&mut self, key: &str) -> Result<Option<String>, ReaderError> {
        let client = self.client()?;
        client.get::<String>(key).map_err(Self::backend_err)
    }

    fn exists(&mut self, key: &str) -> Result<bool, ReaderError> {
        Ok(self.get(key)?.is_some())
    }

    fn set(&mut self, key: &str, value: &str, ttl: Option<u64>) -> Result<(), ReaderError> {
        let client = self.client()?;
        // Memcached expiration of 0 means "never expire".
        let expiration = ttl.unwrap_or(0) as u32;
        client.set(key, value, expiration).map_err(Self::backend_err)
    }

    fn delete(&mut self, key: &str) -> Result<bool, ReaderError> {
        let client = self.client()?;
        client.delete(key).map_err(Self::backend_err)
    }

    fn close(&mut self) {
        self.client = None;
    }
}
