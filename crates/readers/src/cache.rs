//! Redis-backed cache reader.
//!
//! Responsibilities:
//! - Wrap a synchronous Redis connection behind the `SourceReader` contract.
//! - Degrade to a disabled reader when the server is unreachable.
//!
//! Does NOT handle:
//! - Value typing or the structured-value envelope (resolver concern).
//!
//! Invariants:
//! - Construction never fails; an unreachable server yields a disabled reader.
//! - `set` with a TTL uses SETEX semantics; without one the key is unbounded.

use redis::Commands;
use tracing::warn;

use crate::error::ReaderError;
use crate::reader::SourceReader;
use crate::settings::CacheSettings;

const READER_NAME: &str = "cache";

/// `SourceReader` over a Redis server.
pub struct CacheReader {
    conn: Option<redis::Connection>,
    url: String,
}

impl CacheReader {
    /// Open a connection for the given settings.
    ///
    /// An unreachable server is logged and produces a disabled reader; it is
    /// never an error from the caller's perspective.
    pub fn connect(settings: &CacheSettings) -> Self {
        let url = settings.url();
        let conn = redis::Client::open(url.as_str()).and_then(|client| client.get_connection());
        match conn {
            Ok(conn) => Self {
                conn: Some(conn),
                url,
            },
            Err(err) => {
                warn!(url = %url, error = %err, "cache backend unreachable, reader disabled");
                Self { conn: None, url }
            }
        }
    }

    /// The connection URL this reader was built with.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn conn(&mut self) -> Result<&mut redis::Connection, ReaderError> {
        self.conn
            .as_mut()
            .ok_or(ReaderError::NotConfigured(READER_NAME))
    }

    fn backend_err(err: redis::RedisError) -> ReaderError {
        ReaderError::Backend {
            reader: READER_NAME,
            message: err.to_string(),
        }
    }
}

impl SourceReader for CacheReader {
    fn name(&self) -> &'static str {
        READER_NAME
    }

    fn enabled(&self) -> bool {
        self.conn.is_some()
    }

    fn get(&mut self, key: &str) -> Result<Option<String>, ReaderError> {
        let conn = self.conn()?;
        conn.get(key).map_err(Self::backend_err)
    }

    fn exists(&mut self, key: &str) -> Result<bool, ReaderError> {
        let conn = self.conn()?;
        conn.exists(key).map_err(Self::backend_err)
    }

    fn set(&mut self, key: &str, value: &str, ttl: Option<u64>) -> Result<(), ReaderError> {
        let conn = self.conn()?;
        match ttl {
            Some(seconds) => conn
                .set_ex::<_, _, ()>(key, value, seconds)
                .map_err(Self::backend_err),
            None => conn.set::<_, _, ()>(key, value).map_err(Self::backend_err),
        }
    }

    fn delete(&mut self, key: &str) -> Result<bool, ReaderError> {
        let conn = self.conn()?;
        let removed: i64 = conn.del(key).map_err(Self::backend_err)?;
        Ok(removed > 0)
    }

    fn close(&mut self) {
        // Dropping the connection closes the socket.
        self.conn = None;
    }
}
