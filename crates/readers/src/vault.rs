//! HashiCorp Vault secret reader over the KV HTTP API.
//!
//! Responsibilities:
//! - Wrap the Vault KV v1/v2 endpoints behind the `SourceReader` contract.
//! - Scope bare keys to an environment path (`{mount}/{env}`); keys of the
//!   form `path/key` address `{mount}/{path}` directly.
//! - Provide `list()` for bulk retrieval of every secret under a path.
//!
//! Does NOT handle:
//! - Token acquisition or renewal; a token is supplied via settings.
//!
//! Invariants:
//! - Construction validates the token with `auth/token/lookup-self`; any
//!   failure yields a disabled reader, never an error.
//! - `set`/`delete` are read-modify-write of the whole secret at the path,
//!   preserving sibling keys.
//! - A missing secret path reads as an empty result, not an error.

use std::collections::HashMap;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ReaderError;
use crate::reader::SourceReader;
use crate::settings::VaultSettings;

const READER_NAME: &str = "secret";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `SourceReader` over a HashiCorp Vault KV mount.
pub struct VaultReader {
    http: Option<reqwest::blocking::Client>,
    base_url: String,
    token: SecretString,
    mount_point: String,
    version: u8,
    env: String,
}

impl VaultReader {
    /// Connect and validate the token for the given settings, scoped to an
    /// environment name used as the default secret path.
    ///
    /// An unreachable or unauthenticated server is logged and produces a
    /// disabled reader; it is never an error from the caller's perspective.
    pub fn connect(settings: VaultSettings, env: &str) -> Self {
        let base_url = settings.url.trim_end_matches('/').to_string();
        let mut reader = Self {
            http: None,
            base_url,
            token: settings.token,
            mount_point: settings.mount_point,
            version: settings.version,
            env: env.to_string(),
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(settings.skip_verify)
            .build();
        let client = match client {
            Ok(client) => client,
            Err(err) => {
                warn!(error = %err, "failed to build HTTP client, secret reader disabled");
                return reader;
            }
        };

        let lookup = format!("{}/v1/auth/token/lookup-self", reader.base_url);
        let authenticated = client
            .get(&lookup)
            .header("X-Vault-Token", reader.token.expose_secret())
            .send()
            .map(|resp| resp.status().is_success());
        match authenticated {
            Ok(true) => {
                debug!(url = %reader.base_url, "secret store connected");
                reader.http = Some(client);
            }
            Ok(false) => {
                warn!(url = %reader.base_url, "secret store rejected the token, reader disabled");
            }
            Err(err) => {
                warn!(url = %reader.base_url, error = %err, "secret store unreachable, reader disabled");
            }
        }
        reader
    }

    /// The environment name used as the default secret path.
    pub fn env(&self) -> &str {
        &self.env
    }

    /// Fetch every key/value pair stored under a path (default: the
    /// environment path). Non-string values are re-encoded as JSON text.
    pub fn list(&mut self, path: Option<&str>) -> Result<HashMap<String, String>, ReaderError> {
        let path = path.unwrap_or(&self.env).to_string();
        let data = self.read_secret(&path)?;
        Ok(data
            .into_iter()
            .map(|(key, value)| (key, value_to_text(&value)))
            .collect())
    }

    fn http(&self) -> Result<&reqwest::blocking::Client, ReaderError> {
        self.http
            .as_ref()
            .ok_or(ReaderError::NotConfigured(READER_NAME))
    }

    fn secret_url(&self, path: &str) -> String {
        if self.version == 1 {
            format!("{}/v1/{}/{}", self.base_url, self.mount_point, path)
        } else {
            format!("{}/v1/{}/data/{}", self.base_url, self.mount_point, path)
        }
    }

    /// Split `path/key` into its secret path and key; a bare key lives under
    /// the environment path.
    fn split_key<'a>(&'a self, key: &'a str) -> (&'a str, &'a str) {
        match key.rsplit_once('/') {
            Some((path, key)) if !path.is_empty() => (path, key),
            _ => (self.env.as_str(), key),
        }
    }

    fn read_secret(&mut self, path: &str) -> Result<serde_json::Map<String, Value>, ReaderError> {
        let url = self.secret_url(path);
        let token = self.token.expose_secret().to_string();
        let response = self
            .http()?
            .get(&url)
            .header("X-Vault-Token", token)
            .send()
            .map_err(backend_err)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(serde_json::Map::new());
        }
        if !response.status().is_success() {
            return Err(ReaderError::Backend {
                reader: READER_NAME,
                message: format!("read of {path:?} failed with status {}", response.status()),
            });
        }

        let body: Value = response.json().map_err(backend_err)?;
        let data = if self.version == 1 {
            body.get("data")
        } else {
            body.get("data").and_then(|d| d.get("data"))
        };
        Ok(data
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default())
    }

    fn write_secret(
        &mut self,
        path: &str,
        data: serde_json::Map<String, Value>,
    ) -> Result<(), ReaderError> {
        let url = self.secret_url(path);
        let token = self.token.expose_secret().to_string();
        let payload = if self.version == 1 {
            Value::Object(data)
        } else {
            serde_json::json!({ "data": data })
        };
        let response = self
            .http()?
            .post(&url)
            .header("X-Vault-Token", token)
            .json(&payload)
            .send()
            .map_err(backend_err)?;

        if !response.status().is_success() {
            return Err(ReaderError::Backend {
                reader: READER_NAME,
                message: format!("write of {path:?} failed with status {}", response.status()),
            });
        }
        Ok(())
    }
}

fn backend_err(err: reqwest::Error) -> ReaderError {
    ReaderError::Backend {
        reader: READER_NAME,
        message: err.to_string(),
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl SourceReader for VaultReader {
    fn name(&self) -> &'static str {
        READER_NAME
    }

    fn enabled(&self) -> bool {
        self.http.is_some()
    }

    fn get(&mut self, key: &str) -> Result<Option<String>, ReaderError> {
        let (path, key) = self.split_key(key);
        let (path, key) = (path.to_string(), key.to_string());
        let data = self.read_secret(&path)?;
        Ok(data.get(&key).map(value_to_text))
    }

    fn exists(&mut self, key: &str) -> Result<bool, ReaderError> {
        let (path, key) = self.split_key(key);
        let (path, key) = (path.to_string(), key.to_string());
        let data = self.read_secret(&path)?;
        Ok(data.contains_key(&key))
    }

    fn set(&mut self, key: &str, value: &str, _ttl: Option<u64>) -> Result<(), ReaderError> {
        let (path, key) = self.split_key(key);
        let (path, key) = (path.to_string(), key.to_string());
        let mut data = self.read_secret(&path)?;
        data.insert(key, Value::String(value.to_string()));
        self.write_secret(&path, data)
    }

    fn delete(&mut self, key: &str) -> Result<bool, ReaderError> {
        let (path, key) = self.split_key(key);
        let (path, key) = (path.to_string(), key.to_string());
        let mut data = self.read_secret(&path)?;
        if data.remove(&key).is_none() {
            return Ok(false);
        }
        self.write_secret(&path, data)?;
        Ok(true)
    }

    fn close(&mut self) {
        self.http = None;
    }
}
