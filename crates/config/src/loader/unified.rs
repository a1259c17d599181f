//! Unified vault + file loader — the default loading strategy.
//!
//! Responsibilities:
//! - Combine the base `.env` file, environment-scoped secrets from the
//!   remote store, and supplemental `.env.*` files into one merged mapping.
//! - Extract remote-store credentials from the base file (with process
//!   environment fallback) and degrade to file-only loading when they are
//!   missing or the store is unreachable.
//!
//! Does NOT handle:
//! - Query-time resolution or the source-reader chain (see `resolver/`).
//!
//! Invariants:
//! - Every step tolerates partial failure; only a missing environment
//!   directory fails construction.
//! - Merge precedence, highest first: remote store > base file >
//!   supplemental files.
//! - The final merged set is published to the process environment, subject
//!   to the override flag.

use std::collections::HashMap;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::Serialize;
use tracing::{debug, warn};

use lamina_readers::{SourceReader, VaultReader, VaultSettings};

use super::file::{ensure_env_dir, file_is_empty, resolve_patterns};
use super::{LoadStats, parse_env_file};
use crate::constants::{
    BASE_ENV_FILE, DEFAULT_VAULT_MOUNT, VAULT_ENABLED_VAR, VAULT_MOUNT_POINT_VAR,
    VAULT_SKIP_VERIFY_VAR, VAULT_TOKEN_VAR, VAULT_URL_VAR, VAULT_VERSION_VAR,
};
use crate::environ;
use crate::error::ConfigError;
use crate::value::parse_bool;

/// Remote-store status from the last load, with the token excluded.
#[derive(Debug, Clone, Serialize)]
pub struct VaultStatus {
    pub enabled: bool,
    pub connected: bool,
    pub mount_point: Option<String>,
    pub environment: String,
    pub secrets_loaded: usize,
}

/// Loader combining the base file, the remote secret store, and supplemental
/// files for one environment.
pub struct UnifiedLoader {
    env_dir: PathBuf,
    env: String,
    patterns: Vec<String>,
    override_env: bool,
    auto_discovery: bool,
    vault_enabled: bool,
    vault_connected: bool,
    vault_settings: Option<VaultSettings>,
    loaded: Vec<PathBuf>,
    stats: LoadStats,
}

impl UnifiedLoader {
    /// Build a loader for an environment directory. The directory must exist
    /// unless `create` is set.
    pub fn new(
        env_dir: PathBuf,
        env: &str,
        override_env: bool,
        create: bool,
        auto_discovery: bool,
        patterns: Option<Vec<String>>,
    ) -> Result<Self, ConfigError> {
        ensure_env_dir(&env_dir, create)?;
        let patterns = resolve_patterns(&env_dir, auto_discovery, patterns);
        Ok(Self {
            env_dir,
            env: env.to_string(),
            patterns,
            override_env,
            auto_discovery,
            vault_enabled: false,
            vault_connected: false,
            vault_settings: None,
            loaded: Vec::new(),
            stats: LoadStats::default(),
        })
    }

    /// The environment this loader serves.
    pub fn env(&self) -> &str {
        &self.env
    }

    /// Files successfully loaded by the last load.
    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded
    }

    /// Diagnostic counts from the last load.
    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    /// Remote-store status from the last load.
    pub fn vault_status(&self) -> VaultStatus {
        VaultStatus {
            enabled: self.vault_enabled,
            connected: self.vault_connected,
            mount_point: self
                .vault_settings
                .as_ref()
                .map(|settings| settings.mount_point.clone()),
            environment: self.env.clone(),
            secrets_loaded: self.stats.vault_keys,
        }
    }

    /// Run the five loading steps and return the merged mapping.
    pub fn load(&mut self) -> Result<HashMap<String, String>, ConfigError> {
        self.loaded.clear();
        self.vault_enabled = false;
        self.vault_connected = false;
        self.vault_settings = None;

        let base = self.load_base_file();
        let vault = self.load_from_vault();
        let supplemental = self.load_supplemental_files();

        // Merge precedence: vault > base > supplemental.
        let mut merged = base;
        for (key, value) in supplemental {
            merged.entry(key).or_insert(value);
        }
        let file_keys = merged.len();
        let vault_keys = vault.len();
        merged.extend(vault);

        environ::publish_pairs(merged.iter(), self.override_env);

        self.stats = LoadStats {
            vault_keys,
            file_keys,
            total_keys: merged.len(),
        };
        if merged.is_empty() {
            warn!(env = %self.env, "no configuration loaded for environment");
        } else {
            debug!(
                env = %self.env,
                vault_keys,
                file_keys,
                total = merged.len(),
                "environment loaded"
            );
        }
        Ok(merged)
    }

    /// Re-point at a sibling environment directory and reload. All loader
    /// state is restored if the switch fails.
    pub fn switch_environment(
        &mut self,
        env: &str,
    ) -> Result<HashMap<String, String>, ConfigError> {
        if env == self.env {
            return self.load();
        }
        let new_dir = self
            .env_dir
            .parent()
            .map(|parent| parent.join(env))
            .unwrap_or_else(|| PathBuf::from(env));
        if !new_dir.is_dir() {
            return Err(ConfigError::MissingEnvDir(new_dir));
        }

        let old_env = std::mem::replace(&mut self.env, env.to_string());
        let old_dir = std::mem::replace(&mut self.env_dir, new_dir);
        let old_patterns = std::mem::replace(
            &mut self.patterns,
            resolve_patterns(&self.env_dir, self.auto_discovery, None),
        );

        match self.load() {
            Ok(merged) => Ok(merged),
            Err(err) => {
                self.env = old_env;
                self.env_dir = old_dir;
                self.patterns = old_patterns;
                Err(err)
            }
        }
    }

    /// Step 1: parse the base file, publish it, and extract remote-store
    /// credentials from it.
    fn load_base_file(&mut self) -> HashMap<String, String> {
        let path = self.env_dir.join(BASE_ENV_FILE);
        let mut base = HashMap::new();

        if path.is_file() && !file_is_empty(&path).unwrap_or(true) {
            match parse_env_file(&path) {
                Ok(pairs) => {
                    for (key, value) in &pairs {
                        environ::publish(key, value, self.override_env);
                    }
                    base.extend(pairs);
                    self.loaded.push(path.clone());
                    debug!(path = %path.display(), "loaded base environment file");
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "error loading base environment file");
                }
            }
        } else {
            debug!(path = %path.display(), "no base environment file");
        }

        self.extract_vault_config(&base);
        base
    }

    /// Pull the remote-store connection parameters out of the base-file data,
    /// falling back to the process environment for anything absent.
    fn extract_vault_config(&mut self, base: &HashMap<String, String>) {
        let lookup = |key: &str| base.get(key).cloned().or_else(|| environ::var(key));

        let enabled = lookup(VAULT_ENABLED_VAR)
            .and_then(|v| parse_bool(&v))
            .unwrap_or(false);
        if !enabled {
            return;
        }

        let url = lookup(VAULT_URL_VAR);
        let token = lookup(VAULT_TOKEN_VAR);
        let (Some(url), Some(token)) = (url, token) else {
            warn!(
                "secret store enabled but {} or {} is missing, falling back to file-only loading",
                VAULT_URL_VAR, VAULT_TOKEN_VAR
            );
            return;
        };

        self.vault_settings = Some(VaultSettings {
            url,
            token: SecretString::new(token.into()),
            mount_point: lookup(VAULT_MOUNT_POINT_VAR)
                .unwrap_or_else(|| DEFAULT_VAULT_MOUNT.to_string()),
            version: lookup(VAULT_VERSION_VAR)
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            skip_verify: lookup(VAULT_SKIP_VERIFY_VAR)
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),
        });
        self.vault_enabled = true;
    }

    /// Step 2: query the remote store for the environment's secrets. Any
    /// failure degrades to an empty result.
    fn load_from_vault(&mut self) -> HashMap<String, String> {
        if !self.vault_enabled {
            return HashMap::new();
        }
        let Some(settings) = self.vault_settings.clone() else {
            return HashMap::new();
        };

        let mut reader = VaultReader::connect(settings, &self.env);
        if !reader.enabled() {
            warn!(env = %self.env, "secret store unavailable, continuing with files only");
            return HashMap::new();
        }
        self.vault_connected = true;

        match reader.list(None) {
            Ok(secrets) => {
                debug!(env = %self.env, count = secrets.len(), "retrieved secrets from secret store");
                secrets
            }
            Err(err) => {
                warn!(env = %self.env, error = %err, "secret-store listing failed");
                HashMap::new()
            }
        }
    }

    /// Step 3: parse every pattern except the base file, merged
    /// later-over-earlier, each published to the process environment.
    fn load_supplemental_files(&mut self) -> HashMap<String, String> {
        let mut supplemental = HashMap::new();
        let patterns: Vec<String> = self
            .patterns
            .iter()
            .filter(|name| name.as_str() != BASE_ENV_FILE)
            .cloned()
            .collect();

        for name in patterns {
            let path = self.env_dir.join(&name);
            if !path.is_file() {
                continue;
            }
            if file_is_empty(&path).unwrap_or(true) {
                warn!(path = %path.display(), "empty environment file, skipping");
                continue;
            }
            match parse_env_file(&path) {
                Ok(pairs) => {
                    for (key, value) in &pairs {
                        environ::publish(key, value, self.override_env);
                    }
                    supplemental.extend(pairs);
                    self.loaded.push(path.clone());
                    debug!(path = %path.display(), "loaded supplemental environment file");
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "error loading environment file");
                }
            }
        }
        supplemental
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::global_test_lock;
    use serial_test::serial;
    use tempfile::TempDir;

    const VAULT_VARS: [&str; 5] = [
        VAULT_ENABLED_VAR,
        VAULT_URL_VAR,
        VAULT_TOKEN_VAR,
        VAULT_MOUNT_POINT_VAR,
        VAULT_VERSION_VAR,
    ];

    fn loader_for(dir: &TempDir, env: &str) -> UnifiedLoader {
        UnifiedLoader::new(dir.path().to_path_buf(), env, false, false, true, None).unwrap()
    }

    #[test]
    #[serial]
    fn base_file_wins_over_supplemental_files() {
        let _guard = global_test_lock().lock().unwrap();
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".env"), "_LAMINA_UL_A=1\n").unwrap();
        std::fs::write(
            dir.path().join(".env.resources"),
            "_LAMINA_UL_A=2\n_LAMINA_UL_B=3\n",
        )
        .unwrap();

        temp_env::with_vars_unset(["_LAMINA_UL_A", "_LAMINA_UL_B"], || {
            let mut loader = loader_for(&dir, "dev");
            let merged = loader.load().unwrap();
            assert_eq!(merged.get("_LAMINA_UL_A").map(String::as_str), Some("1"));
            assert_eq!(merged.get("_LAMINA_UL_B").map(String::as_str), Some("3"));
            assert_eq!(loader.stats().file_keys, 2);
            assert_eq!(loader.stats().vault_keys, 0);
        });
    }

    #[test]
    #[serial]
    fn enabled_store_without_credentials_is_force_disabled() {
        let _guard = global_test_lock().lock().unwrap();
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "VAULT_ENABLED=true\n_LAMINA_UL_C=file\n",
        )
        .unwrap();

        temp_env::with_vars_unset(VAULT_VARS.iter().copied().chain(["_LAMINA_UL_C"]).collect::<Vec<_>>(), || {
            let mut loader = loader_for(&dir, "dev");
            let merged = loader.load().unwrap();
            assert_eq!(merged.get("_LAMINA_UL_C").map(String::as_str), Some("file"));
            let status = loader.vault_status();
            assert!(!status.enabled);
            assert!(!status.connected);
        });
    }

    #[test]
    #[serial]
    fn remote_secrets_take_precedence_over_the_base_file() {
        let _guard = global_test_lock().lock().unwrap();
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/v1/auth/token/lookup-self")
            .with_status(200)
            .with_body("{}")
            .create();
        server
            .mock("GET", "/v1/lamina/data/dev")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"data":{"_LAMINA_UL_DB_HOST":"vaulthost"}}}"#)
            .create();

        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            format!(
                "_LAMINA_UL_DB_HOST=filehost\nVAULT_ENABLED=true\nVAULT_URL={}\nVAULT_TOKEN=test-token\nVAULT_MOUNT_POINT=lamina\n",
                server.url()
            ),
        )
        .unwrap();

        temp_env::with_vars_unset(
            VAULT_VARS.iter().copied().chain(["_LAMINA_UL_DB_HOST"]).collect::<Vec<_>>(),
            || {
                let mut loader = loader_for(&dir, "dev");
                let merged = loader.load().unwrap();
                assert_eq!(
                    merged.get("_LAMINA_UL_DB_HOST").map(String::as_str),
                    Some("vaulthost")
                );
                let status = loader.vault_status();
                assert!(status.enabled);
                assert!(status.connected);
                assert_eq!(status.secrets_loaded, 1);
            },
        );
    }

    #[test]
    #[serial]
    fn unreachable_store_degrades_to_file_only() {
        let _guard = global_test_lock().lock().unwrap();
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "_LAMINA_UL_D=file\nVAULT_ENABLED=true\nVAULT_URL=http://127.0.0.1:1\nVAULT_TOKEN=test-token\n",
        )
        .unwrap();

        temp_env::with_vars_unset(VAULT_VARS.iter().copied().chain(["_LAMINA_UL_D"]).collect::<Vec<_>>(), || {
            let mut loader = loader_for(&dir, "dev");
            let merged = loader.load().unwrap();
            assert_eq!(merged.get("_LAMINA_UL_D").map(String::as_str), Some("file"));
            let status = loader.vault_status();
            assert!(status.enabled);
            assert!(!status.connected);
        });
    }

    #[test]
    #[serial]
    fn empty_directory_loads_an_empty_mapping() {
        let _guard = global_test_lock().lock().unwrap();
        let dir = TempDir::new().unwrap();
        temp_env::with_vars_unset(VAULT_VARS, || {
            let mut loader = loader_for(&dir, "dev");
            let merged = loader.load().unwrap();
            assert!(merged.is_empty());
            assert_eq!(loader.stats().total_keys, 0);
        });
    }

    #[test]
    #[serial]
    fn switching_to_a_sibling_environment_reloads_it() {
        let _guard = global_test_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        for (env, value) in [("dev", "dev-value"), ("staging", "staging-value")] {
            let dir = root.path().join(env);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join(".env"), format!("_LAMINA_UL_SW={value}\n")).unwrap();
        }

        temp_env::with_vars_unset(VAULT_VARS.iter().copied().chain(["_LAMINA_UL_SW"]).collect::<Vec<_>>(), || {
            let mut loader = UnifiedLoader::new(
                root.path().join("dev"),
                "dev",
                false,
                false,
                true,
                None,
            )
            .unwrap();
            loader.load().unwrap();

            let merged = loader.switch_environment("staging").unwrap();
            assert_eq!(
                merged.get("_LAMINA_UL_SW").map(String::as_str),
                Some("staging-value")
            );
            assert_eq!(loader.env(), "staging");

            assert!(matches!(
                loader.switch_environment("ghost"),
                Err(ConfigError::MissingEnvDir(_))
            ));
            assert_eq!(loader.env(), "staging");
        });
    }
}
