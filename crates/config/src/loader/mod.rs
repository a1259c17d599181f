//! Environment loaders.
//!
//! Responsibilities:
//! - Define the closed registry of loader kinds and the enum dispatching to
//!   the concrete loaders.
//! - Share the `.env` parsing and file-ordering helpers between loaders.
//!
//! Does NOT handle:
//! - Key resolution precedence at query time (see `resolver/`).
//!
//! Invariants:
//! - Unknown loader kinds are rejected with a configuration error at parse
//!   time, never a runtime lookup failure.
//! - `.env` sorts before every other discovered file name.

mod file;
mod unified;

pub use file::FileLoader;
pub use unified::{UnifiedLoader, VaultStatus};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::constants::BASE_ENV_FILE;
use crate::error::ConfigError;

/// The closed set of supported loader kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderKind {
    /// Base file + remote secret store + supplemental files (the default).
    Unified,
    /// Multi-file loading with no remote store involvement.
    File,
}

impl LoaderKind {
    /// Stable name used in logs and the environment-info report.
    pub const fn name(self) -> &'static str {
        match self {
            LoaderKind::Unified => "unified",
            LoaderKind::File => "file",
        }
    }
}

impl FromStr for LoaderKind {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unified" | "vault" => Ok(LoaderKind::Unified),
            "file" => Ok(LoaderKind::File),
            other => Err(ConfigError::UnknownLoaderKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Diagnostic counts from the last load.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LoadStats {
    /// Keys sourced from the remote secret store.
    pub vault_keys: usize,
    /// Keys sourced from files.
    pub file_keys: usize,
    /// Total keys in the merged result.
    pub total_keys: usize,
}

/// An environment loader of one of the registered kinds.
pub enum EnvLoader {
    Unified(UnifiedLoader),
    File(FileLoader),
}

impl EnvLoader {
    /// Construct a loader of the requested kind for an environment directory.
    pub fn build(
        kind: LoaderKind,
        env_dir: PathBuf,
        env: &str,
        override_env: bool,
        create: bool,
        auto_discovery: bool,
        patterns: Option<Vec<String>>,
    ) -> Result<Self, ConfigError> {
        match kind {
            LoaderKind::Unified => Ok(EnvLoader::Unified(UnifiedLoader::new(
                env_dir,
                env,
                override_env,
                create,
                auto_discovery,
                patterns,
            )?)),
            LoaderKind::File => Ok(EnvLoader::File(FileLoader::new(
                env_dir,
                override_env,
                create,
                auto_discovery,
                patterns,
            )?)),
        }
    }

    /// The kind this loader was built as.
    pub fn kind(&self) -> LoaderKind {
        match self {
            EnvLoader::Unified(_) => LoaderKind::Unified,
            EnvLoader::File(_) => LoaderKind::File,
        }
    }

    /// Run a full load, returning the merged key/value set.
    pub fn load(&mut self) -> Result<HashMap<String, String>, ConfigError> {
        match self {
            EnvLoader::Unified(loader) => loader.load(),
            EnvLoader::File(loader) => loader.load(),
        }
    }

    /// Re-point the loader at another environment and reload. The loader's
    /// own environment state is rolled back if the reload fails.
    pub fn switch_environment(
        &mut self,
        env: &str,
    ) -> Result<HashMap<String, String>, ConfigError> {
        match self {
            EnvLoader::Unified(loader) => loader.switch_environment(env),
            EnvLoader::File(loader) => loader.switch_environment(env),
        }
    }

    /// Files successfully loaded by the last load.
    pub fn loaded_files(&self) -> &[PathBuf] {
        match self {
            EnvLoader::Unified(loader) => loader.loaded_files(),
            EnvLoader::File(loader) => loader.loaded_files(),
        }
    }

    /// Diagnostic counts from the last load.
    pub fn stats(&self) -> LoadStats {
        match self {
            EnvLoader::Unified(loader) => loader.stats(),
            EnvLoader::File(loader) => loader.stats(),
        }
    }

    /// Remote-store status, for the unified loader only.
    pub fn vault_status(&self) -> Option<VaultStatus> {
        match self {
            EnvLoader::Unified(loader) => Some(loader.vault_status()),
            EnvLoader::File(_) => None,
        }
    }
}

/// Parse one `.env`-style file into its key/value pairs, preserving file
/// order. Parse errors report a line number only, never line contents.
pub(crate) fn parse_env_file(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let iter = dotenvy::from_path_iter(path).map_err(|err| dotenv_error(path, err))?;
    let mut pairs = Vec::new();
    for item in iter {
        let (key, value) = item.map_err(|err| dotenv_error(path, err))?;
        pairs.push((key, value));
    }
    Ok(pairs)
}

fn dotenv_error(path: &Path, err: dotenvy::Error) -> ConfigError {
    match err {
        dotenvy::Error::LineParse(_, line) => ConfigError::DotenvParse {
            path: path.to_path_buf(),
            line,
        },
        dotenvy::Error::Io(io_err) => ConfigError::FileIo {
            path: path.to_path_buf(),
            kind: io_err.kind(),
        },
        _ => ConfigError::DotenvParse {
            path: path.to_path_buf(),
            line: 0,
        },
    }
}

/// Discover `.env*` files in a directory, sorted so the bare base file comes
/// first and the rest alphabetically. Empty when the directory is unreadable.
pub(crate) fn discover_env_files(env_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(env_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(BASE_ENV_FILE))
        .collect();
    names.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    names
}

/// Sort key for `.env` files: the bare base file first, then alphabetical.
fn sort_key(name: &str) -> String {
    if name == BASE_ENV_FILE {
        "0".to_string()
    } else {
        name.to_string()
    }
}
