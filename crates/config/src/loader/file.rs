//! Multi-file environment loader.
//!
//! Responsibilities:
//! - Merge an ordered list of `.env`-style files from one environment
//!   directory into a single flat mapping, later files overriding earlier
//!   ones.
//! - Publish parsed pairs into the process environment, honoring the
//!   override flag.
//!
//! Does NOT handle:
//! - Remote secret stores (see `unified.rs`).
//!
//! Invariants:
//! - A listed file that is absent is silently skipped; a present-but-empty
//!   file logs a warning and is skipped.
//! - Zero loadable files across the whole list is an error naming the
//!   searched patterns.
//! - `.env.local` is last in the default order, so local overrides win.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{LoadStats, discover_env_files, parse_env_file};
use crate::constants::DEFAULT_ENV_FILES;
use crate::environ;
use crate::error::ConfigError;

/// Loader merging ordered `.env`-style files from an environment directory.
pub struct FileLoader {
    env_dir: PathBuf,
    patterns: Vec<String>,
    override_env: bool,
    auto_discovery: bool,
    loaded: Vec<PathBuf>,
    stats: LoadStats,
}

impl FileLoader {
    /// Build a loader for an environment directory.
    ///
    /// With `auto_discovery`, `.env*` files found in the directory replace
    /// the fixed pattern list (falling back to it when nothing matches).
    /// The directory must exist unless `create` is set.
    pub fn new(
        env_dir: PathBuf,
        override_env: bool,
        create: bool,
        auto_discovery: bool,
        patterns: Option<Vec<String>>,
    ) -> Result<Self, ConfigError> {
        ensure_env_dir(&env_dir, create)?;
        let patterns = resolve_patterns(&env_dir, auto_discovery, patterns);
        Ok(Self {
            env_dir,
            patterns,
            override_env,
            auto_discovery,
            loaded: Vec::new(),
            stats: LoadStats::default(),
        })
    }

    /// The ordered file names this loader consults.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Files successfully loaded by the last load.
    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded
    }

    /// Diagnostic counts from the last load.
    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    /// Merge every loadable file in pattern order, publishing pairs to the
    /// process environment as they are parsed.
    pub fn load(&mut self) -> Result<HashMap<String, String>, ConfigError> {
        self.loaded.clear();
        let mut merged = HashMap::new();

        for name in &self.patterns {
            let path = self.env_dir.join(name);
            if !path.is_file() {
                continue;
            }
            if file_is_empty(&path)? {
                warn!(path = %path.display(), "empty environment file, skipping");
                continue;
            }
            let pairs = parse_env_file(&path)?;
            for (key, value) in &pairs {
                environ::publish(key, value, self.override_env);
            }
            merged.extend(pairs);
            self.loaded.push(path.clone());
            debug!(path = %path.display(), "loaded environment file");
        }

        if self.loaded.is_empty() {
            return Err(ConfigError::NoEnvFiles {
                searched: self.patterns.clone(),
            });
        }
        self.stats = LoadStats {
            vault_keys: 0,
            file_keys: merged.len(),
            total_keys: merged.len(),
        };
        Ok(merged)
    }

    /// Re-point at a sibling environment directory and reload. The previous
    /// directory and pattern list are restored if the switch fails.
    pub fn switch_environment(
        &mut self,
        env: &str,
    ) -> Result<HashMap<String, String>, ConfigError> {
        let old_dir = self.env_dir.clone();
        let old_patterns = self.patterns.clone();

        let new_dir = old_dir
            .parent()
            .map(|parent| parent.join(env))
            .unwrap_or_else(|| PathBuf::from(env));
        if new_dir != old_dir {
            if !new_dir.is_dir() {
                return Err(ConfigError::MissingEnvDir(new_dir));
            }
            self.env_dir = new_dir;
            self.patterns = resolve_patterns(&self.env_dir, self.auto_discovery, None);
        }

        match self.load() {
            Ok(merged) => Ok(merged),
            Err(err) => {
                self.env_dir = old_dir;
                self.patterns = old_patterns;
                Err(err)
            }
        }
    }
}

/// Resolve the pattern list: explicit patterns win, then auto-discovery,
/// then the fixed default order.
pub(super) fn resolve_patterns(
    env_dir: &Path,
    auto_discovery: bool,
    patterns: Option<Vec<String>>,
) -> Vec<String> {
    if let Some(patterns) = patterns {
        return patterns;
    }
    if auto_discovery {
        let discovered = discover_env_files(env_dir);
        if !discovered.is_empty() {
            return discovered;
        }
    }
    DEFAULT_ENV_FILES.iter().map(|s| s.to_string()).collect()
}

pub(super) fn ensure_env_dir(env_dir: &Path, create: bool) -> Result<(), ConfigError> {
    if env_dir.is_dir() {
        return Ok(());
    }
    if create {
        std::fs::create_dir_all(env_dir).map_err(|err| ConfigError::FileIo {
            path: env_dir.to_path_buf(),
            kind: err.kind(),
        })?;
        return Ok(());
    }
    Err(ConfigError::MissingEnvDir(env_dir.to_path_buf()))
}

pub(super) fn file_is_empty(path: &Path) -> Result<bool, ConfigError> {
    let metadata = std::fs::metadata(path).map_err(|err| ConfigError::FileIo {
        path: path.to_path_buf(),
        kind: err.kind(),
    })?;
    Ok(metadata.len() == 0)
}
