//! TOML project-file loader.
//!
//! Responsibilities:
//! - Read the project-scoped key/value table from a TOML project file and
//!   convert it into typed configuration values.
//!
//! Does NOT handle:
//! - Merging into the resolver mapping (the resolver owns precedence).
//!
//! Invariants:
//! - A missing project file yields an empty result, never an error.
//! - A file that exists but cannot be parsed is a fatal configuration error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::{
    DEFAULT_PROJECT_FILE, DEFAULT_PROJECT_NAME, PROJECT_FILE_VAR, PROJECT_NAME_VAR,
    PROJECT_PATH_VAR,
};
use crate::environ;
use crate::error::ConfigError;
use crate::value::ConfigValue;

/// Loader for the project-scoped TOML table.
pub struct ProjectLoader {
    path: PathBuf,
    project_name: String,
}

impl ProjectLoader {
    /// Build a loader rooted at `root`, honoring the `PROJECT_PATH`,
    /// `PROJECT_FILE` and `PROJECT_NAME` overrides.
    pub fn new(root: &Path) -> Self {
        let project_path = environ::var(PROJECT_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| root.to_path_buf());
        let project_file =
            environ::var(PROJECT_FILE_VAR).unwrap_or_else(|| DEFAULT_PROJECT_FILE.to_string());
        let project_name =
            environ::var(PROJECT_NAME_VAR).unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());
        Self {
            path: project_path.join(project_file),
            project_name,
        }
    }

    /// Build a loader for an explicit file and table name.
    pub fn with_path(path: PathBuf, project_name: String) -> Self {
        Self { path, project_name }
    }

    /// The file this loader reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the project table. A missing file is skipped with an empty
    /// result; an unparseable file is an error.
    pub fn load(&self) -> Result<HashMap<String, ConfigValue>, ConfigError> {
        if !self.path.is_file() {
            debug!(path = %self.path.display(), "no project file, skipping");
            return Ok(HashMap::new());
        }
        let text = std::fs::read_to_string(&self.path).map_err(|err| ConfigError::FileIo {
            path: self.path.clone(),
            kind: err.kind(),
        })?;
        let table: toml::Table =
            toml::from_str(&text).map_err(|err| ConfigError::ProjectParse {
                path: self.path.clone(),
                message: err.to_string(),
            })?;

        let Some(project) = table.get(&self.project_name).and_then(toml::Value::as_table) else {
            debug!(
                project = %self.project_name,
                path = %self.path.display(),
                "project table absent from project file"
            );
            return Ok(HashMap::new());
        };
        Ok(project
            .iter()
            .map(|(key, value)| (key.clone(), toml_to_value(value)))
            .collect())
    }
}

/// Convert a TOML value into the resolver's value union.
fn toml_to_value(value: &toml::Value) -> ConfigValue {
    match value {
        toml::Value::String(s) => ConfigValue::Str(s.clone()),
        toml::Value::Integer(n) => ConfigValue::Int(*n),
        toml::Value::Boolean(b) => ConfigValue::Bool(*b),
        toml::Value::Array(items) if items.iter().all(toml::Value::is_str) => ConfigValue::List(
            items
                .iter()
                .filter_map(toml::Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        other => serde_json::to_value(other)
            .map(ConfigValue::Structured)
            .unwrap_or_else(|_| ConfigValue::Str(other.to_string())),
    }
}
