//! INI section store.
//!
//! Responsibilities:
//! - Load and merge INI files and serve section-qualified lookups.
//! - Provide whole-section snapshots for the resolver's `section()` accessor.
//!
//! Does NOT handle:
//! - Key resolution order (the resolver consults this store only for
//!   section-qualified lookups).
//!
//! Invariants:
//! - A missing section yields an empty snapshot, never an error.
//! - Later-loaded files override earlier ones for duplicate section keys.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ini::Ini;

use crate::error::ConfigError;

/// Parsed INI configuration with named sections.
pub struct IniStore {
    ini: Ini,
    path: Option<PathBuf>,
}

impl IniStore {
    /// An empty store, used when no INI file exists.
    pub fn empty() -> Self {
        Self {
            ini: Ini::new(),
            path: None,
        }
    }

    /// Load a store from one INI file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|err| ConfigError::IniParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Ok(Self {
            ini,
            path: Some(path.to_path_buf()),
        })
    }

    /// The file this store was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Merge additional INI files into the store. Missing files are skipped;
    /// unparseable files are an error.
    pub fn add_files<I, P>(&mut self, paths: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            let path = path.as_ref();
            if !path.is_file() {
                continue;
            }
            let other = Ini::load_from_file(path).map_err(|err| ConfigError::IniParse {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
            for (section, properties) in other.iter() {
                for (key, value) in properties.iter() {
                    self.ini
                        .set_to(section, key.to_string(), value.to_string());
                }
            }
        }
        Ok(())
    }

    /// Look up one key in one section.
    pub fn get_from(&self, section: &str, key: &str) -> Option<&str> {
        self.ini.get_from(Some(section), key)
    }

    /// Snapshot a whole section, empty if the section is absent.
    pub fn section(&self, name: &str) -> HashMap<String, String> {
        self.ini
            .section(Some(name))
            .map(|properties| {
                properties
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
