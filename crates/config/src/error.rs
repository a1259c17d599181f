//! Error types for configuration loading and resolution.
//!
//! Responsibilities:
//! - Define error variants for every configuration failure surfaced to callers.
//! - Wrap reader errors for unified handling in the resolver.
//!
//! Invariants:
//! - Variants carry context for debugging (paths, searched patterns, names).
//! - Dotenv parse errors carry a line number only, never raw line contents,
//!   so secrets cannot leak through error messages.

use std::path::PathBuf;
use thiserror::Error;

use lamina_readers::ReaderError;

/// Errors that can occur while assembling or querying configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No file in the configured pattern list could be loaded.
    #[error("no environment files found; searched: {}", searched.join(", "))]
    NoEnvFiles { searched: Vec<String> },

    /// The per-environment directory does not exist.
    #[error("environment directory does not exist: {0}")]
    MissingEnvDir(PathBuf),

    /// An explicitly supplied environment file does not exist.
    #[error("environment file not found: {0}")]
    EnvFileMissing(PathBuf),

    /// An environment file has invalid syntax.
    ///
    /// Only the line number is reported, never the line content.
    #[error("failed to parse environment file {path} at line {line}")]
    DotenvParse { path: PathBuf, line: usize },

    /// Reading a configuration file failed.
    #[error("failed to read {path}: {kind}")]
    FileIo {
        path: PathBuf,
        kind: std::io::ErrorKind,
    },

    /// A loader kind outside the closed registry was requested.
    #[error("unknown loader kind: {0:?} (expected \"unified\" or \"file\")")]
    UnknownLoaderKind(String),

    /// The INI configuration file could not be parsed.
    #[error("failed to parse INI file {path}: {message}")]
    IniParse { path: PathBuf, message: String },

    /// The TOML project file could not be parsed.
    #[error("failed to parse project file {path}: {message}")]
    ProjectParse { path: PathBuf, message: String },

    /// Attribute-style access found no value anywhere in the chain.
    #[error("no such configuration key: {0}")]
    MissingKey(String),

    /// A runtime environment switch failed; the previous environment was
    /// restored before this error was raised.
    #[error("environment switch to {env:?} failed: {source}")]
    EnvSwitch {
        env: String,
        #[source]
        source: Box<ConfigError>,
    },

    /// A source-reader call failed in a way that is not "no value".
    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
