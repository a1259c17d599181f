//! Centralized constants for the configuration resolver.
//!
//! This module contains the recognized environment-variable names, default
//! file locations, and parsing tables used across the crate.

// =============================================================================
// Directory & File Defaults
// =============================================================================

/// Directory under the project root holding per-environment configuration.
pub const ENV_DIR: &str = "env";

/// The base environment file inside an environment directory.
pub const BASE_ENV_FILE: &str = ".env";

/// Ordered default file list for multi-file loading. `.env.local` carries
/// local overrides and is loaded last.
pub const DEFAULT_ENV_FILES: [&str; 7] = [
    ".env",
    ".env.resources",
    ".env.databases",
    ".env.api",
    ".env.cache",
    ".env.secrets",
    ".env.local",
];

/// Default INI configuration file, relative to the project root.
pub const DEFAULT_CONFIG_FILE: &str = "etc/config.ini";

/// Default TOML project file, relative to the project root.
pub const DEFAULT_PROJECT_FILE: &str = "pyproject.toml";

/// Default key of the project table inside the project file.
pub const DEFAULT_PROJECT_NAME: &str = "lamina";

// =============================================================================
// Structured-Value Envelope
// =============================================================================

/// Prefix marking a structured value carried through a text-only backend.
pub const JSON_ENVELOPE_PREFIX: &str = "LAMINA_JSON:";

// =============================================================================
// Boolean Parsing
// =============================================================================

/// Strings recognized as true, compared case-insensitively.
pub const TRUTHY_STATES: [&str; 4] = ["true", "1", "yes", "on"];

/// Strings recognized as false, compared case-insensitively.
pub const FALSY_STATES: [&str; 4] = ["false", "0", "no", "off"];

// =============================================================================
// Recognized Environment Variables
// =============================================================================

/// Active environment name (dev, prod, staging, ...).
pub const ENV_VAR: &str = "ENV";

/// Path of the INI configuration file.
pub const CONFIG_FILE_VAR: &str = "CONFIG_FILE";

/// Auto-create missing configuration directories when truthy.
pub const CONFIG_CREATE_VAR: &str = "CONFIG_CREATE";

/// Glob-based discovery of `.env*` files when truthy (default on).
pub const AUTO_DISCOVERY_VAR: &str = "AUTO_DISCOVERY";

/// Defer the first configuration pass when truthy.
pub const LAZY_LOAD_VAR: &str = "LAZY_LOAD";

/// Explicit project root, bypassing marker-based discovery.
pub const SITE_ROOT_VAR: &str = "SITE_ROOT";

/// Debug flag captured at configure time.
pub const DEBUG_VAR: &str = "DEBUG";

/// Register the Redis cache reader when truthy.
pub const USE_REDIS_VAR: &str = "USE_REDIS";

/// Register the Memcached object-cache reader when truthy.
pub const USE_MEMCACHED_VAR: &str = "USE_MEMCACHED";

/// Register the Vault secret reader (and enable unified vault loading)
/// when truthy.
pub const VAULT_ENABLED_VAR: &str = "VAULT_ENABLED";

/// Vault connection parameters consumed by the unified loader.
pub const VAULT_URL_VAR: &str = "VAULT_URL";
pub const VAULT_TOKEN_VAR: &str = "VAULT_TOKEN";
pub const VAULT_MOUNT_POINT_VAR: &str = "VAULT_MOUNT_POINT";
pub const VAULT_VERSION_VAR: &str = "VAULT_VERSION";
pub const VAULT_SKIP_VERIFY_VAR: &str = "VAULT_SKIP_VERIFY";

/// Project-file overrides.
pub const PROJECT_NAME_VAR: &str = "PROJECT_NAME";
pub const PROJECT_PATH_VAR: &str = "PROJECT_PATH";
pub const PROJECT_FILE_VAR: &str = "PROJECT_FILE";

// =============================================================================
// Write-Path Defaults
// =============================================================================

/// Default TTL for time-bounded writes, in seconds.
pub const DEFAULT_SET_TTL_SECS: u64 = 3600;

/// Default Vault mount point when none is configured.
pub const DEFAULT_VAULT_MOUNT: &str = "lamina";
