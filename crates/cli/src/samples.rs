//! Project scaffolding for `lamina init`.
//!
//! Responsibilities:
//! - Create the conventional layout for a new environment: `env/<name>/.env`
//!   and `etc/config.ini`, seeded with commented sample content.
//!
//! Invariants:
//! - Existing files are never overwritten; only missing pieces are created.

use std::path::{Path, PathBuf};

use anyhow::Context;

const SAMPLE_ENV: &str = "\
# Application environment
ENV=dev
APP_NAME=lamina-app
DEBUG=false

# Optional remote backends
USE_REDIS=false
USE_MEMCACHED=false
";

const VAULT_ENV_BLOCK: &str = "\

# -- Secret store --
VAULT_ENABLED=true
VAULT_URL=https://vault.example.com:8200
VAULT_TOKEN=
VAULT_MOUNT_POINT=lamina
VAULT_VERSION=2
";

const SAMPLE_INI: &str = "\
[database]
host = localhost
port = 5432

[logging]
level = info
";

/// Create the project structure for a new environment, returning the paths
/// that were actually created.
pub fn scaffold(root: &Path, env_name: &str, vault: bool) -> anyhow::Result<Vec<PathBuf>> {
    let mut created = Vec::new();

    let env_dir = root.join("env").join(env_name);
    std::fs::create_dir_all(&env_dir)
        .with_context(|| format!("failed to create {}", env_dir.display()))?;

    let env_file = env_dir.join(".env");
    if !env_file.exists() {
        let mut content = SAMPLE_ENV.replace("ENV=dev", &format!("ENV={env_name}"));
        if vault {
            content.push_str(VAULT_ENV_BLOCK);
        }
        std::fs::write(&env_file, content)
            .with_context(|| format!("failed to write {}", env_file.display()))?;
        created.push(env_file);
    }

    let etc_dir = root.join("etc");
    std::fs::create_dir_all(&etc_dir)
        .with_context(|| format!("failed to create {}", etc_dir.display()))?;

    let ini_file = etc_dir.join("config.ini");
    if !ini_file.exists() {
        std::fs::write(&ini_file, SAMPLE_INI)
            .with_context(|| format!("failed to write {}", ini_file.display()))?;
        created.push(ini_file);
    }

    Ok(created)
}
