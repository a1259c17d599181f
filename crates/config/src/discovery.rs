//! Project-root discovery.
//!
//! Responsibilities:
//! - Resolve the directory that anchors relative configuration paths
//!   (`env/`, `etc/config.ini`, the project file).
//!
//! Invariants:
//! - An explicit `SITE_ROOT` always wins over marker-based discovery.
//! - Discovery never fails; the starting directory is the last resort.

use std::path::{Path, PathBuf};

use crate::constants::SITE_ROOT_VAR;
use crate::environ;

/// Filesystem markers that identify a project root, checked in order.
const ROOT_MARKERS: [&str; 4] = ["etc/config.ini", "env", ".env", "Cargo.toml"];

/// Resolve the project root: `SITE_ROOT` if set, otherwise a marker walk
/// upward from the current directory.
pub fn project_root() -> PathBuf {
    if let Some(root) = environ::var(SITE_ROOT_VAR) {
        let path = PathBuf::from(root);
        return path.canonicalize().unwrap_or(path);
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_project_root(&cwd)
}

/// Walk upward from `start`; the nearest directory containing any root
/// marker wins. Falls back to `start` itself when nothing matches.
pub fn find_project_root(start: &Path) -> PathBuf {
    for dir in start.ancestors() {
        if ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists()) {
            return dir.to_path_buf();
        }
    }
    start.to_path_buf()
}
