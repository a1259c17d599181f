//! Layered configuration resolution for application processes.
//!
//! This crate merges environment variables, `.env`-style files, INI sections,
//! a TOML project file, and remote secret stores into a single queryable
//! configuration object with typed accessors, write-through semantics for
//! selected backends, and runtime environment switching.
//!
//! The entry point is [`Resolver`], built once at process start via
//! [`ResolverBuilder`] and passed by reference to consumers.

mod discovery;
mod environ;
mod error;
mod ini;
mod loader;
mod project;
mod resolver;
mod value;

pub mod constants;

pub use crate::discovery::{find_project_root, project_root};
pub use crate::error::ConfigError;
pub use crate::ini::IniStore;
pub use crate::loader::{EnvLoader, FileLoader, LoadStats, LoaderKind, UnifiedLoader, VaultStatus};
pub use crate::project::ProjectLoader;
pub use crate::resolver::{EnvInfo, Mapping, Resolver, ResolverBuilder};
pub use crate::value::{ConfigValue, parse_bool};

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::{Mutex, MutexGuard, OnceLock};

    /// Serializes tests that touch the process environment or cwd.
    ///
    /// The guard is poison-tolerant: a test panicking while holding the lock
    /// must not cascade a `PoisonError` into every later test that only uses
    /// the lock for serialization.
    pub fn global_test_lock() -> &'static PoisonTolerant {
        static LOCK: OnceLock<PoisonTolerant> = OnceLock::new();
        LOCK.get_or_init(|| PoisonTolerant(Mutex::new(())))
    }

    /// Thin wrapper whose `lock()` recovers from poisoning so one panicking
    /// test does not fail the rest.
    pub struct PoisonTolerant(Mutex<()>);

    impl PoisonTolerant {
        pub fn lock(&self) -> Result<MutexGuard<'_, ()>, std::convert::Infallible> {
            Ok(self.0.lock().unwrap_or_else(|err| err.into_inner()))
        }
    }
}
