//! The configuration resolver facade.
//!
//! Responsibilities:
//! - Own the ordered source chain (explicit mapping → process environment →
//!   registered source readers) and the loader that populates the mapping.
//! - Drive the one-shot configuration pass: environment load (with unified →
//!   file fallback), reader registration, INI store, project table.
//!
//! Does NOT handle:
//! - File parsing or remote-store querying (see `loader/`).
//!
//! Invariants:
//! - `configure()` runs at most once per resolver; a second call is a no-op.
//! - A key present in the explicit mapping is never shadowed by a reader.
//! - Reader registration order is cache, object-cache, secret — which is
//!   also the external lookup order.

mod accessors;
mod switch;
#[cfg(test)]
mod tests;
mod write;

pub use switch::EnvInfo;

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use lamina_readers::{
    CacheReader, CacheSettings, ObjectCacheReader, ObjectCacheSettings, ReaderError, SourceReader,
    VaultReader, VaultSettings,
};

use crate::constants::{
    AUTO_DISCOVERY_VAR, CONFIG_CREATE_VAR, CONFIG_FILE_VAR, DEBUG_VAR, DEFAULT_CONFIG_FILE,
    ENV_DIR, ENV_VAR, LAZY_LOAD_VAR, USE_MEMCACHED_VAR, USE_REDIS_VAR, VAULT_ENABLED_VAR,
};
use crate::discovery::project_root;
use crate::environ;
use crate::error::ConfigError;
use crate::ini::IniStore;
use crate::loader::{EnvLoader, LoaderKind, parse_env_file};
use crate::project::ProjectLoader;
use crate::value::ConfigValue;

/// The explicit key→value store, highest precedence in the chain.
pub type Mapping = HashMap<String, ConfigValue>;

/// Convert loader output into mapping values, decoding any structured-value
/// envelopes carried through the text sources.
pub(crate) fn to_mapping(data: HashMap<String, String>) -> Mapping {
    data.into_iter()
        .map(|(key, value)| (key, ConfigValue::from_text(&value)))
        .collect()
}

/// The ordered chain of registered source readers.
pub(crate) struct SourceChain {
    readers: Vec<Box<dyn SourceReader>>,
}

impl SourceChain {
    fn new() -> Self {
        Self {
            readers: Vec::new(),
        }
    }

    fn register(&mut self, reader: Box<dyn SourceReader>) {
        self.readers.push(reader);
    }

    /// Resolve a key against the chain in registration order. A disabled
    /// reader yields no value; a broken backend is logged and skipped.
    pub(crate) fn lookup(&mut self, key: &str) -> Option<String> {
        for reader in &mut self.readers {
            if !reader.enabled() {
                continue;
            }
            let found = match reader.exists(key) {
                Ok(found) => found,
                Err(ReaderError::NotConfigured(_)) => continue,
                Err(err) => {
                    warn!(reader = reader.name(), key, error = %err, "reader probe failed");
                    continue;
                }
            };
            if !found {
                continue;
            }
            match reader.get(key) {
                Ok(Some(value)) => return Some(value),
                Ok(None) => continue,
                Err(ReaderError::NotConfigured(_)) => continue,
                Err(err) => {
                    warn!(reader = reader.name(), key, error = %err, "reader lookup failed");
                    continue;
                }
            }
        }
        None
    }

    /// Probe the chain for a key without fetching its value.
    pub(crate) fn probe(&mut self, key: &str) -> bool {
        for reader in &mut self.readers {
            if !reader.enabled() {
                continue;
            }
            match reader.exists(key) {
                Ok(true) => return true,
                Ok(false) => continue,
                Err(ReaderError::NotConfigured(_)) => continue,
                Err(err) => {
                    warn!(reader = reader.name(), key, error = %err, "reader probe failed");
                    continue;
                }
            }
        }
        false
    }

    pub(crate) fn by_name(&mut self, name: &str) -> Option<&mut Box<dyn SourceReader>> {
        self.readers
            .iter_mut()
            .find(|reader| reader.name() == name)
    }

    fn close_all(&mut self) {
        for reader in &mut self.readers {
            reader.close();
        }
    }
}

/// Builder for a [`Resolver`].
///
/// Unset values fall back to the recognized environment variables (`ENV`,
/// `SITE_ROOT`, `LAZY_LOAD`, ...) and then to discovery/defaults.
pub struct ResolverBuilder {
    root: Option<PathBuf>,
    env: Option<String>,
    loader_kind: LoaderKind,
    override_env: bool,
    lazy: Option<bool>,
    patterns: Option<Vec<String>>,
}

impl ResolverBuilder {
    pub fn new() -> Self {
        Self {
            root: None,
            env: None,
            loader_kind: LoaderKind::Unified,
            override_env: false,
            lazy: None,
            patterns: None,
        }
    }

    /// Set the project root, bypassing `SITE_ROOT` and marker discovery.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Set the environment name, bypassing the `ENV` variable.
    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    /// Select the loader kind (default: unified vault + file).
    pub fn with_loader_kind(mut self, kind: LoaderKind) -> Self {
        self.loader_kind = kind;
        self
    }

    /// Whether loaded values may clobber existing process environment
    /// variables (default: false).
    pub fn with_override(mut self, override_env: bool) -> Self {
        self.override_env = override_env;
        self
    }

    /// Defer the configuration pass until an explicit `configure()` call,
    /// bypassing the `LAZY_LOAD` variable.
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = Some(lazy);
        self
    }

    /// Replace the default ordered file-name list.
    pub fn with_file_patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns = Some(patterns);
        self
    }

    /// Construct the resolver and, unless lazy loading was requested, run
    /// the one-shot configuration pass.
    pub fn build(self) -> Result<Resolver, ConfigError> {
        let root = self.root.unwrap_or_else(project_root);
        let env = self
            .env
            .or_else(|| environ::var(ENV_VAR))
            .unwrap_or_default();
        let lazy = self
            .lazy
            .unwrap_or_else(|| environ::flag(LAZY_LOAD_VAR, false));

        let mut resolver = Resolver {
            root,
            current_env: env,
            loader_kind: self.loader_kind,
            override_env: self.override_env,
            auto_discovery: environ::flag(AUTO_DISCOVERY_VAR, true),
            create_missing: environ::flag(CONFIG_CREATE_VAR, false),
            patterns: self.patterns,
            debug: false,
            configured: false,
            mapping: Mapping::new(),
            env_cache: RefCell::new(HashMap::new()),
            loader: None,
            ini: IniStore::empty(),
            readers: RefCell::new(SourceChain::new()),
            use_redis: false,
            use_memcached: false,
            use_vault: false,
        };
        if !lazy {
            resolver.configure()?;
        }
        Ok(resolver)
    }
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The single configuration entry point applications hold.
///
/// Built once at process start and passed by reference to consumers. Not
/// designed for concurrent mutation from multiple threads; reads after the
/// configuration pass are the expected steady state.
pub struct Resolver {
    root: PathBuf,
    current_env: String,
    loader_kind: LoaderKind,
    override_env: bool,
    auto_discovery: bool,
    create_missing: bool,
    patterns: Option<Vec<String>>,
    debug: bool,
    configured: bool,
    mapping: Mapping,
    env_cache: RefCell<HashMap<String, Mapping>>,
    loader: Option<EnvLoader>,
    ini: IniStore,
    readers: RefCell<SourceChain>,
    use_redis: bool,
    use_memcached: bool,
    use_vault: bool,
}

impl Resolver {
    /// Start building a resolver.
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    /// Run the one-shot configuration pass: load the environment, register
    /// source readers, load the INI store and the project table.
    ///
    /// A resolver that is already configured returns immediately without
    /// re-running any side effects.
    pub fn configure(&mut self) -> Result<(), ConfigError> {
        if self.configured {
            debug!("resolver already configured");
            return Ok(());
        }
        self.load_environment()?;
        self.init_external_readers();
        self.load_ini_config()?;
        self.load_project()?;
        self.debug = self.get_bool(DEBUG_VAR).unwrap_or(false);
        self.configured = true;
        Ok(())
    }

    /// Whether the configuration pass has run.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// The debug flag captured at configure time.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// The project root anchoring relative configuration paths.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The loader kind actually in effect (may differ from the requested
    /// kind after a fallback to file-only loading).
    pub fn loader_kind(&self) -> LoaderKind {
        self.loader_kind
    }

    /// The INI section store.
    pub fn ini(&self) -> &IniStore {
        &self.ini
    }

    /// Merge additional INI files into the section store.
    pub fn add_ini_files<I, P>(&mut self, paths: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.ini.add_files(paths)
    }

    /// Load one more environment file into the process environment. The file
    /// must exist.
    pub fn add_env_file(&mut self, path: &Path, override_env: bool) -> Result<(), ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::EnvFileMissing(path.to_path_buf()));
        }
        let pairs = parse_env_file(path)?;
        for (key, value) in &pairs {
            environ::publish(key, value, override_env);
        }
        Ok(())
    }

    /// Register an additional source reader at the end of the chain.
    pub fn register_reader(&mut self, reader: Box<dyn SourceReader>) {
        self.readers.get_mut().register(reader);
    }

    /// Close every registered reader. Also runs on drop.
    pub fn close(&mut self) {
        self.readers.get_mut().close_all();
    }

    fn load_environment(&mut self) -> Result<(), ConfigError> {
        match self.init_loader(self.loader_kind) {
            Ok(mapping) => {
                self.mapping = mapping;
                Ok(())
            }
            Err(err)
                if self.loader_kind == LoaderKind::Unified
                    && matches!(
                        err,
                        ConfigError::NoEnvFiles { .. } | ConfigError::MissingEnvDir(_)
                    ) =>
            {
                warn!(error = %err, "unified loading failed, falling back to file-only loading");
                match self.init_loader(LoaderKind::File) {
                    Ok(mapping) => {
                        self.loader_kind = LoaderKind::File;
                        self.mapping = mapping;
                        Ok(())
                    }
                    Err(fallback_err) => {
                        error!(error = %fallback_err, "fallback loading also failed");
                        Err(fallback_err)
                    }
                }
            }
            Err(err) => Err(err),
        }
    }

    fn init_loader(&mut self, kind: LoaderKind) -> Result<Mapping, ConfigError> {
        let env_dir = self.root.join(ENV_DIR).join(&self.current_env);
        debug!(path = %env_dir.display(), "environment path");
        let mut loader = EnvLoader::build(
            kind,
            env_dir,
            &self.current_env,
            self.override_env,
            self.create_missing,
            self.auto_discovery,
            self.patterns.clone(),
        )?;
        let data = loader.load()?;
        self.loader = Some(loader);
        Ok(to_mapping(data))
    }

    /// Register the external readers selected by the backend toggles, in
    /// chain order: cache, object-cache, secret. A reader whose backend is
    /// unreachable stays registered but disabled.
    fn init_external_readers(&mut self) {
        self.use_redis = environ::flag(USE_REDIS_VAR, false);
        if self.use_redis {
            match CacheSettings::from_env() {
                Ok(settings) => {
                    let reader = CacheReader::connect(&settings);
                    if !reader.enabled() {
                        self.use_redis = false;
                    }
                    self.readers.get_mut().register(Box::new(reader));
                }
                Err(err) => {
                    warn!(error = %err, "invalid cache reader settings");
                    self.use_redis = false;
                }
            }
        }

        self.use_memcached = environ::flag(USE_MEMCACHED_VAR, false);
        if self.use_memcached {
            match ObjectCacheSettings::from_env() {
                Ok(settings) => {
                    let reader = ObjectCacheReader::connect(&settings);
                    if !reader.enabled() {
                        self.use_memcached = false;
                    }
                    self.readers.get_mut().register(Box::new(reader));
                }
                Err(err) => {
                    warn!(error = %err, "invalid object-cache reader settings");
                    self.use_memcached = false;
                }
            }
        }

        self.use_vault = environ::flag(VAULT_ENABLED_VAR, false);
        if self.use_vault {
            match VaultSettings::from_env() {
                Ok(settings) => {
                    let reader = VaultReader::connect(settings, &self.current_env);
                    if !reader.enabled() {
                        self.use_vault = false;
                    }
                    self.readers.get_mut().register(Box::new(reader));
                }
                Err(err) => {
                    warn!(error = %err, "invalid secret reader settings");
                    self.use_vault = false;
                }
            }
        }
    }

    fn load_ini_config(&mut self) -> Result<(), ConfigError> {
        let config_file = self
            .get(CONFIG_FILE_VAR)
            .map(|value| value.to_text())
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut path = PathBuf::from(&config_file);
        if !path.is_absolute() {
            path = self.root.join(&config_file);
        }
        if !path.exists() {
            path = self.root.join(DEFAULT_CONFIG_FILE);
        }

        if path.is_file() {
            self.ini = IniStore::load(&path)?;
        } else {
            warn!(path = %path.display(), "INI configuration file does not exist");
            if self.create_missing
                && let Some(parent) = path.parent()
            {
                let _ = std::fs::create_dir_all(parent);
            }
            self.ini = IniStore::empty();
        }
        Ok(())
    }

    fn load_project(&mut self) -> Result<(), ConfigError> {
        let loader = ProjectLoader::new(&self.root);
        let data = loader.load()?;
        self.mapping.extend(data);
        Ok(())
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        self.close();
    }
}
