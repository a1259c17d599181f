//! Resolver behavior tests.
//!
//! Responsibilities:
//! - Pin the precedence chain (mapping → environment → readers → fallback).
//! - Pin the single-backend write policy and the capability-query contract
//!   of `set_ext`.
//! - Pin environment switching: idempotence, cache swaps, rollback.
//!
//! Invariants / Assumptions:
//! - Tests serialize process-environment access via the global test lock.
//! - Key names are prefixed `_LAMINA_RS_` to avoid collisions with the
//!   host environment.

use std::collections::HashMap;

use serial_test::serial;
use tempfile::TempDir;

use lamina_readers::{ReaderError, SourceReader};

use super::Resolver;
use crate::error::ConfigError;
use crate::test_util::global_test_lock;
use crate::value::ConfigValue;

/// Environment variables the resolver consults at configure time; unset for
/// every test so the host environment cannot leak in.
const CONFIG_VARS: [&str; 12] = [
    "ENV",
    "SITE_ROOT",
    "CONFIG_FILE",
    "CONFIG_CREATE",
    "AUTO_DISCOVERY",
    "LAZY_LOAD",
    "DEBUG",
    "USE_REDIS",
    "USE_MEMCACHED",
    "VAULT_ENABLED",
    "PROJECT_PATH",
    "PROJECT_NAME",
];

/// In-memory source reader for exercising the chain without a backend.
struct StubReader {
    reader_name: &'static str,
    enabled: bool,
    data: HashMap<String, String>,
}

impl StubReader {
    fn with_data(pairs: &[(&str, &str)]) -> Self {
        Self {
            reader_name: "stub",
            enabled: true,
            data: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn disabled() -> Self {
        Self {
            reader_name: "stub",
            enabled: false,
            data: HashMap::new(),
        }
    }
}

impl SourceReader for StubReader {
    fn name(&self) -> &'static str {
        self.reader_name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn get(&mut self, key: &str) -> Result<Option<String>, ReaderError> {
        if !self.enabled {
            return Err(ReaderError::NotConfigured(self.reader_name));
        }
        Ok(self.data.get(key).cloned())
    }

    fn exists(&mut self, key: &str) -> Result<bool, ReaderError> {
        if !self.enabled {
            return Err(ReaderError::NotConfigured(self.reader_name));
        }
        Ok(self.data.contains_key(key))
    }

    fn set(&mut self, key: &str, value: &str, _ttl: Option<u64>) -> Result<(), ReaderError> {
        if !self.enabled {
            return Err(ReaderError::NotConfigured(self.reader_name));
        }
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool, ReaderError> {
        if !self.enabled {
            return Err(ReaderError::NotConfigured(self.reader_name));
        }
        Ok(self.data.remove(key).is_some())
    }

    fn close(&mut self) {
        self.enabled = false;
    }
}

/// A project tree with one `env/<name>/.env` file per entry.
fn project_tree(envs: &[(&str, &str)]) -> TempDir {
    let root = TempDir::new().unwrap();
    for (env, content) in envs {
        let dir = root.path().join("env").join(env);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(".env"), content).unwrap();
    }
    root
}

fn dev_resolver(root: &TempDir) -> Resolver {
    Resolver::builder()
        .with_root(root.path())
        .with_env("dev")
        .build()
        .unwrap()
}

fn with_clean_env<F: FnOnce()>(extra: &[&str], f: F) {
    let vars: Vec<&str> = CONFIG_VARS.iter().copied().chain(extra.iter().copied()).collect();
    temp_env::with_vars_unset(vars, f);
}

#[test]
#[serial]
fn mapping_is_never_shadowed_by_a_reader() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&["_LAMINA_RS_APP"], || {
        let root = project_tree(&[("dev", "_LAMINA_RS_APP=mapping\n")]);
        let mut resolver = dev_resolver(&root);
        resolver.register_reader(Box::new(StubReader::with_data(&[(
            "_LAMINA_RS_APP",
            "reader",
        )])));

        assert_eq!(
            resolver.get("_LAMINA_RS_APP"),
            Some(ConfigValue::Str("mapping".to_string()))
        );
    });
}

#[test]
#[serial]
fn environment_beats_readers_and_readers_beat_fallback() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&["_LAMINA_RS_ENVKEY", "_LAMINA_RS_READERKEY"], || {
        let root = project_tree(&[("dev", "_LAMINA_RS_UNUSED=x\n")]);
        let mut resolver = dev_resolver(&root);
        resolver.register_reader(Box::new(StubReader::with_data(&[
            ("_LAMINA_RS_ENVKEY", "reader"),
            ("_LAMINA_RS_READERKEY", "reader"),
        ])));

        temp_env::with_vars([("_LAMINA_RS_ENVKEY", Some("process"))], || {
            assert_eq!(
                resolver.get("_LAMINA_RS_ENVKEY"),
                Some(ConfigValue::Str("process".to_string()))
            );
        });
        assert_eq!(
            resolver.get("_LAMINA_RS_READERKEY"),
            Some(ConfigValue::Str("reader".to_string()))
        );
        assert_eq!(resolver.get("_LAMINA_RS_ABSENT"), None);
        assert_eq!(
            resolver.get_or("_LAMINA_RS_ABSENT", "fallback"),
            ConfigValue::Str("fallback".to_string())
        );
    });
}

#[test]
#[serial]
fn disabled_readers_yield_no_value_not_an_error() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&[], || {
        let root = project_tree(&[("dev", "_LAMINA_RS_UNUSED=x\n")]);
        let mut resolver = dev_resolver(&root);
        resolver.register_reader(Box::new(StubReader::disabled()));

        assert_eq!(resolver.get("_LAMINA_RS_ONLY_IN_READER"), None);
        assert!(!resolver.exists("_LAMINA_RS_ONLY_IN_READER"));
    });
}

#[test]
#[serial]
fn exists_agrees_with_get() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&["_LAMINA_RS_EX_ENV"], || {
        let root = project_tree(&[("dev", "_LAMINA_RS_EX_MAP=1\n")]);
        let mut resolver = dev_resolver(&root);
        resolver.register_reader(Box::new(StubReader::with_data(&[(
            "_LAMINA_RS_EX_READER",
            "r",
        )])));

        temp_env::with_vars([("_LAMINA_RS_EX_ENV", Some(""))], || {
            for key in [
                "_LAMINA_RS_EX_MAP",
                "_LAMINA_RS_EX_ENV",
                "_LAMINA_RS_EX_READER",
                "_LAMINA_RS_EX_MISSING",
            ] {
                assert_eq!(
                    resolver.exists(key),
                    resolver.get(key).is_some(),
                    "exists/get disagree for {key}"
                );
                assert_eq!(resolver.contains(key), resolver.exists(key));
            }
        });
    });
}

#[test]
#[serial]
fn set_updates_the_backend_already_tracking_the_key() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&["_LAMINA_RS_SET_ENV", "_LAMINA_RS_SET_NEW"], || {
        let root = project_tree(&[("dev", "_LAMINA_RS_SET_MAP=original\n")]);
        let mut resolver = dev_resolver(&root);

        // Key tracked in the mapping: the mapping is updated in place.
        resolver.set("_LAMINA_RS_SET_MAP", "updated").unwrap();
        assert_eq!(
            resolver.get("_LAMINA_RS_SET_MAP"),
            Some(ConfigValue::Str("updated".to_string()))
        );

        temp_env::with_vars([("_LAMINA_RS_SET_ENV", Some("old"))], || {
            // Key already an env var: the env var is overwritten.
            resolver.set("_LAMINA_RS_SET_ENV", "new").unwrap();
            assert_eq!(std::env::var("_LAMINA_RS_SET_ENV").unwrap(), "new");
        });

        temp_env::with_vars_unset(["_LAMINA_RS_SET_NEW"], || {
            // No backend claims the key: mapping AND environment receive it.
            resolver.set("_LAMINA_RS_SET_NEW", "both").unwrap();
            assert_eq!(std::env::var("_LAMINA_RS_SET_NEW").unwrap(), "both");
            assert_eq!(
                resolver.get("_LAMINA_RS_SET_NEW"),
                Some(ConfigValue::Str("both".to_string()))
            );
        });
    });
}

#[test]
#[serial]
fn structured_values_round_trip_through_set_and_get() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&["_LAMINA_RS_STRUCT"], || {
        let root = project_tree(&[("dev", "_LAMINA_RS_UNUSED=x\n")]);
        let mut resolver = dev_resolver(&root);

        let value = serde_json::json!({"hosts": ["a", "b"], "port": 6379});
        temp_env::with_vars_unset(["_LAMINA_RS_STRUCT"], || {
            resolver.set("_LAMINA_RS_STRUCT", value.clone()).unwrap();
            // The environment carries the envelope form...
            assert!(
                std::env::var("_LAMINA_RS_STRUCT")
                    .unwrap()
                    .starts_with("LAMINA_JSON:")
            );
            // ...while get returns the structured value, mapping-first.
            assert_eq!(
                resolver.get("_LAMINA_RS_STRUCT"),
                Some(ConfigValue::Structured(value.clone()))
            );
            assert_eq!(
                resolver.get_dict("_LAMINA_RS_STRUCT").map(|m| m.len()),
                Some(2)
            );
        });
    });
}

#[test]
#[serial]
fn set_ext_without_backends_is_a_refused_capability() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&[], || {
        let root = project_tree(&[("dev", "_LAMINA_RS_UNUSED=x\n")]);
        let mut resolver = dev_resolver(&root);
        assert!(!resolver.set_ext("_LAMINA_RS_TTL", "value", Some(60), false));
        assert!(!resolver.set_ext("_LAMINA_RS_TTL", "value", Some(60), true));
    });
}

#[test]
#[serial]
fn attr_coerces_and_distinguishes_missing() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&[], || {
        let root = project_tree(&[(
            "dev",
            "_LAMINA_RS_AT_BOOL=yes\n_LAMINA_RS_AT_INT=42\n_LAMINA_RS_AT_STR=plain\n_LAMINA_RS_AT_EMPTY=\n",
        )]);
        let resolver = dev_resolver(&root);

        assert_eq!(
            resolver.attr("_LAMINA_RS_AT_BOOL").unwrap(),
            ConfigValue::Bool(true)
        );
        assert_eq!(
            resolver.attr("_LAMINA_RS_AT_INT").unwrap(),
            ConfigValue::Int(42)
        );
        assert_eq!(
            resolver.attr("_LAMINA_RS_AT_STR").unwrap(),
            ConfigValue::Str("plain".to_string())
        );
        // Present-but-empty is still present, not missing.
        assert_eq!(
            resolver.attr("_LAMINA_RS_AT_EMPTY").unwrap(),
            ConfigValue::Str(String::new())
        );
        assert!(matches!(
            resolver.attr("_LAMINA_RS_AT_MISSING"),
            Err(ConfigError::MissingKey(_))
        ));
    });
}

#[test]
#[serial]
fn get_list_is_always_safe_to_iterate() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&[], || {
        let root = project_tree(&[("dev", "_LAMINA_RS_LIST=a,b,c\n")]);
        let resolver = dev_resolver(&root);

        assert_eq!(resolver.get_list("_LAMINA_RS_LIST"), vec!["a", "b", "c"]);
        assert!(resolver.get_list("_LAMINA_RS_LIST_MISSING").is_empty());
    });
}

#[test]
#[serial]
fn switching_to_the_current_environment_is_a_no_op() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&[], || {
        let root = project_tree(&[("dev", "_LAMINA_RS_SW_A=dev\n")]);
        let mut resolver = dev_resolver(&root);
        let before = resolver.get("_LAMINA_RS_SW_A");

        resolver.set_env("dev", false).unwrap();
        assert_eq!(resolver.current_env(), "dev");
        assert_eq!(resolver.get("_LAMINA_RS_SW_A"), before);
        assert!(resolver.env_info().cached_envs.is_empty());
    });
}

#[test]
#[serial]
fn switching_environments_swaps_the_mapping_and_fills_the_cache() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&["_LAMINA_RS_SW_B"], || {
        let root = project_tree(&[
            ("dev", "_LAMINA_RS_SW_B=dev\n"),
            ("staging", "_LAMINA_RS_SW_B=staging\n"),
        ]);
        let mut resolver = dev_resolver(&root);

        resolver.set_env("staging", false).unwrap();
        assert_eq!(resolver.current_env(), "staging");
        assert_eq!(
            resolver.get("_LAMINA_RS_SW_B"),
            Some(ConfigValue::Str("staging".to_string()))
        );

        // Both environments are now cached; switching back is served from
        // the cache.
        let info = resolver.env_info();
        assert!(info.cached_envs.contains(&"dev".to_string()));
        assert!(info.cached_envs.contains(&"staging".to_string()));
        resolver.set_env("dev", false).unwrap();
        assert_eq!(
            resolver.get("_LAMINA_RS_SW_B"),
            Some(ConfigValue::Str("dev".to_string()))
        );
    });
}

#[test]
#[serial]
fn failed_switch_rolls_back_the_environment_pointer() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&["_LAMINA_RS_SW_C"], || {
        let root = project_tree(&[("dev", "_LAMINA_RS_SW_C=dev\n")]);
        let mut resolver = dev_resolver(&root);

        let err = resolver.set_env("staging", false).unwrap_err();
        assert!(matches!(err, ConfigError::EnvSwitch { ref env, .. } if env == "staging"));
        assert_eq!(resolver.current_env(), "dev");
        assert_eq!(
            resolver.get("_LAMINA_RS_SW_C"),
            Some(ConfigValue::Str("dev".to_string()))
        );
    });
}

#[test]
#[serial]
fn get_with_env_peeks_without_switching() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&["_LAMINA_RS_SW_D"], || {
        let root = project_tree(&[
            ("dev", "_LAMINA_RS_SW_D=dev\n"),
            ("prod", "_LAMINA_RS_SW_D=prod\n"),
        ]);
        let mut resolver = dev_resolver(&root);

        assert_eq!(
            resolver.get_with_env("_LAMINA_RS_SW_D", Some("prod")),
            Some(ConfigValue::Str("prod".to_string()))
        );
        assert_eq!(resolver.current_env(), "dev");
        // The peek cached the environment.
        assert!(resolver.env_info().cached_envs.contains(&"prod".to_string()));

        resolver.clear_env_cache(Some("prod"));
        assert!(!resolver.env_info().cached_envs.contains(&"prod".to_string()));
        assert_eq!(
            resolver.get_with_env("_LAMINA_RS_SW_D", Some("ghost")),
            None
        );
    });
}

#[test]
#[serial]
fn configure_runs_at_most_once() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&["_LAMINA_RS_ONCE"], || {
        let root = project_tree(&[("dev", "_LAMINA_RS_UNUSED=x\n")]);
        let mut resolver = dev_resolver(&root);
        assert!(resolver.is_configured());

        temp_env::with_vars_unset(["_LAMINA_RS_ONCE"], || {
            resolver.set("_LAMINA_RS_ONCE", "kept").unwrap();
            resolver.configure().unwrap();
            // Reconfiguration did not re-run and wipe the mapping.
            assert_eq!(
                resolver.get("_LAMINA_RS_ONCE"),
                Some(ConfigValue::Str("kept".to_string()))
            );
        });
    });
}

#[test]
#[serial]
fn lazy_construction_defers_the_configuration_pass() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&[], || {
        let root = project_tree(&[("dev", "_LAMINA_RS_LAZY=1\n")]);
        let mut resolver = Resolver::builder()
            .with_root(root.path())
            .with_env("dev")
            .with_lazy(true)
            .build()
            .unwrap();
        assert!(!resolver.is_configured());
        assert_eq!(resolver.get("_LAMINA_RS_LAZY"), None);

        resolver.configure().unwrap();
        assert!(resolver.is_configured());
        assert_eq!(
            resolver.get("_LAMINA_RS_LAZY"),
            Some(ConfigValue::Str("1".to_string()))
        );
    });
}

#[test]
#[serial]
fn section_lookups_consult_the_ini_store_only() {
    let _guard = global_test_lock().lock().unwrap();
    with_clean_env(&["_LAMINA_RS_SEC"], || {
        let root = project_tree(&[("dev", "_LAMINA_RS_UNUSED=x\n")]);
        std::fs::create_dir_all(root.path().join("etc")).unwrap();
        std::fs::write(
            root.path().join("etc/config.ini"),
            "[database]\nhost = db.internal\n",
        )
        .unwrap();
        let mut resolver = dev_resolver(&root);
        resolver.register_reader(Box::new(StubReader::with_data(&[("_LAMINA_RS_SEC", "r")])));

        assert_eq!(
            resolver.get_from(Some("database"), "host"),
            Some(ConfigValue::Str("db.internal".to_string()))
        );
        // Section-qualified lookups never fall through to the readers.
        assert_eq!(resolver.get_from(Some("database"), "_LAMINA_RS_SEC"), None);
        assert_eq!(
            resolver.section("database").get("host").map(String::as_str),
            Some("db.internal")
        );
        assert!(resolver.section("missing").is_empty());
    });
}
