//! Lamina CLI - inspect and scaffold layered configuration.
//!
//! Responsibilities:
//! - Resolve keys from the command line the same way an application would.
//! - Print environment diagnostics and list available environments.
//! - Scaffold the conventional project layout for a new environment.
//!
//! Does NOT handle:
//! - Resolution or loading logic (see the `lamina-config` crate).
//!
//! Invariants:
//! - Logging is initialized here, once, from `RUST_LOG`; the library crates
//!   only emit events.

mod samples;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use lamina_config::{ConfigValue, Resolver};

#[derive(Parser)]
#[command(name = "lamina", version, about = "Layered configuration resolver")]
struct Cli {
    /// Project root; defaults to SITE_ROOT or marker-based discovery.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Environment name (dev, prod, staging, ...).
    #[arg(long, env = "ENV", global = true)]
    env: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve one key and print its value.
    Get {
        key: String,

        /// Look the key up in an INI section instead of the main chain.
        #[arg(long)]
        section: Option<String>,

        /// Value to print when nothing resolves.
        #[arg(long)]
        fallback: Option<String>,

        /// Read from a specific environment without switching to it.
        #[arg(long, value_name = "ENV")]
        from_env: Option<String>,
    },

    /// Print environment diagnostics as JSON.
    Info,

    /// List the available environments.
    Envs,

    /// Scaffold env/<NAME>/.env and etc/config.ini for a new environment.
    Init {
        name: String,

        /// Append a secret-store credential block to the scaffolded .env.
        #[arg(long)]
        vault: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let Cli { root, env, command } = Cli::parse();
    let root = root.unwrap_or_else(lamina_config::project_root);
    tracing::debug!(root = %root.display(), "using project root");

    match command {
        Command::Init { name, vault } => {
            let created = samples::scaffold(&root, &name, vault)?;
            for path in created {
                println!("created {}", path.display());
            }
            Ok(())
        }
        Command::Envs => {
            let resolver = build_resolver(root, env)?;
            for name in resolver.list_available_envs() {
                println!("{name}");
            }
            Ok(())
        }
        Command::Info => {
            let resolver = build_resolver(root, env)?;
            let info = resolver.env_info();
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
        Command::Get {
            key,
            section,
            fallback,
            from_env,
        } => {
            let resolver = build_resolver(root, env)?;
            let value = match (&section, &from_env) {
                (Some(section), _) => resolver.get_from(Some(section.as_str()), &key),
                (None, Some(peek)) => resolver.get_with_env(&key, Some(peek.as_str())),
                (None, None) => resolver.get(&key),
            };
            match value.or(fallback.map(ConfigValue::from)) {
                Some(value) => {
                    println!("{value}");
                    Ok(())
                }
                None => anyhow::bail!("no value for key {key:?}"),
            }
        }
    }
}

fn build_resolver(root: PathBuf, env: Option<String>) -> anyhow::Result<Resolver> {
    let mut builder = Resolver::builder().with_root(root);
    if let Some(env) = env {
        builder = builder.with_env(env);
    }
    builder.build().context("failed to load configuration")
}
