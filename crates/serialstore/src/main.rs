// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SerialStore - a key/value store whose every read and write goes through
//! the transaction coordinator.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod entry;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serialstore_config::SerialStoreConfig;
use serialstore_core::StoreError;
use tracing::debug;

use crate::commands::Store;

/// SerialStore - a coordinated SQLite key/value store.
#[derive(Parser, Debug)]
#[command(name = "serialstore", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `store.database_path`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a value under a key.
    Put { key: String, value: String },
    /// Print the value stored under a key.
    Get { key: String },
    /// Append to the value stored under a key, creating it if missing.
    Append { key: String, suffix: String },
    /// List entries sorted by key.
    List {
        /// Only entries whose key or value contains this text.
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        desc: bool,
    },
    /// Delete the entry under a key.
    Delete { key: String },
    /// Delete every entry.
    Clear,
    /// Print the number of entries.
    Count,
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => serialstore_config::load_and_validate_path(path),
        None => serialstore_config::load_and_validate(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            serialstore_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    if let Some(db) = cli.db {
        config.store.database_path = db;
    }

    init_tracing(&config.logging.log_level);

    let Some(command) = cli.command else {
        println!("serialstore: use --help for available commands");
        return;
    };

    if let Commands::Config = command {
        print_config(&config);
        return;
    }

    let store = match commands::open_store(&config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("serialstore: {e}");
            std::process::exit(1);
        }
    };
    debug!(path = %config.store.database_path, "store opened");

    let outcome = run(&store, command, cli.json).await;
    // Drain the worker before a possible exit, which skips destructors.
    drop(store);

    if let Err(e) = outcome {
        eprintln!("serialstore: {e} ({})", e.kind());
        std::process::exit(1);
    }
}

async fn run(store: &Store, command: Commands, json: bool) -> Result<(), StoreError> {
    match command {
        Commands::Put { key, value } => {
            let previous = commands::put(store, key, value).await?;
            if json {
                print_json(&serde_json::json!({ "previous": previous }));
            } else if let Some(previous) = previous {
                println!("replaced: {previous}");
            }
        }
        Commands::Get { key } => match commands::get(store, key.clone()).await? {
            Some(entry) if json => print_json(&entry),
            Some(entry) => println!("{}", entry.value),
            None => {
                return Err(StoreError::other(format!("no entry for key `{key}`")));
            }
        },
        Commands::Append { key, suffix } => {
            let value = commands::append(store, key, suffix).await?;
            if json {
                print_json(&serde_json::json!({ "value": value }));
            } else {
                println!("{value}");
            }
        }
        Commands::List { filter, desc } => {
            let entries = commands::list(store, filter, desc).await?;
            if json {
                print_json(&entries);
            } else {
                for entry in entries {
                    println!("{}\t{}", entry.key, entry.value);
                }
            }
        }
        Commands::Delete { key } => {
            let removed = commands::delete(store, key).await?;
            if json {
                print_json(&serde_json::json!({ "removed": removed }));
            } else if !removed {
                println!("nothing to delete");
            }
        }
        Commands::Clear => {
            let removed = commands::clear(store).await?;
            if json {
                print_json(&serde_json::json!({ "removed": removed }));
            } else {
                println!("removed {removed} entries");
            }
        }
        Commands::Count => {
            let count = commands::count(store).await?;
            if json {
                print_json(&serde_json::json!({ "count": count }));
            } else {
                println!("{count}");
            }
        }
        Commands::Config => {}
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("serialstore: failed to encode output: {e}"),
    }
}

fn print_config(config: &SerialStoreConfig) {
    match toml::to_string_pretty(config) {
        Ok(text) => print!("{text}"),
        Err(e) => eprintln!("serialstore: failed to render config: {e}"),
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` takes precedence when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("serialstore={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();
}
