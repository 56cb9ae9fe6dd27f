//! The `cache` subcommand: inspect and maintain the durable request cache.

use anyhow::Result;
use clap::{Args, Subcommand};
use statbot_lib::{KvStore, Settings};

use crate::output::{self, OutputFormat};

/// Arguments for the `cache` subcommand.
#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// List live entries with their remaining time
    List,
    /// Drop expired entries from the cache file
    Purge,
    /// Drop every entry
    Clear,
    /// Drop a single entry
    Remove {
        /// Full cache key, e.g. trn:smite2:steam:player
        key: String,
    },
}

pub fn run(args: &CacheArgs, settings: &Settings, format: &OutputFormat) -> Result<()> {
    let store = KvStore::new(settings.cache_path());

    match &args.action {
        CacheAction::List => output::print_entries(&store.entries(), format)?,
        CacheAction::Purge => {
            let purged = store.try_purge_expired()?;
            println!("Removed {} expired entries", purged);
        }
        CacheAction::Clear => {
            store.try_clear()?;
            println!("Cache cleared ({})", store.path().display());
        }
        CacheAction::Remove { key } => {
            if store.try_remove(key)? {
                println!("Removed {}", key);
            } else {
                println!("No entry for {}", key);
            }
        }
    }
    Ok(())
}
