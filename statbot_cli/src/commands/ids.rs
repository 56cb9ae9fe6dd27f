//! The `id` subcommand: saved Steam/Epic identifiers per chat user.

use anyhow::Result;
use clap::{Args, Subcommand};
use statbot_lib::{ClearTarget, Platform, Settings, UserIdStore};

use crate::output::{self, OutputFormat};

/// Arguments for the `id` subcommand.
#[derive(Args)]
pub struct IdArgs {
    /// Chat user ID the identifiers belong to
    #[arg(long)]
    pub user: u64,

    #[command(subcommand)]
    pub action: Option<IdAction>,
}

#[derive(Subcommand)]
pub enum IdAction {
    /// Show saved IDs (default)
    Show,
    /// Save an ID: `set steam <name>` or `set epic <name>`
    Set {
        platform: String,
        #[arg(required = true, num_args = 1..)]
        value: Vec<String>,
    },
    /// Remove saved IDs: steam, epic or all
    Clear {
        #[arg(default_value = "all")]
        target: String,
    },
}

pub async fn run(args: &IdArgs, settings: &Settings, format: &OutputFormat) -> Result<()> {
    let store = UserIdStore::new(settings.user_ids_path());

    match args.action.as_ref().unwrap_or(&IdAction::Show) {
        IdAction::Show => {
            let ids = store.get(args.user).await;
            output::print_ids(args.user, &ids, format)?;
        }
        IdAction::Set { platform, value } => {
            let platform: Platform = platform.parse()?;
            store.set(args.user, platform, &value.join(" ")).await?;
            println!("OK, {} saved.", platform);
        }
        IdAction::Clear { target } => {
            let target: ClearTarget = target.parse()?;
            store.clear(args.user, target).await?;
            println!("OK, cleared.");
        }
    }
    Ok(())
}
