//! The `stats` subcommand: provider lookups through the shared cache.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use statbot_lib::{CachedClient, IdSet, Platform, Settings, SingleFlightCache, UserIdStore};

use crate::output::{self, OutputFormat};

/// Arguments for the `stats` subcommand.
#[derive(Args)]
pub struct StatsArgs {
    #[command(subcommand)]
    pub source: StatsSource,
}

#[derive(Subcommand)]
pub enum StatsSource {
    /// Tracker network profile, e.g. `stats trn smite2 steam:Player`
    Trn {
        /// Game slug (smite, smite2, ...)
        game: String,
        /// Player as `platform:name` or a bare name on the default platform
        player: Option<String>,
        /// Chat user whose saved ID is used when no player is given
        #[arg(long)]
        user: Option<u64>,
    },
    /// Any endpoint on the configured RapidAPI host
    Rapid {
        /// Full request URL
        url: String,
    },
}

pub async fn run(args: &StatsArgs, settings: &Settings, format: &OutputFormat) -> Result<()> {
    let cache = Arc::new(SingleFlightCache::open(settings.cache_path()));
    let client = CachedClient::new(cache, settings.clone());

    let cached = match &args.source {
        StatsSource::Trn { game, player, user } => {
            let player = match player {
                Some(p) => p.clone(),
                None => saved_player(settings, *user).await?,
            };
            client.trn_profile(game, &player).await?
        }
        StatsSource::Rapid { url } => client.rapidapi(url).await?,
    };

    output::print_lookup(&cached, format)
}

/// The user's saved Steam ID, prefixed so the default platform never applies.
async fn saved_player(settings: &Settings, user: Option<u64>) -> Result<String> {
    let user = user.ok_or_else(|| anyhow!("no player given; pass one or use --user <ID>"))?;
    let ids = UserIdStore::new(settings.user_ids_path()).get(user).await;
    saved_steam_player(&ids).ok_or_else(|| {
        anyhow!(
            "user {} has no saved steam ID; save one with `statbot id --user {} set steam <name>`",
            user,
            user
        )
    })
}

fn saved_steam_player(ids: &IdSet) -> Option<String> {
    ids.get(Platform::Steam)
        .map(|id| format!("{}:{}", Platform::Steam, id))
}
