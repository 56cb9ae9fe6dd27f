mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use statbot_lib::Settings;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "statbot")]
#[command(about = "Look up game statistics through the persistent request cache")]
struct Cli {
    /// Output format: table or json
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// Directory holding api_cache.json and user_ids.json (overrides STATBOT_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up player or provider stats
    Stats(commands::stats::StatsArgs),
    /// Inspect or maintain the request cache
    Cache(commands::cache::CacheArgs),
    /// Show or edit saved Steam/Epic IDs
    Id(commands::ids::IdArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("statbot_lib=info".parse()?)
                .add_directive("statbot_api=info".parse()?),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let format = match cli.output.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    };

    let mut settings = Settings::from_env();
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    match &cli.command {
        Commands::Stats(args) => commands::stats::run(args, &settings, &format).await?,
        Commands::Cache(args) => commands::cache::run(args, &settings, &format)?,
        Commands::Id(args) => commands::ids::run(args, &settings, &format).await?,
    }

    Ok(())
}
