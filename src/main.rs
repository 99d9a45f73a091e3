use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ytgrab::cli::{Cli, Commands};
use ytgrab::config::Config;
use ytgrab::extractors::ytdlp::YtDlpExtractor;
use ytgrab::server::{self, AppState};
use ytgrab::utils;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "ytgrab=debug,tower_http=debug"
    } else {
        "ytgrab=info,tower_http=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    cli.command.apply_overrides(&mut config);
    config.validate()?;

    match cli.command {
        Commands::Serve { .. } => {
            // Missing tools are not fatal: they may be installed later or
            // reachable under a different environment.
            let missing = utils::check_dependencies(
                &config.extractor.yt_dlp_path,
                config.extractor.ffmpeg_location.as_deref(),
            )
            .await;
            for dep in &missing {
                tracing::warn!("Dependency not found: {}", dep);
            }

            let extractor = Arc::new(YtDlpExtractor::new(config.extractor.yt_dlp_path.clone()));
            let state = Arc::new(AppState::new(&config, extractor));

            tracing::info!(version = env!("CARGO_PKG_VERSION"), "ytgrab starting");
            server::serve(&config, state).await?;
        }
        Commands::Check => {
            let missing = utils::check_dependencies(
                &config.extractor.yt_dlp_path,
                config.extractor.ffmpeg_location.as_deref(),
            )
            .await;

            if missing.is_empty() {
                println!("All dependencies found.");
            } else {
                println!("Missing dependencies:");
                for dep in &missing {
                    println!("  • {}", dep);
                }
                std::process::exit(1);
            }
        }
        Commands::Config { show, init } => {
            if init {
                let path = cli
                    .config
                    .clone()
                    .or_else(Config::config_path)
                    .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
                Config::default().save(&path)?;
                println!("Default configuration written to: {}", path.display());
            } else if show {
                config.display();
            } else {
                println!("Edit the config file to change settings, or pass --show to print them.");
                if let Some(path) = cli.config.clone().or_else(Config::config_path) {
                    println!("  {}", path.display());
                }
            }
        }
    }

    Ok(())
}
