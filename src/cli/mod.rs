use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "ytgrab",
    about = "ytgrab - Download videos or audio tracks through a small web form",
    version,
    long_about = "Serves a single-page form that takes a video URL and an output format, fetches the media with yt-dlp (and ffmpeg for audio) and streams the file back to the browser."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true, env = "YTGRAB_LOG_JSON")]
    pub log_json: bool,

    /// Configuration file (defaults to ./config.yaml or the user config dir)
    #[arg(short, long, global = true, value_name = "FILE", env = "YTGRAB_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Address to listen on
        #[arg(short, long, value_name = "ADDR", env = "YTGRAB_BIND")]
        bind: Option<String>,

        /// Directory for temporary downloads
        #[arg(long, value_name = "DIR", env = "YTGRAB_TEMP_DIR")]
        temp_dir: Option<PathBuf>,

        /// Path to the yt-dlp binary
        #[arg(long = "yt-dlp", value_name = "PATH", env = "YTGRAB_YT_DLP")]
        yt_dlp: Option<PathBuf>,

        /// Directory containing ffmpeg
        #[arg(long, value_name = "PATH", env = "YTGRAB_FFMPEG_LOCATION")]
        ffmpeg_location: Option<PathBuf>,

        /// Keep downloaded files after they were sent
        #[arg(long)]
        keep_files: bool,
    },

    /// Check that yt-dlp and ffmpeg can be found
    Check,

    /// Show or initialise the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration to the config file
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
}

impl Commands {
    /// Apply `serve` flags on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Commands::Serve {
            bind,
            temp_dir,
            yt_dlp,
            ffmpeg_location,
            keep_files,
        } = self
        {
            if let Some(bind) = bind {
                config.server.bind_address = bind.clone();
            }
            if let Some(dir) = temp_dir {
                config.app.temp_dir = Some(dir.clone());
            }
            if let Some(path) = yt_dlp {
                config.extractor.yt_dlp_path = path.clone();
            }
            if let Some(path) = ffmpeg_location {
                config.extractor.ffmpeg_location = Some(path.clone());
            }
            if *keep_files {
                config.app.keep_files = true;
            }
        }
    }
}
