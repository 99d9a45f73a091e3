use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::extractors::DownloadOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// yt-dlp / ffmpeg settings
    pub extractor: ExtractorConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// yt-dlp binary, resolved through PATH when not absolute
    pub yt_dlp_path: PathBuf,

    /// Directory or binary of ffmpeg, if not on PATH
    pub ffmpeg_location: Option<PathBuf>,

    /// Bitrate passed to the transcoder for audio downloads
    pub audio_quality: String,

    /// Format selector for video downloads
    pub video_format: String,

    /// Format selector for audio downloads
    pub audio_format: String,

    /// Network timeout for yt-dlp, in seconds
    pub socket_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Temporary directory for downloads (system temp dir if unset)
    pub temp_dir: Option<PathBuf>,

    /// Keep downloaded files after they were sent
    pub keep_files: bool,

    /// Prefix of every temporary file name
    pub file_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5000".to_string(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        let options = DownloadOptions::default();
        Self {
            yt_dlp_path: PathBuf::from("yt-dlp"),
            ffmpeg_location: None,
            audio_quality: options.audio_quality,
            video_format: options.video_format,
            audio_format: options.audio_format,
            socket_timeout_secs: options.socket_timeout_secs,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            keep_files: false,
            file_prefix: "ytgrab_download".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Option<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir().map(|dir| dir.join("ytgrab").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.bind_address()?;

        if self.extractor.yt_dlp_path.as_os_str().is_empty() {
            anyhow::bail!("extractor.yt_dlp_path must not be empty");
        }

        if self.extractor.audio_quality.trim().is_empty() {
            anyhow::bail!("extractor.audio_quality must not be empty");
        }

        if self.app.file_prefix.trim().is_empty() {
            anyhow::bail!("app.file_prefix must not be empty");
        }

        Ok(())
    }

    /// Parsed bind address
    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server
            .bind_address
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind_address))
    }

    /// Directory temporary downloads are written to
    pub fn temp_dir(&self) -> PathBuf {
        self.app.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Options handed to the extractor for each download
    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            video_format: self.extractor.video_format.clone(),
            audio_format: self.extractor.audio_format.clone(),
            audio_quality: self.extractor.audio_quality.clone(),
            ffmpeg_location: self.extractor.ffmpeg_location.clone(),
            socket_timeout_secs: self.extractor.socket_timeout_secs,
        }
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Bind Address: {}", self.server.bind_address);
        println!("  yt-dlp: {}", self.extractor.yt_dlp_path.display());
        if let Some(ffmpeg) = &self.extractor.ffmpeg_location {
            println!("  ffmpeg: {}", ffmpeg.display());
        }
        println!("  Audio Quality: {}", self.extractor.audio_quality);
        println!("  Temp Dir: {}", self.temp_dir().display());
        println!("  Keep Files: {}", self.app.keep_files);
        if let Some(path) = Self::config_path() {
            println!("  Config File: {}", path.display());
        }
    }
}
