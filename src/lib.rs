//! ytgrab - a single-page web form for downloading videos or audio tracks
//!
//! The form posts a URL and a format; the media is fetched with yt-dlp
//! (which calls ffmpeg for audio) and streamed back as an attachment.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod server;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use extractors::{DownloadJob, DownloadOptions, ExtractError, MediaExtractor, MediaFormat, VideoMetadata};
pub use server::{router, AppState};
