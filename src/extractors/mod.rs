use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub mod ytdlp;

/// Output format requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    #[default]
    Video,
    Audio,
}

impl MediaFormat {
    /// Parse the value of the `format` form field.
    ///
    /// `audio` and the legacy `mp3` select audio; anything else, including an
    /// empty value, falls back to video.
    pub fn from_form_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("audio") | Some("mp3") => MediaFormat::Audio,
            _ => MediaFormat::Video,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFormat::Video => "video",
            MediaFormat::Audio => "audio",
        }
    }

    /// File extension of the delivered file
    pub fn extension(&self) -> &'static str {
        match self {
            MediaFormat::Video => "mp4",
            MediaFormat::Audio => "mp3",
        }
    }

    /// Get MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaFormat::Video => "video/mp4",
            MediaFormat::Audio => "audio/mpeg",
        }
    }
}

impl std::fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata reported by the extractor for a URL
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Extractor-specific media id
    pub id: Option<String>,

    /// Title of the media, used to name the download
    pub title: Option<String>,

    /// Duration of the media if available
    #[serde(skip)]
    pub duration: Option<Duration>,

    /// Channel or uploader name
    pub uploader: Option<String>,

    /// Canonical page URL
    pub webpage_url: Option<String>,
}

/// Extraction options for one download.
///
/// Built from configuration and passed by value to the extractor; nothing
/// about a download is read from shared state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Format selector for video downloads
    pub video_format: String,

    /// Format selector for audio downloads
    pub audio_format: String,

    /// Target audio bitrate for the transcoder, e.g. `192K`
    pub audio_quality: String,

    /// Directory containing ffmpeg, if not on PATH
    pub ffmpeg_location: Option<PathBuf>,

    /// Network timeout handed to the extractor
    pub socket_timeout_secs: Option<u64>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            video_format: "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
            audio_format: "bestaudio/best".to_string(),
            audio_quality: "192K".to_string(),
            ffmpeg_location: None,
            socket_timeout_secs: None,
        }
    }
}

/// Request-scoped handle for one download.
///
/// Owns the unique identifier and the output location the extractor writes
/// into. Distinct jobs never share a prefix.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    id: Uuid,
    format: MediaFormat,
    dir: PathBuf,
    prefix: String,
}

impl DownloadJob {
    pub fn new(dir: impl Into<PathBuf>, file_prefix: &str, format: MediaFormat) -> Self {
        let id = Uuid::new_v4();
        Self {
            prefix: format!("{}_{}", file_prefix, id.simple()),
            id,
            format,
            dir: dir.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn format(&self) -> MediaFormat {
        self.format
    }

    /// File name stem shared by every file this job produces
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Output template handed to yt-dlp; the extension is filled in by it.
    pub fn output_template(&self) -> PathBuf {
        self.dir.join(format!("{}.%(ext)s", self.prefix))
    }

    /// Path the delivered file is expected at once post-processing is done
    pub fn expected_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}.{}", self.prefix, self.format.extension()))
    }

    /// Whether `path` was produced by this job
    pub fn owns(&self, path: &Path) -> bool {
        path.parent() == Some(self.dir.as_path())
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&self.prefix))
    }
}

/// Errors raised by a media extractor
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    /// The extractor ran and reported a download failure
    #[error("{0}")]
    Download(String),

    /// The extractor binary could not be started
    #[error("{tool} is not available: {source}")]
    Unavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The extractor produced output that could not be understood
    #[error("Failed to parse extractor output: {0}")]
    Parse(String),
}

/// Trait for retrieving media through an external extraction tool
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Fetch metadata for a URL without downloading anything.
    ///
    /// `Ok(None)` means the extractor ran but returned nothing usable.
    async fn fetch_metadata(
        &self,
        url: &str,
        options: &DownloadOptions,
    ) -> Result<Option<VideoMetadata>, ExtractError>;

    /// Download the media for `job`, returning the final path of the file.
    async fn download(
        &self,
        url: &str,
        job: &DownloadJob,
        options: &DownloadOptions,
    ) -> Result<PathBuf, ExtractError>;

    /// Get the name of this extractor
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_form_value() {
        assert_eq!(MediaFormat::from_form_value(Some("audio")), MediaFormat::Audio);
        assert_eq!(MediaFormat::from_form_value(Some("MP3")), MediaFormat::Audio);
        assert_eq!(MediaFormat::from_form_value(Some("video")), MediaFormat::Video);
        assert_eq!(MediaFormat::from_form_value(Some("mp4")), MediaFormat::Video);
        assert_eq!(MediaFormat::from_form_value(Some("flac")), MediaFormat::Video);
        assert_eq!(MediaFormat::from_form_value(None), MediaFormat::Video);
    }

    #[test]
    fn test_format_extension_and_mime() {
        assert_eq!(MediaFormat::Audio.extension(), "mp3");
        assert_eq!(MediaFormat::Audio.mime_type(), "audio/mpeg");
        assert_eq!(MediaFormat::Video.extension(), "mp4");
        assert_eq!(MediaFormat::Video.mime_type(), "video/mp4");
    }

    #[test]
    fn test_jobs_have_distinct_prefixes() {
        let a = DownloadJob::new("/tmp", "ytgrab", MediaFormat::Video);
        let b = DownloadJob::new("/tmp", "ytgrab", MediaFormat::Video);

        assert_ne!(a.id(), b.id());
        assert_ne!(a.prefix(), b.prefix());
        assert!(!a.prefix().starts_with(b.prefix()));
        assert!(!a.owns(&b.expected_path()));
    }

    #[test]
    fn test_job_paths() {
        let job = DownloadJob::new("/tmp/media", "ytgrab", MediaFormat::Audio);

        let template = job.output_template();
        assert_eq!(template.parent(), Some(Path::new("/tmp/media")));
        assert!(template.to_string_lossy().ends_with(".%(ext)s"));

        let expected = job.expected_path();
        assert!(expected.to_string_lossy().ends_with(".mp3"));
        assert!(job.owns(&expected));
        assert!(!job.owns(Path::new("/tmp/media/other.mp3")));
        assert!(!job.owns(&Path::new("/elsewhere").join(expected.file_name().unwrap())));
    }
}
