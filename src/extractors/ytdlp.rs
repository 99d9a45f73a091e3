use async_trait::async_trait;
use chrono::Duration;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use tokio::process::Command;

use super::{DownloadJob, DownloadOptions, ExtractError, MediaExtractor, MediaFormat, VideoMetadata};

/// Media extractor backed by the yt-dlp binary
pub struct YtDlpExtractor {
    yt_dlp_path: PathBuf,
}

impl YtDlpExtractor {
    pub fn new(yt_dlp_path: impl Into<PathBuf>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Run yt-dlp with `args`, mapping failures onto [`ExtractError`]
    async fn run(&self, args: &[String]) -> Result<Output, ExtractError> {
        tracing::debug!(args = ?args, "Running yt-dlp");

        let output = Command::new(&self.yt_dlp_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    ExtractError::Unavailable {
                        tool: self.yt_dlp_path.display().to_string(),
                        source: e,
                    }
                } else {
                    ExtractError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ExtractError::Download(error_message(&output)));
        }

        Ok(output)
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn fetch_metadata(
        &self,
        url: &str,
        options: &DownloadOptions,
    ) -> Result<Option<VideoMetadata>, ExtractError> {
        tracing::debug!("Extracting video info for: {}", url);

        let output = self.run(&metadata_args(url, options)).await?;
        parse_metadata(&output.stdout)
    }

    async fn download(
        &self,
        url: &str,
        job: &DownloadJob,
        options: &DownloadOptions,
    ) -> Result<PathBuf, ExtractError> {
        tracing::debug!(job_id = %job.id(), format = %job.format(), "Downloading {}", url);

        let output = self.run(&download_args(url, job, options)).await?;

        // yt-dlp prints the final path after post-processing; that path is
        // authoritative. Only fall back to the computed one if nothing was printed.
        let path = match extract_printed_path(&output.stdout) {
            Some(printed) => PathBuf::from(printed),
            None => job.expected_path(),
        };

        if !job.owns(&path) {
            return Err(ExtractError::Parse(format!(
                "yt-dlp reported an output outside of the job directory: {}",
                path.display()
            )));
        }

        Ok(path)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

impl Default for YtDlpExtractor {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

/// Arguments for a metadata-only run
pub fn metadata_args(url: &str, options: &DownloadOptions) -> Vec<String> {
    let mut args: Vec<String> = ["--dump-json", "--no-playlist", "--skip-download", "--no-warnings"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    if let Some(timeout) = options.socket_timeout_secs {
        args.push("--socket-timeout".to_string());
        args.push(timeout.to_string());
    }

    args.push("--".to_string());
    args.push(url.to_string());
    args
}

/// Arguments for downloading `url` into `job`
pub fn download_args(url: &str, job: &DownloadJob, options: &DownloadOptions) -> Vec<String> {
    let mut args = vec![
        "--no-playlist".to_string(),
        "--no-warnings".to_string(),
        "--no-progress".to_string(),
        "--print".to_string(),
        "after_move:filepath".to_string(),
        "--output".to_string(),
        job.output_template().to_string_lossy().into_owned(),
    ];

    match job.format() {
        MediaFormat::Audio => {
            args.extend([
                "--format".to_string(),
                options.audio_format.clone(),
                // Transcoded by ffmpeg after download
                "--extract-audio".to_string(),
                "--audio-format".to_string(),
                MediaFormat::Audio.extension().to_string(),
                "--audio-quality".to_string(),
                options.audio_quality.clone(),
            ]);
        }
        MediaFormat::Video => {
            args.extend([
                "--format".to_string(),
                options.video_format.clone(),
                "--merge-output-format".to_string(),
                MediaFormat::Video.extension().to_string(),
                // Single-stream fallbacks are not merged; rewrap them too
                "--remux-video".to_string(),
                MediaFormat::Video.extension().to_string(),
            ]);
        }
    }

    if let Some(location) = &options.ffmpeg_location {
        args.push("--ffmpeg-location".to_string());
        args.push(location.to_string_lossy().into_owned());
    }

    if let Some(timeout) = options.socket_timeout_secs {
        args.push("--socket-timeout".to_string());
        args.push(timeout.to_string());
    }

    args.push("--".to_string());
    args.push(url.to_string());
    args
}

/// Parse `--dump-json` output. Empty output or `null` yields `None`.
pub fn parse_metadata(stdout: &[u8]) -> Result<Option<VideoMetadata>, ExtractError> {
    let text = String::from_utf8_lossy(stdout);
    let Some(line) = text.lines().map(str::trim).find(|line| !line.is_empty()) else {
        return Ok(None);
    };

    let info: Value =
        serde_json::from_str(line).map_err(|e| ExtractError::Parse(e.to_string()))?;

    if !info.is_object() {
        return Ok(None);
    }

    // Sites report arbitrary numbers; anything chrono cannot hold is dropped.
    let duration = info["duration"]
        .as_f64()
        .filter(|d| d.is_finite())
        .and_then(|d| Duration::try_seconds(d as i64));
    let mut metadata: VideoMetadata =
        serde_json::from_value(info).map_err(|e| ExtractError::Parse(e.to_string()))?;
    metadata.duration = duration;

    Ok(Some(metadata))
}

/// Last non-empty stdout line, which is what `--print after_move:filepath` emits
fn extract_printed_path(stdout: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .map(ToString::to_string)
}

/// Message to surface for a failed run: the `ERROR:` lines if any, otherwise
/// the last line on stderr.
fn error_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR:"))
        .collect();

    if !errors.is_empty() {
        return errors.join("\n");
    }

    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .map(ToString::to_string)
        .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status))
}
