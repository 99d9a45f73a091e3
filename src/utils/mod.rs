use std::path::Path;
use url::Url;

use crate::extractors::MediaFormat;

/// Title used when the extractor reports none, or nothing survives sanitizing
pub const FALLBACK_TITLE: &str = "video";

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Reduce an untrusted title to alphanumerics, spaces, hyphens and
/// underscores, with trailing whitespace removed.
pub fn safe_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Name offered to the browser for a finished download
pub fn download_filename(title: Option<&str>, format: MediaFormat) -> String {
    let base = safe_title(title.unwrap_or(FALLBACK_TITLE));
    let base = if base.trim().is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        base
    };

    format!("{}.{}", base, format.extension())
}

/// `Content-Disposition` value for an attachment.
///
/// `filename` is restricted to printable ASCII; `filename*` carries the full
/// UTF-8 name percent-encoded.
pub fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .filter(|c| *c != '"' && *c != '\\')
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(filename)
    )
}

/// Extract domain from URL for display purposes
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(|host| {
        // Remove 'www.' prefix if present
        host.strip_prefix("www.").unwrap_or(host).to_string()
    })
}

/// Check if the current environment has required tools
pub async fn check_dependencies(yt_dlp: &Path, ffmpeg_location: Option<&Path>) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp, "--version").await {
        missing.push(format!(
            "yt-dlp ({}) - required for every download",
            yt_dlp.display()
        ));
    }

    let ffmpeg = match ffmpeg_location {
        Some(dir) if dir.is_dir() => dir.join("ffmpeg"),
        Some(path) => path.to_path_buf(),
        None => Path::new("ffmpeg").to_path_buf(),
    };
    if !check_command_available(&ffmpeg, "-version").await {
        missing.push(format!(
            "ffmpeg ({}) - required for audio downloads and merging video streams",
            ffmpeg.display()
        ));
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &Path, version_flag: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(version_flag)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1048576), "1.0 MB");
    }

    #[test]
    fn test_safe_title() {
        assert_eq!(safe_title("Foo/Bar: Baz!"), "FooBar Baz");
        assert_eq!(safe_title("my-video_01  "), "my-video_01");
        assert_eq!(safe_title("  leading kept"), "  leading kept");
        assert_eq!(safe_title("Café ünïcode"), "Café ünïcode");
        assert_eq!(safe_title("a\tb\nc"), "abc");
    }

    #[test]
    fn test_safe_title_only_allowed_chars() {
        let titles = [
            "Foo/Bar: Baz!",
            "../../etc/passwd",
            "\"quoted\" <tag> & more;",
            "trailing dots...   ",
            "emoji 🎵 title",
            "",
        ];

        for title in titles {
            let safe = safe_title(title);
            assert!(safe
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_')));
            assert_eq!(safe, safe.trim_end());
        }
    }

    #[test]
    fn test_download_filename() {
        assert_eq!(
            download_filename(Some("Foo/Bar: Baz!"), MediaFormat::Audio),
            "FooBar Baz.mp3"
        );
        assert_eq!(
            download_filename(Some("Foo/Bar: Baz!"), MediaFormat::Video),
            "FooBar Baz.mp4"
        );
        assert_eq!(download_filename(None, MediaFormat::Video), "video.mp4");
        assert_eq!(download_filename(Some("?!/"), MediaFormat::Audio), "video.mp3");
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("FooBar Baz.mp4"),
            "attachment; filename=\"FooBar Baz.mp4\"; filename*=UTF-8''FooBar%20Baz.mp4"
        );

        let value = content_disposition("Café.mp3");
        assert!(value.starts_with("attachment; filename=\"Caf_.mp3\""));
        assert!(value.ends_with("filename*=UTF-8''Caf%C3%A9.mp3"));
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(extract_domain("https://www.youtube.com/watch?v=123"), Some("youtube.com".to_string()));
        assert_eq!(extract_domain("https://youtu.be/123"), Some("youtu.be".to_string()));
        assert_eq!(extract_domain("invalid-url"), None);
    }

    #[tokio::test]
    async fn test_check_dependencies_reports_missing_tools() {
        let missing = check_dependencies(
            Path::new("/nonexistent/yt-dlp"),
            Some(Path::new("/nonexistent/ffmpeg")),
        )
        .await;

        assert_eq!(missing.len(), 2);
        assert!(missing[0].starts_with("yt-dlp"));
        assert!(missing[1].starts_with("ffmpeg"));
    }
}
