//! `POST /download`: look up, download, stream the file back.

use axum::body::Body;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use super::error::{AppError, MISSING_URL, NO_VIDEO_INFO};
use super::AppState;
use crate::extractors::{DownloadJob, MediaFormat};
use crate::utils;

/// Fields posted by the form
#[derive(Debug, Default, Deserialize)]
pub struct DownloadForm {
    /// Media page URL; `youtube_url` is accepted for older clients
    #[serde(default, alias = "youtube_url")]
    pub url: Option<String>,

    /// `video` (default) or `audio`
    #[serde(default)]
    pub format: Option<String>,
}

pub async fn download(
    State(state): State<Arc<AppState>>,
    form: Result<Form<DownloadForm>, FormRejection>,
) -> Result<Response, AppError> {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            // Only urlencoded bodies are read; multipart posts land here too.
            tracing::warn!(error = %rejection, "Unreadable form body, expected application/x-www-form-urlencoded");
            DownloadForm::default()
        }
    };

    let url = form
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AppError::Validation(MISSING_URL.to_string()))?;
    let format = MediaFormat::from_form_value(form.format.as_deref());
    let options = state.options.clone();

    tracing::info!(
        domain = utils::extract_domain(url).as_deref().unwrap_or("unknown"),
        %format,
        extractor = state.extractor.name(),
        "Download requested"
    );

    let metadata = state
        .extractor
        .fetch_metadata(url, &options)
        .await?
        .ok_or_else(|| AppError::Validation(NO_VIDEO_INFO.to_string()))?;

    let job = DownloadJob::new(&state.temp_dir, &state.file_prefix, format);
    tracing::info!(
        job_id = %job.id(),
        media_id = metadata.id.as_deref(),
        title = metadata.title.as_deref().unwrap_or(utils::FALLBACK_TITLE),
        uploader = metadata.uploader.as_deref(),
        webpage_url = metadata.webpage_url.as_deref(),
        duration_secs = metadata.duration.map(|d| d.num_seconds()),
        "Fetching media"
    );

    let path = state.extractor.download(url, &job, &options).await?;

    // From here on the file belongs to this request, whatever happens next.
    // The guard travels with the body and removes the file once it is dropped.
    let guard = (!state.keep_files).then(|| TempFile::new(path.clone()));

    let size = match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => return Err(AppError::FileMissing),
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(AppError::FileMissing),
        Err(e) => return Err(e.into()),
    };
    let file = tokio::fs::File::open(&path).await?;

    let filename = utils::download_filename(metadata.title.as_deref(), format);
    tracing::info!(
        job_id = %job.id(),
        file = %path.display(),
        size = %utils::format_file_size(size),
        "Sending {}",
        filename
    );

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(format.mime_type()));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&utils::content_disposition(&filename))
            .map_err(|e| AppError::Unexpected(e.to_string()))?,
    );

    let stream = ReaderStream::new(file).map(move |chunk| {
        let _ = &guard;
        chunk
    });

    Ok((headers, Body::from_stream(stream)).into_response())
}

/// Deletes the download at `path` (a file, or a directory left by a failed run) when dropped
struct TempFile {
    path: PathBuf,
}

impl TempFile {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let removed = if self.path.is_dir() {
            std::fs::remove_dir_all(self.path())
        } else {
            std::fs::remove_file(self.path())
        };
        match removed {
            Ok(()) => tracing::debug!(file = %self.path.display(), "Removed temporary file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(file = %self.path.display(), error = %e, "Failed to remove temporary file")
            }
        }
    }
}
