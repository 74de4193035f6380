//! Input resolution: turn a user-supplied path or URL into an [`UploadedFile`].
//!
//! The ingestion pipeline works on in-memory uploads (a filename plus bytes),
//! so local files are read and URLs are downloaded whole. No PDF checks
//! happen here; rejection reasons are produced by ingestion so that a bad
//! file becomes a per-file error instead of aborting the batch.

use crate::error::InsightsError;
use crate::report::file_safe_id;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An uploaded document: the client-supplied filename and its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: Some(filename.into()),
            bytes: bytes.into(),
        }
    }

    /// The filename, if one was supplied and is not blank.
    pub fn name(&self) -> Option<&str> {
        self.filename.as_deref().filter(|n| !n.trim().is_empty())
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a local file or download a URL.
///
/// Downloads larger than `max_bytes` are abandoned as soon as the size is
/// known (from `Content-Length`, or while reading the body). Local files are
/// read whole; ingestion applies the size limit to them.
pub async fn load_upload(
    input: &str,
    timeout_secs: u64,
    max_bytes: u64,
) -> Result<UploadedFile, InsightsError> {
    if is_url(input) {
        download_url(input, timeout_secs, max_bytes).await
    } else {
        read_local(Path::new(input)).await
    }
}

async fn read_local(path: &Path) -> Result<UploadedFile, InsightsError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => InsightsError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => InsightsError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => InsightsError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(UploadedFile {
        filename: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
        bytes,
    })
}

async fn download_url(
    url: &str,
    timeout_secs: u64,
    max_bytes: u64,
) -> Result<UploadedFile, InsightsError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| InsightsError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| request_error(url, timeout_secs, e))?;

    if !response.status().is_success() {
        return Err(InsightsError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let too_large = || InsightsError::DownloadTooLarge {
        url: url.to_string(),
        max_bytes,
    };
    if response.content_length().is_some_and(|len| len > max_bytes) {
        return Err(too_large());
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| request_error(url, timeout_secs, e))?
    {
        if (bytes.len() + chunk.len()) as u64 > max_bytes {
            return Err(too_large());
        }
        bytes.extend_from_slice(&chunk);
    }

    info!("Downloaded {} bytes", bytes.len());
    Ok(UploadedFile {
        filename: Some(filename_from_url(url)),
        bytes,
    })
}

fn request_error(url: &str, timeout_secs: u64, e: reqwest::Error) -> InsightsError {
    if e.is_timeout() {
        InsightsError::DownloadTimeout {
            url: url.to_string(),
            secs: timeout_secs,
        }
    } else {
        InsightsError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Last path segment of the URL when it looks like a filename.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

/// Output path for a report JSON file: `<dir>/<id>.json`, with the id in
/// its [`file_safe_id`] form so the file stays inside `dir`.
pub fn report_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{}.json", file_safe_id(id)))
}
