//! Input resolution: turn a user-supplied path or URL into an [`UploadFile`].
//!
//! The upload itself performs no content validation; the `%PDF` magic check
//! lives in [`UploadFile::ensure_pdf`] and is applied by the CLI, which plays
//! the part of a file picker filtered to PDFs.

use crate::error::UploadError;
use std::path::PathBuf;
use tracing::{debug, info};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF";

/// A file ready to be sent as the `file` part of the multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl UploadFile {
    /// An upload part with the PDF content type.
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
            content_type: PDF_CONTENT_TYPE.to_string(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn looks_like_pdf(&self) -> bool {
        self.bytes.starts_with(PDF_MAGIC)
    }

    /// Reject files that do not start with `%PDF`.
    pub fn ensure_pdf(&self) -> Result<(), UploadError> {
        if self.looks_like_pdf() {
            return Ok(());
        }
        Err(UploadError::NotAPdf {
            name: self.filename.clone(),
            magic: self.bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
        })
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an [`UploadFile`].
///
/// URLs are downloaded (bounded by `timeout_secs`); anything else is read
/// from the local file system.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<UploadFile, UploadError> {
    if input.trim().is_empty() {
        return Err(UploadError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<UploadFile, UploadError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(UploadError::PermissionDenied { path });
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(UploadError::FileNotFound { path });
        }
        Err(e) => {
            return Err(UploadError::Internal(format!(
                "Failed to read '{}': {}",
                path.display(),
                e
            )));
        }
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(UploadFile::new(filename, bytes))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadFile, UploadError> {
    info!("Downloading PDF from: {}", url);

    let download_failed = |reason: String| UploadError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| download_failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            UploadError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(download_failed(format!("HTTP {}", response.status())));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|ct| ct.starts_with("application/pdf"))
        .unwrap_or(PDF_CONTENT_TYPE)
        .to_string();

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            UploadError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_failed(e.to_string())
        }
    })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(UploadFile::new(filename_from_url(url), bytes.to_vec()).with_content_type(content_type))
}

/// Last URL path segment when it looks like a file name, else `downloaded.pdf`.
pub fn filename_from_url(url: &str) -> String {
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
