//! Error types for the pdfmind library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`UploadError`] is **fatal**. The upload cannot produce a result at all
//!   (every candidate endpoint failed, bad input file, invalid config).
//!   Returned as `Err(UploadError)` from the top-level `upload*` functions.
//!
//! * [`AttemptError`] is **non-fatal**. One (endpoint, transport) attempt
//!   failed. The uploader moves on to the next attempt; only the last one is
//!   kept and becomes the detail of the fatal error when everything fails.
//!
//! * [`RecoveryError`] means a truncated or malformed JSON payload could not be
//!   salvaged by any recovery strategy. Never surfaced to `upload()` callers:
//!   the normaliser falls back to title scraping or raw pass-through.
//!
//! [`UploadError::to_envelope`] turns a fatal error into the serialisable
//! `{success: false, message, error, details}` envelope the view layer shows.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfmind library.
#[derive(Debug, Error)]
pub enum UploadError {
    // ── Transport errors ─────────────────────────────────────────────────
    /// No candidate endpoint could be reached at the network level.
    #[error("Network error while contacting '{endpoint}': {message}\nCheck the base URL and your connection.")]
    NetworkFailure {
        endpoint: String,
        message: String,
        code: Option<String>,
        /// Connection-level failure (refused, DNS, TLS, timeout) as opposed to
        /// an application-level answer. Mirrors the browser's "CORS or network" class.
        is_network_error: bool,
    },

    /// The last candidate endpoint answered with a non-2xx status.
    #[error("Backend returned HTTP {status} {status_text} for '{endpoint}'")]
    UpstreamFailure {
        endpoint: String,
        status: u16,
        status_text: String,
        body: Option<serde_json::Value>,
    },

    /// The configuration produced no (endpoint, transport) attempts.
    #[error("No upload attempts were made: {0}")]
    NoAttempts(String),

    // ── Input errors ─────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file was read but does not start with the `%PDF` magic.
    #[error("File is not a PDF: '{name}'\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── I/O errors ───────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl UploadError {
    /// `true` for connection-level failures (refused, DNS, TLS, timeout).
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            UploadError::NetworkFailure {
                is_network_error: true,
                ..
            }
        )
    }

    /// HTTP status of the last failed attempt, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::UpstreamFailure { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build the structured failure envelope shown to the user.
    pub fn to_envelope(&self) -> FailureEnvelope {
        let mut details = FailureDetails::default();
        let error = match self {
            UploadError::NetworkFailure {
                endpoint, code, ..
            } => {
                details.endpoint = Some(endpoint.clone());
                details.code = code.clone();
                "Network error".to_string()
            }
            UploadError::UpstreamFailure {
                endpoint,
                status,
                status_text,
                body,
            } => {
                details.endpoint = Some(endpoint.clone());
                details.status = Some(*status);
                details.status_text = Some(status_text.clone());
                details.data = body.clone();
                body.as_ref()
                    .and_then(|b| b.get("error"))
                    .and_then(|e| e.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {status}"))
            }
            other => other.to_string(),
        };

        // Prefer the backend's own message when it sent one.
        let message = match self {
            UploadError::UpstreamFailure { body: Some(b), .. } => b
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| self.to_string()),
            _ => self.to_string(),
        };

        FailureEnvelope {
            success: false,
            message,
            error,
            is_network_error: self.is_network_error(),
            details,
        }
    }
}

/// A non-fatal failure of a single (endpoint, transport) attempt.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
pub enum AttemptError {
    /// The request never produced an HTTP response.
    #[error("{endpoint}: network error: {message}")]
    Network {
        endpoint: String,
        message: String,
        code: Option<String>,
    },

    /// The backend answered with a non-2xx status.
    #[error("{endpoint}: HTTP {status} {status_text}")]
    Status {
        endpoint: String,
        status: u16,
        status_text: String,
        body: Option<serde_json::Value>,
    },
}

impl AttemptError {
    /// A 404 means "wrong route": skip the remaining transports for this endpoint.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AttemptError::Status { status: 404, .. })
    }

}

impl From<AttemptError> for UploadError {
    fn from(e: AttemptError) -> Self {
        match e {
            AttemptError::Network {
                endpoint,
                message,
                code,
            } => UploadError::NetworkFailure {
                endpoint,
                message,
                code,
                is_network_error: true,
            },
            AttemptError::Status {
                endpoint,
                status,
                status_text,
                body,
            } => UploadError::UpstreamFailure {
                endpoint,
                status,
                status_text,
                body,
            },
        }
    }
}

/// Why a malformed JSON payload could not be salvaged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecoveryError {
    /// Nothing left after stripping fences and placeholder markers.
    #[error("payload is empty after trimming")]
    Empty,

    /// The text does not open with `{` or `[`.
    #[error("payload does not start with a JSON object or array")]
    NotStructured,

    /// The brackets close in the wrong order (`{]`), so no closer suffix can fix it.
    #[error("mismatched closer '{found}' at byte {offset}")]
    Mismatched { found: char, offset: usize },

    /// Every candidate repair still failed to parse.
    #[error("no repair parsed after {attempts} attempts: {last_error}")]
    Unrepairable { attempts: usize, last_error: String },
}

/// The serialisable failure envelope returned to the view layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureEnvelope {
    pub success: bool,
    pub message: String,
    pub error: String,
    pub is_network_error: bool,
    pub details: FailureDetails,
}

/// Last observed error detail attached to a [`FailureEnvelope`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FailureDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
