//! Configuration types for talking to the analysis backend.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. The endpoint candidates, the transport ladder and
//! the base URL are injected here rather than baked into the upload routine,
//! so a deployment can describe its own backend contract without code changes.

use crate::error::UploadError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base URL used in development: a same-origin prefix reverse-proxied to the backend.
pub const DEV_PROXY_BASE_URL: &str = "http://localhost:5173/api";

/// Endpoint candidates tried, in order, when none are configured.
pub const DEFAULT_ENDPOINTS: &[&str] = &[
    "/summarize",
    "/upload",
    "/api/upload",
    "/api/summarize",
    "/process",
    "/analyze",
];

/// Routes probed by [`crate::upload::Uploader::discover_endpoints`].
pub const DEFAULT_PROBE_ENDPOINTS: &[&str] = &[
    "/health",
    "/status",
    "/api/health",
    "/api/status",
    "/upload",
    "/summarize",
    "/api/upload",
    "/api/summarize",
    "/process",
    "/analyze",
];

/// Configuration for an [`crate::upload::Uploader`].
///
/// # Example
/// ```rust
/// use pdfmind::{ClientConfig, DeploymentMode};
///
/// let config = ClientConfig::builder()
///     .mode(DeploymentMode::Production)
///     .base_url("https://analysis.example.org")
///     .endpoints(["/v2/summarize", "/summarize"])
///     .build()
///     .unwrap();
/// assert_eq!(config.url_for("/summarize"), "https://analysis.example.org/summarize");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Backend origin (production) or proxy prefix (development).
    pub base_url: String,

    /// Deployment mode; only decides the default base URL.
    pub mode: DeploymentMode,

    /// Ordered endpoint candidates. Default: [`DEFAULT_ENDPOINTS`].
    pub endpoints: Vec<String>,

    /// Transport ladder applied to every endpoint. Default: multipart, then plain.
    ///
    /// A 404 from any rung skips the rest of the ladder for that endpoint.
    pub transports: Vec<TransportKind>,

    /// Route for [`crate::upload::Uploader::probe_health`]. Default: `/health`.
    pub health_endpoint: String,

    /// Routes for [`crate::upload::Uploader::discover_endpoints`].
    pub probe_endpoints: Vec<String>,

    /// Per-attempt timeout in seconds. Default: None (wait indefinitely).
    pub request_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional attempt-level progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEV_PROXY_BASE_URL.to_string(),
            mode: DeploymentMode::default(),
            endpoints: DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            transports: vec![TransportKind::Multipart, TransportKind::Plain],
            health_endpoint: "/health".to_string(),
            probe_endpoints: DEFAULT_PROBE_ENDPOINTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            request_timeout_secs: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("mode", &self.mode)
            .field("endpoints", &self.endpoints)
            .field("transports", &self.transports)
            .field("health_endpoint", &self.health_endpoint)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn UploadProgressCallback>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
            base_url_set: false,
        }
    }

    /// Join the base URL and an endpoint path.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Candidate endpoints for one upload: `explicit` first, then the
    /// configured list, without duplicates.
    pub fn candidate_endpoints(&self, explicit: Option<&str>) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.endpoints.len() + 1);
        for ep in explicit.into_iter().chain(self.endpoints.iter().map(String::as_str)) {
            let ep = normalise_endpoint(ep);
            if !out.contains(&ep) {
                out.push(ep);
            }
        }
        out
    }
}

/// Builder for [`ClientConfig`].
pub struct ClientConfigBuilder {
    config: ClientConfig,
    base_url_set: bool,
}

impl fmt::Debug for ClientConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self.base_url_set = true;
        self
    }

    pub fn mode(mut self, mode: DeploymentMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Replace the endpoint candidates.
    pub fn endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Put `endpoint` in front of the existing candidates.
    pub fn primary_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoints.insert(0, endpoint.into());
        self
    }

    pub fn transports(mut self, transports: Vec<TransportKind>) -> Self {
        self.config.transports = transports;
        self
    }

    pub fn health_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.health_endpoint = endpoint.into();
        self
    }

    pub fn probe_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.probe_endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs.max(1));
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ClientConfig, UploadError> {
        if !self.base_url_set && self.config.mode == DeploymentMode::Production {
            return Err(UploadError::InvalidConfig(
                "production mode needs an explicit base URL".into(),
            ));
        }

        let c = &mut self.config;
        let parsed = reqwest::Url::parse(&c.base_url).map_err(|e| {
            UploadError::InvalidConfig(format!("base URL '{}' is invalid: {e}", c.base_url))
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(UploadError::InvalidConfig(format!(
                "base URL must be http or https, got '{}'",
                parsed.scheme()
            )));
        }

        c.endpoints = c.candidate_endpoints(None);
        if c.endpoints.is_empty() {
            return Err(UploadError::InvalidConfig(
                "at least one endpoint candidate is required".into(),
            ));
        }
        if c.transports.is_empty() {
            return Err(UploadError::InvalidConfig(
                "at least one transport is required".into(),
            ));
        }
        c.health_endpoint = normalise_endpoint(&c.health_endpoint);
        Ok(self.config)
    }
}

fn normalise_endpoint(ep: &str) -> String {
    let ep = ep.trim();
    if ep.starts_with('/') {
        ep.to_string()
    } else {
        format!("/{ep}")
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Where the client runs; decides the default base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeploymentMode {
    /// Requests go through the local dev proxy ([`DEV_PROXY_BASE_URL`]). (default)
    #[default]
    Development,
    /// Requests go straight to the backend origin; base URL is mandatory.
    Production,
}

/// One rung of the per-endpoint transport ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    /// Pooled client with `Accept: */*`; the primary path.
    Multipart,
    /// Fresh HTTP/1.1 connection with no pooling and no default headers.
    /// Catches failures tied to a stale pooled connection or a proxy that
    /// mishandles the primary client's headers.
    Plain,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Multipart => f.write_str("multipart"),
            TransportKind::Plain => f.write_str("plain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ClientConfig::builder().build().unwrap();
        assert_eq!(c.base_url, DEV_PROXY_BASE_URL);
        assert_eq!(c.endpoints[0], "/summarize");
        assert_eq!(c.endpoints.len(), DEFAULT_ENDPOINTS.len());
        assert_eq!(
            c.transports,
            vec![TransportKind::Multipart, TransportKind::Plain]
        );
        assert_eq!(c.request_timeout_secs, None);
    }

    #[test]
    fn production_requires_base_url() {
        let err = ClientConfig::builder()
            .mode(DeploymentMode::Production)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("explicit base URL"));
    }

    #[test]
    fn rejects_bad_scheme_and_empty_lists() {
        assert!(ClientConfig::builder().base_url("ftp://x").build().is_err());
        assert!(ClientConfig::builder().base_url("not a url").build().is_err());
        assert!(ClientConfig::builder()
            .endpoints(Vec::<String>::new())
            .build()
            .is_err());
        assert!(ClientConfig::builder().transports(vec![]).build().is_err());
    }

    #[test]
    fn candidate_endpoints_dedup_and_normalise() {
        let c = ClientConfig::builder()
            .endpoints(["summarize", "/upload", "/summarize"])
            .build()
            .unwrap();
        assert_eq!(c.endpoints, vec!["/summarize", "/upload"]);
        assert_eq!(
            c.candidate_endpoints(Some("/upload")),
            vec!["/upload", "/summarize"]
        );
        assert_eq!(
            c.candidate_endpoints(Some("/custom")),
            vec!["/custom", "/summarize", "/upload"]
        );
    }

    #[test]
    fn url_for_joins_slashes() {
        let c = ClientConfig::builder()
            .base_url("https://api.example.org/")
            .build()
            .unwrap();
        assert_eq!(c.url_for("/summarize"), "https://api.example.org/summarize");
        assert_eq!(c.url_for("upload"), "https://api.example.org/upload");
    }
}
