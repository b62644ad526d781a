//! Upload entry points: walk the endpoint × transport ladder, then normalise.
//!
//! [`Uploader`] owns the configuration and one client per transport kind.
//! Attempts are strictly sequential; the first 2xx answer ends the walk and
//! its body is interpreted by [`crate::pipeline::shape`]. Only exhaustion of
//! every attempt surfaces as `Err`.

use crate::config::ClientConfig;
use crate::error::{AttemptError, UploadError};
use crate::output::UploadResult;
use crate::pipeline::input::{self, UploadFile};
use crate::pipeline::transport::{HttpTransport, Transport};
use crate::pipeline::{envelope, shape};
use crate::progress::{NoopProgressCallback, UploadProgressCallback};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Sends files to the analysis backend.
pub struct Uploader {
    config: ClientConfig,
    transports: Vec<Arc<dyn Transport>>,
    probe: HttpTransport,
}

impl std::fmt::Debug for Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("config", &self.config)
            .field(
                "transports",
                &self.transports.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Uploader {
    /// One HTTP client per configured [`crate::config::TransportKind`].
    pub fn new(config: ClientConfig) -> Result<Self, UploadError> {
        let timeout = request_timeout(&config);
        let transports = config
            .transports
            .iter()
            .map(|kind| HttpTransport::new(*kind, timeout).map(|t| Arc::new(t) as Arc<dyn Transport>))
            .collect::<Result<Vec<_>, _>>()?;
        Self::with_transports(config, transports)
    }

    /// Use caller-supplied transports instead of the configured kinds.
    pub fn with_transports(
        config: ClientConfig,
        transports: Vec<Arc<dyn Transport>>,
    ) -> Result<Self, UploadError> {
        if transports.is_empty() {
            return Err(UploadError::InvalidConfig(
                "at least one transport is required".into(),
            ));
        }
        let probe = HttpTransport::new(
            crate::config::TransportKind::Multipart,
            request_timeout(&config),
        )?;
        Ok(Self {
            config,
            transports,
            probe,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Upload to the configured endpoint candidates.
    pub async fn upload(&self, file: &UploadFile) -> Result<UploadResult, UploadError> {
        self.upload_to(file, None).await
    }

    /// Upload with `endpoint` tried before the configured candidates.
    ///
    /// For each candidate every transport is tried in order. A 404 moves
    /// straight to the next candidate; any other failure moves to the next
    /// transport first. The last attempt error becomes the returned error.
    pub async fn upload_to(
        &self,
        file: &UploadFile,
        endpoint: Option<&str>,
    ) -> Result<UploadResult, UploadError> {
        let start = Instant::now();
        let noop = NoopProgressCallback;
        let cb: &dyn UploadProgressCallback = match self.config.progress_callback {
            Some(ref cb) => cb.as_ref(),
            None => &noop,
        };

        let candidates = self.config.candidate_endpoints(endpoint);
        info!(
            "Uploading '{}' ({} bytes), {} candidate endpoints",
            file.filename,
            file.bytes.len(),
            candidates.len()
        );
        cb.on_upload_start(&file.filename, candidates.len());

        let mut attempt = 0usize;
        let mut last_error: Option<AttemptError> = None;

        'endpoints: for ep in &candidates {
            let url = self.config.url_for(ep);
            for transport in &self.transports {
                attempt += 1;
                cb.on_attempt_start(ep, transport.name(), attempt);
                debug!("Attempt {}: {} via {}", attempt, url, transport.name());

                match transport.send(&url, ep, file).await {
                    Ok(reply) => {
                        let result =
                            envelope::wrap(shape::classify(&reply.body), &file.filename, ep);
                        info!(
                            "{} answered HTTP {} ({:?}, success={}) after {} attempts in {}ms",
                            ep,
                            reply.status,
                            result.shape,
                            result.success,
                            attempt,
                            start.elapsed().as_millis()
                        );
                        cb.on_upload_complete(ep, result.success);
                        return Ok(result);
                    }
                    Err(e) => {
                        warn!("Attempt {} failed: {} via {}", attempt, e, transport.name());
                        cb.on_attempt_failed(ep, transport.name(), &e.to_string());
                        let not_found = e.is_not_found();
                        last_error = Some(e);
                        if not_found {
                            continue 'endpoints;
                        }
                    }
                }
            }
        }

        let err = match last_error {
            Some(e) => UploadError::from(e),
            None => UploadError::NoAttempts(format!(
                "{} endpoints × {} transports",
                candidates.len(),
                self.transports.len()
            )),
        };
        warn!("Upload of '{}' failed: {}", file.filename, err);
        cb.on_upload_failed(&err.to_string());
        Err(err)
    }

    /// GET the health endpoint; `true` on 2xx.
    pub async fn probe_health(&self) -> bool {
        let ep = &self.config.health_endpoint;
        let url = self.config.url_for(ep);
        match self.probe.get(&url, ep).await {
            Ok(reply) => {
                info!("Health check {}: HTTP {} {}", url, reply.status, reply.body);
                reply.is_success()
            }
            Err(e) => {
                warn!("Health check {} failed: {}", url, e);
                false
            }
        }
    }

    /// GET every probe endpoint in turn; returns the ones answering 200.
    pub async fn discover_endpoints(&self) -> Vec<String> {
        let mut found = Vec::new();
        for ep in &self.config.probe_endpoints {
            let url = self.config.url_for(ep);
            match self.probe.get(&url, ep).await {
                Ok(reply) if reply.status == 200 => {
                    debug!("{} is available", ep);
                    found.push(ep.clone());
                }
                Ok(reply) => debug!("{} answered HTTP {}", ep, reply.status),
                Err(e) => debug!("{} unreachable: {}", ep, e),
            }
        }
        info!(
            "Discovered {}/{} endpoints",
            found.len(),
            self.config.probe_endpoints.len()
        );
        found
    }
}

fn request_timeout(config: &ClientConfig) -> Option<Duration> {
    config.request_timeout_secs.map(Duration::from_secs)
}

/// Resolve a file path or URL and upload it.
///
/// # Errors
/// Input errors (not found, download failure) and exhaustion of every
/// attempt. An answer whose body could not be interpreted is still `Ok`,
/// with `success: false` and the body in `raw`.
pub async fn upload(
    input_str: impl AsRef<str>,
    config: &ClientConfig,
) -> Result<UploadResult, UploadError> {
    let file = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    Uploader::new(config.clone())?.upload(&file).await
}

/// Upload an in-memory file.
pub async fn upload_bytes(
    filename: impl Into<String>,
    bytes: impl Into<Vec<u8>>,
    config: &ClientConfig,
) -> Result<UploadResult, UploadError> {
    let file = UploadFile::new(filename, bytes);
    Uploader::new(config.clone())?.upload(&file).await
}

/// Upload and write the result as pretty JSON to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn upload_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ClientConfig,
) -> Result<UploadResult, UploadError> {
    let result = upload(input_str, config).await?;
    write_json_atomic(output_path.as_ref(), &result).await?;
    Ok(result)
}

/// Synchronous wrapper around [`upload`].
///
/// Creates a temporary tokio runtime internally.
pub fn upload_sync(
    input_str: impl AsRef<str>,
    config: &ClientConfig,
) -> Result<UploadResult, UploadError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| UploadError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(upload(input_str, config))
}

pub(crate) async fn write_json_atomic(
    path: &Path,
    result: &UploadResult,
) -> Result<(), UploadError> {
    let write_failed = |e: std::io::Error| UploadError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let json = serde_json::to_string_pretty(result)
        .map_err(|e| UploadError::Internal(format!("Failed to serialise result: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_failed)?;
    Ok(())
}
