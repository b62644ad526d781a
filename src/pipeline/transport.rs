//! HTTP transports: one request builder, several client configurations.
//!
//! Every attempt sends the same multipart form (`file` + `filename`). What
//! differs between rungs of the ladder is the client it goes through:
//!
//! | Kind        | Client                                                 |
//! |-------------|--------------------------------------------------------|
//! | `Multipart` | pooled, `Accept: */*`                                  |
//! | `Plain`     | HTTP/1.1 only, no idle pooling, no default headers     |
//!
//! [`Transport`] is the seam the uploader is written against; tests inject
//! scripted implementations.

use super::input::UploadFile;
pub use crate::config::TransportKind;
use crate::error::{AttemptError, UploadError};
use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Network-error code for attempts that ran out of time.
pub const CODE_TIMEOUT: &str = "ECONNABORTED";
/// Network-error code for every other connection-level failure.
pub const CODE_NETWORK: &str = "ERR_NETWORK";

/// Status and decoded body of an HTTP answer.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    /// JSON body; non-JSON text becomes a string value, an empty body `null`.
    pub body: Value,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one upload attempt.
pub trait Transport: Send + Sync {
    /// Short name used in logs and progress events.
    fn name(&self) -> &str;

    /// POST `file` to `url`. A non-2xx answer is an [`AttemptError::Status`].
    fn send<'a>(
        &'a self,
        url: &'a str,
        endpoint: &'a str,
        file: &'a UploadFile,
    ) -> BoxFuture<'a, Result<HttpReply, AttemptError>>;
}

/// A [`Transport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    kind: TransportKind,
    name: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(kind: TransportKind, timeout: Option<Duration>) -> Result<Self, UploadError> {
        let mut builder = reqwest::Client::builder();
        builder = match kind {
            TransportKind::Multipart => {
                let mut headers = HeaderMap::new();
                headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
                builder.default_headers(headers)
            }
            TransportKind::Plain => builder.http1_only().pool_max_idle_per_host(0),
        };
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| UploadError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            kind,
            name: kind.to_string(),
            client,
        })
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// GET `url`; used for health probes. Any HTTP answer is `Ok`.
    pub async fn get(&self, url: &str, endpoint: &str) -> Result<HttpReply, AttemptError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(endpoint, &e))?;
        read_reply(response, endpoint).await
    }

    async fn post_form(
        &self,
        url: &str,
        endpoint: &str,
        file: &UploadFile,
    ) -> Result<HttpReply, AttemptError> {
        let form = build_form(file).map_err(|e| AttemptError::Network {
            endpoint: endpoint.to_string(),
            message: format!("could not build multipart form: {e}"),
            code: None,
        })?;

        debug!(
            "POST {} via {} ({} bytes)",
            url,
            self.name,
            file.bytes.len()
        );
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| network_error(endpoint, &e))?;

        let reply = read_reply(response, endpoint).await?;
        if reply.is_success() {
            Ok(reply)
        } else {
            Err(AttemptError::Status {
                endpoint: endpoint.to_string(),
                status: reply.status,
                status_text: status_text(reply.status),
                body: Some(reply.body).filter(|b| !b.is_null()),
            })
        }
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn send<'a>(
        &'a self,
        url: &'a str,
        endpoint: &'a str,
        file: &'a UploadFile,
    ) -> BoxFuture<'a, Result<HttpReply, AttemptError>> {
        Box::pin(self.post_form(url, endpoint, file))
    }
}

/// The multipart body shared by every transport.
pub fn build_form(file: &UploadFile) -> Result<Form, reqwest::Error> {
    let part = Part::bytes(file.bytes.clone())
        .file_name(file.filename.clone())
        .mime_str(&file.content_type)?;
    Ok(Form::new()
        .part("file", part)
        .text("filename", file.filename.clone()))
}

async fn read_reply(response: reqwest::Response, endpoint: &str) -> Result<HttpReply, AttemptError> {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| network_error(endpoint, &e))?;
    Ok(HttpReply {
        status,
        body: decode_body(&text),
    })
}

/// Parse a response body; non-JSON text is kept as a string.
pub fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Canonical reason phrase, or an empty string for unknown codes.
pub fn status_text(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default()
        .to_string()
}

fn network_error(endpoint: &str, e: &reqwest::Error) -> AttemptError {
    let code = if e.is_timeout() {
        CODE_TIMEOUT
    } else {
        CODE_NETWORK
    };
    AttemptError::Network {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
        code: Some(code.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_decoding() {
        assert_eq!(decode_body(""), Value::Null);
        assert_eq!(decode_body("  \n"), Value::Null);
        assert_eq!(decode_body(r#"{"a": 1}"#), json!({"a": 1}));
        assert_eq!(
            decode_body("<h1>Bad Gateway</h1>"),
            Value::String("<h1>Bad Gateway</h1>".into())
        );
    }

    #[test]
    fn reason_phrases() {
        assert_eq!(status_text(404), "Not Found");
        assert_eq!(status_text(500), "Internal Server Error");
        assert_eq!(status_text(599), "");
    }

    #[test]
    fn transports_build_with_and_without_timeout() {
        let t = HttpTransport::new(TransportKind::Multipart, None).unwrap();
        assert_eq!(t.name(), "multipart");
        let t = HttpTransport::new(TransportKind::Plain, Some(Duration::from_secs(3))).unwrap();
        assert_eq!(t.name(), "plain");
        assert_eq!(t.kind(), TransportKind::Plain);
    }

    #[test]
    fn form_builds_for_pdf_and_rejects_bad_mime() {
        let file = UploadFile::new("a.pdf", b"%PDF".to_vec());
        assert!(build_form(&file).is_ok());
        let bad = file.with_content_type("not a mime type");
        assert!(build_form(&bad).is_err());
    }
}
