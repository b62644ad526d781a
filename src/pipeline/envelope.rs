//! Wrap an interpreted [`Shape`] into the canonical [`UploadResult`].

use super::shape::{Payload, Shape};
use crate::output::{DocumentAnalysis, UploadResult};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

pub const MSG_WITH_HEADINGS: &str = "Document processed successfully";
pub const MSG_WITHOUT_HEADINGS: &str = "File uploaded and processed successfully";
pub const MSG_ENVELOPE_DEFAULT: &str = "File processed";
pub const MSG_RECOVERED: &str = "Document recovered from a truncated response; some content may be missing";
pub const MSG_UNRECOGNIZED: &str = "The backend answered but the response format was not recognized";

/// Build the result for one 2xx answer.
pub fn wrap(shape: Shape, filename: &str, endpoint: &str) -> UploadResult {
    let kind = shape.kind();
    let mut result = UploadResult {
        success: false,
        message: String::new(),
        data: None,
        filename: filename.to_string(),
        processing_time: now_millis(),
        degraded: false,
        shape: kind,
        endpoint: endpoint.to_string(),
        raw: None,
    };

    match shape {
        Shape::EnvelopeWithData(env) => {
            let message = env
                .message
                .unwrap_or_else(|| MSG_ENVELOPE_DEFAULT.to_string());
            if !env.success {
                result.message = message;
                result.raw = Some(env.raw_data);
                return result;
            }
            let (payload, degraded) = env.inner.into_payload();
            match payload {
                Payload::Document(doc) => {
                    result.success = true;
                    result.message = if degraded {
                        MSG_RECOVERED.to_string()
                    } else {
                        message
                    };
                    result.degraded = degraded;
                    result.data = Some(doc);
                }
                Payload::Raw(_) => unrecognized(&mut result, env.raw_data),
            }
        }
        other => {
            let (payload, degraded) = other.into_payload();
            match payload {
                Payload::Document(doc) => {
                    result.success = true;
                    result.message = success_message(&doc, degraded).to_string();
                    result.degraded = degraded;
                    result.data = Some(doc);
                }
                Payload::Raw(v) => unrecognized(&mut result, v),
            }
        }
    }
    result
}

fn success_message(doc: &DocumentAnalysis, degraded: bool) -> &'static str {
    if degraded {
        MSG_RECOVERED
    } else if doc.headings.is_empty() {
        MSG_WITHOUT_HEADINGS
    } else {
        MSG_WITH_HEADINGS
    }
}

fn unrecognized(result: &mut UploadResult, raw: Value) {
    result.success = false;
    result.message = MSG_UNRECOGNIZED.to_string();
    result.raw = Some(raw);
}

/// Milliseconds since the Unix epoch; 0 if the clock is before it.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
