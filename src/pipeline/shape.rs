//! Response-shape detection: an ordered chain of typed matchers.
//!
//! The backend does not commit to one response format. Depending on its
//! version and on whether a proxy sits in front of the model, a 2xx body can
//! be any of:
//!
//! ```text
//! DirectDocument     {"headings": [...], "summary": ..., "keywords": [...]}
//! WrappedGenerated   {"candidates": [{"content": {"parts": [{"text": "```json\n{...}\n```"}]}}]}
//! WrappedText        {"text": "```json\n{...}\n```"}
//! EnvelopeWithData   {"success": true, "message": "...", "data": {...}}
//! LooseDocument      {"summary": "...", "keywords": [...]}
//! Unrecognized       anything else
//! ```
//!
//! [`classify`] tries the matchers in that order; the first match wins. Only
//! `WrappedGenerated` runs the truncation-recovery chain from
//! [`super::recovery`].

use super::recovery::{extract_json, Extraction};
use crate::output::{DocumentAnalysis, ResponseShape};
use serde_json::Value;
use tracing::debug;

/// A payload after interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Document(DocumentAnalysis),
    /// Passed through verbatim; the caller has to cope with it.
    Raw(Value),
}

/// A backend-supplied `{success, message, data}` envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub success: bool,
    pub message: Option<String>,
    /// `data` (or, when absent, the body itself) run through the non-envelope matchers.
    pub inner: Box<Shape>,
    /// The envelope's `data` as sent, or the whole body when `data` is absent.
    pub raw_data: Value,
}

/// Result of [`classify`], one variant per recognised shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    DirectDocument(DocumentAnalysis),
    WrappedGenerated { payload: Payload, degraded: bool },
    WrappedText(Payload),
    EnvelopeWithData(Envelope),
    LooseDocument(DocumentAnalysis),
    Unrecognized(Value),
}

impl Shape {
    pub fn kind(&self) -> ResponseShape {
        match self {
            Shape::DirectDocument(_) => ResponseShape::DirectDocument,
            Shape::WrappedGenerated { .. } => ResponseShape::WrappedGenerated,
            Shape::WrappedText(_) => ResponseShape::WrappedText,
            Shape::EnvelopeWithData(_) => ResponseShape::EnvelopeWithData,
            Shape::LooseDocument(_) => ResponseShape::LooseDocument,
            Shape::Unrecognized(_) => ResponseShape::Unrecognized,
        }
    }

    /// The interpreted payload and whether it was salvaged by recovery.
    pub fn into_payload(self) -> (Payload, bool) {
        match self {
            Shape::DirectDocument(doc) | Shape::LooseDocument(doc) => {
                (Payload::Document(doc), false)
            }
            Shape::WrappedGenerated { payload, degraded } => (payload, degraded),
            Shape::WrappedText(payload) => (payload, false),
            Shape::EnvelopeWithData(env) => env.inner.into_payload(),
            Shape::Unrecognized(v) => (Payload::Raw(v), false),
        }
    }
}

type Matcher = fn(&Value) -> Option<Shape>;

/// Matchers tried on a response body, in precedence order.
const BODY_MATCHERS: &[Matcher] = &[
    match_direct_document,
    match_wrapped_generated,
    match_wrapped_text,
    match_envelope,
    match_loose_document,
];

/// Matchers tried on an envelope's `data`; envelopes do not nest.
const INNER_MATCHERS: &[Matcher] = &[
    match_direct_document,
    match_wrapped_generated,
    match_wrapped_text,
    match_loose_document,
];

/// Interpret a 2xx response body.
pub fn classify(body: &Value) -> Shape {
    run_chain(BODY_MATCHERS, body)
}

fn run_chain(matchers: &[Matcher], body: &Value) -> Shape {
    for matcher in matchers {
        if let Some(shape) = matcher(body) {
            debug!("Response matched {:?}", shape.kind());
            return shape;
        }
    }
    debug!("Response matched no known shape");
    Shape::Unrecognized(body.clone())
}

/// Object with at least one of `headings`, `summary`, `keywords`.
pub fn is_document_like(v: &Value) -> bool {
    v.as_object().is_some_and(|o| {
        o.contains_key("headings") || o.contains_key("summary") || o.contains_key("keywords")
    })
}

/// Document-like and not empty: some heading, a summary, or a keyword.
pub fn has_document_content(v: &Value) -> bool {
    let non_empty_array =
        |key: &str| v.get(key).and_then(Value::as_array).is_some_and(|a| !a.is_empty());
    let non_empty_str =
        |key: &str| v.get(key).and_then(Value::as_str).is_some_and(|s| !s.is_empty());
    is_document_like(v)
        && (non_empty_array("headings") || non_empty_str("summary") || non_empty_array("keywords"))
}

/// Deserialize a document-like value; anything else stays raw.
fn to_payload(v: Value) -> Payload {
    if !is_document_like(&v) {
        return Payload::Raw(v);
    }
    match serde_json::from_value::<DocumentAnalysis>(v.clone()) {
        Ok(doc) => Payload::Document(doc),
        Err(e) => {
            debug!("Document-like value did not deserialize: {}", e);
            Payload::Raw(v)
        }
    }
}

fn match_direct_document(body: &Value) -> Option<Shape> {
    body.get("headings")?.as_array()?;
    match to_payload(body.clone()) {
        Payload::Document(doc) => Some(Shape::DirectDocument(doc)),
        Payload::Raw(_) => None,
    }
}

/// Text at `candidates[0].content.parts[0].text`.
pub fn generated_text(body: &Value) -> Option<&str> {
    body.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .filter(|s| !s.is_empty())
}

fn match_wrapped_generated(body: &Value) -> Option<Shape> {
    let text = generated_text(body)?;
    let shape = match extract_json(text, true) {
        Some(Extraction::Parsed(v)) => Shape::WrappedGenerated {
            payload: to_payload(v),
            degraded: false,
        },
        Some(Extraction::Recovered { value, .. }) => Shape::WrappedGenerated {
            payload: to_payload(value),
            degraded: true,
        },
        Some(Extraction::Scraped(doc)) => Shape::WrappedGenerated {
            payload: Payload::Document(doc),
            degraded: true,
        },
        None => Shape::WrappedGenerated {
            payload: Payload::Raw(body.clone()),
            degraded: false,
        },
    };
    Some(shape)
}

fn match_wrapped_text(body: &Value) -> Option<Shape> {
    let text = body.get("text")?.as_str().filter(|s| !s.is_empty())?;
    let payload = match extract_json(text, false) {
        Some(Extraction::Parsed(v)) => to_payload(v),
        _ => Payload::Raw(body.clone()),
    };
    Some(Shape::WrappedText(payload))
}

fn match_envelope(body: &Value) -> Option<Shape> {
    let success = body.get("success")?.as_bool()?;
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string);
    let raw_data = match body.get("data") {
        Some(d) if !d.is_null() => d.clone(),
        _ => body.clone(),
    };
    let inner = run_chain(INNER_MATCHERS, &raw_data);
    Some(Shape::EnvelopeWithData(Envelope {
        success,
        message,
        inner: Box::new(inner),
        raw_data,
    }))
}

fn match_loose_document(body: &Value) -> Option<Shape> {
    match to_payload(body.clone()) {
        Payload::Document(doc) => Some(Shape::LooseDocument(doc)),
        Payload::Raw(_) => None,
    }
}
