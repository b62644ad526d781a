//! Output types: the document analysis and the canonical upload envelope.

use serde::{Deserialize, Deserializer, Serialize};

/// Structured analysis of one PDF, as produced by the backend.
///
/// Every field defaults when missing so partially-populated answers still
/// deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headings: Vec<Heading>,
}

impl DocumentAnalysis {
    /// Total number of headings, subheadings included.
    pub fn heading_count(&self) -> usize {
        fn count(hs: &[Heading]) -> usize {
            hs.iter().map(|h| 1 + count(&h.subheadings)).sum()
        }
        count(&self.headings)
    }
}

/// A titled content span of the source document.
///
/// Page/line numbers are 1-based and advisory; nothing checks that the end
/// comes after the start. Subheadings share the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub start_page: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub start_line: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub end_page: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub end_line: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subheadings: Vec<Heading>,
}

/// Which matcher interpreted the backend's response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// `{headings: [...], ...}` at the top level.
    DirectDocument,
    /// `candidates[0].content.parts[0].text` holding (possibly fenced) JSON.
    WrappedGenerated,
    /// Top-level `text` field holding fenced JSON.
    WrappedText,
    /// `{success, message, data}` envelope from the backend itself.
    EnvelopeWithData,
    /// Object carrying `summary` or `keywords` but no `headings` array.
    LooseDocument,
    /// Nothing matched; the body is passed through in `raw`.
    #[default]
    Unrecognized,
}

/// Canonical result of one upload.
///
/// `data` is present iff `success` is true, and then always holds a
/// [`DocumentAnalysis`]. Bodies that could not be interpreted are kept in
/// `raw` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DocumentAnalysis>,
    pub filename: String,
    /// Milliseconds since the Unix epoch when the result was built.
    pub processing_time: u64,
    /// Data was salvaged from a truncated or malformed payload.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
    #[serde(default)]
    pub shape: ResponseShape,
    /// Candidate endpoint that answered.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl UploadResult {
    /// The analysis, when the upload succeeded.
    pub fn analysis(&self) -> Option<&DocumentAnalysis> {
        if self.success {
            self.data.as_ref()
        } else {
            None
        }
    }
}

/// Accepts `3`, `3.0`, `"3"`, or `null`.
fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match v {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|n| n.min(u32::MAX as u64) as u32)
            .unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_default() {
        let doc: DocumentAnalysis =
            serde_json::from_value(json!({"headings": [{"title": "Intro"}]})).unwrap();
        assert_eq!(doc.summary, "");
        assert!(doc.keywords.is_empty());
        assert_eq!(doc.headings[0].title, "Intro");
        assert_eq!(doc.headings[0].start_page, 0);
        assert!(doc.headings[0].subheadings.is_empty());
    }

    #[test]
    fn lenient_numbers() {
        let h: Heading = serde_json::from_value(json!({
            "title": "T",
            "start_page": "4",
            "start_line": 2.0,
            "end_page": null,
            "end_line": 9
        }))
        .unwrap();
        assert_eq!((h.start_page, h.start_line, h.end_page, h.end_line), (4, 2, 0, 9));
    }

    #[test]
    fn null_lists_become_empty() {
        let doc: DocumentAnalysis =
            serde_json::from_value(json!({"summary": "s", "keywords": null, "headings": null}))
                .unwrap();
        assert!(doc.keywords.is_empty());
        assert!(doc.headings.is_empty());
    }

    #[test]
    fn null_strings_become_empty() {
        let doc: DocumentAnalysis = serde_json::from_value(json!({
            "summary": null,
            "keywords": ["k"],
            "headings": [{"title": null, "content": null, "start_page": 1}]
        }))
        .unwrap();
        assert_eq!(doc.summary, "");
        assert_eq!(doc.headings[0].title, "");
        assert_eq!(doc.headings[0].content, "");
        assert_eq!(doc.headings[0].start_page, 1);
    }

    #[test]
    fn heading_count_includes_nested() {
        let doc: DocumentAnalysis = serde_json::from_value(json!({
            "headings": [
                {"title": "A", "subheadings": [{"title": "A.1"}, {"title": "A.2"}]},
                {"title": "B"}
            ]
        }))
        .unwrap();
        assert_eq!(doc.heading_count(), 4);
    }

    #[test]
    fn degraded_flag_omitted_when_false() {
        let r = UploadResult {
            success: true,
            message: "ok".into(),
            data: Some(DocumentAnalysis::default()),
            filename: "a.pdf".into(),
            processing_time: 1,
            degraded: false,
            shape: ResponseShape::DirectDocument,
            endpoint: "/summarize".into(),
            raw: None,
        };
        let v = serde_json::to_value(&r).unwrap();
        assert!(v.get("degraded").is_none());
        assert!(v.get("raw").is_none());
        assert_eq!(v["shape"], json!("direct_document"));
    }
}
