//! # pdfmind
//!
//! Client core for a PDF-analysis backend: upload a document, get back a
//! structured outline (summary, keywords, nested headings with page spans).
//!
//! ## Why this crate?
//!
//! The backend is not one stable service. Deployments expose the upload
//! under different routes, proxies drop connections, and the model behind it
//! answers in several JSON shapes, sometimes cut off mid-object when it hits
//! its output limit. This crate hides all of that behind one call that either
//! returns a canonical [`UploadResult`] or a structured failure.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      read local file or download from URL
//!  ├─ 2. Upload     endpoint candidates × transport ladder, first 2xx wins
//!  ├─ 3. Shape      classify the body (direct, Gemini-wrapped, text, envelope, loose)
//!  ├─ 4. Recovery   fenced / truncated JSON repair, title scraping as last resort
//!  └─ 5. Envelope   {success, message, data, filename, processing_time}
//! ```
//!
//! The result can then be rendered as a Markdown outline ([`render_outline`])
//! or laid out as a radial mindmap ([`layout_mindmap`]) or a concept map
//! with a keyword cluster ([`layout_flowchart`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfmind::{upload, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://localhost:8000")
//!         .build()?;
//!     let result = upload("paper.pdf", &config).await?;
//!     if let Some(doc) = result.analysis() {
//!         println!("{} headings", doc.heading_count());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfmind` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdfmind = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod mindmap;
pub mod outline;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod session;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ClientConfig, ClientConfigBuilder, DeploymentMode, TransportKind};
pub use error::{AttemptError, FailureDetails, FailureEnvelope, RecoveryError, UploadError};
pub use mindmap::{
    layout_flowchart, layout_mindmap, MindmapEdge, MindmapLayout, MindmapNode, NodeKind,
};
pub use outline::{render_outline, OutlineOptions};
pub use output::{DocumentAnalysis, Heading, ResponseShape, UploadResult};
pub use pipeline::input::{resolve_input, UploadFile};
pub use progress::{NoopProgressCallback, ProgressCallback, UploadProgressCallback};
pub use session::{View, Workspace};
pub use upload::{upload, upload_bytes, upload_sync, upload_to_file, Uploader};
