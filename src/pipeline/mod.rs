//! Pipeline stages for normalising one upload.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the transport can be swapped without touching interpretation.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ transport ──▶ shape ──▶ envelope
//! (path/URL)  (HTTP POST)  (classify)  (UploadResult)
//!                              │
//!                              └──▶ recovery (truncated JSON)
//! ```
//!
//! 1. [`input`] reads the user-supplied path or downloads the URL.
//! 2. [`transport`] sends the multipart POST through one of the configured
//!    clients. It is the only stage with network I/O.
//! 3. [`shape`] decides which of the known response shapes the body is.
//! 4. [`recovery`] gets JSON out of model text, repairing truncation.
//! 5. [`envelope`] builds the canonical [`crate::output::UploadResult`].

pub mod envelope;
pub mod input;
pub mod recovery;
pub mod shape;
pub mod transport;
