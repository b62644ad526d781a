//! View-state machine for an interactive front end.
//!
//! ```text
//!            submit()                 Ok(success)
//! Upload ───────────▶ Loading ──────────────────▶ Structured(result)
//!   ▲                    │                               │
//!   └── Err / !success ──┘           reset() ────────────┘
//! ```
//!
//! `submit` takes `&mut self` for the whole upload, so a second upload cannot
//! start while one is in flight.

use crate::error::{FailureDetails, FailureEnvelope};
use crate::output::{DocumentAnalysis, UploadResult};
use crate::pipeline::input::UploadFile;
use crate::upload::Uploader;
use std::sync::Arc;
use tracing::{debug, warn};

/// What the front end shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum View {
    /// File picker.
    #[default]
    Upload,
    /// Upload in flight.
    Loading,
    /// A successful result.
    Structured(UploadResult),
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::Upload => "upload",
            View::Loading => "loading",
            View::Structured(_) => "structured",
        }
    }
}

#[derive(Debug)]
pub struct Workspace {
    uploader: Arc<Uploader>,
    view: View,
}

impl Workspace {
    pub fn new(uploader: Arc<Uploader>) -> Self {
        Self {
            uploader,
            view: View::Upload,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// The result on display, if any.
    pub fn result(&self) -> Option<&UploadResult> {
        match &self.view {
            View::Structured(result) => Some(result),
            _ => None,
        }
    }

    /// The analysis on display, if any.
    pub fn analysis(&self) -> Option<&DocumentAnalysis> {
        self.result().and_then(UploadResult::analysis)
    }

    /// Upload `file` and move to the resulting view.
    ///
    /// On success the result is held in [`View::Structured`] and read back
    /// through [`Workspace::result`]. A transport failure or an answer with
    /// `success: false` returns to [`View::Upload`] and yields the failure
    /// envelope to display.
    pub async fn submit(&mut self, file: &UploadFile) -> Result<(), FailureEnvelope> {
        self.transition(View::Loading);

        match self.uploader.upload(file).await {
            Ok(result) if result.success => {
                self.transition(View::Structured(result));
                Ok(())
            }
            Ok(result) => {
                warn!(
                    "Upload of '{}' was not successful: {}",
                    result.filename, result.message
                );
                self.transition(View::Upload);
                Err(FailureEnvelope {
                    success: false,
                    message: result.message,
                    error: format!("{:?} response", result.shape),
                    is_network_error: false,
                    details: FailureDetails {
                        endpoint: Some(result.endpoint),
                        data: result.raw,
                        ..Default::default()
                    },
                })
            }
            Err(e) => {
                warn!("Upload of '{}' failed: {}", file.filename, e);
                self.transition(View::Upload);
                Err(e.to_envelope())
            }
        }
    }

    /// Back to the file picker, dropping any result.
    pub fn reset(&mut self) {
        self.transition(View::Upload);
    }

    fn transition(&mut self, next: View) {
        debug!("View {} -> {}", self.view.name(), next.name());
        self.view = next;
    }
}
