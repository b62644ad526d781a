//! Progress-callback trait for upload attempt events.
//!
//! Inject an [`Arc<dyn UploadProgressCallback>`] via
//! [`crate::config::ClientConfigBuilder::progress_callback`] to follow the
//! uploader as it walks the (endpoint, transport) ladder. The CLI uses it to
//! drive its loading spinner.
//!
//! # Example
//!
//! ```rust
//! use pdfmind::{ClientConfig, UploadProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     attempts: AtomicUsize,
//! }
//!
//! impl UploadProgressCallback for CountingCallback {
//!     fn on_attempt_start(&self, endpoint: &str, transport: &str, attempt: usize) {
//!         self.attempts.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("attempt {attempt}: {transport} → {endpoint}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { attempts: AtomicUsize::new(0) });
//!
//! let config = ClientConfig::builder()
//!     .progress_callback(counter as Arc<dyn UploadProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the uploader as it works through its attempts.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Attempts are strictly sequential, but the trait is
/// `Send + Sync` so an `Uploader` can be shared across tasks.
pub trait UploadProgressCallback: Send + Sync {
    /// Called once before the first attempt.
    ///
    /// # Arguments
    /// * `filename`  : name of the file being uploaded
    /// * `candidates`: number of candidate endpoints
    fn on_upload_start(&self, filename: &str, candidates: usize) {
        let _ = (filename, candidates);
    }

    /// Called just before a request is sent.
    ///
    /// # Arguments
    /// * `endpoint` : candidate endpoint path
    /// * `transport`: transport name (`multipart`, `plain`)
    /// * `attempt`  : 1-indexed attempt counter across all endpoints
    fn on_attempt_start(&self, endpoint: &str, transport: &str, attempt: usize) {
        let _ = (endpoint, transport, attempt);
    }

    /// Called when an attempt fails; the uploader will move on.
    fn on_attempt_failed(&self, endpoint: &str, transport: &str, error: &str) {
        let _ = (endpoint, transport, error);
    }

    /// Called once when a result has been built.
    ///
    /// # Arguments
    /// * `endpoint`: the endpoint that answered
    /// * `success` : the envelope's `success` flag
    fn on_upload_complete(&self, endpoint: &str, success: bool) {
        let _ = (endpoint, success);
    }

    /// Called once when every attempt failed.
    fn on_upload_failed(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl UploadProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ProgressCallback = Arc<dyn UploadProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        attempts: AtomicUsize,
        failures: AtomicUsize,
        completed: Mutex<Option<(String, bool)>>,
    }

    impl UploadProgressCallback for TrackingCallback {
        fn on_attempt_start(&self, _endpoint: &str, _transport: &str, _attempt: usize) {
            self.attempts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_attempt_failed(&self, _endpoint: &str, _transport: &str, _error: &str) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }

        fn on_upload_complete(&self, endpoint: &str, success: bool) {
            *self.completed.lock().unwrap() = Some((endpoint.to_string(), success));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_upload_start("a.pdf", 6);
        cb.on_attempt_start("/summarize", "multipart", 1);
        cb.on_attempt_failed("/summarize", "multipart", "HTTP 404");
        cb.on_upload_complete("/upload", true);
        cb.on_upload_failed("all endpoints failed");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_attempt_start("/summarize", "multipart", 1);
        tracker.on_attempt_failed("/summarize", "multipart", "HTTP 404");
        tracker.on_attempt_start("/upload", "multipart", 2);
        tracker.on_upload_complete("/upload", true);

        assert_eq!(tracker.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
        assert_eq!(
            *tracker.completed.lock().unwrap(),
            Some(("/upload".to_string(), true))
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_upload_start("b.pdf", 1);
        cb.on_attempt_start("/x", "plain", 1);
    }
}
