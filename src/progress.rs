//! Progress-callback trait for per-image processing events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::ProcessingConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through a batch.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a terminal progress bar, a log sink, or a web
//! socket without the library knowing anything about how the host
//! application communicates. The trait is `Send + Sync` so the same
//! callback value can be shared with other tasks in an async host even
//! though the pipeline itself calls it strictly sequentially.

use std::sync::Arc;

/// Called by the pipeline as it processes each image.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive in order: images are processed one
/// at a time, each to completion before the next begins.
pub trait RunProgressCallback: Send + Sync {
    /// Called once per run, after inputs are classified, with the number
    /// of accepted documents.
    fn on_run_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when a document yields its images (PDF extraction done, or a
    /// standalone image admitted).
    fn on_document_ready(&self, document_index: usize, images: usize) {
        let _ = (document_index, images);
    }

    /// Called when a document fails wholesale and the run moves on.
    fn on_document_failed(&self, document_index: usize, error: String) {
        let _ = (document_index, error);
    }

    /// Called just before an image is (preprocessed and) sent for
    /// extraction.
    fn on_image_start(&self, image_index: usize, total_images: usize) {
        let _ = (image_index, total_images);
    }

    /// Called when an image produced a record.
    fn on_image_complete(&self, image_index: usize, total_images: usize) {
        let _ = (image_index, total_images);
    }

    /// Called when an image failed at any stage. The run continues with
    /// the next image.
    fn on_image_failed(&self, image_index: usize, total_images: usize, error: String) {
        let _ = (image_index, total_images, error);
    }

    /// Called once when the run finishes, with the record count.
    fn on_run_complete(&self, records: usize) {
        let _ = records;
    }
}

/// A callback that ignores every event.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Helper to invoke an optional callback without cluttering call sites.
pub(crate) fn notify<F>(cb: &Option<Arc<dyn RunProgressCallback>>, f: F)
where
    F: FnOnce(&dyn RunProgressCallback),
{
    if let Some(cb) = cb {
        f(cb.as_ref());
    }
}
