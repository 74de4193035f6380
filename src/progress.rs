//! Progress-callback trait for per-file ingestion events.
//!
//! Attach an [`Arc<dyn IngestProgressCallback>`] with
//! [`crate::ingest::ReportPipeline::with_progress`] to observe a batch as it
//! runs: the CLI drives a progress bar with it, a server could forward the
//! events to a websocket.
//!
//! # Example
//!
//! ```rust
//! use report_insights::IngestProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl IngestProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, index: usize, total_files: usize, report_id: &str) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}/{total_files} done (file {index}: {report_id})");
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the ingestion pipeline as it processes each uploaded file.
///
/// Files are processed concurrently, so per-file methods may be called from
/// several tasks at once and in any order. All methods default to no-ops.
/// `index` is the 1-based position of the file in the batch.
pub trait IngestProgressCallback: Send + Sync {
    /// Called once before any file is processed.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when processing of a file begins.
    fn on_file_start(&self, index: usize, total_files: usize, filename: &str) {
        let _ = (index, total_files, filename);
    }

    /// Called when a file produced a report.
    ///
    /// `report_id` is the id before batch de-duplication.
    fn on_file_complete(&self, index: usize, total_files: usize, report_id: &str) {
        let _ = (index, total_files, report_id);
    }

    /// Called when a file was rejected; `error` is the message that lands in
    /// the batch response.
    fn on_file_error(&self, index: usize, total_files: usize, error: &str) {
        let _ = (index, total_files, error);
    }

    /// Called once after every file has been attempted.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation, used when no callback is attached.
pub struct NoopIngestCallback;

impl IngestProgressCallback for NoopIngestCallback {}

pub type ProgressCallback = Arc<dyn IngestProgressCallback>;
