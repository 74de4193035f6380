//! Error types for the report-insights library.
//!
//! Failures are split by how far they reach:
//!
//! * [`InsightsError`] (**fatal**): the pipeline cannot be set up or its
//!   inputs cannot be loaded (pdfium missing, bad configuration, unreadable
//!   file, failed download).
//!
//! * [`FileError`] (**non-fatal**): one uploaded file was rejected. Rendered
//!   into [`crate::report::UploadResponse::errors`] so the rest of the batch
//!   still succeeds.
//!
//! * [`PdfRejection`], [`RecoveryError`], [`ReportError`],
//!   [`GenerationError`], [`AnalystError`]: value results of the individual
//!   stages. None of them escape a request as a panic.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the report-insights library.
#[derive(Debug, Error)]
pub enum InsightsError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// Download body exceeded the upload size limit.
    #[error("Download of '{url}' exceeds the {max_bytes}-byte upload limit")]
    DownloadTooLarge { url: String, max_bytes: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not read an input file.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Text extraction needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/dir/containing/libpdfium.\n\
  • Install libpdfium system-wide (e.g. from bblanchon/pdfium-binaries).\n"
    )]
    PdfiumBindingFailed(String),
}

/// Why a byte buffer was rejected as a PDF.
///
/// The `Display` text is the human-readable reason surfaced to uploaders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PdfRejection {
    #[error("Empty file content provided.")]
    Empty,

    #[error("File content is too small to be a valid PDF.")]
    TooSmall { len: usize },

    #[error("File does not have a valid PDF header (%PDF- not found at beginning).")]
    BadHeader,

    #[error("PDF is encrypted and could not be decrypted with an empty password.")]
    Encrypted,

    #[error("PDF appears valid but contains no pages.")]
    NoPages,

    #[error("Invalid PDF format or corrupted file: {0}")]
    Corrupt(String),
}

/// A non-fatal error for a single uploaded file.
///
/// The message wording is part of the upload contract: each string lands
/// verbatim in the batch response.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    #[error("File {index}: No filename provided")]
    MissingFilename { index: usize },

    #[error("File '{name}': Not a PDF file (only PDF files are supported)")]
    NotPdf { name: String },

    #[error("File '{name}': Empty file")]
    Empty { name: String },

    #[error("File '{name}': Too large ({size_mb:.1}MB, max: {max_mb}MB)")]
    TooLarge { name: String, size_mb: f64, max_mb: f64 },

    #[error("File '{name}': {reason}")]
    Invalid { name: String, reason: String },

    #[error("File '{name}': PDF text extraction failed - {detail}")]
    ExtractionFailed { name: String, detail: String },

    #[error(
        "File '{name}': No text could be extracted. This might be an image-based PDF or scanned document."
    )]
    NoText { name: String },

    #[error(
        "File '{name}': Extracted text too short ({chars} characters). Minimum {min} characters required."
    )]
    TextTooShort { name: String, chars: usize, min: usize },

    #[error("File '{name}': AI processing failed - {detail}")]
    AnalysisFailed { name: String, detail: String },

    #[error("File '{name}': AI could not generate a structured report from the text - {detail}")]
    NoReport { name: String, detail: String },
}

/// The tolerant parser could not recover a JSON object.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("No JSON object found")]
    NoJsonObject,

    /// The candidate still failed to decode after the single repair pass.
    #[error("JSON object could not be decoded even after repair: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },

    #[error("Repair pattern for field '{field}' is invalid: {detail}")]
    RepairPattern { field: String, detail: String },
}

/// A decoded structure did not satisfy the report contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Field '{field}' has the wrong shape: {detail}")]
    InvalidField { field: String, detail: String },
}

/// A text-generation call failed.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("LLM call failed after {retries} retries: {detail}")]
    Failed { retries: u32, detail: String },

    #[error("LLM call timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Everything an [`crate::analyst::Analyst`] operation can return instead of a result.
#[derive(Debug, Error)]
pub enum AnalystError {
    /// No model is configured; every AI-backed operation is disabled.
    #[error("AI features are disabled: {reason}")]
    Unavailable { reason: String },

    #[error("Empty or invalid text provided")]
    EmptyText,

    #[error("Empty response from AI model")]
    EmptyResponse,

    #[error("No reports available for storyboard generation")]
    NoReports,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("AI response could not be recovered as JSON: {0}")]
    Unrecoverable(#[from] RecoveryError),

    #[error("AI response is not a valid report: {0}")]
    InvalidReport(#[from] ReportError),
}
