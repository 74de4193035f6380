//! Batch ingestion: uploaded PDFs in, reports and per-file errors out.
//!
//! Each file goes through the same checks in order (filename, extension,
//! size, PDF validation, extraction, text length, analysis). The first
//! failing check becomes that file's entry in
//! [`UploadResponse::errors`]; the rest of the batch carries on.
//!
//! Files are processed concurrently (bounded by
//! [`InsightsConfig::concurrency`]) but results are reported in input order,
//! and report ids are made file-safe and de-duplicated in that same order.

use crate::analyst::Analyst;
use crate::config::InsightsConfig;
use crate::error::{AnalystError, FileError};
use crate::pipeline::extract::DocumentExtractor;
use crate::pipeline::input::UploadedFile;
use crate::progress::{NoopIngestCallback, ProgressCallback};
use crate::report::{file_safe_id, ReportData, UploadResponse};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Extraction plus analysis for batches of uploads.
pub struct ReportPipeline {
    extractor: Arc<dyn DocumentExtractor>,
    analyst: Arc<Analyst>,
    config: InsightsConfig,
    progress: ProgressCallback,
}

impl ReportPipeline {
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        analyst: Arc<Analyst>,
        config: InsightsConfig,
    ) -> Self {
        Self {
            extractor,
            analyst,
            config,
            progress: Arc::new(NoopIngestCallback),
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = callback;
        self
    }

    /// Process a batch of uploads.
    ///
    /// `taken_ids` holds ids that already exist (for example, reports saved
    /// earlier); new ids never collide with them or with each other.
    pub async fn ingest(&self, files: Vec<UploadedFile>, taken_ids: &HashSet<String>) -> UploadResponse {
        let start = Instant::now();
        let total = files.len();
        if total == 0 {
            warn!("No files provided");
            return UploadResponse::default();
        }
        info!("Processing {} uploaded files", total);
        self.progress.on_batch_start(total);

        let mut results: Vec<(usize, Result<ReportData, FileError>)> =
            stream::iter(files.into_iter().enumerate().map(|(idx, file)| async move {
                let index = idx + 1;
                let result = self.process_file(index, total, file).await;
                match &result {
                    Ok(report) => self.progress.on_file_complete(index, total, &report.id),
                    Err(e) => self.progress.on_file_error(index, total, &e.to_string()),
                }
                (idx, result)
            }))
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await;
        results.sort_by_key(|(idx, _)| *idx);

        let mut response = UploadResponse::default();
        let mut seen = taken_ids.clone();
        for (_, result) in results {
            match result {
                Ok(mut report) => {
                    let id = unique_id(&file_safe_id(&report.id), &seen);
                    if id != report.id {
                        debug!("Report id '{}' taken, using '{}'", report.id, id);
                    }
                    seen.insert(id.clone());
                    report.id = id;
                    response.reports.push(report);
                }
                Err(e) => {
                    warn!("{e}");
                    response.errors.push(e.to_string());
                }
            }
        }
        response.success_count = response.reports.len();

        info!(
            "Upload processing complete. Success: {}, Errors: {} ({:?})",
            response.success_count,
            response.errors.len(),
            start.elapsed()
        );
        self.progress.on_batch_complete(total, response.success_count);
        response
    }

    async fn process_file(
        &self,
        index: usize,
        total: usize,
        file: UploadedFile,
    ) -> Result<ReportData, FileError> {
        // ── Step 1: Upload checks ────────────────────────────────────────────
        let name = file
            .name()
            .map(str::to_string)
            .ok_or(FileError::MissingFilename { index })?;
        info!("Processing file {}/{}: {}", index, total, name);
        self.progress.on_file_start(index, total, &name);

        if !name.to_lowercase().ends_with(".pdf") {
            return Err(FileError::NotPdf { name });
        }
        let size = file.bytes.len() as u64;
        if size == 0 {
            return Err(FileError::Empty { name });
        }
        if size > self.config.max_file_size {
            return Err(FileError::TooLarge {
                name,
                size_mb: size as f64 / (1024.0 * 1024.0),
                max_mb: self.config.max_file_size_mb(),
            });
        }
        debug!("File size: {:.2}MB", size as f64 / (1024.0 * 1024.0));

        // ── Step 2: Validate + extract on the blocking pool ──────────────────
        let extractor = Arc::clone(&self.extractor);
        let bytes = file.bytes;
        let (validation, document) = tokio::task::spawn_blocking(move || {
            let validation = extractor.validate(&bytes);
            let document = validation
                .is_valid
                .then(|| extractor.extract_document(&bytes));
            (validation, document)
        })
        .await
        .map_err(|e| FileError::ExtractionFailed {
            name: name.clone(),
            detail: format!("extraction task failed: {e}"),
        })?;

        let Some(document) = document else {
            return Err(FileError::Invalid {
                name,
                reason: validation.message,
            });
        };
        debug!("PDF validation passed: {}", validation.message);

        // ── Step 3: Text checks ──────────────────────────────────────────────
        let text = document.cleaned_text;
        if text.trim().is_empty() {
            return Err(FileError::NoText { name });
        }
        let chars = text.trim().chars().count();
        if chars < self.config.min_text_chars {
            return Err(FileError::TextTooShort {
                name,
                chars,
                min: self.config.min_text_chars,
            });
        }

        // ── Step 4: Analysis ─────────────────────────────────────────────────
        info!("Starting AI processing for {}", name);
        match self.analyst.create_report(&text).await {
            Ok(analyzed) => {
                info!(
                    "AI generated report {} - {} ({:?}, {} findings, {} charts)",
                    analyzed.report.id,
                    analyzed.report.title,
                    analyzed.origin,
                    analyzed.report.key_findings.len(),
                    analyzed.report.charts.len()
                );
                Ok(analyzed.report)
            }
            Err(AnalystError::Generation(e)) => {
                error!("AI processing failed for {}: {}", name, e);
                Err(FileError::AnalysisFailed {
                    name,
                    detail: e.to_string(),
                })
            }
            Err(e) => {
                error!("No structured report for {}: {}", name, e);
                Err(FileError::NoReport {
                    name,
                    detail: e.to_string(),
                })
            }
        }
    }
}

/// `base`, or the first of `base_1`, `base_2`, … not in `taken`.
pub fn unique_id(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}
