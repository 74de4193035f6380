//! # report-insights
//!
//! Turn PDF economic reports into structured, chart-ready report objects
//! with a large language model, then ask the same model for narratives,
//! answers and a cross-report storyboard.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Checks     filename, extension, size (per-file errors, batch continues)
//!  ├─ 2. Validate   signature, encryption, page count via pdfium
//!  ├─ 3. Extract    page texts joined with blank lines (spawn_blocking)
//!  ├─ 4. Clean      deterministic normalisation rules
//!  ├─ 5. Analyse    model call → JSON recovery → fallback synthesis
//!  └─ 6. Validate   required fields, invalid charts dropped, unique ids
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use report_insights::{Analyst, InsightsConfig, LlmGenerator, PdfExtractor, ReportPipeline};
//! use report_insights::pipeline::input::load_upload;
//! use edgequake_llm::ProviderFactory;
//! use std::collections::HashSet;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = InsightsConfig::default();
//!     let (provider, _embedding) = ProviderFactory::from_env().map_err(|e| e.to_string())?;
//!     let analyst = Analyst::new(Arc::new(LlmGenerator::new(provider, &config)), config.clone());
//!     let extractor = PdfExtractor::bind(None)?;
//!
//!     let upload = load_upload("weekly-report.pdf", 120, config.max_file_size).await?;
//!     let pipeline = ReportPipeline::new(Arc::new(extractor), Arc::new(analyst), config);
//!     let response = pipeline.ingest(vec![upload], &HashSet::new()).await;
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `insights` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! report-insights = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyst;
pub mod config;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyst::{Analyst, AnalystStatus};
pub use config::{InsightsConfig, InsightsConfigBuilder};
pub use error::{
    AnalystError, FileError, GenerationError, InsightsError, PdfRejection, RecoveryError,
    ReportError,
};
pub use ingest::ReportPipeline;
pub use pipeline::clean::clean_text;
pub use pipeline::extract::{DocumentExtractor, ExtractedDocument, PdfExtractor, Validation};
pub use pipeline::input::UploadedFile;
pub use pipeline::llm::{Generation, GenerationRequest, LlmGenerator, TextGenerator};
pub use pipeline::recover::{recover_object, FieldRepair, ParsedStructure};
pub use progress::{IngestProgressCallback, NoopIngestCallback};
pub use report::{
    AnalyzedReport, ChartConfig, ChartType, DataKey, DataValue, KeyActor, ReportData,
    ReportOrigin, StoryboardData, UploadResponse,
};
