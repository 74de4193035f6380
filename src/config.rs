//! Configuration for extraction, analysis and batch ingestion.
//!
//! Every knob lives in [`InsightsConfig`], built via its
//! [`InsightsConfigBuilder`]. The library never reads environment variables:
//! the binary (or any other host) maps its own flags and env onto the builder
//! once at startup and hands the finished value to each component.

use crate::error::InsightsError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 50 MiB, the largest upload accepted by [`crate::ingest::ReportPipeline`].
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Configuration shared by the extractor, the analyst and the ingestion pipeline.
///
/// # Example
/// ```rust
/// use report_insights::InsightsConfig;
///
/// let config = InsightsConfig::builder()
///     .concurrency(2)
///     .max_retries(1)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    /// Largest accepted upload in bytes. Default: 50 MiB.
    pub max_file_size: u64,

    /// Minimum number of characters of cleaned text needed before a report
    /// is requested from the model. Default: 100.
    pub min_text_chars: usize,

    /// Number of uploads processed concurrently in one batch. Default: 4.
    pub concurrency: usize,

    /// Directory holding the pdfium shared library. If None, the system
    /// library search path is used.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Maximum output tokens for report, narrative and storyboard calls. Default: 8192.
    pub max_tokens: usize,

    /// Maximum output tokens for chat answers. Default: 1024.
    pub chat_max_tokens: usize,

    /// Sampling temperature for report structuring. Default: 0.5.
    pub report_temperature: f32,

    /// Sampling temperature for single-report narratives. Default: 0.7.
    pub narrative_temperature: f32,

    /// Sampling temperature for the cross-report storyboard. Default: 0.8.
    pub storyboard_temperature: f32,

    /// Sampling temperature for chat answers. Default: 0.7.
    pub chat_temperature: f32,

    /// Retry attempts on a failed model call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call model timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Characters of report text sent when structuring a report. Default: 8000.
    pub report_excerpt_chars: usize,

    /// Characters of report text sent when writing a narrative. Default: 4000.
    pub narrative_excerpt_chars: usize,

    /// Characters of report text sent with a chat question. Default: 6000.
    pub chat_excerpt_chars: usize,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            min_text_chars: 100,
            concurrency: 4,
            pdfium_lib_path: None,
            max_tokens: 8192,
            chat_max_tokens: 1024,
            report_temperature: 0.5,
            narrative_temperature: 0.7,
            storyboard_temperature: 0.8,
            chat_temperature: 0.7,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            report_excerpt_chars: 8000,
            narrative_excerpt_chars: 4000,
            chat_excerpt_chars: 6000,
        }
    }
}

impl InsightsConfig {
    /// Create a new builder for `InsightsConfig`.
    pub fn builder() -> InsightsConfigBuilder {
        InsightsConfigBuilder {
            config: Self::default(),
        }
    }

    /// `max_file_size` in MiB, as shown in upload error messages.
    pub fn max_file_size_mb(&self) -> f64 {
        self.max_file_size as f64 / (1024.0 * 1024.0)
    }
}

/// Builder for [`InsightsConfig`].
#[derive(Debug)]
pub struct InsightsConfigBuilder {
    config: InsightsConfig,
}

impl InsightsConfigBuilder {
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    /// Size limit in MiB; saturates at `u64::MAX` bytes.
    pub fn max_file_size_mib(mut self, mib: u64) -> Self {
        self.config.max_file_size = mib.saturating_mul(1024 * 1024);
        self
    }

    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn chat_max_tokens(mut self, n: usize) -> Self {
        self.config.chat_max_tokens = n;
        self
    }

    pub fn report_temperature(mut self, t: f32) -> Self {
        self.config.report_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn narrative_temperature(mut self, t: f32) -> Self {
        self.config.narrative_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn storyboard_temperature(mut self, t: f32) -> Self {
        self.config.storyboard_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn chat_temperature(mut self, t: f32) -> Self {
        self.config.chat_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn report_excerpt_chars(mut self, n: usize) -> Self {
        self.config.report_excerpt_chars = n;
        self
    }

    pub fn narrative_excerpt_chars(mut self, n: usize) -> Self {
        self.config.narrative_excerpt_chars = n;
        self
    }

    pub fn chat_excerpt_chars(mut self, n: usize) -> Self {
        self.config.chat_excerpt_chars = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<InsightsConfig, InsightsError> {
        let c = &self.config;
        if c.max_file_size == 0 {
            return Err(InsightsError::InvalidConfig(
                "max_file_size must be > 0".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(InsightsError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 || c.chat_max_tokens == 0 {
            return Err(InsightsError::InvalidConfig(format!(
                "Token limits must be > 0, got max_tokens={} chat_max_tokens={}",
                c.max_tokens, c.chat_max_tokens
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(InsightsError::InvalidConfig(
                "API timeout must be at least 1s".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upload_limits() {
        let config = InsightsConfig::default();
        assert_eq!(config.max_file_size, 52_428_800);
        assert_eq!(config.min_text_chars, 100);
        assert_eq!(config.max_file_size_mb(), 50.0);
    }

    #[test]
    fn builder_clamps_temperature_and_concurrency() {
        let config = InsightsConfig::builder()
            .report_temperature(5.0)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(config.report_temperature, 2.0);
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn build_rejects_zero_file_size() {
        let err = InsightsConfig::builder().max_file_size(0).build().unwrap_err();
        assert!(err.to_string().contains("max_file_size"));
    }

    #[test]
    fn file_size_in_mib_saturates() {
        let config = InsightsConfig::builder().max_file_size_mib(3).build().unwrap();
        assert_eq!(config.max_file_size, 3 * 1024 * 1024);

        let config = InsightsConfig::builder()
            .max_file_size_mib(u64::MAX)
            .build()
            .unwrap();
        assert_eq!(config.max_file_size, u64::MAX);
    }

    #[test]
    fn build_rejects_zero_token_limit() {
        let err = InsightsConfig::builder().chat_max_tokens(0).build().unwrap_err();
        assert!(matches!(err, InsightsError::InvalidConfig(_)));
    }
}
