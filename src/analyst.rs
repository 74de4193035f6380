//! AI-backed analysis: report structuring, narratives, storyboards and chat.
//!
//! An [`Analyst`] is chosen once at startup. `Available` carries a live
//! [`TextGenerator`] and the configuration it runs with. `Unavailable`
//! carries the reason (usually a missing API key) and answers every
//! operation with [`AnalystError::Unavailable`]. Callers never check an
//! "enabled" flag of their own.
//!
//! ## Report structuring
//!
//! ```text
//! text ─▶ prompt ─▶ model ─▶ direct decode ──────────────▶ ReportOrigin::Model
//!                               │ fails
//!                               ▼
//!                        recover_object(SUMMARY) ─────────▶ ReportOrigin::Recovered
//!                               │ fails
//!                               ▼
//!                        synthesize_report(text) ─────────▶ ReportOrigin::Fallback
//! ```
//!
//! Whichever structure wins is validated by [`ReportData::from_structure`].

use crate::config::InsightsConfig;
use crate::error::AnalystError;
use crate::pipeline::fallback::synthesize_report;
use crate::pipeline::llm::{GenerationRequest, TextGenerator};
use crate::pipeline::recover::{recover_object, FieldRepair, ParsedStructure};
use crate::prompts;
use crate::report::{AnalyzedReport, ReportData, ReportOrigin, StoryboardData};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Whether AI features are on, as shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalystStatus {
    Enabled,
    Disabled,
}

impl fmt::Display for AnalystStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => f.write_str("enabled"),
            Self::Disabled => f.write_str("disabled"),
        }
    }
}

pub enum Analyst {
    Available {
        generator: Arc<dyn TextGenerator>,
        config: InsightsConfig,
    },
    Unavailable {
        reason: String,
    },
}

impl fmt::Debug for Analyst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available { config, .. } => f
                .debug_struct("Analyst::Available")
                .field("config", config)
                .finish_non_exhaustive(),
            Self::Unavailable { reason } => f
                .debug_struct("Analyst::Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

impl Analyst {
    pub fn new(generator: Arc<dyn TextGenerator>, config: InsightsConfig) -> Self {
        Self::Available { generator, config }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("AI features will be disabled: {reason}");
        Self::Unavailable { reason }
    }

    pub fn status(&self) -> AnalystStatus {
        match self {
            Self::Available { .. } => AnalystStatus::Enabled,
            Self::Unavailable { .. } => AnalystStatus::Disabled,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status() == AnalystStatus::Enabled
    }

    fn live(&self) -> Result<(&dyn TextGenerator, &InsightsConfig), AnalystError> {
        match self {
            Self::Available { generator, config } => Ok((generator.as_ref(), config)),
            Self::Unavailable { reason } => Err(AnalystError::Unavailable {
                reason: reason.clone(),
            }),
        }
    }

    /// Turn document text into a validated report.
    pub async fn create_report(&self, full_text: &str) -> Result<AnalyzedReport, AnalystError> {
        let (generator, config) = self.live()?;

        if full_text.trim().is_empty() {
            error!("Empty or invalid text provided");
            return Err(AnalystError::EmptyText);
        }
        info!(
            "Processing text of length: {} characters",
            full_text.chars().count()
        );

        let request = GenerationRequest {
            system: Some(prompts::REPORT_SYSTEM_PROMPT.to_string()),
            prompt: prompts::report_prompt(truncate_chars(full_text, config.report_excerpt_chars)),
            temperature: config.report_temperature,
            max_tokens: config.max_tokens,
        };
        let generation = generator.generate(&request).await?;
        let response = generation.text.trim();
        if response.is_empty() {
            error!("Empty response from AI model");
            return Err(AnalystError::EmptyResponse);
        }
        debug!("AI response length: {} characters", response.len());

        let (structure, origin) = decode_report_response(response, full_text);
        let report = ReportData::from_structure(&structure, full_text)?;
        info!(
            "Created report '{}' with {} charts ({:?})",
            report.id,
            report.charts.len(),
            origin
        );
        Ok(AnalyzedReport { report, origin })
    }

    /// Markdown analysis of one report.
    pub async fn generate_narrative(&self, report: &ReportData) -> Result<String, AnalystError> {
        let (generator, config) = self.live()?;

        let excerpt = truncate_chars(&report.full_text, config.narrative_excerpt_chars);
        let request = GenerationRequest {
            system: None,
            prompt: prompts::narrative_prompt(report, excerpt),
            temperature: config.narrative_temperature,
            max_tokens: config.max_tokens,
        };
        non_empty(generator.generate(&request).await?.text)
    }

    /// Cross-report synthesis of every given report.
    pub async fn generate_storyboard(
        &self,
        reports: &[ReportData],
    ) -> Result<StoryboardData, AnalystError> {
        let (generator, config) = self.live()?;
        if reports.is_empty() {
            return Err(AnalystError::NoReports);
        }

        let request = GenerationRequest {
            system: Some(prompts::STORYBOARD_SYSTEM_PROMPT.to_string()),
            prompt: prompts::storyboard_prompt(reports),
            temperature: config.storyboard_temperature,
            max_tokens: config.max_tokens,
        };
        let text = non_empty(generator.generate(&request).await?.text)?;

        let structure = recover_object(&text, FieldRepair::NARRATIVE).map_err(|e| {
            error!("Failed to parse storyboard JSON: {e}");
            e
        })?;
        let storyboard = StoryboardData::from_structure(&structure)?;
        info!(
            "Storyboard '{}' built from {} reports",
            storyboard.title,
            reports.len()
        );
        Ok(storyboard)
    }

    /// Answer a question about one report.
    pub async fn chat(&self, report: &ReportData, message: &str) -> Result<String, AnalystError> {
        let (generator, config) = self.live()?;

        let excerpt = truncate_chars(&report.full_text, config.chat_excerpt_chars);
        let request = GenerationRequest {
            system: Some(prompts::chat_system_prompt(report, excerpt)),
            prompt: prompts::chat_prompt(message),
            temperature: config.chat_temperature,
            max_tokens: config.chat_max_tokens,
        };
        non_empty(generator.generate(&request).await?.text)
    }
}

fn decode_report_response(response: &str, full_text: &str) -> (ParsedStructure, ReportOrigin) {
    match serde_json::from_str::<ParsedStructure>(response) {
        Ok(structure) => {
            debug!("JSON parsing successful with direct decode");
            (structure, ReportOrigin::Model)
        }
        Err(e) => {
            warn!("Direct JSON decode failed: {e}");
            match recover_object(response, FieldRepair::SUMMARY) {
                Ok(structure) => {
                    info!("JSON recovered from model response");
                    (structure, ReportOrigin::Recovered)
                }
                Err(e) => {
                    warn!("JSON recovery failed ({e}); attempting fallback report creation");
                    (synthesize_report(full_text), ReportOrigin::Fallback)
                }
            }
        }
    }
}

fn non_empty(text: String) -> Result<String, AnalystError> {
    if text.trim().is_empty() {
        Err(AnalystError::EmptyResponse)
    } else {
        Ok(text)
    }
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
