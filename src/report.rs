//! Report, chart and storyboard types plus validation of decoded model output.
//!
//! Everything here serialises with the camelCase field names of the report
//! JSON contract, so a [`ReportData`] written by `insights report` can be read
//! back by any consumer of that contract (and by `insights narrative`).
//!
//! Model output arrives as a [`ParsedStructure`]. [`ReportData::from_structure`]
//! and [`StoryboardData::from_structure`] turn it into typed values: required
//! fields are enforced, malformed chart entries are logged and dropped, and
//! storyboard gaps are filled with defaults.

use crate::error::ReportError;
use crate::pipeline::recover::ParsedStructure;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Keys a decoded structure must carry before it becomes a report.
pub const REQUIRED_REPORT_FIELDS: [&str; 4] = ["id", "title", "summary", "keyFindings"];

pub const NO_INTROSPECTION: &str = "No introspection provided by AI.";
pub const NO_RETROSPECTION: &str = "No retrospection provided by AI.";

// ── Charts ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
}

/// A single cell of a chart data point: the category label or a measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Number(serde_json::Number),
    Text(String),
}

/// One plotted series of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataKey {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "stackId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stack_id: Option<String>,
}

/// A chart descriptor a frontend can render without further processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub data: Vec<BTreeMap<String, DataValue>>,
    pub data_keys: Vec<DataKey>,
    pub title: String,
    pub description: String,
    pub x_axis_key: String,
}

// ── Reports ──────────────────────────────────────────────────────────────────

/// A structured report built from one PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub charts: Vec<ChartConfig>,
    #[serde(default)]
    pub full_text: String,
}

impl ReportData {
    /// Validate a decoded structure and attach the document text.
    ///
    /// Missing required keys are reported together. Chart entries that do
    /// not deserialize are dropped one by one; the report stays valid.
    pub fn from_structure(
        structure: &ParsedStructure,
        full_text: impl Into<String>,
    ) -> Result<Self, ReportError> {
        let missing: Vec<String> = REQUIRED_REPORT_FIELDS
            .iter()
            .filter(|key| !structure.contains_key(**key))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            let available: Vec<&String> = structure.keys().collect();
            warn!("Missing required fields: {missing:?} (available: {available:?})");
            return Err(ReportError::MissingFields(missing));
        }

        let charts = parse_charts(structure.get("charts"), "report");
        debug!("Report structure valid with {} charts", charts.len());

        Ok(Self {
            id: field(structure, "id")?,
            title: field(structure, "title")?,
            summary: field(structure, "summary")?,
            key_findings: field(structure, "keyFindings")?,
            charts,
            full_text: full_text.into(),
        })
    }
}

/// How a report's structure was obtained from the model response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportOrigin {
    /// The response decoded as JSON directly.
    Model,
    /// The response needed fence stripping, boundary detection or repair.
    Recovered,
    /// Nothing was recoverable; the report was synthesised from the text.
    Fallback,
}

/// A report together with how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedReport {
    pub report: ReportData,
    pub origin: ReportOrigin,
}

/// Result of one ingestion batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub reports: Vec<ReportData>,
    pub errors: Vec<String>,
    pub success_count: usize,
}

// ── Storyboard ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub label: String,
}

/// Connections between source reports: nodes are report ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

/// A stakeholder of the storyboard narrative. `icon` is a Font Awesome class string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyActor {
    pub name: String,
    pub description: String,
    pub icon: String,
}

impl KeyActor {
    fn new(name: &str, description: &str, icon: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
        }
    }

    /// Actors used when the model names none.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(
                "Policymakers (Federal/State/Municipal)",
                "Responsible for creating incentives, regulations, and investment frameworks to guide structural transformations and address social inequalities.",
                "fa-solid fa-landmark",
            ),
            Self::new(
                "German Households",
                "Experience the direct effects of economic stagnation, climate costs (heating, transport), and social policies (care burden, health access).",
                "fa-solid fa-users",
            ),
            Self::new(
                "German Industry",
                "Faces challenges adapting to higher energy costs, international competition, and the need to decarbonize while maintaining competitiveness.",
                "fa-solid fa-industry",
            ),
            Self::new(
                "Energy Sector",
                "Navigating the shift from fossil fuels to renewables, requiring massive investment in generation, grids, and network decommissioning.",
                "fa-solid fa-bolt",
            ),
            Self::new(
                "Property Owners / Landlords",
                "Key decision-makers for building renovations and investments in heating systems, influenced by financing, standards, and tenancy laws.",
                "fa-solid fa-building",
            ),
            Self::new(
                "European Central Bank (ECB)",
                "Sets monetary policy influencing financing conditions, inflation, and overall economic stability in the Euro Area, including Germany.",
                "fa-solid fa-euro-sign",
            ),
        ]
    }
}

/// Cross-report synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryboardData {
    #[serde(default)]
    pub title: String,
    pub narrative: String,
    #[serde(default)]
    pub charts: Vec<ChartConfig>,
    pub introspection: String,
    pub retrospection: String,
    #[serde(default)]
    pub relationship_graph: RelationshipGraph,
    pub key_actors: Vec<KeyActor>,
}

impl StoryboardData {
    /// Build a storyboard from a decoded structure.
    ///
    /// Only `narrative` is required. Empty or missing introspection and
    /// retrospection get placeholder text; a missing, empty or unusable actor
    /// list is replaced by [`KeyActor::defaults`].
    pub fn from_structure(structure: &ParsedStructure) -> Result<Self, ReportError> {
        if !structure.contains_key("narrative") {
            return Err(ReportError::MissingFields(vec!["narrative".to_string()]));
        }

        let title = match structure.get("title") {
            None | Some(Value::Null) => String::new(),
            Some(_) => field(structure, "title")?,
        };

        let relationship_graph = match structure.get("relationshipGraph") {
            None | Some(Value::Null) => RelationshipGraph::default(),
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                warn!("Ignoring malformed relationshipGraph: {e}");
                RelationshipGraph::default()
            }),
        };

        Ok(Self {
            title,
            narrative: field(structure, "narrative")?,
            charts: parse_charts(structure.get("charts"), "storyboard"),
            introspection: text_or(structure, "introspection", NO_INTROSPECTION),
            retrospection: text_or(structure, "retrospection", NO_RETROSPECTION),
            relationship_graph,
            key_actors: parse_actors(structure.get("keyActors")),
        })
    }
}

/// File-safe form of a report id: ASCII alphanumerics, `-` and `_` kept,
/// everything else replaced with `-`. An empty id becomes `report`.
///
/// Ids are compared and stored in this form, so two ids never share an
/// output file.
pub fn file_safe_id(id: &str) -> String {
    let safe: String = id
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    if safe.is_empty() {
        "report".to_string()
    } else {
        safe
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn field<T: DeserializeOwned>(structure: &ParsedStructure, key: &str) -> Result<T, ReportError> {
    let value = structure.get(key).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| ReportError::InvalidField {
        field: key.to_string(),
        detail: e.to_string(),
    })
}

fn text_or(structure: &ParsedStructure, key: &str, placeholder: &str) -> String {
    match structure.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => placeholder.to_string(),
    }
}

fn parse_charts(value: Option<&Value>, context: &str) -> Vec<ChartConfig> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!("Ignoring non-list charts in {context}: {other}");
            return Vec::new();
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<ChartConfig>(item.clone()) {
            Ok(chart) => Some(chart),
            Err(e) => {
                warn!("Invalid chart data in {context} (chart {}): {e}", i + 1);
                debug!("Chart data: {item}");
                None
            }
        })
        .collect()
}

fn parse_actors(value: Option<&Value>) -> Vec<KeyActor> {
    let actors: Vec<KeyActor> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    };
    if actors.is_empty() {
        KeyActor::defaults()
    } else {
        actors
    }
}
