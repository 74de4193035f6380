//! Degraded report synthesis for when no JSON can be recovered from the model.
//!
//! The result is built from the document text alone with simple line
//! heuristics. It carries no charts and is marked
//! [`crate::report::ReportOrigin::Fallback`] by the analyst.

use crate::pipeline::recover::ParsedStructure;
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::info;

pub const DEFAULT_TITLE: &str = "Economic Report";
pub const DEFAULT_SUMMARY: &str = "Report analysis and findings.";

const TITLE_SCAN_LINES: usize = 10;
const SUMMARY_MAX_CHARS: usize = 300;
const MAX_FINDINGS: usize = 5;

const GENERIC_FINDINGS: [&str; 5] = [
    "Analysis of economic trends and indicators",
    "Key policy implications and recommendations",
    "Statistical data and quantitative findings",
    "Comparative analysis with previous periods",
    "Future outlook and projections",
];

static RE_SLUG_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9\s-]").unwrap());
static RE_SLUG_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.").unwrap());
static RE_MARKERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[•\-\d.\s]+").unwrap());

/// Build a minimal report structure (`id`, `title`, `summary`,
/// `keyFindings`, empty `charts`) from document text.
pub fn synthesize_report(full_text: &str) -> ParsedStructure {
    info!("Creating fallback report structure");

    let lines: Vec<&str> = full_text.split('\n').collect();
    let title = pick_title(&lines);
    let id = slugify(&title).unwrap_or_else(timestamp_id);

    let mut structure = ParsedStructure::new();
    structure.insert("id".into(), Value::String(id));
    structure.insert("title".into(), Value::String(title));
    structure.insert("summary".into(), Value::String(summarize(full_text)));
    structure.insert("keyFindings".into(), json!(key_findings(&lines)));
    structure.insert("charts".into(), json!([]));
    structure
}

fn pick_title(lines: &[&str]) -> String {
    lines
        .iter()
        .take(TITLE_SCAN_LINES)
        .map(|line| line.trim())
        .find(|line| looks_like_title(line))
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

fn looks_like_title(line: &str) -> bool {
    let len = line.chars().count();
    len > 10
        && len < 200
        && !line.chars().all(|c| c.is_ascii_digit())
        && starts_uppercase(line)
        && !line.starts_with("Page")
        && !line.starts_with("www")
}

fn starts_uppercase(line: &str) -> bool {
    line.chars().next().is_some_and(char::is_uppercase)
}

/// URL-friendly id: lowercase, ASCII alphanumerics and hyphens only.
fn slugify(title: &str) -> Option<String> {
    let lowered = title.to_lowercase();
    let stripped = RE_SLUG_STRIP.replace_all(&lowered, "");
    let slug = RE_SLUG_SPACES.replace_all(stripped.trim(), "-");
    (!slug.is_empty()).then(|| slug.into_owned())
}

fn timestamp_id() -> String {
    format!("report-{}", Local::now().format("%Y%m%d-%H%M%S"))
}

fn summarize(full_text: &str) -> String {
    let Some(first) = full_text.split("\n\n").map(str::trim).find(|p| !p.is_empty()) else {
        return DEFAULT_SUMMARY.to_string();
    };
    if first.chars().count() > SUMMARY_MAX_CHARS {
        let head: String = first.chars().take(SUMMARY_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        first.to_string()
    }
}

fn key_findings(lines: &[&str]) -> Vec<String> {
    let mut findings = Vec::new();
    for line in lines.iter().map(|l| l.trim()) {
        if !is_finding_candidate(line) {
            continue;
        }
        let finding = RE_MARKERS.replace(line, "");
        if finding.chars().count() > 10 {
            findings.push(finding.into_owned());
            if findings.len() >= MAX_FINDINGS {
                break;
            }
        }
    }

    if findings.is_empty() {
        GENERIC_FINDINGS.iter().map(|f| f.to_string()).collect()
    } else {
        findings
    }
}

fn is_finding_candidate(line: &str) -> bool {
    let len = line.chars().count();
    line.starts_with('•')
        || line.starts_with('-')
        || RE_NUMBERED.is_match(line)
        || (len > 20 && len < 200 && starts_uppercase(line))
}
