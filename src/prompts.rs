//! Prompts for report structuring, narratives, storyboards and chat.
//!
//! Every prompt lives here so wording changes never touch retry, parsing or
//! validation code, and so tests can inspect what is sent to the model.
//! Excerpts are truncated by the caller ([`crate::analyst`]) before they get
//! here.

use crate::report::ReportData;
use serde::Serialize;

/// System prompt for turning report text into a report JSON object.
pub const REPORT_SYSTEM_PROMPT: &str = r##"You are an expert data analyst. You read economic reports and convert them into a single structured JSON object.

Your output MUST be ONLY a JSON object with this structure:
{
  "id": "url-friendly-slug",
  "title": "Report Title",
  "summary": "2-3 sentence summary",
  "keyFindings": ["Finding 1", "Finding 2", "Finding 3"],
  "charts": [
    {
      "type": "bar|line|pie",
      "data": [{ "name": "Category", "value": 123 }],
      "dataKeys": [{ "key": "value", "color": "#8884d8" }],
      "title": "Chart Title",
      "description": "Chart description",
      "xAxisKey": "name"
    }
  ]
}

Rules:
1. The title reflects the report's main subject.
2. The id is the title as a URL slug ("Women in Leadership" becomes "women-in-leadership").
3. The summary is concise.
4. keyFindings holds the most important points.
5. Charts only use quantities stated in the text. If there are none, return "charts": [].
6. Do not wrap the object in Markdown fences or add any other text."##;

/// System prompt for the cross-report storyboard.
pub const STORYBOARD_SYSTEM_PROMPT: &str = r##"You are a macroeconomic strategist. You read a collection of economic reports and find the single underlying story that connects them.

Your output MUST be ONLY a JSON object with these fields:
{
  "title": "short overarching title",
  "narrative": "Markdown thesis: state the central theme, show how each report supports it, the combined implications, and a forward-looking conclusion",
  "charts": [ChartConfig, ...],
  "introspection": "Markdown: the evidence and connections that led to the thesis",
  "retrospection": "Markdown: one alternative thesis you rejected and the data you would want next",
  "relationshipGraph": {
    "nodes": [{ "id": "report id", "title": "report title" }],
    "edges": [{ "source": "report id", "target": "report id", "label": "causal link" }]
  },
  "keyActors": [{ "name": "...", "description": "...", "icon": "fa-solid fa-users" }]
}

ChartConfig is { "type": "bar|line|pie", "data": [{ "name": "...", "<key>": number }], "dataKeys": [{ "key": "...", "color": "#hex" }], "title": "...", "description": "...", "xAxisKey": "name" }.

Rules:
1. Keep the fields in the order shown; "charts" must directly follow "narrative".
2. 1-2 charts that visualise the thesis itself rather than copying source charts, or [] if none fit.
3. One node per source report; 2-4 edges for the most important links.
4. 4-6 key actors, each with a Font Awesome 6 class string as icon.
5. Do not wrap the object in Markdown fences or add any other text."##;

/// User prompt carrying the report text to structure.
pub fn report_prompt(excerpt: &str) -> String {
    format!("Here is the report text:\n---\n{excerpt}\n---")
}

/// Prompt for a Markdown analysis of one report.
pub fn narrative_prompt(report: &ReportData, excerpt: &str) -> String {
    let findings = report
        .key_findings
        .iter()
        .map(|f| format!("  - {f}"))
        .collect::<Vec<_>>()
        .join("\n");
    let charts = serde_json::to_string_pretty(&report.charts).unwrap_or_else(|_| "[]".into());

    format!(
        r#"You are an economic data analyst. Based on the following data from the report "{title}", write a narrative analysis.

Your analysis should:
1. Open with a short high-level summary of the main issue.
2. Explain the key trends shown in the data and charts.
3. Discuss how the findings connect to other economic sectors or social issues.
4. Close with a forward-looking takeaway.
5. Be formatted in GitHub-flavored Markdown.

- **Report Title:** {title}
- **Summary:** {summary}
- **Key Findings:**
{findings}
- **Chart Data:** {charts}
- **Report Excerpt:**
---
{excerpt}
---"#,
        title = report.title,
        summary = report.summary,
    )
}

/// Compact view of a report for the storyboard prompt; the full text is left out.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoryboardSource<'a> {
    id: &'a str,
    title: &'a str,
    summary: &'a str,
    key_findings: &'a [String],
    charts: &'a [crate::report::ChartConfig],
}

/// User prompt listing every source report as JSON.
pub fn storyboard_prompt(reports: &[ReportData]) -> String {
    let sources: Vec<StoryboardSource<'_>> = reports
        .iter()
        .map(|r| StoryboardSource {
            id: &r.id,
            title: &r.title,
            summary: &r.summary,
            key_findings: &r.key_findings,
            charts: &r.charts,
        })
        .collect();
    let json = serde_json::to_string_pretty(&sources).unwrap_or_else(|_| "[]".into());
    format!("Source reports ({}):\n{json}", reports.len())
}

/// System instruction grounding a chat on one report.
pub fn chat_system_prompt(report: &ReportData, excerpt: &str) -> String {
    format!(
        r#"You are an assistant specialising in economic data. Your knowledge base for this conversation is the report "{title}".

Answer the user's questions concisely and stay within the report context. Summarise findings or explain charts when asked, and mention connections to other economic areas where relevant.

Report context:
- **Title:** {title}
- **Summary:** {summary}
- **Key Findings:** {findings}
- **Full Text:** {excerpt}"#,
        title = report.title,
        summary = report.summary,
        findings = report.key_findings.join(", "),
    )
}

pub fn chat_prompt(message: &str) -> String {
    format!("User question: {message}\n\nGive a helpful, concise answer based on the report above.")
}
