//! Text normalisation: deterministic cleanup of text extracted from PDF pages.
//!
//! pdfium returns text the way it is laid out on the page: hard line breaks
//! inside sentences, runs of spaces used for justification, form feeds
//! between pages, and stray page numbers or running headers on lines of
//! their own. Downstream the text is sent to a language model, which cares
//! about sentences and paragraphs, not layout.
//!
//! ## Rule Order
//!
//! 1. Convert carriage returns and form feeds to newlines
//! 2. Collapse runs of horizontal whitespace to a single space
//! 3. Remove spaces before punctuation (`, . ! ? ; :`)
//! 4. Normalise the space after punctuation to exactly one
//! 5. Trim every line; drop lines of 1–3 characters (page numbers, headers),
//!    keep blank lines as paragraph breaks
//! 6. Collapse 3+ consecutive newlines to exactly two
//! 7. Trim the whole text
//!
//! Short lines are dropped before blank lines are collapsed, so a removed
//! page number never leaves a gap wider than one paragraph break. The whole
//! pipeline is idempotent: `clean_text(&clean_text(x)) == clean_text(x)`.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Lines whose trimmed length is at most this many characters are treated
/// as layout artefacts.
const MAX_ARTIFACT_LINE_CHARS: usize = 3;

struct CleaningRules {
    horizontal_ws: Regex,
    space_before_punct: Regex,
    space_after_punct: Regex,
    excess_newlines: Regex,
}

impl CleaningRules {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            horizontal_ws: Regex::new(r"[^\S\n]+")?,
            space_before_punct: Regex::new(r" +([,.!?;:])")?,
            space_after_punct: Regex::new(r"([,.!?;:]) +")?,
            excess_newlines: Regex::new(r"\n{3,}")?,
        })
    }

    fn apply(&self, text: &str) -> String {
        let s = normalise_breaks(text);
        let s = self.horizontal_ws.replace_all(&s, " ");
        let s = self.space_before_punct.replace_all(&s, "$1");
        let s = self.space_after_punct.replace_all(&s, "$1 ");
        let s = drop_artifact_lines(&s);
        let s = self.excess_newlines.replace_all(&s, "\n\n");
        s.trim().to_string()
    }
}

static RULES: Lazy<Result<CleaningRules, regex::Error>> = Lazy::new(CleaningRules::compile);

/// Clean text extracted from a PDF.
///
/// Cleaning is best-effort: if the rules cannot be compiled the input is
/// returned with only a trim applied.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    match RULES.as_ref() {
        Ok(rules) => rules.apply(text),
        Err(e) => {
            warn!("Error cleaning text: {e}. Returning original text (trimmed).");
            text.trim().to_string()
        }
    }
}

fn normalise_breaks(input: &str) -> String {
    input.replace(['\r', '\u{000C}'], "\n")
}

fn drop_artifact_lines(input: &str) -> String {
    input
        .split('\n')
        .map(str::trim)
        .filter(|line| line.is_empty() || line.chars().count() > MAX_ARTIFACT_LINE_CHARS)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ────────────────────────────────────────────────────────────────────
