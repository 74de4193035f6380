//! Integration tests for report-insights.
//!
//! Ingestion and analysis run against a stub extractor and a fake text
//! generator, so they need neither pdfium nor an API key. The pdfium tests
//! build small PDFs in memory and are skipped (with a message) when no
//! pdfium library can be bound.
//!
//! Run the pdfium tests with:
//!   PDFIUM_LIB_PATH=/path/to/dir cargo test --test pipeline -- --nocapture

use async_trait::async_trait;
use report_insights::{
    Analyst, DocumentExtractor, ExtractedDocument, GenerationError, Generation, GenerationRequest,
    IngestProgressCallback, InsightsConfig, PdfExtractor, ReportPipeline, TextGenerator,
    UploadedFile, Validation,
};
use report_insights::pipeline::input::report_path;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── PDF fixtures ─────────────────────────────────────────────────────────────

/// Build a PDF with one page per entry; `None` gives a page without any
/// text objects (what an image-only scan looks like to a text extractor).
fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
    let n = pages.len();
    let font_id = 3 + 2 * n;
    let mut objects: Vec<String> = Vec::new();

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        n
    ));

    for (i, page) in pages.iter().enumerate() {
        let content_id = 4 + 2 * i;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 {font_id} 0 R >> >> /Contents {content_id} 0 R >>"
        ));
        let stream = match page {
            Some(text) => format!("BT /F1 24 Tf 72 700 Td ({text}) Tj ET"),
            None => String::new(),
        };
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }
    let xref_at = out.len();
    out.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        out.push_str(&format!("{offset:010} 00000 n \n"));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    ));
    out.into_bytes()
}

/// Bind pdfium from `PDFIUM_LIB_PATH` or the system path, or skip the test.
macro_rules! pdfium_or_skip {
    () => {{
        let dir = std::env::var("PDFIUM_LIB_PATH").ok().map(PathBuf::from);
        match PdfExtractor::bind(dir.as_deref()) {
            Ok(extractor) => extractor,
            Err(e) => {
                println!("SKIP — pdfium not available: {e}");
                return;
            }
        }
    }};
}

// ── pdfium-backed extraction ─────────────────────────────────────────────────

#[test]
fn hello_world_pdf_validates_and_extracts() {
    let extractor = pdfium_or_skip!();
    let pdf = build_pdf(&[Some("Hello World")]);

    let validation = extractor.validate(&pdf);
    assert!(validation.is_valid, "{}", validation.message);
    assert!(validation.message.contains("1 pages"), "{}", validation.message);

    let text = extractor.extract_text(&pdf);
    assert!(text.contains("Hello World"), "got: {text:?}");
}

#[test]
fn page_without_text_is_skipped() {
    let extractor = pdfium_or_skip!();
    let pdf = build_pdf(&[Some("First page words"), None, Some("Third page words")]);

    assert!(extractor.validate(&pdf).message.contains("3 pages"));

    let doc = extractor.extract_document(&pdf);
    assert_eq!(doc.raw_page_texts.len(), 3);
    assert!(doc.raw_page_texts[1].trim().is_empty());
    assert!(doc.cleaned_text.contains("First page words"));
    assert!(doc.cleaned_text.contains("Third page words"));
}

#[test]
fn small_and_headerless_inputs_are_rejected() {
    let extractor = pdfium_or_skip!();

    for len in [1usize, 10, 99] {
        let v = extractor.validate(&vec![b'%'; len]);
        assert!(!v.is_valid);
        assert!(v.message.contains("too small"), "{}", v.message);
    }

    let mut not_pdf = b"GIF89a".to_vec();
    not_pdf.extend(build_pdf(&[Some("Hello World")]));
    let v = extractor.validate(&not_pdf);
    assert!(!v.is_valid);
    assert!(v.message.contains("valid PDF header"), "{}", v.message);

    let empty = extractor.validate(b"");
    assert!(!empty.is_valid);
    assert!(extractor.extract_text(b"").is_empty());
}

#[test]
fn corrupt_pdf_is_invalid_and_extracts_nothing() {
    let extractor = pdfium_or_skip!();
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.extend(std::iter::repeat(b'#').take(500));

    let v = extractor.validate(&bytes);
    assert!(!v.is_valid);
    assert!(v.message.starts_with("Invalid PDF format"), "{}", v.message);
    assert!(extractor.extract_text(&bytes).is_empty());
}

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Treats `%PDF-` bytes as a one-page document whose text is the rest of
/// the buffer; anything else is invalid.
struct StubExtractor;

impl DocumentExtractor for StubExtractor {
    fn validate(&self, bytes: &[u8]) -> Validation {
        if bytes.starts_with(b"%PDF-") {
            Validation {
                is_valid: true,
                message: "Valid PDF detected with 1 pages.".into(),
            }
        } else {
            Validation {
                is_valid: false,
                message: "File does not have a valid PDF header (%PDF- not found at beginning)."
                    .into(),
            }
        }
    }

    fn extract_document(&self, bytes: &[u8]) -> ExtractedDocument {
        let text = String::from_utf8_lossy(&bytes[5..]).into_owned();
        ExtractedDocument::from_pages(vec![text])
    }
}

/// Answers with a report whose id is the `DOC-<n>` marker found in the
/// prompt (`DOC-10` and up share an id; `DOC-20`/`DOC-21` differ only in a
/// space). Lower-numbered documents answer more slowly, so completion order
/// differs from input order.
struct KeyedGenerator {
    calls: AtomicUsize,
}

impl KeyedGenerator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TextGenerator for KeyedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = request
            .prompt
            .split_whitespace()
            .find_map(|w| w.strip_prefix("DOC-"))
            .and_then(|n| n.trim_matches(|c: char| !c.is_ascii_digit()).parse::<u64>().ok());

        let Some(n) = key else {
            return Ok(Generation {
                text: "no marker".into(),
                ..Default::default()
            });
        };
        tokio::time::sleep(Duration::from_millis(40u64.saturating_sub(n * 10))).await;

        let id = match n {
            20 => "energy prices".to_string(),
            21 => "energy-prices".to_string(),
            10.. => "shared".to_string(),
            _ => format!("doc-{n}"),
        };
        Ok(Generation {
            text: format!(
                r#"{{"id":"{id}","title":"Document {n}","summary":"S","keyFindings":["f"],"charts":[]}}"#
            ),
            ..Default::default()
        })
    }
}

fn body(marker: &str) -> String {
    format!(
        "{marker} The economy expanded moderately in the second quarter while inflation eased. \
         Investment remained weak and exports declined."
    )
}

fn pdf_upload(name: &str, marker: &str) -> UploadedFile {
    UploadedFile::new(name, format!("%PDF-{}", body(marker)).into_bytes())
}

fn pipeline(generator: Arc<KeyedGenerator>, config: InsightsConfig) -> ReportPipeline {
    ReportPipeline::new(
        Arc::new(StubExtractor),
        Arc::new(Analyst::new(generator, config.clone())),
        config,
    )
}

fn config() -> InsightsConfig {
    InsightsConfig::builder()
        .concurrency(4)
        .max_file_size(4096)
        .build()
        .unwrap()
}

// ── Ingestion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn mixed_batch_reports_each_failure_in_order() {
    let generator = KeyedGenerator::new();
    let files = vec![
        pdf_upload("one.PDF", "DOC-1"),
        UploadedFile {
            filename: None,
            bytes: b"%PDF-x".to_vec(),
        },
        UploadedFile::new("notes.txt", b"plain text".to_vec()),
        UploadedFile::new("empty.pdf", Vec::new()),
        UploadedFile::new("huge.pdf", vec![b'%'; 5000]),
        UploadedFile::new("fake.pdf", b"GIF89a not a pdf at all".to_vec()),
        UploadedFile::new("scan.pdf", b"%PDF-   ".to_vec()),
        UploadedFile::new("tiny.pdf", b"%PDF-Too little text here.".to_vec()),
        pdf_upload("two.pdf", "DOC-2"),
    ];

    let response = pipeline(generator.clone(), config())
        .ingest(files, &HashSet::new())
        .await;

    assert_eq!(response.success_count, 2);
    let ids: Vec<&str> = response.reports.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["doc-1", "doc-2"]);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);

    assert_eq!(
        response.errors,
        vec![
            "File 2: No filename provided".to_string(),
            "File 'notes.txt': Not a PDF file (only PDF files are supported)".to_string(),
            "File 'empty.pdf': Empty file".to_string(),
            "File 'huge.pdf': Too large (0.0MB, max: 0.00390625MB)".to_string(),
            "File 'fake.pdf': File does not have a valid PDF header (%PDF- not found at beginning)."
                .to_string(),
            "File 'scan.pdf': No text could be extracted. This might be an image-based PDF or scanned document."
                .to_string(),
            "File 'tiny.pdf': Extracted text too short (21 characters). Minimum 100 characters required."
                .to_string(),
        ]
    );
}

#[tokio::test]
async fn results_keep_input_order_under_concurrency() {
    let files: Vec<UploadedFile> = (0..4)
        .map(|n| pdf_upload(&format!("f{n}.pdf"), &format!("DOC-{n}")))
        .collect();

    let response = pipeline(KeyedGenerator::new(), config())
        .ingest(files, &HashSet::new())
        .await;

    let ids: Vec<&str> = response.reports.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["doc-0", "doc-1", "doc-2", "doc-3"]);
}

#[tokio::test]
async fn duplicate_ids_get_suffixes() {
    let files = vec![
        pdf_upload("a.pdf", "DOC-10"),
        pdf_upload("b.pdf", "DOC-11"),
        pdf_upload("c.pdf", "DOC-12"),
    ];
    let taken: HashSet<String> = ["shared".to_string()].into_iter().collect();

    let response = pipeline(KeyedGenerator::new(), config())
        .ingest(files, &taken)
        .await;

    let ids: Vec<&str> = response.reports.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["shared_1", "shared_2", "shared_3"]);
}

#[tokio::test]
async fn ids_differing_only_in_unsafe_characters_get_distinct_files() {
    let files = vec![
        pdf_upload("a.pdf", "DOC-20"),
        pdf_upload("b.pdf", "DOC-21"),
    ];
    let taken: HashSet<String> = ["energy-prices_1".to_string()].into_iter().collect();

    let response = pipeline(KeyedGenerator::new(), config())
        .ingest(files, &taken)
        .await;

    let ids: Vec<&str> = response.reports.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["energy-prices", "energy-prices_2"]);

    let out = Path::new("/out");
    let paths: Vec<PathBuf> = ids.iter().map(|id| report_path(out, id)).collect();
    assert_ne!(paths[0], paths[1]);
    assert_eq!(paths[1], PathBuf::from("/out/energy-prices_2.json"));
}

#[tokio::test]
async fn unavailable_analyst_fails_each_file() {
    let config = config();
    let pipeline = ReportPipeline::new(
        Arc::new(StubExtractor),
        Arc::new(Analyst::unavailable("no API key")),
        config,
    );

    let response = pipeline
        .ingest(vec![pdf_upload("a.pdf", "DOC-1")], &HashSet::new())
        .await;

    assert_eq!(response.success_count, 0);
    assert_eq!(response.errors.len(), 1);
    assert!(
        response.errors[0].starts_with("File 'a.pdf': AI could not generate a structured report"),
        "{}",
        response.errors[0]
    );
    assert!(response.errors[0].contains("no API key"));
}

#[tokio::test]
async fn unparseable_model_output_falls_back() {
    let response = pipeline(KeyedGenerator::new(), config())
        .ingest(
            vec![UploadedFile::new(
                "plain.pdf",
                format!("%PDF-Quarterly Economic Bulletin\n\n{}", body("none")).into_bytes(),
            )],
            &HashSet::new(),
        )
        .await;

    assert_eq!(response.success_count, 1, "{:?}", response.errors);
    let report = &response.reports[0];
    assert_eq!(report.id, "quarterly-economic-bulletin");
    assert!(report.charts.is_empty());
    assert!(report.full_text.contains("Quarterly Economic Bulletin"));
}

#[tokio::test]
async fn empty_batch_is_empty_response() {
    let response = pipeline(KeyedGenerator::new(), config())
        .ingest(Vec::new(), &HashSet::new())
        .await;
    assert_eq!(response, Default::default());
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl IngestProgressCallback for Recorder {
    fn on_batch_start(&self, total_files: usize) {
        self.events.lock().unwrap().push(format!("start {total_files}"));
    }

    fn on_file_complete(&self, index: usize, _total: usize, report_id: &str) {
        self.events.lock().unwrap().push(format!("ok {index} {report_id}"));
    }

    fn on_file_error(&self, index: usize, _total: usize, _error: &str) {
        self.events.lock().unwrap().push(format!("err {index}"));
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {success_count}/{total_files}"));
    }
}

#[tokio::test]
async fn progress_events_cover_every_file() {
    let recorder = Arc::new(Recorder::default());
    let config = InsightsConfig::builder().concurrency(1).build().unwrap();
    let pipeline = pipeline(KeyedGenerator::new(), config).with_progress(recorder.clone());

    pipeline
        .ingest(
            vec![
                pdf_upload("a.pdf", "DOC-1"),
                UploadedFile::new("b.txt", b"x".to_vec()),
            ],
            &HashSet::new(),
        )
        .await;

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(events, ["start 2", "ok 1 doc-1", "err 2", "done 1/2"]);
}
