//! PDF validation and text extraction via pdfium.
//!
//! ## Binding
//!
//! [`PdfExtractor::bind`] checks once, at construction, that a pdfium shared
//! library can be loaded, so a missing library is a startup error rather
//! than a per-upload one. Each call then binds its own `Pdfium` instance on
//! the calling thread; callers run extraction inside
//! `tokio::task::spawn_blocking`.
//!
//! ## Failure model
//!
//! Nothing here returns `Err` for bad input. [`DocumentExtractor::validate`]
//! folds every failure into a [`Validation`] with a human-readable reason and
//! extraction degrades to empty text. A page whose text cannot be read is
//! logged and skipped; the other pages still count.

use crate::error::{InsightsError, PdfRejection};
use crate::pipeline::clean::clean_text;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Inputs shorter than this cannot hold a PDF header, body and trailer.
pub const MIN_PDF_BYTES: usize = 100;

/// The signature every PDF begins with.
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Outcome of [`DocumentExtractor::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub is_valid: bool,
    pub message: String,
}

impl Validation {
    fn from_result(result: Result<usize, PdfRejection>) -> Self {
        match result {
            Ok(pages) => Self {
                is_valid: true,
                message: format!("Valid PDF detected with {pages} pages."),
            },
            Err(rejection) => Self {
                is_valid: false,
                message: rejection.to_string(),
            },
        }
    }
}

/// Raw and cleaned text of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// One entry per page in page order; empty for pages without text or
    /// whose text could not be read.
    pub raw_page_texts: Vec<String>,
    pub cleaned_text: String,
}

impl ExtractedDocument {
    /// Join the non-empty page texts with a blank line and clean the result.
    pub fn from_pages(raw_page_texts: Vec<String>) -> Self {
        let joined = raw_page_texts
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        let cleaned_text = clean_text(&joined);
        Self {
            raw_page_texts,
            cleaned_text,
        }
    }
}

/// Validation and text extraction of in-memory PDF bytes.
///
/// Implemented by [`PdfExtractor`]; ingestion only depends on this trait.
pub trait DocumentExtractor: Send + Sync {
    fn validate(&self, bytes: &[u8]) -> Validation;

    fn extract_document(&self, bytes: &[u8]) -> ExtractedDocument;

    /// Cleaned text of the whole document; empty when nothing is readable.
    fn extract_text(&self, bytes: &[u8]) -> String {
        self.extract_document(bytes).cleaned_text
    }
}

/// Checks that need no PDF engine: emptiness, minimum size, signature.
pub fn preflight(bytes: &[u8]) -> Result<(), PdfRejection> {
    if bytes.is_empty() {
        return Err(PdfRejection::Empty);
    }
    if bytes.len() < MIN_PDF_BYTES {
        return Err(PdfRejection::TooSmall { len: bytes.len() });
    }
    if !bytes.starts_with(PDF_SIGNATURE) {
        return Err(PdfRejection::BadHeader);
    }
    Ok(())
}

/// pdfium-backed [`DocumentExtractor`].
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    lib_dir: Option<PathBuf>,
}

impl PdfExtractor {
    /// Verify that pdfium can be bound from `lib_dir` (or the system library
    /// path when `None`).
    pub fn bind(lib_dir: Option<&Path>) -> Result<Self, InsightsError> {
        let extractor = Self {
            lib_dir: lib_dir.map(Path::to_path_buf),
        };
        extractor.pdfium()?;
        info!(
            "pdfium bound from {}",
            extractor
                .lib_dir
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "system library path".to_string())
        );
        Ok(extractor)
    }

    fn pdfium(&self) -> Result<Pdfium, InsightsError> {
        let bindings = match &self.lib_dir {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| InsightsError::PdfiumBindingFailed(format!("{e:?}")))?;
        Ok(Pdfium::new(bindings))
    }

    fn page_count(&self, bytes: &[u8]) -> Result<usize, PdfRejection> {
        preflight(bytes)?;
        let pdfium = self
            .pdfium()
            .map_err(|e| PdfRejection::Corrupt(e.to_string()))?;
        let document = open(&pdfium, bytes)?;
        match document.pages().len() as usize {
            0 => Err(PdfRejection::NoPages),
            n => Ok(n),
        }
    }

    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, PdfRejection> {
        let pdfium = self
            .pdfium()
            .map_err(|e| PdfRejection::Corrupt(e.to_string()))?;
        let document = open(&pdfium, bytes)?;
        let pages = document.pages();
        let total = pages.len() as usize;
        debug!("PDF loaded: {total} pages");

        let mut texts = Vec::with_capacity(total);
        for (idx, page) in pages.iter().enumerate() {
            match page.text() {
                Ok(text) => texts.push(text.all()),
                Err(e) => {
                    warn!("Page {}: text extraction failed — {:?}", idx + 1, e);
                    texts.push(String::new());
                }
            }
        }
        Ok(texts)
    }
}

impl DocumentExtractor for PdfExtractor {
    fn validate(&self, bytes: &[u8]) -> Validation {
        Validation::from_result(self.page_count(bytes))
    }

    fn extract_document(&self, bytes: &[u8]) -> ExtractedDocument {
        if bytes.is_empty() {
            return ExtractedDocument::default();
        }
        match self.page_texts(bytes) {
            Ok(pages) => {
                let doc = ExtractedDocument::from_pages(pages);
                info!(
                    "Extracted {} characters from {} pages",
                    doc.cleaned_text.chars().count(),
                    doc.raw_page_texts.len()
                );
                doc
            }
            Err(rejection) => {
                error!("PDF text extraction failed: {rejection}");
                ExtractedDocument::default()
            }
        }
    }
}

/// Open with the empty password, mapping pdfium errors to rejection reasons.
fn open<'a>(pdfium: &'a Pdfium, bytes: &'a [u8]) -> Result<PdfDocument<'a>, PdfRejection> {
    pdfium
        .load_pdf_from_byte_slice(bytes, Some(""))
        .map_err(|e| rejection_for_load_error(format!("{e:?}")))
}

/// Classify a pdfium load error by its debug text. Password failures (the
/// empty password did not decrypt the document) get their own reason.
fn rejection_for_load_error(detail: String) -> PdfRejection {
    if detail.contains("Password") || detail.contains("password") {
        warn!("Could not decrypt PDF with an empty password: {detail}");
        PdfRejection::Encrypted
    } else {
        PdfRejection::Corrupt(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_errors_are_encrypted_rejections() {
        let rejection =
            rejection_for_load_error("PdfiumLibraryInternalError(PasswordError)".to_string());
        assert_eq!(rejection, PdfRejection::Encrypted);

        let v = Validation::from_result(Err(rejection));
        assert!(!v.is_valid);
        assert_eq!(
            v.message,
            "PDF is encrypted and could not be decrypted with an empty password."
        );
    }

    #[test]
    fn other_load_errors_are_corrupt() {
        let rejection =
            rejection_for_load_error("PdfiumLibraryInternalError(FormatError)".to_string());
        assert_eq!(
            rejection,
            PdfRejection::Corrupt("PdfiumLibraryInternalError(FormatError)".into())
        );
        assert!(Validation::from_result(Err(rejection))
            .message
            .starts_with("Invalid PDF format or corrupted file"));
    }

    #[test]
    fn preflight_rejects_empty() {
        assert_eq!(preflight(b""), Err(PdfRejection::Empty));
    }

    #[test]
    fn preflight_rejects_every_short_input() {
        for len in 1..MIN_PDF_BYTES {
            let bytes = vec![b'%'; len];
            assert_eq!(preflight(&bytes), Err(PdfRejection::TooSmall { len }));
        }
    }

    #[test]
    fn preflight_rejects_missing_signature_regardless_of_content() {
        let mut bytes = b"%PDX-1.4\n".to_vec();
        bytes.extend(std::iter::repeat(b'x').take(200));
        bytes.extend_from_slice(b"%PDF-1.4 trailer");
        assert_eq!(preflight(&bytes), Err(PdfRejection::BadHeader));
    }

    #[test]
    fn preflight_accepts_signature() {
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.resize(MIN_PDF_BYTES, b' ');
        assert_eq!(preflight(&bytes), Ok(()));
    }

    #[test]
    fn validation_messages() {
        let ok = Validation::from_result(Ok(1));
        assert!(ok.is_valid);
        assert_eq!(ok.message, "Valid PDF detected with 1 pages.");

        let bad = Validation::from_result(Err(PdfRejection::TooSmall { len: 3 }));
        assert!(!bad.is_valid);
        assert!(bad.message.contains("too small"));
    }

    #[test]
    fn pages_joined_with_blank_line_skipping_empty() {
        let doc = ExtractedDocument::from_pages(vec![
            "First page text".into(),
            "   ".into(),
            String::new(),
            "Third page text".into(),
        ]);
        assert_eq!(doc.raw_page_texts.len(), 4);
        assert_eq!(doc.cleaned_text, "First page text\n\nThird page text");
    }

    #[test]
    fn no_text_pages_give_empty_document() {
        let doc = ExtractedDocument::from_pages(vec![String::new(), String::new()]);
        assert!(doc.cleaned_text.is_empty());
    }
}
