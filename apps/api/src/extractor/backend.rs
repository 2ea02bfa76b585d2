//! Text-extraction backends. The segmentation pipeline only ever sees
//! `PageText`, so the PDF library behind it is swappable.

use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;
use tracing::{debug, warn};

use crate::extractor::models::truncate_chars;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    Open(String),

    #[error("failed to extract text: {0}")]
    Extraction(String),

    #[error("PDF backend panicked on a malformed document")]
    Panicked,
}

/// Plain text of one page, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: usize,
    pub text: String,
}

impl PageText {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        PageText {
            number,
            text: text.into(),
        }
    }
}

/// A PDF text-extraction capability returning per-page plain text.
pub trait PdfTextBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Extracts at most `max_pages` pages. Implementations skip pages they
    /// cannot read instead of failing the whole document.
    fn extract_pages(&self, bytes: &[u8], max_pages: usize) -> Result<Vec<PageText>, BackendError>;
}

// ────────────────────────────────────────────────────────────────────────────
// pdf-extract (primary)
// ────────────────────────────────────────────────────────────────────────────

/// Page-by-page extraction through `pdf_extract`. Only the first `max_pages`
/// pages are decoded. The library panics on some malformed inputs, so every
/// call runs behind `catch_unwind`.
pub struct PdfExtractBackend;

fn pdf_extract_page(doc: &pdf_extract::Document, number: u32) -> Result<String, pdf_extract::OutputError> {
    let mut text = String::new();
    {
        let mut output = pdf_extract::PlainTextOutput::new(&mut text);
        pdf_extract::output_doc_page(doc, &mut output, number)?;
    }
    Ok(text)
}

impl PdfTextBackend for PdfExtractBackend {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract_pages(&self, bytes: &[u8], max_pages: usize) -> Result<Vec<PageText>, BackendError> {
        let doc = match panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::Document::load_mem(bytes)
        })) {
            Ok(Ok(doc)) => doc,
            Ok(Err(e)) => return Err(BackendError::Open(e.to_string())),
            Err(_) => return Err(BackendError::Panicked),
        };

        let mut pages = Vec::new();
        let mut failures = 0usize;
        let numbers: Vec<u32> = doc.get_pages().into_keys().take(max_pages).collect();
        for number in &numbers {
            match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract_page(&doc, *number))) {
                Ok(Ok(text)) => pages.push(PageText::new(*number as usize, text)),
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(page = number, error = %e, "Skipping unreadable PDF page");
                }
                Err(_) => {
                    failures += 1;
                    warn!(page = number, "Skipping PDF page: extraction panicked");
                }
            }
        }

        if pages.is_empty() && failures > 0 {
            return Err(BackendError::Extraction(format!(
                "none of the first {} pages could be decoded",
                numbers.len()
            )));
        }
        Ok(pages)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// lopdf (secondary)
// ────────────────────────────────────────────────────────────────────────────

/// Page-by-page extraction through `lopdf`. A page that fails is logged and
/// skipped.
pub struct LopdfBackend;

impl PdfTextBackend for LopdfBackend {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract_pages(&self, bytes: &[u8], max_pages: usize) -> Result<Vec<PageText>, BackendError> {
        let doc = match panic::catch_unwind(AssertUnwindSafe(|| lopdf::Document::load_mem(bytes))) {
            Ok(Ok(doc)) => doc,
            Ok(Err(e)) => return Err(BackendError::Open(e.to_string())),
            Err(_) => return Err(BackendError::Panicked),
        };

        let mut pages = Vec::new();
        for (number, _) in doc.get_pages().into_iter().take(max_pages) {
            match panic::catch_unwind(AssertUnwindSafe(|| doc.extract_text(&[number]))) {
                Ok(Ok(text)) => pages.push(PageText::new(number as usize, text)),
                Ok(Err(e)) => warn!(page = number, error = %e, "Skipping unreadable PDF page"),
                Err(_) => warn!(page = number, "Skipping PDF page: extraction panicked"),
            }
        }
        Ok(pages)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Primary → secondary chain
// ────────────────────────────────────────────────────────────────────────────

/// Tries `primary` first and falls back to `secondary` when the primary fails
/// or returns no text at all.
pub struct FallbackBackend {
    primary: Box<dyn PdfTextBackend>,
    secondary: Box<dyn PdfTextBackend>,
}

impl FallbackBackend {
    pub fn new(primary: Box<dyn PdfTextBackend>, secondary: Box<dyn PdfTextBackend>) -> Self {
        FallbackBackend { primary, secondary }
    }
}

impl Default for FallbackBackend {
    fn default() -> Self {
        FallbackBackend::new(Box::new(PdfExtractBackend), Box::new(LopdfBackend))
    }
}

impl PdfTextBackend for FallbackBackend {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    fn extract_pages(&self, bytes: &[u8], max_pages: usize) -> Result<Vec<PageText>, BackendError> {
        let primary = self.primary.extract_pages(bytes, max_pages);
        match &primary {
            Ok(pages) if has_text(pages) => return primary,
            Ok(_) => debug!(
                backend = self.primary.name(),
                "Primary backend returned no text, trying fallback"
            ),
            Err(e) => warn!(
                backend = self.primary.name(),
                fallback = self.secondary.name(),
                error = %e,
                "Primary PDF backend failed, trying fallback"
            ),
        }

        match self.secondary.extract_pages(bytes, max_pages) {
            Ok(pages) => Ok(pages),
            // Both failed: report the primary's error when it had one.
            Err(secondary_err) => match primary {
                Ok(pages) => Ok(pages),
                Err(primary_err) => {
                    warn!(error = %secondary_err, "Fallback PDF backend failed too");
                    Err(primary_err)
                }
            },
        }
    }
}

fn has_text(pages: &[PageText]) -> bool {
    pages.iter().any(|p| !p.text.trim().is_empty())
}

/// Runs `backend` and applies the processing caps: blank pages are dropped
/// and the page crossing `max_chars` is cut at the cap, ending collection.
pub fn collect_pages(
    backend: &dyn PdfTextBackend,
    bytes: &[u8],
    max_pages: usize,
    max_chars: usize,
) -> Result<Vec<PageText>, BackendError> {
    let mut collected = Vec::new();
    let mut total = 0usize;

    for mut page in backend.extract_pages(bytes, max_pages)? {
        if page.text.trim().is_empty() {
            continue;
        }
        let remaining = max_chars - total;
        let len = page.text.chars().count();
        if len >= remaining {
            if len > remaining {
                page.text = truncate_chars(&page.text, remaining);
            }
            debug!(total, max_chars, "Text cap reached, ignoring remaining text");
            if !page.text.trim().is_empty() {
                collected.push(page);
            }
            break;
        }
        total += len;
        collected.push(page);
    }

    Ok(collected)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Backend returning canned pages, for pipeline tests.
    pub(crate) struct StaticBackend(pub Vec<&'static str>);

    impl PdfTextBackend for StaticBackend {
        fn name(&self) -> &'static str {
            "static"
        }

        fn extract_pages(
            &self,
            _bytes: &[u8],
            max_pages: usize,
        ) -> Result<Vec<PageText>, BackendError> {
            Ok(self
                .0
                .iter()
                .take(max_pages)
                .enumerate()
                .map(|(i, t)| PageText::new(i + 1, *t))
                .collect())
        }
    }

    pub(crate) struct FailingBackend;

    impl PdfTextBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn extract_pages(&self, _: &[u8], _: usize) -> Result<Vec<PageText>, BackendError> {
            Err(BackendError::Open("not a PDF".to_string()))
        }
    }

    /// One-page PDF with each line drawn in Courier, built with lopdf.
    pub(crate) fn sample_pdf(lines: &[&str]) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![50.into(), 700.into()]),
        ];
        for line in lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("Td", vec![0.into(), (-16).into()]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_fallback_used_when_primary_fails() {
        let backend =
            FallbackBackend::new(Box::new(FailingBackend), Box::new(StaticBackend(vec!["hi"])));
        let pages = backend.extract_pages(b"", 10).unwrap();
        assert_eq!(pages, vec![PageText::new(1, "hi")]);
    }

    #[test]
    fn test_fallback_used_when_primary_is_blank() {
        let backend = FallbackBackend::new(
            Box::new(StaticBackend(vec!["  ", ""])),
            Box::new(StaticBackend(vec!["real text"])),
        );
        let pages = backend.extract_pages(b"", 10).unwrap();
        assert_eq!(pages[0].text, "real text");
    }

    #[test]
    fn test_primary_error_reported_when_both_fail() {
        let backend = FallbackBackend::new(Box::new(FailingBackend), Box::new(FailingBackend));
        let err = backend.extract_pages(b"", 10).unwrap_err();
        assert!(matches!(err, BackendError::Open(_)));
    }

    #[test]
    fn test_collect_pages_skips_blank_pages() {
        let backend = StaticBackend(vec!["one", "   ", "three"]);
        let pages = collect_pages(&backend, b"", 10, 100_000).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].number, 3);
    }

    #[test]
    fn test_collect_pages_stops_after_text_cap() {
        let backend = StaticBackend(vec!["aaaaa", "bbbbb", "ccccc"]);
        let pages = collect_pages(&backend, b"", 10, 7).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].text, "bb");
    }

    #[test]
    fn test_collect_pages_cuts_oversized_page_at_cap() {
        let huge: &'static str = Box::leak("wort ".repeat(100_000).into_boxed_str());
        let backend = StaticBackend(vec![huge, "second"]);
        let pages = collect_pages(&backend, b"", 10, 100_000).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].text.chars().count(), 100_000);
    }

    #[test]
    fn test_collect_pages_exact_fit_stops_collection() {
        let backend = StaticBackend(vec!["abc", "def"]);
        let pages = collect_pages(&backend, b"", 10, 3).unwrap();
        assert_eq!(pages, vec![PageText::new(1, "abc")]);
    }

    #[test]
    fn test_collect_pages_respects_page_cap() {
        let backend = StaticBackend(vec!["a", "b", "c", "d"]);
        let pages = collect_pages(&backend, b"", 2, 100_000).unwrap();
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn test_lopdf_reads_generated_pdf() {
        let pdf = sample_pdf(&["Hallo Welt"]);
        let pages = LopdfBackend.extract_pages(&pdf, 10).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].text.contains("Hallo Welt"));
    }

    #[test]
    fn test_lopdf_rejects_garbage() {
        assert!(LopdfBackend.extract_pages(b"definitely not a pdf", 10).is_err());
    }

    #[test]
    fn test_pdf_extract_rejects_garbage() {
        assert!(PdfExtractBackend.extract_pages(b"definitely not a pdf", 10).is_err());
    }
}
