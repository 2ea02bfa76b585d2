//! Wrapper kept for older exports: the marker pipeline runs on pdf-extract
//! alone, and when it fails outright one simplified lopdf attempt (first
//! pages, raw text, naive truncation) is made before handing back the error
//! placeholder.

use std::sync::Arc;

use tracing::{info, warn};

use crate::extractor::backend::{LopdfBackend, PdfExtractBackend, PdfTextBackend};
use crate::extractor::models::{truncate_chars, ExtractedPost};
use crate::extractor::{ExtractPosts, ExtractorOptions, PostExtractor};

const SECONDARY_MAX_PAGES: usize = 5;
const SECONDARY_MAX_CHARS: usize = 1000;

pub struct LegacyExtractor {
    primary: PostExtractor,
    secondary: Box<dyn PdfTextBackend>,
}

impl LegacyExtractor {
    pub fn new(options: ExtractorOptions) -> Self {
        Self::with_backends(Arc::new(PdfExtractBackend), Box::new(LopdfBackend), options)
    }

    /// `primary` feeds the marker pipeline; `secondary` must be a different
    /// text path or the second attempt can only repeat the first one's failure.
    pub fn with_backends(
        primary: Arc<dyn PdfTextBackend>,
        secondary: Box<dyn PdfTextBackend>,
        options: ExtractorOptions,
    ) -> Self {
        LegacyExtractor {
            primary: PostExtractor::new(primary, options),
            secondary,
        }
    }

    fn secondary_attempt(&self, bytes: &[u8]) -> Option<ExtractedPost> {
        let pages = match self.secondary.extract_pages(bytes, SECONDARY_MAX_PAGES) {
            Ok(pages) => pages,
            Err(e) => {
                warn!(backend = self.secondary.name(), error = %e, "Simplified extraction failed");
                return None;
            }
        };

        let text = pages
            .iter()
            .map(|p| p.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if text.is_empty() {
            return None;
        }

        let content = if text.chars().count() > SECONDARY_MAX_CHARS {
            format!("{}...", truncate_chars(&text, SECONDARY_MAX_CHARS))
        } else {
            text
        };

        info!(pages = pages.len(), "Recovered text with simplified extraction");
        Some(ExtractedPost {
            title: "Imported content (simplified extraction)".to_string(),
            content,
            hashtags: "#import".to_string(),
            ..Default::default()
        })
    }
}

impl ExtractPosts for LegacyExtractor {
    fn extract(&self, bytes: &[u8]) -> Vec<ExtractedPost> {
        match self.primary.try_extract(bytes) {
            Ok(posts) => posts,
            Err(e) => {
                warn!(error = %e, "LinkedIn pipeline failed, attempting simplified extraction");
                match self.secondary_attempt(bytes) {
                    Some(post) => vec![post],
                    None => vec![ExtractedPost::error_placeholder(&e.to_string())],
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::extractor::backend::tests::{sample_pdf, FailingBackend, StaticBackend};
    use crate::extractor::backend::FallbackBackend;
    use crate::extractor::{build_extractor, ImportParser};

    fn options() -> ExtractorOptions {
        ExtractorOptions::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    fn legacy(
        primary: impl PdfTextBackend + 'static,
        secondary: impl PdfTextBackend + 'static,
    ) -> LegacyExtractor {
        LegacyExtractor::with_backends(Arc::new(primary), Box::new(secondary), options())
    }

    #[test]
    fn test_default_wiring_uses_distinct_backends() {
        let legacy = LegacyExtractor::new(options());
        assert_eq!(legacy.primary.backend.name(), "pdf-extract");
        assert_eq!(legacy.secondary.name(), "lopdf");
    }

    #[test]
    fn test_primary_result_used_when_it_succeeds() {
        let legacy = legacy(
            StaticBackend(vec!["Jane Doe 2 Tage • Hallo #welt"]),
            FailingBackend,
        );
        let posts = legacy.extract(b"pdf");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].hashtags, "#welt");
    }

    #[test]
    fn test_secondary_attempt_after_primary_failure() {
        let long: &'static str = Box::leak("z".repeat(1500).into_boxed_str());
        let legacy = legacy(
            FailingBackend,
            StaticBackend(vec![long, "p2", "p3", "p4", "p5", "p6"]),
        );
        let posts = legacy.extract(b"pdf");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].hashtags, "#import");
        assert_eq!(posts[0].content.chars().count(), SECONDARY_MAX_CHARS + 3);
        assert!(posts[0].content.ends_with("..."));
    }

    #[test]
    fn test_secondary_only_reads_first_five_pages() {
        let legacy = legacy(
            FailingBackend,
            StaticBackend(vec!["p1", "p2", "p3", "p4", "p5", "p6"]),
        );
        let posts = legacy.extract(b"pdf");
        assert_eq!(posts[0].content, "p1\np2\np3\np4\np5");
    }

    #[test]
    fn test_error_placeholder_when_both_fail() {
        let posts = legacy(FailingBackend, FailingBackend).extract(b"pdf");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].hashtags, "#import #error");
    }

    #[test]
    fn test_configured_legacy_parser_reads_real_pdf() {
        let pdf = sample_pdf(&["Anna Schmidt 2 Wochen", "Hallo Welt #rust"]);
        let extractor = build_extractor(
            ImportParser::Legacy,
            Arc::new(FallbackBackend::default()),
            options(),
        );
        let posts = extractor.extract(&pdf);
        assert!(!posts.is_empty());
        assert!(!posts[0].is_error_placeholder());
        assert!(posts.iter().any(|p| p.content.contains("Hallo")));
    }

    #[test]
    fn test_configured_legacy_parser_on_garbage() {
        let extractor = build_extractor(
            ImportParser::Legacy,
            Arc::new(FallbackBackend::default()),
            options(),
        );
        let posts = extractor.extract(b"not a pdf");
        assert_eq!(posts.len(), 1);
        assert!(posts[0].is_error_placeholder());
    }
}
