use crate::models::{ExtractionMetadata, ExtractionMethod, fraction_to_percent};

/// Confidence below which OCR/hybrid extractions need a human reviewer
pub const DEFAULT_REVIEW_THRESHOLD: f64 = 0.7;

/// Decides whether machine-extracted data needs human review.
///
/// Stateless apart from the threshold. Text-layer extractions are never
/// flagged: the text layer is the source of truth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceGate {
    threshold: f64,
}

/// Review decision for one document, with the reasoning shown to the reviewer
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDecision {
    pub requires_review: bool,
    pub justification: Option<String>,
}

impl ConfidenceGate {
    /// Gate with a custom threshold; clamped into `[0, 1]`
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold.is_nan() {
            DEFAULT_REVIEW_THRESHOLD
        } else {
            threshold.clamp(0.0, 1.0)
        };
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn is_low_confidence(&self, meta: &ExtractionMetadata) -> bool {
        meta.confidence() < self.threshold
    }

    /// True iff the extraction went through OCR and confidence is below threshold
    pub fn requires_review(&self, meta: &ExtractionMetadata) -> bool {
        meta.method().involves_ocr() && self.is_low_confidence(meta)
    }

    /// Explanation for the reviewer, or `None` when no review is needed
    pub fn justification(&self, meta: &ExtractionMetadata) -> Option<String> {
        if !self.requires_review(meta) {
            return None;
        }

        let percent = meta.confidence_percent();
        let text = match meta.method() {
            ExtractionMethod::Ocr => format!(
                "Document was scanned/image-based and its text was read with OCR at {}% confidence. \
                 Characters may be misrecognized; verify each value against the source image.",
                percent
            ),
            ExtractionMethod::Hybrid => format!(
                "Mixed text and OCR extraction at {}% confidence. Values read from image regions \
                 may contain recognition errors; verify them against the source.",
                percent
            ),
            // requires_review already excluded text-layer extractions
            ExtractionMethod::Text => return None,
        };
        Some(text)
    }

    pub fn decide(&self, meta: &ExtractionMetadata) -> ReviewDecision {
        ReviewDecision {
            requires_review: self.requires_review(meta),
            justification: self.justification(meta),
        }
    }

    /// OCR-error guidance to append after a base extraction prompt.
    ///
    /// Empty for text-layer extractions. The low-confidence warning line is
    /// only included below the threshold.
    pub fn prompt_guidance(&self, meta: &ExtractionMetadata) -> String {
        if !meta.method().involves_ocr() {
            return String::new();
        }

        let percent = meta.confidence_percent();
        let mut block = format!(
            "\n\nIMPORTANT - OCR EXTRACTION NOTICE:\n\
             This document's text was extracted with OCR ({method}, {percent}% confidence). \
             The text may contain character recognition errors.\n\
             \n\
             Common OCR confusions to correct for:\n\
             - Digits and letters: 0 <-> O, 1 <-> l <-> I, 5 <-> S, 8 <-> B, 6 <-> G\n\
             - Letter shapes: rn <-> m, cl <-> d, vv <-> w\n\
             - Punctuation: commas and periods are often swapped (1,000.00 vs 1.000,00)\n\
             \n\
             Validate extracted values by field type:\n\
             - Currency amounts: must be numeric with at most one decimal separator; \
             replace letter look-alikes with digits\n\
             - Percentages: must fall between 0 and 100 unless the document clearly states otherwise\n\
             - Dates: must form a valid calendar date; check day/month order against other dates in the document\n\
             - Codes and identifiers (invoice numbers, tax IDs, IBANs): check length and character set; \
             prefer the reading that matches the expected format\n\
             \n\
             If a value cannot be read with confidence, return your best reading and mark it as uncertain.",
            method = meta.method(),
            percent = percent,
        );

        if self.is_low_confidence(meta) {
            block.push_str(&format!(
                "\n\nWARNING: Extraction confidence ({}%) is below the review threshold ({}%). \
                 Treat every value as suspect and be conservative.",
                percent,
                fraction_to_percent(self.threshold)
            ));
        }

        block
    }

    /// Base prompt followed by the OCR guidance block; `base` itself is untouched
    pub fn augment_prompt(&self, base: &str, meta: &ExtractionMetadata) -> String {
        let guidance = self.prompt_guidance(meta);
        let mut prompt = String::with_capacity(base.len() + guidance.len());
        prompt.push_str(base);
        prompt.push_str(&guidance);
        prompt
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_REVIEW_THRESHOLD,
        }
    }
}

/// [`ConfidenceGate::requires_review`] with the default threshold
pub fn requires_review(meta: &ExtractionMetadata) -> bool {
    ConfidenceGate::default().requires_review(meta)
}

/// [`ConfidenceGate::justification`] with the default threshold
pub fn review_justification(meta: &ExtractionMetadata) -> Option<String> {
    ConfidenceGate::default().justification(meta)
}

/// [`ConfidenceGate::prompt_guidance`] with the default threshold
pub fn prompt_guidance(meta: &ExtractionMetadata) -> String {
    ConfidenceGate::default().prompt_guidance(meta)
}
