use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// How the text of a document was obtained by the upstream extraction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Native text layer (born-digital PDF, DOCX, ...)
    Text,
    /// Optical character recognition over scanned pages
    Ocr,
    /// Text layer for some pages, OCR for others
    Hybrid,
}

impl ExtractionMethod {
    /// Whether any part of the extraction went through OCR
    pub fn involves_ocr(self) -> bool {
        !matches!(self, ExtractionMethod::Text)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionMethod::Text => "text",
            ExtractionMethod::Ocr => "ocr",
            ExtractionMethod::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised when extraction metadata violates its contract
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetadataError {
    #[error("Confidence {0} is outside the range [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("Confidence is not a number")]
    ConfidenceNotANumber,
}

/// Extraction method and confidence for one document or field.
///
/// The confidence is guaranteed to lie in `[0, 1]`: [`ExtractionMetadata::new`]
/// rejects anything else, [`ExtractionMetadata::clamped`] pulls it into range,
/// and deserialization goes through the same validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMetadata", into = "RawMetadata")]
pub struct ExtractionMetadata {
    method: ExtractionMethod,
    confidence: f64,
}

#[derive(Serialize, Deserialize)]
struct RawMetadata {
    extraction_method: ExtractionMethod,
    confidence: f64,
}

impl TryFrom<RawMetadata> for ExtractionMetadata {
    type Error = MetadataError;

    fn try_from(raw: RawMetadata) -> Result<Self, Self::Error> {
        ExtractionMetadata::new(raw.extraction_method, raw.confidence)
    }
}

impl From<ExtractionMetadata> for RawMetadata {
    fn from(meta: ExtractionMetadata) -> Self {
        Self {
            extraction_method: meta.method,
            confidence: meta.confidence,
        }
    }
}

impl ExtractionMetadata {
    /// Build validated metadata.
    ///
    /// # Errors
    /// - [`MetadataError::ConfidenceNotANumber`] for NaN
    /// - [`MetadataError::ConfidenceOutOfRange`] for values outside `[0, 1]`
    pub fn new(method: ExtractionMethod, confidence: f64) -> Result<Self, MetadataError> {
        if confidence.is_nan() {
            return Err(MetadataError::ConfidenceNotANumber);
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(MetadataError::ConfidenceOutOfRange(confidence));
        }
        Ok(Self { method, confidence })
    }

    /// Build metadata, pulling an out-of-range confidence back into `[0, 1]`.
    ///
    /// NaN is treated as zero confidence so the document is sent to review.
    pub fn clamped(method: ExtractionMethod, confidence: f64) -> Self {
        let bounded = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };

        // NaN compares unequal to everything, so it is logged here too
        if bounded != confidence {
            tracing::warn!(
                "Clamped extraction confidence {} to {} (method={})",
                confidence,
                bounded,
                method
            );
        }

        Self {
            method,
            confidence: bounded,
        }
    }

    pub fn method(&self) -> ExtractionMethod {
        self.method
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Confidence rounded to the nearest whole percent
    pub fn confidence_percent(&self) -> u8 {
        fraction_to_percent(self.confidence)
    }
}

/// A `[0, 1]` fraction rounded to a whole percent. Out-of-range input saturates, NaN is 0.
pub fn fraction_to_percent(fraction: f64) -> u8 {
    if fraction.is_nan() {
        return 0;
    }
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fraction_to_percent_saturates() {
        assert_eq!(fraction_to_percent(0.704), 70);
        assert_eq!(fraction_to_percent(1.7), 100);
        assert_eq!(fraction_to_percent(-0.2), 0);
        assert_eq!(fraction_to_percent(f64::NAN), 0);
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert_eq!(
            ExtractionMetadata::new(ExtractionMethod::Ocr, 1.2),
            Err(MetadataError::ConfidenceOutOfRange(1.2))
        );
        assert_eq!(
            ExtractionMetadata::new(ExtractionMethod::Ocr, -0.1),
            Err(MetadataError::ConfidenceOutOfRange(-0.1))
        );
        assert_eq!(
            ExtractionMetadata::new(ExtractionMethod::Hybrid, f64::NAN),
            Err(MetadataError::ConfidenceNotANumber)
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(ExtractionMetadata::new(ExtractionMethod::Text, 0.0).is_ok());
        assert!(ExtractionMetadata::new(ExtractionMethod::Text, 1.0).is_ok());
    }

    #[test]
    fn test_clamped() {
        assert_eq!(ExtractionMetadata::clamped(ExtractionMethod::Ocr, 1.5).confidence(), 1.0);
        assert_eq!(ExtractionMetadata::clamped(ExtractionMethod::Ocr, -3.0).confidence(), 0.0);
        assert_eq!(ExtractionMetadata::clamped(ExtractionMethod::Ocr, f64::NAN).confidence(), 0.0);
        assert_eq!(ExtractionMetadata::clamped(ExtractionMethod::Ocr, 0.42).confidence(), 0.42);
    }

    #[test]
    fn test_confidence_percent_rounding() {
        let meta = ExtractionMetadata::new(ExtractionMethod::Ocr, 0.65).unwrap();
        assert_eq!(meta.confidence_percent(), 65);

        let meta = ExtractionMetadata::new(ExtractionMethod::Ocr, 0.695).unwrap();
        assert_eq!(meta.confidence_percent(), 70);
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: ExtractionMetadata =
            serde_yaml_ng::from_str("extraction_method: hybrid\nconfidence: 0.5\n").unwrap();
        assert_eq!(ok.method(), ExtractionMethod::Hybrid);

        let bad = serde_yaml_ng::from_str::<ExtractionMetadata>(
            "extraction_method: ocr\nconfidence: 7\n",
        );
        assert!(bad.is_err());
    }

    proptest! {
        #[test]
        fn prop_clamped_always_in_range(confidence in proptest::num::f64::ANY) {
            let meta = ExtractionMetadata::clamped(ExtractionMethod::Ocr, confidence);
            prop_assert!((0.0..=1.0).contains(&meta.confidence()));
            prop_assert!(meta.confidence_percent() <= 100);
        }
    }
}
