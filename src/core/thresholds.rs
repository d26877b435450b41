//! Threshold classification by extraction method
//!
//! Regulatory limits are free-text in the source table. Rows are parsed
//! leniently: anything that cannot be read as a limit is skipped, never
//! imputed.

use crate::entities::threshold::{
    ExtractionMethod, ThresholdBuckets, ThresholdEntry, ThresholdRecord,
};

/// Buckets regulatory threshold rows for one element
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdClassifier;

impl ThresholdClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify every usable row whose metal matches `element` exactly
    pub fn classify<'a, I>(&self, element: &str, records: I) -> ThresholdBuckets
    where
        I: IntoIterator<Item = &'a ThresholdRecord>,
    {
        let mut buckets = ThresholdBuckets::default();
        let mut skipped = 0usize;

        for record in records.into_iter().filter(|r| r.metal == element) {
            let Some(method_text) = record
                .extraction_method
                .as_deref()
                .filter(|m| !m.trim().is_empty())
            else {
                skipped += 1;
                continue;
            };

            let Some(threshold) = record.threshold_level.as_deref().and_then(parse_threshold)
            else {
                skipped += 1;
                continue;
            };

            buckets.push(ThresholdEntry {
                agency: record.agency.clone(),
                extraction_method: classify_method(method_text),
                threshold,
            });
        }

        if skipped > 0 {
            log::debug!(
                "skipped {} unusable threshold row(s) for {}",
                skipped,
                element
            );
        }

        buckets
    }
}

/// Map extraction-method text to a bucket; first match wins
pub fn classify_method(text: &str) -> ExtractionMethod {
    let lower = text.to_lowercase();
    if lower.contains("total") {
        ExtractionMethod::Total
    } else if lower.contains("aqua regia") {
        ExtractionMethod::AquaRegia
    } else {
        ExtractionMethod::OtherStrongAcid
    }
}

/// Parse a limit such as "1,400" into mg/kg
///
/// Returns `None` for text that is not a finite, non-negative number.
pub fn parse_threshold(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    let value: f64 = cleaned.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}
