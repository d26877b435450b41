//! Regulatory threshold entities
//!
//! Raw threshold rows come from the threshold reference table; classified
//! entries are bucketed by the extraction method the limit applies to.

use serde::{Deserialize, Serialize};

/// Soil digestion method a regulatory limit is expressed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionMethod {
    /// Total digestion
    #[serde(rename = "Total")]
    Total,
    /// Aqua regia extraction
    #[serde(rename = "Aqua_regia")]
    AquaRegia,
    /// Any other (very) strong acid extraction
    #[serde(rename = "Other_very_strong_acid")]
    OtherStrongAcid,
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionMethod::Total => write!(f, "total"),
            ExtractionMethod::AquaRegia => write!(f, "aqua regia"),
            ExtractionMethod::OtherStrongAcid => write!(f, "other strong acid"),
        }
    }
}

/// One row of the threshold reference table, as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRecord {
    /// Element symbol (e.g. "Ni")
    #[serde(rename = "Metal")]
    pub metal: String,

    /// Issuing agency
    #[serde(rename = "Agency", default)]
    pub agency: String,

    /// Free-text extraction method description
    #[serde(
        rename = "Total, Aqua regia, extractable, or other (specify)",
        default
    )]
    pub extraction_method: Option<String>,

    /// Threshold as written in the source (may contain thousands separators)
    #[serde(rename = "Threshold Level (mg/kg)", default)]
    pub threshold_level: Option<String>,
}

/// A parsed, classified regulatory limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEntry {
    pub agency: String,

    pub extraction_method: ExtractionMethod,

    /// Limit in mg/kg
    pub threshold: f64,
}

/// Threshold entries for one element, grouped by extraction method
///
/// Each bucket preserves the order rows appear in the source table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBuckets {
    #[serde(rename = "Total")]
    pub total: Vec<ThresholdEntry>,

    #[serde(rename = "Aqua_regia")]
    pub aqua_regia: Vec<ThresholdEntry>,

    #[serde(rename = "Other_very_strong_acid")]
    pub other_strong_acid: Vec<ThresholdEntry>,
}

impl ThresholdBuckets {
    /// Entries for one extraction method
    pub fn bucket(&self, method: ExtractionMethod) -> &[ThresholdEntry] {
        match method {
            ExtractionMethod::Total => &self.total,
            ExtractionMethod::AquaRegia => &self.aqua_regia,
            ExtractionMethod::OtherStrongAcid => &self.other_strong_acid,
        }
    }

    pub(crate) fn push(&mut self, entry: ThresholdEntry) {
        match entry.extraction_method {
            ExtractionMethod::Total => self.total.push(entry),
            ExtractionMethod::AquaRegia => self.aqua_regia.push(entry),
            ExtractionMethod::OtherStrongAcid => self.other_strong_acid.push(entry),
        }
    }

    /// All entries, bucket by bucket
    pub fn iter(&self) -> impl Iterator<Item = &ThresholdEntry> {
        self.total
            .iter()
            .chain(&self.aqua_regia)
            .chain(&self.other_strong_acid)
    }

    pub fn len(&self) -> usize {
        self.total.len() + self.aqua_regia.len() + self.other_strong_acid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lowest limit across all buckets
    pub fn strictest(&self) -> Option<&ThresholdEntry> {
        self.iter().min_by(|a, b| a.threshold.total_cmp(&b.threshold))
    }
}
