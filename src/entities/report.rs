//! Concentration report - the response of a preset or custom analysis
//!
//! Carries density curves for rendering, summary statistics for each
//! application rate and, when thresholds were requested, the share of
//! simulated outcomes exceeding each regulatory limit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::feedstock::FeedstockType;
use crate::entities::density::DensityCurve;
use crate::entities::distribution::DistributionSummary;
use crate::entities::threshold::{ExtractionMethod, ThresholdBuckets};

/// Which parameterization produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Inputs fitted from the reference tables
    Preset,
    /// Inputs built from caller-supplied mean and uncertainty
    Custom,
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisMode::Preset => write!(f, "preset"),
            AnalysisMode::Custom => write!(f, "custom"),
        }
    }
}

/// Density curves of the two concentration inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputCurves {
    pub feedstock: DensityCurve,
    pub soil: DensityCurve,
}

/// Share of simulated outcomes above one regulatory limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exceedance {
    pub agency: String,
    pub extraction_method: ExtractionMethod,
    pub threshold: f64,

    /// Percentage (0-100) of samples strictly above the threshold
    pub percent_above: f64,
}

/// Simulated soil concentration for one application rate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConcentration {
    /// Application rate (t/ha)
    pub application_rate: f64,

    pub curve: DensityCurve,

    pub summary: DistributionSummary,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceedances: Vec<Exceedance>,
}

/// Full analysis response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcentrationReport {
    /// Element symbol
    pub element: String,

    pub feedstock_type: FeedstockType,

    pub mode: AnalysisMode,

    /// Samples per distribution
    pub sample_count: usize,

    /// When the analysis ran
    pub generated: DateTime<Utc>,

    /// Input concentration curves
    pub distributions: InputCurves,

    /// One entry per application rate, in rate order
    pub concentrations: Vec<RateConcentration>,

    /// Regulatory limits for the element, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdBuckets>,
}

impl ConcentrationReport {
    /// Look up the result for an application rate
    pub fn rate(&self, application_rate: f64) -> Option<&RateConcentration> {
        self.concentrations
            .iter()
            .find(|c| c.application_rate == application_rate)
    }

    /// Application rates covered, in order
    pub fn rates(&self) -> Vec<f64> {
        self.concentrations
            .iter()
            .map(|c| c.application_rate)
            .collect()
    }
}
