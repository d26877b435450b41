//! Entity type definitions

pub mod density;
pub mod distribution;
pub mod report;
pub mod threshold;

pub use density::DensityCurve;
pub use distribution::{Distribution, DistributionSummary, DEFAULT_SAMPLE_COUNT};
pub use report::{AnalysisMode, ConcentrationReport, Exceedance, InputCurves, RateConcentration};
pub use threshold::{ExtractionMethod, ThresholdBuckets, ThresholdEntry, ThresholdRecord};
