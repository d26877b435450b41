//! Errors surfaced by the analysis service

use miette::Diagnostic;
use thiserror::Error;

use crate::core::feedstock::{FeedstockType, UnknownFeedstock};
use crate::core::fit::FitError;
use crate::core::kde::EstimationError;
use crate::core::simulate::SimulationError;
use crate::core::synthetic::ParameterError;

/// Failure of one analysis request
#[derive(Debug, Error, Diagnostic)]
pub enum AnalysisError {
    /// Bad request parameters; nothing was computed
    #[error("invalid request: {message}")]
    #[diagnostic(code(erw::validation))]
    Validation { message: String },

    #[error(
        "could not fit a gamma distribution to {dataset} {element} data ({feedstock_type} analysis)"
    )]
    #[diagnostic(
        code(erw::fit),
        help("the reference data for this element may be too sparse or constant")
    )]
    FitConvergence {
        element: String,
        feedstock_type: FeedstockType,
        dataset: String,
        #[source]
        source: FitError,
    },

    #[error(
        "could not estimate the density of the {series} distribution for {element} with {feedstock_type} feedstock"
    )]
    #[diagnostic(
        code(erw::density),
        help("a distribution with fewer than two distinct non-negative values cannot be smoothed")
    )]
    Estimation {
        element: String,
        feedstock_type: FeedstockType,
        series: String,
        #[source]
        source: EstimationError,
    },

    #[error("no {dataset} data for element {element} ({feedstock_type} analysis)")]
    #[diagnostic(code(erw::data_not_found), help("run `erw elements` to list supported elements"))]
    DataNotFound {
        element: String,
        feedstock_type: FeedstockType,
        dataset: String,
    },

    /// Preset mode needs the reference tables
    #[error("reference tables are not loaded")]
    #[diagnostic(
        code(erw::tables_missing),
        help("point --data-dir at a directory holding the reference CSV files")
    )]
    TablesUnavailable,
}

impl AnalysisError {
    pub fn validation(message: impl Into<String>) -> Self {
        AnalysisError::Validation {
            message: message.into(),
        }
    }

    /// Prefix a validation message with the element and feedstock it was raised for
    pub fn in_request(self, element: &str, feedstock_type: FeedstockType) -> Self {
        match self {
            AnalysisError::Validation { message } => AnalysisError::Validation {
                message: format!("{} with {} feedstock: {}", element, feedstock_type, message),
            },
            other => other,
        }
    }

    /// True when the caller sent a bad request, as opposed to a computation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, AnalysisError::Validation { .. })
    }
}

impl From<ParameterError> for AnalysisError {
    fn from(err: ParameterError) -> Self {
        AnalysisError::validation(err.to_string())
    }
}

impl From<UnknownFeedstock> for AnalysisError {
    fn from(err: UnknownFeedstock) -> Self {
        AnalysisError::validation(err.to_string())
    }
}

impl From<SimulationError> for AnalysisError {
    fn from(err: SimulationError) -> Self {
        AnalysisError::validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_error_is_validation() {
        let err: AnalysisError = ParameterError::NotPositive {
            name: "feed_conc_sd",
            value: 0.0,
        }
        .into();
        assert!(err.is_validation());
        assert!(err.to_string().contains("feed_conc_sd"));
    }

    #[test]
    fn test_fit_error_keeps_source() {
        let err = AnalysisError::FitConvergence {
            element: "Ni".to_string(),
            feedstock_type: FeedstockType::Basalt,
            dataset: "soil".to_string(),
            source: FitError::ZeroVariance,
        };
        assert!(!err.is_validation());
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(
            err.to_string(),
            "could not fit a gamma distribution to soil Ni data (basalt analysis)"
        );
    }

    #[test]
    fn test_in_request_prefixes_validation_only() {
        let err = AnalysisError::from(SimulationError::InvalidRate { rate: -1.0 })
            .in_request("Cu", FeedstockType::Peridotite);
        assert!(err.is_validation());
        assert!(err.to_string().starts_with("invalid request: Cu with peridotite feedstock: "));

        let err = AnalysisError::TablesUnavailable.in_request("Cu", FeedstockType::Basalt);
        assert!(matches!(err, AnalysisError::TablesUnavailable));
    }
}
