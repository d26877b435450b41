//! Core module - statistical engine, reference data and the analysis service

pub mod config;
pub mod error;
pub mod feedstock;
pub mod fit;
pub mod kde;
pub mod service;
pub mod simulate;
pub mod synthetic;
pub mod tables;
pub mod thresholds;

pub use config::{Config, ConfigError, SimulationConfig};
pub use error::AnalysisError;
pub use feedstock::{FeedstockType, UnknownFeedstock};
pub use fit::{DistributionFitter, FitError, GammaFit};
pub use kde::{DensityEstimator, EstimationError};
pub use service::{AnalysisService, CustomParameters};
pub use simulate::{
    ConcentrationSimulator, DepthFloorPolicy, SimulationError, SimulationInputs, SimulationResult,
    DEPTH_FLOOR,
};
pub use synthetic::{InputModel, ParameterError, SyntheticDistributionBuilder};
pub use tables::{CompositionTable, ReferenceTables, TableError};
pub use thresholds::ThresholdClassifier;
