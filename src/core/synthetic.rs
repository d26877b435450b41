//! Synthetic input distributions built directly from parameters
//!
//! Standard mode uses a uniform soil-depth range and a truncated-normal bulk
//! density; custom mode draws every input from a normal distribution with
//! the caller's mean and uncertainty. No clipping happens here: soil depth is
//! floored later, inside the simulator.

use rand::Rng;
use rand_distr::{Distribution as _, Gamma, Normal, Uniform};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal as StatsNormal};
use thiserror::Error;

use crate::entities::distribution::{Distribution, DEFAULT_SAMPLE_COUNT};

/// Smallest acceptance probability allowed for truncated-normal rejection sampling
const MIN_TRUNCATED_MASS: f64 = 1e-6;

/// Invalid distribution parameters
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParameterError {
    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },

    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("invalid range: lower bound {lower} must be below upper bound {upper}")]
    EmptyRange { lower: f64, upper: f64 },

    #[error("truncation bounds [{lower}, {upper}] leave almost no probability mass")]
    DegenerateTruncation { lower: f64, upper: f64 },
}

pub(crate) fn check_finite(name: &'static str, value: f64) -> Result<f64, ParameterError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ParameterError::NotFinite { name, value })
    }
}

pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<f64, ParameterError> {
    check_finite(name, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ParameterError::NotPositive { name, value })
    }
}

fn check_range(lower: f64, upper: f64) -> Result<(), ParameterError> {
    check_finite("lower bound", lower)?;
    check_finite("upper bound", upper)?;
    if lower < upper {
        Ok(())
    } else {
        Err(ParameterError::EmptyRange { lower, upper })
    }
}

/// Parametric model an input distribution is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputModel {
    /// Gamma with location 0
    Gamma { shape: f64, scale: f64 },
    Uniform { min: f64, max: f64 },
    TruncatedNormal {
        mean: f64,
        std_dev: f64,
        lower: f64,
        upper: f64,
    },
    Normal { mean: f64, std_dev: f64 },
}

impl InputModel {
    pub fn gamma(shape: f64, scale: f64) -> Result<Self, ParameterError> {
        check_positive("shape", shape)?;
        check_positive("scale", scale)?;
        Ok(InputModel::Gamma { shape, scale })
    }

    pub fn uniform(min: f64, max: f64) -> Result<Self, ParameterError> {
        check_range(min, max)?;
        Ok(InputModel::Uniform { min, max })
    }

    pub fn truncated_normal(
        mean: f64,
        std_dev: f64,
        lower: f64,
        upper: f64,
    ) -> Result<Self, ParameterError> {
        check_finite("mean", mean)?;
        check_positive("standard deviation", std_dev)?;
        check_range(lower, upper)?;

        let normal = StatsNormal::new(mean, std_dev).map_err(|_| ParameterError::NotPositive {
            name: "standard deviation",
            value: std_dev,
        })?;
        let mass = normal.cdf(upper) - normal.cdf(lower);
        if mass < MIN_TRUNCATED_MASS {
            return Err(ParameterError::DegenerateTruncation { lower, upper });
        }

        Ok(InputModel::TruncatedNormal {
            mean,
            std_dev,
            lower,
            upper,
        })
    }

    pub fn normal(mean: f64, std_dev: f64) -> Result<Self, ParameterError> {
        check_finite("mean", mean)?;
        check_positive("standard deviation", std_dev)?;
        Ok(InputModel::Normal { mean, std_dev })
    }

    /// Draw `n` independent samples
    pub fn sample<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<Distribution, ParameterError> {
        let samples = match *self {
            InputModel::Gamma { shape, scale } => {
                let dist = Gamma::new(shape, scale).map_err(|_| ParameterError::NotPositive {
                    name: "shape",
                    value: shape,
                })?;
                (0..n).map(|_| dist.sample(rng)).collect()
            }
            InputModel::Uniform { min, max } => {
                let dist = Uniform::new(min, max)
                    .map_err(|_| ParameterError::EmptyRange { lower: min, upper: max })?;
                (0..n).map(|_| dist.sample(rng)).collect()
            }
            InputModel::TruncatedNormal {
                mean,
                std_dev,
                lower,
                upper,
            } => {
                // Re-validate: variants can be built without the constructor
                Self::truncated_normal(mean, std_dev, lower, upper)?;
                let dist = Normal::new(mean, std_dev).map_err(|_| ParameterError::NotPositive {
                    name: "standard deviation",
                    value: std_dev,
                })?;
                (0..n)
                    .map(|_| loop {
                        let v = dist.sample(rng);
                        if (lower..=upper).contains(&v) {
                            break v;
                        }
                    })
                    .collect()
            }
            InputModel::Normal { mean, std_dev } => {
                Self::normal(mean, std_dev)?;
                let dist = Normal::new(mean, std_dev).map_err(|_| ParameterError::NotPositive {
                    name: "standard deviation",
                    value: std_dev,
                })?;
                (0..n).map(|_| dist.sample(rng)).collect()
            }
        };

        Ok(Distribution::new(samples))
    }
}

/// Builds fixed-size input distributions from parameters
#[derive(Debug, Clone, Copy)]
pub struct SyntheticDistributionBuilder {
    sample_count: usize,
}

impl Default for SyntheticDistributionBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_COUNT)
    }
}

impl SyntheticDistributionBuilder {
    pub fn new(sample_count: usize) -> Self {
        Self { sample_count }
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// N draws from any validated model
    pub fn build<R: Rng + ?Sized>(
        &self,
        model: &InputModel,
        rng: &mut R,
    ) -> Result<Distribution, ParameterError> {
        model.sample(self.sample_count, rng)
    }

    /// Uniform(min, max); the standard soil-depth model
    pub fn uniform<R: Rng + ?Sized>(
        &self,
        min: f64,
        max: f64,
        rng: &mut R,
    ) -> Result<Distribution, ParameterError> {
        self.build(&InputModel::uniform(min, max)?, rng)
    }

    /// Normal truncated to [lower, upper]; the standard bulk-density model
    pub fn truncated_normal<R: Rng + ?Sized>(
        &self,
        mean: f64,
        std_dev: f64,
        lower: f64,
        upper: f64,
        rng: &mut R,
    ) -> Result<Distribution, ParameterError> {
        self.build(
            &InputModel::truncated_normal(mean, std_dev, lower, upper)?,
            rng,
        )
    }

    /// Normal(mean, std_dev); every input in custom mode
    pub fn normal<R: Rng + ?Sized>(
        &self,
        mean: f64,
        std_dev: f64,
        rng: &mut R,
    ) -> Result<Distribution, ParameterError> {
        self.build(&InputModel::normal(mean, std_dev)?, rng)
    }
}
