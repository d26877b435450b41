//! Kernel density estimation for presenting distributions
//!
//! Produces relative-intensity curves: a Gaussian KDE evaluated on an even
//! grid over the data range, rescaled so the peak is exactly 100.

use std::f64::consts::PI;
use thiserror::Error;

use crate::entities::density::DensityCurve;
use crate::entities::distribution::Distribution;

/// Default number of evaluation points
pub const DEFAULT_KDE_POINTS: usize = 200;

/// Peak value of every produced curve
pub const CURVE_PEAK: f64 = 100.0;

/// Errors from density estimation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EstimationError {
    #[error("only {remaining} non-negative samples remain (need at least 2)")]
    TooFewSamples { remaining: usize },

    #[error("all {count} non-negative samples are identical; density is undefined")]
    ZeroVariance { count: usize },

    #[error("at least 2 evaluation points are required, got {points}")]
    TooFewPoints { points: usize },
}

/// Gaussian KDE with Scott's rule bandwidth
#[derive(Debug, Clone, Copy)]
pub struct DensityEstimator {
    points: usize,
}

impl Default for DensityEstimator {
    fn default() -> Self {
        Self {
            points: DEFAULT_KDE_POINTS,
        }
    }
}

impl DensityEstimator {
    pub fn new(points: usize) -> Result<Self, EstimationError> {
        if points < 2 {
            return Err(EstimationError::TooFewPoints { points });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> usize {
        self.points
    }

    /// Smooth a distribution into a curve peaking at 100
    ///
    /// Negative (and non-finite) samples are discarded first, never clamped.
    pub fn estimate(&self, distribution: &Distribution) -> Result<DensityCurve, EstimationError> {
        self.estimate_samples(distribution.samples())
    }

    pub fn estimate_samples(&self, samples: &[f64]) -> Result<DensityCurve, EstimationError> {
        let data: Vec<f64> = samples
            .iter()
            .copied()
            .filter(|x| x.is_finite() && *x >= 0.0)
            .collect();

        let n = data.len();
        if n < 2 {
            return Err(EstimationError::TooFewSamples { remaining: n });
        }

        let min = data.iter().copied().fold(f64::INFINITY, f64::min);
        let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if min == max {
            return Err(EstimationError::ZeroVariance { count: n });
        }

        let mean = data.iter().sum::<f64>() / n as f64;
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        let bandwidth = variance.sqrt() * scott_factor(n);
        if bandwidth.is_nan() || bandwidth <= 0.0 {
            return Err(EstimationError::ZeroVariance { count: n });
        }

        let norm = 1.0 / (n as f64 * bandwidth * (2.0 * PI).sqrt());
        let step = (max - min) / (self.points - 1) as f64;

        let x: Vec<f64> = (0..self.points)
            .map(|i| {
                if i == self.points - 1 {
                    max
                } else {
                    min + step * i as f64
                }
            })
            .collect();

        let density: Vec<f64> = x
            .iter()
            .map(|&xi| {
                norm * data
                    .iter()
                    .map(|&d| {
                        let z = (xi - d) / bandwidth;
                        (-0.5 * z * z).exp()
                    })
                    .sum::<f64>()
            })
            .collect();

        let peak = density.iter().copied().fold(0.0, f64::max);
        if peak.is_nan() || peak <= 0.0 {
            return Err(EstimationError::ZeroVariance { count: n });
        }

        let y = density.iter().map(|d| d / peak * CURVE_PEAK).collect();
        Ok(DensityCurve { x, y })
    }
}

/// Scott's rule bandwidth factor for one dimension: n^(-1/5)
fn scott_factor(n: usize) -> f64 {
    (n as f64).powf(-0.2)
}
