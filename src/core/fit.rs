//! Gamma distribution fitting
//!
//! Fits a two-parameter gamma model (shape, scale; location fixed at 0) to
//! empirical concentration data by minimizing the sum of squared errors
//! between the fitted CDF and the empirical CDF. The search is a Nelder-Mead
//! simplex in log-parameter space so both parameters stay strictly positive.

use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Gamma as StatsGamma};
use thiserror::Error;

use crate::core::synthetic::{InputModel, ParameterError};
use crate::entities::distribution::Distribution;

/// Fewest finite data points accepted for a fit
pub const MIN_FIT_POINTS: usize = 3;

/// Errors from gamma fitting
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FitError {
    #[error("no data points to fit")]
    Empty,

    #[error("{count} data points is too few to fit (need at least {required})")]
    InsufficientData { count: usize, required: usize },

    #[error("all data points are identical (zero variance)")]
    ZeroVariance,

    #[error("data mean {mean} is not positive")]
    NonPositiveMean { mean: f64 },

    #[error("optimizer did not converge after {iterations} iterations")]
    NoConvergence { iterations: usize },
}

/// A fitted gamma model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaFit {
    shape: f64,
    scale: f64,

    /// Final sum of squared CDF errors
    sse: f64,

    /// Optimizer iterations used
    iterations: usize,
}

impl GammaFit {
    pub fn shape(&self) -> f64 {
        self.shape
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn sse(&self) -> f64 {
        self.sse
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Mean of the fitted distribution
    pub fn mean(&self) -> f64 {
        self.shape * self.scale
    }

    /// The fitted model as a sampler
    pub fn model(&self) -> InputModel {
        InputModel::Gamma {
            shape: self.shape,
            scale: self.scale,
        }
    }

    /// Draw `n` independent samples from the fitted distribution
    pub fn sample<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<Distribution, ParameterError> {
        self.model().sample(n, rng)
    }
}

/// Nelder-Mead settings for the fitter
#[derive(Debug, Clone, Copy)]
pub struct DistributionFitter {
    /// Iteration cap before giving up
    pub max_iterations: usize,

    /// Convergence tolerance on the spread of objective values in the simplex
    pub f_tolerance: f64,

    /// Convergence tolerance on simplex extent (log-parameter units)
    pub x_tolerance: f64,
}

impl Default for DistributionFitter {
    fn default() -> Self {
        Self {
            max_iterations: 2_000,
            f_tolerance: 1e-10,
            x_tolerance: 1e-8,
        }
    }
}

impl DistributionFitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit a gamma model to the finite values of `data`
    pub fn fit(&self, data: &[f64]) -> Result<GammaFit, FitError> {
        let mut sorted: Vec<f64> = data.iter().copied().filter(|x| x.is_finite()).collect();
        if sorted.is_empty() {
            return Err(FitError::Empty);
        }
        if sorted.len() < MIN_FIT_POINTS {
            return Err(FitError::InsufficientData {
                count: sorted.len(),
                required: MIN_FIT_POINTS,
            });
        }
        sorted.sort_by(f64::total_cmp);

        if sorted[0] == sorted[sorted.len() - 1] {
            return Err(FitError::ZeroVariance);
        }

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        if mean <= 0.0 {
            return Err(FitError::NonPositiveMean { mean });
        }
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        if variance <= 0.0 {
            return Err(FitError::ZeroVariance);
        }

        // Method-of-moments start
        let start = [(mean * mean / variance).ln(), (variance / mean).ln()];

        let ecdf: Vec<f64> = (0..sorted.len())
            .map(|i| (i as f64 + 0.5) / n)
            .collect();
        let objective = |p: &[f64; 2]| cdf_sse(&sorted, &ecdf, p[0].exp(), p[1].exp());

        let (best, sse, iterations) = nelder_mead(
            objective,
            start,
            0.1,
            self.max_iterations,
            self.f_tolerance,
            self.x_tolerance,
        )
        .ok_or(FitError::NoConvergence {
            iterations: self.max_iterations,
        })?;

        let shape = best[0].exp();
        let scale = best[1].exp();
        if !(shape.is_finite() && scale.is_finite() && shape > 0.0 && scale > 0.0) {
            return Err(FitError::NoConvergence { iterations });
        }

        log::debug!(
            "gamma fit over {} points: shape={:.4} scale={:.4} sse={:.3e} ({} iterations)",
            sorted.len(),
            shape,
            scale,
            sse,
            iterations
        );

        Ok(GammaFit {
            shape,
            scale,
            sse,
            iterations,
        })
    }
}

/// Sum of squared differences between the gamma CDF and empirical CDF
fn cdf_sse(sorted: &[f64], ecdf: &[f64], shape: f64, scale: f64) -> f64 {
    if !(shape.is_finite() && scale.is_finite() && shape > 0.0 && scale > 0.0) {
        return f64::INFINITY;
    }
    // statrs parameterizes by rate
    let Ok(model) = StatsGamma::new(shape, 1.0 / scale) else {
        return f64::INFINITY;
    };
    let sse: f64 = sorted
        .iter()
        .zip(ecdf)
        .map(|(&x, &e)| (model.cdf(x) - e).powi(2))
        .sum();
    if sse.is_finite() {
        sse
    } else {
        f64::INFINITY
    }
}

/// Minimize a 2-parameter function with the Nelder-Mead simplex method
///
/// Returns the best point, its value and the iterations used, or `None`
/// when the iteration cap is reached first.
fn nelder_mead<F>(
    f: F,
    start: [f64; 2],
    step: f64,
    max_iterations: usize,
    f_tolerance: f64,
    x_tolerance: f64,
) -> Option<([f64; 2], f64, usize)>
where
    F: Fn(&[f64; 2]) -> f64,
{
    const ALPHA: f64 = 1.0; // reflection
    const GAMMA: f64 = 2.0; // expansion
    const RHO: f64 = 0.5; // contraction
    const SIGMA: f64 = 0.5; // shrink

    let mut simplex: Vec<([f64; 2], f64)> = [
        start,
        [start[0] + step, start[1]],
        [start[0], start[1] + step],
    ]
    .into_iter()
    .map(|p| (p, f(&p)))
    .collect();

    let lerp = |from: &[f64; 2], to: &[f64; 2], t: f64| -> [f64; 2] {
        [
            from[0] + t * (to[0] - from[0]),
            from[1] + t * (to[1] - from[1]),
        ]
    };

    for iteration in 0..max_iterations {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

        let (best, f_best) = simplex[0];
        let f_spread = simplex
            .iter()
            .map(|(_, v)| (v - f_best).abs())
            .fold(0.0, f64::max);
        let x_spread = simplex
            .iter()
            .flat_map(|(p, _)| [(p[0] - best[0]).abs(), (p[1] - best[1]).abs()])
            .fold(0.0, f64::max);
        if f_spread <= f_tolerance && x_spread <= x_tolerance {
            return Some((best, f_best, iteration));
        }

        let centroid = [
            (simplex[0].0[0] + simplex[1].0[0]) / 2.0,
            (simplex[0].0[1] + simplex[1].0[1]) / 2.0,
        ];
        let (worst, f_worst) = simplex[2];
        let f_second = simplex[1].1;

        let reflected = lerp(&centroid, &worst, -ALPHA);
        let f_reflected = f(&reflected);

        if f_reflected < f_best {
            let expanded = lerp(&centroid, &reflected, GAMMA);
            let f_expanded = f(&expanded);
            simplex[2] = if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            };
            continue;
        }

        if f_reflected < f_second {
            simplex[2] = (reflected, f_reflected);
            continue;
        }

        let (contracted, accept) = if f_reflected < f_worst {
            let outside = lerp(&centroid, &reflected, RHO);
            let f_outside = f(&outside);
            ((outside, f_outside), f_outside <= f_reflected)
        } else {
            let inside = lerp(&centroid, &worst, RHO);
            let f_inside = f(&inside);
            ((inside, f_inside), f_inside < f_worst)
        };

        if accept {
            simplex[2] = contracted;
        } else {
            for vertex in simplex.iter_mut().skip(1) {
                let shrunk = lerp(&best, &vertex.0, SIGMA);
                *vertex = (shrunk, f(&shrunk));
            }
        }
    }

    None
}
