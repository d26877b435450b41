//! Distribution entity - an empirical sample set standing in for an uncertain quantity
//!
//! A distribution is never a closed-form object: it is N independent draws,
//! consumed by resampling (Monte Carlo composition) or by aggregate statistics.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default number of samples per distribution
pub const DEFAULT_SAMPLE_COUNT: usize = 10_000;

/// An ordered collection of independently drawn samples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distribution {
    samples: Vec<f64>,
}

impl Distribution {
    /// Wrap a sample vector
    pub fn new(samples: Vec<f64>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Draw one stored sample uniformly at random (with replacement)
    ///
    /// Returns `None` for an empty distribution.
    pub fn resample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples[rng.random_range(0..self.samples.len())])
    }

    /// Arithmetic mean
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    /// Sample standard deviation (Bessel-corrected)
    pub fn std_dev(&self) -> Option<f64> {
        let n = self.samples.len();
        if n < 2 {
            return None;
        }
        let mean = self.mean()?;
        let variance =
            self.samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        Some(variance.sqrt())
    }

    /// Percentile (0-100) with linear interpolation between order statistics
    pub fn percentile(&self, p: f64) -> Option<f64> {
        let sorted = self.sorted();
        percentile_of_sorted(&sorted, p)
    }

    /// Percentage of samples strictly above `threshold`
    pub fn percent_above(&self, threshold: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let above = self.samples.iter().filter(|&&x| x > threshold).count();
        above as f64 / self.samples.len() as f64 * 100.0
    }

    /// Summary statistics, or `None` for an empty distribution
    pub fn summary(&self) -> Option<DistributionSummary> {
        let sorted = self.sorted();
        let count = sorted.len();
        let mean = self.mean()?;
        let std_dev = self.std_dev().unwrap_or(0.0);

        Some(DistributionSummary {
            count,
            mean,
            std_dev,
            min: sorted[0],
            max: sorted[count - 1],
            p5: percentile_of_sorted(&sorted, 5.0)?,
            p50: percentile_of_sorted(&sorted, 50.0)?,
            p95: percentile_of_sorted(&sorted, 95.0)?,
        })
    }

    fn sorted(&self) -> Vec<f64> {
        let mut sorted = self.samples.clone();
        sorted.sort_by(f64::total_cmp);
        sorted
    }
}

impl From<Vec<f64>> for Distribution {
    fn from(samples: Vec<f64>) -> Self {
        Self::new(samples)
    }
}

fn percentile_of_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=100.0).contains(&p) {
        return None;
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Aggregate statistics of a distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    /// Number of samples
    pub count: usize,

    /// Mean value
    pub mean: f64,

    /// Sample standard deviation
    pub std_dev: f64,

    /// Minimum value seen
    pub min: f64,

    /// Maximum value seen
    pub max: f64,

    /// 5th percentile
    pub p5: f64,

    /// Median
    pub p50: f64,

    /// 95th percentile
    pub p95: f64,
}

impl DistributionSummary {
    /// Standard error of the mean
    pub fn standard_error(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        self.std_dev / (self.count as f64).sqrt()
    }
}
