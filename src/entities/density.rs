//! Density curve entity - smoothed, relative-intensity view of a distribution

use serde::{Deserialize, Serialize};

/// Paired x/y sequences; x ascending, y scaled so the peak is 100
///
/// This is a relative-intensity curve for overlaying several distributions,
/// not a calibrated probability density.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DensityCurve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl DensityCurve {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// x position of the highest y value (the curve's mode)
    pub fn peak(&self) -> Option<f64> {
        self.x
            .iter()
            .zip(&self.y)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(x, _)| *x)
    }

    /// Smallest and largest x covered by the curve
    pub fn domain(&self) -> Option<(f64, f64)> {
        Some((*self.x.first()?, *self.x.last()?))
    }
}
