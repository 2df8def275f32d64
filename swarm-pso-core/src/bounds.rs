//! Axis-aligned box bounds for positions and velocities

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Elementwise `[lower, upper]` box over a real vector space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower bound per dimension
    pub lower: Vec<f64>,
    /// Upper bound per dimension
    pub upper: Vec<f64>,
}

impl Bounds {
    /// Create bounds from explicit per-dimension vectors
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Self {
        Self { lower, upper }
    }

    /// Same `[lo, hi]` interval repeated over `dim` dimensions
    pub fn uniform(dim: usize, lo: f64, hi: f64) -> Self {
        Self {
            lower: vec![lo; dim],
            upper: vec![hi; dim],
        }
    }

    /// Number of dimensions covered
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Check shape and ordering.
    ///
    /// `what` names the bounds in the error (e.g. `"position bounds"`).
    pub fn validate(&self, what: &'static str, dim: usize) -> Result<()> {
        if self.lower.len() != dim {
            return Err(Error::DimensionMismatch {
                what,
                expected: dim,
                found: self.lower.len(),
            });
        }
        if self.upper.len() != dim {
            return Err(Error::DimensionMismatch {
                what,
                expected: dim,
                found: self.upper.len(),
            });
        }
        for (index, (&lower, &upper)) in self.lower.iter().zip(&self.upper).enumerate() {
            // NaN on either side fails this check as well
            if !(lower <= upper) {
                return Err(Error::InvertedBounds {
                    what,
                    index,
                    lower,
                    upper,
                });
            }
        }
        Ok(())
    }

    /// Default velocity bounds: `±0.5 * (upper - lower)`
    pub fn velocity_default(&self) -> Self {
        let lower = self
            .lower
            .iter()
            .zip(&self.upper)
            .map(|(lo, hi)| 0.5 * (lo - hi))
            .collect();
        let upper = self
            .lower
            .iter()
            .zip(&self.upper)
            .map(|(lo, hi)| 0.5 * (hi - lo))
            .collect();
        Self { lower, upper }
    }

    /// Both ends multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            lower: self.lower.iter().map(|v| v * factor).collect(),
            upper: self.upper.iter().map(|v| v * factor).collect(),
        }
    }

    /// Clamp `values` elementwise into the box
    pub fn clamp(&self, values: &mut [f64]) {
        for ((v, &lo), &hi) in values.iter_mut().zip(&self.lower).zip(&self.upper) {
            *v = v.max(lo).min(hi);
        }
    }

    /// Whether every component of `values` lies inside the box
    pub fn contains(&self, values: &[f64]) -> bool {
        values.len() == self.dim()
            && values
                .iter()
                .zip(&self.lower)
                .zip(&self.upper)
                .all(|((v, lo), hi)| *v >= *lo && *v <= *hi)
    }

    /// Width of dimension `i`
    pub fn range(&self, i: usize) -> f64 {
        self.upper[i] - self.lower[i]
    }

    /// Widest dimension of the box
    pub fn max_range(&self) -> f64 {
        (0..self.dim())
            .map(|i| self.range(i))
            .fold(0.0, f64::max)
    }
}
