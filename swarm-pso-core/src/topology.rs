//! Swarm topology
//!
//! The neighbor relation used to pick the social term of the velocity update.

use core::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Dense row-major `n x n` matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquareMatrix {
    n: usize,
    data: Vec<f64>,
}

impl SquareMatrix {
    /// All-zero matrix
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![0.0; n * n],
        }
    }

    /// Matrix with every entry equal to `value`
    pub fn filled(n: usize, value: f64) -> Self {
        Self {
            n,
            data: vec![value; n * n],
        }
    }

    /// Build from nested rows. Returns `None` unless the rows form a square.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let n = rows.len();
        if rows.iter().any(|r| r.len() != n) {
            return None;
        }
        Some(Self {
            n,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// Side length
    pub fn n(&self) -> usize {
        self.n
    }

    /// Row `i` as a slice
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    /// Sum of each row
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.row(i).iter().sum()).collect()
    }

    /// Sum of each column
    pub fn col_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n];
        for i in 0..self.n {
            for (j, v) in self.row(i).iter().enumerate() {
                sums[j] += v;
            }
        }
        sums
    }

    /// Sum of all entries
    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Sum of absolute values of all entries
    pub fn abs_total(&self) -> f64 {
        self.data.iter().map(|v| v.abs()).sum()
    }

    /// Multiply every entry by `factor`
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    /// `m[i][j] == m[j][i]` for all pairs (within `tol`)
    pub fn is_symmetric(&self, tol: f64) -> bool {
        (0..self.n).all(|i| (0..i).all(|j| (self[(i, j)] - self[(j, i)]).abs() <= tol))
    }

    /// `m[i][j] == -m[j][i]` for all pairs (within `tol`)
    pub fn is_antisymmetric(&self, tol: f64) -> bool {
        (0..self.n).all(|i| (0..=i).all(|j| (self[(i, j)] + self[(j, i)]).abs() <= tol))
    }
}

impl Index<(usize, usize)> for SquareMatrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.n + j]
    }
}

impl IndexMut<(usize, usize)> for SquareMatrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i * self.n + j]
    }
}

/// Neighbor relation of a swarm
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Every particle sees the swarm-wide best
    #[default]
    FullyConnected,
    /// Pairwise distance/weight matrix; neighbors are resolved against a threshold
    Weighted(SquareMatrix),
    /// Explicit neighbor-index list per particle
    Neighbors(Vec<Vec<usize>>),
}

impl Topology {
    /// Weighted topology with every entry set to one
    pub fn all_ones(n: usize) -> Self {
        Self::Weighted(SquareMatrix::filled(n, 1.0))
    }

    /// Ring over `n` particles: each particle lists itself and its two
    /// index neighbors (wrapping around)
    pub fn ring(n: usize) -> Self {
        let lists = (0..n)
            .map(|i| {
                let mut list = vec![(i + n - 1) % n, i, (i + 1) % n];
                list.sort_unstable();
                list.dedup();
                list
            })
            .collect();
        Self::Neighbors(lists)
    }

    /// Whether the topology is the fully connected default
    pub fn is_fully_connected(&self) -> bool {
        matches!(self, Topology::FullyConnected)
    }

    /// Check the topology covers exactly `n_particles` particles
    pub fn validate(&self, n_particles: usize) -> Result<()> {
        match self {
            Topology::FullyConnected => Ok(()),
            Topology::Weighted(m) if m.n() != n_particles => Err(Error::DimensionMismatch {
                what: "topology matrix",
                expected: n_particles,
                found: m.n(),
            }),
            Topology::Weighted(_) => Ok(()),
            Topology::Neighbors(lists) => {
                if lists.len() != n_particles {
                    return Err(Error::DimensionMismatch {
                        what: "topology neighbor lists",
                        expected: n_particles,
                        found: lists.len(),
                    });
                }
                match lists.iter().flatten().find(|&&j| j >= n_particles) {
                    Some(&j) => Err(Error::OutOfRange {
                        name: "neighbor index",
                        value: j as f64,
                        expected: "< number of particles",
                    }),
                    None => Ok(()),
                }
            }
        }
    }
}
