//! Fuzzy evolutionary-state classification for the ESE swarm
//!
//! The evolutionary factor `f` in `[0, 1]` measures how far the fittest
//! particle sits from the rest of the swarm relative to the spread of mean
//! distances. Four trapezoidal membership functions map `f` onto the states
//! below; their supports overlap and jointly cover `[0, 1]`.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Evolutionary factor used when every particle has the same mean distance
pub const DEGENERATE_FACTOR: f64 = 0.0;

/// Search phase inferred from the swarm's spatial distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionaryState {
    #[default]
    Exploration,
    Exploitation,
    Convergence,
    JumpingOut,
}

impl EvolutionaryState {
    /// All states, in tie-breaking order
    pub const ALL: [EvolutionaryState; 4] = [
        EvolutionaryState::Exploration,
        EvolutionaryState::Exploitation,
        EvolutionaryState::Convergence,
        EvolutionaryState::JumpingOut,
    ];

    /// Membership degree of `f` in this state
    pub fn membership(self, f: f64) -> Result<f64> {
        check_domain(f)?;
        Ok(match self {
            EvolutionaryState::Exploration => exploration(f),
            EvolutionaryState::Exploitation => exploitation(f),
            EvolutionaryState::Convergence => convergence(f),
            EvolutionaryState::JumpingOut => jumping_out(f),
        })
    }

    fn index(self) -> usize {
        match self {
            EvolutionaryState::Exploration => 0,
            EvolutionaryState::Exploitation => 1,
            EvolutionaryState::Convergence => 2,
            EvolutionaryState::JumpingOut => 3,
        }
    }
}

impl fmt::Display for EvolutionaryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvolutionaryState::Exploration => "exploration",
            EvolutionaryState::Exploitation => "exploitation",
            EvolutionaryState::Convergence => "convergence",
            EvolutionaryState::JumpingOut => "jumping_out",
        };
        f.write_str(name)
    }
}

fn check_domain(f: f64) -> Result<()> {
    if (0.0..=1.0).contains(&f) {
        Ok(())
    } else {
        Err(Error::MembershipDomain(f))
    }
}

fn exploration(f: f64) -> f64 {
    if f <= 0.4 {
        0.0
    } else if f <= 0.6 {
        5.0 * f - 2.0
    } else if f <= 0.7 {
        1.0
    } else if f <= 0.8 {
        -10.0 * f + 8.0
    } else {
        0.0
    }
}

fn exploitation(f: f64) -> f64 {
    if f <= 0.2 {
        0.0
    } else if f <= 0.3 {
        10.0 * f - 2.0
    } else if f <= 0.4 {
        1.0
    } else if f <= 0.6 {
        -5.0 * f + 3.0
    } else {
        0.0
    }
}

fn convergence(f: f64) -> f64 {
    if f <= 0.1 {
        1.0
    } else if f <= 0.3 {
        -5.0 * f + 1.5
    } else {
        0.0
    }
}

fn jumping_out(f: f64) -> f64 {
    if f <= 0.7 {
        0.0
    } else if f <= 0.9 {
        5.0 * f - 3.5
    } else {
        1.0
    }
}

/// Membership degrees of `f` in [`EvolutionaryState::ALL`] order
pub fn memberships(f: f64) -> Result<[f64; 4]> {
    check_domain(f)?;
    Ok([exploration(f), exploitation(f), convergence(f), jumping_out(f)])
}

/// Next state with hysteresis: stay in `current` while its membership is
/// positive, otherwise move to the state of maximum membership (earliest in
/// [`EvolutionaryState::ALL`] on ties).
pub fn classify(current: EvolutionaryState, f: f64) -> Result<EvolutionaryState> {
    let degrees = memberships(f)?;
    if degrees[current.index()] > 0.0 {
        return Ok(current);
    }
    let mut best = 0;
    for (ix, &degree) in degrees.iter().enumerate().skip(1) {
        if degree > degrees[best] {
            best = ix;
        }
    }
    Ok(EvolutionaryState::ALL[best])
}

/// Evolutionary factor `(d_best - d_min) / (d_max - d_min)`.
///
/// Returns [`DEGENERATE_FACTOR`] when the spread is zero (or not finite).
pub fn evolutionary_factor(mean_distances: &[f64], best_ix: usize) -> f64 {
    let d_min = mean_distances.iter().copied().fold(f64::INFINITY, f64::min);
    let d_max = mean_distances.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let spread = d_max - d_min;
    if !(spread > 0.0) || !spread.is_finite() {
        return DEGENERATE_FACTOR;
    }
    ((mean_distances[best_ix] - d_min) / spread).clamp(0.0, 1.0)
}

/// Sigmoid inertia `1 / (1 + 1.5 e^(-2.6 f))`
pub fn inertia_from_factor(f: f64) -> f64 {
    1.0 / (1.0 + 1.5 * (-2.6 * f).exp())
}
