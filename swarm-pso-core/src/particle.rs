//! Particle state shared by every swarm variant
//!
//! A [`Particle`] holds the fields all variants use (position, velocity,
//! coefficients, fitness and personal best). Variant-specific extras live in
//! the `meta` field: [`BaseMeta`], [`AcdMeta`] or [`EseMeta`].

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::{Error, Result};

/// Inertia used by ESE particles when no initializer is given
pub const DEFAULT_ESE_INERTIA: f64 = 0.9;

/// One candidate solution plus its adaptive search metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle<M> {
    /// Current position
    pub solution: Vec<f64>,
    /// Current velocity
    pub velocity: Vec<f64>,
    /// Cognitive coefficient (attraction to personal best)
    pub c1: f64,
    /// Social coefficient (attraction to neighbor/global best)
    pub c2: f64,
    /// Fitness from the most recent evaluation
    pub fitness: f64,
    /// Best fitness this particle has seen
    pub personal_best_fitness: f64,
    /// Position that achieved `personal_best_fitness`
    pub personal_best_position: Vec<f64>,
    /// Variant-specific metadata
    pub meta: M,
}

/// Metadata for the baseline swarm
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseMeta {
    /// Optional inertia; without it the increment accumulates onto the
    /// previous velocity
    pub inertia: Option<f64>,
}

/// Metadata for the adaptive complex-directed swarm
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AcdMeta {
    /// Degree-weighted social coefficient used in the latest velocity update
    pub social: f64,
}

/// Metadata for the ESE adaptive swarm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EseMeta {
    /// Per-particle inertia, rewritten every iteration from the evolutionary factor
    pub inertia: f64,
}

impl Default for EseMeta {
    fn default() -> Self {
        Self {
            inertia: DEFAULT_ESE_INERTIA,
        }
    }
}

/// Construction of variant metadata from an (optional) initial inertia
pub trait ParticleMeta: Clone {
    /// Build metadata for a freshly spawned particle
    fn from_inertia(inertia: Option<f64>) -> Self;
}

impl ParticleMeta for BaseMeta {
    fn from_inertia(inertia: Option<f64>) -> Self {
        Self { inertia }
    }
}

impl ParticleMeta for AcdMeta {
    fn from_inertia(_inertia: Option<f64>) -> Self {
        Self::default()
    }
}

impl ParticleMeta for EseMeta {
    fn from_inertia(inertia: Option<f64>) -> Self {
        Self {
            inertia: inertia.unwrap_or(DEFAULT_ESE_INERTIA),
        }
    }
}

impl<M> Particle<M> {
    /// Create an unevaluated particle.
    ///
    /// The personal best starts at the initial position with fitness
    /// `-inf`, so the first evaluation always replaces it.
    pub fn new(solution: Vec<f64>, velocity: Vec<f64>, c1: f64, c2: f64, meta: M) -> Result<Self> {
        if solution.is_empty() {
            return Err(Error::ZeroDimension);
        }
        if velocity.len() != solution.len() {
            return Err(Error::DimensionMismatch {
                what: "velocity",
                expected: solution.len(),
                found: velocity.len(),
            });
        }
        check_coefficient("c1", c1)?;
        check_coefficient("c2", c2)?;

        Ok(Self {
            personal_best_position: solution.clone(),
            solution,
            velocity,
            c1,
            c2,
            fitness: f64::NEG_INFINITY,
            personal_best_fitness: f64::NEG_INFINITY,
            meta,
        })
    }

    /// Number of solution components
    pub fn dim(&self) -> usize {
        self.solution.len()
    }

    /// Store a fresh fitness value and update the personal best.
    ///
    /// Uses strict `>`, so ties keep the earlier best. Returns `true` when
    /// the personal best improved.
    pub fn record_fitness(&mut self, fitness: f64) -> bool {
        self.fitness = fitness;
        if fitness > self.personal_best_fitness {
            self.personal_best_fitness = fitness;
            self.personal_best_position.clone_from(&self.solution);
            true
        } else {
            false
        }
    }

    /// Velocity update toward the personal best and a social target.
    ///
    /// `v = inertia * v + c1 * r1 * (pbest - x) + social * r2 * (target - x)`
    /// with fresh `r1, r2 ~ U[0, 1)` per dimension, then clamped to
    /// `velocity_bounds`.
    pub fn accelerate(
        &mut self,
        inertia: f64,
        social: f64,
        target: &[f64],
        velocity_bounds: &Bounds,
        rng: &mut dyn RngCore,
    ) {
        for i in 0..self.velocity.len() {
            let r1: f64 = rng.gen();
            let r2: f64 = rng.gen();
            let x = self.solution[i];
            let increment = self.c1 * r1 * (self.personal_best_position[i] - x)
                + social * r2 * (target[i] - x);
            self.velocity[i] = inertia * self.velocity[i] + increment;
        }
        velocity_bounds.clamp(&mut self.velocity);
    }

    /// Move by the current velocity and clamp into `position_bounds`
    pub fn advance(&mut self, position_bounds: &Bounds) {
        for (x, v) in self.solution.iter_mut().zip(&self.velocity) {
            *x += v;
        }
        position_bounds.clamp(&mut self.solution);
    }
}

pub(crate) fn check_coefficient(which: &'static str, value: f64) -> Result<()> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(Error::NegativeCoefficient { which, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn particle(solution: Vec<f64>) -> Particle<BaseMeta> {
        let dim = solution.len();
        Particle::new(solution, vec![0.0; dim], 2.0, 2.0, BaseMeta::default()).unwrap()
    }

    #[test]
    fn new_rejects_negative_coefficients() {
        let result = Particle::new(vec![0.0], vec![0.0], -1.0, 2.0, BaseMeta::default());
        assert_eq!(
            result,
            Err(Error::NegativeCoefficient {
                which: "c1",
                value: -1.0
            })
        );
    }

    #[test]
    fn new_rejects_velocity_length_mismatch() {
        let result = Particle::new(vec![0.0, 1.0], vec![0.0], 1.0, 1.0, BaseMeta::default());
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn record_fitness_keeps_earlier_best_on_tie() {
        let mut p = particle(vec![1.0]);
        assert!(p.record_fitness(-1.0));
        p.solution[0] = 2.0;
        assert!(!p.record_fitness(-1.0));
        assert_eq!(p.personal_best_position, vec![1.0]);
        assert_eq!(p.fitness, -1.0);
    }

    #[test]
    fn personal_best_never_decreases() {
        let mut p = particle(vec![0.0]);
        p.record_fitness(5.0);
        p.solution[0] = 3.0;
        p.record_fitness(1.0);
        assert_eq!(p.personal_best_fitness, 5.0);
        assert_eq!(p.personal_best_position, vec![0.0]);
        assert_eq!(p.fitness, 1.0);
    }

    #[test]
    fn accelerate_points_toward_targets_and_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut p = particle(vec![5.0, -5.0]);
        p.personal_best_position = vec![0.0, 0.0];
        let vel_bounds = Bounds::uniform(2, -1.0, 1.0);

        p.accelerate(1.0, 2.0, &[0.0, 0.0], &vel_bounds, &mut rng);

        assert!(p.velocity[0] <= 0.0);
        assert!(p.velocity[1] >= 0.0);
        assert!(vel_bounds.contains(&p.velocity));
    }

    #[test]
    fn advance_clamps_position() {
        let mut p = particle(vec![0.9]);
        p.velocity = vec![0.5];
        p.advance(&Bounds::uniform(1, -1.0, 1.0));
        assert_eq!(p.solution, vec![1.0]);
    }

    #[test]
    fn ese_meta_falls_back_to_default_inertia() {
        assert_eq!(EseMeta::from_inertia(None).inertia, DEFAULT_ESE_INERTIA);
        assert_eq!(EseMeta::from_inertia(Some(0.4)).inertia, 0.4);
        assert_eq!(BaseMeta::from_inertia(Some(0.7)).inertia, Some(0.7));
    }
}
