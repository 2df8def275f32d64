//! Particle initializers
//!
//! Positions, velocities, coefficients and inertia are drawn from small
//! serde-friendly descriptions. Each family also has a `Custom` variant
//! wrapping an explicit generator function; those are skipped by serde.

use core::fmt;
use std::sync::Arc;

use rand::{Rng, RngCore};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::particle::{check_coefficient, Particle, ParticleMeta};
use crate::{Error, Result};

/// Generator producing a vector of the requested length
pub type VectorGenerator = Arc<dyn Fn(usize, &mut dyn RngCore) -> Vec<f64> + Send + Sync>;
/// Generator producing a `(c1, c2)` pair
pub type CoefficientGenerator = Arc<dyn Fn(&mut dyn RngCore) -> (f64, f64) + Send + Sync>;
/// Generator producing a scalar
pub type ScalarGenerator = Arc<dyn Fn(&mut dyn RngCore) -> f64 + Send + Sync>;

/// Initializer for position and velocity vectors
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorInit {
    /// Every component equal to the value
    Constant(f64),
    /// `lo + (hi - lo) * U[0, 1)` per component
    Uniform { lo: f64, hi: f64 },
    /// `mean + std * N(0, 1)` per component
    Normal { mean: f64, std: f64 },
    /// `exp(U[ln lo, ln hi))` per component
    LogUniform { lo: f64, hi: f64 },
    /// `exp(mean + std * N(0, 1))` per component
    LogNormal { mean: f64, std: f64 },
    /// Fixed vector, copied into every particle
    Explicit(Vec<f64>),
    /// Caller-supplied generator
    #[serde(skip)]
    Custom(VectorGenerator),
}

impl fmt::Debug for VectorInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorInit::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            VectorInit::Uniform { lo, hi } => f
                .debug_struct("Uniform")
                .field("lo", lo)
                .field("hi", hi)
                .finish(),
            VectorInit::Normal { mean, std } => f
                .debug_struct("Normal")
                .field("mean", mean)
                .field("std", std)
                .finish(),
            VectorInit::LogUniform { lo, hi } => f
                .debug_struct("LogUniform")
                .field("lo", lo)
                .field("hi", hi)
                .finish(),
            VectorInit::LogNormal { mean, std } => f
                .debug_struct("LogNormal")
                .field("mean", mean)
                .field("std", std)
                .finish(),
            VectorInit::Explicit(v) => f.debug_tuple("Explicit").field(v).finish(),
            VectorInit::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl VectorInit {
    /// Wrap a generator function
    pub fn custom<F>(generator: F) -> Self
    where
        F: Fn(usize, &mut dyn RngCore) -> Vec<f64> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(generator))
    }

    /// Check the distribution parameters
    pub fn validate(&self) -> Result<()> {
        match *self {
            VectorInit::Uniform { lo, hi } if !(lo <= hi) => Err(Error::OutOfRange {
                name: "uniform initializer lo",
                value: lo,
                expected: "lo <= hi",
            }),
            VectorInit::LogUniform { lo, hi } if !(lo > 0.0 && lo <= hi) => {
                Err(Error::OutOfRange {
                    name: "log-uniform initializer lo",
                    value: lo,
                    expected: "0 < lo <= hi",
                })
            }
            VectorInit::Normal { std, .. } | VectorInit::LogNormal { std, .. }
                if !(std >= 0.0) =>
            {
                Err(Error::OutOfRange {
                    name: "normal initializer std",
                    value: std,
                    expected: ">= 0",
                })
            }
            _ => Ok(()),
        }
    }

    /// Draw a vector of length `dim`
    pub fn sample(&self, dim: usize, rng: &mut dyn RngCore) -> Result<Vec<f64>> {
        let values = match self {
            VectorInit::Constant(v) => vec![*v; dim],
            VectorInit::Uniform { lo, hi } => (0..dim)
                .map(|_| lo + (hi - lo) * rng.gen::<f64>())
                .collect(),
            VectorInit::Normal { mean, std } => (0..dim)
                .map(|_| mean + std * rng.sample::<f64, _>(StandardNormal))
                .collect(),
            VectorInit::LogUniform { lo, hi } => {
                let (lo, hi) = (lo.ln(), hi.ln());
                (0..dim)
                    .map(|_| (lo + (hi - lo) * rng.gen::<f64>()).exp())
                    .collect()
            }
            VectorInit::LogNormal { mean, std } => (0..dim)
                .map(|_| (mean + std * rng.sample::<f64, _>(StandardNormal)).exp())
                .collect(),
            VectorInit::Explicit(v) => v.clone(),
            VectorInit::Custom(generator) => generator(dim, rng),
        };
        if values.len() != dim {
            return Err(Error::DimensionMismatch {
                what: "initialized vector",
                expected: dim,
                found: values.len(),
            });
        }
        Ok(values)
    }
}

/// Initializer for the `(c1, c2)` coefficient pair
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoefficientInit {
    /// `c1` given, `c2 = 4 - c1`
    Single(f64),
    /// Both coefficients given
    Pair(f64, f64),
    /// Caller-supplied generator
    #[serde(skip)]
    Custom(CoefficientGenerator),
}

impl fmt::Debug for CoefficientInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoefficientInit::Single(c1) => f.debug_tuple("Single").field(c1).finish(),
            CoefficientInit::Pair(c1, c2) => f.debug_tuple("Pair").field(c1).field(c2).finish(),
            CoefficientInit::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Default for CoefficientInit {
    fn default() -> Self {
        Self::Pair(2.0, 2.0)
    }
}

impl CoefficientInit {
    /// Wrap a generator function
    pub fn custom<F>(generator: F) -> Self
    where
        F: Fn(&mut dyn RngCore) -> (f64, f64) + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(generator))
    }

    /// Draw `(c1, c2)`, rejecting negative values
    pub fn sample(&self, rng: &mut dyn RngCore) -> Result<(f64, f64)> {
        let (c1, c2) = match self {
            CoefficientInit::Single(c1) => (*c1, 4.0 - c1),
            CoefficientInit::Pair(c1, c2) => (*c1, *c2),
            CoefficientInit::Custom(generator) => generator(rng),
        };
        check_coefficient("c1", c1)?;
        check_coefficient("c2", c2)?;
        Ok((c1, c2))
    }
}

/// Initializer for a scalar such as inertia
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarInit {
    /// Fixed value
    Constant(f64),
    /// `lo + (hi - lo) * U[0, 1)`
    Uniform { lo: f64, hi: f64 },
    /// Caller-supplied generator
    #[serde(skip)]
    Custom(ScalarGenerator),
}

impl fmt::Debug for ScalarInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarInit::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            ScalarInit::Uniform { lo, hi } => f
                .debug_struct("Uniform")
                .field("lo", lo)
                .field("hi", hi)
                .finish(),
            ScalarInit::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl ScalarInit {
    /// Wrap a generator function
    pub fn custom<F>(generator: F) -> Self
    where
        F: Fn(&mut dyn RngCore) -> f64 + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(generator))
    }

    /// Draw one value
    pub fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        match self {
            ScalarInit::Constant(v) => *v,
            ScalarInit::Uniform { lo, hi } => lo + (hi - lo) * rng.gen::<f64>(),
            ScalarInit::Custom(generator) => generator(rng),
        }
    }
}

/// Everything needed to spawn the particles of a swarm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmInit {
    /// Number of particles
    pub n_particles: usize,
    /// Solution dimensionality
    pub dim: usize,
    /// Position initializer
    pub position: VectorInit,
    /// Velocity initializer
    pub velocity: VectorInit,
    /// Coefficient initializer
    #[serde(default)]
    pub coefficients: CoefficientInit,
    /// Optional inertia initializer
    #[serde(default)]
    pub inertia: Option<ScalarInit>,
}

impl SwarmInit {
    /// Positions uniform in `[-1, 1)`, zero velocity, `c = (2, 2)`, no inertia
    pub fn new(n_particles: usize, dim: usize) -> Self {
        Self {
            n_particles,
            dim,
            position: VectorInit::Uniform { lo: -1.0, hi: 1.0 },
            velocity: VectorInit::Constant(0.0),
            coefficients: CoefficientInit::default(),
            inertia: None,
        }
    }

    /// Set the position initializer
    pub fn with_position(mut self, position: VectorInit) -> Self {
        self.position = position;
        self
    }

    /// Set the velocity initializer
    pub fn with_velocity(mut self, velocity: VectorInit) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the coefficient initializer
    pub fn with_coefficients(mut self, coefficients: CoefficientInit) -> Self {
        self.coefficients = coefficients;
        self
    }

    /// Set the inertia initializer
    pub fn with_inertia(mut self, inertia: ScalarInit) -> Self {
        self.inertia = Some(inertia);
        self
    }

    /// Check sizes and distribution parameters
    pub fn validate(&self) -> Result<()> {
        if self.n_particles == 0 {
            return Err(Error::EmptySwarm);
        }
        if self.dim == 0 {
            return Err(Error::ZeroDimension);
        }
        self.position.validate()?;
        self.velocity.validate()
    }

    /// Spawn `n_particles` unevaluated particles
    pub fn spawn<M: ParticleMeta>(&self, rng: &mut dyn RngCore) -> Result<Vec<Particle<M>>> {
        self.validate()?;
        (0..self.n_particles)
            .map(|_| {
                let solution = self.position.sample(self.dim, rng)?;
                let velocity = self.velocity.sample(self.dim, rng)?;
                let (c1, c2) = self.coefficients.sample(rng)?;
                let inertia = self.inertia.as_ref().map(|w| w.sample(rng));
                Particle::new(solution, velocity, c1, c2, M::from_inertia(inertia))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::{BaseMeta, EseMeta};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn uniform_samples_stay_in_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        let values = VectorInit::Uniform { lo: -2.0, hi: 3.0 }
            .sample(100, &mut rng)
            .unwrap();
        assert!(values.iter().all(|v| (-2.0..3.0).contains(v)));
    }

    #[test]
    fn log_uniform_requires_positive_lower_bound() {
        let init = VectorInit::LogUniform { lo: 0.0, hi: 1.0 };
        assert!(matches!(init.validate(), Err(Error::OutOfRange { .. })));

        let mut rng = StdRng::seed_from_u64(2);
        let values = VectorInit::LogUniform { lo: 1e-3, hi: 1.0 }
            .sample(50, &mut rng)
            .unwrap();
        assert!(values.iter().all(|v| *v >= 1e-3 && *v <= 1.0));
    }

    #[test]
    fn explicit_vector_must_match_dimension() {
        let mut rng = StdRng::seed_from_u64(3);
        let init = VectorInit::Explicit(vec![1.0, 2.0]);
        assert_eq!(init.sample(2, &mut rng).unwrap(), vec![1.0, 2.0]);
        assert!(matches!(
            init.sample(3, &mut rng),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn custom_generator_receives_dimension() {
        let mut rng = StdRng::seed_from_u64(4);
        let init = VectorInit::custom(|dim, _rng| (0..dim).map(|i| i as f64).collect());
        assert_eq!(init.sample(3, &mut rng).unwrap(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn single_coefficient_completes_to_four() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(
            CoefficientInit::Single(1.5).sample(&mut rng).unwrap(),
            (1.5, 2.5)
        );
    }

    #[test]
    fn single_coefficient_above_four_is_rejected() {
        let mut rng = StdRng::seed_from_u64(6);
        assert_eq!(
            CoefficientInit::Single(5.0).sample(&mut rng),
            Err(Error::NegativeCoefficient {
                which: "c2",
                value: -1.0
            })
        );
    }

    #[test]
    fn spawn_builds_unevaluated_particles() {
        let mut rng = StdRng::seed_from_u64(7);
        let init = SwarmInit::new(4, 3).with_inertia(ScalarInit::Constant(0.5));
        let particles: Vec<Particle<BaseMeta>> = init.spawn(&mut rng).unwrap();

        assert_eq!(particles.len(), 4);
        for p in &particles {
            assert_eq!(p.dim(), 3);
            assert_eq!(p.fitness, f64::NEG_INFINITY);
            assert_eq!(p.personal_best_position, p.solution);
            assert_eq!(p.meta.inertia, Some(0.5));
        }
    }

    #[test]
    fn spawn_rejects_empty_swarm() {
        let mut rng = StdRng::seed_from_u64(8);
        let result = SwarmInit::new(0, 3).spawn::<EseMeta>(&mut rng);
        assert!(matches!(result, Err(Error::EmptySwarm)));
    }

    #[test]
    fn swarm_init_round_trips_through_json() {
        let init = SwarmInit::new(10, 2)
            .with_position(VectorInit::Uniform { lo: -5.12, hi: 5.12 })
            .with_coefficients(CoefficientInit::Pair(1.5, 2.5));
        let json = serde_json::to_string(&init).unwrap();
        let back: SwarmInit = serde_json::from_str(&json).unwrap();
        assert_eq!(back.n_particles, 10);
        assert!(matches!(
            back.position,
            VectorInit::Uniform { lo, hi } if lo == -5.12 && hi == 5.12
        ));
    }
}
