//! Gradient local search and candidate selection
//!
//! A [`LocalSearch`] operator picks a subset of particles with a
//! [`Selector`] and moves each one a single gradient step:
//! `x -= lr * gradient(particle)`.

use core::fmt;
use std::sync::Arc;

use rand::seq::{index, SliceRandom};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::operator::Operator;
use crate::swarm::Swarm;
use crate::traits::GradientFn;
use crate::{Error, Result};

/// Weight given to the least fit particle by fitness-proportional selection
const MIN_SELECTION_WEIGHT: f64 = 1e-12;

/// Selection function over current fitnesses
pub type SelectorFn = Arc<dyn Fn(&[f64], &mut dyn RngCore) -> Vec<usize> + Send + Sync>;

/// Strategy picking particle indices for local search.
///
/// `k` is clamped to the swarm size. Every strategy returns distinct indices.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// `k` indices uniformly at random
    Random { k: usize },
    /// `k` indices drawn with weight increasing in current fitness; `+inf`
    /// fitness is taken before any finite one
    FitnessProportional { k: usize },
    /// The `k` fittest indices (earlier index first on ties)
    Elite { k: usize },
    /// Caller-supplied strategy
    #[serde(skip)]
    Custom(SelectorFn),
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Random { k } => f.debug_struct("Random").field("k", k).finish(),
            Selector::FitnessProportional { k } => {
                f.debug_struct("FitnessProportional").field("k", k).finish()
            }
            Selector::Elite { k } => f.debug_struct("Elite").field("k", k).finish(),
            Selector::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Selector {
    /// Wrap a selection function
    pub fn custom<F>(select: F) -> Self
    where
        F: Fn(&[f64], &mut dyn RngCore) -> Vec<usize> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(select))
    }

    /// Pick indices given the current fitness of every particle
    pub fn select(&self, fitnesses: &[f64], rng: &mut dyn RngCore) -> Result<Vec<usize>> {
        let n = fitnesses.len();
        match self {
            Selector::Random { k } => Ok(index::sample(rng, n, (*k).min(n)).into_vec()),
            Selector::FitnessProportional { k } => {
                let k = (*k).min(n);
                // +inf outweighs every finite fitness
                let (unbounded, rest): (Vec<usize>, Vec<usize>) =
                    (0..n).partition(|&ix| fitnesses[ix] == f64::INFINITY);
                if unbounded.len() >= k {
                    return Ok(unbounded.choose_multiple(rng, k).copied().collect());
                }

                let floor = rest
                    .iter()
                    .map(|&ix| fitnesses[ix])
                    .filter(|f| f.is_finite())
                    .fold(f64::INFINITY, f64::min);
                // NaN and -inf keep the floor weight
                let weight = |f: f64| {
                    if f.is_finite() {
                        f - floor + MIN_SELECTION_WEIGHT
                    } else {
                        MIN_SELECTION_WEIGHT
                    }
                };
                let chosen = rest
                    .choose_multiple_weighted(rng, k - unbounded.len(), |&ix| weight(fitnesses[ix]))
                    .map_err(|e| Error::Invariant(format!("fitness-proportional selection: {e}")))?;
                let mut picked = unbounded;
                picked.extend(chosen.copied());
                Ok(picked)
            }
            Selector::Elite { k } => {
                let mut order: Vec<usize> = (0..n).collect();
                order.sort_by(|&a, &b| fitnesses[b].total_cmp(&fitnesses[a]));
                order.truncate((*k).min(n));
                Ok(order)
            }
            Selector::Custom(select) => {
                let chosen = select(fitnesses, rng);
                match chosen.iter().find(|&&ix| ix >= n) {
                    Some(&ix) => Err(Error::OutOfRange {
                        name: "selected index",
                        value: ix as f64,
                        expected: "< number of particles",
                    }),
                    None => Ok(chosen),
                }
            }
        }
    }
}

/// One gradient step on each selected particle
pub struct LocalSearch<'a, M> {
    lr: f64,
    selector: Selector,
    gradient: Box<dyn GradientFn<M> + 'a>,
    bounds: Option<Bounds>,
}

impl<'a, M> LocalSearch<'a, M> {
    /// Step `x -= lr * gradient(particle)` on the particles `selector` picks.
    ///
    /// Positions are not clamped unless bounds are attached with
    /// [`LocalSearch::with_bounds`].
    pub fn new(lr: f64, selector: Selector, gradient: impl GradientFn<M> + 'a) -> Self {
        Self {
            lr,
            selector,
            gradient: Box::new(gradient),
            bounds: None,
        }
    }

    /// Clamp stepped positions into `bounds`
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Check the learning rate is positive and finite
    pub fn validate(&self) -> Result<()> {
        if self.lr > 0.0 && self.lr.is_finite() {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                name: "local search lr",
                value: self.lr,
                expected: "> 0",
            })
        }
    }
}

impl<'a, M, S> Operator<Swarm<M, S>> for LocalSearch<'a, M> {
    fn name(&self) -> &str {
        "local_search"
    }

    fn apply(&mut self, swarm: &mut Swarm<M, S>, rng: &mut dyn RngCore) -> Result<()> {
        let selected = self.selector.select(&swarm.fitnesses(), rng)?;
        for ix in selected {
            let particle = &mut swarm.particles[ix];
            let gradient = self.gradient.gradient(particle);
            if gradient.len() != particle.dim() {
                return Err(Error::DimensionMismatch {
                    what: "gradient",
                    expected: particle.dim(),
                    found: gradient.len(),
                });
            }
            for (x, g) in particle.solution.iter_mut().zip(&gradient) {
                *x -= self.lr * g;
            }
            if let Some(bounds) = &self.bounds {
                bounds.clamp(&mut particle.solution);
            }
        }
        Ok(())
    }
}
