//! Function-object traits for the collaborators an optimizer is handed
//!
//! Every trait has a blanket implementation for the matching closure
//! signature, so plain closures can be passed anywhere.

use crate::particle::Particle;

/// A fitness function to maximize
pub trait FitnessFn<M> {
    /// Evaluate the fitness of a particle
    fn fitness(&self, particle: &Particle<M>) -> f64;
}

impl<M, F> FitnessFn<M> for F
where
    F: Fn(&Particle<M>) -> f64,
{
    fn fitness(&self, particle: &Particle<M>) -> f64 {
        self(particle)
    }
}

/// Gradient used by the local search step
pub trait GradientFn<M> {
    /// Gradient at the particle's current position
    fn gradient(&self, particle: &Particle<M>) -> Vec<f64>;
}

impl<M, F> GradientFn<M> for F
where
    F: Fn(&Particle<M>) -> Vec<f64>,
{
    fn gradient(&self, particle: &Particle<M>) -> Vec<f64> {
        self(particle)
    }
}

/// Distance between two particles
pub trait DistanceFn<M> {
    /// Distance from `a` to `b`
    fn distance(&self, a: &Particle<M>, b: &Particle<M>) -> f64;
}

impl<M, F> DistanceFn<M> for F
where
    F: Fn(&Particle<M>, &Particle<M>) -> f64,
{
    fn distance(&self, a: &Particle<M>, b: &Particle<M>) -> f64 {
        self(a, b)
    }
}

/// Pairwise relation used to build neighbor lists
pub trait PairPredicate<M> {
    /// Whether `a` and `b` are neighbors
    fn related(&self, a: &Particle<M>, b: &Particle<M>) -> bool;
}

impl<M, F> PairPredicate<M> for F
where
    F: Fn(&Particle<M>, &Particle<M>) -> bool,
{
    fn related(&self, a: &Particle<M>, b: &Particle<M>) -> bool {
        self(a, b)
    }
}

/// Fitness differential between two fitness values
pub trait DifferenceFn {
    /// Differential of `a` relative to `b`
    fn difference(&self, a: f64, b: f64) -> f64;
}

impl<F> DifferenceFn for F
where
    F: Fn(f64, f64) -> f64,
{
    fn difference(&self, a: f64, b: f64) -> f64 {
        self(a, b)
    }
}

/// `a - b`
#[derive(Debug, Clone, Copy, Default)]
pub struct SignedDifference;

impl DifferenceFn for SignedDifference {
    fn difference(&self, a: f64, b: f64) -> f64 {
        a - b
    }
}

/// Euclidean distance between particle positions
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

impl<M> DistanceFn<M> for Euclidean {
    fn distance(&self, a: &Particle<M>, b: &Particle<M>) -> f64 {
        a.solution
            .iter()
            .zip(&b.solution)
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Manhattan (city-block) distance between particle positions
#[derive(Debug, Clone, Copy, Default)]
pub struct Manhattan;

impl<M> DistanceFn<M> for Manhattan {
    fn distance(&self, a: &Particle<M>, b: &Particle<M>) -> f64 {
        a.solution
            .iter()
            .zip(&b.solution)
            .map(|(x, y)| (x - y).abs())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::BaseMeta;

    fn at(solution: Vec<f64>) -> Particle<BaseMeta> {
        let dim = solution.len();
        Particle::new(solution, vec![0.0; dim], 1.0, 1.0, BaseMeta::default()).unwrap()
    }

    #[test]
    fn closures_are_fitness_functions() {
        let f = |p: &Particle<BaseMeta>| -p.solution[0].powi(2);
        assert_eq!(f.fitness(&at(vec![3.0])), -9.0);
    }

    #[test]
    fn euclidean_distance() {
        assert_eq!(Euclidean.distance(&at(vec![0.0, 0.0]), &at(vec![3.0, 4.0])), 5.0);
    }

    #[test]
    fn manhattan_distance() {
        assert_eq!(Manhattan.distance(&at(vec![0.0, 0.0]), &at(vec![3.0, -4.0])), 7.0);
    }

    #[test]
    fn signed_difference_is_antisymmetric() {
        assert_eq!(SignedDifference.difference(3.0, 1.0), 2.0);
        assert_eq!(SignedDifference.difference(1.0, 3.0), -2.0);
    }
}
