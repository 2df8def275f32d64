//! Benchmark fitness functions and particle distances.
//!
//! Both benchmarks are negated so that the optimizers, which maximize, search
//! for their minimum. Gradients are of the (negated) fitness.

use std::f64::consts::PI;

use swarm_pso_core::particle::Particle;
use swarm_pso_core::traits::{DistanceFn, Euclidean, Manhattan};

/// Search interval of the sphere benchmark
pub const SPHERE_BOUNDS: (f64, f64) = (-10.0, 10.0);
/// Search interval of the rastrigin benchmark
pub const RASTRIGIN_BOUNDS: (f64, f64) = (-5.12, 5.12);

/// `-Σ x²`
pub fn sphere<M>(particle: &Particle<M>) -> f64 {
    -particle.solution.iter().map(|x| x * x).sum::<f64>()
}

/// `-2x`
pub fn sphere_gradient<M>(particle: &Particle<M>) -> Vec<f64> {
    particle.solution.iter().map(|x| -2.0 * x).collect()
}

/// `-Σ (x² + 10 cos 2πx + 10)`
///
/// Note the `+ 10 cos` term: the global maximum is not at the origin.
pub fn rastrigin<M>(particle: &Particle<M>) -> f64 {
    -particle
        .solution
        .iter()
        .map(|x| x * x + 10.0 * (2.0 * PI * x).cos() + 10.0)
        .sum::<f64>()
}

/// `-(2x - 20π sin 2πx)`
pub fn rastrigin_gradient<M>(particle: &Particle<M>) -> Vec<f64> {
    particle
        .solution
        .iter()
        .map(|x| -(2.0 * x - 20.0 * PI * (2.0 * PI * x).sin()))
        .collect()
}

pub fn euclidean<M>(a: &Particle<M>, b: &Particle<M>) -> f64 {
    Euclidean.distance(a, b)
}

pub fn manhattan<M>(a: &Particle<M>, b: &Particle<M>) -> f64 {
    Manhattan.distance(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_pso_core::particle::BaseMeta;

    fn at(solution: Vec<f64>) -> Particle<BaseMeta> {
        let dim = solution.len();
        Particle::new(solution, vec![0.0; dim], 2.0, 2.0, BaseMeta::default()).unwrap()
    }

    #[test]
    fn sphere_peaks_at_origin() {
        assert_eq!(sphere(&at(vec![0.0, 0.0])), 0.0);
        assert_eq!(sphere(&at(vec![1.0, -2.0])), -5.0);
        assert_eq!(sphere_gradient(&at(vec![1.0, -2.0])), vec![-2.0, 4.0]);
    }

    #[test]
    fn rastrigin_keeps_plus_ten_cosine() {
        // cos(0) = 1, so the origin scores -(0 + 10 + 10)
        assert!((rastrigin(&at(vec![0.0])) + 20.0).abs() < 1e-12);
        // at x = 0.5 the cosine term is -10
        assert!((rastrigin(&at(vec![0.5])) + 0.25).abs() < 1e-12);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let h = 1e-6;
        for x in [-3.3, -0.7, 0.2, 1.9, 4.4] {
            let numeric = (rastrigin(&at(vec![x + h])) - rastrigin(&at(vec![x - h]))) / (2.0 * h);
            assert!((rastrigin_gradient(&at(vec![x]))[0] - numeric).abs() < 1e-4, "x = {x}");

            let numeric = (sphere(&at(vec![x + h])) - sphere(&at(vec![x - h]))) / (2.0 * h);
            assert!((sphere_gradient(&at(vec![x]))[0] - numeric).abs() < 1e-4, "x = {x}");
        }
    }

    #[test]
    fn distances() {
        let (a, b) = (at(vec![1.0, 1.0]), at(vec![4.0, 5.0]));
        assert_eq!(euclidean(&a, &b), 5.0);
        assert_eq!(manhattan(&a, &b), 7.0);
    }
}
