//! Swarm (population) state
//!
//! A [`Swarm`] exclusively owns its particles. Particle indices are stable
//! for the whole run; topology, elite and worst lookups all refer to them.

use serde::{Deserialize, Serialize};

use crate::particle::Particle;
use crate::topology::Topology;
use crate::traits::{DistanceFn, FitnessFn};
use crate::{Error, Result};

/// Ordered particle collection plus swarm-wide aggregates.
///
/// `S` carries the algorithm-specific adaptive state (`()` for the
/// baseline swarm).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swarm<M, S = ()> {
    /// Particles, indexed by stable identity
    pub particles: Vec<Particle<M>>,
    /// Best fitness ever observed by any particle
    pub best_fitness: f64,
    /// Position that achieved `best_fitness`
    pub best_position: Vec<f64>,
    /// Neighbor relation for the social term
    pub topology: Topology,
    /// Algorithm-specific adaptive state
    pub state: S,
}

/// Outcome of evaluating every particle once
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Index of the last particle that raised the swarm best, if any did
    pub improved_by: Option<usize>,
    /// Index of the fittest particle in this pass (first wins on ties)
    pub fittest: usize,
}

impl<M, S> Swarm<M, S> {
    /// Wrap spawned particles.
    ///
    /// The swarm best starts at `-inf` and the first particle's position.
    pub fn from_particles(
        particles: Vec<Particle<M>>,
        topology: Topology,
        state: S,
    ) -> Result<Self> {
        let first = particles.first().ok_or(Error::EmptySwarm)?;
        let dim = first.dim();
        if let Some(p) = particles.iter().find(|p| p.dim() != dim) {
            return Err(Error::DimensionMismatch {
                what: "particle solution",
                expected: dim,
                found: p.dim(),
            });
        }
        Ok(Self {
            best_position: first.solution.clone(),
            best_fitness: f64::NEG_INFINITY,
            particles,
            topology,
            state,
        })
    }

    /// Number of particles
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Always `false`: construction rejects empty swarms
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Solution dimensionality
    pub fn dim(&self) -> usize {
        self.particles[0].dim()
    }

    /// Iterate over particles in index order
    pub fn iter(&self) -> core::slice::Iter<'_, Particle<M>> {
        self.particles.iter()
    }

    /// Fold particle `ix`'s current fitness into the swarm best (strict `>`).
    ///
    /// Returns `true` when the swarm best improved.
    pub fn observe(&mut self, ix: usize) -> bool {
        let particle = &self.particles[ix];
        if particle.fitness > self.best_fitness {
            self.best_fitness = particle.fitness;
            self.best_position.clone_from(&particle.solution);
            true
        } else {
            false
        }
    }

    /// Evaluate every particle in index order, updating personal and swarm
    /// bests.
    pub fn evaluate<F: FitnessFn<M> + ?Sized>(&mut self, fitness_fn: &F) -> Evaluation {
        let mut improved_by = None;
        for ix in 0..self.particles.len() {
            let fitness = fitness_fn.fitness(&self.particles[ix]);
            self.particles[ix].record_fitness(fitness);
            if self.observe(ix) {
                improved_by = Some(ix);
            }
        }
        Evaluation {
            improved_by,
            fittest: self.fittest_index(),
        }
    }

    /// Index of the highest current fitness (first wins on ties)
    pub fn fittest_index(&self) -> usize {
        let mut best = 0;
        for (ix, p) in self.particles.iter().enumerate().skip(1) {
            if p.fitness > self.particles[best].fitness {
                best = ix;
            }
        }
        best
    }

    /// Index of the lowest current fitness (first wins on ties)
    pub fn worst_index(&self) -> usize {
        let mut worst = 0;
        for (ix, p) in self.particles.iter().enumerate().skip(1) {
            if p.fitness < self.particles[worst].fitness {
                worst = ix;
            }
        }
        worst
    }

    /// Current fitness of every particle
    pub fn fitnesses(&self) -> Vec<f64> {
        self.particles.iter().map(|p| p.fitness).collect()
    }

    /// Mean distance from each particle to every other particle.
    ///
    /// A one-particle swarm yields `[0.0]`.
    pub fn mean_distances<D: DistanceFn<M> + ?Sized>(&self, distance_fn: &D) -> Vec<f64> {
        let n = self.particles.len();
        let mut sums = vec![0.0; n];
        for i in 0..n {
            for j in 0..i {
                let d = distance_fn.distance(&self.particles[i], &self.particles[j]);
                sums[i] += d;
                sums[j] += d;
            }
        }
        if n > 1 {
            let denom = (n - 1) as f64;
            for s in &mut sums {
                *s /= denom;
            }
        }
        sums
    }
}

impl<M: Clone, S> Swarm<M, S> {
    /// Overwrite particle `target` with a copy of particle `source`, in place
    pub fn overwrite(&mut self, target: usize, source: usize) {
        if target == source {
            return;
        }
        if target < source {
            let (head, tail) = self.particles.split_at_mut(source);
            head[target].clone_from(&tail[0]);
        } else {
            let (head, tail) = self.particles.split_at_mut(target);
            tail[0].clone_from(&head[source]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::BaseMeta;
    use crate::traits::Euclidean;

    fn swarm_at(points: &[f64]) -> Swarm<BaseMeta> {
        let particles = points
            .iter()
            .map(|&x| Particle::new(vec![x], vec![0.0], 2.0, 2.0, BaseMeta::default()).unwrap())
            .collect();
        Swarm::from_particles(particles, Topology::FullyConnected, ()).unwrap()
    }

    #[test]
    fn from_particles_rejects_empty() {
        let result = Swarm::<BaseMeta>::from_particles(Vec::new(), Topology::FullyConnected, ());
        assert!(matches!(result, Err(Error::EmptySwarm)));
    }

    #[test]
    fn from_particles_rejects_mixed_dimensions() {
        let a = Particle::new(vec![0.0], vec![0.0], 1.0, 1.0, BaseMeta::default()).unwrap();
        let b =
            Particle::new(vec![0.0, 1.0], vec![0.0, 0.0], 1.0, 1.0, BaseMeta::default()).unwrap();
        let result = Swarm::from_particles(vec![a, b], Topology::FullyConnected, ());
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn evaluate_tracks_best_with_first_writer_wins() {
        let mut swarm = swarm_at(&[1.0, -1.0, 0.5]);
        let eval = swarm.evaluate(&|p: &Particle<BaseMeta>| -p.solution[0].powi(2) + 5.0);

        // particles 0 and 1 tie at 4.0; the earlier one is kept
        assert_eq!(swarm.best_fitness, 4.75);
        assert_eq!(swarm.best_position, vec![0.5]);
        assert_eq!(eval.fittest, 2);
        assert_eq!(eval.improved_by, Some(2));

        let mut tied = swarm_at(&[1.0, -1.0]);
        tied.evaluate(&|p: &Particle<BaseMeta>| -p.solution[0].powi(2));
        assert_eq!(tied.best_position, vec![1.0]);
        assert_eq!(tied.fittest_index(), 0);
    }

    #[test]
    fn evaluate_never_lowers_swarm_best() {
        let mut swarm = swarm_at(&[0.0]);
        swarm.evaluate(&|_: &Particle<BaseMeta>| 10.0);
        let eval = swarm.evaluate(&|_: &Particle<BaseMeta>| 1.0);
        assert_eq!(swarm.best_fitness, 10.0);
        assert_eq!(eval.improved_by, None);
    }

    #[test]
    fn worst_index_picks_lowest_fitness() {
        let mut swarm = swarm_at(&[3.0, 0.0, -2.0]);
        swarm.evaluate(&|p: &Particle<BaseMeta>| -p.solution[0].abs());
        assert_eq!(swarm.worst_index(), 0);
    }

    #[test]
    fn overwrite_copies_in_both_directions() {
        let mut swarm = swarm_at(&[1.0, 2.0, 3.0]);
        swarm.overwrite(0, 2);
        assert_eq!(swarm.particles[0].solution, vec![3.0]);
        swarm.overwrite(2, 1);
        assert_eq!(swarm.particles[2].solution, vec![2.0]);
        swarm.overwrite(1, 1);
        assert_eq!(swarm.particles[1].solution, vec![2.0]);
    }

    #[test]
    fn mean_distances_average_over_others() {
        let swarm = swarm_at(&[0.0, 1.0, 3.0]);
        let d = swarm.mean_distances(&Euclidean);
        assert_eq!(d, vec![2.0, 1.5, 2.5]);
    }

    #[test]
    fn mean_distance_of_single_particle_is_zero() {
        let swarm = swarm_at(&[4.0]);
        assert_eq!(swarm.mean_distances(&Euclidean), vec![0.0]);
    }
}
