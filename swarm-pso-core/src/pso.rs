//! Baseline particle swarm optimization
//!
//! The baseline swarm moves every particle toward its personal best and the
//! best personal best among its neighbors, as resolved through the swarm
//! [`Topology`]. [`pso_maximize`] drives a pipeline of the operators below:
//!
//! ```text
//! EvalFitness -> VelocityUpdate -> PositionUpdate [-> UpdateTopology*]
//! ```

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::init::SwarmInit;
use crate::operator::{Operator, Pipeline};
use crate::particle::{BaseMeta, Particle};
use crate::report::RunReport;
use crate::swarm::Swarm;
use crate::telemetry::Progress;
use crate::topology::{SquareMatrix, Topology};
use crate::traits::{DistanceFn, FitnessFn, PairPredicate};
use crate::{Error, Result};

/// Swarm used by the baseline optimizer
pub type BaseSwarm = Swarm<BaseMeta, ()>;

impl Swarm<BaseMeta, ()> {
    /// Spawn a baseline swarm with a fixed initial topology
    pub fn new(init: &SwarmInit, topology: Topology, rng: &mut dyn RngCore) -> Result<Self> {
        init.validate()?;
        topology.validate(init.n_particles)?;
        let particles = init.spawn(rng)?;
        Swarm::from_particles(particles, topology, ())
    }

    /// Spawn a baseline swarm whose initial topology is computed from the
    /// freshly spawned particles
    pub fn with_topology_fn<F>(
        init: &SwarmInit,
        topology_fn: F,
        rng: &mut dyn RngCore,
    ) -> Result<Self>
    where
        F: FnOnce(&[Particle<BaseMeta>]) -> Topology,
    {
        init.validate()?;
        let particles = init.spawn(rng)?;
        let topology = topology_fn(&particles);
        topology.validate(particles.len())?;
        Swarm::from_particles(particles, topology, ())
    }
}

/// Where a particle's social term points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialTarget {
    /// The swarm-wide best position
    SwarmBest,
    /// Personal best of the particle at this index
    PersonalBest(usize),
}

/// Index among `candidates` with the highest personal best (first wins)
pub(crate) fn best_of<M, S>(
    swarm: &Swarm<M, S>,
    candidates: impl IntoIterator<Item = usize>,
) -> Option<usize> {
    let mut best: Option<usize> = None;
    for j in candidates {
        let better = match best {
            None => true,
            Some(b) => {
                swarm.particles[j].personal_best_fitness > swarm.particles[b].personal_best_fitness
            }
        };
        if better {
            best = Some(j);
        }
    }
    best
}

/// Resolve the social target of particle `ix` through the swarm topology.
///
/// - fully connected: the swarm best
/// - weighted: the best personal best among indices whose entry is strictly
///   below `threshold`; an empty or all-zero row, or no qualifying index,
///   falls back to the particle's own personal best; without a threshold the
///   swarm best is used
/// - neighbor lists: the best personal best among the listed indices, or the
///   particle's own when the list is empty
pub fn social_target<M, S>(swarm: &Swarm<M, S>, ix: usize, threshold: Option<f64>) -> SocialTarget {
    match &swarm.topology {
        Topology::FullyConnected => SocialTarget::SwarmBest,
        Topology::Weighted(matrix) => {
            let row = matrix.row(ix);
            if row.iter().all(|&w| w == 0.0) {
                return SocialTarget::PersonalBest(ix);
            }
            let Some(threshold) = threshold else {
                return SocialTarget::SwarmBest;
            };
            let within = row
                .iter()
                .enumerate()
                .filter(|(_, &d)| d < threshold)
                .map(|(j, _)| j);
            SocialTarget::PersonalBest(best_of(swarm, within).unwrap_or(ix))
        }
        Topology::Neighbors(lists) => {
            SocialTarget::PersonalBest(best_of(swarm, lists[ix].iter().copied()).unwrap_or(ix))
        }
    }
}

/// Evaluate the fitness of every particle and fold it into personal and
/// swarm bests
pub struct EvalFitness<F> {
    fitness_fn: F,
}

impl<F> EvalFitness<F> {
    pub fn new(fitness_fn: F) -> Self {
        Self { fitness_fn }
    }
}

impl<M, S, F: FitnessFn<M>> Operator<Swarm<M, S>> for EvalFitness<F> {
    fn name(&self) -> &str {
        "eval_fitness"
    }

    fn apply(&mut self, swarm: &mut Swarm<M, S>, _rng: &mut dyn RngCore) -> Result<()> {
        swarm.evaluate(&self.fitness_fn);
        Ok(())
    }
}

/// Topology-aware velocity update for baseline particles
pub struct VelocityUpdate {
    velocity_bounds: Bounds,
    threshold: Option<f64>,
    target: Vec<f64>,
}

impl VelocityUpdate {
    pub fn new(velocity_bounds: Bounds, threshold: Option<f64>) -> Self {
        Self {
            velocity_bounds,
            threshold,
            target: Vec::new(),
        }
    }
}

impl<S> Operator<Swarm<BaseMeta, S>> for VelocityUpdate {
    fn name(&self) -> &str {
        "velocity_update"
    }

    fn apply(&mut self, swarm: &mut Swarm<BaseMeta, S>, rng: &mut dyn RngCore) -> Result<()> {
        for ix in 0..swarm.len() {
            let source = match social_target(swarm, ix, self.threshold) {
                SocialTarget::SwarmBest => &swarm.best_position,
                SocialTarget::PersonalBest(j) => &swarm.particles[j].personal_best_position,
            };
            self.target.clone_from(source);

            let particle = &mut swarm.particles[ix];
            let inertia = particle.meta.inertia.unwrap_or(1.0);
            let social = particle.c2;
            particle.accelerate(inertia, social, &self.target, &self.velocity_bounds, rng);
        }
        Ok(())
    }
}

/// `x += v` followed by clamping into the position bounds
pub struct PositionUpdate {
    bounds: Bounds,
}

impl PositionUpdate {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }
}

impl<M, S> Operator<Swarm<M, S>> for PositionUpdate {
    fn name(&self) -> &str {
        "position_update"
    }

    fn apply(&mut self, swarm: &mut Swarm<M, S>, _rng: &mut dyn RngCore) -> Result<()> {
        for particle in &mut swarm.particles {
            particle.advance(&self.bounds);
        }
        Ok(())
    }
}

/// Recompute a symmetric weighted topology from pairwise distances
pub struct UpdateTopologyDist<D> {
    distance_fn: D,
}

impl<D> UpdateTopologyDist<D> {
    pub fn new(distance_fn: D) -> Self {
        Self { distance_fn }
    }
}

/// Symmetric pairwise distance matrix, diagonal included
pub fn distance_matrix<M, S, D: DistanceFn<M> + ?Sized>(
    swarm: &Swarm<M, S>,
    distance_fn: &D,
) -> SquareMatrix {
    let n = swarm.len();
    let mut matrix = SquareMatrix::zeros(n);
    for i in 0..n {
        for j in 0..=i {
            let d = distance_fn.distance(&swarm.particles[i], &swarm.particles[j]);
            matrix[(i, j)] = d;
            matrix[(j, i)] = d;
        }
    }
    matrix
}

impl<M, S, D: DistanceFn<M>> Operator<Swarm<M, S>> for UpdateTopologyDist<D> {
    fn name(&self) -> &str {
        "update_topology_dist"
    }

    fn apply(&mut self, swarm: &mut Swarm<M, S>, _rng: &mut dyn RngCore) -> Result<()> {
        swarm.topology = Topology::Weighted(distance_matrix(swarm, &self.distance_fn));
        Ok(())
    }
}

/// Recompute neighbor lists from a symmetric pair predicate
pub struct UpdateTopologyPredicate<P> {
    predicate: P,
}

impl<P> UpdateTopologyPredicate<P> {
    pub fn new(predicate: P) -> Self {
        Self { predicate }
    }
}

impl<M, S, P: PairPredicate<M>> Operator<Swarm<M, S>> for UpdateTopologyPredicate<P> {
    fn name(&self) -> &str {
        "update_topology_predicate"
    }

    fn apply(&mut self, swarm: &mut Swarm<M, S>, _rng: &mut dyn RngCore) -> Result<()> {
        let n = swarm.len();
        let mut lists = vec![Vec::new(); n];
        for i in 0..n {
            if self.predicate.related(&swarm.particles[i], &swarm.particles[i]) {
                lists[i].push(i);
            }
            for j in 0..i {
                if self.predicate.related(&swarm.particles[i], &swarm.particles[j]) {
                    lists[i].push(j);
                    lists[j].push(i);
                }
            }
        }
        swarm.topology = Topology::Neighbors(lists);
        Ok(())
    }
}

/// Configuration for [`pso_maximize`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsoConfig {
    /// Iteration budget (at least 1)
    pub n_iter: usize,
    /// Position bounds
    pub bounds: Bounds,
    /// Velocity bounds; `±0.5 * (upper - lower)` when absent
    #[serde(default)]
    pub velocity_bounds: Option<Bounds>,
    /// Neighbor distance threshold for weighted topologies
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Progress verbosity (see [`crate::telemetry`])
    #[serde(default)]
    pub verbosity: u8,
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self::new(100, Bounds::uniform(1, -1.0, 1.0))
    }
}

impl PsoConfig {
    /// Configuration with the given budget and bounds
    pub fn new(n_iter: usize, bounds: Bounds) -> Self {
        Self {
            n_iter,
            bounds,
            velocity_bounds: None,
            threshold: None,
            verbosity: 0,
        }
    }

    pub fn with_velocity_bounds(mut self, velocity_bounds: Bounds) -> Self {
        self.velocity_bounds = Some(velocity_bounds);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Validate against a swarm of dimensionality `dim`
    pub fn validate(&self, dim: usize) -> Result<()> {
        if self.n_iter == 0 {
            return Err(Error::ZeroIterations);
        }
        self.bounds.validate("position bounds", dim)?;
        if let Some(velocity_bounds) = &self.velocity_bounds {
            velocity_bounds.validate("velocity bounds", dim)?;
        }
        if let Some(threshold) = self.threshold {
            if threshold.is_nan() {
                return Err(Error::OutOfRange {
                    name: "threshold",
                    value: threshold,
                    expected: "a number",
                });
            }
        }
        Ok(())
    }

    /// Velocity bounds, derived from the position bounds when absent
    pub fn resolved_velocity_bounds(&self) -> Bounds {
        self.velocity_bounds
            .clone()
            .unwrap_or_else(|| self.bounds.velocity_default())
    }
}

type Termination<'a> = Box<dyn Fn(&BaseSwarm) -> bool + 'a>;
type PairDistance<'a> = Box<dyn Fn(&Particle<BaseMeta>, &Particle<BaseMeta>) -> f64 + 'a>;
type PairRelation<'a> = Box<dyn Fn(&Particle<BaseMeta>, &Particle<BaseMeta>) -> bool + 'a>;

/// Optional callbacks for [`pso_maximize`]
#[derive(Default)]
pub struct PsoHooks<'a> {
    /// Stop early once this returns `true` after an iteration
    pub termination: Option<Termination<'a>>,
    /// Rebuild a weighted topology from this distance every iteration
    pub topology_distance: Option<PairDistance<'a>>,
    /// Rebuild neighbor lists from this predicate every iteration
    pub topology_predicate: Option<PairRelation<'a>>,
}

impl<'a> PsoHooks<'a> {
    pub fn with_termination(mut self, f: impl Fn(&BaseSwarm) -> bool + 'a) -> Self {
        self.termination = Some(Box::new(f));
        self
    }

    pub fn with_topology_distance(
        mut self,
        f: impl Fn(&Particle<BaseMeta>, &Particle<BaseMeta>) -> f64 + 'a,
    ) -> Self {
        self.topology_distance = Some(Box::new(f));
        self
    }

    pub fn with_topology_predicate(
        mut self,
        f: impl Fn(&Particle<BaseMeta>, &Particle<BaseMeta>) -> bool + 'a,
    ) -> Self {
        self.topology_predicate = Some(Box::new(f));
        self
    }
}

/// Maximize `fitness_fn` with the baseline swarm.
///
/// The configuration and hooks are validated before the swarm is touched.
/// The pipeline runs up to `config.n_iter` times, stopping early when the
/// termination hook fires, and a final evaluation follows the loop.
pub fn pso_maximize<F>(
    swarm: &mut BaseSwarm,
    fitness_fn: &F,
    config: &PsoConfig,
    hooks: PsoHooks<'_>,
    rng: &mut dyn RngCore,
) -> Result<RunReport>
where
    F: FitnessFn<BaseMeta> + ?Sized,
{
    config.validate(swarm.dim())?;
    swarm.topology.validate(swarm.len())?;
    let PsoHooks {
        termination,
        topology_distance,
        topology_predicate,
    } = hooks;
    if topology_distance.is_some() && topology_predicate.is_some() {
        return Err(Error::ConflictingTopology);
    }
    if topology_distance.is_some() && config.threshold.is_none() {
        return Err(Error::MissingThreshold);
    }

    let mut pipeline = Pipeline::builder()
        .then(EvalFitness::new(|p: &Particle<BaseMeta>| fitness_fn.fitness(p)))
        .then(VelocityUpdate::new(config.resolved_velocity_bounds(), config.threshold))
        .then(PositionUpdate::new(config.bounds.clone()))
        .then_some(topology_distance.map(UpdateTopologyDist::new))
        .then_some(topology_predicate.map(UpdateTopologyPredicate::new))
        .build();

    let progress = Progress::new("pso", config.verbosity);
    progress.started(config.n_iter, swarm.len(), swarm.dim());

    let mut iterations = 0;
    let mut terminated_early = false;
    for iter in 1..=config.n_iter {
        progress.iteration_started(iter);
        pipeline.apply(swarm, rng)?;
        iterations = iter;
        progress.iteration_finished(iter, swarm);
        if termination.as_ref().is_some_and(|stop| stop(&*swarm)) {
            terminated_early = iter < config.n_iter;
            break;
        }
    }

    swarm.evaluate(&|p: &Particle<BaseMeta>| fitness_fn.fitness(p));

    let report = RunReport::from_swarm(swarm, iterations, terminated_early);
    progress.finished(&report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init::VectorInit;
    use crate::traits::Euclidean;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sphere(p: &Particle<BaseMeta>) -> f64 {
        -p.solution.iter().map(|x| x * x).sum::<f64>()
    }

    fn line(points: &[f64]) -> BaseSwarm {
        let particles = points
            .iter()
            .map(|&x| Particle::new(vec![x], vec![0.0], 2.0, 2.0, BaseMeta::default()).unwrap())
            .collect();
        Swarm::from_particles(particles, Topology::FullyConnected, ()).unwrap()
    }

    #[test]
    fn single_particle_sphere_never_gets_worse() {
        let mut rng = StdRng::seed_from_u64(1);
        let init = SwarmInit::new(1, 1)
            .with_position(VectorInit::Explicit(vec![3.0]))
            .with_velocity(VectorInit::Constant(0.0));
        let mut swarm = BaseSwarm::new(&init, Topology::FullyConnected, &mut rng).unwrap();
        let before = sphere(&swarm.particles[0]);

        let config = PsoConfig::new(1, Bounds::uniform(1, -10.0, 10.0));
        let report =
            pso_maximize(&mut swarm, &sphere, &config, PsoHooks::default(), &mut rng).unwrap();

        assert!(swarm.particles[0].solution[0].abs() <= 3.0);
        assert!(report.best_fitness >= before);
        assert_eq!(report.iterations, 1);
        assert!(!report.terminated_early);
    }

    #[test]
    fn swarm_best_is_monotonic() {
        let mut rng = StdRng::seed_from_u64(11);
        let init = SwarmInit::new(8, 3).with_position(VectorInit::Uniform { lo: -10.0, hi: 10.0 });
        let mut swarm = BaseSwarm::new(&init, Topology::FullyConnected, &mut rng).unwrap();
        let config = PsoConfig::new(1, Bounds::uniform(3, -10.0, 10.0));

        let mut last = f64::NEG_INFINITY;
        for _ in 0..20 {
            pso_maximize(&mut swarm, &sphere, &config, PsoHooks::default(), &mut rng).unwrap();
            assert!(swarm.best_fitness >= last);
            last = swarm.best_fitness;
            for p in swarm.iter() {
                assert!(config.bounds.contains(&p.solution));
                assert!(config.resolved_velocity_bounds().contains(&p.velocity));
            }
        }
    }

    #[test]
    fn configuration_errors_leave_swarm_untouched() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut swarm = line(&[1.0, 2.0]);
        let snapshot = swarm.clone();

        let zero = PsoConfig::new(0, Bounds::uniform(1, -1.0, 1.0));
        assert_eq!(
            pso_maximize(&mut swarm, &sphere, &zero, PsoHooks::default(), &mut rng),
            Err(Error::ZeroIterations)
        );

        let inverted = PsoConfig::new(5, Bounds::new(vec![1.0], vec![-1.0]));
        assert!(matches!(
            pso_maximize(&mut swarm, &sphere, &inverted, PsoHooks::default(), &mut rng),
            Err(Error::InvertedBounds { .. })
        ));

        let config = PsoConfig::new(5, Bounds::uniform(1, -10.0, 10.0)).with_threshold(1.0);
        let both = PsoHooks::default()
            .with_topology_distance(|a, b| (a.solution[0] - b.solution[0]).abs())
            .with_topology_predicate(|_, _| true);
        assert_eq!(
            pso_maximize(&mut swarm, &sphere, &config, both, &mut rng),
            Err(Error::ConflictingTopology)
        );

        let no_threshold = PsoConfig::new(5, Bounds::uniform(1, -10.0, 10.0));
        let dist = PsoHooks::default()
            .with_topology_distance(|a, b| (a.solution[0] - b.solution[0]).abs());
        assert_eq!(
            pso_maximize(&mut swarm, &sphere, &no_threshold, dist, &mut rng),
            Err(Error::MissingThreshold)
        );

        assert_eq!(swarm.particles, snapshot.particles);
        assert_eq!(swarm.best_fitness, f64::NEG_INFINITY);
    }

    #[test]
    fn termination_stops_after_the_iteration_that_fires() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut swarm = line(&[4.0, -2.0, 1.0]);
        let config = PsoConfig::new(50, Bounds::uniform(1, -10.0, 10.0));
        let hooks = PsoHooks::default()
            .with_termination(|s: &BaseSwarm| s.best_fitness > f64::NEG_INFINITY);

        let report = pso_maximize(&mut swarm, &sphere, &config, hooks, &mut rng).unwrap();
        assert_eq!(report.iterations, 1);
        assert!(report.terminated_early);
    }

    #[test]
    fn weighted_row_picks_best_within_threshold() {
        let mut swarm = line(&[0.0, 1.0, 5.0]);
        swarm.evaluate(&sphere);
        swarm.topology = Topology::Weighted(distance_matrix(&swarm, &Euclidean));

        // particle 2 only sees itself within 2.0
        assert_eq!(social_target(&swarm, 2, Some(2.0)), SocialTarget::PersonalBest(2));
        // particle 1 sees 0 and 1; 0 is fitter
        assert_eq!(social_target(&swarm, 1, Some(2.0)), SocialTarget::PersonalBest(0));
        assert_eq!(social_target(&swarm, 1, None), SocialTarget::SwarmBest);
    }

    #[test]
    fn all_zero_row_falls_back_to_own_best() {
        let mut swarm = line(&[1.0, 1.0]);
        swarm.evaluate(&sphere);
        swarm.topology = Topology::Weighted(SquareMatrix::zeros(2));
        assert_eq!(social_target(&swarm, 1, Some(1.0)), SocialTarget::PersonalBest(1));
    }

    #[test]
    fn neighbor_lists_break_ties_by_first_found() {
        let mut swarm = line(&[1.0, -1.0, 3.0]);
        swarm.evaluate(&sphere);
        swarm.topology = Topology::Neighbors(vec![vec![2, 1, 0], vec![], vec![2]]);
        assert_eq!(social_target(&swarm, 0, None), SocialTarget::PersonalBest(1));
        assert_eq!(social_target(&swarm, 1, None), SocialTarget::PersonalBest(1));
    }

    #[test]
    fn topology_updates_are_symmetric() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut swarm = line(&[0.0, 0.5, 3.0]);

        UpdateTopologyDist::new(Euclidean).apply(&mut swarm, &mut rng).unwrap();
        let Topology::Weighted(m) = &swarm.topology else {
            panic!("distance update must produce a weighted topology");
        };
        assert!(m.is_symmetric(0.0));
        assert_eq!(m[(0, 2)], 3.0);

        let close = |a: &Particle<BaseMeta>, b: &Particle<BaseMeta>| {
            (a.solution[0] - b.solution[0]).abs() < 1.0
        };
        UpdateTopologyPredicate::new(close).apply(&mut swarm, &mut rng).unwrap();
        assert_eq!(
            swarm.topology,
            Topology::Neighbors(vec![vec![0, 1], vec![1, 0], vec![2]])
        );
    }

    #[test]
    fn with_topology_fn_sees_spawned_particles() {
        let mut rng = StdRng::seed_from_u64(5);
        let init = SwarmInit::new(4, 2);
        let swarm = BaseSwarm::with_topology_fn(
            &init,
            |particles| Topology::all_ones(particles.len()),
            &mut rng,
        )
        .unwrap();
        assert_eq!(swarm.topology, Topology::all_ones(4));

        let bad = BaseSwarm::new(&init, Topology::all_ones(3), &mut rng);
        assert!(matches!(bad, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn missing_inertia_accumulates_velocity() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut swarm = line(&[2.0]);
        swarm.particles[0].velocity = vec![-0.25];
        swarm.evaluate(&sphere);

        let mut update = VelocityUpdate::new(Bounds::uniform(1, -1.0, 1.0), None);
        update.apply(&mut swarm, &mut rng).unwrap();
        // pbest and swarm best equal the position, so only inertia acts
        assert_eq!(swarm.particles[0].velocity, vec![-0.25]);

        swarm.particles[0].meta.inertia = Some(0.5);
        update.apply(&mut swarm, &mut rng).unwrap();
        assert_eq!(swarm.particles[0].velocity, vec![-0.125]);
    }
}
