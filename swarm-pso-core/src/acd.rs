//! Adaptive complex-directed PSO
//!
//! The swarm maintains a weighted directed graph over its particles that is
//! rebuilt every iteration from pairwise distances and fitness differentials.
//! A particle's social coefficient grows with the weight flowing into it, and
//! its social target is the best personal best among its graph neighbors.
//!
//! Per iteration: `EvalFitness -> AcdVelocityUpdate -> PositionUpdate ->
//! UpdateTopology`.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::init::SwarmInit;
use crate::operator::{Operator, Pipeline};
use crate::particle::{AcdMeta, Particle};
use crate::pso::{best_of, EvalFitness, PositionUpdate};
use crate::report::RunReport;
use crate::swarm::Swarm;
use crate::telemetry::Progress;
use crate::topology::{SquareMatrix, Topology};
use crate::traits::{DifferenceFn, DistanceFn, FitnessFn};
use crate::{ensure_in_range, Error, Result};

/// Relative size of the grand total, against the sum of absolute weights,
/// below which normalization is skipped
const NORMALIZATION_TOLERANCE: f64 = 1e-9;

/// Swarm used by the complex-directed optimizer
pub type AcdSwarm = Swarm<AcdMeta, AcdState>;

/// How inertia anneals from `init_inertia` to `final_inertia`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InertiaSchedule {
    /// `(init - final) * (n_iter - iter) / n_iter + final`, within `[final, init]`
    #[default]
    Linear,
    /// `(init - final) * (n_iter - iter) + final`, without normalization
    Unnormalized,
}

impl InertiaSchedule {
    /// Inertia at 1-based iteration `crnt_iter` of `n_iter`
    pub fn inertia(self, init: f64, fin: f64, n_iter: usize, crnt_iter: usize) -> f64 {
        match self {
            InertiaSchedule::Linear => {
                if n_iter == 0 {
                    return fin;
                }
                let remaining = n_iter.saturating_sub(crnt_iter) as f64 / n_iter as f64;
                (init - fin) * remaining + fin
            }
            InertiaSchedule::Unnormalized => {
                (init - fin) * (n_iter as f64 - crnt_iter as f64) + fin
            }
        }
    }
}

/// Swarm-level constants of the complex-directed variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcdParams {
    /// Probability of linking a pair that fails the distance/differential test
    pub prob_rand_connection: f64,
    /// Pairs closer than this may link deterministically
    pub dist_threshold: f64,
    /// Minimum absolute fitness differential for a deterministic link
    pub diff_eps: f64,
    pub init_inertia: f64,
    pub final_inertia: f64,
    pub schedule: InertiaSchedule,
}

impl Default for AcdParams {
    fn default() -> Self {
        Self {
            prob_rand_connection: 0.1,
            dist_threshold: 1.0,
            diff_eps: 1e-8,
            init_inertia: 0.9,
            final_inertia: 0.4,
            schedule: InertiaSchedule::Linear,
        }
    }
}

impl AcdParams {
    pub fn with_prob_rand_connection(mut self, prob: f64) -> Self {
        self.prob_rand_connection = prob;
        self
    }

    pub fn with_dist_threshold(mut self, threshold: f64) -> Self {
        self.dist_threshold = threshold;
        self
    }

    pub fn with_diff_eps(mut self, eps: f64) -> Self {
        self.diff_eps = eps;
        self
    }

    pub fn with_inertia(mut self, init: f64, fin: f64) -> Self {
        self.init_inertia = init;
        self.final_inertia = fin;
        self
    }

    pub fn with_schedule(mut self, schedule: InertiaSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure_in_range("prob_rand_connection", self.prob_rand_connection, 0.0, 1.0, "[0, 1]")?;
        ensure_in_range("dist_threshold", self.dist_threshold, 0.0, f64::INFINITY, ">= 0")?;
        ensure_in_range("diff_eps", self.diff_eps, 0.0, f64::INFINITY, ">= 0")?;
        ensure_in_range("init_inertia", self.init_inertia, 0.0, f64::MAX, "finite, >= 0")?;
        ensure_in_range("final_inertia", self.final_inertia, 0.0, f64::MAX, "finite, >= 0")?;
        Ok(())
    }
}

/// Adaptive state carried by an [`AcdSwarm`].
///
/// The normalized edge weights live in the swarm's
/// [`Topology::Weighted`] matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcdState {
    pub params: AcdParams,
    /// `1.0` where an edge exists, symmetric, zero diagonal
    pub adjacency: SquareMatrix,
    /// Row sums of the normalized weights
    pub in_degrees: Vec<f64>,
    /// Column sums of the normalized weights
    pub out_degrees: Vec<f64>,
    /// Iteration budget the inertia schedule anneals over
    pub n_iter: usize,
    /// 1-based index of the next iteration
    pub crnt_iter: usize,
    /// Inertia used by the latest velocity update
    pub inertia: f64,
}

impl AcdState {
    fn new(params: AcdParams, n_particles: usize) -> Self {
        Self {
            inertia: params.init_inertia,
            params,
            adjacency: SquareMatrix::zeros(n_particles),
            in_degrees: vec![0.0; n_particles],
            out_degrees: vec![0.0; n_particles],
            n_iter: 1,
            crnt_iter: 1,
        }
    }
}

impl Swarm<AcdMeta, AcdState> {
    /// Spawn a complex-directed swarm.
    ///
    /// The particles are evaluated once and the initial graph is built the
    /// same way every later iteration rebuilds it.
    pub fn new<F, D, Df>(
        init: &SwarmInit,
        params: AcdParams,
        fitness_fn: &F,
        distance_fn: &D,
        difference_fn: &Df,
        rng: &mut dyn RngCore,
    ) -> Result<Self>
    where
        F: FitnessFn<AcdMeta> + ?Sized,
        D: DistanceFn<AcdMeta> + ?Sized,
        Df: DifferenceFn + ?Sized,
    {
        init.validate()?;
        params.validate()?;
        let particles = init.spawn(rng)?;
        let n = particles.len();
        let state = AcdState::new(params, n);
        let topology = Topology::Weighted(SquareMatrix::zeros(n));
        let mut swarm = Swarm::from_particles(particles, topology, state)?;
        swarm.evaluate(fitness_fn);
        swarm.update_topology(distance_fn, difference_fn, rng);
        Ok(swarm)
    }

    /// Normalized edge weights
    pub fn weights(&self) -> Option<&SquareMatrix> {
        match &self.topology {
            Topology::Weighted(m) => Some(m),
            _ => None,
        }
    }

    /// Rebuild the graph from current positions and fitnesses.
    ///
    /// A pair links when it is closer than `dist_threshold` with a fitness
    /// differential above `diff_eps`, or otherwise by a coin flip with
    /// probability `prob_rand_connection`. Linked pairs carry
    /// `diff(f_i, f_j)` on edge `(i, j)` and `diff(f_j, f_i)` on `(j, i)`.
    pub fn update_topology<D, Df>(
        &mut self,
        distance_fn: &D,
        difference_fn: &Df,
        rng: &mut dyn RngCore,
    ) where
        D: DistanceFn<AcdMeta> + ?Sized,
        Df: DifferenceFn + ?Sized,
    {
        let n = self.len();
        let AcdParams {
            prob_rand_connection,
            dist_threshold,
            diff_eps,
            ..
        } = self.state.params;
        let mut weights = SquareMatrix::zeros(n);
        let mut adjacency = SquareMatrix::zeros(n);

        for i in 0..n {
            for j in 0..i {
                let (a, b) = (&self.particles[i], &self.particles[j]);
                let dist = distance_fn.distance(a, b);
                let diff = difference_fn.difference(a.fitness, b.fitness);
                let linked = (dist < dist_threshold && diff.abs() > diff_eps)
                    || rng.gen::<f64>() < prob_rand_connection;
                if linked {
                    weights[(i, j)] = diff;
                    weights[(j, i)] = difference_fn.difference(b.fitness, a.fitness);
                    adjacency[(i, j)] = 1.0;
                    adjacency[(j, i)] = 1.0;
                }
            }
        }

        normalize(&mut weights);
        self.state.in_degrees = weights.row_sums();
        self.state.out_degrees = weights.col_sums();
        self.state.adjacency = adjacency;
        self.topology = Topology::Weighted(weights);
    }

    /// `max(in_degrees) > term_weight_k && max(out_degrees) < eps`
    pub fn converged(&self, term_weight_k: f64, eps: f64) -> bool {
        let max_in = self.state.in_degrees.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let max_out = self.state.out_degrees.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        max_in > term_weight_k && max_out < eps
    }

    /// Best personal best among graph neighbors of `ix`, or `ix` itself
    pub fn neighbor_best(&self, ix: usize) -> usize {
        let row = self.state.adjacency.row(ix);
        let neighbors = row.iter().enumerate().filter(|(_, &a)| a == 1.0).map(|(j, _)| j);
        best_of(self, neighbors).unwrap_or(ix)
    }
}

/// Divide by the grand total unless it is negligible against the absolute
/// weight mass (antisymmetric differentials always sum to zero)
fn normalize(weights: &mut SquareMatrix) {
    let total = weights.total();
    let mass = weights.abs_total();
    if mass == 0.0 || !(total.abs() > NORMALIZATION_TOLERANCE * mass) {
        return;
    }
    weights.scale(1.0 / total);
}

/// Degree-weighted velocity update
pub struct AcdVelocityUpdate {
    velocity_bounds: Bounds,
    target: Vec<f64>,
}

impl AcdVelocityUpdate {
    pub fn new(velocity_bounds: Bounds) -> Self {
        Self {
            velocity_bounds,
            target: Vec::new(),
        }
    }
}

impl Operator<AcdSwarm> for AcdVelocityUpdate {
    fn name(&self) -> &str {
        "acd_velocity_update"
    }

    fn apply(&mut self, swarm: &mut AcdSwarm, rng: &mut dyn RngCore) -> Result<()> {
        let state = &swarm.state;
        let inertia = state.params.schedule.inertia(
            state.params.init_inertia,
            state.params.final_inertia,
            state.n_iter,
            state.crnt_iter,
        );
        swarm.state.inertia = inertia;

        for ix in 0..swarm.len() {
            let row_sum = swarm.weights().map_or(0.0, |w| w.row(ix).iter().sum::<f64>());
            let neighbor = swarm.neighbor_best(ix);
            self.target.clone_from(&swarm.particles[neighbor].personal_best_position);

            let particle = &mut swarm.particles[ix];
            let social = ((1.0 + row_sum) * particle.c1).max(0.0);
            particle.meta.social = social;
            particle.accelerate(inertia, social, &self.target, &self.velocity_bounds, rng);
        }
        Ok(())
    }
}

/// Rebuild the directed graph after the particles moved
pub struct UpdateTopology<D, Df> {
    distance_fn: D,
    difference_fn: Df,
}

impl<D, Df> UpdateTopology<D, Df> {
    pub fn new(distance_fn: D, difference_fn: Df) -> Self {
        Self {
            distance_fn,
            difference_fn,
        }
    }
}

impl<D, Df> Operator<AcdSwarm> for UpdateTopology<D, Df>
where
    D: DistanceFn<AcdMeta>,
    Df: DifferenceFn,
{
    fn name(&self) -> &str {
        "acd_update_topology"
    }

    fn apply(&mut self, swarm: &mut AcdSwarm, rng: &mut dyn RngCore) -> Result<()> {
        swarm.update_topology(&self.distance_fn, &self.difference_fn, rng);
        Ok(())
    }
}

/// Configuration for [`acd_pso_maximize`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcdConfig {
    pub n_iter: usize,
    pub bounds: Bounds,
    #[serde(default)]
    pub velocity_bounds: Option<Bounds>,
    /// Enables the collapsed-graph termination test when set
    #[serde(default)]
    pub term_weight_k: Option<f64>,
    #[serde(default = "default_eps")]
    pub eps: f64,
    #[serde(default)]
    pub verbosity: u8,
}

fn default_eps() -> f64 {
    1e-8
}

impl Default for AcdConfig {
    fn default() -> Self {
        Self::new(100, Bounds::uniform(1, -1.0, 1.0))
    }
}

impl AcdConfig {
    pub fn new(n_iter: usize, bounds: Bounds) -> Self {
        Self {
            n_iter,
            bounds,
            velocity_bounds: None,
            term_weight_k: None,
            eps: default_eps(),
            verbosity: 0,
        }
    }

    pub fn with_velocity_bounds(mut self, velocity_bounds: Bounds) -> Self {
        self.velocity_bounds = Some(velocity_bounds);
        self
    }

    pub fn with_termination(mut self, term_weight_k: f64, eps: f64) -> Self {
        self.term_weight_k = Some(term_weight_k);
        self.eps = eps;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn validate(&self, dim: usize) -> Result<()> {
        if self.n_iter == 0 {
            return Err(Error::ZeroIterations);
        }
        if let Some(k) = self.term_weight_k {
            ensure_in_range("term_weight_k", k, 0.0, f64::INFINITY, ">= 0")?;
        }
        ensure_in_range("eps", self.eps, 0.0, f64::INFINITY, ">= 0")?;
        self.bounds.validate("position bounds", dim)?;
        if let Some(velocity_bounds) = &self.velocity_bounds {
            velocity_bounds.validate("velocity bounds", dim)?;
        }
        Ok(())
    }
}

/// Maximize `fitness_fn` with the complex-directed swarm.
///
/// Runs up to `config.n_iter` iterations, stopping early when the graph
/// collapses onto a single sink (see [`AcdSwarm::converged`]) and a
/// termination weight is configured.
pub fn acd_pso_maximize<F, D, Df>(
    swarm: &mut AcdSwarm,
    fitness_fn: &F,
    distance_fn: &D,
    difference_fn: &Df,
    config: &AcdConfig,
    rng: &mut dyn RngCore,
) -> Result<RunReport>
where
    F: FitnessFn<AcdMeta> + ?Sized,
    D: DistanceFn<AcdMeta> + ?Sized,
    Df: DifferenceFn + ?Sized,
{
    config.validate(swarm.dim())?;
    swarm.state.params.validate()?;
    swarm.state.n_iter = config.n_iter;

    let velocity_bounds = config
        .velocity_bounds
        .clone()
        .unwrap_or_else(|| config.bounds.velocity_default());
    let mut pipeline = Pipeline::builder()
        .then(EvalFitness::new(|p: &Particle<AcdMeta>| fitness_fn.fitness(p)))
        .then(AcdVelocityUpdate::new(velocity_bounds))
        .then(PositionUpdate::new(config.bounds.clone()))
        .then(UpdateTopology::new(
            |a: &Particle<AcdMeta>, b: &Particle<AcdMeta>| distance_fn.distance(a, b),
            |a: f64, b: f64| difference_fn.difference(a, b),
        ))
        .build();

    let progress = Progress::new("acd_pso", config.verbosity);
    progress.started(config.n_iter, swarm.len(), swarm.dim());

    let mut iterations = 0;
    let mut terminated_early = false;
    for iter in 1..=config.n_iter {
        progress.iteration_started(iter);
        pipeline.apply(swarm, rng)?;
        swarm.state.crnt_iter += 1;
        iterations = iter;
        if let Some(k) = config.term_weight_k {
            if swarm.converged(k, config.eps) {
                terminated_early = iter < config.n_iter;
                break;
            }
        }
        progress.iteration_finished(iter, swarm);
    }

    let report = RunReport::from_swarm(swarm, iterations, terminated_early);
    progress.finished(&report);
    Ok(report)
}
