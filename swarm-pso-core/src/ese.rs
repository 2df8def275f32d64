//! Adaptive PSO with evolutionary state estimation (ESE)
//!
//! Each iteration estimates the swarm's evolutionary state from how clustered
//! it is around its fittest particle, and adapts inertia and acceleration
//! coefficients to that state. The fittest particle is not moved by velocity:
//! it takes a Gaussian step on a few random dimensions instead, and when that
//! step fails to improve the swarm best, the perturbed elite replaces the
//! worst particle.
//!
//! Per iteration: `EstimateState -> ParameterUpdate [-> LocalSearch]`.

use rand::seq::index;
use rand::{Rng, RngCore};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::fuzzy::{self, EvolutionaryState};
use crate::init::SwarmInit;
use crate::local_search::LocalSearch;
use crate::operator::{Operator, Pipeline};
use crate::particle::{EseMeta, Particle};
use crate::report::RunReport;
use crate::swarm::Swarm;
use crate::telemetry::Progress;
use crate::topology::Topology;
use crate::traits::{DistanceFn, FitnessFn};
use crate::{ensure_in_range, Error, Result};

/// Swarm used by the ESE optimizer
pub type EseSwarm = Swarm<EseMeta, EseState>;

/// Adaptive state carried by an [`EseSwarm`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EseState {
    /// Current evolutionary state
    pub evolutionary_state: EvolutionaryState,
    /// Index of the fittest particle in the latest evaluation
    pub best_ix: usize,
    /// 1-based index of the next iteration
    pub crnt_iter: usize,
    /// Iterations since the swarm best last improved
    pub stagnation: usize,
    /// Current multiplier on `sigma_max` for stagnation shocks
    pub shock_mult: f64,
    /// Dimensions the next elite perturbation touches
    pub elite_perturb_dims: usize,
    /// Latest evolutionary factor
    pub factor: f64,
}

impl Default for EseState {
    fn default() -> Self {
        Self {
            evolutionary_state: EvolutionaryState::Exploration,
            best_ix: 0,
            crnt_iter: 1,
            stagnation: 0,
            shock_mult: 1.0,
            elite_perturb_dims: 1,
            factor: 0.0,
        }
    }
}

impl Swarm<EseMeta, EseState> {
    /// Spawn an ESE swarm in the exploration state
    pub fn new(init: &SwarmInit, rng: &mut dyn RngCore) -> Result<Self> {
        init.validate()?;
        let particles = init.spawn(rng)?;
        Swarm::from_particles(particles, Topology::FullyConnected, EseState::default())
    }

    fn reset_stagnation(&mut self, base_perturb_dims: usize) {
        self.state.stagnation = 0;
        self.state.shock_mult = 1.0;
        self.state.elite_perturb_dims = base_perturb_dims;
    }
}

/// Box constraints on the `(c1, c2)` pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientLimits {
    pub c_bounds: (f64, f64),
    pub c_sum_bounds: (f64, f64),
}

impl CoefficientLimits {
    /// Sums reachable by a pair inside `c_bounds` that also satisfy
    /// `c_sum_bounds`
    pub fn feasible_sum(&self) -> (f64, f64) {
        let (lo, hi) = self.c_bounds;
        let (sum_lo, sum_hi) = self.c_sum_bounds;
        (sum_lo.max(2.0 * lo), sum_hi.min(2.0 * hi))
    }

    /// Reject limits no pair can satisfy at once
    pub fn validate(&self) -> Result<()> {
        let (feasible_lo, feasible_hi) = self.feasible_sum();
        if feasible_lo <= feasible_hi {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                name: "c_sum_bounds lower",
                value: self.c_sum_bounds.0,
                expected: "an interval overlapping [2 * c_lower, 2 * c_upper]",
            })
        }
    }

    /// Clamp each coefficient into `c_bounds`, then rescale the pair
    /// proportionally when its sum leaves `c_sum_bounds`.
    ///
    /// The rescaled sum is `4.0` clamped into [`CoefficientLimits::feasible_sum`].
    /// A coefficient pushed out of `c_bounds` by the rescale is clamped back and
    /// the other one takes up the difference, so the sum is kept.
    pub fn apply(&self, c1: f64, c2: f64) -> Result<(f64, f64)> {
        let (lo, hi) = self.c_bounds;
        let (sum_lo, sum_hi) = self.c_sum_bounds;
        let c1 = c1.clamp(lo, hi);
        let c2 = c2.clamp(lo, hi);
        let sum = c1 + c2;
        if sum >= sum_lo && sum <= sum_hi {
            return Ok((c1, c2));
        }

        self.validate()?;
        let (feasible_lo, feasible_hi) = self.feasible_sum();
        let target = 4.0_f64.clamp(feasible_lo, feasible_hi);
        let (c1, c2) = if sum > 0.0 {
            (target * c1 / sum, target * c2 / sum)
        } else {
            (0.5 * target, 0.5 * target)
        };
        let (c1, c2) = if c1 < lo || c1 > hi {
            let c1 = c1.clamp(lo, hi);
            (c1, target - c1)
        } else if c2 < lo || c2 > hi {
            let c2 = c2.clamp(lo, hi);
            (target - c2, c2)
        } else {
            (c1, c2)
        };

        let tol = 1e-9 * target.max(1.0);
        let inside = |c: f64| c >= lo - tol && c <= hi + tol;
        if inside(c1) && inside(c2) {
            Ok((c1, c2))
        } else {
            Err(Error::Invariant(format!(
                "rescaled coefficients ({c1}, {c2}) left c_bounds [{lo}, {hi}]"
            )))
        }
    }
}

/// Signed `(c1, c2)` increments for `state` given the base step `delta`
/// and a uniform draw `r`
pub fn coefficient_increments(
    state: EvolutionaryState,
    delta: f64,
    c_inc_mult: f64,
    r: f64,
) -> (f64, f64) {
    let large = delta * (c_inc_mult + r * (1.0 - c_inc_mult));
    let small = delta * c_inc_mult * r;
    match state {
        EvolutionaryState::Exploration => (large, -large),
        EvolutionaryState::Exploitation => (small, -small),
        EvolutionaryState::Convergence => (small, small),
        EvolutionaryState::JumpingOut => (-large, large),
    }
}

/// Evaluate fitness, estimate the evolutionary state, and adapt `w`, `c1`
/// and `c2` for every particle
pub struct EstimateState<F, D> {
    fitness_fn: F,
    distance_fn: D,
    delta: f64,
    limits: CoefficientLimits,
    c_inc_mult: f64,
    base_perturb_dims: usize,
    debug: bool,
}

impl<F, D> EstimateState<F, D> {
    /// Build from `config`. When `config.delta` is unset the step is drawn
    /// once as `0.05 + 0.05 * U[0, 1)`.
    pub fn new(fitness_fn: F, distance_fn: D, config: &EseConfig, rng: &mut dyn RngCore) -> Self {
        let delta = config.delta.unwrap_or_else(|| 0.05 + 0.05 * rng.gen::<f64>());
        Self {
            fitness_fn,
            distance_fn,
            delta,
            limits: config.limits(),
            c_inc_mult: config.c_inc_mult,
            base_perturb_dims: config.elite_perturb_dims,
            debug: config.debug,
        }
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }
}

impl<F, D> Operator<EseSwarm> for EstimateState<F, D>
where
    F: FitnessFn<EseMeta>,
    D: DistanceFn<EseMeta>,
{
    fn name(&self) -> &str {
        "ese_estimate_state"
    }

    fn apply(&mut self, swarm: &mut EseSwarm, rng: &mut dyn RngCore) -> Result<()> {
        let base_dims = self.base_perturb_dims.min(swarm.dim());
        for ix in 0..swarm.len() {
            let fitness = self.fitness_fn.fitness(&swarm.particles[ix]);
            swarm.particles[ix].record_fitness(fitness);
            if swarm.observe(ix) {
                swarm.reset_stagnation(base_dims);
            }
        }
        let best_ix = swarm.fittest_index();
        swarm.state.best_ix = best_ix;

        let mean_distances = swarm.mean_distances(&self.distance_fn);
        let f = fuzzy::evolutionary_factor(&mean_distances, best_ix);
        let next = fuzzy::classify(swarm.state.evolutionary_state, f)?;
        swarm.state.evolutionary_state = next;
        swarm.state.factor = f;

        let w = fuzzy::inertia_from_factor(f);
        let (inc1, inc2) = coefficient_increments(next, self.delta, self.c_inc_mult, rng.gen());
        for particle in &mut swarm.particles {
            particle.meta.inertia = w;
            let (c1, c2) = self.limits.apply(particle.c1 + inc1, particle.c2 + inc2)?;
            if !(c1 >= 0.0 && c2 >= 0.0) {
                return Err(Error::Invariant(format!(
                    "adapted coefficients must be nonnegative (c1 = {c1}, c2 = {c2})"
                )));
            }
            particle.c1 = c1;
            particle.c2 = c2;
        }

        if self.debug {
            let d_min = mean_distances.iter().copied().fold(f64::INFINITY, f64::min);
            let d_max = mean_distances.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let degrees = fuzzy::memberships(f)?;
            tracing::debug!(
                best_ix,
                d_min,
                d_max,
                d_best = mean_distances[best_ix],
                f,
                memberships = ?degrees,
                state = %next,
                w,
                c1 = swarm.particles[0].c1,
                c2 = swarm.particles[0].c2,
                "evolutionary state estimated"
            );
        }
        Ok(())
    }
}

/// Elite perturbation for the fittest particle and a velocity step toward
/// the swarm best for everyone else
pub struct ParameterUpdate<F> {
    fitness_fn: F,
    bounds: Bounds,
    velocity_bounds: Bounds,
    max_iter: usize,
    /// Iterations of the current run, starting at 1; the annealing clock
    run_iter: usize,
    sigma_min: f64,
    sigma_max: f64,
    shock_prob: f64,
    shock_mult: f64,
    base_perturb_dims: usize,
}

impl<F> ParameterUpdate<F> {
    pub fn new(fitness_fn: F, config: &EseConfig) -> Self {
        Self {
            fitness_fn,
            bounds: config.bounds.clone(),
            velocity_bounds: config.resolved_velocity_bounds(),
            max_iter: config.n_iter,
            run_iter: 1,
            sigma_min: config.sigma_min,
            sigma_max: config.sigma_max,
            shock_prob: config.stagnation_shock_prob,
            shock_mult: config.stagnation_shock_mult,
            base_perturb_dims: config.elite_perturb_dims,
        }
    }

    /// Perturbation scale for the current iteration, applying a stagnation
    /// shock when one fires
    fn sigma(&self, state: &mut EseState, rng: &mut dyn RngCore) -> f64 {
        let progress = (self.run_iter as f64 / self.max_iter.max(1) as f64).min(1.0);
        let mut sigma = self.sigma_max - (self.sigma_max - self.sigma_min) * progress;
        let shocked = (0..state.stagnation).any(|_| rng.gen::<f64>() < self.shock_prob);
        if shocked {
            sigma = self.sigma_max * state.shock_mult;
            let cap = self.bounds.max_range() / 9.0;
            if sigma >= cap {
                sigma = cap;
            } else {
                state.shock_mult *= self.shock_mult;
            }
        }
        sigma
    }
}

impl<F: FitnessFn<EseMeta>> ParameterUpdate<F> {
    fn perturb_elite(&mut self, swarm: &mut EseSwarm, ix: usize, rng: &mut dyn RngCore) {
        let sigma = self.sigma(&mut swarm.state, rng);
        let dim = swarm.dim();
        let dims = swarm.state.elite_perturb_dims.clamp(1, dim);

        let particle = &mut swarm.particles[ix];
        for d in index::sample(rng, dim, dims).iter() {
            let z: f64 = rng.sample(StandardNormal);
            particle.solution[d] += self.bounds.range(d) * sigma * z;
        }
        self.bounds.clamp(&mut particle.solution);
        let fitness = self.fitness_fn.fitness(particle);
        particle.record_fitness(fitness);

        if swarm.observe(ix) {
            swarm.reset_stagnation(self.base_perturb_dims.min(dim));
        } else {
            let worst = swarm.worst_index();
            let replaced = &swarm.particles[worst];
            let elite_best = swarm.particles[ix].personal_best_fitness;
            let memory = (replaced.personal_best_fitness > elite_best).then(|| {
                (replaced.personal_best_fitness, replaced.personal_best_position.clone())
            });
            swarm.overwrite(worst, ix);
            // the copy takes the elite's state but never a lower personal best
            if let Some((fitness, position)) = memory {
                let copy = &mut swarm.particles[worst];
                copy.personal_best_fitness = fitness;
                copy.personal_best_position = position;
            }
            swarm.state.elite_perturb_dims = (dims + 1).min(dim);
        }
    }
}

impl<F: FitnessFn<EseMeta>> Operator<EseSwarm> for ParameterUpdate<F> {
    fn name(&self) -> &str {
        "ese_parameter_update"
    }

    fn apply(&mut self, swarm: &mut EseSwarm, rng: &mut dyn RngCore) -> Result<()> {
        let elite = swarm.state.best_ix;
        for ix in 0..swarm.len() {
            if ix == elite {
                self.perturb_elite(swarm, ix, rng);
            } else {
                let particle = &mut swarm.particles[ix];
                let (inertia, social) = (particle.meta.inertia, particle.c2);
                let target = &swarm.best_position;
                particle.accelerate(inertia, social, target, &self.velocity_bounds, rng);
                particle.advance(&self.bounds);
            }
        }
        swarm.state.crnt_iter += 1;
        swarm.state.stagnation += 1;
        self.run_iter += 1;
        Ok(())
    }
}

/// Configuration for [`apso_ese_maximize`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EseConfig {
    pub n_iter: usize,
    pub bounds: Bounds,
    pub velocity_bounds: Option<Bounds>,
    pub sigma_min: f64,
    pub sigma_max: f64,
    /// Box for each of `c1` and `c2`
    pub c_bounds: (f64, f64),
    /// Admissible range of `c1 + c2`
    pub c_sum_bounds: (f64, f64),
    /// Fraction of `delta` used by the small increments, in `(0, 1)`
    pub c_inc_mult: f64,
    /// Coefficient step; drawn from `[0.05, 0.1)` when unset
    pub delta: Option<f64>,
    pub stagnation_shock_prob: f64,
    pub stagnation_shock_mult: f64,
    /// Base number of dimensions perturbed on the elite
    pub elite_perturb_dims: usize,
    pub verbosity: u8,
    /// Emit per-iteration state-estimation diagnostics
    pub debug: bool,
}

impl Default for EseConfig {
    fn default() -> Self {
        Self::new(100, Bounds::uniform(1, -1.0, 1.0))
    }
}

impl EseConfig {
    pub fn new(n_iter: usize, bounds: Bounds) -> Self {
        Self {
            n_iter,
            bounds,
            velocity_bounds: None,
            sigma_min: 0.1,
            sigma_max: 1.0,
            c_bounds: (1.5, 2.5),
            c_sum_bounds: (3.0, 4.0),
            c_inc_mult: 0.1,
            delta: None,
            stagnation_shock_prob: 0.1,
            stagnation_shock_mult: 1.1,
            elite_perturb_dims: 1,
            verbosity: 0,
            debug: false,
        }
    }

    pub fn with_velocity_bounds(mut self, velocity_bounds: Bounds) -> Self {
        self.velocity_bounds = Some(velocity_bounds);
        self
    }

    pub fn with_sigma(mut self, sigma_min: f64, sigma_max: f64) -> Self {
        self.sigma_min = sigma_min;
        self.sigma_max = sigma_max;
        self
    }

    pub fn with_c_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.c_bounds = (lower, upper);
        self
    }

    pub fn with_c_sum_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.c_sum_bounds = (lower, upper);
        self
    }

    pub fn with_c_inc_mult(mut self, c_inc_mult: f64) -> Self {
        self.c_inc_mult = c_inc_mult;
        self
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = Some(delta);
        self
    }

    pub fn with_stagnation_shock(mut self, prob: f64, mult: f64) -> Self {
        self.stagnation_shock_prob = prob;
        self.stagnation_shock_mult = mult;
        self
    }

    pub fn with_elite_perturb_dims(mut self, dims: usize) -> Self {
        self.elite_perturb_dims = dims;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn limits(&self) -> CoefficientLimits {
        CoefficientLimits {
            c_bounds: self.c_bounds,
            c_sum_bounds: self.c_sum_bounds,
        }
    }

    pub fn resolved_velocity_bounds(&self) -> Bounds {
        self.velocity_bounds
            .clone()
            .unwrap_or_else(|| self.bounds.velocity_default())
    }

    pub fn validate(&self, dim: usize) -> Result<()> {
        if self.n_iter == 0 {
            return Err(Error::ZeroIterations);
        }
        self.bounds.validate("position bounds", dim)?;
        if let Some(velocity_bounds) = &self.velocity_bounds {
            velocity_bounds.validate("velocity bounds", dim)?;
        }
        ensure_in_range("sigma_min", self.sigma_min, 0.0, f64::MAX, "finite, >= 0")?;
        ensure_in_range("sigma_max", self.sigma_max, self.sigma_min, f64::MAX, ">= sigma_min")?;
        check_pair("c_bounds", self.c_bounds)?;
        check_pair("c_sum_bounds", self.c_sum_bounds)?;
        self.limits().validate()?;
        if !(self.c_inc_mult > 0.0 && self.c_inc_mult < 1.0) {
            return Err(Error::OutOfRange {
                name: "c_inc_mult",
                value: self.c_inc_mult,
                expected: "(0, 1)",
            });
        }
        if let Some(delta) = self.delta {
            if !(delta > 0.0) {
                return Err(Error::OutOfRange {
                    name: "delta",
                    value: delta,
                    expected: "> 0",
                });
            }
        }
        ensure_in_range("stagnation_shock_prob", self.stagnation_shock_prob, 0.0, 1.0, "[0, 1]")?;
        if !(self.stagnation_shock_mult > 0.0) {
            return Err(Error::OutOfRange {
                name: "stagnation_shock_mult",
                value: self.stagnation_shock_mult,
                expected: "> 0",
            });
        }
        if self.elite_perturb_dims == 0 {
            return Err(Error::OutOfRange {
                name: "elite_perturb_dims",
                value: 0.0,
                expected: ">= 1",
            });
        }
        Ok(())
    }
}

/// Both ends nonnegative and ordered
fn check_pair(what: &'static str, (lower, upper): (f64, f64)) -> Result<()> {
    ensure_in_range(what, lower, 0.0, f64::MAX, "finite, >= 0")?;
    if !(lower <= upper) {
        return Err(Error::InvertedBounds {
            what,
            index: 0,
            lower,
            upper,
        });
    }
    Ok(())
}

/// Maximize `fitness_fn` with the ESE adaptive swarm.
///
/// Runs exactly `config.n_iter` iterations. When `local_search` is given it
/// runs after the parameter update each iteration, clamped to the position
/// bounds.
pub fn apso_ese_maximize<F, D>(
    swarm: &mut EseSwarm,
    fitness_fn: &F,
    distance_fn: &D,
    config: &EseConfig,
    local_search: Option<LocalSearch<'_, EseMeta>>,
    rng: &mut dyn RngCore,
) -> Result<RunReport>
where
    F: FitnessFn<EseMeta> + ?Sized,
    D: DistanceFn<EseMeta> + ?Sized,
{
    let dim = swarm.dim();
    config.validate(dim)?;
    if let Some(search) = &local_search {
        search.validate()?;
    }
    if swarm.state.crnt_iter == 1 {
        swarm.state.elite_perturb_dims = config.elite_perturb_dims.min(dim);
    }

    let fitness = |p: &Particle<EseMeta>| fitness_fn.fitness(p);
    let distance = |a: &Particle<EseMeta>, b: &Particle<EseMeta>| distance_fn.distance(a, b);
    let mut pipeline = Pipeline::builder()
        .then(EstimateState::new(fitness, distance, config, rng))
        .then(ParameterUpdate::new(fitness, config))
        .then_some(local_search.map(|search| search.with_bounds(config.bounds.clone())))
        .build();

    let progress = Progress::new("ese_apso", config.verbosity);
    progress.started(config.n_iter, swarm.len(), swarm.dim());

    for iter in 1..=config.n_iter {
        progress.iteration_started(iter);
        pipeline.apply(swarm, rng)?;
        progress.iteration_finished(iter, swarm);
    }

    let report = RunReport::from_swarm(swarm, config.n_iter, false);
    progress.finished(&report);
    Ok(report)
}
