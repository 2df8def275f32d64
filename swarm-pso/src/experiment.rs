//! Experiment runner: one benchmark, one optimizer, one seeded run.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use swarm_pso_core::acd::{acd_pso_maximize, AcdConfig, AcdParams, AcdSwarm};
use swarm_pso_core::bounds::Bounds;
use swarm_pso_core::ese::{apso_ese_maximize, EseConfig, EseSwarm};
use swarm_pso_core::init::{CoefficientInit, ScalarInit, SwarmInit, VectorInit};
use swarm_pso_core::local_search::{LocalSearch, Selector};
use swarm_pso_core::particle::{AcdMeta, BaseMeta, EseMeta, Particle};
use swarm_pso_core::pso::{pso_maximize, BaseSwarm, PsoConfig, PsoHooks};
use swarm_pso_core::report::RunReport;
use swarm_pso_core::topology::{SquareMatrix, Topology};

use crate::benchmarks::{self, RASTRIGIN_BOUNDS, SPHERE_BOUNDS};

/// Errors raised while loading or running an experiment
#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Core(#[from] swarm_pso_core::Error),
    #[error("invalid experiment config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown benchmark `{0}` (expected `sphere` or `rast`)")]
    UnknownBenchmark(String),
    #[error("unknown optimizer `{0}` (expected `pso`, `acd_pso` or `ese_apso`)")]
    UnknownOptimizer(String),
}

/// Benchmark fitness function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Benchmark {
    #[serde(rename = "sphere")]
    Sphere,
    #[serde(rename = "rast")]
    Rastrigin,
}

impl Benchmark {
    /// Per-dimension search interval
    pub fn bounds(self) -> (f64, f64) {
        match self {
            Benchmark::Sphere => SPHERE_BOUNDS,
            Benchmark::Rastrigin => RASTRIGIN_BOUNDS,
        }
    }

    pub fn fitness<M>(self) -> fn(&Particle<M>) -> f64 {
        match self {
            Benchmark::Sphere => benchmarks::sphere::<M>,
            Benchmark::Rastrigin => benchmarks::rastrigin::<M>,
        }
    }

    pub fn gradient<M>(self) -> fn(&Particle<M>) -> Vec<f64> {
        match self {
            Benchmark::Sphere => benchmarks::sphere_gradient::<M>,
            Benchmark::Rastrigin => benchmarks::rastrigin_gradient::<M>,
        }
    }
}

impl FromStr for Benchmark {
    type Err = ExperimentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sphere" => Ok(Benchmark::Sphere),
            "rast" => Ok(Benchmark::Rastrigin),
            other => Err(ExperimentError::UnknownBenchmark(other.to_string())),
        }
    }
}

impl fmt::Display for Benchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Benchmark::Sphere => "sphere",
            Benchmark::Rastrigin => "rast",
        })
    }
}

/// Optimizer to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Optimizer {
    Pso,
    AcdPso,
    EseApso,
}

impl FromStr for Optimizer {
    type Err = ExperimentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pso" => Ok(Optimizer::Pso),
            "acd_pso" => Ok(Optimizer::AcdPso),
            "ese_apso" => Ok(Optimizer::EseApso),
            other => Err(ExperimentError::UnknownOptimizer(other.to_string())),
        }
    }
}

impl fmt::Display for Optimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Optimizer::Pso => "pso",
            Optimizer::AcdPso => "acd_pso",
            Optimizer::EseApso => "ese_apso",
        })
    }
}

fn default_particles() -> usize {
    20
}

fn default_iterations() -> usize {
    100
}

/// Experiment description, loadable from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub test: Benchmark,
    pub optimizer: Optimizer,
    pub dim: usize,
    #[serde(default = "default_particles")]
    pub n_particles: usize,
    #[serde(default = "default_iterations")]
    pub n_iter: usize,
    #[serde(default)]
    pub verbosity: u8,
    #[serde(default)]
    pub debug: bool,
    /// RNG seed; drawn from entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ExperimentConfig {
    pub fn new(test: Benchmark, optimizer: Optimizer, dim: usize) -> Self {
        Self {
            test,
            optimizer,
            dim,
            n_particles: default_particles(),
            n_iter: default_iterations(),
            verbosity: 0,
            debug: false,
            seed: None,
        }
    }

    pub fn with_particles(mut self, n_particles: usize) -> Self {
        self.n_particles = n_particles;
        self
    }

    pub fn with_iterations(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
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

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Load a JSON experiment description
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ExperimentError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ExperimentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Run the configured optimizer on the configured benchmark.
///
/// Positions and velocities start uniform over the benchmark interval,
/// velocities are bounded by `0.2x` the position bounds and every particle
/// starts with `c = (2, 2)`.
pub fn run_experiment(config: &ExperimentConfig) -> Result<RunReport, ExperimentError> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let (lo, hi) = config.test.bounds();
    let bounds = Bounds::uniform(config.dim, lo, hi);
    let velocity_bounds = bounds.scaled(0.2);
    let init = SwarmInit::new(config.n_particles, config.dim)
        .with_position(VectorInit::Uniform { lo, hi })
        .with_velocity(VectorInit::Uniform { lo, hi })
        .with_coefficients(CoefficientInit::Pair(2.0, 2.0));

    tracing::debug!(
        test = %config.test,
        optimizer = %config.optimizer,
        dim = config.dim,
        n_particles = config.n_particles,
        seed = ?config.seed,
        "running experiment"
    );

    let report = match config.optimizer {
        Optimizer::Pso => {
            let fitness = config.test.fitness::<BaseMeta>();
            let topology = Topology::Weighted(SquareMatrix::filled(config.n_particles, 1.0));
            let mut swarm = BaseSwarm::new(&init, topology, &mut rng)?;
            let pso = PsoConfig::new(config.n_iter, bounds)
                .with_velocity_bounds(velocity_bounds)
                .with_threshold(2.0)
                .with_verbosity(config.verbosity);
            let hooks =
                PsoHooks::default().with_topology_distance(benchmarks::euclidean::<BaseMeta>);
            pso_maximize(&mut swarm, &fitness, &pso, hooks, &mut rng)?
        }
        Optimizer::AcdPso => {
            let fitness = config.test.fitness::<AcdMeta>();
            let difference = |a: f64, b: f64| (a - b).abs();
            let params = AcdParams::default()
                .with_prob_rand_connection(0.1)
                .with_dist_threshold(2.0 * config.dim as f64)
                .with_diff_eps(1e-8)
                .with_inertia(0.9, 0.4);
            let mut swarm = AcdSwarm::new(
                &init,
                params,
                &fitness,
                &benchmarks::euclidean::<AcdMeta>,
                &difference,
                &mut rng,
            )?;
            let acd = AcdConfig::new(config.n_iter, bounds)
                .with_velocity_bounds(velocity_bounds)
                .with_verbosity(config.verbosity);
            acd_pso_maximize(
                &mut swarm,
                &fitness,
                &benchmarks::euclidean::<AcdMeta>,
                &difference,
                &acd,
                &mut rng,
            )?
        }
        Optimizer::EseApso => {
            let fitness = config.test.fitness::<EseMeta>();
            let gradient = config.test.gradient::<EseMeta>();
            let init = init.with_inertia(ScalarInit::Constant(0.9));
            let mut swarm = EseSwarm::new(&init, &mut rng)?;
            let ese = EseConfig::new(config.n_iter, bounds)
                .with_velocity_bounds(velocity_bounds)
                .with_sigma(0.01, 1.0)
                .with_c_bounds(1.5, 2.5)
                .with_c_sum_bounds(3.0, 4.0)
                .with_c_inc_mult(0.1)
                .with_stagnation_shock(0.1, 1.01)
                .with_elite_perturb_dims(1)
                .with_verbosity(config.verbosity)
                .with_debug(config.debug);
            // local search descends, so it follows the negated fitness gradient
            let descent = move |p: &Particle<EseMeta>| -> Vec<f64> {
                gradient(p).into_iter().map(|g| -g).collect()
            };
            let search = LocalSearch::new(
                1e-3,
                Selector::Elite {
                    k: config.n_particles / 4,
                },
                descent,
            );
            apso_ese_maximize(
                &mut swarm,
                &fitness,
                &benchmarks::euclidean::<EseMeta>,
                &ese,
                Some(search),
                &mut rng,
            )?
        }
    };

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_pso_core::Error;

    #[test]
    fn names_parse_and_display() {
        assert_eq!("rast".parse::<Benchmark>().unwrap(), Benchmark::Rastrigin);
        assert_eq!("acd_pso".parse::<Optimizer>().unwrap(), Optimizer::AcdPso);
        assert_eq!(Benchmark::Sphere.to_string(), "sphere");
        assert_eq!(Optimizer::EseApso.to_string(), "ese_apso");
        assert!(matches!(
            "ackley".parse::<Benchmark>(),
            Err(ExperimentError::UnknownBenchmark(name)) if name == "ackley"
        ));
        assert!(matches!(
            "ga".parse::<Optimizer>(),
            Err(ExperimentError::UnknownOptimizer(_))
        ));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{"test": "rast", "optimizer": "ese_apso", "dim": 4, "seed": 3}"#;
        let config: ExperimentConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config,
            ExperimentConfig::new(Benchmark::Rastrigin, Optimizer::EseApso, 4).with_seed(3)
        );
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        for optimizer in [Optimizer::Pso, Optimizer::AcdPso, Optimizer::EseApso] {
            let config = ExperimentConfig::new(Benchmark::Sphere, optimizer, 3)
                .with_particles(8)
                .with_iterations(15)
                .with_seed(11);
            let a = run_experiment(&config).unwrap();
            let b = run_experiment(&config).unwrap();
            assert_eq!(a, b, "{optimizer}");
        }
    }

    #[test]
    fn every_optimizer_stays_in_bounds() {
        for test in [Benchmark::Sphere, Benchmark::Rastrigin] {
            for optimizer in [Optimizer::Pso, Optimizer::AcdPso, Optimizer::EseApso] {
                let config = ExperimentConfig::new(test, optimizer, 2)
                    .with_particles(12)
                    .with_iterations(25)
                    .with_seed(5);
                let report = run_experiment(&config).unwrap();
                let (lo, hi) = test.bounds();
                assert!(report.best_position.iter().all(|x| (lo..=hi).contains(x)));
                assert!(report.best_fitness.is_finite(), "{test}/{optimizer}");
            }
        }
    }

    #[test]
    fn zero_iterations_is_a_configuration_error() {
        let config = ExperimentConfig::new(Benchmark::Sphere, Optimizer::Pso, 2)
            .with_iterations(0)
            .with_seed(0);
        assert!(matches!(
            run_experiment(&config),
            Err(ExperimentError::Core(Error::ZeroIterations))
        ));
    }
}
