//! # Swarm PSO
//!
//! **Particle swarm optimization with adaptive topology and fuzzy
//! evolutionary-state control.**
//!
//! This crate re-exports [`swarm_pso_core`] and adds the std-only tooling
//! around it: classic benchmark functions, an experiment runner wiring a
//! benchmark to one of the three optimizers, and the `swarm_pso_bench`
//! command-line front end.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use swarm_pso::prelude::*;
//!
//! let config = ExperimentConfig::new(Benchmark::Sphere, Optimizer::EseApso, 10)
//!     .with_particles(40)
//!     .with_iterations(200)
//!     .with_seed(7);
//! let report = run_experiment(&config)?;
//! println!("best fitness {}", report.best_fitness);
//! # Ok::<(), swarm_pso::ExperimentError>(())
//! ```
//!
//! ## Crate Structure
//!
//! - [`swarm_pso_core`]: particles, swarms, operators and the optimizers
//! - [`benchmarks`]: sphere and rastrigin fitness functions with gradients
//! - [`experiment`]: JSON-configurable experiment runner

#![forbid(unsafe_code)]

// Re-export the core crate
pub use swarm_pso_core as core;

pub use swarm_pso_core::{
    acd::{acd_pso_maximize, AcdConfig, AcdSwarm},
    ese::{apso_ese_maximize, EseConfig, EseSwarm},
    pso::{pso_maximize, BaseSwarm, PsoConfig},
    report::RunReport,
    Error, Result,
};

pub mod benchmarks;
pub mod experiment;

pub use experiment::{run_experiment, Benchmark, ExperimentConfig, ExperimentError, Optimizer};

/// Prelude module for convenient imports
///
/// ```rust,ignore
/// use swarm_pso::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::prelude::*;

    pub use crate::benchmarks::{euclidean, manhattan, rastrigin, sphere};
    pub use crate::experiment::{
        run_experiment, Benchmark, ExperimentConfig, ExperimentError, Optimizer,
    };
}
