//! Progress reporting through `tracing`.
//!
//! The optimizers never print. They emit `tracing` events gated by a
//! `verbosity` level, and whatever subscriber the caller installs decides
//! where they go:
//!
//! - `> 0`: run start and finish (`info`)
//! - `> 1`: per-iteration best fitness (`debug`)
//! - `> 2`: per-iteration swarm summary (`trace`)

use core::fmt::Debug;

use crate::report::RunReport;
use crate::swarm::Swarm;

/// Verbosity-gated progress reporter for one optimization run
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    optimizer: &'static str,
    verbosity: u8,
}

impl Progress {
    /// Reporter for `optimizer` at the given verbosity
    pub fn new(optimizer: &'static str, verbosity: u8) -> Self {
        Self {
            optimizer,
            verbosity,
        }
    }

    /// Configured verbosity
    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// Run is about to start
    pub fn started(&self, n_iter: usize, n_particles: usize, dim: usize) {
        if self.verbosity > 0 {
            tracing::info!(
                optimizer = self.optimizer,
                n_iter,
                n_particles,
                dim,
                "beginning optimization"
            );
        }
    }

    /// Iteration `iter` (1-based) is about to run
    pub fn iteration_started(&self, iter: usize) {
        if self.verbosity > 1 {
            tracing::debug!(optimizer = self.optimizer, iter, "iteration");
        }
    }

    /// Iteration `iter` (1-based) has been applied
    pub fn iteration_finished<M, S: Debug>(&self, iter: usize, swarm: &Swarm<M, S>) {
        if self.verbosity > 1 {
            let current_best = swarm
                .iter()
                .map(|p| p.fitness)
                .fold(f64::NEG_INFINITY, f64::max);
            tracing::debug!(
                optimizer = self.optimizer,
                iter,
                best_fitness = swarm.best_fitness,
                current_best,
                "iteration complete"
            );
        }
        if self.verbosity > 2 {
            tracing::trace!(
                optimizer = self.optimizer,
                iter,
                fitnesses = ?swarm.fitnesses(),
                best_position = ?swarm.best_position,
                state = ?swarm.state,
                "swarm state"
            );
        }
    }

    /// Run has finished
    pub fn finished(&self, report: &RunReport) {
        if self.verbosity > 0 {
            tracing::info!(
                optimizer = self.optimizer,
                iterations = report.iterations,
                best_fitness = report.best_fitness,
                terminated_early = report.terminated_early,
                "optimization complete"
            );
        }
    }
}
