//! Run summaries returned by the optimization drivers

use serde::{Deserialize, Serialize};

use crate::swarm::Swarm;

/// Outcome of one optimization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Iterations of the pipeline that were applied
    pub iterations: usize,
    /// Best fitness found
    pub best_fitness: f64,
    /// Position that achieved `best_fitness`
    pub best_position: Vec<f64>,
    /// Whether a termination predicate stopped the run before its budget
    pub terminated_early: bool,
}

impl RunReport {
    /// Snapshot the swarm best after `iterations` iterations
    pub fn from_swarm<M, S>(
        swarm: &Swarm<M, S>,
        iterations: usize,
        terminated_early: bool,
    ) -> Self {
        Self {
            iterations,
            best_fitness: swarm.best_fitness,
            best_position: swarm.best_position.clone(),
            terminated_early,
        }
    }
}
