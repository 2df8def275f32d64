//! # Swarm PSO Core
//!
//! Population-based numerical optimization over real vector spaces.
//!
//! This crate provides:
//! - Particle and swarm state with per-variant metadata
//! - A composable operator pipeline that mutates a swarm in place
//! - Baseline PSO with configurable neighbor topology
//! - Adaptive complex-directed PSO (dynamic weighted directed graph)
//! - Evolutionary-state-estimation adaptive PSO with fuzzy state control,
//!   elite perturbation and optional gradient local search
//!
//! All optimizers **maximize** the supplied fitness function.
//!
//! ## Randomness
//!
//! Every operator draws from an explicit `&mut dyn RngCore` handed down by the
//! driver, so a seeded generator makes a run reproducible.

#![forbid(unsafe_code)]

pub mod acd;
pub mod bounds;
pub mod ese;
pub mod fuzzy;
pub mod init;
pub mod local_search;
pub mod operator;
pub mod particle;
pub mod pso;
pub mod report;
pub mod swarm;
pub mod telemetry;
pub mod topology;
pub mod traits;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::acd::{acd_pso_maximize, AcdConfig, AcdParams, AcdSwarm, InertiaSchedule};
    pub use crate::bounds::Bounds;
    pub use crate::ese::{apso_ese_maximize, EseConfig, EseSwarm};
    pub use crate::fuzzy::EvolutionaryState;
    pub use crate::init::{CoefficientInit, ScalarInit, SwarmInit, VectorInit};
    pub use crate::local_search::{LocalSearch, Selector};
    pub use crate::operator::{Operator, Pipeline};
    pub use crate::particle::{AcdMeta, BaseMeta, EseMeta, Particle};
    pub use crate::pso::{pso_maximize, BaseSwarm, PsoConfig, PsoHooks};
    pub use crate::report::RunReport;
    pub use crate::swarm::Swarm;
    pub use crate::topology::Topology;
    pub use crate::traits::{DifferenceFn, DistanceFn, FitnessFn, GradientFn};
    pub use crate::{Error, Result};
}

/// Result type for swarm optimization operations
pub type Result<T> = core::result::Result<T, Error>;

/// Error type for swarm optimization
///
/// Everything except [`Error::MembershipDomain`] and [`Error::Invariant`] is a
/// configuration error and is reported before any iteration runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Iteration budget was zero
    #[error("number of iterations must be at least 1")]
    ZeroIterations,
    /// Swarm has no particles
    #[error("swarm must contain at least one particle")]
    EmptySwarm,
    /// Solution vectors have no components
    #[error("solution dimensionality must be at least 1")]
    ZeroDimension,
    /// A vector did not match the solution dimensionality
    #[error("{what}: expected length {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// An upper bound was below its lower bound
    #[error("{what}: upper bound {upper} is below lower bound {lower} at index {index}")]
    InvertedBounds {
        what: &'static str,
        index: usize,
        lower: f64,
        upper: f64,
    },
    /// A scalar parameter fell outside its admissible range
    #[error("{name} = {value} is out of range (expected {expected})")]
    OutOfRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },
    /// A cognitive or social coefficient was negative
    #[error("{which} must be nonnegative (found {value})")]
    NegativeCoefficient { which: &'static str, value: f64 },
    /// Both a distance-based and a predicate-based topology update were given
    #[error("at most one of a distance and a predicate topology update may be specified")]
    ConflictingTopology,
    /// A distance topology update was requested without a threshold
    #[error("a distance topology update requires a threshold")]
    MissingThreshold,
    /// Membership function evaluated outside `[0, 1]`
    #[error("evolutionary factor {0} is outside the membership domain [0, 1]")]
    MembershipDomain(f64),
    /// Internal invariant broken (logic defect)
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl Error {
    /// Whether this error is a configuration error (as opposed to a fatal
    /// invariant violation raised mid-run).
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Error::MembershipDomain(_) | Error::Invariant(_))
    }
}

/// Check that `value` lies in the closed interval `[lo, hi]`.
pub(crate) fn ensure_in_range(
    name: &'static str,
    value: f64,
    lo: f64,
    hi: f64,
    expected: &'static str,
) -> Result<()> {
    if value >= lo && value <= hi {
        Ok(())
    } else {
        Err(Error::OutOfRange {
            name,
            value,
            expected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_errors_are_not_configuration_errors() {
        assert!(Error::ZeroIterations.is_configuration());
        assert!(Error::ConflictingTopology.is_configuration());
        assert!(!Error::MembershipDomain(1.5).is_configuration());
        assert!(!Error::Invariant("c1 < 0".into()).is_configuration());
    }

    #[test]
    fn range_check_is_inclusive() {
        assert!(ensure_in_range("p", 0.0, 0.0, 1.0, "[0, 1]").is_ok());
        assert!(ensure_in_range("p", 1.0, 0.0, 1.0, "[0, 1]").is_ok());
        assert_eq!(
            ensure_in_range("p", 1.5, 0.0, 1.0, "[0, 1]"),
            Err(Error::OutOfRange {
                name: "p",
                value: 1.5,
                expected: "[0, 1]"
            })
        );
        assert!(ensure_in_range("p", f64::NAN, 0.0, 1.0, "[0, 1]").is_err());
    }

    #[test]
    fn error_messages_name_the_offending_value() {
        let err = Error::NegativeCoefficient {
            which: "c1",
            value: -0.5,
        };
        assert_eq!(err.to_string(), "c1 must be nonnegative (found -0.5)");
    }
}
