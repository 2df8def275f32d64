//! Operator pipeline
//!
//! An [`Operator`] is a named, stateful in-place transformation of a swarm.
//! Operators compose left to right into a [`Pipeline`]: each stage runs to
//! completion over the whole swarm before the next begins, so later stages
//! observe what earlier ones wrote in the same iteration. A pipeline is
//! itself an operator.

use rand::RngCore;

use crate::Result;

/// In-place transformation of `T` (normally a swarm)
pub trait Operator<T: ?Sized> {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Apply the transformation
    fn apply(&mut self, target: &mut T, rng: &mut dyn RngCore) -> Result<()>;
}

impl<T: ?Sized, O: Operator<T> + ?Sized> Operator<T> for Box<O> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn apply(&mut self, target: &mut T, rng: &mut dyn RngCore) -> Result<()> {
        (**self).apply(target, rng)
    }
}

/// Ordered composition of operators
pub struct Pipeline<'a, T: ?Sized> {
    stages: Vec<Box<dyn Operator<T> + 'a>>,
}

impl<'a, T: ?Sized> Pipeline<'a, T> {
    /// Start an empty builder
    pub fn builder() -> PipelineBuilder<'a, T> {
        PipelineBuilder { stages: Vec::new() }
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl<'a, T: ?Sized> Operator<T> for Pipeline<'a, T> {
    fn name(&self) -> &str {
        "pipeline"
    }

    fn apply(&mut self, target: &mut T, rng: &mut dyn RngCore) -> Result<()> {
        for stage in &mut self.stages {
            tracing::trace!(stage = stage.name(), "applying operator");
            stage.apply(target, rng)?;
        }
        Ok(())
    }
}

impl<'a, T: ?Sized> core::fmt::Debug for Pipeline<'a, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder for [`Pipeline`]
pub struct PipelineBuilder<'a, T: ?Sized> {
    stages: Vec<Box<dyn Operator<T> + 'a>>,
}

impl<'a, T: ?Sized> PipelineBuilder<'a, T> {
    /// Append a stage
    pub fn then<O: Operator<T> + 'a>(mut self, op: O) -> Self {
        self.stages.push(Box::new(op));
        self
    }

    /// Append a stage when one is given
    pub fn then_some<O: Operator<T> + 'a>(self, op: Option<O>) -> Self {
        match op {
            Some(op) => self.then(op),
            None => self,
        }
    }

    /// Finish the pipeline
    pub fn build(self) -> Pipeline<'a, T> {
        Pipeline {
            stages: self.stages,
        }
    }
}

/// Operator backed by a closure
pub struct FnOperator<F> {
    name: String,
    f: F,
}

impl<F> FnOperator<F> {
    /// Wrap `f` under `name`
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<T: ?Sized, F> Operator<T> for FnOperator<F>
where
    F: FnMut(&mut T, &mut dyn RngCore) -> Result<()>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&mut self, target: &mut T, rng: &mut dyn RngCore) -> Result<()> {
        (self.f)(target, rng)
    }
}
