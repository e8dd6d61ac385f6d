//! Ordered, composable pipeline definitions.

use std::fmt;
use std::sync::Arc;

use crate::branch::Branch;
use crate::stage::Stage;

/// A stage together with the branches it may delegate to.
#[derive(Clone)]
pub struct StageDef {
    pub(crate) stage: Arc<dyn Stage>,
    pub(crate) branches: Vec<Branch>,
}

/// An ordered, named list of stage descriptors.
///
/// Stages execute in insertion order; there is no priority system
/// beyond order. Assemblies are composed with [`Assembly::include`] and
/// frozen by building them into a `Processing` — the engine never
/// consults the assembly again after that.
#[derive(Clone)]
pub struct Assembly {
    name: String,
    stages: Vec<StageDef>,
}

impl Assembly {
    /// Create an empty assembly; the name is used in diagnostics.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            stages: Vec::new(),
        }
    }

    /// Append a plain stage.
    pub fn add(&mut self, stage: impl Stage) -> &mut Self {
        self.add_arc(Arc::new(stage), Vec::new())
    }

    /// Append a branching stage with the branches it delegates to.
    ///
    /// Branch order is the index order the stage uses at runtime.
    pub fn add_branching(&mut self, stage: impl Stage, branches: Vec<Branch>) -> &mut Self {
        self.add_arc(Arc::new(stage), branches)
    }

    /// Append an already-shared stage.
    pub fn add_arc(&mut self, stage: Arc<dyn Stage>, branches: Vec<Branch>) -> &mut Self {
        self.stages.push(StageDef { stage, branches });
        self
    }

    /// Append another assembly's stages, preserving their relative
    /// order. Used to let one subsystem extend another's pipeline.
    pub fn include(&mut self, other: &Assembly) -> &mut Self {
        self.stages.extend(other.stages.iter().cloned());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn stages(&self) -> &[StageDef] {
        &self.stages
    }

    /// Number of stages currently in the assembly.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Debug for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assembly")
            .field("name", &self.name)
            .field(
                "stages",
                &self
                    .stages
                    .iter()
                    .map(|s| s.stage.name().to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
