//! Building assemblies into executable processings.
//!
//! `Processing::build` walks the stage list once, verifying that every
//! `requires` attribute is covered by an earlier stage's `defines` (or
//! a caller-provided attribute), and recursively builds every branch's
//! nested assembly. A successful build yields an execution plan with no
//! further contract checks at run time.

use std::fmt;
use std::sync::Arc;

use flowline_core::{AttrId, StageContract};
use tracing::debug;

use crate::assembly::Assembly;
use crate::branch::Remap;
use crate::cache::Cache;
use crate::chain::Chain;
use crate::error::BuildError;
use crate::stage::Stage;

/// A branch resolved into its nested processing.
pub(crate) struct ResolvedBranch {
    pub(crate) processing: Arc<Processing>,
    pub(crate) remap: Vec<Remap>,
}

/// One verified stage slot in a processing.
pub(crate) struct ResolvedStage {
    pub(crate) stage: Arc<dyn Stage>,
    pub(crate) name: String,
    pub(crate) contract: StageContract,
    pub(crate) branches: Vec<ResolvedBranch>,
}

/// The resolved, checked form of an assembly.
///
/// Immutable and shared: built once during wiring, reused across every
/// chain run. Owns the memoization [`Cache`] whose entries live exactly
/// as long as the processing itself.
pub struct Processing {
    name: String,
    stages: Vec<ResolvedStage>,
    cache: Cache,
}

impl Processing {
    /// Build an assembly with no caller-provided attributes.
    pub fn build(assembly: &Assembly) -> Result<Arc<Self>, BuildError> {
        ProcessingBuilder::new().build(assembly)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The per-processing memoization cache.
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Number of stages in the execution plan.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order, for diagnostics.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Start a new run over this processing.
    pub fn new_chain(self: &Arc<Self>) -> Chain {
        Chain::new(self.clone())
    }

    pub(crate) fn stages(&self) -> &[ResolvedStage] {
        &self.stages
    }
}

impl fmt::Debug for Processing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processing")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder declaring the attributes the caller itself supplies.
///
/// Transport-seeded attributes (request method, declared content
/// length) are declared here so they participate in the verification
/// walk instead of bypassing it.
#[derive(Default)]
pub struct ProcessingBuilder {
    provided: Vec<AttrId>,
}

impl ProcessingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an attribute the caller seeds before execution.
    pub fn provided<T>(mut self, attr: &flowline_core::Attr<T>) -> Self {
        self.provided.push(attr.id());
        self
    }

    /// Verify contracts and resolve branches.
    ///
    /// Fails with a [`BuildError`] naming the unsatisfied attribute and
    /// the offending stage. Deterministic: the same assembly yields the
    /// same processing shape on every build.
    pub fn build(self, assembly: &Assembly) -> Result<Arc<Processing>, BuildError> {
        let stages = resolve(assembly, &self.provided)?;
        debug!(
            assembly = assembly.name(),
            stages = stages.len(),
            "processing built"
        );
        Ok(Arc::new(Processing {
            name: assembly.name().to_string(),
            stages,
            cache: Cache::new(),
        }))
    }
}

fn resolve(assembly: &Assembly, provided: &[AttrId]) -> Result<Vec<ResolvedStage>, BuildError> {
    let mut defined: Vec<AttrId> = provided.to_vec();
    let mut resolved = Vec::with_capacity(assembly.stages().len());

    for def in assembly.stages() {
        let contract = def.stage.contract();
        let name = def.stage.name().to_string();

        for attr in contract.required() {
            if !defined.contains(&attr) {
                return Err(BuildError::UnsatisfiedRequire {
                    assembly: assembly.name().to_string(),
                    stage: name,
                    attr,
                });
            }
        }

        // A branch sees exactly the remapped attributes as provided;
        // everything else stays invisible to the nested pipeline.
        let mut branches = Vec::with_capacity(def.branches.len());
        for branch in &def.branches {
            let inner_provided: Vec<AttrId> =
                branch.remap().iter().map(|r| r.inner).collect();
            let stages = resolve(branch.assembly(), &inner_provided)?;
            branches.push(ResolvedBranch {
                processing: Arc::new(Processing {
                    name: branch.assembly().name().to_string(),
                    stages,
                    cache: Cache::new(),
                }),
                remap: branch.remap().to_vec(),
            });
        }

        for attr in contract.defined() {
            if !defined.contains(&attr) {
                defined.push(attr);
            }
        }

        resolved.push(ResolvedStage {
            stage: def.stage.clone(),
            name,
            contract,
            branches,
        });
    }

    Ok(resolved)
}
