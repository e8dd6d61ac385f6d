//! Chain execution — one live run of a processing.
//!
//! A chain owns the context set for its run, a cursor into the stage
//! list, a consumed flag for early stops, and an ordered list of
//! finalize hooks. The exactly-once finalizer guarantee is the core
//! correctness property here: hooks run on normal exhaustion, explicit
//! consume, stage failure, and even when the chain is dropped without
//! completing, so resource cleanup is safe under every exit path.

use std::sync::Arc;

use flowline_core::{Attr, AttrId, ContextError, ContextSet};
use tracing::{debug, warn};

use crate::cache::Cache;
use crate::error::ChainError;
use crate::processing::Processing;

/// Lifecycle of one chain run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// Stages are still pending.
    Running,
    /// A stage stopped ordinary advancement; finalizers pending.
    Consumed,
    /// The stage list is exhausted; finalizers pending.
    Done,
    /// Finalizers have run. Terminal.
    Finalized,
}

/// How a completed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every stage ran.
    Completed,
    /// A stage stopped the run early.
    Consumed,
}

impl ChainOutcome {
    pub fn consumed(&self) -> bool {
        matches!(self, ChainOutcome::Consumed)
    }
}

type FinalizeHook = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

/// The live execution cursor for one run of a [`Processing`].
///
/// Owned exclusively by the caller that started it. Attribute access
/// is unrestricted while no stage is executing (transport seeding and
/// result reads) and restricted to the running stage's contract
/// otherwise.
pub struct Chain {
    processing: Arc<Processing>,
    contexts: ContextSet,
    cursor: usize,
    current: Option<usize>,
    consumed: bool,
    state: ChainState,
    finalizers: Vec<FinalizeHook>,
}

impl Chain {
    pub(crate) fn new(processing: Arc<Processing>) -> Self {
        Self {
            processing,
            contexts: ContextSet::new(),
            cursor: 0,
            current: None,
            consumed: false,
            state: ChainState::Running,
            finalizers: Vec::new(),
        }
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    /// The memoization cache of the owning processing.
    pub fn cache(&self) -> &Cache {
        self.processing.cache()
    }

    // ── Attribute access ───────────────────────────────────────────

    /// Read an attribute, checked against the running stage's view.
    pub fn get<T: Send + Sync + 'static>(
        &self,
        attr: &Attr<T>,
    ) -> Result<Option<&T>, ContextError> {
        self.check_view(attr.id())?;
        self.contexts.get(attr)
    }

    /// Write an attribute, checked against the running stage's view.
    pub fn set<T: Send + Sync + 'static>(
        &mut self,
        attr: &Attr<T>,
        value: T,
    ) -> Result<(), ContextError> {
        self.check_view(attr.id())?;
        self.contexts.set(attr, value);
        Ok(())
    }

    /// Whether the attribute currently has a value.
    pub fn has<T: Send + Sync + 'static>(&self, attr: &Attr<T>) -> Result<bool, ContextError> {
        self.check_view(attr.id())?;
        Ok(self.contexts.contains(attr.id()))
    }

    /// Remove an attribute value; returns whether one was present.
    pub fn clear<T: Send + Sync + 'static>(
        &mut self,
        attr: &Attr<T>,
    ) -> Result<bool, ContextError> {
        self.check_view(attr.id())?;
        Ok(self.contexts.clear(attr.id()))
    }

    /// Take exclusive ownership of an attribute value.
    pub fn take<T: Send + Sync + 'static>(
        &mut self,
        attr: &Attr<T>,
    ) -> Result<Option<T>, ContextError> {
        self.check_view(attr.id())?;
        self.contexts.take(attr)
    }

    fn check_view(&self, id: AttrId) -> Result<(), ContextError> {
        if let Some(idx) = self.current {
            let stage = &self.processing.stages()[idx];
            if !stage.contract.declares(id) {
                return Err(ContextError::Undeclared {
                    stage: stage.name.clone(),
                    attr: id,
                });
            }
        }
        Ok(())
    }

    // ── Execution ──────────────────────────────────────────────────

    /// Run the next stage.
    ///
    /// Returns `Ok(true)` while stages remain, `Ok(false)` once the
    /// run ended (exhaustion or consume). Transports that interleave
    /// body ingestion with pipeline progress drive the chain with this
    /// and call [`Chain::finish`] when done.
    pub fn step(&mut self) -> Result<bool, ChainError> {
        if self.state != ChainState::Running {
            return Ok(false);
        }
        if self.consumed || self.cursor >= self.processing.len() {
            self.settle();
            return Ok(false);
        }

        let idx = self.cursor;
        self.cursor += 1;
        let stage = self.processing.stages()[idx].stage.clone();
        let prev = self.current.replace(idx);
        let result = stage.process(self);
        self.current = prev;

        if let Err(error) = result {
            let stage = self.processing.stages()[idx].name.clone();
            self.settle();
            return Err(ChainError::Stage { stage, error });
        }

        if self.consumed || self.cursor >= self.processing.len() {
            self.settle();
            return Ok(false);
        }
        Ok(true)
    }

    /// Drive the remaining stages to completion.
    ///
    /// Callable from within a stage (continuation style): the stage
    /// runs everything after itself and regains control afterwards.
    pub fn proceed(&mut self) -> Result<(), ChainError> {
        while self.step()? {}
        Ok(())
    }

    /// Run the whole chain and its finalizers.
    pub fn execute(&mut self) -> Result<ChainOutcome, ChainError> {
        let result = self.proceed();
        self.finish();
        result.map(|_| self.outcome())
    }

    /// Stop ordinary advancement; finalizers still run.
    pub fn stop(&mut self) {
        self.consumed = true;
        if self.state == ChainState::Running {
            self.state = ChainState::Consumed;
        }
    }

    /// How the run ended so far.
    pub fn outcome(&self) -> ChainOutcome {
        if self.consumed {
            ChainOutcome::Consumed
        } else {
            ChainOutcome::Completed
        }
    }

    fn settle(&mut self) {
        if self.state == ChainState::Running {
            self.state = if self.consumed {
                ChainState::Consumed
            } else {
                ChainState::Done
            };
        }
    }

    // ── Branching ──────────────────────────────────────────────────

    /// Delegate to the running stage's branch at `index`.
    ///
    /// Builds a fresh context set containing exactly the remapped
    /// attributes, runs the nested chain to completion (including its
    /// own finalizers), and copies remapped values back on success.
    /// Failure inside the branch propagates as an ordinary stage
    /// failure.
    pub fn branch(&mut self, index: usize) -> Result<ChainOutcome, ChainError> {
        let Some(idx) = self.current else {
            return Err(ChainError::NoActiveStage);
        };
        let stage = &self.processing.stages()[idx];
        let Some(resolved) = stage.branches.get(index) else {
            return Err(ChainError::NoBranch {
                stage: stage.name.clone(),
                index,
            });
        };
        let nested = resolved.processing.clone();
        let remap = resolved.remap.clone();

        let mut inner = Chain::new(nested);
        for entry in &remap {
            if let Some(value) = self.contexts.value(entry.outer) {
                inner.contexts.set_value(entry.inner, value.clone());
            }
        }

        let outcome = inner.execute()?;
        for entry in &remap {
            if let Some(value) = inner.contexts.value(entry.inner) {
                self.contexts.set_value(entry.outer, value.clone());
            }
        }
        Ok(outcome)
    }

    // ── Finalization ───────────────────────────────────────────────

    /// Register a cleanup hook.
    ///
    /// Hooks run exactly once, in registration order, when the run
    /// ends — by exhaustion, consume, stage failure, or the chain
    /// being dropped. A failing hook is logged and swallowed so later
    /// hooks still run.
    pub fn on_finalize(&mut self, hook: impl FnOnce() -> anyhow::Result<()> + Send + 'static) {
        self.finalizers.push(Box::new(hook));
    }

    /// Run pending finalizers and seal the chain.
    ///
    /// Idempotent; [`Chain::execute`] calls it automatically, stepping
    /// transports call it once ingestion and response handling are
    /// done.
    pub fn finish(&mut self) {
        if self.state == ChainState::Finalized {
            return;
        }
        self.settle();
        for hook in self.finalizers.drain(..) {
            if let Err(error) = hook() {
                warn!(
                    chain = self.processing.name(),
                    error = %error,
                    "finalize hook failed"
                );
            }
        }
        self.state = ChainState::Finalized;
    }
}

impl Drop for Chain {
    fn drop(&mut self) {
        if self.state != ChainState::Finalized {
            debug!(
                chain = self.processing.name(),
                "chain dropped before finish, running finalize hooks"
            );
            self.finish();
        }
    }
}
