//! Error types for building and running pipelines.

use flowline_core::AttrId;
use thiserror::Error;

/// Fatal contract errors raised while building a processing.
///
/// These are developer-facing defects: an assembly that fails to build
/// must abort startup for that pipeline, never be silently ignored.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A stage requires an attribute no earlier stage defines.
    #[error(
        "stage '{stage}' in assembly '{assembly}' requires attribute {attr} \
         that no earlier stage defines"
    )]
    UnsatisfiedRequire {
        assembly: String,
        stage: String,
        attr: AttrId,
    },
}

/// Run-time failures of one chain execution.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A stage failed while processing the chain.
    #[error("stage '{stage}' failed: {error}")]
    Stage { stage: String, error: anyhow::Error },

    /// A stage asked for a branch index it was not built with.
    #[error("stage '{stage}' has no branch {index}")]
    NoBranch { stage: String, index: usize },

    /// Branching was attempted while no stage is executing.
    #[error("branch invoked outside of a running stage")]
    NoActiveStage,
}
