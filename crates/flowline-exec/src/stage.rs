//! The stage contract.

use flowline_core::StageContract;

use crate::chain::Chain;

/// One unit of pipeline work.
///
/// A stage reads and writes context attributes through the chain it is
/// handed, restricted to the attributes its [`StageContract`] declares.
/// Plain stages return and let the engine advance; a stage may instead
/// drive the remainder of the chain itself via [`Chain::proceed`], stop
/// ordinary advancement via [`Chain::stop`], or delegate to a nested
/// pipeline via [`Chain::branch`].
///
/// Implementations must be `Send + Sync`: one stage instance is shared
/// by every concurrent chain over the same processing.
pub trait Stage: Send + Sync + 'static {
    /// Stage name used in diagnostics and build errors.
    fn name(&self) -> &str;

    /// The attribute capability table this stage exposes.
    ///
    /// Must be stable: the engine snapshots it at build time.
    fn contract(&self) -> StageContract;

    /// Process the current chain position.
    fn process(&self, chain: &mut Chain) -> anyhow::Result<()>;
}
