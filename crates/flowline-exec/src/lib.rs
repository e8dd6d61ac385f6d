//! flowline-exec — the pipeline execution engine.
//!
//! Assemblies are ordered, composable lists of stages. Building an
//! assembly verifies every stage's attribute contract and resolves
//! nested branches, producing an immutable `Processing` that is shared
//! across requests. Each request executes as a `Chain`: a cursor over
//! the stage list with its own context set, a consumed flag for early
//! stops, and finalize hooks that run exactly once on every exit path.
//!
//! # Components
//!
//! - **`assembly`** — ordered stage lists, `include` composition
//! - **`processing`** — build-time contract verification, branch resolution
//! - **`chain`** — the per-run execution cursor and finalize hooks
//! - **`cache`** — per-processing memoization with set-once entries

pub mod assembly;
pub mod branch;
pub mod cache;
pub mod chain;
pub mod error;
pub mod processing;
pub mod stage;

pub use assembly::Assembly;
pub use branch::{Branch, Remap};
pub use cache::{Cache, CacheEntry, KeyPart};
pub use chain::{Chain, ChainOutcome, ChainState};
pub use error::{BuildError, ChainError};
pub use processing::{Processing, ProcessingBuilder};
pub use stage::Stage;
