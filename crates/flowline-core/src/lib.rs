//! flowline-core — attribute contracts and context bags.
//!
//! The data layer of the Flowline pipeline engine. Stages communicate
//! through named attribute bags (`ContextSet`) without knowing each
//! other's full shape; each stage publishes an explicit capability
//! table (`StageContract`) declaring which attributes it requires,
//! defines, or treats as optional. The execution engine in
//! `flowline-exec` verifies those tables once at build time and
//! enforces the per-stage view at every read and write.

pub mod attr;
pub mod config;
pub mod context;
pub mod error;

pub use attr::{Attr, AttrId, ContractEntry, Presence, StageContract};
pub use config::ContentConfig;
pub use context::{AttrValue, ContextSet};
pub use error::ContextError;
