//! Error types for context access.

use thiserror::Error;

use crate::attr::AttrId;

/// Errors raised by attribute reads and writes.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The running stage touched an attribute outside its contract.
    #[error("stage '{stage}' accessed undeclared attribute {attr}")]
    Undeclared { stage: String, attr: AttrId },

    /// The stored value is not of the type the attribute key declares.
    #[error("attribute {attr} holds a value of an unexpected type")]
    Type { attr: AttrId },

    /// Ownership of the value was requested while it is still shared.
    #[error("attribute {attr} is still shared and cannot be taken")]
    Shared { attr: AttrId },
}
