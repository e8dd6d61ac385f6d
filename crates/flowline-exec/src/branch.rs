//! Branch declarations — delegation to a nested assembly.
//!
//! A branch binds a nested assembly to a parent stage together with a
//! remap table between outer and inner attribute names. Only remapped
//! attributes cross the boundary, in both directions; everything else
//! is invisible to the nested pipeline.

use flowline_core::{Attr, AttrId};

use crate::assembly::Assembly;

/// One attribute crossing the branch boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remap {
    /// Attribute name in the outer context set.
    pub outer: AttrId,
    /// Attribute name inside the nested pipeline.
    pub inner: AttrId,
}

/// A nested assembly bound to a parent stage, with its remap table.
#[derive(Clone)]
pub struct Branch {
    assembly: Assembly,
    remap: Vec<Remap>,
}

impl Branch {
    /// Bind a nested assembly with an empty remap table.
    pub fn new(assembly: &Assembly) -> Self {
        Self {
            assembly: assembly.clone(),
            remap: Vec::new(),
        }
    }

    /// Map an outer attribute onto an inner attribute.
    ///
    /// The value flows outer→inner when the branch starts and
    /// inner→outer when the nested chain completes.
    pub fn map<T>(mut self, outer: &Attr<T>, inner: &Attr<T>) -> Self {
        self.remap.push(Remap {
            outer: outer.id(),
            inner: inner.id(),
        });
        self
    }

    /// Expose an attribute under the same name on both sides.
    pub fn share<T>(self, attr: &Attr<T>) -> Self {
        self.map(attr, attr)
    }

    pub fn assembly(&self) -> &Assembly {
        &self.assembly
    }

    pub fn remap(&self) -> &[Remap] {
        &self.remap
    }
}
