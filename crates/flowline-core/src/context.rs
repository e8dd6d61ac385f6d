//! Per-run attribute bags.
//!
//! A `ContextSet` holds every attribute of one pipeline run. Values are
//! stored behind `Arc<dyn Any + Send + Sync>`; a write replaces the
//! slot, so "mutation" is always publication of a new value. Instances
//! are created fresh per chain run (or per branch invocation) and
//! discarded with the run.
//!
//! The set itself is unrestricted — per-stage view enforcement happens
//! in the chain, which knows which stage is currently executing.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::attr::{Attr, AttrId};
use crate::error::ContextError;

/// A stored attribute value.
pub type AttrValue = Arc<dyn Any + Send + Sync>;

/// The attribute bag for one pipeline run.
#[derive(Default)]
pub struct ContextSet {
    attrs: HashMap<AttrId, AttrValue>,
}

impl ContextSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, replacing any previous value.
    pub fn set<T: Send + Sync + 'static>(&mut self, attr: &Attr<T>, value: T) {
        self.attrs.insert(attr.id(), Arc::new(value));
    }

    /// Set an attribute from an already-shared value.
    pub fn set_value(&mut self, id: AttrId, value: AttrValue) {
        self.attrs.insert(id, value);
    }

    /// Read an attribute.
    ///
    /// `Ok(None)` means absent; a present value of the wrong type is a
    /// programming error reported as [`ContextError::Type`].
    pub fn get<T: Send + Sync + 'static>(
        &self,
        attr: &Attr<T>,
    ) -> Result<Option<&T>, ContextError> {
        match self.attrs.get(&attr.id()) {
            None => Ok(None),
            Some(value) => value
                .downcast_ref::<T>()
                .map(Some)
                .ok_or(ContextError::Type { attr: attr.id() }),
        }
    }

    /// The raw shared value, if present.
    pub fn value(&self, id: AttrId) -> Option<&AttrValue> {
        self.attrs.get(&id)
    }

    /// Whether the attribute currently has a value.
    pub fn contains(&self, id: AttrId) -> bool {
        self.attrs.contains_key(&id)
    }

    /// Remove an attribute; returns whether a value was present.
    pub fn clear(&mut self, id: AttrId) -> bool {
        self.attrs.remove(&id).is_some()
    }

    /// Take exclusive ownership of an attribute value.
    ///
    /// Fails with [`ContextError::Shared`] if another component still
    /// holds a reference to the value; the slot keeps the value in that
    /// case.
    pub fn take<T: Send + Sync + 'static>(
        &mut self,
        attr: &Attr<T>,
    ) -> Result<Option<T>, ContextError> {
        let Some(value) = self.attrs.remove(&attr.id()) else {
            return Ok(None);
        };
        let arc = match value.downcast::<T>() {
            Ok(arc) => arc,
            Err(value) => {
                self.attrs.insert(attr.id(), value);
                return Err(ContextError::Type { attr: attr.id() });
            }
        };
        match Arc::try_unwrap(arc) {
            Ok(value) => Ok(Some(value)),
            Err(arc) => {
                self.attrs.insert(attr.id(), arc);
                Err(ContextError::Shared { attr: attr.id() })
            }
        }
    }

    /// Number of attributes currently set.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}
