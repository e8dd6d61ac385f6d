//! Per-processing memoization.
//!
//! The cache gives "compute once per distinct shape" sharing without a
//! manual eviction policy: each `Processing` owns one cache instance,
//! so entries disappear exactly when the processing they belong to is
//! discarded. Keys are structural tuples; entries are set once and read
//! thereafter. Concurrent chains may race to set the same key with an
//! equal value — the first write wins and the race is benign.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use flowline_core::AttrId;

/// One component of a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Str(String),
    U64(u64),
    I64(i64),
    Bool(bool),
    Type(TypeId),
    Attr(AttrId),
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Str(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Str(value)
    }
}

impl From<u64> for KeyPart {
    fn from(value: u64) -> Self {
        KeyPart::U64(value)
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        KeyPart::I64(value)
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        KeyPart::Bool(value)
    }
}

impl From<TypeId> for KeyPart {
    fn from(value: TypeId) -> Self {
        KeyPart::Type(value)
    }
}

impl From<AttrId> for KeyPart {
    fn from(value: AttrId) -> Self {
        KeyPart::Attr(value)
    }
}

/// A set-once cache slot.
#[derive(Default)]
pub struct CacheEntry {
    value: OnceLock<Arc<dyn Any + Send + Sync>>,
}

impl CacheEntry {
    /// Whether a value has been set.
    pub fn has(&self) -> bool {
        self.value.get().is_some()
    }

    /// Set the value; first write wins. Returns whether this call won.
    pub fn set<T: Send + Sync + 'static>(&self, value: T) -> bool {
        self.value.set(Arc::new(value)).is_ok()
    }

    /// Read the value, if set and of the expected type.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.get().and_then(|v| v.clone().downcast::<T>().ok())
    }
}

/// The memoization table of one processing.
pub struct Cache {
    entries: Mutex<HashMap<Vec<KeyPart>, Arc<CacheEntry>>>,
}

impl Cache {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up (or create) the entry for a structural key.
    ///
    /// Structurally equal parts always return the same entry, shared
    /// across every chain over the owning processing.
    pub fn key<I>(&self, parts: I) -> Arc<CacheEntry>
    where
        I: IntoIterator<Item = KeyPart>,
    {
        let key: Vec<KeyPart> = parts.into_iter().collect();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.entry(key).or_default().clone()
    }

    /// Number of distinct keys seen.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
