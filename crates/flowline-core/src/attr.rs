//! Typed attribute keys and stage capability tables.
//!
//! An attribute is identified by `(context name, attribute name)` and
//! carries a Rust value type through the `Attr<T>` marker. Stages
//! declare the attributes they touch in a `StageContract`; the build
//! step uses those tables to verify that every required attribute has
//! an upstream producer before a pipeline ever runs.

use std::fmt;
use std::marker::PhantomData;

/// Identity of an attribute: its context name plus its own name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttrId {
    pub context: &'static str,
    pub name: &'static str,
}

impl fmt::Display for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.context, self.name)
    }
}

/// A typed attribute key.
///
/// Declared as constants by the module that owns the attribute, e.g.
///
/// ```
/// use flowline_core::Attr;
///
/// pub const CONTENT_LENGTH: Attr<u64> = Attr::new("request_content", "length");
/// ```
///
/// The type parameter never leaves compile time; at runtime an `Attr<T>`
/// is just its [`AttrId`].
pub struct Attr<T> {
    context: &'static str,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Attr<T> {
    /// Declare an attribute key.
    pub const fn new(context: &'static str, name: &'static str) -> Self {
        Self {
            context,
            name,
            _marker: PhantomData,
        }
    }

    /// The context this attribute belongs to.
    pub fn context(&self) -> &'static str {
        self.context
    }

    /// The attribute name within its context.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The untyped identity used in contracts and error messages.
    pub fn id(&self) -> AttrId {
        AttrId {
            context: self.context,
            name: self.name,
        }
    }
}

impl<T> Clone for Attr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Attr<T> {}

impl<T> fmt::Debug for Attr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attr({})", self.id())
    }
}

/// Presence kind of an attribute within a stage's contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be defined by an earlier stage or supplied by the caller.
    Requires,
    /// This stage is the producer of the attribute.
    Defines,
    /// May or may not be present; readers branch on presence.
    Optional,
}

/// One declared attribute in a stage contract.
#[derive(Debug, Clone, Copy)]
pub struct ContractEntry {
    pub id: AttrId,
    pub presence: Presence,
}

/// The capability table a stage exposes.
///
/// Lists every attribute the stage reads or writes together with its
/// presence kind. Attributes absent from the table are invisible to the
/// stage at runtime, even when physically present in the context set.
#[derive(Debug, Clone, Default)]
pub struct StageContract {
    entries: Vec<ContractEntry>,
}

impl StageContract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required attribute.
    pub fn requires<T>(mut self, attr: &Attr<T>) -> Self {
        self.entries.push(ContractEntry {
            id: attr.id(),
            presence: Presence::Requires,
        });
        self
    }

    /// Declare a defined (produced) attribute.
    pub fn defines<T>(mut self, attr: &Attr<T>) -> Self {
        self.entries.push(ContractEntry {
            id: attr.id(),
            presence: Presence::Defines,
        });
        self
    }

    /// Declare an optional attribute.
    pub fn optional<T>(mut self, attr: &Attr<T>) -> Self {
        self.entries.push(ContractEntry {
            id: attr.id(),
            presence: Presence::Optional,
        });
        self
    }

    /// All declared entries, in declaration order.
    pub fn entries(&self) -> &[ContractEntry] {
        &self.entries
    }

    /// Whether the contract declares the attribute at all.
    ///
    /// Declared means visible: any presence kind grants both read and
    /// write access; the kind only matters for build-time coverage.
    pub fn declares(&self, id: AttrId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Iterator over the attributes this stage produces.
    pub fn defined(&self) -> impl Iterator<Item = AttrId> + '_ {
        self.entries
            .iter()
            .filter(|e| e.presence == Presence::Defines)
            .map(|e| e.id)
    }

    /// Iterator over the attributes this stage requires.
    pub fn required(&self) -> impl Iterator<Item = AttrId> + '_ {
        self.entries
            .iter()
            .filter(|e| e.presence == Presence::Requires)
            .map(|e| e.id)
    }
}
