use std::collections::BTreeMap;
use std::fmt;

use crate::property::PropertyId;

/// Immutable mapping from list-property identity to an element index
///
/// An `IndexContext` pins the list indices needed to resolve one concrete
/// element inside a tree of nested lists. It is a pure value object: every
/// operation returns a new instance, and two contexts with the same entries
/// compare equal regardless of how they were built.
///
/// The subset relation ([`IndexContext::contains`]) forms a partial order
/// over contexts; [`IndexContext::EMPTY`] is the bottom element, contained
/// by every context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexContext {
    entries: BTreeMap<PropertyId, u32>,
}

impl IndexContext {
    /// The canonical zero-entry context
    pub const EMPTY: IndexContext = IndexContext {
        entries: BTreeMap::new(),
    };

    /// Create an empty context
    pub fn new() -> Self {
        Self::EMPTY
    }

    /// Get the index pinned for a list property, if any
    pub fn index_of(&self, property: PropertyId) -> Option<u32> {
        self.entries.get(&property).copied()
    }

    /// Check whether this context pins an index for the given property
    pub fn has(&self, property: PropertyId) -> bool {
        self.entries.contains_key(&property)
    }

    /// Number of pinned indices
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether no indices are pinned
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in ascending property order
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, u32)> + '_ {
        self.entries.iter().map(|(p, i)| (*p, *i))
    }

    /// Derive a context with one additional pinned index
    ///
    /// An existing entry for the same property is overwritten.
    pub fn with(&self, property: PropertyId, index: u32) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(property, index);
        Self { entries }
    }

    /// Derive a context extended with explicit (property, index) pairs
    ///
    /// Later pairs overwrite earlier ones for the same property.
    pub fn with_all(&self, pairs: impl IntoIterator<Item = (PropertyId, u32)>) -> Self {
        let mut entries = self.entries.clone();
        for (property, index) in pairs {
            entries.insert(property, index);
        }
        Self { entries }
    }

    /// Merge two contexts
    ///
    /// On a key collision the argument's entry wins, which makes union
    /// asymmetric: `a.union(b)` need not equal `b.union(a)`.
    pub fn union(&self, other: &IndexContext) -> Self {
        let mut entries = self.entries.clone();
        for (property, index) in &other.entries {
            entries.insert(*property, *index);
        }
        Self { entries }
    }

    /// Reduce this context to the entries whose property is in `properties`
    ///
    /// Used to strip a context down to the indices relevant for one
    /// property's path.
    pub fn intersect(&self, properties: &[PropertyId]) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(p, _)| properties.contains(p))
            .map(|(p, i)| (*p, *i))
            .collect();
        Self { entries }
    }

    /// Subset test: true iff every entry of `other` is present and equal here
    ///
    /// This is a partial order: `a.contains(a)` always holds, mutual
    /// containment implies equality, and `EMPTY` is contained by everything
    /// while containing nothing but itself.
    pub fn contains(&self, other: &IndexContext) -> bool {
        other
            .entries
            .iter()
            .all(|(p, i)| self.entries.get(p) == Some(i))
    }

    /// Overlap test: true iff the two contexts agree on every property
    /// they both pin
    ///
    /// Two contexts overlap exactly when the address regions they describe
    /// intersect; a context with fewer pins describes a wider region. The
    /// relation is symmetric, and `EMPTY` overlaps everything.
    pub fn overlaps(&self, other: &IndexContext) -> bool {
        self.entries
            .iter()
            .all(|(p, i)| match other.entries.get(p) {
                Some(pinned) => pinned == i,
                None => true,
            })
    }

    /// Rebase the index pinned for `property` after a list insert or remove
    ///
    /// If this context pins `property` at an index `>= base`, the entry is
    /// replaced by `index + delta`; all other entries are untouched. Indices
    /// are unsigned, so a negative result clamps at 0.
    pub fn rebase(&self, property: PropertyId, base: u32, delta: i64) -> Self {
        match self.entries.get(&property) {
            Some(&index) if index >= base => {
                let shifted = (i64::from(index) + delta).max(0) as u32;
                self.with(property, shifted)
            }
            _ => self.clone(),
        }
    }
}

impl fmt::Display for IndexContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (n, (property, index)) in self.iter().enumerate() {
            if n > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", property, index)?;
        }
        write!(f, "}}")
    }
}
