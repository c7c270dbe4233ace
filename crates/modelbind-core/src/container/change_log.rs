use std::collections::BTreeMap;

use crate::context::IndexContext;
use crate::property::PropertyId;

/// Per-property record of the index contexts mutated since the last reset
///
/// A stored `(property, context)` pair means an instance at exactly that
/// resolved address was mutated. Contexts are pre-reduced by the container
/// to the property's own index path before they arrive here. Per property,
/// contexts keep first-insertion order and are deduplicated.
#[derive(Debug, Clone, Default)]
pub struct ChangeLog {
    entries: BTreeMap<PropertyId, Vec<IndexContext>>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mutation of `property` at `ctx`
    pub(crate) fn log(&mut self, property: PropertyId, ctx: IndexContext) {
        let contexts = self.entries.entry(property).or_default();
        if !contexts.contains(&ctx) {
            contexts.push(ctx);
        }
    }

    /// The logged contexts for one property, in first-insertion order
    pub fn contexts(&self, property: PropertyId) -> &[IndexContext] {
        self.entries
            .get(&property)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Changed properties in ascending handle order
    pub fn properties(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.entries.keys().copied()
    }

    /// Whether anything is logged at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of properties with at least one logged context
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Forget everything
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop every context of `property` covered by the persisted address
    ///
    /// A logged context is covered when it does not conflict with
    /// `concrete`: it may pin more lists (a deeper address inside the
    /// persisted instance) or fewer (a wider region whose instances were
    /// all enumerated and persisted), but never a different index for a
    /// list `concrete` pins.
    pub(crate) fn clear_covered(&mut self, property: PropertyId, concrete: &IndexContext) {
        if let Some(contexts) = self.entries.get_mut(&property) {
            contexts.retain(|logged| !logged.overlaps(concrete));
            if contexts.is_empty() {
                self.entries.remove(&property);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(raw: u32) -> PropertyId {
        PropertyId::from_raw(raw)
    }

    #[test]
    fn test_log_deduplicates_per_property() {
        let mut log = ChangeLog::new();
        let ctx = IndexContext::EMPTY.with(p(1), 0);
        log.log(p(2), ctx.clone());
        log.log(p(2), ctx.clone());
        log.log(p(2), IndexContext::EMPTY.with(p(1), 1));

        assert_eq!(log.contexts(p(2)).len(), 2);
        assert_eq!(log.contexts(p(2))[0], ctx);
    }

    #[test]
    fn test_properties_iterate_in_handle_order() {
        let mut log = ChangeLog::new();
        log.log(p(5), IndexContext::EMPTY);
        log.log(p(2), IndexContext::EMPTY);
        assert_eq!(log.properties().collect::<Vec<_>>(), vec![p(2), p(5)]);
    }

    #[test]
    fn test_clear_covered_spares_only_conflicting_contexts() {
        let mut log = ChangeLog::new();
        let deeper = IndexContext::EMPTY.with(p(1), 0).with(p(3), 1);
        let wider = IndexContext::EMPTY;
        let conflicting = IndexContext::EMPTY.with(p(1), 1);
        log.log(p(2), deeper);
        log.log(p(2), wider);
        log.log(p(2), conflicting.clone());

        log.clear_covered(p(2), &IndexContext::EMPTY.with(p(1), 0));
        assert_eq!(log.contexts(p(2)), &[conflicting]);

        log.clear_covered(p(2), &IndexContext::EMPTY);
        assert!(log.is_empty());
    }
}
