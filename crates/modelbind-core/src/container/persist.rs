//! Persistor registry and the minimal-persist-set dispatch
//!
//! `persist` walks the change log, maps every changed property to its
//! nearest ancestor carrying a persistor, reduces the surviving contexts to
//! a minimal non-overlapping set, expands unpinned list indices over the
//! current elements and invokes each persistor once per concrete instance.
//! The loop is deliberately non-atomic: a failing persistor aborts the call
//! but earlier persists and their log clears remain in effect.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use serde_json::Value;

use crate::container::ModelContainer;
use crate::context::IndexContext;
use crate::errors::{ModelError, Result};
use crate::handler::ModelHandler;
use crate::property::PropertyId;
use crate::{log_op_end, log_op_error, log_op_start};

// ===== Persistor =====

/// Failure reported by a persistor implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistorError {
    message: String,
}

impl PersistorError {
    pub fn new(message: impl Into<String>) -> Self {
        PersistorError {
            message: message.into(),
        }
    }
}

impl fmt::Display for PersistorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PersistorError {}

/// Handler durably storing the value reachable through one property
///
/// Receives the instance read from the model and returns the value to put
/// back, typically the same instance enriched with store-assigned state.
pub trait Persistor {
    fn persist(&mut self, instance: Value) -> std::result::Result<Value, PersistorError>;
}

impl<F> Persistor for F
where
    F: FnMut(Value) -> std::result::Result<Value, PersistorError>,
{
    fn persist(&mut self, instance: Value) -> std::result::Result<Value, PersistorError> {
        self(instance)
    }
}

// ===== Dispatch =====

impl<M> ModelContainer<M> {
    /// Register the persistor responsible for `property`
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PersistorAlreadyRegistered`] when the property
    /// already has one; at most one persistor per property.
    pub fn register_persistor(
        &mut self,
        property: PropertyId,
        persistor: Box<dyn Persistor>,
    ) -> Result<()> {
        let name = self.graph.name(property)?;
        if self.persistors.contains_key(&property) {
            return Err(ModelError::PersistorAlreadyRegistered {
                property: name.to_string(),
            });
        }
        self.persistors.insert(property, persistor);
        Ok(())
    }

    /// Persist the minimal set of changed sub-trees covering `target`
    ///
    /// Only changes whose logged context lies inside `target` take part.
    /// Cleared log entries and persisted values are visible afterwards even
    /// when a later persistor fails; there is no rollback.
    ///
    /// # Returns
    ///
    /// The model after all write-backs.
    ///
    /// # Errors
    ///
    /// [`ModelError::NoModel`] on an empty container,
    /// [`ModelError::NoPersistorRegistered`] when a changed property has no
    /// persistor anywhere on its ancestor chain, and
    /// [`ModelError::PersistorFailed`] wrapping a persistor error.
    pub fn persist(&mut self, target: &IndexContext) -> Result<&M> {
        let started = Instant::now();
        log_op_start!("persist", changed_len = self.change_log.len());

        match self.run_persist(target) {
            Ok(persisted_len) => {
                log_op_end!(
                    "persist",
                    duration_ms = started.elapsed().as_millis() as u64,
                    persisted_len = persisted_len
                );
                self.model.as_ref().ok_or(ModelError::NoModel)
            }
            Err(err) => {
                log_op_error!(
                    "persist",
                    err,
                    duration_ms = started.elapsed().as_millis() as u64
                );
                Err(err)
            }
        }
    }

    fn run_persist(&mut self, target: &IndexContext) -> Result<usize> {
        if self.model.is_none() {
            return Err(ModelError::NoModel);
        }

        let pending = self.collect_pending(target)?;
        let pending = self.deduplicate(pending)?;

        // ascending handles means ancestors persist before descendants
        let mut persisted = 0usize;
        for (persistable, contexts) in pending {
            let declared = self.graph.index_path(persistable)?.to_vec();
            for ctx in contexts {
                for concrete in self.expand(&declared, &ctx)? {
                    persisted += self.persist_instance(persistable, &concrete)?;
                }
            }
        }
        Ok(persisted)
    }

    /// Steps 1 and 2: ancestor walk plus context reduction and filtering
    fn collect_pending(
        &self,
        target: &IndexContext,
    ) -> Result<BTreeMap<PropertyId, Vec<IndexContext>>> {
        let mut pending: BTreeMap<PropertyId, Vec<IndexContext>> = BTreeMap::new();
        for changed in self.change_log.properties() {
            let persistable = self.nearest_persistable(changed)?;
            let declared = self.graph.index_path(persistable)?;
            let target_reduced = target.intersect(declared);
            for logged in self.change_log.contexts(changed) {
                let reduced = logged.intersect(declared);
                if !reduced.contains(&target_reduced) {
                    continue;
                }
                let contexts = pending.entry(persistable).or_default();
                if !contexts.contains(&reduced) {
                    contexts.push(reduced);
                }
            }
        }
        Ok(pending)
    }

    /// Walk `property` and its ancestors to the first one with a persistor
    fn nearest_persistable(&self, property: PropertyId) -> Result<PropertyId> {
        let mut current = Some(property);
        while let Some(candidate) = current {
            if self.persistors.contains_key(&candidate) {
                return Ok(candidate);
            }
            current = self.graph.parent(candidate)?;
        }
        Err(ModelError::NoPersistorRegistered {
            property: self.graph.name(property)?.to_string(),
        })
    }

    /// Step 3: drop every context already covered by an ancestor-or-self
    /// entry, so no instance is persisted twice
    fn deduplicate(
        &self,
        mut pending: BTreeMap<PropertyId, Vec<IndexContext>>,
    ) -> Result<BTreeMap<PropertyId, Vec<IndexContext>>> {
        let paths: BTreeMap<PropertyId, Vec<PropertyId>> = pending
            .keys()
            .map(|q| Ok((*q, self.graph.path(*q)?.to_vec())))
            .collect::<Result<_>>()?;
        let snapshot = pending.clone();

        for (dependent, contexts) in pending.iter_mut() {
            let path = &paths[dependent];
            contexts.retain(|ctx| {
                !path.iter().any(|covering| {
                    snapshot.get(covering).is_some_and(|candidates| {
                        candidates.iter().any(|candidate| {
                            ctx.contains(candidate)
                                && !(covering == dependent && candidate == ctx)
                        })
                    })
                })
            });
        }
        pending.retain(|_, contexts| !contexts.is_empty());
        Ok(pending)
    }

    /// Step 4: expand unpinned list indices into one context per existing
    /// element, outer lists first since inner lengths depend on them
    fn expand(&self, declared: &[PropertyId], ctx: &IndexContext) -> Result<Vec<IndexContext>> {
        let mut concretes = vec![ctx.clone()];
        for list in declared {
            if ctx.has(*list) {
                continue;
            }
            let mut next = Vec::new();
            for partial in &concretes {
                for index in 0..self.list_len(*list, partial)? {
                    next.push(partial.with(*list, index));
                }
            }
            concretes = next;
        }
        Ok(concretes)
    }

    /// Current element count of a list instance; absent lists are empty
    fn list_len(&self, list: PropertyId, ctx: &IndexContext) -> Result<u32> {
        match self.get_property(list, ctx)? {
            None => Ok(0),
            Some(Value::Array(items)) => Ok(items.len() as u32),
            Some(_) => Err(ModelError::TypeMismatch {
                property: self.graph.name(list)?.to_string(),
                expected: "array",
            }),
        }
    }

    /// Step 5 for one concrete context: fetch, persist, write back, clear
    fn persist_instance(&mut self, property: PropertyId, concrete: &IndexContext) -> Result<usize> {
        let Some(instance) = self.get_property(property, concrete)? else {
            return Ok(0);
        };

        let name = self.graph.name(property)?.to_string();
        let persistor = self
            .persistors
            .get_mut(&property)
            .ok_or(ModelError::NoPersistorRegistered {
                property: name.clone(),
            })?;
        let stored = persistor
            .persist(instance)
            .map_err(|err| ModelError::PersistorFailed {
                property: name,
                context: concrete.to_string(),
                message: err.to_string(),
            })?;

        // write back directly; persist output is not a change
        let access = self.graph.access(property)?;
        let model = self.model.as_mut().ok_or(ModelError::NoModel)?;
        access.set(model, stored, concrete)?;

        self.change_log.clear_covered(property, concrete);
        for descendant in self.graph.descendants(property)? {
            self.change_log.clear_covered(descendant, concrete);
        }
        Ok(1)
    }
}
