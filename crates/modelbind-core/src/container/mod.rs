//! Model ownership, change tracking and notification propagation
//!
//! [`ModelContainer`] owns the root model instance and the property graph
//! addressing it. Every indexed mutation goes through the container: it
//! delegates to the property's capability, records the change in the
//! [`ChangeLog`], rebases accessor contexts after list inserts and removes,
//! and pushes refresh notifications to registered accessors before the
//! mutating call returns. The persistence dispatch lives in
//! [`persist`](self::persist).

mod accessor;
mod change_log;
mod persist;

pub use accessor::{AccessorId, BindingId, ModelAccessor, PropertyListener};
pub use change_log::ChangeLog;
pub use persist::{Persistor, PersistorError};

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde_json::Value;

use crate::context::IndexContext;
use crate::errors::{ModelError, Result};
use crate::handler::ModelHandler;
use crate::property::{PropertyGraph, PropertyId};
use crate::{log_op_end, log_op_error, log_op_start};

use accessor::AccessorNode;

/// Owner of one model instance and its change-tracking state
///
/// A container is built over a [`PropertyGraph`] and starts without a
/// model; every model-touching operation before [`set_model`] fails with
/// [`ModelError::NoModel`]. Single-owner semantics: the container is not
/// internally synchronized.
///
/// [`set_model`]: ModelContainer::set_model
pub struct ModelContainer<M> {
    graph: PropertyGraph<M>,
    model: Option<M>,
    change_log: ChangeLog,
    persistors: BTreeMap<PropertyId, Box<dyn Persistor>>,
    accessors: BTreeMap<AccessorId, AccessorNode>,
    next_accessor: u32,
    next_binding: u32,
}

impl<M> ModelContainer<M> {
    /// Create an empty container over a property graph
    pub fn new(graph: PropertyGraph<M>) -> Self {
        ModelContainer {
            graph,
            model: None,
            change_log: ChangeLog::new(),
            persistors: BTreeMap::new(),
            accessors: BTreeMap::new(),
            next_accessor: 0,
            next_binding: 0,
        }
    }

    /// The property graph this container addresses its model through
    pub fn graph(&self) -> &PropertyGraph<M> {
        &self.graph
    }

    /// Read-only view of the pending changes
    pub fn change_log(&self) -> &ChangeLog {
        &self.change_log
    }

    /// Install a model instance
    ///
    /// Replaces any previous model, clears the change log and refreshes
    /// every binding of every registered accessor against the new model.
    ///
    /// # Errors
    ///
    /// Propagates the first capability read failure hit while refreshing
    /// bindings; the model stays installed in that case.
    pub fn set_model(&mut self, model: M) -> Result<()> {
        let started = Instant::now();
        log_op_start!("set_model", accessor_count = self.accessors.len());

        self.model = Some(model);
        self.change_log.clear();

        let root = self.graph.root();
        match self.notify_refresh(root, None) {
            Ok(()) => {
                log_op_end!(
                    "set_model",
                    duration_ms = started.elapsed().as_millis() as u64,
                    accessor_count = self.accessors.len()
                );
                Ok(())
            }
            Err(err) => {
                log_op_error!(
                    "set_model",
                    err,
                    duration_ms = started.elapsed().as_millis() as u64
                );
                Err(err)
            }
        }
    }

    // ===== Accessor registration =====

    /// Register an accessor directly under the container
    pub fn register_accessor(&mut self, context: IndexContext) -> AccessorId {
        self.insert_accessor(None, context)
    }

    /// Register an accessor as a child of an existing accessor
    ///
    /// The child's view merges its own context under the parent's.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownAccessor`] when `parent` is not
    /// registered.
    pub fn register_child_accessor(
        &mut self,
        parent: AccessorId,
        context: IndexContext,
    ) -> Result<AccessorId> {
        self.node(parent)?;
        let id = self.insert_accessor(Some(parent), context);
        if let Some(node) = self.accessors.get_mut(&parent) {
            node.children.push(id);
        }
        Ok(id)
    }

    /// Borrow the indexed view for a registered accessor
    pub fn accessor(&mut self, id: AccessorId) -> Result<ModelAccessor<'_, M>> {
        self.node(id)?;
        Ok(ModelAccessor::new(self, id))
    }

    /// The accessor's own fixed context, after any index rebasing
    pub fn accessor_context(&self, id: AccessorId) -> Result<&IndexContext> {
        Ok(&self.node(id)?.context)
    }

    /// Number of registered accessors
    pub fn accessor_count(&self) -> usize {
        self.accessors.len()
    }

    /// Bind a listener to a property on an accessor
    ///
    /// The listener is invoked on every refresh notification that reaches
    /// the accessor and covers `property`.
    pub fn bind(
        &mut self,
        accessor: AccessorId,
        property: PropertyId,
        listener: Box<dyn PropertyListener>,
    ) -> Result<BindingId> {
        if !self.graph.contains(property) {
            return Err(ModelError::UnknownProperty {
                property: property.raw(),
            });
        }
        self.node(accessor)?;
        let binding = BindingId::from_raw(self.next_binding);
        self.next_binding += 1;
        if let Some(node) = self.accessors.get_mut(&accessor) {
            node.bindings.insert(binding, (property, listener));
        }
        Ok(binding)
    }

    /// Release one binding
    pub fn unbind(&mut self, accessor: AccessorId, binding: BindingId) -> Result<()> {
        let node = self
            .accessors
            .get_mut(&accessor)
            .ok_or(ModelError::UnknownAccessor {
                accessor: accessor.raw(),
            })?;
        node.bindings
            .remove(&binding)
            .ok_or(ModelError::UnknownBinding {
                binding: binding.raw(),
            })?;
        Ok(())
    }

    /// Unregister an accessor and its whole subtree, releasing all their
    /// bindings
    pub fn remove_accessor(&mut self, id: AccessorId) -> Result<()> {
        let parent = self.node(id)?.parent;

        let mut doomed = vec![id];
        let mut next = 0;
        while next < doomed.len() {
            if let Some(node) = self.accessors.get(&doomed[next]) {
                doomed.extend(node.children.iter().copied());
            }
            next += 1;
        }
        for current in &doomed {
            self.accessors.remove(current);
        }
        if let Some(parent) = parent {
            if let Some(node) = self.accessors.get_mut(&parent) {
                node.children.retain(|child| *child != id);
            }
        }
        Ok(())
    }

    fn insert_accessor(&mut self, parent: Option<AccessorId>, context: IndexContext) -> AccessorId {
        let id = AccessorId::from_raw(self.next_accessor);
        self.next_accessor += 1;
        self.accessors.insert(
            id,
            AccessorNode {
                parent,
                context,
                children: Vec::new(),
                bindings: BTreeMap::new(),
            },
        );
        id
    }

    fn node(&self, id: AccessorId) -> Result<&AccessorNode> {
        self.accessors
            .get(&id)
            .ok_or(ModelError::UnknownAccessor { accessor: id.raw() })
    }

    /// Merge a caller context with the fixed contexts along the parent
    /// chain; fixed contexts win, container-nearest last
    pub(crate) fn absolute_context_with(
        &self,
        id: AccessorId,
        caller: &IndexContext,
    ) -> Result<IndexContext> {
        let mut merged = caller.clone();
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.node(id)?;
            merged = merged.union(&node.context);
            current = node.parent;
        }
        Ok(merged)
    }

    // ===== Notification walks =====

    /// Refresh bindings for `property` and its descendants
    ///
    /// With a write context, only accessors whose absolute context lies
    /// inside it are notified; `None` notifies everyone (model replaced).
    fn notify_refresh(&mut self, property: PropertyId, write_ctx: Option<&IndexContext>) -> Result<()> {
        let mut covered: BTreeSet<PropertyId> = BTreeSet::new();
        covered.insert(property);
        covered.extend(self.graph.descendants(property)?);

        let ids: Vec<AccessorId> = self.accessors.keys().copied().collect();
        for id in ids {
            let abs = self.absolute_context_with(id, &IndexContext::EMPTY)?;
            if let Some(write_ctx) = write_ctx {
                if !write_ctx.contains(&abs) {
                    continue;
                }
            }
            let bound: Vec<(BindingId, PropertyId)> = match self.accessors.get(&id) {
                Some(node) => node
                    .bindings
                    .iter()
                    .map(|(binding, (bound, _))| (*binding, *bound))
                    .collect(),
                None => continue,
            };
            for (binding, bound) in bound {
                if !covered.contains(&bound) {
                    continue;
                }
                let value = self.get_property(bound, &abs)?;
                if let Some(node) = self.accessors.get_mut(&id) {
                    if let Some((_, listener)) = node.bindings.get_mut(&binding) {
                        listener.refresh(bound, value.as_ref());
                    }
                }
            }
        }
        Ok(())
    }

    /// Rebase stored accessor contexts after a list insert or remove
    ///
    /// Only accessors viewing the mutated list instance are touched: their
    /// absolute context must pin everything in `region`, the mutation
    /// context reduced to the lists enclosing the mutated one.
    fn rebase_accessors(
        &mut self,
        list: PropertyId,
        region: &IndexContext,
        base: u32,
        delta: i64,
    ) -> Result<()> {
        let snapshot: Vec<(AccessorId, IndexContext)> = self
            .accessors
            .keys()
            .map(|id| {
                self.absolute_context_with(*id, &IndexContext::EMPTY)
                    .map(|abs| (*id, abs))
            })
            .collect::<Result<_>>()?;
        for (id, abs) in snapshot {
            if !abs.contains(region) {
                continue;
            }
            if let Some(node) = self.accessors.get_mut(&id) {
                node.context = node.context.rebase(list, base, delta);
            }
        }
        Ok(())
    }

    /// The mutation context reduced to the lists enclosing `list` itself
    fn list_region(&self, list: PropertyId, ctx: &IndexContext) -> Result<IndexContext> {
        let index_path = self.graph.index_path(list)?;
        let enclosing = &index_path[..index_path.len().saturating_sub(1)];
        Ok(ctx.intersect(enclosing))
    }
}

// ===== ModelHandler =====

impl<M> ModelHandler<M> for ModelContainer<M> {
    fn has_model(&self) -> bool {
        self.model.is_some()
    }

    fn model(&self) -> Result<&M> {
        self.model.as_ref().ok_or(ModelError::NoModel)
    }

    fn get_property(&self, property: PropertyId, ctx: &IndexContext) -> Result<Option<Value>> {
        let access = self.graph.access(property)?;
        let model = self.model.as_ref().ok_or(ModelError::NoModel)?;
        access.get(model, ctx)
    }

    fn set_property(
        &mut self,
        property: PropertyId,
        value: Value,
        ctx: &IndexContext,
    ) -> Result<()> {
        let access = self.graph.access(property)?;
        let model = self.model.as_mut().ok_or(ModelError::NoModel)?;
        access.set(model, value, ctx)?;

        let reduced = ctx.intersect(self.graph.index_path(property)?);
        self.change_log.log(property, reduced);
        self.notify_refresh(property, Some(ctx))
    }

    fn add_property(
        &mut self,
        property: PropertyId,
        value: Value,
        ctx: &IndexContext,
    ) -> Result<()> {
        if !self.graph.is_list(property)? {
            return Err(ModelError::NotAList {
                property: self.graph.name(property)?.to_string(),
            });
        }
        let Some(index) = ctx.index_of(property) else {
            return Err(ModelError::MissingIndex {
                property: self.graph.name(property)?.to_string(),
            });
        };

        let access = self.graph.access(property)?;
        let model = self.model.as_mut().ok_or(ModelError::NoModel)?;
        access.add(model, value, ctx)?;

        let reduced = ctx.intersect(self.graph.index_path(property)?);
        self.change_log.log(property, reduced);

        let region = self.list_region(property, ctx)?;
        self.rebase_accessors(property, &region, index, 1)?;
        if let Some(parent) = self.graph.parent(property)? {
            self.notify_refresh(parent, Some(&region))?;
        }
        Ok(())
    }

    fn remove_property(
        &mut self,
        property: PropertyId,
        ctx: &IndexContext,
    ) -> Result<Option<Value>> {
        if !self.graph.is_list(property)? {
            return Err(ModelError::NotAList {
                property: self.graph.name(property)?.to_string(),
            });
        }
        let Some(index) = ctx.index_of(property) else {
            return Err(ModelError::MissingIndex {
                property: self.graph.name(property)?.to_string(),
            });
        };

        let access = self.graph.access(property)?;
        let model = self.model.as_mut().ok_or(ModelError::NoModel)?;
        let removed = access.remove(model, ctx)?;

        let reduced = ctx.intersect(self.graph.index_path(property)?);
        self.change_log.log(property, reduced);

        let region = self.list_region(property, ctx)?;
        self.rebase_accessors(property, &region, index, -1)?;
        if let Some(parent) = self.graph.parent(property)? {
            self.notify_refresh(parent, Some(&region))?;
        }
        Ok(removed)
    }

    fn exists(&self, property: PropertyId, ctx: &IndexContext) -> Result<bool> {
        let access = self.graph.access(property)?;
        let model = self.model.as_ref().ok_or(ModelError::NoModel)?;
        access.exists(model, ctx)
    }

    fn is_property_changed(&self, property: PropertyId, ctx: &IndexContext) -> Result<bool> {
        let probe = ctx.intersect(self.graph.index_path(property)?);
        let mut targets = vec![property];
        targets.extend(self.graph.descendants(property)?);
        Ok(targets.iter().any(|target| {
            self.change_log
                .contexts(*target)
                .iter()
                .any(|logged| logged.contains(&probe))
        }))
    }

    fn persist(&mut self, ctx: &IndexContext) -> Result<&M> {
        ModelContainer::persist(self, ctx)
    }
}
