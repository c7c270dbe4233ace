use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::container::ModelContainer;
use crate::context::IndexContext;
use crate::errors::Result;
use crate::handler::ModelHandler;
use crate::property::PropertyId;

// ===== Handles =====

/// Handle for one registered accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccessorId(u32);

impl AccessorId {
    pub(crate) const fn from_raw(raw: u32) -> Self {
        AccessorId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AccessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// Handle for one (property, listener) binding of an accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingId(u32);

impl BindingId {
    pub(crate) const fn from_raw(raw: u32) -> Self {
        BindingId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

// ===== Listener =====

/// Receiver of refresh notifications for one bound property
///
/// Called synchronously while the mutating operation is still on the stack;
/// `value` is the freshly read value at the accessor's view address.
pub trait PropertyListener {
    fn refresh(&mut self, property: PropertyId, value: Option<&Value>);
}

impl<F> PropertyListener for F
where
    F: FnMut(PropertyId, Option<&Value>),
{
    fn refresh(&mut self, property: PropertyId, value: Option<&Value>) {
        self(property, value)
    }
}

// ===== Arena node =====

/// One accessor registration inside the container's arena
pub(crate) struct AccessorNode {
    pub(crate) parent: Option<AccessorId>,
    pub(crate) context: IndexContext,
    pub(crate) children: Vec<AccessorId>,
    pub(crate) bindings: BTreeMap<BindingId, (PropertyId, Box<dyn PropertyListener>)>,
}

// ===== View =====

/// Indexed view onto a container
///
/// Borrowed from [`ModelContainer::accessor`]. Every [`ModelHandler`] call
/// merges the caller's context with the accessor's own fixed context and
/// those of its ancestors, the fixed contexts winning on collision, and
/// forwards the merged context to the container.
pub struct ModelAccessor<'a, M> {
    container: &'a mut ModelContainer<M>,
    id: AccessorId,
}

impl<'a, M> ModelAccessor<'a, M> {
    pub(crate) fn new(container: &'a mut ModelContainer<M>, id: AccessorId) -> Self {
        ModelAccessor { container, id }
    }

    /// The accessor's handle
    pub fn id(&self) -> AccessorId {
        self.id
    }

    /// The accessor's own fixed context, after any index rebasing
    pub fn context(&self) -> Result<&IndexContext> {
        self.container.accessor_context(self.id)
    }

    /// The fixed contexts of the whole parent chain merged together
    pub fn absolute_context(&self) -> Result<IndexContext> {
        self.container
            .absolute_context_with(self.id, &IndexContext::EMPTY)
    }

    fn merged(&self, ctx: &IndexContext) -> Result<IndexContext> {
        self.container.absolute_context_with(self.id, ctx)
    }
}

impl<'a, M> ModelHandler<M> for ModelAccessor<'a, M> {
    fn has_model(&self) -> bool {
        self.container.has_model()
    }

    fn model(&self) -> Result<&M> {
        self.container.model()
    }

    fn get_property(&self, property: PropertyId, ctx: &IndexContext) -> Result<Option<Value>> {
        let merged = self.merged(ctx)?;
        self.container.get_property(property, &merged)
    }

    fn set_property(
        &mut self,
        property: PropertyId,
        value: Value,
        ctx: &IndexContext,
    ) -> Result<()> {
        let merged = self.merged(ctx)?;
        self.container.set_property(property, value, &merged)
    }

    fn add_property(
        &mut self,
        property: PropertyId,
        value: Value,
        ctx: &IndexContext,
    ) -> Result<()> {
        let merged = self.merged(ctx)?;
        self.container.add_property(property, value, &merged)
    }

    fn remove_property(
        &mut self,
        property: PropertyId,
        ctx: &IndexContext,
    ) -> Result<Option<Value>> {
        let merged = self.merged(ctx)?;
        self.container.remove_property(property, &merged)
    }

    fn exists(&self, property: PropertyId, ctx: &IndexContext) -> Result<bool> {
        let merged = self.merged(ctx)?;
        self.container.exists(property, &merged)
    }

    fn is_property_changed(&self, property: PropertyId, ctx: &IndexContext) -> Result<bool> {
        let merged = self.merged(ctx)?;
        self.container.is_property_changed(property, &merged)
    }

    fn persist(&mut self, ctx: &IndexContext) -> Result<&M> {
        let merged = self.merged(ctx)?;
        self.container.persist(&merged)
    }
}
