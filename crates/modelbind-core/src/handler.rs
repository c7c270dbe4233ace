use serde_json::Value;

use crate::context::IndexContext;
use crate::errors::Result;
use crate::property::PropertyId;

/// Shared surface of [`ModelContainer`] and [`ModelAccessor`]
///
/// The trait is object safe; collaborators that must not mutate the model
/// receive `&dyn ModelHandler<M>`, which exposes only the read methods.
///
/// [`ModelContainer`]: crate::container::ModelContainer
/// [`ModelAccessor`]: crate::container::ModelAccessor
pub trait ModelHandler<M> {
    /// Whether a model is currently installed
    fn has_model(&self) -> bool;

    /// Borrow the installed model
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NoModel`](crate::errors::ModelError::NoModel)
    /// when no model is installed.
    fn model(&self) -> Result<&M>;

    /// Read the property value at the addressed element
    fn get_property(&self, property: PropertyId, ctx: &IndexContext) -> Result<Option<Value>>;

    /// Write the property value at the addressed element and log the change
    fn set_property(&mut self, property: PropertyId, value: Value, ctx: &IndexContext)
        -> Result<()>;

    /// Insert an element into a list property at the index pinned in `ctx`
    fn add_property(&mut self, property: PropertyId, value: Value, ctx: &IndexContext)
        -> Result<()>;

    /// Remove the element of a list property at the index pinned in `ctx`
    fn remove_property(&mut self, property: PropertyId, ctx: &IndexContext)
        -> Result<Option<Value>>;

    /// Whether the addressed element and all its ancestors are present
    fn exists(&self, property: PropertyId, ctx: &IndexContext) -> Result<bool>;

    /// Whether the property or any of its descendants has a logged change
    /// covering the addressed element
    fn is_property_changed(&self, property: PropertyId, ctx: &IndexContext) -> Result<bool>;

    /// Persist the minimal set of changed sub-trees and clear their log
    /// entries, returning the model afterwards
    fn persist(&mut self, ctx: &IndexContext) -> Result<&M>;
}
