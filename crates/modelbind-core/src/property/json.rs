//! Ready-made property capabilities over a `serde_json::Value` model
//!
//! [`JsonGraphBuilder`] registers a property tree whose capabilities address
//! a JSON document: object fields for scalar properties, arrays for list
//! properties. List indices are drawn from the [`IndexContext`] at the list
//! property's handle, so one capability serves every element of a list.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::context::IndexContext;
use crate::errors::{ModelError, Result};
use crate::property::{PropertyAccess, PropertyGraph, PropertyId};

// ===== JsonAccess =====

#[derive(Debug, Clone)]
enum JsonStep {
    /// Descend into an object field
    Field(String),
    /// Descend into the element pinned for this list property
    Item(PropertyId),
}

/// Path-addressing capability for one property of a JSON model
///
/// For a list property the steps resolve to the array itself; when the
/// context pins the property's own handle, reads and writes address the
/// pinned element instead.
#[derive(Debug, Clone)]
pub struct JsonAccess {
    steps: Vec<JsonStep>,
    /// Set for list properties: the handle add/remove take their index from
    own: Option<PropertyId>,
    /// Dotted path for diagnostics
    descr: String,
}

impl JsonAccess {
    fn mismatch(&self, expected: &'static str) -> ModelError {
        ModelError::TypeMismatch {
            property: self.descr.clone(),
            expected,
        }
    }

    fn absent(&self) -> ModelError {
        ModelError::AbsentTarget {
            property: self.descr.clone(),
        }
    }

    fn missing_index(&self) -> ModelError {
        ModelError::MissingIndex {
            property: self.descr.clone(),
        }
    }

    /// Walk the steps read-only; absence anywhere short-circuits to `None`
    fn locate<'a>(&self, model: &'a Value, ctx: &IndexContext) -> Result<Option<&'a Value>> {
        let mut current = model;
        for step in &self.steps {
            if current.is_null() {
                return Ok(None);
            }
            match step {
                JsonStep::Field(key) => {
                    let object = current.as_object().ok_or_else(|| self.mismatch("object"))?;
                    match object.get(key) {
                        Some(next) => current = next,
                        None => return Ok(None),
                    }
                }
                JsonStep::Item(list) => {
                    let array = current.as_array().ok_or_else(|| self.mismatch("array"))?;
                    let Some(index) = ctx.index_of(*list) else {
                        return Ok(None);
                    };
                    match array.get(index as usize) {
                        Some(next) => current = next,
                        None => return Ok(None),
                    }
                }
            }
        }
        Ok(Some(current))
    }

    /// Walk the steps mutably; writes require every list index pinned
    fn locate_mut<'a>(
        &self,
        model: &'a mut Value,
        ctx: &IndexContext,
    ) -> Result<Option<&'a mut Value>> {
        let mut current = model;
        for step in &self.steps {
            if current.is_null() {
                return Ok(None);
            }
            match step {
                JsonStep::Field(key) => {
                    let object = match current.as_object_mut() {
                        Some(object) => object,
                        None => return Err(self.mismatch("object")),
                    };
                    match object.get_mut(key) {
                        Some(next) => current = next,
                        None => return Ok(None),
                    }
                }
                JsonStep::Item(list) => {
                    let index = ctx.index_of(*list).ok_or_else(|| self.missing_index())?;
                    let array = match current.as_array_mut() {
                        Some(array) => array,
                        None => return Err(self.mismatch("array")),
                    };
                    match array.get_mut(index as usize) {
                        Some(next) => current = next,
                        None => return Ok(None),
                    }
                }
            }
        }
        Ok(Some(current))
    }

    /// Resolve the array a list operation addresses
    fn locate_array<'a>(
        &self,
        model: &'a mut Value,
        ctx: &IndexContext,
    ) -> Result<&'a mut Vec<Value>> {
        let slot = self.locate_mut(model, ctx)?.ok_or_else(|| self.absent())?;
        if slot.is_null() {
            return Err(self.absent());
        }
        match slot.as_array_mut() {
            Some(array) => Ok(array),
            None => Err(self.mismatch("array")),
        }
    }
}

impl PropertyAccess<Value> for JsonAccess {
    fn get(&self, model: &Value, ctx: &IndexContext) -> Result<Option<Value>> {
        let Some(value) = self.locate(model, ctx)? else {
            return Ok(None);
        };
        let value = match self.own.and_then(|list| ctx.index_of(list)) {
            Some(index) => {
                let array = value.as_array().ok_or_else(|| self.mismatch("array"))?;
                match array.get(index as usize) {
                    Some(element) => element,
                    None => return Ok(None),
                }
            }
            None => value,
        };
        if value.is_null() {
            Ok(None)
        } else {
            Ok(Some(value.clone()))
        }
    }

    fn set(&self, model: &mut Value, value: Value, ctx: &IndexContext) -> Result<()> {
        // a pinned own index replaces one element in place
        if let Some(index) = self.own.and_then(|list| ctx.index_of(list)) {
            let array = self.locate_array(model, ctx)?;
            let slot = array
                .get_mut(index as usize)
                .ok_or_else(|| ModelError::IndexOutOfBounds {
                    property: self.descr.clone(),
                    index,
                })?;
            *slot = value;
            return Ok(());
        }

        match self.steps.split_last() {
            None => {
                *model = value;
                Ok(())
            }
            Some((last, prefix)) => {
                let stripped = JsonAccess {
                    steps: prefix.to_vec(),
                    own: None,
                    descr: self.descr.clone(),
                };
                let parent = stripped
                    .locate_mut(model, ctx)?
                    .ok_or_else(|| self.absent())?;
                if parent.is_null() {
                    return Err(self.absent());
                }
                match last {
                    JsonStep::Field(key) => {
                        let object = match parent.as_object_mut() {
                            Some(object) => object,
                            None => return Err(self.mismatch("object")),
                        };
                        object.insert(key.clone(), value);
                        Ok(())
                    }
                    // value steps always end on a field; items only occur mid-path
                    JsonStep::Item(_) => Err(self.mismatch("object")),
                }
            }
        }
    }

    fn add(&self, model: &mut Value, value: Value, ctx: &IndexContext) -> Result<()> {
        let Some(list) = self.own else {
            return Err(ModelError::NotAList {
                property: self.descr.clone(),
            });
        };
        let index = ctx.index_of(list).ok_or_else(|| self.missing_index())?;
        let array = self.locate_array(model, ctx)?;
        if index as usize > array.len() {
            return Err(ModelError::IndexOutOfBounds {
                property: self.descr.clone(),
                index,
            });
        }
        array.insert(index as usize, value);
        Ok(())
    }

    fn remove(&self, model: &mut Value, ctx: &IndexContext) -> Result<Option<Value>> {
        let Some(list) = self.own else {
            return Err(ModelError::NotAList {
                property: self.descr.clone(),
            });
        };
        let index = ctx.index_of(list).ok_or_else(|| self.missing_index())?;
        let array = self.locate_array(model, ctx)?;
        if index as usize >= array.len() {
            return Err(ModelError::IndexOutOfBounds {
                property: self.descr.clone(),
                index,
            });
        }
        Ok(Some(array.remove(index as usize)))
    }

    fn exists(&self, model: &Value, ctx: &IndexContext) -> Result<bool> {
        let Some(value) = self.locate(model, ctx)? else {
            return Ok(false);
        };
        match self.own.and_then(|list| ctx.index_of(list)) {
            Some(index) => {
                let array = value.as_array().ok_or_else(|| self.mismatch("array"))?;
                Ok(array
                    .get(index as usize)
                    .is_some_and(|element| !element.is_null()))
            }
            None => Ok(!value.is_null()),
        }
    }
}

// ===== JsonGraphBuilder =====

/// Registers a property tree over JSON models, pairing each property with
/// its [`JsonAccess`] path
///
/// Property names double as JSON object keys.
pub struct JsonGraphBuilder {
    graph: PropertyGraph<Value>,
    /// Steps children start from: the parent's value, descended into the
    /// pinned element when the parent is a list
    prefixes: BTreeMap<PropertyId, Vec<JsonStep>>,
    descrs: BTreeMap<PropertyId, String>,
}

impl JsonGraphBuilder {
    pub fn new(root_name: impl Into<String>) -> Self {
        let root_name = root_name.into();
        let graph = PropertyGraph::new(
            root_name.clone(),
            Box::new(JsonAccess {
                steps: Vec::new(),
                own: None,
                descr: root_name.clone(),
            }),
        );
        let root = graph.root();
        JsonGraphBuilder {
            graph,
            prefixes: BTreeMap::from([(root, Vec::new())]),
            descrs: BTreeMap::from([(root, root_name)]),
        }
    }

    /// The root property's handle
    pub fn root(&self) -> PropertyId {
        self.graph.root()
    }

    /// Register a scalar property stored under the object field `key`
    pub fn field(&mut self, parent: PropertyId, key: &str) -> Result<PropertyId> {
        self.register(parent, key, false)
    }

    /// Register a list property stored as an array under the field `key`
    pub fn list(&mut self, parent: PropertyId, key: &str) -> Result<PropertyId> {
        self.register(parent, key, true)
    }

    /// Finish building and hand over the graph
    pub fn finish(self) -> PropertyGraph<Value> {
        self.graph
    }

    fn register(&mut self, parent: PropertyId, key: &str, list: bool) -> Result<PropertyId> {
        let prefix = self
            .prefixes
            .get(&parent)
            .ok_or(ModelError::UnknownProperty {
                property: parent.raw(),
            })?;
        let mut steps = prefix.clone();
        steps.push(JsonStep::Field(key.to_string()));
        let descr = format!("{}.{}", self.descrs[&parent], key);

        // handles are sequential, so the next registration gets len()
        let own = PropertyId::from_raw(self.graph.len() as u32);
        let access = JsonAccess {
            steps: steps.clone(),
            own: list.then_some(own),
            descr: descr.clone(),
        };
        let id = self.graph.register(parent, key, list, Box::new(access))?;
        debug_assert_eq!(id, own);

        if list {
            steps.push(JsonStep::Item(id));
        }
        self.prefixes.insert(id, steps);
        self.descrs.insert(id, descr);
        Ok(id)
    }
}
