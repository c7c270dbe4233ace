//! Property registry and per-property access capabilities
//!
//! A [`PropertyGraph`] arena owns the tree of property nodes for one model
//! type. Registration hands out sequential [`PropertyId`] handles; parents
//! are registered before children, so handle order is also topological
//! order. The per-property read/write behavior is supplied by the host as a
//! boxed [`PropertyAccess`] capability.

pub mod json;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::IndexContext;
use crate::errors::{ModelError, Result};

// ===== PropertyId =====

/// Opaque handle for one registered property
///
/// Handles are issued sequentially per graph and are only meaningful for
/// the graph (and container) that issued them. Ancestors always carry
/// smaller handles than their descendants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PropertyId(u32);

impl PropertyId {
    pub(crate) const fn from_raw(raw: u32) -> Self {
        PropertyId(raw)
    }

    /// The raw arena index, for diagnostics
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ===== PropertyAccess =====

/// Host-supplied read/write capability for one property
///
/// Implementations resolve their property's address inside the model from
/// the given [`IndexContext`], which pins an element index for every list
/// property on the path.
///
/// `add` and `remove` only apply to list properties; the provided defaults
/// reject them so scalar capabilities stay two methods short.
pub trait PropertyAccess<M> {
    /// Read the value at the resolved address
    ///
    /// For a list property, a context pinning the property's own handle
    /// addresses one element; without that pin the list as a whole is read.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the address or any ancestor on the path is absent.
    fn get(&self, model: &M, ctx: &IndexContext) -> Result<Option<Value>>;

    /// Replace the value at the resolved address
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::AbsentTarget`] when an ancestor on the path is
    /// absent, so there is no place to write into.
    fn set(&self, model: &mut M, value: Value, ctx: &IndexContext) -> Result<()>;

    /// Insert an element into the addressed list
    fn add(&self, model: &mut M, value: Value, ctx: &IndexContext) -> Result<()> {
        let _ = (model, value, ctx);
        Err(ModelError::NotAList {
            property: "unknown".to_string(),
        })
    }

    /// Remove an element from the addressed list
    fn remove(&self, model: &mut M, ctx: &IndexContext) -> Result<Option<Value>> {
        let _ = (model, ctx);
        Err(ModelError::NotAList {
            property: "unknown".to_string(),
        })
    }

    /// Check whether the resolved address and all its ancestors are present
    fn exists(&self, model: &M, ctx: &IndexContext) -> Result<bool>;
}

// ===== PropertyGraph =====

struct PropertyNode<M> {
    name: String,
    parent: Option<PropertyId>,
    children: Vec<PropertyId>,
    list: bool,
    access: Box<dyn PropertyAccess<M>>,
    /// Ancestor chain root..=self
    path: Vec<PropertyId>,
    /// List properties on `path`, including self when self is a list
    index_path: Vec<PropertyId>,
}

/// Arena of property nodes for one model type
///
/// The graph is append-only: properties register once and live as long as
/// the graph. Construction creates the root, so every graph has exactly one
/// root property with handle order position 0.
pub struct PropertyGraph<M> {
    nodes: Vec<PropertyNode<M>>,
}

impl<M> PropertyGraph<M> {
    /// Create a graph with its root property
    ///
    /// # Arguments
    ///
    /// * `name` - display name of the root property
    /// * `access` - capability resolving the model root itself
    pub fn new(name: impl Into<String>, access: Box<dyn PropertyAccess<M>>) -> Self {
        let root = PropertyId::from_raw(0);
        PropertyGraph {
            nodes: vec![PropertyNode {
                name: name.into(),
                parent: None,
                children: Vec::new(),
                list: false,
                access,
                path: vec![root],
                index_path: Vec::new(),
            }],
        }
    }

    /// The root property's handle
    pub fn root(&self) -> PropertyId {
        PropertyId::from_raw(0)
    }

    /// Register a property under an existing parent
    ///
    /// # Arguments
    ///
    /// * `parent` - handle of the already-registered parent property
    /// * `name` - display name, unique per parent by convention (not enforced)
    /// * `list` - whether the property holds a list of elements
    /// * `access` - capability resolving this property inside the model
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownProperty`] when `parent` was not issued
    /// by this graph.
    pub fn register(
        &mut self,
        parent: PropertyId,
        name: impl Into<String>,
        list: bool,
        access: Box<dyn PropertyAccess<M>>,
    ) -> Result<PropertyId> {
        self.node(parent)?;
        let id = PropertyId::from_raw(self.nodes.len() as u32);

        let mut path = self.nodes[parent.0 as usize].path.clone();
        path.push(id);
        let mut index_path = self.nodes[parent.0 as usize].index_path.clone();
        if list {
            index_path.push(id);
        }

        self.nodes.push(PropertyNode {
            name: name.into(),
            parent: Some(parent),
            children: Vec::new(),
            list,
            access,
            path,
            index_path,
        });
        self.nodes[parent.0 as usize].children.push(id);
        Ok(id)
    }

    /// Number of registered properties
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A graph always carries at least its root
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Check whether a handle was issued by this graph
    pub fn contains(&self, property: PropertyId) -> bool {
        (property.0 as usize) < self.nodes.len()
    }

    /// Iterate all handles in registration order
    pub fn ids(&self) -> impl Iterator<Item = PropertyId> {
        (0..self.nodes.len() as u32).map(PropertyId::from_raw)
    }

    /// Display name of a property
    pub fn name(&self, property: PropertyId) -> Result<&str> {
        Ok(&self.node(property)?.name)
    }

    /// Parent handle, `None` for the root
    pub fn parent(&self, property: PropertyId) -> Result<Option<PropertyId>> {
        Ok(self.node(property)?.parent)
    }

    /// Direct children in registration order
    pub fn children(&self, property: PropertyId) -> Result<&[PropertyId]> {
        Ok(&self.node(property)?.children)
    }

    /// Transitive children in preorder, excluding the property itself
    pub fn descendants(&self, property: PropertyId) -> Result<Vec<PropertyId>> {
        self.node(property)?;
        let mut out = Vec::new();
        let mut stack: Vec<PropertyId> = self.nodes[property.0 as usize]
            .children
            .iter()
            .rev()
            .copied()
            .collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            for child in self.nodes[next.0 as usize].children.iter().rev() {
                stack.push(*child);
            }
        }
        Ok(out)
    }

    /// Ancestor chain from the root down to and including the property
    pub fn path(&self, property: PropertyId) -> Result<&[PropertyId]> {
        Ok(&self.node(property)?.path)
    }

    /// The list properties on the path, including the property itself when
    /// it is a list
    ///
    /// This is the set of index entries a fully pinned context must carry to
    /// address one concrete element of the property.
    pub fn index_path(&self, property: PropertyId) -> Result<&[PropertyId]> {
        Ok(&self.node(property)?.index_path)
    }

    /// Whether the property holds a list of elements
    pub fn is_list(&self, property: PropertyId) -> Result<bool> {
        Ok(self.node(property)?.list)
    }

    /// Whether the property is the graph root
    pub fn is_root(&self, property: PropertyId) -> Result<bool> {
        Ok(self.node(property)?.parent.is_none())
    }

    pub(crate) fn access(&self, property: PropertyId) -> Result<&dyn PropertyAccess<M>> {
        Ok(self.node(property)?.access.as_ref())
    }

    fn node(&self, property: PropertyId) -> Result<&PropertyNode<M>> {
        self.nodes
            .get(property.0 as usize)
            .ok_or(ModelError::UnknownProperty {
                property: property.0,
            })
    }
}

impl<M> fmt::Debug for PropertyGraph<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.nodes.iter().map(|n| n.name.as_str()).collect();
        f.debug_struct("PropertyGraph")
            .field("len", &self.nodes.len())
            .field("names", &names)
            .finish()
    }
}
