//! modelbind Core - Indexed property binding and persistence-dispatch engine
//!
//! This crate provides the foundational data structures and operations for
//! modelbind, including:
//! - Opaque property handles over a tree-shaped model, with per-property
//!   access capabilities and a ready-made JSON provider
//! - Immutable index contexts addressing elements inside nested lists
//! - A model container with change tracking, accessor views, refresh and
//!   index-shift notifications
//! - Minimal-persist-set dispatch to per-property persistors
//! - A dependency-ordered validator scheduler with typed error aggregation

pub mod container;
pub mod context;
pub mod errors;
pub mod handler;
pub mod logging_facility;
pub mod property;
pub mod validation;

// Re-export commonly used types
pub use container::{
    AccessorId, BindingId, ChangeLog, ModelAccessor, ModelContainer, Persistor, PersistorError,
    PropertyListener,
};
pub use context::IndexContext;
pub use errors::{ModelError, ModelErrorKind, Result};
pub use handler::ModelHandler;
pub use property::json::{JsonAccess, JsonGraphBuilder};
pub use property::{PropertyAccess, PropertyGraph, PropertyId};
pub use validation::{
    ErrorRegistry, Prerequisite, Severity, ValidationContext, ValidationError, Validator,
    ValidatorId, ValidityLevel,
};
