use thiserror::Error;

/// Result type alias using ModelError
pub type Result<T> = std::result::Result<T, ModelError>;

/// Canonical error kind taxonomy
///
/// Stable, structured classification of all errors in the engine. Each kind
/// maps to a stable error code that can be used for programmatic handling,
/// testing, and log assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelErrorKind {
    /// A handle or argument the engine cannot interpret
    InvalidArgument,
    /// An operation issued against a container/context in the wrong state
    IllegalState,
    /// A required registration is absent
    NotFound,
    /// The validator prerequisite graph cannot be ordered
    Cycle,
    /// A persistor implementation failed
    Persistence,
}

impl ModelErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ModelErrorKind::InvalidArgument => "ERR_INVALID_ARGUMENT",
            ModelErrorKind::IllegalState => "ERR_ILLEGAL_STATE",
            ModelErrorKind::NotFound => "ERR_NOT_FOUND",
            ModelErrorKind::Cycle => "ERR_CYCLE",
            ModelErrorKind::Persistence => "ERR_PERSISTENCE",
        }
    }
}

/// Comprehensive error taxonomy for modelbind operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    // ===== Container State Errors =====
    /// Operation requires a model but the container holds none
    #[error("Container has no model")]
    NoModel,

    /// Property handle does not belong to this container's graph
    #[error("Unknown property handle: {property}")]
    UnknownProperty { property: u32 },

    /// Accessor handle is stale or was never registered
    #[error("Unknown accessor handle: {accessor}")]
    UnknownAccessor { accessor: u32 },

    /// Binding handle is stale or belongs to another accessor
    #[error("Unknown binding handle: {binding}")]
    UnknownBinding { binding: u32 },

    /// Validator handle is stale or was never registered
    #[error("Unknown validator handle: {validator}")]
    UnknownValidator { validator: u32 },

    // ===== Addressing Errors =====
    /// List operation issued against a non-list property
    #[error("Property is not a list: {property}")]
    NotAList { property: String },

    /// List operation without the list's index in the context
    #[error("Context carries no index for list property: {property}")]
    MissingIndex { property: String },

    /// Resolved index points outside the addressed list
    #[error("Index {index} out of bounds for list property: {property}")]
    IndexOutOfBounds { property: String, index: u32 },

    /// Write through an absent ancestor on the property's path
    #[error("Cannot write {property}: an ancestor on its path is absent")]
    AbsentTarget { property: String },

    /// Addressed value has a different shape than the property declares
    #[error("Type mismatch at {property}: expected {expected}")]
    TypeMismatch {
        property: String,
        expected: &'static str,
    },

    // ===== Persistence Errors =====
    /// A persistor is already registered for this property
    #[error("Persistor already registered for property: {property}")]
    PersistorAlreadyRegistered { property: String },

    /// Ancestor walk from a changed property reached the root without a persistor
    #[error("No persistor registered on the ancestor chain of: {property}")]
    NoPersistorRegistered { property: String },

    /// A persistor implementation failed; earlier persists are not rolled back
    #[error("Persistor failed for {property} at {context}: {message}")]
    PersistorFailed {
        property: String,
        context: String,
        message: String,
    },

    // ===== Validation Scheduling Errors =====
    /// Self-prerequisite or a prerequisite cycle in the validator graph
    #[error("Validator prerequisite loop involving: {validator}")]
    LoopDetected { validator: String },

    /// Prerequisite validator is bound to a different property scope
    #[error("Prerequisite {prerequisite} is bound to a different scope than {dependent}")]
    IllegalStructuring {
        dependent: String,
        prerequisite: String,
    },

    /// Validator registration after the execution order was built
    #[error("Validation context is already scheduled")]
    AlreadyScheduled,
}

impl ModelError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ModelErrorKind {
        match self {
            ModelError::NoModel => ModelErrorKind::IllegalState,
            ModelError::UnknownProperty { .. } => ModelErrorKind::InvalidArgument,
            ModelError::UnknownAccessor { .. } => ModelErrorKind::InvalidArgument,
            ModelError::UnknownBinding { .. } => ModelErrorKind::InvalidArgument,
            ModelError::UnknownValidator { .. } => ModelErrorKind::InvalidArgument,
            ModelError::NotAList { .. } => ModelErrorKind::InvalidArgument,
            ModelError::MissingIndex { .. } => ModelErrorKind::InvalidArgument,
            ModelError::IndexOutOfBounds { .. } => ModelErrorKind::InvalidArgument,
            ModelError::AbsentTarget { .. } => ModelErrorKind::IllegalState,
            ModelError::TypeMismatch { .. } => ModelErrorKind::InvalidArgument,
            ModelError::PersistorAlreadyRegistered { .. } => ModelErrorKind::IllegalState,
            ModelError::NoPersistorRegistered { .. } => ModelErrorKind::NotFound,
            ModelError::PersistorFailed { .. } => ModelErrorKind::Persistence,
            ModelError::LoopDetected { .. } => ModelErrorKind::Cycle,
            ModelError::IllegalStructuring { .. } => ModelErrorKind::InvalidArgument,
            ModelError::AlreadyScheduled => ModelErrorKind::IllegalState,
        }
    }

    /// Get the stable error code for this error
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}
