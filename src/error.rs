//!
//! Defines error types for the capability registry and its store layer.

/// Errors raised by the key-value store layer underneath the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A metered durable-store access exceeded the context's gas limit.
    #[error("out of gas in location {descriptor}: limit {limit}, consumed {consumed}")]
    OutOfGas {
        descriptor: &'static str,
        limit: u64,
        consumed: u64,
    },
    /// A persisted value could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),
    /// Reading or writing a file (genesis, config) failed.
    #[error("io error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Codec(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// Errors returned by the registry and by scoped handles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    /// A blank name was supplied where a name is required.
    #[error("invalid capability name: {0}")]
    InvalidName(String),
    /// The module already owns a capability under this name.
    #[error("capability name already taken: module {module}, name {name}")]
    NameTaken { module: String, name: String },
    /// The module already owns this capability (under any name).
    #[error("given owner already claimed capability: module {module}, name {name}")]
    OwnerAlreadyClaimed { module: String, name: String },
    /// No capability object was passed to an operation requiring one.
    #[error("cannot {0} nil capability")]
    NilCapability(&'static str),
    /// The calling module holds no name for this capability.
    #[error("capability not owned by module {0}")]
    NotOwned(String),
    /// The module holds no capability under this name.
    #[error("no capability named {name} for module {module}")]
    NameNotFound { module: String, name: String },
    /// The object is not the live registry capability for its index.
    #[error("capability {0} is not a live capability of this registry")]
    UnknownCapability(u64),
    /// The reverse index points at a capability the in-process map does not hold.
    #[error("capability not found: {0}")]
    CapabilityNotFound(String),
    /// The reverse index resolved a capability with no durable owner set.
    #[error("owners not found for capability: {0}")]
    OwnersNotFound(String),
    /// A scoped handle was already handed out for this module.
    #[error("cannot create multiple scoped handles for the same module name: {0}")]
    AlreadyScoped(String),
    /// The registry is sealed; no more scoped handles may be created.
    #[error("cannot scope to module via a sealed capability registry")]
    Sealed,
    /// `seal` was called on an already sealed registry.
    #[error("capability registry is already sealed")]
    AlreadySealed,
    /// The global index has already been set.
    #[error("global capability index is already initialized")]
    AlreadyInitialized,
    /// The global index must be greater than zero.
    #[error("global capability index must be greater than zero")]
    InvalidIndex,
    /// A genesis document failed validation.
    #[error("invalid genesis state: {0}")]
    InvalidGenesis(String),
    /// Configuration could not be loaded or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CapabilityError {
    /// Returns true for errors that mean the host wired the application
    /// incorrectly or that the ephemeral and durable views have diverged.
    /// Such errors must abort startup (or the node) rather than fail a
    /// single transaction.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CapabilityError::AlreadyScoped(_)
                | CapabilityError::Sealed
                | CapabilityError::AlreadySealed
                | CapabilityError::AlreadyInitialized
                | CapabilityError::InvalidIndex
                | CapabilityError::CapabilityNotFound(_)
                | CapabilityError::OwnersNotFound(_)
        )
    }
}
