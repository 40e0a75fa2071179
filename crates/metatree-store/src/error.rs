use metatree_types::{Address, Shape, TypeError};

/// Errors from property store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No property exists at the address.
    #[error("property not found: {namespace}@{address}")]
    PropertyNotFound { namespace: String, address: Address },

    /// A scalar write targeted a container property.
    #[error("{namespace}@{address} is a container, not a scalar")]
    NotAScalar { namespace: String, address: Address },

    /// A container was declared over a property of another shape.
    #[error("{namespace}@{address} already exists as {existing}, cannot declare {requested}")]
    ShapeConflict {
        namespace: String,
        address: Address,
        existing: String,
        requested: Shape,
    },

    /// The namespace root cannot hold a value.
    #[error("cannot write the root of namespace {0}")]
    RootWrite(String),

    /// A malformed address or flag set.
    #[error("invalid property: {0}")]
    InvalidProperty(#[from] TypeError),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
