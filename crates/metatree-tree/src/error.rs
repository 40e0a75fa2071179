//! Error types for tree operations.

use metatree_store::StoreError;
use metatree_types::Address;

/// Errors that can occur while building, navigating, or mutating a tree.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// A key of the wrong kind for the node it was applied to, or a path
    /// that cannot be split into keys.
    #[error("invalid key {key}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Strict lookup of a child that does not exist.
    #[error("{namespace}@{address} has no child {key}")]
    NotFound {
        namespace: String,
        address: Address,
        key: String,
    },

    /// The node variant does not support the requested mutation.
    #[error("unsupported operation on {namespace}@{address}: {operation}")]
    Unsupported {
        namespace: String,
        address: Address,
        operation: String,
    },

    /// The store enumerated a property the tree cannot represent.
    #[error("malformed property {namespace}@{address}: {reason}")]
    MalformedInput {
        namespace: String,
        address: Address,
        reason: String,
    },

    /// The node's parent is not part of the tree.
    #[error("{namespace}@{address} has no parent in the tree")]
    Detached { namespace: String, address: Address },

    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for tree results.
pub type TreeResult<T> = Result<T, TreeError>;
