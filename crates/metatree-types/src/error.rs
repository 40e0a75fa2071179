use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("unknown descriptor flag: {0}")]
    UnknownFlag(String),

    #[error("conflicting descriptor flags: {0}")]
    ConflictingFlags(String),
}
