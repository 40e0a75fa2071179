//! Flat property storage for metatree.
//!
//! A metadata packet is natively a flat list of
//! `(namespace, address, value, flags)` tuples. This crate defines the
//! interface the tree layer consumes and a reference backend.
//!
//! # Storage Backends
//!
//! All backends implement the [`PropertyStore`] trait:
//!
//! - [`InMemoryPropertyStore`] -- `IndexMap`-based store for tests, the CLI,
//!   and embedding
//!
//! [`PacketDocument`] persists an in-memory store as JSON.
//!
//! # Design Rules
//!
//! 1. The store never interprets scalar text; decoding belongs to readers.
//! 2. Containers are declared explicitly and deleted with their subtree.
//! 3. All I/O errors are propagated, never silently ignored.

pub mod document;
pub mod error;
pub mod memory;
pub mod property;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use document::{NamespaceRecord, PacketDocument, PropertyRecord};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryPropertyStore;
pub use property::PropertyEntry;
pub use traits::PropertyStore;

/// URI of the annotation namespace applications register by default.
pub const ANNOTATION_NAMESPACE: &str = "http://aldebaran.com/xmp/1";

/// Suggested prefix for [`ANNOTATION_NAMESPACE`].
pub const ANNOTATION_PREFIX: &str = "aldebaran";
