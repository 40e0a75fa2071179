//! Foundation types for metatree.
//!
//! metatree presents a flat, path-addressed metadata packet as mutable trees,
//! one per namespace. This crate holds the pieces every other crate shares.
//!
//! # Key Types
//!
//! - [`Address`]: Structural path within a namespace, with the parent/child
//!   relations derived purely from the path string
//! - [`Addressed`]: Predicates for anything positioned in a namespace
//! - [`PropertyFlags`]: Descriptor flags of an enumerated property
//! - [`Shape`]: Node variant selected by flags or by a written value
//! - [`Scalar`] / [`Value`]: Decoded leaf values and composites

pub mod address;
pub mod error;
pub mod flags;
pub mod predicates;
pub mod value;

pub use address::{is_qualified, qualify, Address, FIELD_SEPARATOR, PREFIX_SEPARATOR};
pub use error::TypeError;
pub use flags::{PropertyFlags, Shape};
pub use predicates::{ancestors_in, children_in, descendants_in, parents_in, Addressed};
pub use value::{Scalar, Value};
