//! Hierarchical view over flat metadata packets.
//!
//! A [`Packet`] reads every `(namespace, address, value, flags)` tuple of a
//! [`PropertyStore`](metatree_store::PropertyStore) once and builds one tree
//! per namespace. Nodes are scalars, structures, ordered arrays, or unordered
//! sets; their content always comes from the store, so a node can tell when
//! the store changed under it ([`NodeRef::desynchronized`]).
//!
//! Navigation never fails on a missing child: it hands back a
//! [`VirtualNode`], and assigning to that node creates it together with all
//! of its missing ancestors.
//!
//! # Example
//!
//! ```
//! use metatree_store::{InMemoryPropertyStore, PropertyEntry};
//! use metatree_types::{Address, PropertyFlags, Value};
//! use metatree_tree::Packet;
//!
//! let ns = "http://example.com/ns/";
//! let store = InMemoryPropertyStore::from_entries([
//!     PropertyEntry::new(ns, Address::parse("arr").unwrap(), "", PropertyFlags::ARRAY | PropertyFlags::ORDERED),
//!     PropertyEntry::new(ns, Address::parse("arr[0]").unwrap(), "1", PropertyFlags::empty()),
//! ]);
//! let mut packet = Packet::load(store).unwrap();
//!
//! packet.set(ns, "arr[1]", 2).unwrap();
//! assert_eq!(
//!     packet.value(ns, "arr").unwrap(),
//!     Value::from(vec![Value::from(1), Value::from(2)])
//! );
//! ```

mod builder;
pub mod config;
pub mod error;
pub mod namespace;
pub mod navigate;
pub mod node;
pub mod packet;
mod render;
pub mod virtual_node;

pub use config::TreeConfig;
pub use error::{TreeError, TreeResult};
pub use namespace::Namespace;
pub use navigate::{Key, Lookup, NamespaceView, NodeRef};
pub use node::{Node, NodeKind};
pub use packet::Packet;
pub use virtual_node::VirtualNode;
