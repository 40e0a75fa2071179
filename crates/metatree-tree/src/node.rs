//! Tree nodes.
//!
//! A node is identified by its namespace and address; the store holds its
//! content. Containers keep the addresses of their children, which are also
//! the keys of the owning [`Namespace`](crate::Namespace) arena.

use std::fmt;

use indexmap::IndexMap;
use metatree_types::{Address, Addressed, Shape};

/// The closed set of node variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A scalar leaf.
    Value,
    /// Named fields, keyed by (qualified) field name.
    Structure { fields: IndexMap<String, Address> },
    /// Elements kept in index order.
    Array { items: Vec<Address> },
    /// Members without meaningful order; kept in index order for stable output.
    Set { members: Vec<Address> },
}

impl NodeKind {
    /// An empty node of the given shape.
    pub fn empty(shape: Shape) -> Self {
        match shape {
            Shape::Value => Self::Value,
            Shape::Structure => Self::Structure {
                fields: IndexMap::new(),
            },
            Shape::OrderedArray => Self::Array { items: Vec::new() },
            Shape::UnorderedSet => Self::Set {
                members: Vec::new(),
            },
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Self::Value => Shape::Value,
            Self::Structure { .. } => Shape::Structure,
            Self::Array { .. } => Shape::OrderedArray,
            Self::Set { .. } => Shape::UnorderedSet,
        }
    }
}

/// A node of a namespace tree.
#[derive(Clone, Debug)]
pub struct Node {
    namespace: String,
    address: Address,
    kind: NodeKind,
}

impl Node {
    pub fn new(namespace: impl Into<String>, address: Address, shape: Shape) -> Self {
        Self {
            namespace: namespace.into(),
            address,
            kind: NodeKind::empty(shape),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn shape(&self) -> Shape {
        self.kind.shape()
    }

    pub fn is_container(&self) -> bool {
        self.shape().is_container()
    }

    /// Child addresses in display order.
    pub fn children(&self) -> Vec<&Address> {
        match &self.kind {
            NodeKind::Value => Vec::new(),
            NodeKind::Structure { fields } => fields.values().collect(),
            NodeKind::Array { items } => items.iter().collect(),
            NodeKind::Set { members } => members.iter().collect(),
        }
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        match &self.kind {
            NodeKind::Value => 0,
            NodeKind::Structure { fields } => fields.len(),
            NodeKind::Array { items } => items.len(),
            NodeKind::Set { members } => members.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Why `child` cannot hang below this node, if it cannot.
    pub(crate) fn attach_conflict(&self, child: &Address) -> Option<&'static str> {
        match self.shape() {
            Shape::Value => Some("a scalar has no children"),
            Shape::Structure if child.is_array_element() => {
                Some("structure children are named fields")
            }
            Shape::OrderedArray | Shape::UnorderedSet if !child.is_array_element() => {
                Some("array and set children are indexed elements")
            }
            _ => None,
        }
    }

    /// Record `child` as a direct child. Elements stay sorted by index.
    pub(crate) fn attach(&mut self, child: Address) {
        match &mut self.kind {
            NodeKind::Value => {}
            NodeKind::Structure { fields } => {
                fields.insert(child.name().to_string(), child);
            }
            NodeKind::Array { items: elements } | NodeKind::Set { members: elements } => {
                if elements.contains(&child) {
                    return;
                }
                let at = elements.partition_point(|e| e.index() < child.index());
                elements.insert(at, child);
            }
        }
    }

    /// Move this node and its child links from below `from` to below `to`.
    pub(crate) fn rebase(&mut self, from: &Address, to: &Address) {
        if let Some(address) = self.address.rebase(from, to) {
            self.address = address;
        }
        let links: Vec<&mut Address> = match &mut self.kind {
            NodeKind::Value => Vec::new(),
            NodeKind::Structure { fields } => fields.values_mut().collect(),
            NodeKind::Array { items: elements } | NodeKind::Set { members: elements } => {
                elements.iter_mut().collect()
            }
        };
        for link in links {
            if let Some(moved) = link.rebase(from, to) {
                *link = moved;
            }
        }
    }

    /// Forget `child`. Returns `true` if it was attached.
    pub(crate) fn detach(&mut self, child: &Address) -> bool {
        match &mut self.kind {
            NodeKind::Value => false,
            NodeKind::Structure { fields } => fields.shift_remove(child.name()).is_some(),
            NodeKind::Array { items: elements } | NodeKind::Set { members: elements } => {
                let before = elements.len();
                elements.retain(|e| e != child);
                elements.len() != before
            }
        }
    }
}

impl Addressed for Node {
    fn namespace_uri(&self) -> &str {
        &self.namespace
    }

    fn address(&self) -> &Address {
        &self.address
    }
}

/// Nodes are identified by namespace and address alone.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.address == other.address
    }
}

impl Eq for Node {}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>@{}", self.namespace, self.address)
    }
}
