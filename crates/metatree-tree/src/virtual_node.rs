//! Placeholders for addresses without a backing node, and their
//! materialization.
//!
//! Navigating a [`VirtualNode`] only builds longer addresses. Assigning to
//! one creates every missing ancestor on the way down from the nearest
//! existing node, each typed by how its child is addressed: an element index
//! makes an ordered array, a field name makes a structure.

use std::fmt;

use metatree_store::PropertyStore;
use metatree_types::{qualify, Address, Addressed, Shape, Value};
use tracing::debug;

use crate::error::{TreeError, TreeResult};
use crate::namespace::Namespace;
use crate::navigate::{check_field_name, Key, NodeRef};
use crate::node::Node;
use crate::packet::Packet;

/// An address inside a namespace that has no node yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VirtualNode {
    namespace: String,
    prefix: Option<String>,
    address: Address,
}

impl VirtualNode {
    pub fn new(namespace: impl Into<String>, prefix: Option<String>, address: Address) -> Self {
        Self {
            namespace: namespace.into(),
            prefix,
            address,
        }
    }

    /// The virtual field `name` below this one.
    pub fn field(&self, name: &str) -> TreeResult<VirtualNode> {
        check_field_name(name)?;
        let name = match &self.prefix {
            Some(prefix) => qualify(name, prefix),
            None => name.to_string(),
        };
        Ok(self.with_address(self.address.field(&name)))
    }

    /// The virtual element `index` below this one.
    pub fn item(&self, index: usize) -> TreeResult<VirtualNode> {
        if self.address.is_root() {
            return Err(TreeError::InvalidKey {
                key: format!("[{index}]"),
                reason: "namespace children are named fields".into(),
            });
        }
        Ok(self.with_address(self.address.item(index)))
    }

    pub fn get(&self, key: impl Into<Key>) -> TreeResult<VirtualNode> {
        match key.into() {
            Key::Field(name) => self.field(&name),
            Key::Index(index) => self.item(index),
        }
    }

    pub fn lookup(&self, path: &str) -> TreeResult<VirtualNode> {
        Key::parse_path(path)?
            .into_iter()
            .try_fold(self.clone(), |node, key| node.get(key))
    }

    /// Create this node with `value`, along with any missing ancestor.
    ///
    /// If the node was created in the meantime, this behaves like
    /// [`Packet::set_at`].
    pub fn assign<S: PropertyStore>(
        &self,
        packet: &mut Packet<S>,
        value: impl Into<Value>,
    ) -> TreeResult<Address> {
        packet.set_at(&self.namespace, &self.address, value)
    }

    /// Nothing backs a virtual node, so deleting one changes nothing.
    pub fn delete(&self) -> TreeResult<bool> {
        Ok(false)
    }

    fn with_address(&self, address: Address) -> Self {
        Self {
            namespace: self.namespace.clone(),
            prefix: self.prefix.clone(),
            address,
        }
    }
}

impl Addressed for VirtualNode {
    fn namespace_uri(&self) -> &str {
        &self.namespace
    }

    fn address(&self) -> &Address {
        &self.address
    }
}

impl fmt::Display for VirtualNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>@{} [virtual]", self.namespace, self.address)
    }
}

impl<S: PropertyStore> Packet<S> {
    /// Create the node at `address`, which must not exist yet.
    ///
    /// Every check runs before the first store write, so a rejected value
    /// leaves both the store and the tree untouched.
    pub(crate) fn materialize(
        &mut self,
        uri: &str,
        address: &Address,
        value: Value,
    ) -> TreeResult<Address> {
        if address.is_root() {
            return Err(TreeError::Unsupported {
                namespace: uri.to_string(),
                address: address.clone(),
                operation: "assign a whole namespace".into(),
            });
        }
        check_value(&value)?;
        let chain = self.missing_chain(uri, address, &value)?;

        let prefix = if self.namespaces.contains_key(uri) {
            None
        } else {
            debug!(namespace = uri, "creating namespace tree on first write");
            self.store.prefix_for(uri)?
        };
        let namespace = self
            .namespaces
            .entry(uri.to_string())
            .or_insert_with(|| Namespace::new(uri, prefix));

        for at in (1..chain.len()).rev() {
            let shape = if chain[at - 1].is_array_element() {
                Shape::OrderedArray
            } else {
                Shape::Structure
            };
            declare(&mut self.store, namespace, &chain[at], shape)?;
        }
        create(&mut self.store, namespace, address, value)?;
        debug!(
            namespace = uri,
            address = %address,
            ancestors = chain.len() - 1,
            "materialized node"
        );
        Ok(address.clone())
    }

    /// `address` followed by each missing ancestor going up, after checking
    /// that the chain can hang below the nearest existing node.
    fn missing_chain(&self, uri: &str, address: &Address, value: &Value) -> TreeResult<Vec<Address>> {
        let namespace = self.namespaces.get(uri);
        let exists = |a: &Address| a.is_root() || namespace.is_some_and(|ns| ns.contains(a));

        let mut chain = vec![address.clone()];
        let mut cursor = address.parent().unwrap_or_else(Address::root);
        while !exists(&cursor) {
            chain.push(cursor.clone());
            cursor = cursor.parent().unwrap_or_else(Address::root);
        }

        // Containers created here start empty, so only index 0 fits below them.
        for element in &chain[..chain.len() - 1] {
            if let Some(index) = element.index().filter(|index| *index > 0) {
                return Err(out_of_range(element, index, 0));
            }
        }

        let top = &chain[chain.len() - 1];
        let Some((namespace, anchor)) =
            namespace.and_then(|ns| ns.node(&cursor).map(|anchor| (ns, anchor)))
        else {
            return Ok(chain);
        };
        if let Some(reason) = anchor.attach_conflict(top) {
            return Err(if anchor.shape() == Shape::Value {
                TreeError::Unsupported {
                    namespace: uri.to_string(),
                    address: cursor.clone(),
                    operation: format!("add {top} below a scalar"),
                }
            } else {
                TreeError::InvalidKey {
                    key: top.name().to_string(),
                    reason: reason.to_string(),
                }
            });
        }
        if let Some(index) = top.index().filter(|index| *index > anchor.len()) {
            return Err(out_of_range(top, index, anchor.len()));
        }
        if anchor.shape() == Shape::UnorderedSet && chain.len() == 1 {
            let duplicate = anchor
                .children()
                .into_iter()
                .filter_map(|member| namespace.node(member))
                .any(|member| {
                    matches!(NodeRef::new(self, namespace, member).value(), Ok(existing) if existing == *value)
                });
            if duplicate {
                return Err(TreeError::Unsupported {
                    namespace: uri.to_string(),
                    address: cursor.clone(),
                    operation: format!("add {value} to a set that already holds it"),
                });
            }
        }
        Ok(chain)
    }
}

fn out_of_range(element: &Address, index: usize, len: usize) -> TreeError {
    TreeError::InvalidKey {
        key: element.to_string(),
        reason: format!("index {index} is past the end of a container holding {len} elements"),
    }
}

/// Reject values that cannot be written, before anything is written.
pub(crate) fn check_value(value: &Value) -> TreeResult<()> {
    match value {
        Value::Scalar(_) => Ok(()),
        Value::Struct(fields) => fields.iter().try_for_each(|(name, field)| {
            check_field_name(name)?;
            check_value(field)
        }),
        Value::Array(items) | Value::Set(items) => items.iter().try_for_each(check_value),
    }
}

/// Create the subtree for `value` at `address`, writing through `store`.
fn create<S: PropertyStore>(
    store: &mut S,
    namespace: &mut Namespace,
    address: &Address,
    value: Value,
) -> TreeResult<()> {
    match value {
        Value::Scalar(scalar) => {
            store.set_scalar(namespace.uri(), address, &scalar)?;
            attach(namespace, address, Shape::Value)
        }
        Value::Struct(fields) => {
            declare(store, namespace, address, Shape::Structure)?;
            for (name, field) in fields {
                let child = address.field(&namespace.qualify(&name));
                create(store, namespace, &child, field)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            declare(store, namespace, address, Shape::OrderedArray)?;
            for (index, item) in items.into_iter().enumerate() {
                create(store, namespace, &address.item(index), item)?;
            }
            Ok(())
        }
        Value::Set(members) => {
            declare(store, namespace, address, Shape::UnorderedSet)?;
            let mut distinct: Vec<Value> = Vec::with_capacity(members.len());
            for member in members {
                if !distinct.contains(&member) {
                    distinct.push(member);
                }
            }
            for (index, member) in distinct.into_iter().enumerate() {
                create(store, namespace, &address.item(index), member)?;
            }
            Ok(())
        }
    }
}

/// Declare an empty container in the store and the tree.
fn declare<S: PropertyStore>(
    store: &mut S,
    namespace: &mut Namespace,
    address: &Address,
    shape: Shape,
) -> TreeResult<()> {
    store.set_container(namespace.uri(), address, shape)?;
    attach(namespace, address, shape)
}

fn attach(namespace: &mut Namespace, address: &Address, shape: Shape) -> TreeResult<()> {
    let node = Node::new(namespace.uri(), address.clone(), shape);
    if namespace.insert(node) {
        Ok(())
    } else {
        Err(TreeError::Detached {
            namespace: namespace.uri().to_string(),
            address: address.clone(),
        })
    }
}
