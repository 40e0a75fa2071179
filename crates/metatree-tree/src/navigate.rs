//! Key-based navigation over a loaded packet.
//!
//! Every lookup answers either an existing node ([`NodeRef`]) or, when the
//! addressed node does not exist yet, a [`VirtualNode`] that can be assigned
//! to later. Lookups never touch the store.

use std::fmt;

use indexmap::IndexMap;
use metatree_store::{PropertyStore, StoreError};
use metatree_types::{Address, Addressed, Shape, Value};

use crate::error::{TreeError, TreeResult};
use crate::namespace::Namespace;
use crate::node::{Node, NodeKind};
use crate::packet::Packet;
use crate::render;
use crate::virtual_node::VirtualNode;

/// One navigation step: a field name or an element index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Field(String),
    Index(usize),
}

impl Key {
    /// Split a user path such as `a/b[0]/c` or `a.b[0].c` into keys.
    ///
    /// The empty path yields no keys. A path may start with a bare `[n]` to
    /// step into the element of an array it is resolved against.
    pub fn parse_path(path: &str) -> TreeResult<Vec<Key>> {
        let mut keys = Vec::new();
        if path.is_empty() {
            return Ok(keys);
        }
        for segment in path.split(['/', '.']) {
            let name_end = segment.find('[').unwrap_or(segment.len());
            let (name, mut rest) = segment.split_at(name_end);
            if name.is_empty() && !keys.is_empty() {
                return Err(invalid_path(path, "empty path segment"));
            }
            if !name.is_empty() {
                check_field_name(name)?;
                keys.push(Key::Field(name.to_string()));
            }
            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| invalid_path(path, "unterminated index"))?;
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| invalid_path(path, "index is not a non-negative integer"))?;
                keys.push(Key::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(invalid_path(path, "text after an index"));
                }
            }
            if keys.is_empty() {
                return Err(invalid_path(path, "empty path segment"));
            }
        }
        Ok(keys)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Field(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Field(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Field names are single path segments.
pub(crate) fn check_field_name(name: &str) -> TreeResult<()> {
    if name.is_empty() || name.contains(['/', '[', ']']) {
        return Err(TreeError::InvalidKey {
            key: name.to_string(),
            reason: "field names are single, non-empty path segments".into(),
        });
    }
    Ok(())
}

fn invalid_path(path: &str, reason: &str) -> TreeError {
    TreeError::InvalidKey {
        key: path.to_string(),
        reason: reason.to_string(),
    }
}

/// The existing child of `node` selected by `key`, if any.
fn child<'n>(namespace: &'n Namespace, node: &'n Node, key: &Key) -> TreeResult<Option<&'n Node>> {
    let address = match (node.kind(), key) {
        (NodeKind::Value, _) => {
            return Err(TreeError::InvalidKey {
                key: key.to_string(),
                reason: format!("{} is a scalar and has no children", node.address()),
            })
        }
        (NodeKind::Structure { fields }, Key::Field(name)) => {
            check_field_name(name)?;
            fields.get(&namespace.qualify(name))
        }
        (NodeKind::Structure { fields }, Key::Index(index)) => match fields.get_index(*index) {
            Some((_, address)) => Some(address),
            None => {
                return Err(TreeError::NotFound {
                    namespace: namespace.uri().to_string(),
                    address: node.address().clone(),
                    key: key.to_string(),
                })
            }
        },
        (NodeKind::Array { items: elements } | NodeKind::Set { members: elements }, Key::Index(index)) => {
            elements.iter().find(|e| e.index() == Some(*index))
        }
        (NodeKind::Array { .. } | NodeKind::Set { .. }, Key::Field(_)) => {
            return Err(TreeError::InvalidKey {
                key: key.to_string(),
                reason: format!("elements of {} are addressed by index", node.address()),
            })
        }
    };
    Ok(address.and_then(|address| namespace.node(address)))
}

/// Follow `keys` from `start`, switching to a virtual node at the first miss.
fn walk<'a, S: PropertyStore>(
    packet: &'a Packet<S>,
    namespace: &'a Namespace,
    start: &'a Node,
    keys: &[Key],
) -> TreeResult<Lookup<'a, S>> {
    let mut current = start;
    for (at, key) in keys.iter().enumerate() {
        match child(namespace, current, key)? {
            Some(next) => current = next,
            None => {
                let mut virtual_node = VirtualNode::new(
                    namespace.uri(),
                    namespace.prefix().map(str::to_string),
                    current.address().clone(),
                );
                for key in &keys[at..] {
                    virtual_node = virtual_node.get(key.clone())?;
                }
                return Ok(Lookup::Virtual(virtual_node));
            }
        }
    }
    Ok(Lookup::Node(NodeRef::new(packet, namespace, current)))
}

/// Result of a navigation step.
pub enum Lookup<'a, S> {
    Node(NodeRef<'a, S>),
    Virtual(VirtualNode),
}

impl<'a, S: PropertyStore> Lookup<'a, S> {
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual(_))
    }

    pub fn address(&self) -> &Address {
        match self {
            Self::Node(node) => node.address(),
            Self::Virtual(node) => node.address(),
        }
    }

    pub fn node(self) -> Option<NodeRef<'a, S>> {
        match self {
            Self::Node(node) => Some(node),
            Self::Virtual(_) => None,
        }
    }

    pub fn into_virtual(self) -> Option<VirtualNode> {
        match self {
            Self::Node(_) => None,
            Self::Virtual(node) => Some(node),
        }
    }

    /// Navigate one more step.
    pub fn get(&self, key: impl Into<Key>) -> TreeResult<Lookup<'a, S>> {
        match self {
            Self::Node(node) => node.get(key),
            Self::Virtual(node) => node.get(key).map(Lookup::Virtual),
        }
    }

    pub fn lookup(&self, path: &str) -> TreeResult<Lookup<'a, S>> {
        match self {
            Self::Node(node) => node.lookup(path),
            Self::Virtual(node) => node.lookup(path).map(Lookup::Virtual),
        }
    }
}

impl<S: PropertyStore> fmt::Display for Lookup<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => fmt::Display::fmt(node, f),
            Self::Virtual(node) => fmt::Display::fmt(node, f),
        }
    }
}

/// A node of a loaded packet, borrowed together with its namespace and store.
pub struct NodeRef<'a, S> {
    packet: &'a Packet<S>,
    namespace: &'a Namespace,
    node: &'a Node,
}

impl<S> Clone for NodeRef<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for NodeRef<'_, S> {}

impl<'a, S: PropertyStore> NodeRef<'a, S> {
    pub(crate) fn new(packet: &'a Packet<S>, namespace: &'a Namespace, node: &'a Node) -> Self {
        Self {
            packet,
            namespace,
            node,
        }
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn namespace(&self) -> &'a Namespace {
        self.namespace
    }

    pub fn shape(&self) -> Shape {
        self.node.shape()
    }

    pub fn is_container(&self) -> bool {
        self.node.is_container()
    }

    pub fn is_root(&self) -> bool {
        self.node.address().is_root()
    }

    /// Read the current content from the store.
    ///
    /// Containers assemble a fresh composite from their children on every
    /// call. Structure fields in the namespace's own prefix are keyed by
    /// their local name.
    pub fn value(&self) -> TreeResult<Value> {
        let uri = self.namespace.uri();
        let address = self.node.address();
        match self.node.kind() {
            NodeKind::Value => self
                .packet
                .store()
                .get_scalar(uri, address)?
                .map(Value::Scalar)
                .ok_or_else(|| {
                    StoreError::PropertyNotFound {
                        namespace: uri.to_string(),
                        address: address.clone(),
                    }
                    .into()
                }),
            NodeKind::Structure { .. } => {
                let mut fields = IndexMap::new();
                for child in self.children() {
                    let name = self.namespace.local_name(child.name()).to_string();
                    fields.insert(name, child.value()?);
                }
                Ok(Value::Struct(fields))
            }
            NodeKind::Array { .. } => Ok(Value::Array(self.child_values()?)),
            NodeKind::Set { .. } => Ok(Value::set_of(self.child_values()?)),
        }
    }

    fn child_values(&self) -> TreeResult<Vec<Value>> {
        self.children().iter().map(NodeRef::value).collect()
    }

    /// Direct children, in field order or index order.
    pub fn children(&self) -> Vec<NodeRef<'a, S>> {
        self.node
            .children()
            .into_iter()
            .filter_map(|address| self.namespace.node(address))
            .map(|node| Self::new(self.packet, self.namespace, node))
            .collect()
    }

    /// The containing node; the namespace root for top-level nodes.
    pub fn parent(&self) -> Option<NodeRef<'a, S>> {
        if self.is_root() {
            return None;
        }
        let parent = self.node.address().parent().unwrap_or_else(Address::root);
        self.namespace
            .node(&parent)
            .map(|node| Self::new(self.packet, self.namespace, node))
    }

    /// Whether this subtree disagrees with the store.
    ///
    /// A node is desynchronized when the store lacks its address, when any
    /// child is desynchronized, or, for arrays and sets, when the store
    /// counts a different number of elements.
    pub fn desynchronized(&self) -> TreeResult<bool> {
        let store = self.packet.store();
        let uri = self.namespace.uri();
        let address = self.node.address();
        if !address.is_root() && !store.exists(uri, address)? {
            return Ok(true);
        }
        for child in self.children() {
            if child.desynchronized()? {
                return Ok(true);
            }
        }
        if self.shape().is_indexed() {
            return Ok(store.count(uri, address)? != self.node.len());
        }
        Ok(false)
    }

    /// Navigate one step. Missing children come back as virtual nodes.
    pub fn get(&self, key: impl Into<Key>) -> TreeResult<Lookup<'a, S>> {
        walk(self.packet, self.namespace, self.node, &[key.into()])
    }

    /// Navigate a relative path such as `b[0]/c`.
    pub fn lookup(&self, path: &str) -> TreeResult<Lookup<'a, S>> {
        walk(self.packet, self.namespace, self.node, &Key::parse_path(path)?)
    }

    /// Whether this structure has the field `name`.
    pub fn has(&self, name: &str) -> bool {
        match self.node.kind() {
            NodeKind::Structure { fields } => fields.contains_key(&self.namespace.qualify(name)),
            _ => false,
        }
    }

    /// Whether `path` resolves to an existing node. Missing levels and
    /// invalid keys answer `false`.
    pub fn contains(&self, path: &str) -> bool {
        matches!(self.lookup(path), Ok(Lookup::Node(_)))
    }

    /// Qualified field names of a structure, in order.
    pub fn fields(&self) -> Vec<&'a str> {
        match self.node.kind() {
            NodeKind::Structure { fields } => fields.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_empty()
    }
}

impl<S> Addressed for NodeRef<'_, S> {
    fn namespace_uri(&self) -> &str {
        self.node.namespace_uri()
    }

    fn address(&self) -> &Address {
        self.node.address()
    }
}

impl<S: PropertyStore> fmt::Display for NodeRef<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render::node(
            self.packet.store(),
            self.namespace,
            self.node,
            self.packet.config(),
        ))
    }
}

/// A namespace of a packet, or an empty placeholder for an unknown URI.
pub struct NamespaceView<'a, S> {
    packet: &'a Packet<S>,
    uri: String,
    namespace: Option<&'a Namespace>,
}

impl<'a, S: PropertyStore> NamespaceView<'a, S> {
    pub(crate) fn new(packet: &'a Packet<S>, uri: &str) -> Self {
        Self {
            packet,
            uri: uri.to_string(),
            namespace: packet.namespaces.get(uri),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn prefix(&self) -> Option<&'a str> {
        self.namespace.and_then(Namespace::prefix)
    }

    /// `true` when the packet has no such namespace.
    pub fn is_placeholder(&self) -> bool {
        self.namespace.is_none()
    }

    /// The root node, absent for a placeholder.
    pub fn root(&self) -> Option<NodeRef<'a, S>> {
        self.namespace
            .map(|namespace| NodeRef::new(self.packet, namespace, namespace.root()))
    }

    pub fn children(&self) -> Vec<NodeRef<'a, S>> {
        self.root().map(|root| root.children()).unwrap_or_default()
    }

    /// Number of top-level nodes.
    pub fn len(&self) -> usize {
        self.root().map_or(0, |root| root.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All top-level values as one structure.
    pub fn value(&self) -> TreeResult<Value> {
        match self.root() {
            Some(root) => root.value(),
            None => Ok(Value::Struct(IndexMap::new())),
        }
    }

    pub fn desynchronized(&self) -> TreeResult<bool> {
        match self.root() {
            Some(root) => root.desynchronized(),
            None => Ok(false),
        }
    }

    pub fn get(&self, key: impl Into<Key>) -> TreeResult<Lookup<'a, S>> {
        match self.root() {
            Some(root) => root.get(key),
            None => self.placeholder_root()?.get(key).map(Lookup::Virtual),
        }
    }

    pub fn lookup(&self, path: &str) -> TreeResult<Lookup<'a, S>> {
        match self.root() {
            Some(root) => root.lookup(path),
            None => self.placeholder_root()?.lookup(path).map(Lookup::Virtual),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.root().is_some_and(|root| root.has(name))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.root().is_some_and(|root| root.contains(path))
    }

    /// Qualify `name` with the namespace prefix, if one is known.
    pub fn qualify(&self, name: &str) -> String {
        match self.namespace {
            Some(namespace) => namespace.qualify(name),
            None => name.to_string(),
        }
    }

    fn placeholder_root(&self) -> TreeResult<VirtualNode> {
        let prefix = self.packet.store().prefix_for(&self.uri)?;
        Ok(VirtualNode::new(self.uri.clone(), prefix, Address::root()))
    }
}

impl<S: PropertyStore> fmt::Display for NamespaceView<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace {
            Some(namespace) => f.write_str(&render::namespace(
                self.packet.store(),
                namespace,
                self.packet.config(),
            )),
            None => f.write_str(&self.uri),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_paths() {
        assert!(Key::parse_path("").unwrap().is_empty());
        assert_eq!(
            Key::parse_path("a/b[0][2]/c").unwrap(),
            vec![
                Key::from("a"),
                Key::from("b"),
                Key::Index(0),
                Key::Index(2),
                Key::from("c")
            ]
        );
        assert_eq!(
            Key::parse_path("ex:a.b").unwrap(),
            vec![Key::from("ex:a"), Key::from("b")]
        );
        assert_eq!(
            Key::parse_path("[3]/x").unwrap(),
            vec![Key::Index(3), Key::from("x")]
        );
    }

    #[test]
    fn parse_rejects_malformed_paths() {
        for path in ["a//b", "a/", "a[x]", "a[1", "a[1]b", "a/[0]", "a[-1]"] {
            assert!(
                matches!(Key::parse_path(path), Err(TreeError::InvalidKey { .. })),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn key_display() {
        assert_eq!(Key::from("a").to_string(), "a");
        assert_eq!(Key::from(4usize).to_string(), "[4]");
    }

    #[test]
    fn field_names_are_single_segments() {
        assert!(check_field_name("ex:title").is_ok());
        assert!(check_field_name("").is_err());
        assert!(check_field_name("a/b").is_err());
        assert!(check_field_name("a[0]").is_err());
    }
}
