use std::collections::HashMap;

use metatree_types::{qualify, Address, Addressed, Shape};

use crate::node::Node;

/// One namespace of a packet: a root structure and every node below it.
///
/// Nodes live in an arena keyed by address; the root sits at
/// [`Address::root`] and is always present.
#[derive(Clone, Debug)]
pub struct Namespace {
    uri: String,
    prefix: Option<String>,
    nodes: HashMap<Address, Node>,
}

impl Namespace {
    /// An empty namespace holding only its root.
    pub fn new(uri: impl Into<String>, prefix: Option<String>) -> Self {
        let uri = uri.into();
        let mut nodes = HashMap::new();
        nodes.insert(
            Address::root(),
            Node::new(uri.clone(), Address::root(), Shape::Structure),
        );
        Self { uri, prefix, nodes }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Qualify a bare field name with this namespace's prefix.
    ///
    /// Names are returned unchanged when there is no prefix or when they are
    /// already qualified.
    pub fn qualify(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => qualify(name, prefix),
            None => name.to_string(),
        }
    }

    /// Strip this namespace's own prefix from a field name.
    pub fn local_name<'n>(&self, name: &'n str) -> &'n str {
        self.prefix
            .as_deref()
            .and_then(|prefix| name.strip_prefix(prefix))
            .and_then(|rest| rest.strip_prefix(metatree_types::PREFIX_SEPARATOR))
            .unwrap_or(name)
    }

    pub fn root(&self) -> &Node {
        // The root is inserted on construction and never removed.
        &self.nodes[&Address::root()]
    }

    pub fn node(&self, address: &Address) -> Option<&Node> {
        self.nodes.get(address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.nodes.contains_key(address)
    }

    /// Number of nodes below the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every node of the namespace except the root, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| !n.address().is_root())
    }

    /// Add `node` and attach it to its parent, which must already exist.
    ///
    /// Returns `false` and leaves the namespace unchanged when the parent is
    /// missing.
    pub(crate) fn insert(&mut self, node: Node) -> bool {
        let parent = node.address().parent().unwrap_or_else(Address::root);
        let Some(parent) = self.nodes.get_mut(&parent) else {
            return false;
        };
        parent.attach(node.address().clone());
        self.nodes.insert(node.address().clone(), node);
        true
    }

    /// Remove the node at `address` and its whole subtree, detaching it from
    /// its parent. Returns the number of nodes removed.
    pub(crate) fn remove(&mut self, address: &Address) -> usize {
        if address.is_root() || !self.nodes.contains_key(address) {
            return 0;
        }
        let parent = address.parent().unwrap_or_else(Address::root);
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.detach(address);
        }
        let before = self.nodes.len();
        self.nodes
            .retain(|candidate, _| !(candidate == address || candidate.is_descendant_of(address)));
        before - self.nodes.len()
    }

    /// Move the subtree at `from` to the free address `to`, relinking it
    /// under the parent of `to`. Returns `false` and changes nothing when
    /// `from` is missing, `to` is taken, or the new parent does not exist.
    pub(crate) fn rebase(&mut self, from: &Address, to: &Address) -> bool {
        let new_parent = to.parent().unwrap_or_else(Address::root);
        if from.is_root()
            || to.is_root()
            || !self.nodes.contains_key(from)
            || self.nodes.contains_key(to)
            || !self.nodes.contains_key(&new_parent)
        {
            return false;
        }
        let old_parent = from.parent().unwrap_or_else(Address::root);
        if let Some(parent) = self.nodes.get_mut(&old_parent) {
            parent.detach(from);
        }
        let moved: Vec<Address> = self
            .nodes
            .keys()
            .filter(|candidate| *candidate == from || candidate.is_descendant_of(from))
            .cloned()
            .collect();
        for address in moved {
            if let Some(mut node) = self.nodes.remove(&address) {
                node.rebase(from, to);
                self.nodes.insert(node.address().clone(), node);
            }
        }
        if let Some(parent) = self.nodes.get_mut(&new_parent) {
            parent.attach(to.clone());
        }
        true
    }
}

impl Addressed for Namespace {
    fn namespace_uri(&self) -> &str {
        &self.uri
    }

    /// The namespace stands for its root node.
    fn address(&self) -> &Address {
        self.root().address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://example.com/ns/";

    fn addr(path: &str) -> Address {
        Address::parse(path).unwrap()
    }

    #[test]
    fn new_namespace_has_only_root() {
        let ns = Namespace::new(NS, None);
        assert!(ns.is_empty());
        assert!(ns.contains(&Address::root()));
        assert_eq!(ns.root().shape(), Shape::Structure);
        assert!(ns.address().is_root());
    }

    #[test]
    fn qualify_uses_prefix() {
        let plain = Namespace::new(NS, None);
        let prefixed = Namespace::new(NS, Some("ex".into()));
        assert_eq!(plain.qualify("title"), "title");
        assert_eq!(prefixed.qualify("title"), "ex:title");
        assert_eq!(prefixed.qualify("dc:title"), "dc:title");
        assert_eq!(prefixed.local_name("ex:title"), "title");
        assert_eq!(prefixed.local_name("dc:title"), "dc:title");
        assert_eq!(plain.local_name("ex:title"), "ex:title");
    }

    #[test]
    fn insert_requires_parent() {
        let mut ns = Namespace::new(NS, None);
        assert!(!ns.insert(Node::new(NS, addr("a/b"), Shape::Value)));
        assert!(ns.insert(Node::new(NS, addr("a"), Shape::Structure)));
        assert!(ns.insert(Node::new(NS, addr("a/b"), Shape::Value)));
        assert_eq!(ns.len(), 2);
        assert_eq!(ns.root().children(), vec![&addr("a")]);
    }

    #[test]
    fn rebase_moves_subtree_and_relinks() {
        let mut ns = Namespace::new(NS, None);
        ns.insert(Node::new(NS, addr("a"), Shape::OrderedArray));
        ns.insert(Node::new(NS, addr("a[0]"), Shape::Value));
        ns.insert(Node::new(NS, addr("a[2]"), Shape::Structure));
        ns.insert(Node::new(NS, addr("a[2]/x"), Shape::Value));

        assert!(!ns.rebase(&addr("a[2]"), &addr("a[0]")));
        assert!(ns.rebase(&addr("a[2]"), &addr("a[1]")));
        assert!(!ns.contains(&addr("a[2]/x")));
        assert_eq!(
            ns.node(&addr("a")).unwrap().children(),
            vec![&addr("a[0]"), &addr("a[1]")]
        );
        assert_eq!(ns.node(&addr("a[1]")).unwrap().children(), vec![&addr("a[1]/x")]);
        assert_eq!(ns.len(), 4);
    }

    #[test]
    fn remove_drops_subtree() {
        let mut ns = Namespace::new(NS, None);
        ns.insert(Node::new(NS, addr("a"), Shape::OrderedArray));
        ns.insert(Node::new(NS, addr("a[0]"), Shape::Structure));
        ns.insert(Node::new(NS, addr("a[0]/x"), Shape::Value));
        ns.insert(Node::new(NS, addr("ab"), Shape::Value));

        assert_eq!(ns.remove(&addr("a[0]")), 2);
        assert!(ns.node(&addr("a")).unwrap().is_empty());
        assert!(ns.contains(&addr("ab")));
        assert_eq!(ns.remove(&Address::root()), 0);
        assert_eq!(ns.remove(&addr("ghost")), 0);
    }
}
