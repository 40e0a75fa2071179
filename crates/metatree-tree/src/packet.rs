use std::fmt;

use indexmap::IndexMap;
use metatree_store::PropertyStore;
use metatree_types::{Address, Addressed, Shape, Value};
use tracing::debug;

use crate::builder::build_namespaces;
use crate::config::TreeConfig;
use crate::error::{TreeError, TreeResult};
use crate::namespace::Namespace;
use crate::navigate::{Lookup, NamespaceView, NodeRef};
use crate::virtual_node::check_value;

/// A metadata packet seen as one tree per namespace.
///
/// The packet owns its store and every namespace tree. Trees are built once
/// from a store snapshot on load; afterwards every mutation goes through the
/// packet so that the store and the trees change together.
///
/// # Examples
///
/// ```
/// use metatree_store::InMemoryPropertyStore;
/// use metatree_tree::Packet;
///
/// let mut packet = Packet::load(InMemoryPropertyStore::new()).unwrap();
/// packet.set("urn:ns", "title", "hello").unwrap();
/// assert_eq!(packet.value("urn:ns", "title").unwrap().to_string(), "hello");
/// assert!(packet.store().is_dirty());
/// ```
pub struct Packet<S> {
    pub(crate) store: S,
    pub(crate) namespaces: IndexMap<String, Namespace>,
    pub(crate) config: TreeConfig,
}

impl<S: PropertyStore> Packet<S> {
    /// Build the trees of `store` with the default configuration.
    pub fn load(store: S) -> TreeResult<Self> {
        Self::with_config(store, TreeConfig::default())
    }

    pub fn with_config(store: S, config: TreeConfig) -> TreeResult<Self> {
        let namespaces = build_namespaces(&store, &config)?;
        debug!(namespaces = namespaces.len(), "loaded packet");
        Ok(Self {
            store,
            namespaces,
            config,
        })
    }

    /// Rebuild every tree from the current store content.
    pub fn reload(&mut self) -> TreeResult<()> {
        self.namespaces = build_namespaces(&self.store, &self.config)?;
        Ok(())
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access. Changes made here bypass the trees until
    /// [`reload`](Self::reload); affected nodes report themselves
    /// desynchronized.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Number of namespaces.
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Namespace URIs in load order.
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    pub fn contains_namespace(&self, uri: &str) -> bool {
        self.namespaces.contains_key(uri)
    }

    pub fn namespaces(&self) -> Vec<NamespaceView<'_, S>> {
        self.uris().map(|uri| NamespaceView::new(self, uri)).collect()
    }

    /// The namespace `uri`, or an empty placeholder if the packet has none.
    pub fn namespace(&self, uri: &str) -> NamespaceView<'_, S> {
        NamespaceView::new(self, uri)
    }

    /// Navigate `path` inside namespace `uri`.
    pub fn lookup(&self, uri: &str, path: &str) -> TreeResult<Lookup<'_, S>> {
        self.namespace(uri).lookup(path)
    }

    /// Like [`lookup`](Self::lookup), but a missing node is an error.
    pub fn node(&self, uri: &str, path: &str) -> TreeResult<NodeRef<'_, S>> {
        match self.lookup(uri, path)? {
            Lookup::Node(node) => Ok(node),
            Lookup::Virtual(missing) => {
                let address = missing.address();
                Err(TreeError::NotFound {
                    namespace: uri.to_string(),
                    address: address.parent().unwrap_or_else(Address::root),
                    key: address.name().to_string(),
                })
            }
        }
    }

    /// Current value of the existing node at `path`.
    pub fn value(&self, uri: &str, path: &str) -> TreeResult<Value> {
        self.node(uri, path)?.value()
    }

    /// Write `value` at `path`, creating the node and any missing ancestors.
    ///
    /// Returns the address written.
    pub fn set(&mut self, uri: &str, path: &str, value: impl Into<Value>) -> TreeResult<Address> {
        let address = self.lookup(uri, path)?.address().clone();
        self.set_at(uri, &address, value)
    }

    /// Write `value` at `address`.
    ///
    /// Existing scalars are overwritten and existing array elements replaced
    /// in place. Set members and whole containers cannot be overwritten.
    pub fn set_at(
        &mut self,
        uri: &str,
        address: &Address,
        value: impl Into<Value>,
    ) -> TreeResult<Address> {
        let value = value.into();
        check_value(&value)?;
        let existing = self
            .namespaces
            .get(uri)
            .and_then(|namespace| namespace.node(address))
            .map(|node| node.shape());
        match existing {
            Some(shape) => self.replace(uri, address, shape, value),
            None => self.materialize(uri, address, value),
        }
    }

    fn replace(
        &mut self,
        uri: &str,
        address: &Address,
        shape: Shape,
        value: Value,
    ) -> TreeResult<Address> {
        let unsupported = |operation: &str| TreeError::Unsupported {
            namespace: uri.to_string(),
            address: address.clone(),
            operation: operation.to_string(),
        };
        if address.is_root() {
            return Err(unsupported("replace a namespace root"));
        }
        let parent = self.parent_shape(uri, address)?;
        match (parent, shape, value) {
            (Shape::UnorderedSet, _, _) => Err(unsupported(
                "replace a set member; delete it and add the new member instead",
            )),
            (Shape::OrderedArray, shape, value) if shape.is_container() || value.is_composite() => {
                self.remove_subtree(uri, address)?;
                debug!(namespace = uri, address = %address, "replacing array element");
                self.materialize(uri, address, value)
            }
            (_, Shape::Value, Value::Scalar(scalar)) => {
                self.store.set_scalar(uri, address, &scalar)?;
                debug!(namespace = uri, address = %address, "updated value");
                Ok(address.clone())
            }
            (_, Shape::Value, _) => Err(unsupported("replace a scalar with a composite")),
            _ => Err(unsupported("replace a whole container")),
        }
    }

    /// Shape of the tree parent of `address`.
    fn parent_shape(&self, uri: &str, address: &Address) -> TreeResult<Shape> {
        let parent = address.parent().unwrap_or_else(Address::root);
        self.namespaces
            .get(uri)
            .and_then(|namespace| namespace.node(&parent))
            .map(|node| node.shape())
            .ok_or_else(|| TreeError::Detached {
                namespace: uri.to_string(),
                address: address.clone(),
            })
    }

    /// Delete the node at `path` with its subtree.
    ///
    /// Later elements of the same array or set move down one index. Returns
    /// `false` when nothing exists there.
    pub fn delete(&mut self, uri: &str, path: &str) -> TreeResult<bool> {
        let address = match self.lookup(uri, path)? {
            Lookup::Node(node) => node.address().clone(),
            Lookup::Virtual(_) => {
                debug!(namespace = uri, path, "delete of a missing node");
                return Ok(false);
            }
        };
        self.delete_at(uri, &address)
    }

    pub fn delete_at(&mut self, uri: &str, address: &Address) -> TreeResult<bool> {
        let exists = self
            .namespaces
            .get(uri)
            .is_some_and(|namespace| namespace.contains(address));
        if !exists {
            return Ok(false);
        }
        if address.is_root() {
            return Err(TreeError::Unsupported {
                namespace: uri.to_string(),
                address: address.clone(),
                operation: "delete a namespace root".into(),
            });
        }
        let parent = self.parent_shape(uri, address)?;

        self.remove_subtree(uri, address)?;
        if parent.is_indexed() {
            self.close_gap(uri, address)?;
        }
        Ok(true)
    }

    fn remove_subtree(&mut self, uri: &str, address: &Address) -> TreeResult<()> {
        self.store.delete(uri, address)?;
        let removed = self
            .namespaces
            .get_mut(uri)
            .map_or(0, |namespace| namespace.remove(address));
        debug!(namespace = uri, address = %address, removed, "deleted node");
        Ok(())
    }

    /// Shift every element after the deleted `element` down by one index so
    /// that the indices stay contiguous.
    fn close_gap(&mut self, uri: &str, element: &Address) -> TreeResult<()> {
        let (Some(container), Some(index)) = (element.parent(), element.index()) else {
            return Ok(());
        };
        let Some(namespace) = self.namespaces.get_mut(uri) else {
            return Ok(());
        };
        let later: Vec<usize> = namespace
            .node(&container)
            .map(|node| {
                node.children()
                    .into_iter()
                    .filter_map(Address::index)
                    .filter(|at| *at > index)
                    .collect()
            })
            .unwrap_or_default();
        for &at in &later {
            let (from, to) = (container.item(at), container.item(at - 1));
            self.store.rename(uri, &from, &to)?;
            namespace.rebase(&from, &to);
        }
        if !later.is_empty() {
            debug!(namespace = uri, container = %container, shifted = later.len(), "renumbered elements");
        }
        Ok(())
    }
}

impl<S: PropertyStore> fmt::Display for Packet<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, view) in self.namespaces().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{view}")?;
        }
        Ok(())
    }
}
