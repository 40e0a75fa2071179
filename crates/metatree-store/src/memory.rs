use indexmap::IndexMap;
use metatree_types::{Address, PropertyFlags, Shape};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::property::PropertyEntry;
use crate::traits::PropertyStore;

/// A stored property body, keyed by `(namespace, address)`.
#[derive(Clone, Debug, PartialEq, Eq)]
struct StoredProperty {
    value: String,
    flags: PropertyFlags,
}

/// In-memory, insertion-ordered property store.
///
/// Intended for tests, the CLI, and embedding. Tracks whether it was modified
/// since it was loaded or last marked clean.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPropertyStore {
    /// Registered namespaces and their optional prefix.
    namespaces: IndexMap<String, Option<String>>,
    properties: IndexMap<(String, Address), StoredProperty>,
    dirty: bool,
}

impl InMemoryPropertyStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from flat tuples without marking it dirty.
    ///
    /// Declaration tuples register their namespace; property tuples register
    /// theirs implicitly.
    pub fn from_entries(entries: impl IntoIterator<Item = PropertyEntry>) -> Self {
        let mut store = Self::new();
        for entry in entries {
            store.insert(entry);
        }
        store
    }

    /// Register `uri` with an optional prefix, replacing any previous prefix.
    pub fn register_namespace(&mut self, uri: impl Into<String>, prefix: Option<&str>) {
        self.namespaces
            .insert(uri.into(), prefix.map(str::to_string));
    }

    /// Insert a raw tuple as loaded data. Does not mark the store dirty.
    pub fn insert(&mut self, entry: PropertyEntry) {
        if !self.namespaces.contains_key(&entry.namespace) {
            self.namespaces.insert(entry.namespace.clone(), None);
        }
        if entry.is_schema() {
            return;
        }
        self.properties.insert(
            (entry.namespace, entry.address),
            StoredProperty {
                value: entry.value,
                flags: entry.flags,
            },
        );
    }

    /// Registered namespaces with their prefixes, in registration order.
    pub fn namespaces(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.namespaces
            .iter()
            .map(|(uri, prefix)| (uri.as_str(), prefix.as_deref()))
    }

    /// Number of properties (declarations excluded).
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if the store holds no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Whether any mutation happened since load or the last `mark_clean`.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn key(namespace: &str, address: &Address) -> (String, Address) {
        (namespace.to_string(), address.clone())
    }

    fn ensure_namespace(&mut self, namespace: &str) {
        if !self.namespaces.contains_key(namespace) {
            debug!(namespace, "registering namespace on first write");
            self.namespaces.insert(namespace.to_string(), None);
        }
    }
}

impl PropertyStore for InMemoryPropertyStore {
    fn enumerate(&self) -> StoreResult<Vec<PropertyEntry>> {
        let mut entries = Vec::with_capacity(self.namespaces.len() + self.properties.len());
        for uri in self.namespaces.keys() {
            entries.push(PropertyEntry::schema(uri.clone()));
            entries.extend(
                self.properties
                    .iter()
                    .filter(|((ns, _), _)| ns == uri)
                    .map(|((ns, address), stored)| {
                        PropertyEntry::new(ns.clone(), address.clone(), stored.value.clone(), stored.flags)
                    }),
            );
        }
        Ok(entries)
    }

    fn exists(&self, namespace: &str, address: &Address) -> StoreResult<bool> {
        if address.is_root() {
            return Ok(self.namespaces.contains_key(namespace));
        }
        Ok(self.properties.contains_key(&Self::key(namespace, address)))
    }

    fn get(&self, namespace: &str, address: &Address) -> StoreResult<Option<String>> {
        Ok(self
            .properties
            .get(&Self::key(namespace, address))
            .map(|stored| stored.value.clone()))
    }

    fn set(&mut self, namespace: &str, address: &Address, text: &str) -> StoreResult<()> {
        if address.is_root() {
            return Err(StoreError::RootWrite(namespace.to_string()));
        }
        let key = Self::key(namespace, address);
        if let Some(existing) = self.properties.get(&key) {
            if !existing.flags.is_empty() {
                return Err(StoreError::NotAScalar {
                    namespace: namespace.to_string(),
                    address: address.clone(),
                });
            }
        }
        self.ensure_namespace(namespace);
        debug!(namespace, address = %address, "set property");
        self.properties.insert(
            key,
            StoredProperty {
                value: text.to_string(),
                flags: PropertyFlags::empty(),
            },
        );
        self.dirty = true;
        Ok(())
    }

    fn set_container(
        &mut self,
        namespace: &str,
        address: &Address,
        shape: Shape,
    ) -> StoreResult<()> {
        if address.is_root() {
            return Err(StoreError::RootWrite(namespace.to_string()));
        }
        let flags = PropertyFlags::for_shape(shape);
        let key = Self::key(namespace, address);
        if let Some(existing) = self.properties.get(&key) {
            if existing.flags == flags {
                return Ok(());
            }
            return Err(StoreError::ShapeConflict {
                namespace: namespace.to_string(),
                address: address.clone(),
                existing: existing.flags.to_text(),
                requested: shape,
            });
        }
        self.ensure_namespace(namespace);
        debug!(namespace, address = %address, %shape, "declared container");
        self.properties.insert(
            key,
            StoredProperty {
                value: String::new(),
                flags,
            },
        );
        self.dirty = true;
        Ok(())
    }

    fn delete(&mut self, namespace: &str, address: &Address) -> StoreResult<bool> {
        let existed = self.properties.contains_key(&Self::key(namespace, address));
        let before = self.properties.len();
        self.properties.retain(|(ns, candidate), _| {
            ns != namespace || !(candidate == address || candidate.is_descendant_of(address))
        });
        let removed = before - self.properties.len();
        if removed > 0 {
            debug!(namespace, address = %address, removed, "deleted properties");
            self.dirty = true;
        }
        Ok(existed)
    }

    fn count(&self, namespace: &str, address: &Address) -> StoreResult<usize> {
        Ok(self
            .properties
            .keys()
            .filter(|(ns, candidate)| {
                ns == namespace && candidate.is_array_element() && candidate.is_child_of(address)
            })
            .count())
    }

    fn prefix_for(&self, namespace: &str) -> StoreResult<Option<String>> {
        Ok(self.namespaces.get(namespace).cloned().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metatree_types::Scalar;

    const NS: &str = "http://example.com/ns/";

    fn addr(path: &str) -> Address {
        Address::parse(path).unwrap()
    }

    fn sample() -> InMemoryPropertyStore {
        InMemoryPropertyStore::from_entries([
            PropertyEntry::schema(NS),
            PropertyEntry::new(NS, addr("a"), "", PropertyFlags::STRUCT),
            PropertyEntry::new(NS, addr("a/b"), "x", PropertyFlags::empty()),
            PropertyEntry::new(NS, addr("arr"), "", PropertyFlags::ARRAY | PropertyFlags::ORDERED),
            PropertyEntry::new(NS, addr("arr[0]"), "1", PropertyFlags::empty()),
            PropertyEntry::new(NS, addr("arr[1]"), "2", PropertyFlags::empty()),
        ])
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    #[test]
    fn from_entries_is_clean() {
        let store = sample();
        assert_eq!(store.len(), 5);
        assert!(!store.is_dirty());
        assert_eq!(store.namespaces().count(), 1);
    }

    #[test]
    fn enumerate_starts_with_declaration() {
        let store = sample();
        let entries = store.enumerate().unwrap();
        assert_eq!(entries.len(), 6);
        assert!(entries[0].is_schema());
        assert_eq!(entries[2].address, addr("a/b"));
    }

    #[test]
    fn empty_namespace_is_still_enumerated() {
        let mut store = InMemoryPropertyStore::new();
        store.register_namespace("urn:empty", Some("e"));
        let entries = store.enumerate().unwrap();
        assert_eq!(entries, vec![PropertyEntry::schema("urn:empty")]);
        assert_eq!(store.prefix_for("urn:empty").unwrap(), Some("e".to_string()));
        assert_eq!(store.prefix_for("urn:unknown").unwrap(), None);
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn set_and_get_scalar() {
        let mut store = sample();
        store.set_scalar(NS, &addr("n"), &Scalar::Float(2.5)).unwrap();
        assert!(store.is_dirty());
        assert_eq!(store.get(NS, &addr("n")).unwrap(), Some("2.5".to_string()));
        assert_eq!(store.get_scalar(NS, &addr("n")).unwrap(), Some(Scalar::Float(2.5)));
    }

    #[test]
    fn set_rejects_containers_and_root() {
        let mut store = sample();
        assert!(matches!(
            store.set(NS, &addr("a"), "v"),
            Err(StoreError::NotAScalar { .. })
        ));
        assert!(matches!(
            store.set(NS, &Address::root(), "v"),
            Err(StoreError::RootWrite(_))
        ));
    }

    #[test]
    fn set_registers_unknown_namespace() {
        let mut store = InMemoryPropertyStore::new();
        store.set("urn:new", &addr("f"), "v").unwrap();
        assert!(store.exists("urn:new", &Address::root()).unwrap());
        assert!(store.exists("urn:new", &addr("f")).unwrap());
    }

    #[test]
    fn exists_reports_root_and_properties() {
        let store = sample();
        assert!(store.exists(NS, &Address::root()).unwrap());
        assert!(store.exists(NS, &addr("a/b")).unwrap());
        assert!(!store.exists(NS, &addr("a/c")).unwrap());
        assert!(!store.exists("urn:other", &Address::root()).unwrap());
    }

    #[test]
    fn set_container_is_idempotent() {
        let mut store = sample();
        store.set_container(NS, &addr("s"), Shape::UnorderedSet).unwrap();
        store.set_container(NS, &addr("s"), Shape::UnorderedSet).unwrap();
        assert!(matches!(
            store.set_container(NS, &addr("s"), Shape::Structure),
            Err(StoreError::ShapeConflict { .. })
        ));
    }

    #[test]
    fn delete_removes_subtree() {
        let mut store = sample();
        assert!(store.delete(NS, &addr("a")).unwrap());
        assert!(!store.exists(NS, &addr("a")).unwrap());
        assert!(!store.exists(NS, &addr("a/b")).unwrap());
        assert!(store.exists(NS, &addr("arr")).unwrap());
        assert!(store.is_dirty());
    }

    #[test]
    fn delete_missing_returns_false() {
        let mut store = sample();
        assert!(!store.delete(NS, &addr("ghost")).unwrap());
        assert!(!store.is_dirty());
    }

    #[test]
    fn count_array_elements() {
        let mut store = sample();
        assert_eq!(store.count(NS, &addr("arr")).unwrap(), 2);
        assert_eq!(store.count(NS, &addr("a")).unwrap(), 0);
        store.delete(NS, &addr("arr[0]")).unwrap();
        assert_eq!(store.count(NS, &addr("arr")).unwrap(), 1);
    }

    #[test]
    fn rename_moves_subtree() {
        let mut store = sample();
        store.set_container(NS, &addr("arr[2]"), Shape::Structure).unwrap();
        store.set(NS, &addr("arr[2]/x"), "3").unwrap();
        store.delete(NS, &addr("arr[1]")).unwrap();

        store.rename(NS, &addr("arr[2]"), &addr("arr[1]")).unwrap();
        assert!(!store.exists(NS, &addr("arr[2]")).unwrap());
        assert!(!store.exists(NS, &addr("arr[2]/x")).unwrap());
        assert_eq!(store.get(NS, &addr("arr[1]/x")).unwrap(), Some("3".to_string()));
        assert!(store.set(NS, &addr("arr[1]"), "v").is_err());
        assert_eq!(store.count(NS, &addr("arr")).unwrap(), 2);
        assert_eq!(store.get(NS, &addr("arr[0]")).unwrap(), Some("1".to_string()));
    }

    #[test]
    fn mark_clean_resets_dirty() {
        let mut store = sample();
        store.set(NS, &addr("z"), "1").unwrap();
        store.mark_clean();
        assert!(!store.is_dirty());
    }
}
