//! Structural predicates shared by everything that has a namespace and an
//! address: flat store properties, tree nodes, and virtual nodes.
//!
//! Relations only hold between items of the same namespace.

use crate::address::Address;

/// An item positioned at an [`Address`] inside a namespace.
pub trait Addressed {
    /// URI of the owning namespace.
    fn namespace_uri(&self) -> &str;

    /// Structural address inside the namespace.
    fn address(&self) -> &Address;

    /// Last segment of the address.
    fn name(&self) -> &str {
        self.address().name()
    }

    fn in_same_namespace<O: Addressed + ?Sized>(&self, other: &O) -> bool {
        self.namespace_uri() == other.namespace_uri()
    }

    fn is_descendant_of<O: Addressed + ?Sized>(&self, other: &O) -> bool {
        self.in_same_namespace(other) && self.address().is_descendant_of(other.address())
    }

    fn is_ancestor_of<O: Addressed + ?Sized>(&self, other: &O) -> bool {
        other.is_descendant_of(self)
    }

    fn is_child_of<O: Addressed + ?Sized>(&self, other: &O) -> bool {
        self.in_same_namespace(other) && self.address().is_child_of(other.address())
    }

    fn is_parent_of<O: Addressed + ?Sized>(&self, other: &O) -> bool {
        other.is_child_of(self)
    }
}

/// Items of `candidates` that are direct children of `parent`.
pub fn children_in<'a, P, T>(parent: &P, candidates: impl IntoIterator<Item = &'a T>) -> Vec<&'a T>
where
    P: Addressed + ?Sized,
    T: Addressed + 'a,
{
    candidates.into_iter().filter(|c| c.is_child_of(parent)).collect()
}

/// Items of `candidates` strictly below `ancestor`.
pub fn descendants_in<'a, P, T>(
    ancestor: &P,
    candidates: impl IntoIterator<Item = &'a T>,
) -> Vec<&'a T>
where
    P: Addressed + ?Sized,
    T: Addressed + 'a,
{
    candidates
        .into_iter()
        .filter(|c| c.is_descendant_of(ancestor))
        .collect()
}

/// Items of `candidates` strictly above `item`.
pub fn ancestors_in<'a, P, T>(item: &P, candidates: impl IntoIterator<Item = &'a T>) -> Vec<&'a T>
where
    P: Addressed + ?Sized,
    T: Addressed + 'a,
{
    candidates
        .into_iter()
        .filter(|c| c.is_ancestor_of(item))
        .collect()
}

/// Items of `candidates` that are the direct parent of `item`.
pub fn parents_in<'a, P, T>(item: &P, candidates: impl IntoIterator<Item = &'a T>) -> Vec<&'a T>
where
    P: Addressed + ?Sized,
    T: Addressed + 'a,
{
    candidates.into_iter().filter(|c| c.is_parent_of(item)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        ns: &'static str,
        address: Address,
    }

    impl Addressed for Item {
        fn namespace_uri(&self) -> &str {
            self.ns
        }

        fn address(&self) -> &Address {
            &self.address
        }
    }

    fn item(ns: &'static str, path: &str) -> Item {
        Item {
            ns,
            address: Address::parse(path).unwrap(),
        }
    }

    #[test]
    fn relations_require_same_namespace() {
        let a = item("ns1", "a");
        let b = item("ns1", "a/b");
        let foreign = item("ns2", "a/b");
        assert!(b.is_child_of(&a));
        assert!(a.is_parent_of(&b));
        assert!(!foreign.is_child_of(&a));
        assert!(!foreign.is_descendant_of(&a));
    }

    #[test]
    fn filters_select_by_relation() {
        let items = vec![
            item("ns1", "a"),
            item("ns1", "a/b"),
            item("ns1", "a/b/c"),
            item("ns1", "a[0]"),
            item("ns2", "a/b"),
        ];
        let a = item("ns1", "a");
        let deep = item("ns1", "a/b/c");

        let children: Vec<&str> = children_in(&a, &items)
            .iter()
            .map(|i| i.address.as_str())
            .collect();
        assert_eq!(children, vec!["a/b", "a[0]"]);

        assert_eq!(descendants_in(&a, &items).len(), 3);
        assert_eq!(ancestors_in(&deep, &items).len(), 2);
        let parents = parents_in(&deep, &items);
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].address.as_str(), "a/b");
    }

    #[test]
    fn name_defaults_to_last_segment() {
        assert_eq!(item("ns1", "a/b[2]").name(), "b[2]");
    }
}
