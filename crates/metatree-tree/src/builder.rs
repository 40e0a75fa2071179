//! Building namespace trees from a flat property enumeration.

use indexmap::IndexMap;
use metatree_store::{PropertyEntry, PropertyStore};
use metatree_types::{children_in, descendants_in, Addressed, Shape};
use tracing::{debug, warn};

use crate::config::TreeConfig;
use crate::error::{TreeError, TreeResult};
use crate::namespace::Namespace;
use crate::node::Node;

/// Build one tree per namespace the store reports, empty ones included.
pub(crate) fn build_namespaces<S: PropertyStore>(
    store: &S,
    config: &TreeConfig,
) -> TreeResult<IndexMap<String, Namespace>> {
    let mut grouped: IndexMap<String, Vec<PropertyEntry>> = IndexMap::new();
    for entry in store.enumerate()? {
        let properties = grouped.entry(entry.namespace.clone()).or_default();
        if !entry.is_schema() {
            properties.push(entry);
        }
    }

    let mut namespaces = IndexMap::with_capacity(grouped.len());
    for (uri, entries) in grouped {
        let mut namespace = Namespace::new(uri.clone(), store.prefix_for(&uri)?);
        let anchor = PropertyEntry::schema(uri.clone());
        let candidates: Vec<&PropertyEntry> = entries.iter().collect();
        let built = build_children(&mut namespace, &anchor, &candidates, config)?;
        if built < entries.len() {
            warn!(
                namespace = %uri,
                skipped = entries.len() - built,
                "properties without a parent container were not attached"
            );
        }
        debug!(namespace = %uri, nodes = namespace.len(), "built namespace tree");
        namespaces.insert(uri, namespace);
    }
    Ok(namespaces)
}

/// Attach the children of `parent` found among `candidates`, recursing into
/// containers with the candidates below each child. Returns the number of
/// nodes created.
fn build_children(
    namespace: &mut Namespace,
    parent: &PropertyEntry,
    candidates: &[&PropertyEntry],
    config: &TreeConfig,
) -> TreeResult<usize> {
    let mut built = 0;
    for child in children_in(parent, candidates.iter().copied()) {
        let below = descendants_in(child, candidates.iter().copied());
        let shape = resolve_shape(child, &below, config)?;

        let node = Node::new(child.namespace.clone(), child.address.clone(), shape);
        if let Some(reason) = namespace
            .node(parent.address())
            .and_then(|p| p.attach_conflict(&child.address))
        {
            return Err(malformed(child, reason));
        }
        namespace.insert(node);
        built += 1;

        if shape.is_container() {
            built += build_children(namespace, child, &below, config)?;
        }
    }
    Ok(built)
}

/// Pick the node variant for `entry` from its flags.
///
/// A scalar-flagged property with children is built as a container unless
/// descriptors are strict.
fn resolve_shape(
    entry: &PropertyEntry,
    below: &[&PropertyEntry],
    config: &TreeConfig,
) -> TreeResult<Shape> {
    let shape = entry
        .shape()
        .map_err(|e| malformed(entry, &e.to_string()))?;
    if shape.is_container() {
        return Ok(shape);
    }
    let children = children_in(entry, below.iter().copied());
    if children.is_empty() {
        return Ok(shape);
    }
    if config.strict_descriptors {
        return Err(malformed(entry, "scalar property has children"));
    }
    let inferred = if children.iter().all(|c| c.address.is_array_element()) {
        Shape::OrderedArray
    } else {
        Shape::Structure
    };
    warn!(
        namespace = %entry.namespace,
        address = %entry.address,
        %inferred,
        "scalar property has children; building it as a container"
    );
    Ok(inferred)
}

fn malformed(entry: &PropertyEntry, reason: &str) -> TreeError {
    TreeError::MalformedInput {
        namespace: entry.namespace.clone(),
        address: entry.address.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metatree_store::InMemoryPropertyStore;
    use metatree_types::{Address, PropertyFlags};

    const NS: &str = "http://example.com/ns/";

    fn addr(path: &str) -> Address {
        Address::parse(path).unwrap()
    }

    fn entry(path: &str, value: &str, flags: PropertyFlags) -> PropertyEntry {
        PropertyEntry::new(NS, addr(path), value, flags)
    }

    fn build(entries: Vec<PropertyEntry>, config: &TreeConfig) -> TreeResult<IndexMap<String, Namespace>> {
        build_namespaces(&InMemoryPropertyStore::from_entries(entries), config)
    }

    #[test]
    fn builds_nested_containers() {
        let trees = build(
            vec![
                PropertyEntry::schema(NS),
                entry("arr", "", PropertyFlags::ARRAY | PropertyFlags::ORDERED),
                entry("arr[1]", "", PropertyFlags::STRUCT),
                entry("arr[1]/x", "2", PropertyFlags::empty()),
                entry("arr[0]", "", PropertyFlags::STRUCT),
                entry("arr[0]/x", "1", PropertyFlags::empty()),
                entry("tags", "", PropertyFlags::ARRAY),
                entry("tags[0]", "t", PropertyFlags::empty()),
            ],
            &TreeConfig::default(),
        )
        .unwrap();
        let ns = &trees[NS];
        assert_eq!(ns.len(), 7);
        assert_eq!(ns.root().children(), vec![&addr("arr"), &addr("tags")]);
        assert_eq!(
            ns.node(&addr("arr")).unwrap().children(),
            vec![&addr("arr[0]"), &addr("arr[1]")]
        );
        assert_eq!(ns.node(&addr("tags")).unwrap().shape(), Shape::UnorderedSet);
        assert_eq!(ns.node(&addr("arr[1]/x")).unwrap().shape(), Shape::Value);
    }

    #[test]
    fn empty_namespace_gets_a_tree() {
        let trees = build(vec![PropertyEntry::schema("urn:empty")], &TreeConfig::default()).unwrap();
        assert_eq!(trees.len(), 1);
        assert!(trees["urn:empty"].is_empty());
    }

    #[test]
    fn scalar_with_children_is_inferred() {
        let entries = vec![
            entry("a", "", PropertyFlags::empty()),
            entry("a/b", "x", PropertyFlags::empty()),
            entry("l", "", PropertyFlags::empty()),
            entry("l[0]", "y", PropertyFlags::empty()),
        ];
        let trees = build(entries.clone(), &TreeConfig::default()).unwrap();
        assert_eq!(trees[NS].node(&addr("a")).unwrap().shape(), Shape::Structure);
        assert_eq!(trees[NS].node(&addr("l")).unwrap().shape(), Shape::OrderedArray);

        let strict = build(entries, &TreeConfig::strict());
        assert!(matches!(strict, Err(TreeError::MalformedInput { .. })));
    }

    #[test]
    fn conflicting_flags_are_malformed() {
        let result = build(
            vec![entry("a", "", PropertyFlags::STRUCT | PropertyFlags::ARRAY)],
            &TreeConfig::default(),
        );
        assert!(matches!(result, Err(TreeError::MalformedInput { .. })));
    }

    #[test]
    fn indexed_child_of_structure_is_malformed() {
        let result = build(
            vec![
                entry("a", "", PropertyFlags::STRUCT),
                entry("a[0]", "x", PropertyFlags::empty()),
            ],
            &TreeConfig::default(),
        );
        assert!(matches!(result, Err(TreeError::MalformedInput { .. })));
    }

    #[test]
    fn orphans_are_skipped() {
        let trees = build(
            vec![
                entry("top", "1", PropertyFlags::empty()),
                entry("missing/child", "2", PropertyFlags::empty()),
            ],
            &TreeConfig::default(),
        )
        .unwrap();
        assert_eq!(trees[NS].len(), 1);
        assert!(!trees[NS].contains(&addr("missing/child")));
    }
}
