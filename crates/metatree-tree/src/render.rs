//! Indented text rendering of namespace trees.
//!
//! ```text
//! http://example.com/ns/
//!      a
//!      ├─── b = x
//!      └─── c = 1
//!      arr [
//!           ⁃ [0] = 1
//!      ]
//!      tags {
//!           • [0] = t
//!      }
//! ```

use metatree_store::PropertyStore;
use metatree_types::Addressed;

use crate::config::TreeConfig;
use crate::namespace::Namespace;
use crate::node::{Node, NodeKind};

const ARRAY_BULLET: char = '⁃';
const SET_BULLET: char = '•';

/// The namespace URI followed by each top-level subtree, one level in.
pub(crate) fn namespace<S: PropertyStore>(
    store: &S,
    namespace: &Namespace,
    config: &TreeConfig,
) -> String {
    let indent = " ".repeat(config.indent_width());
    let mut out = namespace.uri().to_string();
    for child in children(namespace, namespace.root()) {
        out.push('\n');
        out.push_str(&indent);
        out.push_str(&pad_lines(&node(store, namespace, child, config), &indent));
    }
    out
}

/// One node and its subtree. The root renders as its whole namespace.
pub(crate) fn node<S: PropertyStore>(
    store: &S,
    namespace: &Namespace,
    node: &Node,
    config: &TreeConfig,
) -> String {
    if node.address().is_root() {
        return self::namespace(store, namespace, config);
    }
    let width = config.indent_width();
    let label = label(node);
    match node.kind() {
        NodeKind::Value => {
            let text = store
                .get(namespace.uri(), node.address())
                .ok()
                .flatten()
                .unwrap_or_else(|| "<missing>".to_string());
            format!("{label} = {text}")
        }
        NodeKind::Structure { .. } => {
            let fields = children(namespace, node);
            let branch = "─".repeat(width - 2);
            let mut out = label;
            for (i, child) in fields.iter().enumerate() {
                let (head, pad) = if i + 1 == fields.len() {
                    (format!("└{branch} "), " ".repeat(width))
                } else {
                    (format!("├{branch} "), format!("│{}", " ".repeat(width - 1)))
                };
                out.push('\n');
                out.push_str(&head);
                out.push_str(&pad_lines(&self::node(store, namespace, child, config), &pad));
            }
            out
        }
        NodeKind::Array { .. } => list(store, namespace, node, config, ('[', ']'), ARRAY_BULLET),
        NodeKind::Set { .. } => list(store, namespace, node, config, ('{', '}'), SET_BULLET),
    }
}

fn list<S: PropertyStore>(
    store: &S,
    namespace: &Namespace,
    node: &Node,
    config: &TreeConfig,
    (open, close): (char, char),
    bullet: char,
) -> String {
    let elements = children(namespace, node);
    let label = label(node);
    if elements.is_empty() {
        return format!("{label} {open}{close}");
    }
    let indent = " ".repeat(config.indent_width());
    let pad = " ".repeat(config.indent_width() + 2);
    let mut out = format!("{label} {open}");
    for element in elements {
        out.push('\n');
        out.push_str(&indent);
        out.push(bullet);
        out.push(' ');
        out.push_str(&pad_lines(&self::node(store, namespace, element, config), &pad));
    }
    out.push('\n');
    out.push(close);
    out
}

fn children<'n>(namespace: &'n Namespace, node: &Node) -> Vec<&'n Node> {
    node.children()
        .into_iter()
        .filter_map(|address| namespace.node(address))
        .collect()
}

/// Elements show their index, everything else its name.
fn label(node: &Node) -> String {
    match node.address().index() {
        Some(index) => format!("[{index}]"),
        None => node.name().to_string(),
    }
}

fn pad_lines(text: &str, pad: &str) -> String {
    text.replace('\n', &format!("\n{pad}"))
}
