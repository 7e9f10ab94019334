//! Dot-path lookup over `XmlNode` trees.
//!
//! Paths are dot-separated element names relative to a starting node:
//!
//! - `""` or `@` - the node itself
//! - `user.email` - the `email` children of the first `user` child
//! - `*` - every child element; names after it are plucked from each child
//! - `*.*` - grandchildren, collapsed into one flat list
//!
//! A named segment steps into the first node of the current selection, the
//! way property access on a matched element list reads the first element.
//! Only after a `*` does the selection fan out.

use super::node::XmlNode;
use indexmap::IndexMap;

/// Resolves `path` against `node`, returning every matching element.
///
/// An empty result means the path did not match.
///
/// ```
/// use xmlquill::document::node::XmlNode;
/// use xmlquill::document::resolver::resolve;
///
/// let mut api = XmlNode::new("api");
/// api.push_child(XmlNode::with_text("user", "a"));
/// api.push_child(XmlNode::with_text("user", "b"));
///
/// assert_eq!(resolve(&api, "user").len(), 2);
/// assert_eq!(resolve(&api, "@").len(), 1);
/// assert!(resolve(&api, "nobody").is_empty());
/// ```
pub fn resolve<'a>(node: &'a XmlNode, path: &str) -> Vec<&'a XmlNode> {
    let path = path.trim();
    if path.is_empty() || path == "@" {
        return vec![node];
    }

    let mut selection: Vec<&'a XmlNode> = vec![node];
    let mut fanned = false;

    for segment in path.split('.') {
        if segment == "*" {
            selection = selection
                .iter()
                .flat_map(|n| n.visible_children())
                .collect();
            fanned = true;
        } else if fanned {
            selection = selection
                .iter()
                .filter_map(|n| n.children.iter().find(|c| n.child_matches(c, segment)))
                .collect();
        } else {
            selection = match selection.first() {
                Some(first) => first
                    .children
                    .iter()
                    .filter(|c| first.child_matches(c, segment))
                    .collect(),
                None => Vec::new(),
            };
        }

        if selection.is_empty() {
            tracing::trace!(path, segment, "path segment did not match");
            break;
        }
    }

    selection
}

/// Resolves `path` and returns the first match.
pub fn resolve_first<'a>(node: &'a XmlNode, path: &str) -> Option<&'a XmlNode> {
    resolve(node, path).into_iter().next()
}

/// Looks up `attribute` on the node found at `path`.
///
/// An empty `path` means the node itself.
pub fn resolve_attribute<'a>(node: &'a XmlNode, path: &str, attribute: &str) -> Option<&'a str> {
    resolve_first(node, path)?.attribute(attribute)
}

/// Returns a copy of `node` scoped to the children bound to namespace `uri`.
pub fn children_in_namespace(node: &XmlNode, uri: &str) -> XmlNode {
    node.scoped(uri)
}

/// Collects every namespace declared on `node` or any descendant.
///
/// The first declaration of a prefix wins. The default namespace is keyed
/// by the empty prefix.
pub fn available_namespaces(node: &XmlNode) -> IndexMap<String, String> {
    fn walk(node: &XmlNode, table: &mut IndexMap<String, String>) {
        for (prefix, uri) in node.declarations() {
            table.entry(prefix.clone()).or_insert_with(|| uri.clone());
        }
        for child in node.children() {
            walk(child, table);
        }
    }

    let mut table = IndexMap::new();
    walk(node, &mut table);
    table
}
