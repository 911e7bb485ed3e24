//! The node abstraction the evaluator consumes from any data tree (spec
//! §4.9).

use std::fmt;

use yang_xpath_syntax::QName;

/// Which slice of the tree a step is allowed to see (spec §3's
/// "accessibility filter").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessibleTree {
    /// Both configuration and operational state are visible.
    #[default]
    FullTree,
    /// Only configuration data is visible.
    ConfigOnly,
    /// Only operational ("opd") data is visible.
    OpdOnly,
}

/// Whether [`Node::children`] must return its result in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOrder {
    /// Document order is required.
    Sorted,
    /// Any order is acceptable; implementations may return faster.
    Unsorted,
}

/// The tree-shaped interface the evaluator depends on (spec §4.9). An
/// implementation is free to represent nodes however it likes — as
/// indices into an arena, as `Rc<RefCell<_>>` handles, or as plain
/// owned values — as long as cloning a `Node` is cheap, since the
/// evaluator clones nodes freely while building nodesets.
pub trait Node: Clone + fmt::Debug {
    /// Returns the containing node, or `None` at the root.
    fn parent(&self) -> Option<Self>;

    /// Returns the children matching `filter` under the accessibility
    /// filter `tree`, in document order if `order` requests it.
    fn children(&self, filter: &QName, tree: AccessibleTree, order: ChildOrder) -> Vec<Self>;

    /// Returns the root of the tree this node belongs to.
    fn root(&self) -> Self;

    /// The node's qualified name.
    fn name(&self) -> QName;

    /// The leaf/leaf-list textual value, if this node carries one.
    fn value(&self) -> Option<String>;

    /// Whether this node is a single-valued leaf.
    fn is_leaf(&self) -> bool;

    /// Whether this node is a leaf-list entry.
    fn is_leaf_list(&self) -> bool;

    /// Whether this node is a container with no `presence` statement.
    fn is_non_presence_container(&self) -> bool;

    /// Whether this node exists only ephemerally (e.g. an RPC input
    /// parameter tree) and has no stable path.
    fn is_ephemeral(&self) -> bool;

    /// Whether this node is part of the configuration tree (as opposed
    /// to operational state).
    fn is_config(&self) -> bool;

    /// Whether this node is a list entry whose key named `key` has
    /// `value`.
    fn list_key_matches(&self, key: &QName, value: &str) -> bool;

    /// The (name, value) pairs of this list entry's keys; empty if this
    /// node is not a list entry.
    fn list_keys(&self) -> Vec<(QName, String)>;

    /// The absolute path from the root to this node, with bracketed key
    /// predicates for list entries.
    fn path(&self) -> String;

    /// The string-value of this node: for a leaf, its text; for any
    /// other node, the concatenation of the string-values of its
    /// descendant text (spec §4.9, GLOSSARY).
    fn string_value(&self) -> String {
        if let Some(v) = self.value() {
            return v;
        }
        self.children(&QName::wildcard(), AccessibleTree::FullTree, ChildOrder::Sorted)
            .iter()
            .map(Node::string_value)
            .collect()
    }
}

/// Implements spec §4.9's `MatchFilter` rule: does a filter qualified
/// name `filter` match a target qualified name `target`?
///
/// - the global wildcard matches anything;
/// - an unqualified filter matches any target with the same local name;
/// - `prefix:*` matches any target in the same namespace;
/// - otherwise both fields must match exactly.
pub fn match_filter(filter: &QName, target: &QName) -> bool {
    if filter.is_global_wildcard() {
        return true;
    }
    if !filter.is_qualified() {
        return filter.local() == target.local();
    }
    if filter.is_local_wildcard() {
        return filter.namespace() == target.namespace();
    }
    filter.namespace() == target.namespace() && filter.local() == target.local()
}

/// Computes the canonical string used to deduplicate a nodeset (spec
/// §4.9): the absolute path, plus a `(value)` suffix for leaves and
/// leaf-lists.
pub fn node_string<N: Node>(node: &N) -> String {
    let path = node.path();
    if node.is_leaf() || node.is_leaf_list() {
        let value = node.value().unwrap_or_default();
        format!("{path}({value})")
    } else {
        path
    }
}

/// Removes duplicate nodes from `nodes`, keeping the first occurrence of
/// each canonical [`node_string`], preserving relative order.
pub fn dedup<N: Node>(nodes: Vec<N>) -> Vec<N> {
    use itertools::Itertools;
    nodes.into_iter().unique_by(node_string).collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use test_support::TestNode;

    #[test]
    fn wildcard_filter_matches_anything() {
        assert!(match_filter(&QName::wildcard(), &QName::unqualified("foo")));
    }

    #[test]
    fn unqualified_filter_matches_by_local_name_only() {
        let filter = QName::unqualified("name");
        assert!(match_filter(&filter, &QName::new("urn:test", "name")));
        assert!(!match_filter(&filter, &QName::new("urn:test", "other")));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let a = TestNode::new("a");
        let nodes = vec![a.clone(), a.clone()];
        assert_eq!(dedup(nodes).len(), 1);
    }
}
