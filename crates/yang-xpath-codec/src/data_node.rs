//! The decoded configuration-tree node (spec §4.10). `DataNode`
//! implements `yang_xpath_engine::Node` directly (the one supplementation
//! recorded in `DESIGN.md`), so a tree decoded by this crate can be
//! handed straight to `Machine::run` without an adapter type.

use std::cell::RefCell;
use std::rc::Rc;

use yang_xpath_engine::{AccessibleTree, ChildOrder, Node, QName};

/// What shape a decoded node takes. Mirrors `SchemaKind` but collapses
/// `List` into repeated `ListEntry` siblings, matching the engine's
/// `Node` trait (which has no notion of a "list" node, only of
/// individually keyed entries — spec §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Container,
    ListEntry,
    Leaf,
    LeafListEntry,
}

#[derive(Debug)]
struct Inner {
    name: QName,
    kind: Kind,
    presence: bool,
    value: Option<String>,
    is_config: bool,
    keys: RefCell<Vec<(QName, String)>>,
    children: RefCell<Vec<DataNode>>,
    parent: RefCell<Option<DataNode>>,
}

/// A single node of a decoded configuration or schema-data tree, shared
/// via `Rc` so cloning (required by `Node: Clone`) stays cheap.
#[derive(Debug, Clone)]
pub struct DataNode(Rc<Inner>);

impl DataNode {
    fn new(name: QName, kind: Kind, presence: bool, value: Option<String>, is_config: bool) -> Self {
        Self(Rc::new(Inner {
            name,
            kind,
            presence,
            value,
            is_config,
            keys: RefCell::new(Vec::new()),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(None),
        }))
    }

    /// Builds a container node (the tree root, or a nested container).
    pub fn container(name: QName, presence: bool, is_config: bool) -> Self {
        Self::new(name, Kind::Container, presence, None, is_config)
    }

    /// Builds a list-entry node. `keys` may be supplied up front or
    /// attached later with [`DataNode::set_keys`] once the entry's
    /// children (which carry the key values) have been decoded.
    pub fn list_entry(name: QName, keys: Vec<(QName, String)>, is_config: bool) -> Self {
        let node = Self::new(name, Kind::ListEntry, false, None, is_config);
        *node.0.keys.borrow_mut() = keys;
        node
    }

    /// Builds a single-valued leaf node.
    pub fn leaf(name: QName, value: impl Into<String>, is_config: bool) -> Self {
        Self::new(name, Kind::Leaf, false, Some(value.into()), is_config)
    }

    /// Builds one entry of a leaf-list (spec's "node with ordered
    /// values" is realised as repeated same-named entries, the way
    /// `list_entry` realises a list).
    pub fn leaf_list_entry(name: QName, value: impl Into<String>, is_config: bool) -> Self {
        Self::new(name, Kind::LeafListEntry, false, Some(value.into()), is_config)
    }

    /// Appends `child` under `self`, wiring up the parent link.
    pub fn push_child(&self, child: DataNode) {
        *child.0.parent.borrow_mut() = Some(self.clone());
        self.0.children.borrow_mut().push(child);
    }

    /// Attaches key values discovered only after a list entry's
    /// children have been decoded (the XML decoder's case: an entry's
    /// key leaves are ordinary children, parsed in document order, not
    /// necessarily matching `key_names()`'s declaration order).
    pub fn set_keys(&self, keys: Vec<(QName, String)>) {
        *self.0.keys.borrow_mut() = keys;
    }

    /// This node's children in the order they were appended (not
    /// filtered by name), used by the encoders to reproduce the Data
    /// Node's own element order (spec §4.10).
    pub fn raw_children(&self) -> Vec<DataNode> {
        self.0.children.borrow().clone()
    }
}

impl Node for DataNode {
    fn parent(&self) -> Option<Self> {
        self.0.parent.borrow().clone()
    }

    fn children(&self, filter: &QName, tree: AccessibleTree, _order: ChildOrder) -> Vec<Self> {
        self.0
            .children
            .borrow()
            .iter()
            .filter(|c| yang_xpath_engine::match_filter(filter, &c.name()))
            .filter(|c| match tree {
                AccessibleTree::FullTree => true,
                AccessibleTree::ConfigOnly => c.is_config(),
                AccessibleTree::OpdOnly => !c.is_config(),
            })
            .cloned()
            .collect()
    }

    fn root(&self) -> Self {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    fn name(&self) -> QName {
        self.0.name.clone()
    }

    fn value(&self) -> Option<String> {
        self.0.value.clone()
    }

    fn is_leaf(&self) -> bool {
        self.0.kind == Kind::Leaf
    }

    fn is_leaf_list(&self) -> bool {
        self.0.kind == Kind::LeafListEntry
    }

    fn is_non_presence_container(&self) -> bool {
        self.0.kind == Kind::Container && !self.0.presence
    }

    fn is_ephemeral(&self) -> bool {
        false
    }

    fn is_config(&self) -> bool {
        self.0.is_config
    }

    fn list_key_matches(&self, key: &QName, value: &str) -> bool {
        self.0
            .keys
            .borrow()
            .iter()
            .any(|(k, v)| k.local() == key.local() && v == value)
    }

    fn list_keys(&self) -> Vec<(QName, String)> {
        self.0.keys.borrow().clone()
    }

    fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut current = Some(self.clone());
        while let Some(node) = current {
            let mut segment = node.name().local().to_string();
            for (k, v) in node.0.keys.borrow().iter() {
                segment.push_str(&format!("[{}={}]", k.local(), v));
            }
            segments.push(segment);
            current = node.parent();
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_entry_path_carries_its_key_predicate() {
        let root = DataNode::container(QName::unqualified("root"), true, true);
        let entry = DataNode::list_entry(
            QName::unqualified("interface"),
            vec![(QName::unqualified("name"), "eth0".to_string())],
            true,
        );
        root.push_child(entry.clone());
        assert_eq!(entry.path(), "/root/interface[name=eth0]");
    }

    #[test]
    fn leaf_list_entries_are_distinguished_from_leaves() {
        let leaf = DataNode::leaf(QName::unqualified("hostname"), "router1", true);
        let entry = DataNode::leaf_list_entry(QName::unqualified("address"), "10.0.0.1", true);
        assert!(leaf.is_leaf() && !leaf.is_leaf_list());
        assert!(entry.is_leaf_list() && !entry.is_leaf());
    }

    #[test]
    fn children_are_filtered_by_the_accessibility_tree() {
        let root = DataNode::container(QName::unqualified("interface"), true, true);
        let config_leaf = DataNode::leaf(QName::unqualified("name"), "eth0", true);
        let opd_leaf = DataNode::leaf(QName::unqualified("oper-status"), "up", false);
        root.push_child(config_leaf.clone());
        root.push_child(opd_leaf.clone());

        let all = root.children(&QName::wildcard(), AccessibleTree::FullTree, ChildOrder::Sorted);
        assert_eq!(all.len(), 2);

        let config_only = root.children(&QName::wildcard(), AccessibleTree::ConfigOnly, ChildOrder::Sorted);
        assert_eq!(config_only.len(), 1);
        assert_eq!(config_only[0].name(), config_leaf.name());

        let opd_only = root.children(&QName::wildcard(), AccessibleTree::OpdOnly, ChildOrder::Sorted);
        assert_eq!(opd_only.len(), 1);
        assert_eq!(opd_only[0].name(), opd_leaf.name());
    }
}
