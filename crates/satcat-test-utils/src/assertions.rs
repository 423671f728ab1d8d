//! Custom assertion helpers for hierarchy tests.

use std::collections::HashSet;

use satcat_catalog::{ComponentTreeNode, ComponentView};

/// Finds the first node named `name` anywhere in `forest`.
pub fn find_node<'a>(forest: &'a [ComponentTreeNode], name: &str) -> Option<&'a ComponentTreeNode> {
    let mut stack: Vec<&ComponentTreeNode> = forest.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if node.name == name {
            return Some(node);
        }
        stack.extend(node.children.iter().rev());
    }
    None
}

/// Asserts the names of a node's direct children, in order.
///
/// # Panics
///
/// Panics if the children differ.
pub fn assert_child_names(node: &ComponentTreeNode, expected: &[&str]) {
    let actual: Vec<&str> = node.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        actual, expected,
        "unexpected children under {} ({})",
        node.name, node.id
    );
}

/// Asserts that every node in `forest` has a distinct identity.
///
/// # Panics
///
/// Panics on the first repeated identity.
pub fn assert_nodes_unique(forest: &[ComponentTreeNode]) {
    let mut seen = HashSet::new();
    for tree in forest {
        tree.walk(&mut |node, _| {
            assert!(seen.insert(node.id), "component {} appears twice", node.id);
        });
    }
}

/// Asserts that no record is its own parent.
///
/// # Panics
///
/// Panics on the first self-parented record.
pub fn assert_no_self_parents(views: &[ComponentView]) {
    for view in views {
        assert_ne!(
            view.component.parent_id,
            Some(view.component.id),
            "component {} is its own parent",
            view.component.id
        );
    }
}

/// Asserts that a record has no parent.
///
/// # Panics
///
/// Panics if the record has a parent.
pub fn assert_is_root(view: &ComponentView) {
    assert!(
        view.component.parent_id.is_none(),
        "expected {} to be a root, parent is {:?}",
        view.component.name,
        view.component.parent_id
    );
}
