//! Hierarchy assembly: flat component rows to nested trees.
//!
//! The store is the arena and component identities are the indices. Trees
//! are rebuilt on every read in two passes over the flat rows:
//!
//! 1. index every component by identity;
//! 2. attach each component to its parent's child list, in input order.
//!
//! A component whose parent is missing from the input is treated as a root.
//! Each component contributes exactly one node and is attached to at most one
//! parent, so every node appears exactly once in the output.
//!
//! Nothing here touches the store; callers pass the rows in.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use satcat_core::{ComponentId, SubsystemId};

use crate::model::{Component, MakeBuy};

/// Nested view of a component and its descendants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentTreeNode {
    /// Component identity.
    pub id: ComponentId,
    /// Component name.
    pub name: String,
    /// Optional part number.
    pub part_number: Option<String>,
    /// Optional WBS code.
    pub wbs: Option<String>,
    /// Optional make/buy flag.
    pub make_buy: Option<MakeBuy>,
    /// Unit mass in kilograms.
    pub mass_kg: f64,
    /// Unit cost in US dollars.
    pub cost_usd: f64,
    /// Number of units.
    pub quantity: i64,
    /// Parent identity as stored (may reference a component absent from the input).
    pub parent_id: Option<ComponentId>,
    /// Owning subsystem.
    pub subsystem_id: Option<SubsystemId>,
    /// Children in store order.
    pub children: Vec<ComponentTreeNode>,
}

impl ComponentTreeNode {
    fn leaf(component: &Component) -> Self {
        Self {
            id: component.id,
            name: component.name.clone(),
            part_number: component.part_number.clone(),
            wbs: component.wbs.clone(),
            make_buy: component.make_buy,
            mass_kg: component.mass_kg,
            cost_usd: component.cost_usd,
            quantity: component.quantity,
            parent_id: component.parent_id,
            subsystem_id: component.subsystem_id,
            children: Vec::new(),
        }
    }

    /// Returns the flat component record for this node (children dropped).
    #[must_use]
    pub fn to_component(&self) -> Component {
        Component {
            id: self.id,
            name: self.name.clone(),
            part_number: self.part_number.clone(),
            wbs: self.wbs.clone(),
            make_buy: self.make_buy,
            mass_kg: self.mass_kg,
            cost_usd: self.cost_usd,
            quantity: self.quantity,
            parent_id: self.parent_id,
            subsystem_id: self.subsystem_id,
        }
    }

    /// Number of nodes in this subtree, including the node itself.
    #[must_use]
    pub fn size(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_, _| count += 1);
        count
    }

    /// Visits every node depth-first in pre-order with its depth (root = 0).
    pub fn walk<F>(&self, visit: &mut F)
    where
        F: FnMut(&ComponentTreeNode, usize),
    {
        let mut stack = vec![(self, 0_usize)];
        while let Some((node, depth)) = stack.pop() {
            visit(node, depth);
            for child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
    }
}

/// Two-pass index over a flat component slice.
struct Arena<'a> {
    components: &'a [Component],
    position: HashMap<ComponentId, usize>,
    children: Vec<Vec<usize>>,
}

impl<'a> Arena<'a> {
    fn build(components: &'a [Component]) -> Self {
        let position: HashMap<ComponentId, usize> = components
            .iter()
            .enumerate()
            .map(|(pos, component)| (component.id, pos))
            .collect();

        let mut children = vec![Vec::new(); components.len()];
        for (pos, component) in components.iter().enumerate() {
            if let Some(parent_pos) = component
                .parent_id
                .and_then(|parent| position.get(&parent).copied())
            {
                children[parent_pos].push(pos);
            }
        }

        Self {
            components,
            position,
            children,
        }
    }

    fn is_root(&self, component: &Component) -> bool {
        component
            .parent_id
            .is_none_or(|parent| !self.position.contains_key(&parent))
    }

    /// Materializes the subtree under `root` without recursion.
    ///
    /// A node already emitted on the current walk is not emitted twice, so a
    /// cyclic input yields a chain truncated at the repeated identity.
    fn materialize(&self, root: usize) -> ComponentTreeNode {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(pos) = stack.pop() {
            if !seen.insert(pos) {
                continue;
            }
            order.push(pos);
            for &child in self.children[pos].iter().rev() {
                if !seen.contains(&child) {
                    stack.push(child);
                }
            }
        }

        let mut built: HashMap<usize, ComponentTreeNode> = HashMap::with_capacity(order.len());
        for &pos in order.iter().rev() {
            let mut node = ComponentTreeNode::leaf(&self.components[pos]);
            node.children = self.children[pos]
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
            built.insert(pos, node);
        }

        built
            .remove(&root)
            .unwrap_or_else(|| ComponentTreeNode::leaf(&self.components[root]))
    }
}

/// Forest mode: every root with its full descendant chain, in input order.
///
/// Roots are components with no parent, or whose parent is absent from
/// `components`.
#[must_use]
pub fn assemble_forest(components: &[Component]) -> Vec<ComponentTreeNode> {
    let arena = Arena::build(components);
    components
        .iter()
        .enumerate()
        .filter(|(_, component)| arena.is_root(component))
        .map(|(pos, _)| arena.materialize(pos))
        .collect()
}

/// Subtree mode: the node for `root` with its full descendant chain.
///
/// Returns `None` when `root` is not present in `components`; the caller
/// decides how to report that.
#[must_use]
pub fn assemble_subtree(components: &[Component], root: ComponentId) -> Option<ComponentTreeNode> {
    let arena = Arena::build(components);
    let pos = *arena.position.get(&root)?;
    Some(arena.materialize(pos))
}

/// Flattens trees back to component records in depth-first pre-order.
#[must_use]
pub fn flatten(trees: &[ComponentTreeNode]) -> Vec<Component> {
    let mut out = Vec::new();
    for tree in trees {
        tree.walk(&mut |node, _| out.push(node.to_component()));
    }
    out
}

/// Returns true when making `new_parent` the parent of `child` would close a
/// cycle, i.e. `child` is `new_parent` itself or one of its ancestors.
///
/// Walks the ancestor chain of `new_parent` through `components`. A chain
/// that already loops (out-of-band writes) stops at the first repeat.
#[must_use]
pub fn would_create_cycle(
    components: &[Component],
    child: ComponentId,
    new_parent: ComponentId,
) -> bool {
    let parents: HashMap<ComponentId, Option<ComponentId>> = components
        .iter()
        .map(|component| (component.id, component.parent_id))
        .collect();

    let mut seen = HashSet::new();
    let mut cursor = Some(new_parent);
    while let Some(current) = cursor {
        if current == child {
            return true;
        }
        if !seen.insert(current) {
            return false;
        }
        cursor = parents.get(&current).copied().flatten();
    }
    false
}
