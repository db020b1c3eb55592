use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use generational_arena::{Arena, Index};
use tracing::{debug, instrument, trace};

use crate::domain::error::{TreeError, TreeResult};

/// Bond weight used by [`Forest::bind`] unless the forest is configured otherwise.
pub const DEFAULT_BOND_WEIGHT: f64 = 1.0;

/// Source of forest tags; every forest gets its own.
static NEXT_FOREST: AtomicU64 = AtomicU64::new(0);

/// Stable handle of a node inside a [`Forest`].
///
/// Handles are generation-checked and tagged with their forest: a handle never
/// aliases a different node, neither after removal nor in another forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    forest: u64,
    index: Index,
}

/// Stable handle of a tree inside a [`Forest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId {
    forest: u64,
    index: Index,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (index, generation) = self.index.into_raw_parts();
        write!(f, "node#{}.{}@{}", index, generation, self.forest)
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (index, generation) = self.index.into_raw_parts();
        write!(f, "tree#{}.{}@{}", index, generation, self.forest)
    }
}

/// Weighted edge from a parent to a child. Owned by the child.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentalBond {
    weight: f64,
}

impl ParentalBond {
    pub fn new(weight: f64) -> Self {
        Self { weight }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug, Clone)]
pub struct Node<T> {
    name: String,
    data: T,
    /// None for roots and standalone nodes
    parent: Option<NodeId>,
    /// Insertion ordered
    children: Vec<NodeId>,
    /// Present iff `parent` is present
    bond: Option<ParentalBond>,
    /// Tree this node currently belongs to
    tree: Option<TreeId>,
}

impl<T> Node<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn bond(&self) -> Option<ParentalBond> {
        self.bond
    }

    pub fn tree(&self) -> Option<TreeId> {
        self.tree
    }

    /// True for the root of a tree; standalone nodes are not roots.
    pub fn is_root(&self) -> bool {
        self.tree.is_some() && self.parent.is_none()
    }
}

#[derive(Debug, Default)]
struct TreeSlot {
    root: Option<NodeId>,
}

/// A node taken out of the arena together with its position in the taken subtree.
struct Uprooted<T> {
    name: String,
    data: T,
    parent: Option<usize>,
    weight: f64,
}

/// Where [`Forest::graft`] attaches a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraftTarget {
    /// As root of an empty tree
    Tree(TreeId),
    /// As last child of a node that belongs to a tree
    Node(NodeId),
}

/// Arena owning every node and tree.
///
/// Parent, children and tree references are plain ids, so restructuring
/// (explant, graft) only re-points ids and never moves node payloads.
/// A node belongs to at most one tree; a tree has at most one root.
#[derive(Debug)]
pub struct Forest<T> {
    tag: u64,
    nodes: Arena<Node<T>>,
    trees: Arena<TreeSlot>,
    default_weight: f64,
}

impl<T> Default for Forest<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Forest<T> {
    pub fn new() -> Self {
        Self::with_default_weight(DEFAULT_BOND_WEIGHT)
    }

    pub fn with_default_weight(default_weight: f64) -> Self {
        Self {
            tag: NEXT_FOREST.fetch_add(1, Ordering::Relaxed),
            nodes: Arena::new(),
            trees: Arena::new(),
            default_weight,
        }
    }

    pub fn default_weight(&self) -> f64 {
        self.default_weight
    }

    /// Creates a standalone node: no parent, no tree.
    pub fn add_node(&mut self, name: impl Into<String>, data: T) -> NodeId {
        let name = name.into();
        trace!(name = name.as_str(), "adding node");
        let index = self.nodes.insert(Node {
            name,
            data,
            parent: None,
            children: Vec::new(),
            bond: None,
            tree: None,
        });
        NodeId {
            forest: self.tag,
            index,
        }
    }

    /// Creates an empty tree.
    #[instrument(level = "trace", skip(self))]
    pub fn new_tree(&mut self) -> TreeId {
        let index = self.trees.insert(TreeSlot::default());
        TreeId {
            forest: self.tag,
            index,
        }
    }

    /// Looks a node up; removed nodes and ids of other forests are unknown.
    pub fn node(&self, id: NodeId) -> TreeResult<&Node<T>> {
        if id.forest != self.tag {
            return Err(TreeError::UnknownNode(id));
        }
        self.nodes.get(id.index).ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> TreeResult<&mut Node<T>> {
        if id.forest != self.tag {
            return Err(TreeError::UnknownNode(id));
        }
        self.nodes.get_mut(id.index).ok_or(TreeError::UnknownNode(id))
    }

    pub fn data(&self, id: NodeId) -> TreeResult<&T> {
        self.node(id).map(|node| &node.data)
    }

    pub fn data_mut(&mut self, id: NodeId) -> TreeResult<&mut T> {
        self.node_mut(id).map(|node| &mut node.data)
    }

    fn slot(&self, tree: TreeId) -> TreeResult<&TreeSlot> {
        if tree.forest != self.tag {
            return Err(TreeError::UnknownTree(tree));
        }
        self.trees.get(tree.index).ok_or(TreeError::UnknownTree(tree))
    }

    fn slot_mut(&mut self, tree: TreeId) -> TreeResult<&mut TreeSlot> {
        if tree.forest != self.tag {
            return Err(TreeError::UnknownTree(tree));
        }
        self.trees.get_mut(tree.index).ok_or(TreeError::UnknownTree(tree))
    }

    /// Root of `tree`, None for an empty tree.
    pub fn root(&self, tree: TreeId) -> TreeResult<Option<NodeId>> {
        self.slot(tree).map(|slot| slot.root)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Membership test; unknown ids are never members.
    pub fn contains(&self, tree: TreeId, node: NodeId) -> bool {
        self.node(node).is_ok_and(|n| n.tree == Some(tree))
    }

    /// True iff the node belongs to a tree and has no children.
    pub fn is_leaf(&self, node: NodeId) -> TreeResult<bool> {
        let node = self.node(node)?;
        Ok(node.tree.is_some() && node.children.is_empty())
    }

    /// Installs `node` (with its existing descendants) as root of an empty tree.
    #[instrument(level = "debug", skip(self))]
    pub fn set_root(&mut self, tree: TreeId, node: NodeId) -> TreeResult<()> {
        if self.slot(tree)?.root.is_some() {
            return Err(TreeError::DuplicateRoot(tree));
        }
        self.ensure_detached(node)?;
        self.slot_mut(tree)?.root = Some(node);
        self.assign_tree(node, Some(tree))?;
        debug!(%tree, %node, "root installed");
        Ok(())
    }

    /// Creates a new tree rooted at `node`.
    #[instrument(level = "debug", skip(self))]
    pub fn as_root(&mut self, node: NodeId) -> TreeResult<TreeId> {
        self.ensure_detached(node)?;
        let tree = self.new_tree();
        self.set_root(tree, node)?;
        Ok(tree)
    }

    fn ensure_detached(&self, node: NodeId) -> TreeResult<()> {
        let n = self.node(node)?;
        if n.parent.is_some() {
            return Err(TreeError::binding(node, "node has a parent, explant it first"));
        }
        if let Some(tree) = n.tree {
            return Err(TreeError::binding(
                node,
                format!("node is already the root of {}, graft it instead", tree),
            ));
        }
        Ok(())
    }

    /// Binds `child` under `parent` with a bond of `weight`.
    ///
    /// `parent` must belong to a tree; `child` must be detached (no parent, no tree).
    /// The child's existing descendants join the parent's tree.
    #[instrument(level = "debug", skip(self))]
    pub fn set_child(&mut self, parent: NodeId, child: NodeId, weight: f64) -> TreeResult<()> {
        if parent == child {
            return Err(TreeError::binding(child, "node cannot be its own child"));
        }
        self.ensure_detached(child)?;
        if self.node(parent)?.tree.is_none() {
            return Err(TreeError::binding(
                parent,
                "nodes can only be bound inside a tree, parent has no tree",
            ));
        }
        self.link(parent, child, weight)
    }

    /// Mirror of [`Forest::set_child`].
    pub fn set_parent(&mut self, child: NodeId, parent: NodeId, weight: f64) -> TreeResult<()> {
        self.set_child(parent, child, weight)
    }

    /// [`Forest::set_child`] with the forest's default weight.
    pub fn bind(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        self.set_child(parent, child, self.default_weight)
    }

    /// Raw binding without the membership checks of `set_child`.
    fn link(&mut self, parent: NodeId, child: NodeId, weight: f64) -> TreeResult<()> {
        let tree = self.node(parent)?.tree;
        self.node(child)?;
        self.node_mut(parent)?.children.push(child);
        let c = self.node_mut(child)?;
        c.parent = Some(parent);
        c.bond = Some(ParentalBond::new(weight));
        self.assign_tree(child, tree)?;
        trace!(%parent, %child, weight, "bond created");
        Ok(())
    }

    /// Sets tree membership on `node` and its whole subtree.
    fn assign_tree(&mut self, node: NodeId, tree: Option<TreeId>) -> TreeResult<()> {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let n = self.node_mut(current)?;
            n.tree = tree;
            stack.extend(n.children.iter().copied());
        }
        Ok(())
    }

    /// Severs the bond to the parent.
    ///
    /// The node and all its descendants lose tree membership; links among them
    /// stay intact. Returns the node, now root of a standalone subtree.
    #[instrument(level = "debug", skip(self))]
    pub fn explant(&mut self, node: NodeId) -> TreeResult<NodeId> {
        let parent = self
            .node(node)?
            .parent
            .ok_or_else(|| TreeError::binding(node, "node has no parent to be explanted from"))?;
        self.node_mut(parent)?.children.retain(|&c| c != node);
        let n = self.node_mut(node)?;
        n.parent = None;
        n.bond = None;
        self.assign_tree(node, None)?;
        debug!(%node, %parent, "explanted");
        Ok(node)
    }

    /// Removes a root from its tree, leaving the tree empty.
    fn uproot(&mut self, node: NodeId) -> TreeResult<()> {
        if let Some(tree) = self.node(node)?.tree {
            let slot = self.slot_mut(tree)?;
            if slot.root == Some(node) {
                slot.root = None;
            }
            self.assign_tree(node, None)?;
            debug!(%node, %tree, "uprooted");
        }
        Ok(())
    }

    /// True if `candidate` is `top` or one of its descendants.
    fn in_subtree(&self, top: NodeId, candidate: NodeId) -> TreeResult<bool> {
        let mut current = Some(candidate);
        let mut steps = 0;
        while let Some(id) = current {
            if id == top {
                return Ok(true);
            }
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
            current = self.node(id)?.parent;
        }
        Ok(false)
    }

    /// Detaches `node` from wherever it is and attaches it to `target`.
    ///
    /// All preconditions are checked first; a failed graft changes nothing.
    #[instrument(level = "debug", skip(self))]
    pub fn graft(&mut self, node: NodeId, target: GraftTarget, weight: f64) -> TreeResult<()> {
        self.node(node)?;
        match target {
            GraftTarget::Tree(t) => {
                if self.slot(t)?.root.is_some() {
                    return Err(TreeError::DuplicateRoot(t));
                }
            }
            GraftTarget::Node(p) => {
                if self.node(p)?.tree.is_none() {
                    return Err(TreeError::binding(p, "graft target node has no tree"));
                }
                if self.in_subtree(node, p)? {
                    return Err(TreeError::binding(
                        node,
                        format!("cannot graft under own subtree member {}", p),
                    ));
                }
            }
        }

        self.detach(node)?;
        match target {
            GraftTarget::Tree(t) => self.set_root(t, node),
            GraftTarget::Node(p) => self.link(p, node, weight),
        }
    }

    /// Severs `node` from its parent, or from its tree when it is a root.
    fn detach(&mut self, node: NodeId) -> TreeResult<()> {
        let n = self.node(node)?;
        let (parent, tree) = (n.parent, n.tree);
        if parent.is_some() {
            self.explant(node)?;
        } else if tree.is_some() {
            self.uproot(node)?;
        }
        Ok(())
    }

    /// Moves the whole of `tree` under `target`, a node of another tree.
    /// The source tree is left empty.
    #[instrument(level = "debug", skip(self))]
    pub fn graft_tree(&mut self, tree: TreeId, target: NodeId, weight: f64) -> TreeResult<()> {
        let root = self.root(tree)?.ok_or(TreeError::EmptyTree(tree))?;
        match self.node(target)?.tree {
            None => Err(TreeError::binding(target, "graft target node has no tree")),
            Some(t) if t == tree => Err(TreeError::binding(target, "cannot graft a tree onto itself")),
            Some(_) => self.graft(root, GraftTarget::Node(target), weight),
        }
    }

    /// Copies a single node: payload and name, no descendants.
    ///
    /// With `grafted` the copy becomes a sibling of `node` bound with the same
    /// weight; otherwise it is standalone.
    #[instrument(level = "debug", skip(self, name))]
    pub fn copy(&mut self, node: NodeId, name: impl Into<String>, grafted: bool) -> TreeResult<NodeId>
    where
        T: Clone,
    {
        let source = self.node(node)?;
        let placement = match (grafted, source.parent, source.bond) {
            (false, _, _) => None,
            (true, Some(parent), Some(bond)) => Some((parent, bond.weight)),
            (true, _, _) => {
                return Err(TreeError::binding(node, "cannot graft a copy of a parentless node"))
            }
        };
        let data = source.data.clone();
        let copy = self.add_node(name, data);
        if let Some((parent, weight)) = placement {
            self.link(parent, copy, weight)?;
        }
        Ok(copy)
    }

    /// Deep variant of [`Forest::copy`]: duplicates the whole subtree,
    /// keeping descendant names and bond weights.
    #[instrument(level = "debug", skip(self, name))]
    pub fn copy_subtree(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        grafted: bool,
    ) -> TreeResult<NodeId>
    where
        T: Clone,
    {
        let top = self.copy(node, name, grafted)?;
        let mut stack = vec![(node, top)];
        while let Some((source, target)) = stack.pop() {
            let children = self.node(source)?.children.clone();
            for child in children {
                let c = self.node(child)?;
                let name = c.name.clone();
                let data = c.data.clone();
                let weight = c.bond.map_or(self.default_weight, |b| b.weight);
                let duplicate = self.add_node(name, data);
                self.link(target, duplicate, weight)?;
                stack.push((child, duplicate));
            }
        }
        Ok(top)
    }

    /// Detaches `node` and takes it with all descendants out of the arena.
    ///
    /// Entries come in pre-order; `parent` indexes into the returned list.
    fn take_subtree(&mut self, node: NodeId) -> TreeResult<Vec<Uprooted<T>>> {
        let order: Vec<NodeId> = std::iter::once(node)
            .chain(self.descendants(node)?)
            .collect();
        let position: HashMap<NodeId, usize> =
            order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        self.detach(node)?;

        let mut taken = Vec::with_capacity(order.len());
        for id in order {
            let n = self
                .nodes
                .remove(id.index)
                .ok_or(TreeError::UnknownNode(id))?;
            taken.push(Uprooted {
                name: n.name,
                data: n.data,
                parent: n.parent.and_then(|p| position.get(&p).copied()),
                weight: n.bond.map_or(self.default_weight, |b| b.weight),
            });
        }
        Ok(taken)
    }

    /// Removes `node` and its descendants, returning their payloads in pre-order.
    /// Ids of removed nodes become unknown.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_subtree(&mut self, node: NodeId) -> TreeResult<Vec<T>> {
        let taken = self.take_subtree(node)?;
        debug!(%node, removed = taken.len(), "subtree removed");
        Ok(taken.into_iter().map(|uprooted| uprooted.data).collect())
    }

    /// Removes `tree` together with all its members.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_tree(&mut self, tree: TreeId) -> TreeResult<Vec<T>> {
        let removed = match self.root(tree)? {
            Some(root) => self.remove_subtree(root)?,
            None => Vec::new(),
        };
        self.trees.remove(tree.index);
        Ok(removed)
    }

    /// Moves `node` and its subtree out of this forest into `into`, attached
    /// at `target` there with a bond of `weight`.
    ///
    /// Names, payloads, child order and bond weights below `node` are kept.
    /// The moved nodes get ids of `into`; the new id of `node` is returned.
    /// All preconditions are checked before anything moves.
    #[instrument(level = "debug", skip(self, into))]
    pub fn transplant(
        &mut self,
        node: NodeId,
        into: &mut Forest<T>,
        target: GraftTarget,
        weight: f64,
    ) -> TreeResult<NodeId> {
        self.node(node)?;
        match target {
            GraftTarget::Tree(t) => {
                if into.slot(t)?.root.is_some() {
                    return Err(TreeError::DuplicateRoot(t));
                }
            }
            GraftTarget::Node(p) => {
                if into.node(p)?.tree.is_none() {
                    return Err(TreeError::binding(p, "graft target node has no tree"));
                }
            }
        }

        let taken = self.take_subtree(node)?;
        let mut moved: Vec<NodeId> = Vec::with_capacity(taken.len());
        for uprooted in taken {
            let id = into.add_node(uprooted.name, uprooted.data);
            if let Some(parent) = uprooted.parent {
                into.link(moved[parent], id, uprooted.weight)?;
            }
            moved.push(id);
        }
        let top = moved.first().copied().ok_or(TreeError::UnknownNode(node))?;
        match target {
            GraftTarget::Tree(t) => into.set_root(t, top)?,
            GraftTarget::Node(p) => into.link(p, top, weight)?,
        }
        debug!(%node, %top, moved = moved.len(), "transplanted");
        Ok(top)
    }

    /// All descendants in pre-order (children left to right).
    pub fn descendants(&self, node: NodeId) -> TreeResult<Vec<NodeId>> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.node(node)?.children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            // Push children in reverse order for left-to-right traversal
            stack.extend(self.node(current)?.children.iter().rev().copied());
        }
        Ok(result)
    }

    /// Parent first, root last.
    pub fn ancestors(&self, node: NodeId) -> TreeResult<Vec<NodeId>> {
        let mut result = Vec::new();
        let mut current = self.node(node)?.parent;
        while let Some(id) = current {
            if result.len() > self.nodes.len() {
                break;
            }
            result.push(id);
            current = self.node(id)?.parent;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rooted() -> (Forest<()>, TreeId, NodeId) {
        let mut forest = Forest::new();
        let root = forest.add_node("root", ());
        let tree = forest.as_root(root).unwrap();
        (forest, tree, root)
    }

    #[test]
    fn test_set_child_propagates_tree_to_existing_descendants() {
        let (mut forest, tree, root) = rooted();
        let a = forest.add_node("a", ());
        let b = forest.add_node("b", ());
        forest.link(a, b, 2.0).unwrap();
        assert_eq!(forest.node(b).unwrap().tree(), None);

        forest.set_child(root, a, 1.0).unwrap();
        assert_eq!(forest.node(a).unwrap().tree(), Some(tree));
        assert_eq!(forest.node(b).unwrap().tree(), Some(tree));
    }

    #[test]
    fn test_in_subtree() {
        let (mut forest, _, root) = rooted();
        let a = forest.add_node("a", ());
        forest.bind(root, a).unwrap();
        assert!(forest.in_subtree(root, a).unwrap());
        assert!(forest.in_subtree(a, a).unwrap());
        assert!(!forest.in_subtree(a, root).unwrap());
    }

    #[test]
    fn test_display_ids() {
        let (forest, tree, root) = rooted();
        assert!(root.to_string().starts_with("node#"));
        assert!(tree.to_string().starts_with("tree#"));
        assert_eq!(forest.node_count(), 1);
        assert_eq!(forest.tree_count(), 1);
    }
}
