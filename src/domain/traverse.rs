use std::collections::{BTreeMap, VecDeque};

use tracing::instrument;

use crate::domain::arena::{Forest, Node, NodeId, TreeId};
use crate::domain::error::{TreeError, TreeResult};
use crate::domain::path::Path;

impl<T> Forest<T> {
    fn required_root(&self, tree: TreeId) -> TreeResult<NodeId> {
        self.root(tree)?.ok_or(TreeError::EmptyTree(tree))
    }

    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self, tree: TreeId) -> TreeResult<TreeIterator<'_, T>> {
        Ok(TreeIterator::new(self, self.root(tree)?))
    }

    #[instrument(level = "trace", skip(self))]
    pub fn iter_postorder(&self, tree: TreeId) -> TreeResult<PostOrderIterator<'_, T>> {
        Ok(PostOrderIterator::new(self, self.root(tree)?))
    }

    /// All members of `tree`, root first, in pre-order.
    pub fn nodes(&self, tree: TreeId) -> TreeResult<Vec<NodeId>> {
        Ok(self.iter(tree)?.map(|(id, _)| id).collect())
    }

    /// Number of members; 0 for an empty tree.
    pub fn size(&self, tree: TreeId) -> TreeResult<usize> {
        Ok(self.iter(tree)?.count())
    }

    /// Number of bonds inside the tree.
    pub fn bond_count(&self, tree: TreeId) -> TreeResult<usize> {
        Ok(self
            .iter(tree)?
            .filter(|(_, node)| node.bond().is_some())
            .count())
    }

    /// Number of tiers, counting the root tier.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self, tree: TreeId) -> TreeResult<usize> {
        Ok(self.tiers(tree)?.len())
    }

    /// Breadth-first grouping of the members by distance (in bonds) from the root.
    #[instrument(level = "debug", skip(self))]
    pub fn tiers(&self, tree: TreeId) -> TreeResult<BTreeMap<usize, Vec<NodeId>>> {
        let root = self.required_root(tree)?;
        let mut tiers: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
        let mut queue = VecDeque::new();
        queue.push_back((root, 0));

        while let Some((id, tier)) = queue.pop_front() {
            tiers.entry(tier).or_default().push(id);
            for &child in self.node(id)?.children() {
                queue.push_back((child, tier + 1));
            }
        }
        Ok(tiers)
    }

    /// Members at distance `n` from the root; empty past the deepest tier.
    pub fn tier(&self, tree: TreeId, n: usize) -> TreeResult<Vec<NodeId>> {
        Ok(self.tiers(tree)?.remove(&n).unwrap_or_default())
    }

    /// Tier of a member node.
    pub fn tier_of(&self, tree: TreeId, node: NodeId) -> TreeResult<usize> {
        if !self.contains(tree, node) {
            return Err(TreeError::NotInTree { node, tree });
        }
        Ok(self.ancestors(node)?.len())
    }

    /// Collects all leaf nodes in pre-order.
    #[instrument(level = "debug", skip(self))]
    pub fn leaves(&self, tree: TreeId) -> TreeResult<Vec<NodeId>> {
        self.required_root(tree)?;
        Ok(self
            .iter(tree)?
            .filter(|(_, node)| node.children().is_empty())
            .map(|(id, _)| id)
            .collect())
    }

    /// One path per leaf, walking from the leaf up to the root.
    pub fn branches(&self, tree: TreeId) -> TreeResult<Vec<Path>> {
        let root = self.required_root(tree)?;
        self.leaves(tree)?
            .into_iter()
            .map(|leaf| self.find_path(tree, leaf, root))
            .collect()
    }

    /// Looks a node up by name.
    ///
    /// With several names, each one is searched in the subtree of the previous
    /// match, so `["family", "father", "room"]` finds the father's room even when
    /// other family members have a room too. The search includes the subtree top.
    #[instrument(level = "debug", skip(self))]
    pub fn find_node(&self, tree: TreeId, names: &[&str], ignore_case: bool) -> TreeResult<Option<NodeId>> {
        let mut start = self.required_root(tree)?;
        if names.is_empty() {
            return Ok(None);
        }
        for name in names {
            let candidates = std::iter::once(start).chain(self.descendants(start)?);
            let mut found = None;
            for id in candidates {
                let candidate = self.node(id)?.name();
                let matched = if ignore_case {
                    candidate.to_lowercase() == name.to_lowercase()
                } else {
                    candidate == *name
                };
                if matched {
                    found = Some(id);
                    break;
                }
            }
            match found {
                Some(id) => start = id,
                None => return Ok(None),
            }
        }
        Ok(Some(start))
    }
}

/// Pre-order iterator over the members of one tree.
pub struct TreeIterator<'a, T> {
    forest: &'a Forest<T>,
    stack: Vec<NodeId>,
}

impl<'a, T> TreeIterator<'a, T> {
    fn new(forest: &'a Forest<T>, root: Option<NodeId>) -> Self {
        Self {
            forest,
            stack: root.into_iter().collect(),
        }
    }
}

impl<'a, T> Iterator for TreeIterator<'a, T> {
    type Item = (NodeId, &'a Node<T>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Ok(node) = self.forest.node(current) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(node.children().iter().rev().copied());
                return Some((current, node));
            }
        }
        None
    }
}

/// Post-order iterator: children before their parent.
pub struct PostOrderIterator<'a, T> {
    forest: &'a Forest<T>,
    stack: Vec<(NodeId, bool)>,
}

impl<'a, T> PostOrderIterator<'a, T> {
    fn new(forest: &'a Forest<T>, root: Option<NodeId>) -> Self {
        Self {
            forest,
            stack: root.into_iter().map(|id| (id, false)).collect(),
        }
    }
}

impl<'a, T> Iterator for PostOrderIterator<'a, T> {
    type Item = (NodeId, &'a Node<T>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Ok(node) = self.forest.node(current) {
                if visited {
                    return Some((current, node));
                }
                self.stack.push((current, true));
                for &child in node.children().iter().rev() {
                    self.stack.push((child, false));
                }
            }
        }
        None
    }
}
