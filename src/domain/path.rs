//! Path discovery and weight aggregation between nodes of one tree.
//!
//! A path between two nodes goes root-ward from the start up to the lowest
//! common ancestor (the pivot) and then leaf-ward down to the target. Either
//! segment may be empty. Bond weights count the same in both directions.

use std::fmt;

use itertools::Itertools;
use tracing::{instrument, trace};

use crate::domain::arena::{Forest, NodeId, TreeId};
use crate::domain::error::{TreeError, TreeResult};

/// Direction in which an edge of a path is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Root-ward: leaving a node toward its parent
    Backward,
    /// Leaf-ward: entering a node from its parent
    Forward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Backward => write!(f, "back"),
            Direction::Forward => write!(f, "to"),
        }
    }
}

/// One step of a [`Path`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub direction: Direction,
    pub weight: f64,
}

impl Edge {
    /// The node whose bond this edge crosses (always the child end).
    pub fn child(&self) -> NodeId {
        match self.direction {
            Direction::Backward => self.from,
            Direction::Forward => self.to,
        }
    }
}

/// Discovered path: `start → … → pivot → … → target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    nodes: Vec<NodeId>,
    /// `weights[i]` is the bond weight between `nodes[i]` and `nodes[i + 1]`
    weights: Vec<f64>,
    pivot: usize,
}

impl Path {
    /// Path from a node to itself.
    pub fn single(node: NodeId) -> Self {
        Self {
            nodes: vec![node],
            weights: Vec::new(),
            pivot: 0,
        }
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Total bond weight.
    pub fn weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn start(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn target(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    /// Lowest common ancestor of start and target.
    pub fn pivot(&self) -> NodeId {
        self.nodes[self.pivot]
    }

    pub fn edge_count(&self) -> usize {
        self.weights.len()
    }

    /// Nodes left toward their parent, in walking order.
    pub fn backward(&self) -> &[NodeId] {
        &self.nodes[..self.pivot]
    }

    /// Nodes entered from their parent, in walking order.
    pub fn forward(&self) -> &[NodeId] {
        &self.nodes[self.pivot + 1..]
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.nodes
            .iter()
            .tuple_windows()
            .zip(self.weights.iter())
            .enumerate()
            .map(move |(i, ((&from, &to), &weight))| Edge {
                from,
                to,
                direction: if i < self.pivot {
                    Direction::Backward
                } else {
                    Direction::Forward
                },
                weight,
            })
    }

    /// The same path walked from target to start.
    pub fn reversed(&self) -> Self {
        Self {
            nodes: self.nodes.iter().rev().copied().collect(),
            weights: self.weights.iter().rev().copied().collect(),
            pivot: self.nodes.len() - 1 - self.pivot,
        }
    }
}

/// How [`Forest::distance`] measures a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    /// Sum of bond weights
    #[default]
    Weighted,
    /// Number of bonds
    Edges,
}

impl<T> Forest<T> {
    /// Finds the path from `start` to `target`, both members of `tree`.
    ///
    /// Walks up from both ends to the root, finds the deepest shared ancestor
    /// and joins the upward segment of `start` with the reversed upward
    /// segment of `target`.
    #[instrument(level = "debug", skip(self))]
    pub fn find_path(&self, tree: TreeId, start: NodeId, target: NodeId) -> TreeResult<Path> {
        let root = self.root(tree)?.ok_or(TreeError::EmptyTree(tree))?;
        let up = self.chain_to_root(tree, root, start)?;
        let down = self.chain_to_root(tree, root, target)?;

        // both chains end at root, so at least one common element exists
        let (mut i, mut j) = (up.len(), down.len());
        while i > 0 && j > 0 && up[i - 1].0 == down[j - 1].0 {
            i -= 1;
            j -= 1;
        }

        let nodes = up[..=i]
            .iter()
            .map(|&(id, _)| id)
            .chain(down[..j].iter().rev().map(|&(id, _)| id))
            .collect();
        let weights = up[..i]
            .iter()
            .map(|&(_, w)| w)
            .chain(down[..j].iter().rev().map(|&(_, w)| w))
            .collect();

        let path = Path {
            nodes,
            weights,
            pivot: i,
        };
        trace!(pivot = %path.pivot(), weight = path.weight(), "path found");
        Ok(path)
    }

    /// `(node, bond weight to its parent)` from `node` up to `root`.
    fn chain_to_root(&self, tree: TreeId, root: NodeId, node: NodeId) -> TreeResult<Vec<(NodeId, f64)>> {
        if !self.contains(tree, node) {
            return Err(TreeError::NotInTree { node, tree });
        }
        let mut chain = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let n = self.node(id)?;
            chain.push((id, n.bond().map_or(0.0, |b| b.weight())));
            if chain.len() > self.node_count() {
                break;
            }
            current = n.parent();
        }
        match chain.last() {
            Some(&(top, _)) if top == root => Ok(chain),
            _ => Err(TreeError::NotInTree { node, tree }),
        }
    }

    /// Sums bond weights along `nodes`; neighbours must be parent and child.
    pub fn path_weight(&self, nodes: &[NodeId]) -> TreeResult<f64> {
        let mut total = 0.0;
        for (&a, &b) in nodes.iter().tuple_windows() {
            let (na, nb) = (self.node(a)?, self.node(b)?);
            total += if na.parent() == Some(b) {
                na.bond().map_or(0.0, |bond| bond.weight())
            } else if nb.parent() == Some(a) {
                nb.bond().map_or(0.0, |bond| bond.weight())
            } else {
                return Err(TreeError::NonContiguousPath { from: a, to: b });
            };
        }
        Ok(total)
    }

    pub fn distance(&self, tree: TreeId, a: NodeId, b: NodeId, metric: Metric) -> TreeResult<f64> {
        let path = self.find_path(tree, a, b)?;
        Ok(match metric {
            Metric::Weighted => path.weight(),
            Metric::Edges => path.edge_count() as f64,
        })
    }
}
