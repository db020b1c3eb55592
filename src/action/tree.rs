use std::collections::VecDeque;

use tracing::{debug, instrument, trace, warn};

use crate::action::node::Actions;
use crate::config::Settings;
use crate::domain::{Direction, Forest, GraftTarget, NodeId, Path, TreeError, TreeId, TreeResult};

/// Result of a completed navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct Navigation {
    /// Node reached, equal to the navigation target
    pub current: NodeId,
    /// Total bond weight traversed
    pub weight: f64,
    pub path: Path,
}

/// Tree of action nodes with a traversal position.
///
/// Navigating walks the path from the current node to a target and runs
/// `back` on every node left root-ward and `to` on every node entered
/// leaf-ward, in path order. Progress is committed edge by edge: when an
/// action fails, `current` stays at the last node successfully entered.
///
/// A cut tree (see [`ActionTree::cut`]) refuses to navigate until it is
/// seeded again.
#[derive(Debug)]
pub struct ActionTree {
    forest: Forest<Actions>,
    tree: TreeId,
    current: Option<NodeId>,
    history: VecDeque<NodeId>,
    settings: Settings,
    cut: bool,
}

impl Default for ActionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionTree {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let mut forest = Forest::with_default_weight(settings.default_bond_weight);
        let tree = forest.new_tree();
        Self {
            forest,
            tree,
            current: None,
            history: VecDeque::new(),
            settings,
            cut: false,
        }
    }

    pub fn tree_id(&self) -> TreeId {
        self.tree
    }

    pub fn forest(&self) -> &Forest<Actions> {
        &self.forest
    }

    /// Structural access; restructuring does not move `current`. When the
    /// current node leaves the tree, navigation fails with `StalePosition`
    /// until [`ActionTree::set_current`] picks a member again.
    pub fn forest_mut(&mut self) -> &mut Forest<Actions> {
        &mut self.forest
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Creates a standalone action node.
    pub fn add_node(&mut self, name: impl Into<String>, actions: Actions) -> NodeId {
        self.forest.add_node(name, actions)
    }

    /// Creates an action node bound under `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        actions: Actions,
        weight: f64,
    ) -> TreeResult<NodeId> {
        let child = self.forest.add_node(name, actions);
        self.forest.set_child(parent, child, weight)?;
        Ok(child)
    }

    /// Installs the root and makes it the current node.
    #[instrument(level = "debug", skip(self))]
    pub fn set_root(&mut self, node: NodeId) -> TreeResult<()> {
        self.forest.set_root(self.tree, node)?;
        self.commit(node);
        Ok(())
    }

    pub fn root(&self) -> Option<NodeId> {
        self.forest.root(self.tree).ok().flatten()
    }

    /// Present traversal position; the root until a position was committed.
    pub fn current(&self) -> Option<NodeId> {
        self.current.or_else(|| self.root())
    }

    /// Moves the traversal position to `node` without running any action.
    #[instrument(level = "debug", skip(self))]
    pub fn set_current(&mut self, node: NodeId) -> TreeResult<()> {
        if !self.forest.contains(self.tree, node) {
            return Err(TreeError::NotInTree {
                node,
                tree: self.tree,
            });
        }
        self.commit(node);
        Ok(())
    }

    pub fn is_cut(&self) -> bool {
        self.cut
    }

    /// Committed positions, oldest first.
    pub fn history(&self) -> &VecDeque<NodeId> {
        &self.history
    }

    pub fn find_path(&self, start: NodeId, target: NodeId) -> TreeResult<Path> {
        self.forest.find_path(self.tree, start, target)
    }

    /// Walks from the current node to `target`, running node actions in order.
    ///
    /// Fails fast: the first failing action (or unconfirmed checkin) stops the
    /// walk and the error is returned; nodes entered before it stay entered.
    #[instrument(level = "debug", skip(self))]
    pub fn navigate(&mut self, target: NodeId) -> TreeResult<Navigation> {
        if self.cut {
            return Err(TreeError::Cut(self.tree));
        }
        let start = self.current().ok_or(TreeError::EmptyTree(self.tree))?;
        if !self.forest.contains(self.tree, start) {
            return Err(TreeError::StalePosition {
                node: start,
                tree: self.tree,
            });
        }
        let path = self.find_path(start, target)?;
        debug!(%start, %target, edges = path.edge_count(), "navigating");

        let mut weight = 0.0;
        for edge in path.edges() {
            let actor = edge.child();
            let outcome = {
                let actions = self.forest.data(actor)?;
                match edge.direction {
                    Direction::Backward => actions.back(),
                    Direction::Forward => actions.to(),
                }
            };
            if let Err(source) = outcome {
                let reached = self.current.unwrap_or(start);
                warn!(node = %actor, direction = %edge.direction, %reached, "action failed");
                return Err(TreeError::Action {
                    node: actor,
                    direction: edge.direction,
                    reached,
                    source,
                });
            }

            self.check_in(edge.to)?;
            self.commit(edge.to);
            weight += edge.weight;
            trace!(node = %edge.to, weight, "reached");

            self.forest
                .data(edge.to)?
                .reached()
                .map_err(|source| TreeError::ReachedHook {
                    node: edge.to,
                    source,
                })?;
        }

        Ok(Navigation {
            current: target,
            weight,
            path,
        })
    }

    /// Enters the root by running its `to` action and lifts a previous cut.
    #[instrument(level = "debug", skip(self))]
    pub fn seed(&mut self) -> TreeResult<()> {
        let root = self.root().ok_or(TreeError::EmptyTree(self.tree))?;
        if let Err(source) = self.forest.data(root)?.to() {
            return Err(TreeError::Action {
                node: root,
                direction: Direction::Forward,
                reached: self.current.unwrap_or(root),
                source,
            });
        }
        self.cut = false;
        self.commit(root);
        debug!(%root, "seeded");
        Ok(())
    }

    /// Navigates back to the root, runs the root's `back` action and blocks
    /// navigation until [`ActionTree::seed`] is called.
    ///
    /// A failing step is returned as is and leaves the tree uncut.
    #[instrument(level = "debug", skip(self))]
    pub fn cut(&mut self) -> TreeResult<()> {
        if self.cut {
            return Err(TreeError::Cut(self.tree));
        }
        let root = self.root().ok_or(TreeError::EmptyTree(self.tree))?;
        self.navigate(root)?;
        if let Err(source) = self.forest.data(root)?.back() {
            return Err(TreeError::Action {
                node: root,
                direction: Direction::Backward,
                reached: root,
                source,
            });
        }
        self.cut = true;
        debug!(%root, "cut");
        Ok(())
    }

    /// Moves `node` and its subtree into `into`: under `parent`, or as root of
    /// `into` when `parent` is None. Returns the id of `node` inside `into`.
    ///
    /// The current node must not be part of the moved subtree.
    #[instrument(level = "debug", skip(self, into))]
    pub fn transplant(
        &mut self,
        node: NodeId,
        into: &mut ActionTree,
        parent: Option<NodeId>,
        weight: f64,
    ) -> TreeResult<NodeId> {
        if !self.forest.contains(self.tree, node) {
            return Err(TreeError::NotInTree {
                node,
                tree: self.tree,
            });
        }
        if let Some(current) = self.current() {
            let carried = current == node
                || self
                    .forest
                    .ancestors(current)
                    .is_ok_and(|ancestors| ancestors.contains(&node));
            if carried {
                return Err(TreeError::binding(
                    node,
                    "subtree holds the current node, navigate out of it first",
                ));
            }
        }
        let target = match parent {
            Some(p) if !into.forest.contains(into.tree, p) => {
                return Err(TreeError::NotInTree {
                    node: p,
                    tree: into.tree,
                })
            }
            Some(p) => GraftTarget::Node(p),
            None => GraftTarget::Tree(into.tree),
        };

        let moved = self
            .forest
            .transplant(node, &mut into.forest, target, weight)?;
        if parent.is_none() {
            into.commit(moved);
        }
        let forest = &self.forest;
        self.history.retain(|&id| forest.node(id).is_ok());
        Ok(moved)
    }

    fn check_in(&self, node: NodeId) -> TreeResult<()> {
        let Some(checkin) = self.forest.data(node)?.checkin() else {
            return Ok(());
        };
        let attempts = self.settings.checkin_persist.max(1);
        for attempt in 1..=attempts {
            if checkin.confirm() {
                return Ok(());
            }
            debug!(%node, attempt, "checkin not confirmed");
        }
        Err(TreeError::CheckinFailed { node, attempts })
    }

    fn commit(&mut self, node: NodeId) {
        self.current = Some(node);
        if self.settings.history_limit == 0 {
            return;
        }
        self.history.push_back(node);
        while self.history.len() > self.settings.history_limit {
            self.history.pop_front();
        }
    }
}
