//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::arena::{NodeId, TreeId};
use crate::domain::path::Direction;

/// Error returned by a node action (`to`, `back`, `on_reached`).
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// Domain errors represent violations of the tree invariants.
/// Every error is raised to the immediate caller; nothing is retried internally.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("invalid binding of node {node}: {reason}")]
    InvalidBinding { node: NodeId, reason: String },

    #[error("tree {0} has no root")]
    EmptyTree(TreeId),

    #[error("node {node} is not in tree {tree}")]
    NotInTree { node: NodeId, tree: TreeId },

    #[error("tree {0} already has a root")]
    DuplicateRoot(TreeId),

    #[error("path is not contiguous: {from} and {to} are not bound")]
    NonContiguousPath { from: NodeId, to: NodeId },

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("unknown tree: {0}")]
    UnknownTree(TreeId),

    #[error("{direction} action of node {node} failed, navigation stopped at {reached}")]
    Action {
        node: NodeId,
        direction: Direction,
        reached: NodeId,
        #[source]
        source: ActionError,
    },

    #[error("checkin of node {node} not confirmed after {attempts} attempts")]
    CheckinFailed { node: NodeId, attempts: u32 },

    #[error("current node {node} is no longer in tree {tree}, reset it with set_current")]
    StalePosition { node: NodeId, tree: TreeId },

    #[error("tree {0} is cut, seed it before navigating")]
    Cut(TreeId),

    #[error("on-reached action of node {node} failed")]
    ReachedHook {
        node: NodeId,
        #[source]
        source: ActionError,
    },
}

impl TreeError {
    pub(crate) fn binding(node: NodeId, reason: impl Into<String>) -> Self {
        Self::InvalidBinding {
            node,
            reason: reason.into(),
        }
    }
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
