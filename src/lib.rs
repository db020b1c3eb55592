//! Weighted arena trees with path discovery, and action trees that run
//! per-node entry/exit actions while navigating between nodes.
//!
//! ```
//! use actiontree::{Forest, TreeResult};
//!
//! fn main() -> TreeResult<()> {
//!     let mut forest = Forest::new();
//!     let a = forest.add_node("A", ());
//!     let tree = forest.as_root(a)?;
//!     let b = forest.add_node("B", ());
//!     forest.set_child(a, b, 2.0)?;
//!     let c = forest.add_node("C", ());
//!     forest.set_child(b, c, 3.0)?;
//!     let d = forest.add_node("D", ());
//!     forest.set_child(b, d, 4.0)?;
//!
//!     let path = forest.find_path(tree, c, d)?;
//!     assert_eq!(path.nodes(), &[c, b, d]);
//!     assert_eq!(path.weight(), 7.0);
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod config;
pub mod domain;
pub mod tree_traits;
pub mod util;

pub use action::{Action, ActionResult, ActionTree, Actions, Navigation};
pub use config::{Settings, SettingsError};
pub use domain::{
    ActionError, Direction, Edge, Forest, GraftTarget, Metric, Node, NodeId, ParentalBond, Path,
    TreeError, TreeId, TreeResult,
};
pub use tree_traits::TreeRender;
