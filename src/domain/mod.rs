//! Domain layer: arena trees, path discovery and their errors
//!
//! This layer is independent of external concerns (no I/O, no config loading).

pub mod arena;
pub mod error;
pub mod path;
pub mod traverse;

pub use arena::{Forest, GraftTarget, Node, NodeId, ParentalBond, TreeId, DEFAULT_BOND_WEIGHT};
pub use error::{ActionError, TreeError, TreeResult};
pub use path::{Direction, Edge, Metric, Path};
pub use traverse::{PostOrderIterator, TreeIterator};
