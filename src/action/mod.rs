//! Action trees: trees whose nodes carry entry (`to`) and exit (`back`) actions

pub mod node;
pub mod tree;

pub use node::{Action, ActionResult, Actions, Checkin};
pub use tree::{ActionTree, Navigation};
