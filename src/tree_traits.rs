use termtree::Tree;
use tracing::instrument;

use crate::domain::{Forest, NodeId, TreeId, TreeResult};

/// Renders a tree of a forest for display.
pub trait TreeRender {
    fn to_tree_string(&self, tree: TreeId) -> TreeResult<Tree<String>>;
}

impl<T> TreeRender for Forest<T> {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self, tree: TreeId) -> TreeResult<Tree<String>> {
        let Some(root) = self.root(tree)? else {
            return Ok(Tree::new("Empty tree".to_string()));
        };

        fn build<T>(forest: &Forest<T>, node_idx: NodeId) -> TreeResult<Tree<String>> {
            let node = forest.node(node_idx)?;
            let label = match node.bond() {
                Some(bond) => format!("{} ({})", node.name(), bond.weight()),
                None => node.name().to_string(),
            };
            let leaves = node
                .children()
                .iter()
                .map(|&child| build(forest, child))
                .collect::<TreeResult<Vec<_>>>()?;
            Ok(Tree::new(label).with_leaves(leaves))
        }

        build(self, root)
    }
}
