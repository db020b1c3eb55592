//! Structural operations: binding, explant, graft and copy.

use actiontree::util::testing;
use actiontree::{Forest, GraftTarget, NodeId, TreeError, TreeId};
use rstest::{fixture, rstest};

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

struct Scenario {
    forest: Forest<&'static str>,
    tree: TreeId,
    a: NodeId,
    b: NodeId,
    c: NodeId,
    d: NodeId,
}

//   A
//   └── B (2)
//       ├── C (3)
//       └── D (4)
#[fixture]
fn scenario() -> Scenario {
    let mut forest = Forest::new();
    let a = forest.add_node("A", "a");
    let tree = forest.as_root(a).unwrap();
    let b = forest.add_node("B", "b");
    forest.set_child(a, b, 2.0).unwrap();
    let c = forest.add_node("C", "c");
    forest.set_child(b, c, 3.0).unwrap();
    let d = forest.add_node("D", "d");
    forest.set_child(b, d, 4.0).unwrap();
    Scenario {
        forest,
        tree,
        a,
        b,
        c,
        d,
    }
}

fn assert_bond_invariant<T>(forest: &Forest<T>, nodes: &[NodeId]) {
    for &id in nodes {
        let node = forest.node(id).unwrap();
        assert_eq!(
            node.parent().is_some(),
            node.bond().is_some(),
            "parent and bond must come together for {}",
            node.name()
        );
        if let Some(parent) = node.parent() {
            let siblings = forest.node(parent).unwrap().children();
            assert_eq!(siblings.iter().filter(|&&s| s == id).count(), 1);
        }
    }
}

// ============================================================
// Binding
// ============================================================

#[rstest]
fn given_standalone_node_when_created_then_has_no_parent_and_no_tree() {
    let mut forest = Forest::new();
    let node = forest.add_node("example", 42);
    let n = forest.node(node).unwrap();
    assert_eq!(n.name(), "example");
    assert_eq!(*n.data(), 42);
    assert_eq!(n.parent(), None);
    assert_eq!(n.tree(), None);
    assert!(n.bond().is_none());
    assert!(!n.is_root());
    assert!(!forest.is_leaf(node).unwrap());
}

#[rstest]
fn given_tree_member_when_set_child_then_child_is_bound(scenario: Scenario) {
    let Scenario {
        forest, tree, b, c, d, ..
    } = scenario;
    let child = forest.node(c).unwrap();
    assert_eq!(child.parent(), Some(b));
    assert_eq!(child.tree(), Some(tree));
    assert_eq!(child.bond().unwrap().weight(), 3.0);
    assert_eq!(forest.node(b).unwrap().children(), &[c, d]);

    let path = forest.find_path(tree, b, c).unwrap();
    assert_eq!(forest.path_weight(path.nodes()).unwrap(), 3.0);
}

#[rstest]
fn given_scenario_when_inspecting_nodes_then_bond_invariant_holds(scenario: Scenario) {
    let nodes = scenario.forest.nodes(scenario.tree).unwrap();
    assert_eq!(nodes, vec![scenario.a, scenario.b, scenario.c, scenario.d]);
    assert_bond_invariant(&scenario.forest, &nodes);
    assert!(scenario.forest.node(scenario.a).unwrap().is_root());
}

#[rstest]
fn given_child_with_parent_when_set_child_again_then_invalid_binding(mut scenario: Scenario) {
    let err = scenario
        .forest
        .set_child(scenario.a, scenario.c, 1.0)
        .unwrap_err();
    assert!(matches!(err, TreeError::InvalidBinding { node, .. } if node == scenario.c));
    // nothing moved
    assert_eq!(scenario.forest.node(scenario.c).unwrap().parent(), Some(scenario.b));
    assert_eq!(scenario.forest.node(scenario.a).unwrap().children(), &[scenario.b]);
}

#[rstest]
fn given_parent_outside_any_tree_when_set_child_then_invalid_binding() {
    let mut forest = Forest::new();
    let parent = forest.add_node("parent", ());
    let child = forest.add_node("child", ());
    let err = forest.set_child(parent, child, 1.0).unwrap_err();
    assert!(matches!(err, TreeError::InvalidBinding { node, .. } if node == parent));
    assert!(forest.node(parent).unwrap().children().is_empty());
}

#[rstest]
fn given_root_of_other_tree_when_set_child_then_invalid_binding(mut scenario: Scenario) {
    let other = scenario.forest.add_node("other", "o");
    scenario.forest.as_root(other).unwrap();
    let err = scenario.forest.set_child(scenario.d, other, 1.0).unwrap_err();
    assert!(matches!(err, TreeError::InvalidBinding { .. }));
}

#[rstest]
fn given_node_when_set_child_to_itself_then_invalid_binding(mut scenario: Scenario) {
    let err = scenario
        .forest
        .set_child(scenario.b, scenario.b, 1.0)
        .unwrap_err();
    assert!(matches!(err, TreeError::InvalidBinding { .. }));
}

#[rstest]
fn given_set_parent_when_called_then_delegates_to_set_child(mut scenario: Scenario) {
    let e = scenario.forest.add_node("E", "e");
    scenario.forest.set_parent(e, scenario.d, 5.0).unwrap();
    assert_eq!(scenario.forest.node(e).unwrap().parent(), Some(scenario.d));
    assert_eq!(scenario.forest.node(scenario.d).unwrap().children(), &[e]);
    assert_eq!(
        scenario.forest.find_path(scenario.tree, scenario.a, e).unwrap().weight(),
        11.0
    );
}

#[rstest]
fn given_bind_when_no_weight_given_then_default_weight_is_used() {
    let mut forest = Forest::with_default_weight(2.5);
    let root = forest.add_node("root", ());
    forest.as_root(root).unwrap();
    let child = forest.add_node("child", ());
    forest.bind(root, child).unwrap();
    assert_eq!(forest.node(child).unwrap().bond().unwrap().weight(), 2.5);
}

#[rstest]
fn given_standalone_subtree_when_bound_then_descendants_join_tree(mut scenario: Scenario) {
    let detached = scenario.forest.explant(scenario.b).unwrap();
    assert_eq!(scenario.forest.node(scenario.c).unwrap().tree(), None);

    scenario.forest.set_child(scenario.a, detached, 9.0).unwrap();
    for id in [scenario.b, scenario.c, scenario.d] {
        assert_eq!(scenario.forest.node(id).unwrap().tree(), Some(scenario.tree));
    }
}

// ============================================================
// Leaves and roots
// ============================================================

#[rstest]
#[case::root(0, false)]
#[case::inner(1, false)]
#[case::leaf(2, true)]
fn given_tree_member_when_is_leaf_then_true_only_without_children(
    scenario: Scenario,
    #[case] index: usize,
    #[case] expected: bool,
) {
    let node = [scenario.a, scenario.b, scenario.c][index];
    assert_eq!(scenario.forest.is_leaf(node).unwrap(), expected);
}

#[rstest]
fn given_parented_node_when_as_root_then_invalid_binding(mut scenario: Scenario) {
    let trees_before = scenario.forest.tree_count();
    let err = scenario.forest.as_root(scenario.b).unwrap_err();
    assert!(matches!(err, TreeError::InvalidBinding { .. }));
    assert_eq!(scenario.forest.tree_count(), trees_before);
}

#[rstest]
fn given_non_empty_tree_when_set_root_then_duplicate_root(mut scenario: Scenario) {
    let other = scenario.forest.add_node("other", "o");
    let err = scenario.forest.set_root(scenario.tree, other).unwrap_err();
    assert!(matches!(err, TreeError::DuplicateRoot(t) if t == scenario.tree));
}

// ============================================================
// Explant
// ============================================================

#[rstest]
fn given_inner_node_when_explant_then_subtree_leaves_tree_but_keeps_links(mut scenario: Scenario) {
    let returned = scenario.forest.explant(scenario.b).unwrap();
    assert_eq!(returned, scenario.b);

    let b = scenario.forest.node(scenario.b).unwrap();
    assert_eq!(b.parent(), None);
    assert!(b.bond().is_none());
    assert_eq!(b.tree(), None);
    assert_eq!(b.children(), &[scenario.c, scenario.d]);
    for id in [scenario.c, scenario.d] {
        let n = scenario.forest.node(id).unwrap();
        assert_eq!(n.tree(), None);
        assert_eq!(n.parent(), Some(scenario.b));
    }
    assert!(scenario.forest.node(scenario.a).unwrap().children().is_empty());
    assert_eq!(scenario.forest.nodes(scenario.tree).unwrap(), vec![scenario.a]);
    assert_bond_invariant(&scenario.forest, &[scenario.a, scenario.b, scenario.c, scenario.d]);
}

#[rstest]
fn given_root_when_explant_then_invalid_binding(mut scenario: Scenario) {
    let err = scenario.forest.explant(scenario.a).unwrap_err();
    assert!(matches!(err, TreeError::InvalidBinding { node, .. } if node == scenario.a));
}

#[rstest]
fn given_explanted_node_when_find_path_then_not_in_tree(mut scenario: Scenario) {
    scenario.forest.explant(scenario.c).unwrap();
    let err = scenario
        .forest
        .find_path(scenario.tree, scenario.a, scenario.c)
        .unwrap_err();
    assert!(matches!(err, TreeError::NotInTree { node, .. } if node == scenario.c));
}

// ============================================================
// Graft
// ============================================================

#[rstest]
fn given_leaf_when_grafted_to_sibling_then_path_goes_through_sibling(mut scenario: Scenario) {
    let Scenario { a, b, c, d, tree, .. } = scenario;
    scenario.forest.graft(c, GraftTarget::Node(d), 1.0).unwrap();

    let path = scenario.forest.find_path(tree, a, c).unwrap();
    assert_eq!(path.nodes(), &[a, b, d, c]);
    assert_eq!(path.weight(), 7.0);
    assert!(!scenario.forest.node(b).unwrap().children().contains(&c));
    assert_eq!(scenario.forest.node(c).unwrap().parent(), Some(d));
}

#[rstest]
fn given_subtree_when_grafted_to_empty_tree_then_becomes_root(mut scenario: Scenario) {
    let target = scenario.forest.new_tree();
    scenario
        .forest
        .graft(scenario.b, GraftTarget::Tree(target), 1.0)
        .unwrap();

    assert_eq!(scenario.forest.root(target).unwrap(), Some(scenario.b));
    let path = scenario
        .forest
        .find_path(target, scenario.c, scenario.d)
        .unwrap();
    assert_eq!(path.weight(), 7.0);
    // gone from the old tree
    let err = scenario
        .forest
        .find_path(scenario.tree, scenario.a, scenario.c)
        .unwrap_err();
    assert!(matches!(err, TreeError::NotInTree { .. }));
}

#[rstest]
fn given_non_empty_tree_when_grafted_then_duplicate_root_and_nothing_changes(
    mut scenario: Scenario,
) {
    let other = scenario.forest.add_node("other", "o");
    let other_tree = scenario.forest.as_root(other).unwrap();

    let err = scenario
        .forest
        .graft(scenario.c, GraftTarget::Tree(other_tree), 1.0)
        .unwrap_err();
    assert!(matches!(err, TreeError::DuplicateRoot(t) if t == other_tree));
    assert_eq!(scenario.forest.node(scenario.c).unwrap().parent(), Some(scenario.b));
    assert_eq!(scenario.forest.node(scenario.c).unwrap().tree(), Some(scenario.tree));
}

#[rstest]
fn given_node_when_grafted_under_own_descendant_then_invalid_binding(mut scenario: Scenario) {
    let err = scenario
        .forest
        .graft(scenario.b, GraftTarget::Node(scenario.c), 1.0)
        .unwrap_err();
    assert!(matches!(err, TreeError::InvalidBinding { .. }));
    assert_eq!(scenario.forest.node(scenario.b).unwrap().parent(), Some(scenario.a));
    assert_eq!(scenario.forest.size(scenario.tree).unwrap(), 4);
}

#[rstest]
fn given_root_of_tree_when_grafted_to_other_tree_then_source_tree_is_empty(
    mut scenario: Scenario,
) {
    let host = scenario.forest.add_node("host", "h");
    let host_tree = scenario.forest.as_root(host).unwrap();

    scenario
        .forest
        .graft(scenario.a, GraftTarget::Node(host), 2.0)
        .unwrap();

    assert_eq!(scenario.forest.root(scenario.tree).unwrap(), None);
    assert_eq!(scenario.forest.size(host_tree).unwrap(), 5);
    let path = scenario.forest.find_path(host_tree, host, scenario.d).unwrap();
    assert_eq!(path.weight(), 8.0);
}

#[rstest]
fn given_tree_when_graft_tree_then_moves_under_target(mut scenario: Scenario) {
    let mut_forest = &mut scenario.forest;
    let x = mut_forest.add_node("X", "x");
    let small = mut_forest.as_root(x).unwrap();
    let y = mut_forest.add_node("Y", "y");
    mut_forest.set_child(x, y, 1.5).unwrap();

    mut_forest.graft_tree(small, scenario.d, 0.5).unwrap();

    assert_eq!(mut_forest.root(small).unwrap(), None);
    let path = mut_forest.find_path(scenario.tree, scenario.c, y).unwrap();
    assert_eq!(path.nodes(), &[scenario.c, scenario.b, scenario.d, x, y]);
    assert_eq!(path.weight(), 3.0 + 4.0 + 0.5 + 1.5);
}

#[rstest]
fn given_empty_tree_when_graft_tree_then_empty_tree_error(mut scenario: Scenario) {
    let empty = scenario.forest.new_tree();
    let err = scenario
        .forest
        .graft_tree(empty, scenario.a, 1.0)
        .unwrap_err();
    assert!(matches!(err, TreeError::EmptyTree(t) if t == empty));
}

#[rstest]
fn given_same_tree_when_graft_tree_then_invalid_binding(mut scenario: Scenario) {
    let err = scenario
        .forest
        .graft_tree(scenario.tree, scenario.d, 1.0)
        .unwrap_err();
    assert!(matches!(err, TreeError::InvalidBinding { .. }));
}

// ============================================================
// Copy
// ============================================================

#[rstest]
fn given_grafted_copy_when_copied_then_sibling_with_same_weight(mut scenario: Scenario) {
    let copy = scenario.forest.copy(scenario.b, "B2", true).unwrap();
    let node = scenario.forest.node(copy).unwrap();
    assert_eq!(node.name(), "B2");
    assert_eq!(*node.data(), "b");
    assert_eq!(node.parent(), Some(scenario.a));
    assert_eq!(node.bond().unwrap().weight(), 2.0);
    assert!(node.children().is_empty(), "copy is shallow");
    assert_eq!(
        scenario.forest.node(scenario.a).unwrap().children(),
        &[scenario.b, copy]
    );
}

#[rstest]
fn given_standalone_copy_when_copied_then_detached(mut scenario: Scenario) {
    let copy = scenario.forest.copy(scenario.c, "C2", false).unwrap();
    let node = scenario.forest.node(copy).unwrap();
    assert_eq!(node.parent(), None);
    assert_eq!(node.tree(), None);
}

#[rstest]
fn given_root_when_grafted_copy_then_invalid_binding(mut scenario: Scenario) {
    let err = scenario.forest.copy(scenario.a, "A2", true).unwrap_err();
    assert!(matches!(err, TreeError::InvalidBinding { .. }));
}

#[rstest]
fn given_subtree_when_copy_subtree_then_structure_and_weights_duplicated(mut scenario: Scenario) {
    let copy = scenario.forest.copy_subtree(scenario.b, "B2", true).unwrap();

    let children = scenario.forest.node(copy).unwrap().children().to_vec();
    assert_eq!(children.len(), 2);
    let names: Vec<_> = children
        .iter()
        .map(|&c| scenario.forest.node(c).unwrap().name().to_string())
        .collect();
    assert_eq!(names, vec!["C", "D"]);
    assert_eq!(scenario.forest.size(scenario.tree).unwrap(), 7);

    let path = scenario
        .forest
        .find_path(scenario.tree, scenario.c, children[1])
        .unwrap();
    assert_eq!(path.nodes(), &[scenario.c, scenario.b, scenario.a, copy, children[1]]);
    assert_eq!(path.weight(), 3.0 + 2.0 + 2.0 + 4.0);
}

#[rstest]
fn given_standalone_subtree_copy_when_rooted_then_usable_as_tree(mut scenario: Scenario) {
    let copy = scenario.forest.copy_subtree(scenario.b, "B2", false).unwrap();
    assert_eq!(scenario.forest.node(copy).unwrap().tree(), None);

    let tree = scenario.forest.as_root(copy).unwrap();
    assert_eq!(scenario.forest.size(tree).unwrap(), 3);
    assert_eq!(scenario.forest.size(scenario.tree).unwrap(), 4);
}

// ============================================================
// Foreign ids, removal and transplant
// ============================================================

fn other_forest() -> (Forest<&'static str>, TreeId, NodeId) {
    let mut forest = Forest::new();
    let r = forest.add_node("R", "r");
    let tree = forest.as_root(r).unwrap();
    (forest, tree, r)
}

#[rstest]
fn given_id_of_other_forest_when_used_then_unknown_and_never_aliased(scenario: Scenario) {
    let (mut other, other_tree, r) = other_forest();
    let stranger = other.add_node("S", "s");
    other.set_child(r, stranger, 1.0).unwrap();

    assert!(matches!(other.node(scenario.a), Err(TreeError::UnknownNode(id)) if id == scenario.a));
    assert!(matches!(other.root(scenario.tree), Err(TreeError::UnknownTree(t)) if t == scenario.tree));
    assert!(!other.contains(other_tree, scenario.b));
    assert!(matches!(
        other.set_child(r, scenario.b, 1.0),
        Err(TreeError::UnknownNode(id)) if id == scenario.b
    ));
    let err = other.find_path(other_tree, r, scenario.b).unwrap_err();
    assert!(matches!(err, TreeError::NotInTree { node, .. } if node == scenario.b));
    assert_ne!(scenario.a, r);
}

#[rstest]
fn given_subtree_when_removed_then_payloads_returned_and_ids_unknown(mut scenario: Scenario) {
    let removed = scenario.forest.remove_subtree(scenario.b).unwrap();

    assert_eq!(removed, vec!["b", "c", "d"]);
    for id in [scenario.b, scenario.c, scenario.d] {
        assert!(matches!(scenario.forest.node(id), Err(TreeError::UnknownNode(_))));
    }
    assert!(scenario.forest.node(scenario.a).unwrap().children().is_empty());
    assert_eq!(scenario.forest.size(scenario.tree).unwrap(), 1);

    // freed slots are reused under a new generation
    let fresh = scenario.forest.add_node("E", "e");
    assert_ne!(fresh, scenario.b);
    assert!(scenario.forest.node(scenario.b).is_err());
    assert_eq!(scenario.forest.node_count(), 2);
}

#[rstest]
fn given_tree_when_removed_then_tree_and_members_gone(mut scenario: Scenario) {
    let removed = scenario.forest.remove_tree(scenario.tree).unwrap();

    assert_eq!(removed.len(), 4);
    assert_eq!(scenario.forest.node_count(), 0);
    assert_eq!(scenario.forest.tree_count(), 0);
    assert!(matches!(
        scenario.forest.root(scenario.tree),
        Err(TreeError::UnknownTree(_))
    ));
}

#[rstest]
fn given_subtree_when_transplanted_then_moves_with_structure_and_weights(mut scenario: Scenario) {
    let (mut other, other_tree, r) = other_forest();

    let moved = scenario
        .forest
        .transplant(scenario.b, &mut other, GraftTarget::Node(r), 5.0)
        .unwrap();

    assert!(scenario.forest.node(scenario.a).unwrap().children().is_empty());
    assert!(scenario.forest.node(scenario.b).is_err());

    let names: Vec<_> = other
        .iter(other_tree)
        .unwrap()
        .map(|(_, node)| node.name().to_string())
        .collect();
    assert_eq!(names, vec!["R", "B", "C", "D"]);
    let d = other.find_node(other_tree, &["D"], false).unwrap().unwrap();
    let path = other.find_path(other_tree, r, d).unwrap();
    assert_eq!(path.nodes()[1], moved);
    assert_eq!(path.weight(), 9.0);
    assert_eq!(*other.data(moved).unwrap(), "b");
}

#[rstest]
fn given_empty_tree_when_transplanted_as_root_then_becomes_root(mut scenario: Scenario) {
    let mut other: Forest<&'static str> = Forest::new();
    let empty = other.new_tree();

    let moved = scenario
        .forest
        .transplant(scenario.a, &mut other, GraftTarget::Tree(empty), 1.0)
        .unwrap();

    assert_eq!(other.root(empty).unwrap(), Some(moved));
    assert_eq!(other.size(empty).unwrap(), 4);
    assert_eq!(scenario.forest.root(scenario.tree).unwrap(), None);
}

#[rstest]
fn given_occupied_tree_when_transplanted_then_duplicate_root_and_nothing_moves(
    mut scenario: Scenario,
) {
    let (mut other, other_tree, _) = other_forest();

    let err = scenario
        .forest
        .transplant(scenario.b, &mut other, GraftTarget::Tree(other_tree), 1.0)
        .unwrap_err();

    assert!(matches!(err, TreeError::DuplicateRoot(t) if t == other_tree));
    assert_eq!(scenario.forest.size(scenario.tree).unwrap(), 4);
    assert_eq!(other.size(other_tree).unwrap(), 1);
}
