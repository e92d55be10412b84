//! Property tests for the tree store and its queries
//!
//! Run with: cargo test --package flowsplit-tree --test tree_props

use flowsplit_tree::{DecompositionNode, DecompositionTree, NodeId};
use proptest::prelude::*;
use std::collections::HashSet;

/// Each op: (selector for the target node, number of children to attach)
fn ops_strategy() -> impl Strategy<Value = Vec<(usize, usize)>> {
    proptest::collection::vec((any::<usize>(), 0usize..4), 0..16)
}

fn build(ops: &[(usize, usize)]) -> DecompositionTree {
    let mut tree = DecompositionTree::new();
    tree.set_root(DecompositionNode::root("root"));

    for (step, (selector, count)) in ops.iter().enumerate() {
        let ids: Vec<NodeId> = tree
            .root()
            .map(|r| r.iter().map(DecompositionNode::id).collect())
            .unwrap_or_default();
        let target = ids[selector % ids.len()];

        #[allow(clippy::cast_precision_loss)]
        let children = (0..*count)
            .map(|i| DecompositionNode::child(format!("n{step}.{i}"), 1.0 / *count as f64))
            .collect();
        tree.attach_children(target, children).unwrap();
    }
    tree
}

fn all_ids(tree: &DecompositionTree) -> Vec<NodeId> {
    tree.root()
        .map(|r| r.iter().map(DecompositionNode::id).collect())
        .unwrap_or_default()
}

proptest! {
    #[test]
    fn prop_child_depth_is_parent_plus_one(ops in ops_strategy()) {
        let tree = build(&ops);
        let root = tree.root().unwrap();
        prop_assert_eq!(root.depth(), 0);

        for node in root {
            for child in node.children() {
                prop_assert_eq!(child.depth(), node.depth() + 1);
            }
        }
    }

    #[test]
    fn prop_queries_are_consistent(ops in ops_strategy()) {
        let tree = build(&ops);
        let root_id = tree.root().unwrap().id();

        let root_lineage = tree.ancestors_and_siblings(root_id).unwrap();
        prop_assert!(root_lineage.ancestors.is_empty());
        prop_assert!(root_lineage.siblings.is_empty());

        for id in all_ids(&tree) {
            let lineage = tree.ancestors_and_siblings(id).unwrap();
            prop_assert!(!lineage.siblings.contains(&id));
            prop_assert_eq!(lineage.ancestors.len(), tree.get(id).unwrap().depth());

            for ancestor in &lineage.ancestors {
                prop_assert!(tree.descendants(*ancestor).unwrap().contains(&id));
            }

            let descendants = tree.descendants(id).unwrap();
            prop_assert_eq!(descendants.first(), Some(&id));
        }
    }

    #[test]
    fn prop_leaf_highlight_has_no_descendants(ops in ops_strategy()) {
        let tree = build(&ops);

        for id in all_ids(&tree) {
            if !tree.get(id).unwrap().is_leaf() {
                continue;
            }
            let lineage = tree.ancestors_and_siblings(id).unwrap();
            let expected: HashSet<NodeId> = std::iter::once(id)
                .chain(lineage.ancestors)
                .chain(lineage.siblings)
                .collect();
            let got: HashSet<NodeId> = tree.highlight_for_node(id).unwrap().iter().collect();
            prop_assert_eq!(got, expected);
        }
    }

    #[test]
    fn prop_reset_twice_is_empty(ops in ops_strategy()) {
        let mut tree = build(&ops);
        tree.reset();
        tree.reset();
        prop_assert!(tree.is_empty());
        prop_assert_eq!(tree.len(), 0);
        prop_assert!(tree.outline(None).is_empty());
    }
}
