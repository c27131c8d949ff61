//! Debug utilities: tree rendering and integrity checking.

use std::fmt;
use std::hash::Hash;

use crate::node::{Label, NodeId};
use crate::{Layout, PrefixIndex};

/// Relative tolerance for comparing accumulated float totals.
const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// One line per node, children indented two spaces below their parent:
///
/// ```text
/// ['c', 'a'] (72.0)
///   ['c', 'a', 'r'] (50.0)
///     ['c', 'a', 'r', 'e'] (30.0)
///       "care" (30.0)
///     "car" (20.0)
///   ['c', 'a', 't'] (22.0)
///     "cat" (22.0)
/// ```
///
/// An empty index renders as nothing.
impl<V: fmt::Debug, S: fmt::Debug, L: Layout> fmt::Display for PrefixIndex<V, S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = &self.tree.arena;
        if arena[NodeId::ROOT].children.is_empty() {
            return Ok(());
        }
        let mut stack = vec![(NodeId::ROOT, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = &arena[id];
            let indent = "  ".repeat(depth);
            match &node.label {
                Label::Prefix(p) => writeln!(f, "{indent}{:?} ({:?})", &p[..], node.weight)?,
                Label::Value(v) => writeln!(f, "{indent}{v:?} ({:?})", node.weight)?,
            }
            stack.extend(node.children.iter().rev().map(|&k| (k, depth + 1)));
        }
        Ok(())
    }
}

impl<V, S, L> PrefixIndex<V, S, L>
where
    V: Eq + Hash + Clone + fmt::Debug,
    S: Eq + Clone + fmt::Debug,
    L: Layout,
{
    /// Print the tree structure for debugging.
    pub fn debug_print(&self) {
        println!("=== {} index ({}) ===", L::NAME, self.config.aggregation);
        println!("Values: {}", self.len());
        if self.is_empty() {
            println!("(empty)");
        } else {
            print!("{self}");
        }
    }

    /// Verify tree integrity - returns list of issues found.
    pub fn verify_integrity(&self) -> Vec<String> {
        let tree = &self.tree;
        let aggregation = tree.aggregation;
        let mut issues = Vec::new();

        let root = tree.node(NodeId::ROOT);
        if root.parent.is_some() {
            issues.push("root has a parent".to_string());
        }
        if root.is_leaf() {
            issues.push("root is a leaf".to_string());
        }
        if root.children.is_empty() {
            if root.weight != 0.0 || root.tally.leaves != 0 {
                issues.push(format!("empty root weighs {:?}", root.weight));
            }
            if !root.prefix().is_empty() {
                issues.push(format!("empty root keeps prefix {:?}", root.prefix()));
            }
        }

        let mut reachable = 0;
        let mut leaves = 0;
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            reachable += 1;
            let node = tree.node(id);

            for &k in &node.children {
                if tree.parent(k) != Some(id) {
                    issues.push(format!(
                        "node {k:?} lists parent {:?}, expected {id:?}",
                        tree.parent(k)
                    ));
                }
            }
            for pair in node.children.windows(2) {
                if tree.order(pair[0], pair[1]).is_gt() {
                    issues.push(format!("children of {id:?} out of order at {:?}", pair[1]));
                }
            }

            match &node.label {
                Label::Value(value) => {
                    leaves += 1;
                    if !node.children.is_empty() {
                        issues.push(format!("leaf {id:?} has children"));
                    }
                    if node.tally.leaves != 1 || node.weight != node.tally.total {
                        issues.push(format!("leaf {id:?} tally {:?} disagrees", node.tally));
                    }
                    if !(node.weight.is_finite() && node.weight > 0.0) {
                        issues.push(format!("leaf {id:?} weighs {:?}", node.weight));
                    }
                    if tree.leaf_of(value) != Some(id) {
                        issues.push(format!("value {value:?} not indexed at {id:?}"));
                    }
                }
                Label::Prefix(prefix) => {
                    if id != NodeId::ROOT && node.children.is_empty() {
                        issues.push(format!("internal node {id:?} {:?} is empty", &prefix[..]));
                    }
                    let (mut total, mut count) = (0.0, 0);
                    for &k in &node.children {
                        let child = tree.node(k);
                        total += child.tally.total;
                        count += child.tally.leaves;
                    }
                    if count != node.tally.leaves || !approx_eq(total, node.tally.total) {
                        issues.push(format!(
                            "node {id:?} tally {:?} but children hold {total} over {count}",
                            node.tally
                        ));
                    }
                    if !approx_eq(node.weight, aggregation.weight(node.tally)) {
                        issues.push(format!(
                            "node {id:?} weighs {:?}, {aggregation} of tally is {:?}",
                            node.weight,
                            aggregation.weight(node.tally)
                        ));
                    }
                    L::audit(tree, id, &mut issues);
                }
            }

            stack.extend(node.children.iter().copied());
        }

        if leaves != tree.values.len() {
            issues.push(format!(
                "{leaves} reachable leaves but {} indexed values",
                tree.values.len()
            ));
        }
        if reachable != tree.arena.live() {
            issues.push(format!(
                "{reachable} reachable nodes but {} live slots",
                tree.arena.live()
            ));
        }
        issues
    }
}
