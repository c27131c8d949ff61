//! Structural policies: how prefixes are laid out as tree levels.
//!
//! [`Loose`] spends one level per symbol, so every internal child extends its
//! parent's prefix by exactly one symbol. [`Compact`] merges chains of
//! single-child internal nodes, so a label may span many symbols and the tree
//! never contains a node that could be folded into its only internal child.
//!
//! Both layouts are zero-sized and resolved at compile time; the engine in
//! [`crate::PrefixIndex`] is monomorphized per layout.

use std::fmt;
use std::hash::Hash;

use tracing::trace;

use crate::node::NodeId;
use crate::tree::{common_prefix_len, Tree};

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Loose {}
    impl Sealed for super::Compact {}
}

/// Compression policy of a [`PrefixIndex`](crate::PrefixIndex).
///
/// This trait is sealed; [`Loose`] and [`Compact`] are its only
/// implementations.
pub trait Layout: sealed::Sealed + Copy + Default + fmt::Debug + Send + Sync + 'static {
    /// Human readable layout name.
    const NAME: &'static str;

    /// File a value that is not yet stored under `prefix`.
    #[doc(hidden)]
    fn place<V, S>(tree: &mut Tree<V, S>, value: V, weight: f64, prefix: &[S])
    where
        V: Eq + Hash + Clone,
        S: Eq + Clone;

    /// Restore the layout invariants after a child of `parent` was detached.
    #[doc(hidden)]
    fn prune<V, S>(tree: &mut Tree<V, S>, parent: NodeId)
    where
        V: Eq + Hash + Clone,
        S: Eq + Clone;

    /// Report layout-specific invariant violations at internal node `id`.
    #[doc(hidden)]
    fn audit<V, S>(tree: &Tree<V, S>, id: NodeId, issues: &mut Vec<String>)
    where
        V: Eq + Hash + Clone,
        S: Eq + Clone + fmt::Debug;
}

// =============================================================================
// Loose: one symbol per level
// =============================================================================

/// Uncompressed layout: each edge consumes exactly one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Loose;

impl Layout for Loose {
    const NAME: &'static str = "loose";

    fn place<V, S>(tree: &mut Tree<V, S>, value: V, weight: f64, prefix: &[S])
    where
        V: Eq + Hash + Clone,
        S: Eq + Clone,
    {
        let mut node = NodeId::ROOT;
        for depth in 0..prefix.len() {
            let next = tree.children(node).iter().copied().find(|&k| {
                !tree.is_leaf(k) && tree.prefix(k).get(depth) == Some(&prefix[depth])
            });
            node = match next {
                Some(k) => k,
                None => {
                    let k = tree.new_internal(&prefix[..=depth]);
                    tree.attach(node, k);
                    k
                }
            };
        }
        tree.new_leaf(node, value, weight);
    }

    fn prune<V, S>(tree: &mut Tree<V, S>, parent: NodeId)
    where
        V: Eq + Hash + Clone,
        S: Eq + Clone,
    {
        let mut cur = parent;
        while tree.children(cur).is_empty() {
            let Some(up) = tree.parent(cur) else {
                tree.reset();
                return;
            };
            tree.detach(cur);
            tree.release(cur);
            trace!(node = ?cur, "pruned empty prefix node");
            cur = up;
        }
    }

    fn audit<V, S>(tree: &Tree<V, S>, id: NodeId, issues: &mut Vec<String>)
    where
        V: Eq + Hash + Clone,
        S: Eq + Clone + fmt::Debug,
    {
        let prefix = tree.prefix(id);
        if id == NodeId::ROOT && !prefix.is_empty() {
            issues.push(format!("loose root carries prefix {prefix:?}"));
        }
        for &k in tree.children(id) {
            if tree.is_leaf(k) {
                continue;
            }
            let child = tree.prefix(k);
            if child.len() != prefix.len() + 1 || !child.starts_with(prefix) {
                issues.push(format!(
                    "node {k:?} prefix {child:?} does not extend {prefix:?} by one symbol"
                ));
            }
        }
    }
}

// =============================================================================
// Compact: chains of single-child internal nodes are merged
// =============================================================================

/// Compressed layout: internal labels may span several symbols and no
/// internal node is compressible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Compact;

impl Compact {
    /// Give `value` a new internal child of `node` labelled `prefix`.
    fn branch<V, S>(tree: &mut Tree<V, S>, node: NodeId, value: V, weight: f64, prefix: &[S])
    where
        V: Eq + Hash + Clone,
        S: Eq + Clone,
    {
        let k = tree.new_internal(prefix);
        tree.attach(node, k);
        tree.new_leaf(k, value, weight);
    }

    /// Splice out `node`, whose only child `only` is internal.
    fn collapse<V, S>(tree: &mut Tree<V, S>, node: NodeId, only: NodeId)
    where
        V: Eq + Hash + Clone,
        S: Eq + Clone,
    {
        match tree.parent(node) {
            Some(up) => {
                tree.replace_child(up, node, only);
                trace!(node = ?node, child = ?only, "spliced compressible node");
            }
            None => tree.absorb_into_root(only),
        }
    }
}

impl Layout for Compact {
    const NAME: &'static str = "compact";

    fn place<V, S>(tree: &mut Tree<V, S>, value: V, weight: f64, prefix: &[S])
    where
        V: Eq + Hash + Clone,
        S: Eq + Clone,
    {
        if tree.is_empty() {
            tree.relabel(NodeId::ROOT, prefix);
            tree.new_leaf(NodeId::ROOT, value, weight);
            return;
        }

        let mut node = NodeId::ROOT;
        loop {
            let label = tree.prefix(node);
            let depth = label.len();
            let common = common_prefix_len(label, prefix);

            if common < depth {
                // Branching point falls inside this label.
                tree.push_down(node, common);
                if common == prefix.len() {
                    tree.new_leaf(node, value, weight);
                } else {
                    Self::branch(tree, node, value, weight, prefix);
                }
                return;
            }

            if depth == prefix.len() {
                tree.new_leaf(node, value, weight);
                return;
            }

            let next = tree.children(node).iter().copied().find(|&k| {
                !tree.is_leaf(k) && tree.prefix(k).get(depth) == Some(&prefix[depth])
            });
            match next {
                Some(k) => node = k,
                None => {
                    Self::branch(tree, node, value, weight, prefix);
                    return;
                }
            }
        }
    }

    fn prune<V, S>(tree: &mut Tree<V, S>, parent: NodeId)
    where
        V: Eq + Hash + Clone,
        S: Eq + Clone,
    {
        let mut cur = parent;
        loop {
            let kids = tree.children(cur);
            match (kids.len(), kids.first().copied()) {
                (0, _) => {
                    let Some(up) = tree.parent(cur) else {
                        tree.reset();
                        return;
                    };
                    tree.detach(cur);
                    tree.release(cur);
                    trace!(node = ?cur, "pruned empty prefix node");
                    cur = up;
                }
                (1, Some(only)) if !tree.is_leaf(only) => {
                    Self::collapse(tree, cur, only);
                    return;
                }
                _ => return,
            }
        }
    }

    fn audit<V, S>(tree: &Tree<V, S>, id: NodeId, issues: &mut Vec<String>)
    where
        V: Eq + Hash + Clone,
        S: Eq + Clone + fmt::Debug,
    {
        let prefix = tree.prefix(id);
        let kids = tree.children(id);
        if let [only] = *kids {
            if !tree.is_leaf(only) {
                issues.push(format!(
                    "node {id:?} prefix {prefix:?} is compressible into {only:?}"
                ));
            }
        }

        let mut seen: Vec<&S> = Vec::new();
        for &k in kids {
            if tree.is_leaf(k) {
                continue;
            }
            let child = tree.prefix(k);
            if child.len() <= prefix.len() || !child.starts_with(prefix) {
                issues.push(format!(
                    "node {k:?} prefix {child:?} does not strictly extend {prefix:?}"
                ));
                continue;
            }
            let next = &child[prefix.len()];
            if seen.contains(&next) {
                issues.push(format!(
                    "node {id:?} has two internal children branching on {next:?}"
                ));
            }
            seen.push(next);
        }
    }
}
