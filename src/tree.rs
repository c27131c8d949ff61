//! Layout-independent tree engine.
//!
//! [`Tree`] owns the node arena and the value index, and provides the
//! primitives both layouts build on: sibling ordering, weight propagation,
//! attaching and detaching subtrees, splitting and splicing, locating the node
//! that answers a query prefix, and ranked leaf retrieval.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;
use std::mem;

use tracing::trace;

use crate::aggregate::{Aggregation, Delta, Tally};
use crate::config::Retrieval;
use crate::node::{Arena, Label, Node, NodeId, Symbols};

/// Length of the longest common leading run of `a` and `b`.
#[inline]
pub fn common_prefix_len<S: PartialEq>(a: &[S], b: &[S]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

#[derive(Debug, Clone)]
pub struct Tree<V, S> {
    pub(crate) arena: Arena<V, S>,
    /// Leaf holding each stored value.
    pub(crate) values: HashMap<V, NodeId>,
    pub(crate) aggregation: Aggregation,
    next_seq: u64,
}

impl<V, S> Tree<V, S>
where
    V: Eq + Hash + Clone,
    S: Eq + Clone,
{
    pub fn new(aggregation: Aggregation, capacity: usize) -> Self {
        let mut arena = Arena::with_capacity(capacity.max(1));
        let root = arena.alloc(Node::internal(Symbols::new(), 0));
        debug_assert_eq!(root, NodeId::ROOT);
        Self {
            arena,
            values: HashMap::with_capacity(capacity),
            aggregation,
            next_seq: 1,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node<V, S> {
        &self.arena[id]
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.arena[id].children
    }

    #[inline]
    pub fn prefix(&self, id: NodeId) -> &[S] {
        self.arena[id].prefix()
    }

    #[inline]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.arena[id].is_leaf()
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arena[NodeId::ROOT].children.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn leaf_of(&self, value: &V) -> Option<NodeId> {
        self.values.get(value).copied()
    }

    /// Sibling order: heavier first, older first among equal weights.
    #[inline]
    pub fn order(&self, a: NodeId, b: NodeId) -> Ordering {
        let (a, b) = (&self.arena[a], &self.arena[b]);
        b.weight.total_cmp(&a.weight).then(a.seq.cmp(&b.seq))
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    // =========================================================================
    // Ordering and propagation
    // =========================================================================

    /// Link `child` under `parent` at its sorted position.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.arena[child].parent = Some(parent);
        let mut kids = mem::take(&mut self.arena[parent].children);
        let at = kids.partition_point(|&k| self.order(k, child).is_lt());
        kids.insert(at, child);
        self.arena[parent].children = kids;
    }

    /// Move `id` to its sorted position among its siblings after its weight
    /// changed.
    pub fn reposition(&mut self, id: NodeId) {
        let Some(parent) = self.arena[id].parent else {
            return;
        };
        let mut kids = mem::take(&mut self.arena[parent].children);
        if let Some(at) = kids.iter().position(|&k| k == id) {
            kids.remove(at);
        }
        let at = kids.partition_point(|&k| self.order(k, id).is_lt());
        kids.insert(at, id);
        self.arena[parent].children = kids;
    }

    /// Apply `delta` to `from` and every ancestor up to the root, re-sorting
    /// each touched node among its siblings.
    pub fn propagate(&mut self, from: NodeId, delta: Delta) {
        let aggregation = self.aggregation;
        let mut cur = Some(from);
        while let Some(id) = cur {
            let node = &mut self.arena[id];
            node.tally.apply(delta);
            node.weight = aggregation.weight(node.tally);
            cur = node.parent;
            self.reposition(id);
        }
    }

    // =========================================================================
    // Growth
    // =========================================================================

    /// Allocate an unattached internal node.
    pub fn new_internal(&mut self, prefix: &[S]) -> NodeId {
        let seq = self.next_seq();
        self.arena.alloc(Node::internal(Symbols::from(prefix), seq))
    }

    /// Hang a fresh leaf for `value` under `parent` and propagate its weight.
    pub fn new_leaf(&mut self, parent: NodeId, value: V, weight: f64) -> NodeId {
        let seq = self.next_seq();
        let leaf = self.arena.alloc(Node::leaf(value.clone(), weight, seq));
        self.values.insert(value, leaf);
        self.attach(parent, leaf);
        self.propagate(parent, Delta::added(weight));
        trace!(leaf = ?leaf, parent = ?parent, weight, "attached leaf");
        leaf
    }

    /// Add `weight` to an existing leaf.
    pub fn accumulate(&mut self, leaf: NodeId, weight: f64) {
        debug_assert!(self.is_leaf(leaf));
        self.propagate(leaf, Delta::accumulated(weight));
        trace!(leaf = ?leaf, weight, total = self.arena[leaf].weight, "accumulated weight");
    }

    /// Overwrite the prefix of an internal node.
    pub fn relabel(&mut self, id: NodeId, prefix: &[S]) {
        if let Label::Prefix(p) = &mut self.arena[id].label {
            *p = Symbols::from(prefix);
        }
    }

    /// Split `id` so that it keeps only the first `keep` symbols of its label.
    ///
    /// The original label, children and tally move into a new node that becomes
    /// the only child of `id`. The slot of `id` in its parent is unchanged, so
    /// nothing above it needs to be rewired.
    pub fn push_down(&mut self, id: NodeId, keep: usize) -> NodeId {
        let node = &mut self.arena[id];
        let lower_prefix = match &mut node.label {
            Label::Prefix(p) => {
                debug_assert!(keep < p.len());
                let lower = p.clone();
                p.truncate(keep);
                lower
            }
            Label::Value(_) => unreachable!("leaves are never split"),
        };
        let lower_node = Node {
            label: Label::Prefix(lower_prefix),
            children: mem::take(&mut node.children),
            tally: node.tally,
            weight: node.weight,
            parent: Some(id),
            seq: node.seq,
        };
        let lower = self.arena.alloc(lower_node);
        for i in 0..self.arena[lower].children.len() {
            let k = self.arena[lower].children[i];
            self.arena[k].parent = Some(lower);
        }
        self.arena[id].children.push(lower);
        trace!(node = ?id, lower = ?lower, keep, "split prefix");
        lower
    }

    // =========================================================================
    // Shrinking
    // =========================================================================

    /// Unlink `id` from its parent and subtract its tally from every ancestor.
    /// The subtree itself stays allocated.
    pub fn detach(&mut self, id: NodeId) -> Tally {
        let tally = self.arena[id].tally;
        let Some(parent) = self.arena[id].parent.take() else {
            return tally;
        };
        self.arena[parent].children.retain(|&k| k != id);
        if !tally.is_empty() {
            self.propagate(parent, Delta::detached(tally));
        }
        tally
    }

    /// Free an already detached subtree, forgetting every value stored in it.
    pub fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = self.arena.free(id);
            stack.extend(node.children);
            if let Label::Value(value) = node.label {
                self.values.remove(&value);
            }
        }
    }

    /// Put `child` into the slot `old` occupies under `parent` and free `old`
    /// itself. Children of `old` other than `child` must already be gone.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, child: NodeId) {
        if let Some(slot) = self.arena[parent].children.iter_mut().find(|k| **k == old) {
            *slot = child;
        }
        self.arena[child].parent = Some(parent);
        let old_node = self.arena.free(old);
        debug_assert!(old_node.children.iter().all(|&k| k == child));
        self.reposition(child);
    }

    /// Overwrite the root with the contents of its child `child`.
    pub fn absorb_into_root(&mut self, child: NodeId) {
        let node = self.arena.free(child);
        for &k in &node.children {
            self.arena[k].parent = Some(NodeId::ROOT);
        }
        let root = &mut self.arena[NodeId::ROOT];
        root.label = node.label;
        root.children = node.children;
        root.tally = node.tally;
        root.weight = node.weight;
        trace!(absorbed = ?child, "collapsed into root");
    }

    /// Drop every stored value and return the root to its canonical empty
    /// state.
    pub fn reset(&mut self) {
        let kids = mem::take(&mut self.arena[NodeId::ROOT].children);
        for k in kids {
            self.release(k);
        }
        let root = &mut self.arena[NodeId::ROOT];
        root.label = Label::Prefix(Symbols::new());
        root.tally = Tally::default();
        root.weight = 0.0;
        debug_assert!(self.values.is_empty());
        trace!("reset root");
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Shallowest node whose prefix starts with `prefix`, following the path
    /// `prefix` spells out. Every value filed under `prefix` or a longer prefix
    /// lives below it.
    pub fn locate(&self, prefix: &[S]) -> Option<NodeId> {
        let mut node = NodeId::ROOT;
        loop {
            let label = self.prefix(node);
            if label.len() >= prefix.len() {
                return label.starts_with(prefix).then_some(node);
            }
            if !prefix.starts_with(label) {
                return None;
            }
            let depth = label.len();
            node = self.children(node).iter().copied().find(|&k| {
                let k = &self.arena[k];
                !k.is_leaf() && k.prefix().get(depth) == Some(&prefix[depth])
            })?;
        }
    }

    /// Leaves below `id` in depth-first order.
    pub fn gather(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = &self.arena[id];
            if node.is_leaf() {
                out.push(id);
            } else {
                stack.extend(node.children.iter().rev());
            }
        }
    }

    /// Up to `limit` leaves below `id`, descending into the heaviest subtrees
    /// first and stopping once enough were found.
    fn gather_greedy(&self, id: NodeId, limit: usize) -> Vec<NodeId> {
        let mut hits = Vec::new();
        let node = &self.arena[id];
        if node.tally.leaves <= limit {
            self.gather(id, &mut hits);
        } else {
            for &k in &node.children {
                hits.extend(self.gather_greedy(k, limit));
                if hits.len() >= limit {
                    break;
                }
            }
            hits.truncate(limit);
        }
        self.rank(&mut hits);
        hits
    }

    fn rank(&self, hits: &mut [NodeId]) {
        hits.sort_by(|&a, &b| self.order(a, b));
    }

    /// Ranked `(value, weight)` pairs for every value whose prefix starts with
    /// `prefix`.
    pub fn complete(
        &self,
        prefix: &[S],
        limit: Option<usize>,
        retrieval: Retrieval,
    ) -> Vec<(V, f64)> {
        if limit == Some(0) {
            return Vec::new();
        }
        let Some(start) = self.locate(prefix) else {
            return Vec::new();
        };

        let hits = match (retrieval, limit) {
            (Retrieval::Greedy, Some(limit)) => self.gather_greedy(start, limit),
            (_, limit) => {
                let mut hits = Vec::with_capacity(self.arena[start].tally.leaves);
                self.gather(start, &mut hits);
                self.rank(&mut hits);
                if let Some(limit) = limit {
                    hits.truncate(limit);
                }
                hits
            }
        };

        hits.into_iter()
            .filter_map(|id| {
                let node = &self.arena[id];
                node.value().map(|v| (v.clone(), node.weight))
            })
            .collect()
    }
}
