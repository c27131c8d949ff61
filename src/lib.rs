//! # prefix-rank
//!
//! A weighted prefix index for autocompletion.
//!
//! Values are filed under a prefix, a sequence of arbitrary comparable symbols
//! (characters, words, path segments, ...), together with a positive weight.
//! Queries return the stored values whose prefix starts with the query,
//! heaviest first. Removal drops a whole prefix and everything beneath it.
//!
//! Internal nodes carry an aggregate of the leaf weights below them (sum or
//! mean), and siblings are kept sorted by weight, so the heaviest completions
//! are always reachable first.
//!
//! Limited queries descend into the heaviest subtrees first and stop once
//! enough values were found, so a heavy value in a light subtree can be passed
//! over. [`Retrieval::Exhaustive`] ranks every match instead.
//!
//! Two layouts share one engine:
//!
//! - [`LooseIndex`]: one tree level per symbol.
//! - [`CompactIndex`]: radix-tree style, chains of single-child internal nodes
//!   are merged into multi-symbol labels.
//!
//! ## Example
//!
//! ```rust
//! use prefix_rank::{Aggregation, CompactIndex};
//!
//! let mut index: CompactIndex<&str, char> = CompactIndex::new(Aggregation::Sum);
//! index.insert("car", 20.0, &['c', 'a', 'r']).unwrap();
//! index.insert("care", 30.0, &['c', 'a', 'r', 'e']).unwrap();
//! index.insert("cat", 22.0, &['c', 'a', 't']).unwrap();
//!
//! assert_eq!(
//!     index.autocomplete(&['c'], Some(2)),
//!     vec![("care", 30.0), ("car", 20.0)]
//! );
//!
//! index.remove(&['c', 'a', 'r']);
//! assert_eq!(index.autocomplete(&['c'], None), vec![("cat", 22.0)]);
//! ```
//!
//! ## Concurrency
//!
//! The index is a plain single-threaded structure. Callers sharing one index
//! across threads must serialize access themselves, e.g. one lock around
//! every operation.

#![warn(clippy::all)]

mod aggregate;
mod config;
mod debug;
mod error;
mod layout;
mod node;
mod tree;

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use tracing::debug;

pub use aggregate::Aggregation;
pub use config::{Config, Retrieval};
pub use error::{Error, Result};
pub use layout::{Compact, Layout, Loose};

use node::NodeId;
use tree::Tree;

/// The autocompleter abstract data type.
///
/// Implemented by every [`PrefixIndex`] layout so callers can choose a layout
/// at runtime behind `Box<dyn Autocompleter<V, S>>`.
pub trait Autocompleter<V, S> {
    /// Number of distinct stored values.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// File `value` under `prefix` with `weight`, or add `weight` to it if the
    /// value is already stored under the same prefix.
    fn insert(&mut self, value: V, weight: f64, prefix: &[S]) -> Result<()>;

    /// Up to `limit` stored values whose prefix starts with `prefix`, in
    /// non-increasing weight order. `None` returns every match.
    fn autocomplete(&self, prefix: &[S], limit: Option<usize>) -> Vec<(V, f64)>;

    /// Remove every value filed under `prefix` or a longer prefix.
    fn remove(&mut self, prefix: &[S]);
}

/// Weighted prefix index with compile-time layout `L`.
pub struct PrefixIndex<V, S, L> {
    tree: Tree<V, S>,
    config: Config,
    _layout: PhantomData<L>,
}

/// Uncompressed index: one level per prefix symbol.
pub type LooseIndex<V, S> = PrefixIndex<V, S, Loose>;

/// Compressed index: radix-tree style labels.
pub type CompactIndex<V, S> = PrefixIndex<V, S, Compact>;

impl<V, S, L> PrefixIndex<V, S, L>
where
    V: Eq + Hash + Clone,
    S: Eq + Clone,
    L: Layout,
{
    /// Create an empty index aggregating internal weights with `aggregation`.
    pub fn new(aggregation: Aggregation) -> Self {
        Self::with_config(Config::new(aggregation))
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            tree: Tree::new(config.aggregation, config.initial_capacity),
            config,
            _layout: PhantomData,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn aggregation(&self) -> Aggregation {
        self.config.aggregation
    }

    /// Number of distinct stored values.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Alias of [`len`](Self::len).
    #[inline]
    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Aggregate weight of the whole index; zero when empty.
    pub fn weight(&self) -> f64 {
        self.tree.node(NodeId::ROOT).weight
    }

    /// Accumulated weight of a stored value.
    pub fn weight_of(&self, value: &V) -> Option<f64> {
        self.tree.leaf_of(value).map(|leaf| self.tree.node(leaf).weight)
    }

    pub fn contains(&self, value: &V) -> bool {
        self.tree.leaf_of(value).is_some()
    }

    /// Insert `value` under `prefix` with `weight`.
    ///
    /// Re-inserting a stored value adds `weight` to its existing weight. The
    /// value must then be given the same prefix it was first filed under.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidWeight`] if `weight` is not a positive finite number,
    ///   or if adding it would overflow the aggregate weight of the index.
    /// - [`Error::PrefixMismatch`] if `value` is stored under another prefix.
    ///
    /// The index is left untouched when an error is returned.
    pub fn insert(&mut self, value: V, weight: f64, prefix: &[S]) -> Result<()> {
        if !(weight.is_finite() && weight > 0.0) {
            debug!(weight, "rejected insert: invalid weight");
            return Err(Error::InvalidWeight(weight));
        }
        let total = self.tree.node(NodeId::ROOT).tally.total;
        if !(total + weight).is_finite() {
            debug!(weight, total, "rejected insert: aggregate overflow");
            return Err(Error::InvalidWeight(weight));
        }

        if let Some(leaf) = self.tree.leaf_of(&value) {
            let filed_under = self.tree.parent(leaf).map(|p| self.tree.prefix(p));
            if filed_under != Some(prefix) {
                debug!(prefix_len = prefix.len(), "rejected insert: prefix mismatch");
                return Err(Error::PrefixMismatch);
            }
            self.tree.accumulate(leaf, weight);
            return Ok(());
        }

        L::place(&mut self.tree, value, weight, prefix);
        Ok(())
    }

    /// Up to `limit` stored values whose prefix starts with `prefix`, heaviest
    /// first. Equal weights keep insertion order. `Some(0)` yields nothing and
    /// `None` yields every match.
    pub fn autocomplete(&self, prefix: &[S], limit: Option<usize>) -> Vec<(V, f64)> {
        self.tree.complete(prefix, limit, self.config.retrieval)
    }

    /// Remove every value filed under `prefix` or under a longer prefix that
    /// starts with it. A prefix that matches nothing is a no-op.
    pub fn remove(&mut self, prefix: &[S]) {
        let Some(target) = self.tree.locate(prefix) else {
            return;
        };

        let Some(parent) = self.tree.parent(target) else {
            debug!(removed = self.tree.len(), "removed every value");
            self.tree.reset();
            return;
        };

        let tally = self.tree.detach(target);
        self.tree.release(target);
        L::prune(&mut self.tree, parent);
        debug!(
            layout = L::NAME,
            prefix_len = prefix.len(),
            removed = tally.leaves,
            "removed prefix"
        );
    }

    /// Remove every stored value.
    pub fn clear(&mut self) {
        debug!(removed = self.tree.len(), "cleared index");
        self.tree.reset();
    }

    /// Release arena slots left over from removals.
    pub fn shrink_to_fit(&mut self) {
        self.tree.arena.shrink_to_fit();
        self.tree.values.shrink_to_fit();
    }
}

impl<V, S, L> Autocompleter<V, S> for PrefixIndex<V, S, L>
where
    V: Eq + Hash + Clone,
    S: Eq + Clone,
    L: Layout,
{
    fn len(&self) -> usize {
        PrefixIndex::len(self)
    }

    fn insert(&mut self, value: V, weight: f64, prefix: &[S]) -> Result<()> {
        PrefixIndex::insert(self, value, weight, prefix)
    }

    fn autocomplete(&self, prefix: &[S], limit: Option<usize>) -> Vec<(V, f64)> {
        PrefixIndex::autocomplete(self, prefix, limit)
    }

    fn remove(&mut self, prefix: &[S]) {
        PrefixIndex::remove(self, prefix)
    }
}

impl<V, S, L> Default for PrefixIndex<V, S, L>
where
    V: Eq + Hash + Clone,
    S: Eq + Clone,
    L: Layout,
{
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl<V: Clone, S: Clone, L> Clone for PrefixIndex<V, S, L> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            config: self.config.clone(),
            _layout: PhantomData,
        }
    }
}

impl<V: fmt::Debug, S: fmt::Debug, L: Layout> fmt::Debug for PrefixIndex<V, S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefixIndex")
            .field("layout", &L::NAME)
            .field("aggregation", &self.config.aggregation)
            .field("len", &self.tree.values.len())
            .finish()
    }
}


#[cfg(test)]
mod proptests;
