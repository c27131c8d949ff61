//! Index configuration.

use crate::aggregate::Aggregation;

/// How `autocomplete` picks the values it returns when a limit is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Retrieval {
    /// Walk children heaviest-first and stop as soon as `limit` leaves have
    /// been gathered. Ranks by subtree aggregate rather than by individual
    /// leaf weight, so it may miss a heavy leaf that sits in a lighter subtree.
    #[default]
    Greedy,
    /// Collect every leaf under the matched node, sort them by weight and keep
    /// the first `limit`. Always returns the true top-k.
    Exhaustive,
}

/// Configuration for a [`PrefixIndex`](crate::PrefixIndex).
#[derive(Debug, Clone)]
pub struct Config {
    /// Aggregate used for internal node weights
    pub aggregation: Aggregation,
    /// Strategy used by limited `autocomplete` calls
    pub retrieval: Retrieval,
    /// Initial capacity hint for the node arena
    pub initial_capacity: usize,
}

impl Config {
    pub fn new(aggregation: Aggregation) -> Self {
        Self {
            aggregation,
            ..Self::default()
        }
    }

    pub fn retrieval(mut self, retrieval: Retrieval) -> Self {
        self.retrieval = retrieval;
        self
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aggregation: Aggregation::Sum,
            retrieval: Retrieval::Greedy,
            initial_capacity: 64,
        }
    }
}
