//! Aggregate weights of internal nodes.
//!
//! Every node keeps a [`Tally`]: the running total of leaf weights below it and
//! the number of those leaves. The configured [`Aggregation`] turns a tally
//! into the node's weight. Mutations are applied as [`Delta`]s walked from the
//! touched node up to the root, so no subtree is ever re-scanned.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// How an internal node's weight is derived from the leaves below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Aggregation {
    /// Sum of all leaf weights.
    #[default]
    Sum,
    /// Arithmetic mean of all leaf weights.
    Average,
}

impl Aggregation {
    /// Weight of a node holding `tally`.
    ///
    /// An empty tally always weighs zero, which is how the canonical empty
    /// root is recognised.
    #[inline]
    pub(crate) fn weight(self, tally: Tally) -> f64 {
        if tally.leaves == 0 {
            return 0.0;
        }
        match self {
            Aggregation::Sum => tally.total,
            Aggregation::Average => tally.total / tally.leaves as f64,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Average => "average",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregation::Sum),
            "average" | "avg" | "mean" => Ok(Aggregation::Average),
            _ => Err(Error::UnknownAggregation(s.to_string())),
        }
    }
}

/// Sum of leaf weights and number of leaves in a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tally {
    pub total: f64,
    pub leaves: usize,
}

impl Tally {
    /// Tally of a single leaf.
    #[inline]
    pub fn leaf(weight: f64) -> Self {
        Self {
            total: weight,
            leaves: 1,
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.leaves == 0
    }

    /// Apply a change travelling up from a descendant.
    ///
    /// A tally that loses its last leaf is snapped back to exactly zero.
    #[inline]
    pub fn apply(&mut self, delta: Delta) {
        self.total += delta.weight;
        self.leaves = (self.leaves as isize + delta.leaves) as usize;
        if self.leaves == 0 {
            self.total = 0.0;
        }
    }
}

/// A change in leaf weight and leaf count below some node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delta {
    pub weight: f64,
    pub leaves: isize,
}

impl Delta {
    /// A new leaf of weight `w` was attached.
    #[inline]
    pub fn added(weight: f64) -> Self {
        Self { weight, leaves: 1 }
    }

    /// An existing leaf gained `w` more weight.
    #[inline]
    pub fn accumulated(weight: f64) -> Self {
        Self { weight, leaves: 0 }
    }

    /// A whole subtree with `tally` was detached.
    #[inline]
    pub fn detached(tally: Tally) -> Self {
        Self {
            weight: -tally.total,
            leaves: -(tally.leaves as isize),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_and_average() {
        let mut t = Tally::default();
        t.apply(Delta::added(4.0));
        t.apply(Delta::added(6.0));
        assert_eq!(Aggregation::Sum.weight(t), 10.0);
        assert_eq!(Aggregation::Average.weight(t), 5.0);

        t.apply(Delta::accumulated(6.0));
        assert_eq!(t.leaves, 2);
        assert_eq!(Aggregation::Average.weight(t), 8.0);
    }

    #[test]
    fn test_detach_to_empty() {
        let mut t = Tally::default();
        t.apply(Delta::added(0.1));
        t.apply(Delta::added(0.2));
        let sub = t;
        t.apply(Delta::detached(sub));
        assert!(t.is_empty());
        assert_eq!(t.total, 0.0);
        assert_eq!(Aggregation::Average.weight(t), 0.0);
        assert_eq!(Aggregation::Sum.weight(t), 0.0);
    }

    #[test]
    fn test_parse() {
        assert_eq!("sum".parse::<Aggregation>(), Ok(Aggregation::Sum));
        assert_eq!(" Average ".parse::<Aggregation>(), Ok(Aggregation::Average));
        assert_eq!(
            "median".parse::<Aggregation>(),
            Err(Error::UnknownAggregation("median".into()))
        );
        assert_eq!(Aggregation::Average.to_string(), "average");
    }
}
