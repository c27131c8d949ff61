//! Node model and the slot arena that owns every node.
//!
//! Nodes never hold pointers to each other. A parent lists its children as
//! [`NodeId`]s and each child keeps a non-owning `parent` id that is only used
//! to walk weight changes upwards and to splice nodes during restructuring.
//! Slots freed by removal are recycled through a free list.

use std::fmt;
use std::ops::{Index, IndexMut};

use smallvec::SmallVec;

use crate::aggregate::Tally;

/// Symbols forming a prefix label. Most prefixes are short, so they live
/// inline.
pub type Symbols<S> = SmallVec<[S; 8]>;

/// 32-bit slot index into the [`Arena`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// The root occupies the first slot for the lifetime of the index.
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    fn from_usize(index: usize) -> Self {
        assert!(index < u32::MAX as usize, "node arena exhausted");
        Self(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node stands for: a shared prefix (internal nodes and the root) or a
/// stored value (leaves).
#[derive(Debug, Clone)]
pub enum Label<V, S> {
    Prefix(Symbols<S>),
    Value(V),
}

#[derive(Debug, Clone)]
pub struct Node<V, S> {
    pub label: Label<V, S>,
    /// Ordered by weight descending, then by `seq` ascending.
    pub children: Vec<NodeId>,
    pub tally: Tally,
    /// Cached aggregate of `tally`; equals the stored weight on leaves.
    pub weight: f64,
    pub parent: Option<NodeId>,
    /// Creation order, used to break weight ties deterministically.
    pub seq: u64,
}

impl<V, S> Node<V, S> {
    pub fn internal(prefix: Symbols<S>, seq: u64) -> Self {
        Self {
            label: Label::Prefix(prefix),
            children: Vec::new(),
            tally: Tally::default(),
            weight: 0.0,
            parent: None,
            seq,
        }
    }

    pub fn leaf(value: V, weight: f64, seq: u64) -> Self {
        Self {
            label: Label::Value(value),
            children: Vec::new(),
            tally: Tally::leaf(weight),
            weight,
            parent: None,
            seq,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.label, Label::Value(_))
    }

    /// Prefix this node stands for; leaves have none.
    #[inline]
    pub fn prefix(&self) -> &[S] {
        match &self.label {
            Label::Prefix(p) => p,
            Label::Value(_) => &[],
        }
    }

    #[inline]
    pub fn value(&self) -> Option<&V> {
        match &self.label {
            Label::Value(v) => Some(v),
            Label::Prefix(_) => None,
        }
    }
}

/// Owning storage for all nodes of one tree.
#[derive(Debug, Clone)]
pub struct Arena<V, S> {
    slots: Vec<Option<Node<V, S>>>,
    free: Vec<NodeId>,
}

impl<V, S> Arena<V, S> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    pub fn alloc(&mut self, node: Node<V, S>) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(node);
            return id;
        }
        let id = NodeId::from_usize(self.slots.len());
        self.slots.push(Some(node));
        id
    }

    /// Vacate one slot and hand back its node. Children of the returned node
    /// are not touched.
    pub fn free(&mut self, id: NodeId) -> Node<V, S> {
        debug_assert_ne!(id, NodeId::ROOT, "the root slot is never freed");
        match self.slots[id.index()].take() {
            Some(node) => {
                self.free.push(id);
                node
            }
            None => panic!("double free of node {id:?}"),
        }
    }

    /// Number of occupied slots.
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn shrink_to_fit(&mut self) {
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
        let len = self.slots.len();
        self.free.retain(|id| id.index() < len);
        self.slots.shrink_to_fit();
        self.free.shrink_to_fit();
    }
}

impl<V, S> Index<NodeId> for Arena<V, S> {
    type Output = Node<V, S>;

    #[inline]
    fn index(&self, id: NodeId) -> &Node<V, S> {
        match &self.slots[id.index()] {
            Some(node) => node,
            None => panic!("dangling node id {id:?}"),
        }
    }
}

impl<V, S> IndexMut<NodeId> for Arena<V, S> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node<V, S> {
        match &mut self.slots[id.index()] {
            Some(node) => node,
            None => panic!("dangling node id {id:?}"),
        }
    }
}
