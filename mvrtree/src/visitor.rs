//! Callback capabilities a caller plugs into queries and traversals.
//!
//! A [`Visitor`] observes a range query: it sees every node the query loads
//! and every data entry that matches. A [`QueryStrategy`] drives a custom
//! walk: the tree hands it the current node and the strategy names the next
//! page to fetch, or stops.

use crate::disk_rtree::{DataId, Node, PageId};
use crate::region::TemporalRegion;

/// Read-only view of a node handed to callbacks.
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    page_id: PageId,
    node: &'a Node,
}

impl<'a> NodeView<'a> {
    pub fn new(page_id: PageId, node: &'a Node) -> Self {
        Self { page_id, node }
    }

    /// Page holding this node.
    pub fn identifier(&self) -> PageId {
        self.page_id
    }

    pub fn is_leaf(&self) -> bool {
        self.node.is_leaf()
    }

    pub fn is_index(&self) -> bool {
        !self.node.is_leaf()
    }

    /// Height above the leaf level; leaves are 0.
    pub fn level(&self) -> u32 {
        self.node.level()
    }

    pub fn children_count(&self) -> usize {
        self.node.len()
    }

    /// Page of the i-th child. Always `None` for leaves.
    pub fn child_identifier(&self, index: usize) -> Option<PageId> {
        match self.node {
            Node::Internal { children, .. } => children.get(index).map(|c| c.page_id),
            Node::Leaf { .. } => None,
        }
    }

    /// Region of the i-th child or entry.
    pub fn child_shape(&self, index: usize) -> Option<TemporalRegion> {
        match self.node {
            Node::Internal { children, .. } => children.get(index).map(|c| c.region),
            Node::Leaf { entries } => entries.get(index).map(|e| e.region),
        }
    }

    /// Minimum bounding region of everything below this node.
    pub fn shape(&self) -> TemporalRegion {
        self.node.compute_region()
    }
}

/// A matched data entry handed to [`Visitor::visit_data`].
#[derive(Debug, Clone, Copy)]
pub struct DataItem<'a> {
    id: DataId,
    region: &'a TemporalRegion,
    payload: &'a [u8],
}

impl<'a> DataItem<'a> {
    pub fn new(id: DataId, region: &'a TemporalRegion, payload: &'a [u8]) -> Self {
        Self {
            id,
            region,
            payload,
        }
    }

    pub fn identifier(&self) -> DataId {
        self.id
    }

    pub fn shape(&self) -> &TemporalRegion {
        self.region
    }

    pub fn payload(&self) -> &[u8] {
        self.payload
    }
}

/// Observer of a range query.
pub trait Visitor {
    /// Called exactly once for every node the query loads.
    fn visit_node(&mut self, node: &NodeView<'_>);

    /// Called for every entry intersecting the query region and window.
    fn visit_data(&mut self, item: &DataItem<'_>);

    /// Batched delivery of matches. Range queries deliver through
    /// [`Visitor::visit_data`], so the default does nothing.
    fn visit_data_batch(&mut self, _items: &[DataItem<'_>]) {}
}

/// Driver of a custom traversal started at the root.
pub trait QueryStrategy {
    /// Receives the node just fetched and returns the page to fetch next,
    /// or `None` to end the traversal.
    fn next_entry(&mut self, entry: &NodeView<'_>) -> Option<PageId>;
}
