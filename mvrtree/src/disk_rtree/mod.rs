//! Disk-based multi-version R-Tree.
//!
//! Nodes live in fixed-size pages on disk and are loaded on demand through an
//! LRU [`PageBuffer`]. Every leaf entry carries a validity interval next to
//! its rectangle, and internal nodes keep the union of both, so queries prune
//! by space and by time.

pub mod rtree_buffer;
pub mod rtree_constants;
pub mod rtree_storage;
pub mod rtree_types;
mod rtree_impl;

pub use rtree_buffer::PageBuffer;
pub use rtree_constants::{DEFAULT_BUFFER_PAGES, MAX_PAYLOAD_SIZE, PAGE_SIZE};
pub use rtree_impl::{
    MVRTree, PROPERTY_DIMENSION, PROPERTY_FILL_FACTOR, PROPERTY_INDEX_CAPACITY,
    PROPERTY_LEAF_CAPACITY,
};
pub use rtree_storage::DiskStorage;
pub use rtree_types::{
    ChildRef, DataId, FileHeader, IndexError, IndexResult, IndexStatistics, LeafEntry, Node,
    PageId,
};
