//! # mvrtree - a disk-resident multi-version R-Tree
//!
//! This crate indexes two-dimensional rectangles that are valid over an
//! interval of discrete time. Nodes are stored in fixed-size pages, loaded on
//! demand through an LRU page buffer, and persisted so an index can be closed
//! and reopened.
//!
//! ## Features
//!
//! - **Disk-Based Storage**: Pages stored on disk, loaded on demand
//! - **LRU Buffer**: Frequently accessed pages kept in memory, hits and misses counted
//! - **Space-Time Queries**: Rectangle plus time window intersection
//! - **Visitors**: Observe every node a query loads and every matching entry
//! - **Query Strategies**: Drive a custom walk from the root, one page at a time
//!
//! ## Example
//!
//! ```rust,no_run
//! use mvrtree::{
//!     DiskStorage, MVRTree, MultiVersionIndex, PageBuffer, PropertySet, PropertyValue,
//!     TemporalRegion,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut properties = PropertySet::new();
//! properties.set("Dimension", PropertyValue::UnsignedInt(2));
//!
//! let storage = DiskStorage::create("places.mvrtree")?;
//! let tree = MVRTree::create(PageBuffer::new(storage, 10), &properties)?;
//!
//! tree.insert_data(&[1], &TemporalRegion::new([0.0, 0.0], [1.0, 1.0], 0, 0), 1)?;
//! println!("{}", tree);
//! # Ok(())
//! # }
//! ```

pub mod disk_rtree;
pub mod mv_index;
pub mod properties;
pub mod region;
pub mod visitor;

pub use disk_rtree::{
    DataId, DiskStorage, IndexError, IndexResult, IndexStatistics, MVRTree, PageBuffer, PageId,
};
pub use mv_index::MultiVersionIndex;
pub use properties::{PropertyKind, PropertySet, PropertyValue};
pub use region::{TemporalRegion, DIMENSION};
pub use visitor::{DataItem, NodeView, QueryStrategy, Visitor};
