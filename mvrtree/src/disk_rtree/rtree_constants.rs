//! Constants for the disk-based multi-version R-Tree.

/// Default page size (16KB) - balances I/O efficiency and memory usage
pub const PAGE_SIZE: usize = 16384;

/// Default maximum children per internal node
pub const DEFAULT_INDEX_CAPACITY: u32 = 64;

/// Default maximum entries per leaf node
pub const DEFAULT_LEAF_CAPACITY: u32 = 64;

/// Default fill factor reported for a new tree
pub const DEFAULT_FILL_FACTOR: f64 = 0.7;

/// Smallest node capacity that still allows a split into two non-trivial halves
pub const MIN_NODE_CAPACITY: u32 = 3;

/// Largest node capacity whose serialized page still fits in `PAGE_SIZE`
/// with payloads of at most `MAX_PAYLOAD_SIZE` bytes
pub const MAX_NODE_CAPACITY: u32 = 100;

/// Largest payload accepted per data entry
pub const MAX_PAYLOAD_SIZE: usize = 64;

/// Default buffer size in number of pages (16MB with 16KB pages)
pub const DEFAULT_BUFFER_PAGES: usize = 1024;

/// Magic number for file format identification
pub const MAGIC: u32 = 0x4D565254; // "MVRT"

/// File format version
pub const FORMAT_VERSION: u32 = 1;
