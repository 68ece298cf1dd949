//! Core types and data structures for the multi-version R-Tree.
//!
//! This module defines the fundamental types used throughout the tree:
//! - Error types and result types
//! - Node types (Leaf and Internal)
//! - Statistics structures
//! - File header

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

use crate::region::TemporalRegion;

use super::rtree_constants::{FORMAT_VERSION, MAGIC, PAGE_SIZE};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur in index operations
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Page {page_id} is corrupted: checksum {actual:#x}, expected {expected:#x}")]
    Corrupted {
        page_id: PageId,
        expected: u32,
        actual: u32,
    },

    #[error("Page {page_id} needs {size} bytes, at most {max} fit")]
    PageOverflow {
        page_id: PageId,
        size: usize,
        max: usize,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid property {name}: {reason}")]
    InvalidProperty { name: String, reason: String },

    #[error("Missing required property: {0}")]
    MissingProperty(String),

    #[error("Index is closed")]
    Closed,
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Caller-assigned identifier of a data entry
pub type DataId = u64;

/// Page ID - unique identifier for a node/page on disk
pub type PageId = u64;

// ============================================================================
// Statistics
// ============================================================================

/// Statistics about index operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexStatistics {
    pub reads: u64,
    pub writes: u64,
    pub buffer_hits: u64,
    pub buffer_misses: u64,
    pub splits: u64,
    pub nodes: u64,
    pub data: u64,
    pub height: u32,
    pub queries: u64,
    pub query_results: u64,
    pub latest_version: u64,
}

// ============================================================================
// Node Types
// ============================================================================

/// An entry in a leaf node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafEntry {
    pub region: TemporalRegion,
    pub id: DataId,
    pub data: Vec<u8>,
}

/// A child reference in an internal node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildRef {
    pub region: TemporalRegion,
    pub page_id: PageId,
}

/// Node types in the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Leaf node containing actual entries
    Leaf { entries: Vec<LeafEntry> },
    /// Internal node containing child references
    Internal {
        children: Vec<ChildRef>,
        level: u32, // Height from leaf level (leaves are 0)
    },
}

impl Node {
    /// Get the region enclosing all children/entries
    pub fn compute_region(&self) -> TemporalRegion {
        let mut region = TemporalRegion::empty();
        match self {
            Node::Leaf { entries } => {
                for e in entries {
                    region.expand(&e.region);
                }
            }
            Node::Internal { children, .. } => {
                for c in children {
                    region.expand(&c.region);
                }
            }
        }
        region
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    pub fn level(&self) -> u32 {
        match self {
            Node::Leaf { .. } => 0,
            Node::Internal { level, .. } => *level,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Node::Leaf { entries } => entries.len(),
            Node::Internal { children, .. } => children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// File Header
// ============================================================================

/// File header stored at the beginning of the index file.
///
/// Besides the tree shape it persists the configuration the tree was created
/// with, so a reopened index behaves like the one that was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    pub magic: u32,
    pub version: u32,
    pub page_size: u32,
    pub root_page: PageId,
    pub next_page_id: PageId,
    pub entry_count: u64,
    pub node_count: u64,
    pub height: u32,
    pub latest_version: u64,
    pub dimension: u32,
    pub index_capacity: u32,
    pub leaf_capacity: u32,
    pub fill_factor: f64,
}

impl FileHeader {
    pub fn new() -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            page_size: PAGE_SIZE as u32,
            root_page: 0,
            next_page_id: 1,
            entry_count: 0,
            node_count: 0,
            height: 0,
            latest_version: 0,
            dimension: crate::region::DIMENSION as u32,
            index_capacity: 0,
            leaf_capacity: 0,
            fill_factor: 0.0,
        }
    }

    pub fn validate(&self) -> IndexResult<()> {
        if self.magic != MAGIC {
            return Err(IndexError::InvalidOperation(
                "Invalid file format (bad magic)".into(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(IndexError::InvalidOperation(
                "Unsupported file format version".into(),
            ));
        }
        Ok(())
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}
