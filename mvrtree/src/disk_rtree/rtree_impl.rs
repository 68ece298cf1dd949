//! MVRTree implementation.

use parking_lot::RwLock;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::mv_index::MultiVersionIndex;
use crate::properties::{PropertyKind, PropertySet, PropertyValue};
use crate::region::{TemporalRegion, DIMENSION};
use crate::visitor::{DataItem, NodeView, QueryStrategy, Visitor};

use super::rtree_buffer::PageBuffer;
use super::rtree_constants::{
    DEFAULT_FILL_FACTOR, DEFAULT_INDEX_CAPACITY, DEFAULT_LEAF_CAPACITY, MAX_NODE_CAPACITY,
    MAX_PAYLOAD_SIZE, MIN_NODE_CAPACITY,
};
use super::rtree_types::{
    ChildRef, DataId, FileHeader, IndexError, IndexResult, IndexStatistics, LeafEntry, Node,
    PageId,
};

/// Properties read by [`MVRTree::create`]. Anything else in the set is ignored.
pub const PROPERTY_DIMENSION: &str = "Dimension";
pub const PROPERTY_INDEX_CAPACITY: &str = "IndexCapacity";
pub const PROPERTY_LEAF_CAPACITY: &str = "LeafCapacity";
pub const PROPERTY_FILL_FACTOR: &str = "FillFactor";

/// A disk-resident R-Tree whose entries carry a validity interval.
///
/// The tree owns its [`PageBuffer`], which owns the storage file. Leaf
/// entries hold the inserted region, identifier and payload; internal nodes
/// hold the union region of each child so that both the rectangle and the
/// time window prune the search.
pub struct MVRTree {
    header: RwLock<FileHeader>,
    stats: TreeStatistics,
    closed: RwLock<bool>,
    // declared last so the buffer (and its storage) is released after the tree
    buffer: PageBuffer,
}

/// Per-session counters that are not persisted
struct TreeStatistics {
    splits: AtomicU64,
    queries: AtomicU64,
    query_results: AtomicU64,
}

impl TreeStatistics {
    fn new() -> Self {
        Self {
            splits: AtomicU64::new(0),
            queries: AtomicU64::new(0),
            query_results: AtomicU64::new(0),
        }
    }
}

/// Validated tree configuration
#[derive(Debug, Clone, PartialEq)]
struct TreeConfig {
    index_capacity: u32,
    leaf_capacity: u32,
    fill_factor: f64,
}

impl TreeConfig {
    fn from_properties(properties: &PropertySet) -> IndexResult<Self> {
        let dimension = unsigned_property(properties, PROPERTY_DIMENSION)?
            .ok_or_else(|| IndexError::MissingProperty(PROPERTY_DIMENSION.to_string()))?;
        if dimension != DIMENSION as u64 {
            return Err(IndexError::InvalidProperty {
                name: PROPERTY_DIMENSION.to_string(),
                reason: format!("only {} dimensions are supported, got {}", DIMENSION, dimension),
            });
        }

        let index_capacity = capacity_property(properties, PROPERTY_INDEX_CAPACITY)?
            .unwrap_or(DEFAULT_INDEX_CAPACITY);
        let leaf_capacity = capacity_property(properties, PROPERTY_LEAF_CAPACITY)?
            .unwrap_or(DEFAULT_LEAF_CAPACITY);

        let fill_factor = match properties.get(PROPERTY_FILL_FACTOR) {
            None => DEFAULT_FILL_FACTOR,
            Some(value) => {
                let factor = value
                    .as_double()
                    .ok_or_else(|| kind_mismatch(PROPERTY_FILL_FACTOR, PropertyKind::Double, value))?;
                if !(factor > 0.0 && factor < 1.0) {
                    return Err(IndexError::InvalidProperty {
                        name: PROPERTY_FILL_FACTOR.to_string(),
                        reason: format!("must be in (0, 1), got {}", factor),
                    });
                }
                factor
            }
        };

        for (name, value) in properties.iter() {
            if ![
                PROPERTY_DIMENSION,
                PROPERTY_INDEX_CAPACITY,
                PROPERTY_LEAF_CAPACITY,
                PROPERTY_FILL_FACTOR,
            ]
            .contains(&name)
            {
                log::debug!("Ignoring property {} = {}", name, value);
            }
        }

        Ok(Self {
            index_capacity,
            leaf_capacity,
            fill_factor,
        })
    }
}

fn kind_mismatch(name: &str, expected: PropertyKind, found: &PropertyValue) -> IndexError {
    IndexError::InvalidProperty {
        name: name.to_string(),
        reason: format!("expected {} value, found {}", expected, found.kind()),
    }
}

fn unsigned_property(properties: &PropertySet, name: &str) -> IndexResult<Option<u64>> {
    match properties.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_unsigned()
            .map(Some)
            .ok_or_else(|| kind_mismatch(name, PropertyKind::UnsignedInt, value)),
    }
}

fn capacity_property(properties: &PropertySet, name: &str) -> IndexResult<Option<u32>> {
    match unsigned_property(properties, name)? {
        None => Ok(None),
        Some(capacity) => {
            if capacity < MIN_NODE_CAPACITY as u64 || capacity > MAX_NODE_CAPACITY as u64 {
                return Err(IndexError::InvalidProperty {
                    name: name.to_string(),
                    reason: format!(
                        "must be between {} and {}, got {}",
                        MIN_NODE_CAPACITY, MAX_NODE_CAPACITY, capacity
                    ),
                });
            }
            Ok(Some(capacity as u32))
        }
    }
}

impl MVRTree {
    /// Create a new, empty tree on top of `buffer`.
    ///
    /// `Dimension` is required and must be 2. `IndexCapacity`, `LeafCapacity`
    /// and `FillFactor` fall back to defaults when absent.
    pub fn create(buffer: PageBuffer, properties: &PropertySet) -> IndexResult<Self> {
        let config = TreeConfig::from_properties(properties)?;

        let header = FileHeader {
            index_capacity: config.index_capacity,
            leaf_capacity: config.leaf_capacity,
            fill_factor: config.fill_factor,
            ..FileHeader::new()
        };
        buffer.write_header(&header)?;
        buffer.storage().sync()?;

        log::debug!(
            "Created multi-version R-Tree at {:?} ({:?})",
            buffer.storage().path(),
            config
        );
        Ok(Self::with_header(buffer, header))
    }

    /// Open an existing tree. Only the header is read; nodes load on demand.
    pub fn open(buffer: PageBuffer) -> IndexResult<Self> {
        let header = buffer.read_header()?;
        header.validate()?;

        log::debug!(
            "Opened multi-version R-Tree at {:?} with {} entries",
            buffer.storage().path(),
            header.entry_count
        );
        Ok(Self::with_header(buffer, header))
    }

    fn with_header(buffer: PageBuffer, header: FileHeader) -> Self {
        Self {
            header: RwLock::new(header),
            stats: TreeStatistics::new(),
            closed: RwLock::new(false),
            buffer,
        }
    }

    pub fn buffer(&self) -> &PageBuffer {
        &self.buffer
    }

    fn check_closed(&self) -> IndexResult<()> {
        if *self.closed.read() {
            Err(IndexError::Closed)
        } else {
            Ok(())
        }
    }

    /// Flush all dirty pages and the header to disk
    pub fn flush(&self) -> IndexResult<()> {
        self.buffer.flush(&self.header.read())
    }

    fn allocate_page(&self) -> PageId {
        let mut header = self.header.write();
        let page_id = header.next_page_id;
        header.next_page_id += 1;
        header.node_count += 1;
        page_id
    }

    fn read_node(&self, page_id: PageId) -> IndexResult<Node> {
        self.buffer.read_node(page_id)
    }

    fn write_node(&self, page_id: PageId, node: Node) -> IndexResult<()> {
        self.buffer.write_node(page_id, node)
    }

    /// Choose the leaf needing the least space-time enlargement
    fn choose_leaf(
        &self,
        page_id: PageId,
        region: &TemporalRegion,
        path: &mut Vec<(PageId, usize)>,
    ) -> IndexResult<PageId> {
        let node = self.read_node(page_id)?;

        match node {
            Node::Leaf { .. } => Ok(page_id),
            Node::Internal { children, .. } => {
                let mut best_idx = 0;
                let mut best_enlargement = f64::INFINITY;
                let mut best_volume = f64::INFINITY;

                for (i, child) in children.iter().enumerate() {
                    let enlargement = child.region.enlargement(region);
                    let volume = child.region.volume();

                    if enlargement < best_enlargement
                        || (enlargement == best_enlargement && volume < best_volume)
                    {
                        best_enlargement = enlargement;
                        best_volume = volume;
                        best_idx = i;
                    }
                }

                path.push((page_id, best_idx));
                self.choose_leaf(children[best_idx].page_id, region, path)
            }
        }
    }

    /// Insert entry into leaf, returns the new sibling if the leaf split
    fn insert_into_leaf(
        &self,
        page_id: PageId,
        entry: LeafEntry,
    ) -> IndexResult<Option<(PageId, TemporalRegion)>> {
        let leaf_capacity = self.header.read().leaf_capacity as usize;
        let mut node = self.read_node(page_id)?;

        if let Node::Leaf { ref mut entries } = node {
            entries.push(entry);

            if entries.len() > leaf_capacity {
                let (remaining, moved) = split_by_center(entries, |e| &e.region);
                *entries = remaining;

                let new_page_id = self.allocate_page();
                let new_region = region_of(&moved, |e| &e.region);
                self.stats.splits.fetch_add(1, Ordering::Relaxed);

                self.write_node(page_id, node)?;
                self.write_node(new_page_id, Node::Leaf { entries: moved })?;

                return Ok(Some((new_page_id, new_region)));
            }

            self.write_node(page_id, node)?;
            Ok(None)
        } else {
            Err(IndexError::InvalidOperation(
                "Expected leaf node for insertion".into(),
            ))
        }
    }

    /// Propagate a split up the insertion path, growing a new root if needed
    fn propagate_split(
        &self,
        path: &[(PageId, usize)],
        mut new_page: PageId,
        mut new_region: TemporalRegion,
    ) -> IndexResult<()> {
        let index_capacity = self.header.read().index_capacity as usize;

        for (depth, &(parent_id, child_idx)) in path.iter().enumerate().rev() {
            let mut parent_node = self.read_node(parent_id)?;

            if let Node::Internal {
                ref mut children,
                level,
            } = parent_node
            {
                children[child_idx].region =
                    self.read_node(children[child_idx].page_id)?.compute_region();
                children.push(ChildRef {
                    region: new_region,
                    page_id: new_page,
                });

                if children.len() > index_capacity {
                    let (remaining, moved) = split_by_center(children, |c| &c.region);
                    *children = remaining;

                    new_page = self.allocate_page();
                    new_region = region_of(&moved, |c| &c.region);
                    self.stats.splits.fetch_add(1, Ordering::Relaxed);

                    self.write_node(parent_id, parent_node)?;
                    self.write_node(
                        new_page,
                        Node::Internal {
                            children: moved,
                            level,
                        },
                    )?;
                } else {
                    self.write_node(parent_id, parent_node)?;
                    // the split stops here, but the ancestors still have to cover the new entry
                    return self.update_path_regions(&path[..depth]);
                }
            }
        }

        // The root itself split
        let (old_root, height) = {
            let header = self.header.read();
            (header.root_page, header.height)
        };
        let old_root_region = self.read_node(old_root)?.compute_region();

        let new_root_id = self.allocate_page();
        let new_root = Node::Internal {
            children: vec![
                ChildRef {
                    region: old_root_region,
                    page_id: old_root,
                },
                ChildRef {
                    region: new_region,
                    page_id: new_page,
                },
            ],
            level: height,
        };
        self.write_node(new_root_id, new_root)?;

        let mut header = self.header.write();
        header.root_page = new_root_id;
        header.height += 1;
        Ok(())
    }

    /// Refresh the child regions along the insertion path
    fn update_path_regions(&self, path: &[(PageId, usize)]) -> IndexResult<()> {
        for &(parent_id, child_idx) in path.iter().rev() {
            let mut parent_node = self.read_node(parent_id)?;

            if let Node::Internal {
                ref mut children, ..
            } = parent_node
            {
                let child_region = self.read_node(children[child_idx].page_id)?.compute_region();
                if children[child_idx].region == child_region {
                    // Ancestors already cover it
                    return Ok(());
                }
                children[child_idx].region = child_region;
                self.write_node(parent_id, parent_node)?;
            }
        }
        Ok(())
    }

    /// Recursive search reporting every loaded node and matching entry.
    fn search_recursive(
        &self,
        page_id: PageId,
        query: &TemporalRegion,
        visitor: &mut dyn Visitor,
    ) -> IndexResult<()> {
        let node = self.read_node(page_id)?;
        visitor.visit_node(&NodeView::new(page_id, &node));

        match &node {
            Node::Leaf { entries } => {
                for entry in entries {
                    if entry.region.intersects(query) {
                        self.stats.query_results.fetch_add(1, Ordering::Relaxed);
                        visitor.visit_data(&DataItem::new(entry.id, &entry.region, &entry.data));
                    }
                }
            }
            Node::Internal { children, .. } => {
                for child in children {
                    if child.region.intersects(query) {
                        self.search_recursive(child.page_id, query, visitor)?;
                    }
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// MultiVersionIndex Trait Implementation
// ============================================================================

impl MultiVersionIndex for MVRTree {
    fn insert_data(&self, payload: &[u8], region: &TemporalRegion, id: DataId) -> IndexResult<()> {
        self.check_closed()?;

        if !region.is_valid() {
            return Err(IndexError::InvalidOperation(format!(
                "Invalid region {}",
                region
            )));
        }
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(IndexError::InvalidOperation(format!(
                "Payload of {} bytes exceeds the maximum of {}",
                payload.len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        let entry = LeafEntry {
            region: *region,
            id,
            data: payload.to_vec(),
        };

        let root_page = self.header.read().root_page;

        if root_page == 0 {
            let page_id = self.allocate_page();
            self.write_node(
                page_id,
                Node::Leaf {
                    entries: vec![entry],
                },
            )?;

            let mut header = self.header.write();
            header.root_page = page_id;
            header.height = 1;
        } else {
            let mut path = Vec::new();
            let leaf_id = self.choose_leaf(root_page, region, &mut path)?;

            match self.insert_into_leaf(leaf_id, entry)? {
                Some((new_page, new_region)) => self.propagate_split(&path, new_page, new_region)?,
                None => self.update_path_regions(&path)?,
            }
        }

        let mut header = self.header.write();
        header.entry_count += 1;
        header.latest_version = header.latest_version.max(region.valid_to);
        Ok(())
    }

    fn intersects_with_query(
        &self,
        query: &TemporalRegion,
        visitor: &mut dyn Visitor,
    ) -> IndexResult<()> {
        self.check_closed()?;
        self.stats.queries.fetch_add(1, Ordering::Relaxed);

        let root_page = self.header.read().root_page;
        if root_page == 0 {
            return Ok(());
        }
        self.search_recursive(root_page, query, visitor)
    }

    fn query_strategy(&self, strategy: &mut dyn QueryStrategy) -> IndexResult<()> {
        self.check_closed()?;

        let mut next = self.header.read().root_page;
        while next != 0 {
            let node = self.read_node(next)?;
            next = strategy
                .next_entry(&NodeView::new(next, &node))
                .unwrap_or(0);
        }
        Ok(())
    }

    fn statistics(&self) -> IndexStatistics {
        let header = self.header.read();
        IndexStatistics {
            reads: self.buffer.reads(),
            writes: self.buffer.writes(),
            buffer_hits: self.buffer.hits(),
            buffer_misses: self.buffer.misses(),
            splits: self.stats.splits.load(Ordering::Relaxed),
            nodes: header.node_count,
            data: header.entry_count,
            height: header.height,
            queries: self.stats.queries.load(Ordering::Relaxed),
            query_results: self.stats.query_results.load(Ordering::Relaxed),
            latest_version: header.latest_version,
        }
    }

    fn latest_version(&self) -> u64 {
        self.header.read().latest_version
    }

    fn size(&self) -> u64 {
        self.header.read().entry_count
    }

    fn close(&self) -> IndexResult<()> {
        let mut closed = self.closed.write();
        if *closed {
            return Ok(());
        }

        self.flush()?;
        *closed = true;
        Ok(())
    }
}

impl Display for MVRTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let stats = self.statistics();
        let header = self.header.read();

        writeln!(f, "Dimension: {}", header.dimension)?;
        writeln!(f, "Fill factor: {}", header.fill_factor)?;
        writeln!(f, "Index capacity: {}", header.index_capacity)?;
        writeln!(f, "Leaf capacity: {}", header.leaf_capacity)?;
        writeln!(f, "Reads: {}", stats.reads)?;
        writeln!(f, "Writes: {}", stats.writes)?;
        writeln!(f, "Hits: {}", stats.buffer_hits)?;
        writeln!(f, "Misses: {}", stats.buffer_misses)?;
        writeln!(f, "Tree height: {}", stats.height)?;
        writeln!(f, "Number of data: {}", stats.data)?;
        writeln!(f, "Number of nodes: {}", stats.nodes)?;
        writeln!(f, "Splits: {}", stats.splits)?;
        writeln!(f, "Queries: {}", stats.queries)?;
        writeln!(f, "Query results: {}", stats.query_results)?;
        write!(f, "Latest version: {}", stats.latest_version)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Split items in half along the x axis by region center.
fn split_by_center<T: Clone>(
    items: &[T],
    region: impl Fn(&T) -> &TemporalRegion,
) -> (Vec<T>, Vec<T>) {
    let mut sorted: Vec<_> = items.to_vec();
    sorted.sort_by(|a, b| {
        region(a)
            .center(0)
            .partial_cmp(&region(b).center(0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mid = sorted.len() / 2;
    let moved = sorted.split_off(mid);
    (sorted, moved)
}

fn region_of<T>(items: &[T], region: impl Fn(&T) -> &TemporalRegion) -> TemporalRegion {
    let mut acc = TemporalRegion::empty();
    for item in items {
        acc.expand(region(item));
    }
    acc
}

// ============================================================================
// Drop Implementation
// ============================================================================

impl Drop for MVRTree {
    fn drop(&mut self) {
        if !*self.closed.read() {
            if let Err(e) = self.flush() {
                log::error!("Failed to flush multi-version R-Tree on drop: {}", e);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
