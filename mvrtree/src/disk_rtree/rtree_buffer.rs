//! LRU page buffer sitting between the tree and its disk storage.
//!
//! Pages are loaded from disk only when first requested. Requests served from
//! memory count as buffer hits, the rest as misses (and disk reads). Dirty
//! pages are written back when they are evicted or when the buffer is flushed.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::rtree_storage::DiskStorage;
use super::rtree_types::{FileHeader, IndexResult, Node, PageId};

/// A cached page with its data and dirty flag
struct CachedPage {
    node: Node,
    dirty: bool,
}

/// LRU bookkeeping for cached pages.
struct PageCache {
    pages: HashMap<PageId, CachedPage>,
    /// LRU order (front = oldest, back = newest)
    lru_order: VecDeque<PageId>,
    max_pages: usize,
}

impl PageCache {
    fn new(max_pages: usize) -> Self {
        Self {
            pages: HashMap::new(),
            lru_order: VecDeque::new(),
            max_pages: max_pages.max(1),
        }
    }

    fn touch(&mut self, page_id: PageId) {
        self.lru_order.retain(|&id| id != page_id);
        self.lru_order.push_back(page_id);
    }

    fn get(&mut self, page_id: PageId) -> Option<&Node> {
        if self.pages.contains_key(&page_id) {
            self.touch(page_id);
            self.pages.get(&page_id).map(|cached| &cached.node)
        } else {
            None
        }
    }

    fn insert(&mut self, page_id: PageId, node: Node, dirty: bool) {
        self.touch(page_id);
        // A page that was dirty stays dirty until it is written back
        let dirty = dirty || self.pages.get(&page_id).is_some_and(|c| c.dirty);
        self.pages.insert(page_id, CachedPage { node, dirty });
    }

    fn needs_eviction(&self) -> bool {
        self.pages.len() >= self.max_pages
    }

    /// Least recently used page, left in place
    fn oldest(&self) -> Option<(PageId, &CachedPage)> {
        self.lru_order
            .iter()
            .find_map(|id| self.pages.get(id).map(|cached| (*id, cached)))
    }

    fn remove(&mut self, page_id: PageId) {
        self.lru_order.retain(|&id| id != page_id);
        self.pages.remove(&page_id);
    }

    fn dirty_pages(&self) -> Vec<PageId> {
        self.pages
            .iter()
            .filter(|(_, cached)| cached.dirty)
            .map(|(id, _)| *id)
            .collect()
    }

    fn len(&self) -> usize {
        self.pages.len()
    }

    fn contains(&self, page_id: PageId) -> bool {
        self.pages.contains_key(&page_id)
    }
}

/// Buffer access counters
struct BufferStatistics {
    hits: AtomicU64,
    misses: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl BufferStatistics {
    fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }
}

/// Page buffer owning the [`DiskStorage`] it caches.
///
/// Dropping the buffer drops the storage after it, which gives the release
/// order tree, then buffer, then storage when the tree owns the buffer.
pub struct PageBuffer {
    cache: RwLock<PageCache>,
    stats: BufferStatistics,
    // declared last so the file outlives the cache
    storage: DiskStorage,
}

impl PageBuffer {
    /// Create a buffer holding at most `capacity_pages` pages in memory
    pub fn new(storage: DiskStorage, capacity_pages: usize) -> Self {
        Self {
            cache: RwLock::new(PageCache::new(capacity_pages)),
            stats: BufferStatistics::new(),
            storage,
        }
    }

    pub fn storage(&self) -> &DiskStorage {
        &self.storage
    }

    /// Read a node - first checks the cache, then loads from disk.
    pub fn read_node(&self, page_id: PageId) -> IndexResult<Node> {
        {
            let mut cache = self.cache.write();
            if let Some(node) = cache.get(page_id) {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(node.clone());
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        self.stats.reads.fetch_add(1, Ordering::Relaxed);

        let node = self.storage.read_page(page_id)?;
        self.cache_node(page_id, node.clone(), false)?;
        Ok(node)
    }

    /// Write a node to the buffer, marked dirty for a later write-back
    pub fn write_node(&self, page_id: PageId, node: Node) -> IndexResult<()> {
        self.cache_node(page_id, node, true)
    }

    /// Add a node to the cache, evicting (and writing back) old pages if full.
    fn cache_node(&self, page_id: PageId, node: Node, dirty: bool) -> IndexResult<()> {
        let mut cache = self.cache.write();

        if !cache.contains(page_id) {
            while cache.needs_eviction() {
                let evict_id = match cache.oldest() {
                    Some((evict_id, cached)) => {
                        // a dirty page leaves memory only once it is on disk
                        if cached.dirty {
                            self.storage.write_page(evict_id, &cached.node)?;
                            self.stats.writes.fetch_add(1, Ordering::Relaxed);
                        }
                        evict_id
                    }
                    None => break,
                };
                cache.remove(evict_id);
            }
        }

        cache.insert(page_id, node, dirty);
        Ok(())
    }

    pub fn read_header(&self) -> IndexResult<FileHeader> {
        self.storage.read_header()
    }

    pub fn write_header(&self, header: &FileHeader) -> IndexResult<()> {
        self.storage.write_header(header)
    }

    /// Write back all dirty pages and the header, then sync the file
    pub fn flush(&self, header: &FileHeader) -> IndexResult<()> {
        let mut cache = self.cache.write();
        for page_id in cache.dirty_pages() {
            if let Some(cached) = cache.pages.get_mut(&page_id) {
                self.storage.write_page(page_id, &cached.node)?;
                self.stats.writes.fetch_add(1, Ordering::Relaxed);
                cached.dirty = false;
            }
        }

        self.storage.write_header(header)?;
        self.storage.sync()
    }

    /// Requests served from memory
    pub fn hits(&self) -> u64 {
        self.stats.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.stats.misses.load(Ordering::Relaxed)
    }

    /// Pages read from disk
    pub fn reads(&self) -> u64 {
        self.stats.reads.load(Ordering::Relaxed)
    }

    /// Pages written to disk
    pub fn writes(&self) -> u64 {
        self.stats.writes.load(Ordering::Relaxed)
    }

    pub fn cached_pages(&self) -> usize {
        self.cache.read().len()
    }
}
