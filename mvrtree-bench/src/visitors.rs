//! Query instrumentation plugged into the index.

use std::io::{self, Write};

use mvrtree::{DataItem, NodeView, PageId, QueryStrategy, TemporalRegion, Visitor};

/// Nodes touched by queries, split by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoStats {
    pub index_node_visits: u64,
    pub leaf_node_visits: u64,
}

impl IoStats {
    pub fn total(&self) -> u64 {
        self.index_node_visits + self.leaf_node_visits
    }
}

/// Counts every node a query loads and writes matched identifiers to `sink`,
/// one per line. Counts accumulate across queries.
pub struct IoAccountingVisitor<W: Write> {
    stats: IoStats,
    sink: W,
    write_error: Option<io::Error>,
}

impl<W: Write> IoAccountingVisitor<W> {
    pub fn new(sink: W) -> Self {
        Self {
            stats: IoStats::default(),
            sink,
            write_error: None,
        }
    }

    pub fn stats(&self) -> IoStats {
        self.stats
    }

    /// Flush the sink and return the counts, or the first write failure.
    pub fn finish(mut self) -> io::Result<IoStats> {
        if let Some(e) = self.write_error.take() {
            return Err(e);
        }
        self.sink.flush()?;
        Ok(self.stats)
    }
}

impl<W: Write> Visitor for IoAccountingVisitor<W> {
    fn visit_node(&mut self, node: &NodeView<'_>) {
        if node.is_leaf() {
            self.stats.leaf_node_visits += 1;
        } else {
            self.stats.index_node_visits += 1;
        }
    }

    fn visit_data(&mut self, item: &DataItem<'_>) {
        if self.write_error.is_some() {
            return;
        }
        if let Err(e) = writeln!(self.sink, "{}", item.identifier()) {
            log::error!("Failed to write result {}: {}", item.identifier(), e);
            self.write_error = Some(e);
        }
    }

    fn visit_data_batch(&mut self, _items: &[DataItem<'_>]) {}
}

/// Captures the bounding region of the root and stops the traversal.
#[derive(Debug, Default)]
pub struct RootExtentProbe {
    extent: Option<TemporalRegion>,
}

impl RootExtentProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until a non-empty index has been probed.
    pub fn extent(&self) -> Option<&TemporalRegion> {
        self.extent.as_ref()
    }
}

impl QueryStrategy for RootExtentProbe {
    fn next_entry(&mut self, entry: &NodeView<'_>) -> Option<PageId> {
        self.extent = Some(entry.shape());
        None
    }
}
