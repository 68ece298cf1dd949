//! MultiVersionIndex trait definition.

use crate::disk_rtree::rtree_types::{DataId, IndexResult, IndexStatistics};
use crate::region::TemporalRegion;
use crate::visitor::{QueryStrategy, Visitor};

/// Represents a multi-version spatial index.
///
/// This trait is the contract a benchmark or application drives: inserting
/// time-stamped regions, range queries observed through a [`Visitor`], custom
/// walks driven by a [`QueryStrategy`] and statistics. Construction is left to
/// the implementing type since creating and reopening need different inputs.
pub trait MultiVersionIndex: std::fmt::Display {
    /// Inserts a data entry with the given payload, region and identifier.
    fn insert_data(&self, payload: &[u8], region: &TemporalRegion, id: DataId) -> IndexResult<()>;

    /// Reports every node loaded and every entry intersecting `query` to `visitor`.
    fn intersects_with_query(
        &self,
        query: &TemporalRegion,
        visitor: &mut dyn Visitor,
    ) -> IndexResult<()>;

    /// Walks the index starting at the root, as directed by `strategy`.
    /// An empty index never calls the strategy.
    fn query_strategy(&self, strategy: &mut dyn QueryStrategy) -> IndexResult<()>;

    /// Gets a snapshot of the index statistics.
    fn statistics(&self) -> IndexStatistics;

    /// Latest version stored, i.e. the largest `valid_to` ever inserted.
    fn latest_version(&self) -> u64;

    /// Gets the number of data entries.
    fn size(&self) -> u64;

    /// Closes this index, flushing all pending changes.
    fn close(&self) -> IndexResult<()>;
}
