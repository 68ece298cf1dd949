use serde::{Deserialize, Serialize};

/// Number of spatial dimensions handled by the index.
pub const DIMENSION: usize = 2;

/// A 2D rectangle paired with a closed validity interval `[valid_from, valid_to]`.
///
/// `TemporalRegion` is the key type of the multi-version R-Tree. Data entries
/// carry the region they were inserted with, internal nodes carry the union
/// of their children, and queries are expressed as a region as well: an entry
/// matches a query when the rectangles intersect and the intervals overlap.
///
/// # Examples
///
/// ```rust
/// use mvrtree::TemporalRegion;
///
/// let stored = TemporalRegion::new([0.0, 0.0], [1.0, 1.0], 3, 3);
/// let query = TemporalRegion::new([0.5, 0.5], [2.0, 2.0], 0, 5);
/// assert!(stored.intersects(&query));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalRegion {
    /// Lower corner, one coordinate per dimension
    pub low: [f64; DIMENSION],
    /// Upper corner, one coordinate per dimension
    pub high: [f64; DIMENSION],
    /// First version in which the region is valid
    pub valid_from: u64,
    /// Last version in which the region is valid (inclusive)
    pub valid_to: u64,
}

impl std::fmt::Display for TemporalRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TemporalRegion([{}, {}] -> [{}, {}], t = [{}, {}])",
            self.low[0], self.low[1], self.high[0], self.high[1], self.valid_from, self.valid_to
        )
    }
}

impl TemporalRegion {
    /// Creates a new region from its corners and validity interval.
    pub fn new(
        low: [f64; DIMENSION],
        high: [f64; DIMENSION],
        valid_from: u64,
        valid_to: u64,
    ) -> TemporalRegion {
        TemporalRegion {
            low,
            high,
            valid_from,
            valid_to,
        }
    }

    /// Checks if the region is well formed (low <= high, from <= to).
    pub fn is_valid(&self) -> bool {
        (0..DIMENSION).all(|i| self.low[i] <= self.high[i]) && self.valid_from <= self.valid_to
    }

    /// Checks spatial intersection and temporal overlap. Touching boundaries count.
    pub fn intersects(&self, other: &TemporalRegion) -> bool {
        self.intersects_space(other) && self.overlaps_time(other)
    }

    /// Checks only the rectangles.
    pub fn intersects_space(&self, other: &TemporalRegion) -> bool {
        (0..DIMENSION).all(|i| self.low[i] <= other.high[i] && self.high[i] >= other.low[i])
    }

    /// Checks only the validity intervals.
    pub fn overlaps_time(&self, other: &TemporalRegion) -> bool {
        self.valid_from <= other.valid_to && self.valid_to >= other.valid_from
    }

    /// Spatial area of the rectangle.
    pub fn area(&self) -> f64 {
        (0..DIMENSION)
            .map(|i| self.high[i] - self.low[i])
            .product()
    }

    /// Number of versions covered by the interval. A point in time spans 1.
    pub fn time_span(&self) -> u64 {
        self.valid_to.saturating_sub(self.valid_from).saturating_add(1)
    }

    /// Space-time volume used to rank insertion paths.
    pub fn volume(&self) -> f64 {
        self.area() * self.time_span() as f64
    }

    /// Volume growth needed to also cover `other`.
    pub fn enlargement(&self, other: &TemporalRegion) -> f64 {
        self.merge(other).volume() - self.volume()
    }

    /// Midpoint along a spatial axis.
    pub fn center(&self, axis: usize) -> f64 {
        (self.low[axis] + self.high[axis]) / 2.0
    }

    /// Smallest region covering both.
    pub fn merge(&self, other: &TemporalRegion) -> TemporalRegion {
        let mut merged = *self;
        merged.expand(other);
        merged
    }

    /// Grows this region in place to also cover `other`.
    pub fn expand(&mut self, other: &TemporalRegion) {
        for i in 0..DIMENSION {
            self.low[i] = self.low[i].min(other.low[i]);
            self.high[i] = self.high[i].max(other.high[i]);
        }
        self.valid_from = self.valid_from.min(other.valid_from);
        self.valid_to = self.valid_to.max(other.valid_to);
    }

    /// The identity element of `expand`.
    pub fn empty() -> Self {
        Self {
            low: [f64::INFINITY; DIMENSION],
            high: [f64::NEG_INFINITY; DIMENSION],
            valid_from: u64::MAX,
            valid_to: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.is_valid()
    }
}
