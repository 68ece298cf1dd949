//! Workload generators

use std::ops::Range;

use mvrtree::{TemporalRegion, DIMENSION};
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkloadError {
    #[error("no time has elapsed, cannot pick a query window")]
    NoHistory,
}

/// Discrete time of a run. Only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clock {
    time: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(time: u64) -> Self {
        Self { time }
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn advance(&mut self) {
        self.time += 1;
    }
}

/// Random insertion and query regions inside the unit square.
#[derive(Debug, Clone)]
pub struct WorkloadGenerator {
    /// Side length of inserted rectangles
    pub insert_extent: Range<f64>,
    /// Side length of query rectangles
    pub query_extent: Range<f64>,
    /// Chance that an insertion moves the clock forward
    pub advance_probability: f64,
}

impl Default for WorkloadGenerator {
    fn default() -> Self {
        Self {
            insert_extent: 0.0001..0.1,
            query_extent: 0.001..0.2,
            advance_probability: 0.2,
        }
    }
}

impl WorkloadGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn rectangle<R: Rng + ?Sized>(
        rng: &mut R,
        extent: &Range<f64>,
    ) -> ([f64; DIMENSION], [f64; DIMENSION]) {
        let mut low = [0.0; DIMENSION];
        let mut high = [0.0; DIMENSION];
        for axis in 0..DIMENSION {
            low[axis] = rng.gen_range(0.0..1.0);
            high[axis] = low[axis] + rng.gen_range(extent.clone());
        }
        (low, high)
    }

    /// Rectangle valid at the current instant only. May advance the clock
    /// first, so the region carries the new time.
    pub fn next_insertion_region<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        clock: &mut Clock,
    ) -> TemporalRegion {
        let (low, high) = Self::rectangle(rng, &self.insert_extent);

        if rng.gen_range(0.0..1.0) >= 1.0 - self.advance_probability {
            clock.advance();
        }

        let time = clock.time();
        TemporalRegion::new(low, high, time, time)
    }

    /// Rectangle over a window inside `[0, time]` that starts in the first
    /// half of history and ends in the second.
    pub fn next_query_region<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        clock: &Clock,
    ) -> Result<TemporalRegion, WorkloadError> {
        let time = clock.time();
        if time == 0 {
            return Err(WorkloadError::NoHistory);
        }

        let (low, high) = Self::rectangle(rng, &self.query_extent);
        let half = time / 2;
        let valid_from = rng.gen_range(0..=half);
        let valid_to = rng.gen_range(half + 1..=time);

        Ok(TemporalRegion::new(low, high, valid_from, valid_to))
    }
}
