//! Multi-version R-Tree benchmark harness
//!
//! Builds or reopens an index, runs a randomized space-time workload against
//! it and reports how many index and leaf nodes the queries touched.

pub mod config;
pub mod data_gen;
pub mod errors;
pub mod harness;
pub mod visitors;

pub use errors::{HarnessError, HarnessResult};
pub use harness::{run_main, Harness, Invocation, RunReport};
