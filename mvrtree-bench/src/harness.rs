//! Build-or-reopen driver and result reporting.

use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::PathBuf;

use mvrtree::{DiskStorage, MVRTree, MultiVersionIndex, PageBuffer, PropertySet, TemporalRegion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{BenchConfig, ConfigLoader};
use crate::data_gen::{Clock, WorkloadGenerator};
use crate::errors::{HarnessError, HarnessResult};
use crate::visitors::{IoAccountingVisitor, IoStats, RootExtentProbe};

/// Process exit code for every failed run
pub const EXIT_FAILURE: i32 = -1;

/// The two accepted command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Create a fresh index, insert, then query
    Build {
        index_name: String,
        query_count: u64,
        insertion_count: u64,
        config_path: PathBuf,
    },
    /// Reopen an existing index and query it
    Reopen { index_name: String, query_count: u64 },
}

fn parse_count(name: &'static str, value: &str) -> HarnessResult<u64> {
    value
        .parse()
        .map_err(|source| HarnessError::InvalidArgument {
            name,
            value: value.to_string(),
            source,
        })
}

impl Invocation {
    /// Parse the full argument vector, program name included.
    pub fn from_args(args: &[String]) -> HarnessResult<Self> {
        match args {
            [_, index_name, query_count, insertion_count, config_path] => Ok(Invocation::Build {
                index_name: index_name.clone(),
                query_count: parse_count("query count", query_count)?,
                insertion_count: parse_count("insertion count", insertion_count)?,
                config_path: PathBuf::from(config_path),
            }),
            [_, index_name, query_count] => Ok(Invocation::Reopen {
                index_name: index_name.clone(),
                query_count: parse_count("query count", query_count)?,
            }),
            _ => Err(HarnessError::Usage {
                program: program_name(args),
                given: args.len().saturating_sub(1),
            }),
        }
    }

    pub fn index_name(&self) -> &str {
        match self {
            Invocation::Build { index_name, .. } | Invocation::Reopen { index_name, .. } => {
                index_name
            }
        }
    }

    pub fn query_count(&self) -> u64 {
        match self {
            Invocation::Build { query_count, .. } | Invocation::Reopen { query_count, .. } => {
                *query_count
            }
        }
    }
}

fn program_name(args: &[String]) -> String {
    args.first()
        .cloned()
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage: {program} <indexName> <queryCount> <insertionCount> <configPath>\n       {program} <indexName> <queryCount>"
    )
}

/// What a completed run measured.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Root region after the workload, `None` for an empty index
    pub extent: Option<TemporalRegion>,
    /// Insertions plus queries issued
    pub operations: u64,
    /// Clock value when the run ended
    pub time: u64,
    /// Index summary as printed by the index itself
    pub summary: String,
    pub io: IoStats,
    pub buffer_hits: u64,
}

impl Display for RunReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.extent {
            Some(extent) => writeln!(f, "Indexed space: {}", extent)?,
            None => writeln!(f, "Indexed space: empty")?,
        }
        writeln!(f, "Operations: {}", self.operations)?;
        writeln!(f, "{}", self.summary)?;
        writeln!(f, "Index I/O: {}", self.io.index_node_visits)?;
        writeln!(f, "Leaf I/O: {}", self.io.leaf_node_visits)?;
        write!(f, "Buffer hits: {}", self.buffer_hits)
    }
}

/// Drives one workload against one index.
pub struct Harness<R: Rng> {
    config: BenchConfig,
    generator: WorkloadGenerator,
    rng: R,
}

impl Harness<StdRng> {
    pub fn new(config: BenchConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Reproducible workload for a given seed
    pub fn seeded(config: BenchConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Harness<R> {
    pub fn with_rng(config: BenchConfig, rng: R) -> Self {
        Self {
            config,
            generator: WorkloadGenerator::default(),
            rng,
        }
    }

    pub fn with_generator(mut self, generator: WorkloadGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Run the workload. Matched identifiers go to `out`, diagnostics and
    /// the final statistics block to `err`.
    pub fn run<O: Write, E: Write>(
        &mut self,
        invocation: &Invocation,
        out: &mut O,
        err: &mut E,
    ) -> HarnessResult<RunReport> {
        let path = self.config.storage_path(invocation.index_name());
        let mut operations = 0u64;

        let (tree, clock) = match invocation {
            Invocation::Build {
                insertion_count,
                config_path,
                ..
            } => {
                let properties = match ConfigLoader::load(config_path) {
                    Ok(properties) => properties,
                    Err(e) => {
                        writeln!(err, "{}", e)?;
                        PropertySet::new()
                    }
                };

                let storage = DiskStorage::create(&path)?;
                let buffer = PageBuffer::new(storage, self.config.buffer_pages);
                let tree = MVRTree::create(buffer, &properties)?;

                let mut clock = Clock::new();
                let payload = vec![0u8; self.config.payload_size];
                for _ in 0..*insertion_count {
                    let region = self.generator.next_insertion_region(&mut self.rng, &mut clock);
                    tree.insert_data(&payload, &region, operations)?;
                    operations += 1;
                }
                log::debug!(
                    "Inserted {} entries into {:?}, time is {}",
                    insertion_count,
                    path,
                    clock.time()
                );
                (tree, clock)
            }
            Invocation::Reopen { .. } => {
                let storage = DiskStorage::open(&path)?;
                let buffer = PageBuffer::new(storage, self.config.buffer_pages);
                let tree = MVRTree::open(buffer)?;
                let clock = Clock::starting_at(tree.latest_version());
                (tree, clock)
            }
        };

        let io = self.query(&tree, invocation.query_count(), &clock, &mut operations, out)?;

        let mut probe = RootExtentProbe::new();
        tree.query_strategy(&mut probe)?;

        let report = RunReport {
            extent: probe.extent().copied(),
            operations,
            time: clock.time(),
            summary: tree.to_string(),
            io,
            buffer_hits: tree.buffer().hits(),
        };
        writeln!(err, "{}", report)?;

        tree.close()?;
        Ok(report)
    }

    fn query<O: Write>(
        &mut self,
        tree: &MVRTree,
        query_count: u64,
        clock: &Clock,
        operations: &mut u64,
        out: &mut O,
    ) -> HarnessResult<IoStats> {
        let mut visitor = IoAccountingVisitor::new(out);

        if clock.time() == 0 && query_count > 0 {
            log::warn!(
                "Skipping {} queries: the index holds no history yet",
                query_count
            );
            return Ok(visitor.finish()?);
        }

        for _ in 0..query_count {
            let region = self.generator.next_query_region(&mut self.rng, clock)?;
            tree.intersects_with_query(&region, &mut visitor)?;
            *operations += 1;
        }
        Ok(visitor.finish()?)
    }
}

/// Report a failed run on `err` and map it to the process exit code.
pub fn report_error<E: Write>(error: &HarnessError, err: &mut E) -> i32 {
    // nothing left to report to if stderr itself fails
    let _ = match error {
        HarnessError::Usage { program, .. } => writeln!(err, "{}", usage(program)),
        HarnessError::Engine(e) => writeln!(err, "******ERROR******\nindex error: {}", e),
        other => writeln!(err, "******ERROR******\nunknown error: {}", other),
    };
    EXIT_FAILURE
}

fn run_once<O: Write, E: Write>(
    args: &[String],
    out: &mut O,
    err: &mut E,
) -> HarnessResult<RunReport> {
    let invocation = Invocation::from_args(args)?;
    Harness::new(BenchConfig::default()).run(&invocation, out, err)
}

/// Parse `args`, run the harness with a fresh random seed and return the
/// process exit code.
pub fn run_main<O: Write, E: Write>(args: &[String], out: &mut O, err: &mut E) -> i32 {
    match run_once(args, out, err) {
        Ok(_) => 0,
        Err(e) => {
            log::error!("Harness run failed: {}", e);
            report_error(&e, err)
        }
    }
}
