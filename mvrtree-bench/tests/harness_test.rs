use std::fs;
use std::path::Path;

use mvrtree::{DiskStorage, MVRTree, MultiVersionIndex, PageBuffer};
use mvrtree_bench::config::{parse_properties, BenchConfig};
use mvrtree_bench::data_gen::{Clock, WorkloadGenerator};
use mvrtree_bench::visitors::{IoAccountingVisitor, IoStats};
use mvrtree_bench::{run_main, Harness, HarnessError, Invocation};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::{tempdir, TempDir};

#[ctor::ctor]
fn init() {
    colog::init();
}

fn write_config(dir: &TempDir, text: &str) -> String {
    let path = dir.path().join("index.cfg");
    fs::write(&path, text).unwrap();
    path.to_string_lossy().into_owned()
}

fn index_name(dir: &TempDir) -> String {
    dir.path().join("bench").to_string_lossy().into_owned()
}

fn build(dir: &TempDir, queries: u64, insertions: u64, config: &str) -> Invocation {
    Invocation::Build {
        index_name: index_name(dir),
        query_count: queries,
        insertion_count: insertions,
        config_path: config.into(),
    }
}

fn ids(out: &[u8]) -> Vec<u64> {
    String::from_utf8(out.to_vec())
        .unwrap()
        .lines()
        .map(|line| line.parse().unwrap())
        .collect()
}

const CONFIG: &str = "Dimension 2\nIndexCapacity 10\nLeafCapacity 20\nFillFactor 0.7\nTight 1\n";

#[test]
fn test_build_then_reopen_keeps_extent() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, CONFIG);

    let (mut out, mut err) = (Vec::new(), Vec::new());
    let built = Harness::seeded(BenchConfig::default(), 11)
        .run(&build(&dir, 20, 500, &config), &mut out, &mut err)
        .unwrap();

    assert!(Path::new(&format!("{}.mvrtree", index_name(&dir))).exists());
    assert_eq!(built.operations, 520);
    assert!(built.time > 0);
    assert!(built.io.leaf_node_visits > 0);
    assert!(built.io.index_node_visits > 0);
    assert!(ids(&out).iter().all(|id| *id < 500));

    let extent = built.extent.unwrap();
    assert!(extent.valid_from <= 1);
    assert_eq!(extent.valid_to, built.time);
    assert!(extent.low.iter().all(|v| *v >= 0.0));
    assert!(extent.high.iter().all(|v| *v < 1.1));

    let stats = String::from_utf8(err).unwrap();
    assert!(stats.contains("Operations: 520"));
    assert!(stats.contains("Number of data: 500"));
    assert!(stats.contains("Leaf capacity: 20"));

    let (mut out, mut err) = (Vec::new(), Vec::new());
    let reopened = Harness::seeded(BenchConfig::default(), 12)
        .run(
            &Invocation::Reopen {
                index_name: index_name(&dir),
                query_count: 15,
            },
            &mut out,
            &mut err,
        )
        .unwrap();

    assert_eq!(reopened.extent, built.extent);
    assert_eq!(reopened.time, built.time);
    assert_eq!(reopened.operations, 15);
    assert!(ids(&out).iter().all(|id| *id < 500));
}

#[test]
fn test_io_counts_grow_with_queries() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, CONFIG);

    let (mut out, mut err) = (Vec::new(), Vec::new());
    let few = Harness::seeded(BenchConfig::default(), 3)
        .run(&build(&dir, 1, 300, &config), &mut out, &mut err)
        .unwrap();

    let (mut out, mut err) = (Vec::new(), Vec::new());
    let many = Harness::seeded(BenchConfig::default(), 3)
        .run(&build(&dir, 50, 300, &config), &mut out, &mut err)
        .unwrap();

    // each query reads at least the root
    assert!(few.io.total() >= 1);
    assert!(many.io.index_node_visits >= 50);
    assert!(many.io.total() > few.io.total());
}

#[test]
fn test_io_stats_accumulate_query_by_query() {
    let dir = tempdir().unwrap();
    let storage = DiskStorage::create(dir.path().join("bench.mvrtree")).unwrap();
    let buffer = PageBuffer::new(storage, 10);
    let tree = MVRTree::create(buffer, &parse_properties(CONFIG)).unwrap();

    let generator = WorkloadGenerator::default();
    let mut rng = StdRng::seed_from_u64(21);
    let mut clock = Clock::new();
    for id in 0..400u64 {
        let region = generator.next_insertion_region(&mut rng, &mut clock);
        tree.insert_data(&[1], &region, id).unwrap();
    }

    let mut out = Vec::new();
    let mut visitor = IoAccountingVisitor::new(&mut out);
    let mut previous = IoStats::default();
    for _ in 0..100 {
        let query = generator.next_query_region(&mut rng, &clock).unwrap();
        tree.intersects_with_query(&query, &mut visitor).unwrap();

        let current = visitor.stats();
        assert!(current.index_node_visits >= previous.index_node_visits);
        assert!(current.leaf_node_visits >= previous.leaf_node_visits);
        // the root is read by every query
        assert!(current.total() > previous.total());
        previous = current;
    }

    let total = visitor.finish().unwrap();
    assert_eq!(total, previous);
    assert!(ids(&out).iter().all(|id| *id < 400));
}

#[test]
fn test_zero_insertions_skips_queries() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, CONFIG);

    let (mut out, mut err) = (Vec::new(), Vec::new());
    let report = Harness::seeded(BenchConfig::default(), 5)
        .run(&build(&dir, 10, 0, &config), &mut out, &mut err)
        .unwrap();

    assert_eq!(report.time, 0);
    assert_eq!(report.operations, 0);
    assert_eq!(report.io.total(), 0);
    assert!(report.extent.is_none());
    assert!(out.is_empty());
    assert!(String::from_utf8(err).unwrap().contains("Indexed space: empty"));
}

#[test]
fn test_clock_follows_generator() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, CONFIG);
    let generator = WorkloadGenerator {
        advance_probability: 1.0,
        ..WorkloadGenerator::default()
    };

    let (mut out, mut err) = (Vec::new(), Vec::new());
    let report = Harness::seeded(BenchConfig::default(), 8)
        .with_generator(generator)
        .run(&build(&dir, 3, 40, &config), &mut out, &mut err)
        .unwrap();

    assert_eq!(report.time, 40);
    let extent = report.extent.unwrap();
    assert_eq!((extent.valid_from, extent.valid_to), (1, 40));
}

#[test]
fn test_missing_config_fails_create() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.cfg").to_string_lossy().into_owned();

    let (mut out, mut err) = (Vec::new(), Vec::new());
    let result = Harness::seeded(BenchConfig::default(), 1).run(
        &build(&dir, 1, 10, &missing),
        &mut out,
        &mut err,
    );

    assert!(matches!(result, Err(HarnessError::Engine(_))));
    assert!(String::from_utf8(err).unwrap().contains("nope.cfg"));
}

#[test]
fn test_reopen_missing_index_fails() {
    let dir = tempdir().unwrap();
    let args = vec!["prog".to_string(), index_name(&dir), "3".to_string()];

    let (mut out, mut err) = (Vec::new(), Vec::new());
    assert_eq!(run_main(&args, &mut out, &mut err), -1);
    assert!(String::from_utf8(err).unwrap().contains("index error"));
}

#[test]
fn test_wrong_arity_exits_with_usage() {
    let args: Vec<String> = ["prog", "idx", "10", "20"].iter().map(|s| s.to_string()).collect();

    let (mut out, mut err) = (Vec::new(), Vec::new());
    assert_eq!(run_main(&args, &mut out, &mut err), -1);

    let text = String::from_utf8(err).unwrap();
    assert!(text.starts_with("Usage: prog"));
    assert!(out.is_empty());
}

#[test]
fn test_bad_count_is_unknown_error() {
    let args: Vec<String> = ["prog", "idx", "many"].iter().map(|s| s.to_string()).collect();

    let (mut out, mut err) = (Vec::new(), Vec::new());
    assert_eq!(run_main(&args, &mut out, &mut err), -1);
    assert!(String::from_utf8(err).unwrap().contains("unknown error"));
}

#[test]
fn test_run_main_build_and_reopen() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, CONFIG);
    let name = index_name(&dir);

    let build_args = vec![
        "prog".to_string(),
        name.clone(),
        "5".to_string(),
        "100".to_string(),
        config,
    ];
    let (mut out, mut err) = (Vec::new(), Vec::new());
    assert_eq!(run_main(&build_args, &mut out, &mut err), 0);

    let reopen_args = vec!["prog".to_string(), name, "5".to_string()];
    let (mut out, mut err) = (Vec::new(), Vec::new());
    assert_eq!(run_main(&reopen_args, &mut out, &mut err), 0);
    assert!(String::from_utf8(err).unwrap().contains("Operations: 5"));
}
