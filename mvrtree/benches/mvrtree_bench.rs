//! Multi-version R-Tree benchmarks

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use mvrtree::{
    DataItem, DiskStorage, MVRTree, MultiVersionIndex, NodeView, PageBuffer, PropertySet,
    PropertyValue, TemporalRegion, Visitor,
};
use std::hint::black_box;
use std::path::Path;
use tempfile::tempdir;

#[derive(Default)]
struct CountingVisitor {
    nodes: u64,
    results: u64,
}

impl Visitor for CountingVisitor {
    fn visit_node(&mut self, _node: &NodeView<'_>) {
        self.nodes += 1;
    }

    fn visit_data(&mut self, _item: &DataItem<'_>) {
        self.results += 1;
    }
}

fn create_tree(path: &Path) -> MVRTree {
    let mut properties = PropertySet::new();
    properties.set("Dimension", PropertyValue::UnsignedInt(2));
    let storage = DiskStorage::create(path).unwrap();
    MVRTree::create(PageBuffer::new(storage, 64), &properties).unwrap()
}

fn region(i: u64) -> TemporalRegion {
    let x = (i % 100) as f64;
    let y = (i / 100) as f64;
    TemporalRegion::new([x, y], [x + 1.0, y + 1.0], i / 50, i / 50)
}

fn bench_mvrtree_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("MVRTree Insert");

    for size in [100u64, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_with_setup(
                || {
                    let dir = tempdir().unwrap();
                    let path = dir.path().join("bench.mvrtree");
                    (create_tree(&path), dir)
                },
                |(tree, _dir)| {
                    for i in 0..size {
                        tree.insert_data(&[1], &region(i), i).unwrap();
                    }
                    black_box(tree.size())
                },
            );
        });
    }

    group.finish();
}

fn bench_mvrtree_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("MVRTree Query");

    let dir = tempdir().unwrap();
    let tree = create_tree(&dir.path().join("bench.mvrtree"));
    for i in 0..10000 {
        tree.insert_data(&[1], &region(i), i).unwrap();
    }

    group.bench_function("window_10k", |b| {
        b.iter(|| {
            let query = TemporalRegion::new([25.0, 25.0], [75.0, 75.0], 40, 60);
            let mut visitor = CountingVisitor::default();
            tree.intersects_with_query(&query, &mut visitor).unwrap();
            black_box((visitor.nodes, visitor.results))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_mvrtree_insert, bench_mvrtree_query);
criterion_main!(benches);
