//! Relation chain and bulk commit benchmarks.
//!
//! ```bash
//! cargo bench -p cfgdb --bench chain
//! cargo bench -p cfgdb --bench chain -- "chain/walk"
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cfgdb::{
    AttrType, AttributeDef, Cardinality, ClassDef, Configuration, DbConfig, ObjectRef,
    RelationDef, SchemaDescriptor,
};
use tempfile::TempDir;

const CHAIN_LENGTHS: &[usize] = &[1_000, 10_000];
const BULK_SIZES: &[usize] = &[1_000, 10_000];

// =============================================================================
// Helpers
// =============================================================================

/// A temporary directory with a schema of one self-linked class.
fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    let schema = SchemaDescriptor::new().with_class(
        ClassDef::new("Link")
            .with_attribute(AttributeDef::new("level", AttrType::U32))
            .with_relation(RelationDef::new("Next", "Link", Cardinality::ZeroOrOne)),
    );
    std::fs::write(
        dir.path().join("bench.schema.json"),
        schema.to_json_string().unwrap(),
    )
    .unwrap();
    dir
}

fn config() -> DbConfig {
    DbConfig {
        sync_on_commit: false,
        ..DbConfig::default()
    }
}

fn new_db(dir: &TempDir, name: &str) -> Configuration {
    let mut db = Configuration::open_with("jsonfile", config()).unwrap();
    db.recreate_db(dir.path().join(name), &["bench.schema.json"])
        .unwrap();
    db
}

fn build_chain(db: &mut Configuration, length: usize) -> ObjectRef {
    let mut prev: Option<ObjectRef> = None;
    for i in 0..length {
        let oref = db
            .create_obj("Link", &format!("link-{i}"))
            .unwrap()
            .set_obj("Next", prev.as_ref())
            .unwrap()
            .oref()
            .clone();
        prev = Some(oref);
    }
    prev.unwrap()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn chain_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain/walk");
    for &length in CHAIN_LENGTHS {
        let dir = setup();
        let mut db = new_db(&dir, "chain.data.json");
        let tail = build_chain(&mut db, length);

        group.throughput(Throughput::Elements(length as u64));
        group.bench_with_input(BenchmarkId::from_parameter(length), &tail, |b, tail| {
            b.iter(|| black_box(db.walk(tail, "Next").unwrap().count()))
        });
    }
    group.finish();
}

fn chain_test_object(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain/test_object");
    for &length in CHAIN_LENGTHS {
        let dir = setup();
        let mut db = new_db(&dir, "chain.data.json");
        let tail = build_chain(&mut db, length);

        group.bench_with_input(BenchmarkId::from_parameter(length), &tail, |b, tail| {
            b.iter(|| {
                let mut visited = std::collections::HashSet::new();
                black_box(db.test_object(tail.class(), tail.id(), length, &mut visited))
            })
        });
    }
    group.finish();
}

fn chain_reload(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain/reload");
    group.sample_size(10);
    for &length in CHAIN_LENGTHS {
        let dir = setup();
        let mut db = new_db(&dir, "chain.data.json");
        build_chain(&mut db, length);
        db.commit("bench chain").unwrap();
        let path = dir.path().join("chain.data.json").display().to_string();

        group.bench_with_input(BenchmarkId::from_parameter(length), &path, |b, path| {
            b.iter(|| {
                db.load(path).unwrap();
                black_box(db.count("Link").unwrap())
            })
        });
    }
    group.finish();
}

fn bulk_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk/commit");
    group.sample_size(10);
    for &size in BULK_SIZES {
        let dir = setup();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut db = new_db(&dir, "bulk.data.json");
                for i in 0..size {
                    db.create_obj("Link", &format!("bulk-{i}"))
                        .unwrap()
                        .set_value("level", i as u64)
                        .unwrap();
                }
                black_box(db.commit("bench bulk").unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, chain_walk, chain_test_object, chain_reload, bulk_commit);
criterion_main!(benches);
