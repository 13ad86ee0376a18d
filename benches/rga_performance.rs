//! Performance benchmarks for the RGA CRDT manager.
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rga_filesync::CrdtManager;
use rga_filesync::protocol::edit::Op;

const DOC: &str = "bench";

fn to_wire_op(manager: &CrdtManager, ch: char, origin: &rga_filesync::CharId) -> Op {
    Op::Insert {
        site: manager.site_id().to_string(),
        clock: manager.clock(),
        content: ch.to_string(),
        origin_left_site: if origin.is_sentinel() {
            String::new()
        } else {
            origin.site.to_string()
        },
        origin_left_clock: if origin.is_sentinel() { 0 } else { origin.clock },
    }
}

fn bench_sequential_insertions(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_insertions");

    for size in [100, 500, 1000, 5000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("append_chars", size), size, |b, &size| {
            b.iter(|| {
                let manager = CrdtManager::new("bench-site");
                for i in 0..size {
                    let ch = (b'A' + (i % 26) as u8) as char;
                    black_box(manager.local_insert(DOC, i as usize, ch).unwrap());
                }
            });
        });
    }
    group.finish();
}

fn bench_insert_at_head(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_at_head");

    for size in [100, 500, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("prepend_chars", size), size, |b, &size| {
            b.iter(|| {
                let manager = CrdtManager::new("bench-site");
                for i in 0..size {
                    let ch = (b'A' + (i % 26) as u8) as char;
                    black_box(manager.local_insert(DOC, 0, ch).unwrap());
                }
            });
        });
    }
    group.finish();
}

fn bench_random_deletes(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_deletes");

    for size in [100, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("delete_from_head", size), size, |b, &size| {
            b.iter_batched(
                || {
                    let manager = CrdtManager::new("bench-site");
                    for i in 0..size {
                        manager.local_insert(DOC, i as usize, 'x').unwrap();
                    }
                    manager
                },
                |manager| {
                    for _ in 0..size {
                        black_box(manager.local_delete(DOC, 0).unwrap());
                    }
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_remote_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("remote_apply");

    for size in [100, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("apply_ops", size), size, |b, &size| {
            let source = CrdtManager::new("source");
            let mut ops = Vec::with_capacity(size as usize);
            for i in 0..size {
                let ch = (b'A' + (i % 26) as u8) as char;
                let insert = source.local_insert(DOC, i as usize, ch).unwrap();
                ops.push(to_wire_op(&source, ch, &insert.origin_left));
            }

            b.iter_batched(
                || CrdtManager::new("replica"),
                |replica| {
                    for op in &ops {
                        black_box(replica.apply_remote(DOC, op.clone()).unwrap());
                    }
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_multi_replica_convergence(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_replica_convergence");

    for num_replicas in [2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::new("replicas", num_replicas),
            num_replicas,
            |b, &num_replicas| {
                b.iter(|| {
                    let managers: Vec<CrdtManager> = (0..num_replicas)
                        .map(|i| CrdtManager::new(format!("site-{i}")))
                        .collect();

                    let mut all_ops = Vec::new();
                    for (i, manager) in managers.iter().enumerate() {
                        let ch = (b'A' + i as u8) as char;
                        let insert = manager.local_insert(DOC, 0, ch).unwrap();
                        all_ops.push(to_wire_op(manager, ch, &insert.origin_left));
                    }

                    for manager in &managers {
                        for op in &all_ops {
                            black_box(manager.apply_remote(DOC, op.clone()).unwrap());
                        }
                    }
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_sequential_insertions,
    bench_insert_at_head,
    bench_random_deletes,
    bench_remote_apply,
    bench_multi_replica_convergence,
);
criterion_main!(benches);
