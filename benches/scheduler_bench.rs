//! Benchmarks for the hot paths of the execution substrate.
//!
//! Covers:
//! - Memory pool alloc/free and write/read cycles
//! - Scheduler enqueue + run_once throughput
//! - Priority selection over a deep task list

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use monolith::core::{MemoryPool, Scheduler};
use monolith::infra::ipc::message_channel_with_capacity;
use serde_json::{json, Map, Value};

fn payload(op: &str, priority: i32) -> Map<String, Value> {
    json!({"meta": {"owner": "bench-tenant", "priority": priority}, "op": op})
        .as_object()
        .cloned()
        .unwrap()
}

// ============================================================================
// Memory Pool Benchmarks
// ============================================================================

fn bench_memory_alloc_free(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_alloc_free");

    for count in [100_u64, 1_000, 5_000] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut pool = MemoryPool::new(64 * 1024 * 1024);
                for i in 0..count {
                    pool.alloc(&format!("region-{i}"), "bench-task", 1024).unwrap();
                }
                for i in 0..count {
                    pool.free(&format!("region-{i}"), "bench-task").unwrap();
                }
                black_box(pool.used_bytes());
            });
        });
    }
    group.finish();
}

fn bench_memory_write_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_write_read");

    for size in [256_usize, 4_096, 65_536] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut pool = MemoryPool::new(1024 * 1024);
            pool.alloc("scratch", "bench-task", size).unwrap();
            let data = vec![0xA5_u8; size];
            b.iter(|| {
                pool.write("scratch", "bench-task", 0, &data).unwrap();
                let out = pool.read("scratch", 0, size).unwrap();
                black_box(out.len());
            });
        });
    }
    group.finish();
}

// ============================================================================
// Scheduler Benchmarks
// ============================================================================

fn bench_scheduler_enqueue_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_enqueue_run");

    for count in [100_u64, 500, 1_000] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let (tx, rx) = message_channel_with_capacity(count as usize + 1);
                let mut scheduler = Scheduler::new(tx, 10, 1024 * 1024);
                for i in 0..count {
                    scheduler.enqueue_from_payload(payload("noop", (i % 7) as i32));
                }
                while scheduler.task_count() > 0 {
                    scheduler.run_once().unwrap();
                }
                black_box(rx.len());
            });
        });
    }
    group.finish();
}

fn bench_scheduler_priority_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_priority_selection");

    group.bench_function("deep_task_list_one_quantum", |b| {
        b.iter_batched(
            || {
                let (tx, rx) = message_channel_with_capacity(8);
                let mut scheduler = Scheduler::new(tx, 10, 1024 * 1024);
                for i in 0..2_000_i32 {
                    scheduler.enqueue_from_payload(payload("noop", i % 100));
                }
                (scheduler, rx)
            },
            |(mut scheduler, rx)| {
                scheduler.run_once().unwrap();
                black_box(rx.len());
            },
            criterion::BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(
    memory_benches,
    bench_memory_alloc_free,
    bench_memory_write_read
);

criterion_group!(
    scheduler_benches,
    bench_scheduler_enqueue_run,
    bench_scheduler_priority_selection
);

criterion_main!(memory_benches, scheduler_benches);
