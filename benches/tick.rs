//! Criterion benchmarks for the tick loop.
//!
//! Run with:
//!   cargo bench
//!   cargo bench --features parallel
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use neurograph::prelude::*;
use neurograph::prng::Prng;

fn make_array(capacity: usize, rows: usize, per_neuron: usize, seed: u64) -> NeuronArray {
    let mut array = NeuronArray::new(ArrayConfig::with_size(capacity, rows)).expect("valid config");
    let mut rng = Prng::new(seed);
    let models = [SynapseModel::Fixed, SynapseModel::Binary, SynapseModel::Hebbian];
    for source in 0..capacity {
        for _ in 0..per_neuron {
            let mut target = rng.gen_range_usize(0, capacity);
            if target == source {
                target = (target + 1) % capacity;
            }
            let weight = rng.gen_range_f32(0.2, 1.0);
            let model = models[rng.gen_range_usize(0, models.len())];
            array
                .add_synapse(source, target, weight, model)
                .expect("in-range wiring");
        }
    }
    array
}

/// tick() with varying population sizes and sqrt(n) connectivity.
fn bench_tick_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_size");

    for size in [1_000, 10_000, 100_000].iter() {
        let per_neuron = (*size as f64).sqrt() as usize / 8;
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut array = make_array(size, 100, per_neuron.max(2), 42);
            let mut rng = Prng::new(7);
            b.iter(|| {
                // Keep a trickle of activity so phase 2 has work to do.
                for _ in 0..size / 100 {
                    let id = rng.gen_range_usize(0, size);
                    array.stimulate(id, 1.0).unwrap();
                }
                array.tick();
                black_box(array.fire_count())
            });
        });
    }

    group.finish();
}

/// Editing throughput: undo-logged add/delete cycles plus reconciliation.
fn bench_edit_and_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("edit");

    group.bench_function("add_delete_undo_cycle", |b| {
        let mut array = make_array(1_000, 10, 4, 42);
        b.iter(|| {
            array
                .add_synapse_with_undo(5, 42, 0.75, SynapseModel::Fixed)
                .unwrap();
            array.delete_synapse_with_undo(5, 42).unwrap();
            array.undo_last();
            array.undo_last();
        });
    });

    group.bench_function("reconcile_10k", |b| {
        let mut array = make_array(10_000, 100, 8, 42);
        b.iter(|| {
            array.reconcile_graph();
            black_box(array.stats().back_refs)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_tick_sizes, bench_edit_and_reconcile);
criterion_main!(benches);
