use criterion::{black_box, criterion_group, criterion_main, Criterion};

use memtrain_core::reconcile::{reconcile_fixed_slot, reconcile_free_form};

fn labels(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("word{i}")).collect()
}

fn bench_free_form(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_free_form");

    for n in [10usize, 50, 200] {
        let targets = labels(n);
        // Reversed with a few misses and extras mixed in.
        let mut entries: Vec<String> = targets.iter().rev().step_by(2).cloned().collect();
        entries.extend((0..n / 10).map(|i| format!("extra{i}")));

        group.bench_function(format!("n={n}"), |b| {
            b.iter(|| {
                reconcile_free_form(black_box(targets.as_slice()), black_box(entries.as_slice()))
            })
        });
    }

    group.finish();
}

fn bench_fixed_slot(c: &mut Criterion) {
    let targets = labels(100);
    let mut entries = targets.clone();
    entries.swap(3, 97);
    entries[50].clear();

    c.bench_function("reconcile_fixed_slot/n=100", |b| {
        b.iter(|| {
            reconcile_fixed_slot(black_box(targets.as_slice()), black_box(entries.as_slice()))
        })
    });
}

criterion_group!(benches, bench_free_form, bench_fixed_slot);
criterion_main!(benches);
