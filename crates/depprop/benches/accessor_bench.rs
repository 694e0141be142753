//! Benchmarks for dependent-property accessors.
//!
//! Measures the cost of the plain and reactive paths, with and without a
//! running computation, plus installation on objects with many slots.
//!
//! Run with: cargo bench -p depprop -- accessor

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use depprop::{DepOptions, DepProps, Deps, Object, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn installed(deps: &Deps) -> Object {
    let props = DepProps::new(deps.clone());
    let obj = Object::new();
    if let Err(err) = props.install(&obj, "count", DepOptions::new()) {
        panic!("install: {err}");
    }
    obj.set("count", 0);
    obj
}

// ---------------------------------------------------------------------------
// 1. Reads
// ---------------------------------------------------------------------------

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("accessor/read");
    let deps = Deps::new();
    let obj = installed(&deps);

    group.bench_function("plain", |b| b.iter(|| black_box(obj.get("count"))));
    group.bench_function("reactive_untracked", |b| {
        b.iter(|| black_box(obj.get("$count")))
    });
    group.bench_function("reactive_tracked", |b| {
        b.iter(|| {
            let reader = obj.clone();
            let comp = deps.autorun(move |_| {
                black_box(reader.get("$count"));
            });
            black_box(comp.run_count())
        })
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// 2. Writes
// ---------------------------------------------------------------------------

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("accessor/write");
    let deps = Deps::new();
    let obj = installed(&deps);

    let mut n = 0i32;
    group.bench_function("plain", |b| {
        b.iter(|| {
            n = n.wrapping_add(1);
            obj.set("count", n);
        })
    });
    group.bench_function("reactive_equal", |b| {
        obj.set("count", 1);
        b.iter(|| obj.set("$count", black_box(1)))
    });

    let reader = obj.clone();
    let _comp = deps.autorun(move |_| {
        black_box(reader.get("$count"));
    });
    let mut m = 0i32;
    group.bench_function("reactive_changed_flush", |b| {
        b.iter(|| {
            m = m.wrapping_add(1);
            obj.set("$count", m);
            black_box(deps.flush())
        })
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// 3. Installation
// ---------------------------------------------------------------------------

fn bench_install(c: &mut Criterion) {
    let mut group = c.benchmark_group("accessor/install");
    let names: Vec<String> = (0..1_000).map(|i| format!("slot{i}")).collect();

    for count in [10usize, 100, 1_000] {
        group.throughput(Throughput::Elements(count as u64));
        for (label, options) in [
            ("prepend", DepOptions::new()),
            ("namespaced", DepOptions::new().namespaced(true)),
        ] {
            group.bench_with_input(BenchmarkId::new(label, count), &count, |b, &count| {
                b.iter(|| {
                    let props = DepProps::new(Deps::new());
                    let obj = Object::new();
                    for name in &names[..count] {
                        let _ = black_box(props.install(&obj, name, options.clone()));
                    }
                    black_box(obj)
                })
            });
        }
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 4. Equality
// ---------------------------------------------------------------------------

fn bench_loose_equality(c: &mut Criterion) {
    let mut group = c.benchmark_group("accessor/loose_equals");
    let pairs = [
        (Value::from(42), Value::from("42")),
        (Value::from(" 0x10 "), Value::from(16)),
        (Value::Null, Value::Undefined),
        (Value::from(true), Value::from("1")),
    ];
    group.bench_function("mixed", |b| {
        b.iter(|| {
            pairs
                .iter()
                .filter(|(x, y)| black_box(x).loose_equals(black_box(y)))
                .count()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_read,
    bench_write,
    bench_install,
    bench_loose_equality,
);
criterion_main!(benches);
