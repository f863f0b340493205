use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use retro_exporter_sdk::{encode_frame, Emitter, Frame, Sample, SplitFields, Value};

const BUTTONS: [&str; 12] = [
    "a", "b", "x", "y", "z", "l", "r", "start", "up", "down", "left", "right",
];

fn full_sample(ts: i64) -> Sample {
    let mut builder = Sample::builder().timestamp(ts);
    for (i, name) in BUTTONS.iter().enumerate() {
        builder = builder.field(*name, i % 2 == 0);
    }
    builder
        .field("lstick_x", 0.25)
        .field("lstick_y", -0.5)
        .field("lstick_x_raw", 160i64)
        .field("lstick_y_raw", 64i64)
        .build()
}

fn emitter_for(names: &[&str]) -> Emitter {
    let mut emitter = Emitter::new(512).unwrap();
    for name in names {
        emitter.register_output(name, None);
    }
    emitter
}

/// Benchmark the push hot path (unbound, so flushes are discarded)
fn bench_push_sample(c: &mut Criterion) {
    let mut emitter = emitter_for(&BUTTONS);
    let sample = full_sample(1);

    c.bench_function("push_sample", |b| {
        b.iter(|| {
            emitter.push_sample(black_box(&sample));
        });
    });
}

/// Benchmark push with a growing number of registered fields
fn bench_push_varying_outputs(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_varying_outputs");
    let sample = full_sample(1);

    for count in [1usize, 4, 8, 12].iter() {
        let mut emitter = emitter_for(&BUTTONS[..*count]);
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| {
                emitter.push_sample(black_box(&sample));
            });
        });
    }
    group.finish();
}

/// Benchmark a sample that carries no registered field
fn bench_push_unmapped(c: &mut Criterion) {
    let mut emitter = emitter_for(&["not-present"]);
    let sample = full_sample(1);

    c.bench_function("push_unmapped", |b| {
        b.iter(|| {
            emitter.push_sample(black_box(&sample));
        });
    });
}

/// Benchmark the poller-shaped entry point
fn bench_push_split(c: &mut Criterion) {
    let mut emitter = emitter_for(&["a", "start", "lstick_x", "lstick_y_raw"]);
    let buttons: HashMap<String, bool> = BUTTONS.iter().map(|n| (n.to_string(), true)).collect();
    let analogs: HashMap<String, f64> = [("lstick_x".to_string(), 0.25)].into_iter().collect();
    let raw: HashMap<String, i64> = [("lstick_y_raw".to_string(), 64)].into_iter().collect();

    c.bench_function("push_split", |b| {
        b.iter(|| {
            emitter.push_split(
                black_box(1),
                SplitFields {
                    buttons: &buttons,
                    analogs: &analogs,
                    raw: &raw,
                },
            );
        });
    });
}

/// Benchmark frame encoding alone
fn bench_encode_frame(c: &mut Criterion) {
    let mut frame = Frame::new(1_703_160_000_000);
    for name in BUTTONS {
        frame.insert(name, Value::Bool(true));
    }

    c.bench_function("encode_frame", |b| {
        b.iter(|| encode_frame(black_box(&frame)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_push_sample,
    bench_push_varying_outputs,
    bench_push_unmapped,
    bench_push_split,
    bench_encode_frame
);
criterion_main!(benches);
