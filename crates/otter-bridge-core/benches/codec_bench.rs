//! Benchmarks for the value and array codecs
//!
//! Run with: cargo bench -p otter-bridge-core

use criterion::{Criterion, criterion_group, criterion_main};
use otter_bridge_core::{HandleArena, HostValue, LocalRefTable, Marshaler, ScriptValue, to_host};
use std::hint::black_box;

fn codec_benchmarks(c: &mut Criterion) {
    let host = HostValue::Array(
        (0..1_000)
            .map(|i| match i % 3 {
                0 => HostValue::Integer(i),
                1 => HostValue::String(format!("item-{i}")),
                _ => HostValue::Double(f64::from(i) / 3.0),
            })
            .collect(),
    );

    c.bench_function("to_script_array_1k", |b| {
        let handles = HandleArena::default();
        let locals = LocalRefTable::default();
        let marshaler = Marshaler::new(&handles, &locals);
        b.iter(|| marshaler.to_script(black_box(&host)).unwrap());
    });

    let script = ScriptValue::Array((0..1_000).map(ScriptValue::Int32).collect());
    c.bench_function("to_host_array_1k", |b| {
        b.iter(|| to_host(black_box(&script)));
    });
}

criterion_group!(benches, codec_benchmarks);
criterion_main!(benches);
