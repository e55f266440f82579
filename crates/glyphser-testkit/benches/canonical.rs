use criterion::{black_box, criterion_group, criterion_main, Criterion};

use glyphser_core::{chain, encode, hasher, CanonicalValue, DomainTag, TraceRecord};

fn sample_record(step: u64) -> CanonicalValue {
    CanonicalValue::map()
        .entry("step", step)
        .entry("operator_id", "Glyphser.Model.ModelIR_Executor")
        .entry(
            "outputs",
            (0..16).map(|i| CanonicalValue::Float(i as f64 * 0.5)).collect::<Vec<_>>(),
        )
        .build()
}

fn bench_encode(c: &mut Criterion) {
    let value = sample_record(1);
    c.bench_function("encode_record", |b| b.iter(|| encode(black_box(&value))));
}

fn bench_digest(c: &mut Criterion) {
    let value = sample_record(1);
    c.bench_function("digest_checkpoint", |b| {
        b.iter(|| hasher::digest(DomainTag::Checkpoint, black_box(&value)))
    });
}

fn bench_chain(c: &mut Criterion) {
    let records: Vec<_> = (0..256).map(sample_record).collect();
    c.bench_function("chain_256_records", |b| b.iter(|| chain(black_box(&records))));
}

fn bench_seal(c: &mut Criterion) {
    c.bench_function("seal_trace_record", |b| {
        b.iter(|| {
            TraceRecord::new(1, "Glyphser.Data.NextBatch")
                .with_field("batch", black_box(sample_record(1)))
                .seal()
        })
    });
}

criterion_group!(benches, bench_encode, bench_digest, bench_chain, bench_seal);
criterion_main!(benches);
