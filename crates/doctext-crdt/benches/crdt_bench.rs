use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use doctext_crdt::{Operation, OperationKind, ReplicatedText};
use doctext_types::SiteId;

fn bench_sequential_local_inserts(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_local_insert");
    for size in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut text = ReplicatedText::new(SiteId::new(1));
                for _ in 0..size {
                    text.apply_local(OperationKind::Insert, 0, Some("a".into()), None)
                        .unwrap();
                }
                text
            });
        });
    }
    group.finish();
}

fn bench_remote_apply_on_prebuilt_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_remote_insert");
    for size in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut text = ReplicatedText::new(SiteId::new(1));
            for _ in 0..size {
                text.apply_local(OperationKind::Insert, 0, Some("a".into()), None)
                    .unwrap();
            }
            b.iter(|| {
                let op = Operation::insert(0, "x".into(), SiteId::new(2), size as u64 + 1);
                let mut clone = text.clone();
                clone.apply_remote(op).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_content_materialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("content");
    for size in [100usize, 1_000, 10_000] {
        let mut text = ReplicatedText::new(SiteId::new(1));
        for _ in 0..size {
            text.apply_local(OperationKind::Insert, 0, Some("a".into()), None)
                .unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| text.content());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_sequential_local_inserts,
    bench_remote_apply_on_prebuilt_text,
    bench_content_materialization
);
criterion_main!(benches);
