use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;
use std::time::Duration;

use batchinfer_core::{InputRecord, RateLimitPolicy};
use batchinfer_engine::{BatchExecutor, FnClient, RateLimiter, RecordProcessor};
use batchinfer_infra::dataset::{decode_lines, encode_lines};
use serde_json::json;

fn records(n: usize) -> Vec<InputRecord> {
    (0..n)
        .map(|i| {
            InputRecord::new(
                format!("rec-{i}"),
                json!({
                    "anthropic_version": "bedrock-2023-05-31",
                    "max_tokens": 256,
                    "messages": [{"role": "user", "content": [{"type": "text", "text": format!("item {i}")}]}],
                }),
            )
        })
        .collect()
}

/// Executor overhead with an instant client and a quota that never binds.
fn bench_batch_executor(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_executor");

    for workers in [1usize, 4, 16] {
        let input = records(1_000);
        let limiter = Arc::new(RateLimiter::new(RateLimitPolicy::new(
            u32::MAX,
            Duration::from_secs(60),
        )));
        let processor = RecordProcessor::new(FnClient::new(|p| Ok(p.clone())), limiter);
        let executor = BatchExecutor::new(workers);

        group.throughput(Throughput::Elements(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(workers), &input, |b, input| {
            b.iter(|| black_box(executor.run(&processor, input).unwrap()))
        });
    }

    group.finish();
}

fn bench_dataset_codec(c: &mut Criterion) {
    let input = records(1_000);
    let text = input
        .iter()
        .map(|r| serde_json::to_string(r).unwrap())
        .collect::<Vec<_>>()
        .join("\n");
    let outputs: Vec<_> = input
        .iter()
        .map(|r| batchinfer_core::OutputRecord::success(r.record_id.clone(), r.echo(), json!({"ok": true})))
        .collect();

    let mut group = c.benchmark_group("dataset_codec");
    group.throughput(Throughput::Elements(input.len() as u64));
    group.bench_function("decode_1000", |b| b.iter(|| black_box(decode_lines(&text))));
    group.bench_function("encode_1000", |b| b.iter(|| black_box(encode_lines(&outputs).unwrap())));
    group.finish();
}

criterion_group!(benches, bench_batch_executor, bench_dataset_codec);
criterion_main!(benches);
