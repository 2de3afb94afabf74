//! Chunk Segmenter Benchmarks
//!
//! Measures segmentation throughput for:
//! - Token-sized fragments at the primary and fallback thresholds
//! - Sentence-terminated fragments
//! - Multi-byte text

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use vr_voice::{ChunkSegmenter, FALLBACK_CHUNK_SIZE, PRIMARY_CHUNK_SIZE};

fn token_fragments(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 12 {
            11 => ".".to_string(),
            n => format!(" word{}", n),
        })
        .collect()
}

fn run(chunk_size: usize, fragments: &[String]) -> usize {
    let mut segmenter = ChunkSegmenter::new(chunk_size);
    let mut emitted = 0;
    for fragment in fragments {
        if segmenter.feed(fragment).is_some() {
            emitted += 1;
        }
    }
    emitted + usize::from(segmenter.flush().is_some())
}

/// Benchmark segmentation of token-sized fragments
fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmentation");

    for count in [100, 1_000, 10_000] {
        let fragments = token_fragments(count);
        let bytes: usize = fragments.iter().map(String::len).sum();
        group.throughput(Throughput::Bytes(bytes as u64));

        for chunk_size in [PRIMARY_CHUNK_SIZE, FALLBACK_CHUNK_SIZE] {
            group.bench_with_input(
                BenchmarkId::new(format!("chunk_size_{}", chunk_size), count),
                &fragments,
                |b, fragments| b.iter(|| black_box(run(chunk_size, fragments))),
            );
        }
    }

    group.finish();
}

/// Benchmark multi-byte text, where length is counted in characters
fn bench_multibyte(c: &mut Criterion) {
    let fragments: Vec<String> = (0..1_000)
        .map(|i| if i % 8 == 7 { "。!".to_string() } else { "こんにちは".to_string() })
        .collect();

    c.bench_function("segmentation_multibyte", |b| {
        b.iter(|| black_box(run(PRIMARY_CHUNK_SIZE, &fragments)))
    });
}

criterion_group!(benches, bench_segmentation, bench_multibyte);
criterion_main!(benches);
