//! Chunking throughput benchmarks.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use chunkvault::{irreducible_polynomial, Chunker, ChunkerConfig, RabinFingerprinter};

fn test_data(len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let mut data = vec![0u8; len];
    rng.fill_bytes(&mut data);
    data
}

fn bench_fingerprint_update(c: &mut Criterion) {
    let data = test_data(1024 * 1024);
    let mut group = c.benchmark_group("fingerprint_update");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for window in [16usize, 48, 128] {
        group.bench_with_input(
            BenchmarkId::from_parameter(window),
            &window,
            |b, &window| {
                let mut fp = RabinFingerprinter::new(irreducible_polynomial(53), window);
                b.iter(|| {
                    fp.flush();
                    let mut acc = 0u64;
                    for &byte in &data {
                        acc ^= fp.update(byte);
                    }
                    black_box(acc)
                });
            },
        );
    }
    group.finish();
}

fn bench_chunking(c: &mut Criterion) {
    let data = test_data(4 * 1024 * 1024);
    let mut group = c.benchmark_group("chunk_stream");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.sample_size(20);

    for mask_size in [10u32, 13, 16] {
        group.bench_with_input(
            BenchmarkId::new("mask", mask_size),
            &mask_size,
            |b, &mask_size| {
                let config = ChunkerConfig::new(48, 53, mask_size);
                let mut chunker = Chunker::new(config).unwrap();
                b.iter(|| {
                    let stream = chunker.chunk(black_box(data.as_slice())).unwrap();
                    black_box(stream.total_count())
                });
            },
        );
    }
    group.finish();
}

fn bench_table_construction(c: &mut Criterion) {
    c.bench_function("fingerprinter_new", |b| {
        let modulus = irreducible_polynomial(53);
        b.iter(|| black_box(RabinFingerprinter::new(black_box(modulus), 48)));
    });
}

criterion_group!(
    benches,
    bench_fingerprint_update,
    bench_chunking,
    bench_table_construction
);
criterion_main!(benches);
