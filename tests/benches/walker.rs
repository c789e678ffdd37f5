//! Performance benchmarks for the archive walker and hasher.
//!
//! Run with: `cargo bench -p dta-integration-tests`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use dta_files::{HashAlgorithm, Hasher, LedgerRow, WalkInput, Walker};
use dta_integration_tests::{Member, gzip, nested_zips, tar_bytes, zip_bytes};
use std::hint::black_box;

// ============================================================================
// Hashing Benchmarks
// ============================================================================

fn bench_hash_bytes(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_bytes");

    for size in [4096, 65536, 1024 * 1024] {
        let data = vec![0xAA; size];
        group.throughput(Throughput::Bytes(size as u64));

        for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Blake3] {
            let hasher = Hasher::new(algorithm);
            group.bench_with_input(BenchmarkId::new(algorithm.as_str(), size), &size, |b, _| {
                b.iter(|| hasher.hash_bytes(black_box(&data)))
            });
        }
    }

    group.finish();
}

// ============================================================================
// Walker Benchmarks
// ============================================================================

fn walk_buffer(walker: &mut Walker<'_>, name: &str, bytes: &[u8]) -> Vec<LedgerRow> {
    let mut rows = Vec::new();
    walker
        .process(&mut rows, WalkInput::Buffer { name, bytes }, 0, "")
        .unwrap();
    rows
}

fn bench_walk_wide_zip(c: &mut Criterion) {
    let mut group = c.benchmark_group("walk_wide_zip");

    for count in [10, 100, 1000] {
        let members: Vec<(String, Vec<u8>)> = (0..count)
            .map(|i| (format!("dir/file{i}.txt"), vec![b'x'; 512]))
            .collect();
        let refs: Vec<Member<'_>> = members
            .iter()
            .map(|(name, data)| Member::File(name, data))
            .collect();
        let archive = zip_bytes(&refs);

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| walk_buffer(&mut Walker::new(), "wide.zip", black_box(&archive)))
        });
    }

    group.finish();
}

fn bench_walk_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("walk_nested_zip");

    for depth in [1, 4, 8] {
        let archive = nested_zips(&vec![0x55; 4096], "leaf.bin", depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| walk_buffer(&mut Walker::new(), "outer.zip", black_box(&archive)))
        });
    }

    group.finish();
}

fn bench_walk_tar_gz_with_entry_hashes(c: &mut Criterion) {
    let data = vec![0x33; 64 * 1024];
    let members: Vec<(String, &[u8])> = (0..32).map(|i| (format!("f{i}.bin"), &data[..])).collect();
    let refs: Vec<Member<'_>> = members
        .iter()
        .map(|(name, data)| Member::File(name, data))
        .collect();
    let archive = gzip(&tar_bytes(&refs));
    let hasher = Hasher::new(HashAlgorithm::Blake3);

    c.bench_function("walk_tar_gz_entry_hashes", |b| {
        b.iter(|| {
            let mut walker = Walker::new().with_entry_hasher(&hasher);
            walk_buffer(&mut walker, "bundle.tar.gz", black_box(&archive))
        })
    });
}

criterion_group!(hash_benches, bench_hash_bytes);

criterion_group!(
    walker_benches,
    bench_walk_wide_zip,
    bench_walk_nested,
    bench_walk_tar_gz_with_entry_hashes,
);

criterion_main!(hash_benches, walker_benches);
