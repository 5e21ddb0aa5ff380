// Benchmarks for the hot lookups on the alignment path: per-base quality
// probabilities and genomic offset resolution.
//
// Run with: cargo bench --bench quality_perf

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};

use ferrous_seedmap::core::quality;
use ferrous_seedmap::index::{Contig, ReferenceIndex};

fn random_qualities(n: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(2..=41)).collect()
}

fn bench_quality_lookups(c: &mut Criterion) {
    let qualities = random_qualities(150 * 1024, 42);
    let mut group = c.benchmark_group("quality");
    group.throughput(Throughput::Elements(qualities.len() as u64));

    group.bench_function("log_match_table", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for &q in &qualities {
                sum += quality::log_match(black_box(q)).unwrap_or(0.0);
            }
            sum
        })
    });

    group.bench_function("log_mismatch_table", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for &q in &qualities {
                sum += quality::log_mismatch(black_box(q)).unwrap_or(0.0);
            }
            sum
        })
    });

    group.bench_function("log_mismatch_direct", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for &q in &qualities {
                sum += quality::log_mismatch_slow(black_box(q));
            }
            sum
        })
    });

    group.finish();
}

fn bench_offset_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("genomic_offset_to_position");

    for contigs in [25u32, 3_000, 100_000] {
        let mut index = ReferenceIndex::new();
        let mut rng = StdRng::seed_from_u64(u64::from(contigs));
        let mut position = 0;
        for i in 0..contigs {
            let length = rng.gen_range(1_000..200_000);
            index
                .put_contig(Contig::new(i, format!("contig{i}"), position, length))
                .unwrap();
            position += length;
        }
        let offsets: Vec<u64> = (0..4096).map(|_| rng.gen_range(0..position)).collect();

        group.throughput(Throughput::Elements(offsets.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(contigs), &offsets, |b, offsets| {
            b.iter(|| {
                offsets
                    .iter()
                    .filter(|&&o| !index.genomic_offset_to_position(black_box(o)).is_no_match())
                    .count()
            })
        });
    }

    group.finish();
}

fn configure() -> Criterion {
    Criterion::default().sample_size(20)
}

criterion_group! {
    name = benches;
    config = configure();
    targets = bench_quality_lookups, bench_offset_lookup
}
criterion_main!(benches);
