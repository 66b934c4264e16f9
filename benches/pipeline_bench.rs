//! Aggregation Pipeline Benchmarks — Hot-Path Performance Validation
//!
//! Benchmarks the merge and ranking passes that run on every broadcast
//! cycle and every uncached pull request.
//!
//! Run with: cargo bench --bench pipeline_bench

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use dexfeed::domain::merge::merge_tokens;
use dexfeed::domain::rank::{parse_sort_spec, rank, sort_tokens};
use dexfeed::domain::token::{AggregationParams, TimeWindow, Token};

/// Two overlapping source batches, half the addresses shared.
fn sample_batches(per_source: usize) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(per_source * 2);
    for i in 0..per_source {
        let mut a = Token::new(format!("mint-{i}"));
        a.price = 1.0 + i as f64;
        a.volume = (i * 7) as f64;
        a.liquidity = (i * 3) as f64;
        a.updated_at = 1_700_000_000_000 + i as i64;
        a.sources = vec!["DexScreener".to_string()];
        tokens.push(a);

        let mut b = Token::new(format!("mint-{}", i / 2 * 2));
        b.price = 2.0 + i as f64;
        b.volume = (i * 5) as f64;
        b.liquidity = (i * 4) as f64;
        b.updated_at = 1_700_000_001_000 + i as i64;
        b.sources = vec!["GeckoTerminal".to_string()];
        tokens.push(b);
    }
    tokens
}

/// Benchmark the cross-source merge at a realistic batch size.
fn bench_merge(c: &mut Criterion) {
    let tokens = sample_batches(250);

    c.bench_function("merge_500_tokens", |b| {
        b.iter(|| {
            let _merged = merge_tokens(black_box(tokens.clone()));
        });
    });
}

/// Benchmark the multi-key sort over a merged batch.
fn bench_sort(c: &mut Criterion) {
    let merged = merge_tokens(sample_batches(250));
    let keys = parse_sort_spec("volume,liquidity", TimeWindow::OneDay);

    c.bench_function("sort_merged_batch", |b| {
        b.iter(|| {
            let mut batch = merged.clone();
            sort_tokens(black_box(&mut batch), &keys);
        });
    });
}

/// Benchmark the full merge→rank pass as the broadcast loop runs it.
fn bench_full_rank(c: &mut Criterion) {
    let tokens = sample_batches(250);
    let params = AggregationParams::canonical();

    c.bench_function("merge_and_rank_canonical", |b| {
        b.iter(|| {
            let merged = merge_tokens(black_box(tokens.clone()));
            let _page = rank(merged, &params);
        });
    });
}

criterion_group!(benches, bench_merge, bench_sort, bench_full_rank);
criterion_main!(benches);
