//! Fusion throughput over synthetic rankings.
//!
//! Run with:
//! ```sh
//! cargo bench --bench fusion
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use genefuse_core::eval::{PerformanceEvaluator, TestCase};
use genefuse_core::fusion::{CombineMode, FusionConfig, fuse};
use genefuse_core::ranking::{CaseIdentifier, Ranking};
use std::collections::HashSet;

const SIZES: [usize; 3] = [1_000, 6_000, 20_000];

/// Deterministic Fisher-Yates shuffle of `g0..g{n}` driven by xorshift.
fn shuffled(n: usize, mut state: u64) -> Ranking {
    let mut items: Vec<String> = (0..n).map(|i| format!("g{i}")).collect();
    for i in (1..items.len()).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        #[allow(clippy::cast_possible_truncation)]
        let j = (state % (i as u64 + 1)) as usize;
        items.swap(i, j);
    }
    Ranking::new(items).expect("generated items are distinct")
}

fn bench_fuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("fusion.fuse");

    for n in SIZES {
        let primary = shuffled(n, 0x00C0_FFEE);
        let secondary = shuffled(n, 0xBEEF_CAFE);
        group.throughput(Throughput::Elements(n as u64));

        for mode in [CombineMode::Add, CombineMode::Multiply] {
            let config = FusionConfig::new(mode, 50).expect("valid bias");
            group.bench_with_input(BenchmarkId::new(mode.to_string(), n), &n, |b, _| {
                b.iter(|| {
                    let fused = fuse(&primary, &secondary, config).expect("same universe");
                    black_box(fused.len())
                });
            });
        }
    }

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("eval.add_case");
    let n = 6_000;
    let ranking = shuffled(n, 0x5EED);
    let seeds: HashSet<String> = (0..20).map(|i| format!("g{i}")).collect();

    group.bench_function(BenchmarkId::from_parameter(n), |b| {
        b.iter(|| {
            let mut eval = PerformanceEvaluator::new();
            for idx in 0..50_u32 {
                let case = TestCase {
                    id: CaseIdentifier::new("bench", idx),
                    ranking: ranking.clone(),
                    query_item: format!("g{}", 100 + idx),
                    excluded_items: seeds.clone(),
                };
                eval.add_case(&case, true).expect("query is ranked");
            }
            black_box(eval.mean_percentile())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_fuse, bench_evaluate);
criterion_main!(benches);
