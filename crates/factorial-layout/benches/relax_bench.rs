//! Criterion benchmarks for the layout relaxer and router.
//!
//! - `relax`: random placements of 10 and 40 machines relaxed to rest
//! - `route`: A* routing of a relaxed 40-machine layout

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use factorial_core::rng::SimRng;
use factorial_core::test_utils::circuit_chain;
use factorial_layout::{
    Layout, ProducerPolicy, RelaxConfig, Router, RouterConfig, RouterKind, discretize, relax,
    resolve_dependencies,
};
use factorial_spatial::SiteBounds;

// ===========================================================================
// Layout builders
// ===========================================================================

/// `count` machines cycling through cable, gear and circuit assemblers,
/// placed at random and connected with the most-utilized policy.
fn build_layout(count: usize, seed: u64) -> Layout {
    let (reg, chain) = circuit_chain();
    let kinds = [chain.cable_assembler, chain.gear_assembler, chain.circuit_assembler];
    let plan = (0..count).map(|i| kinds[i % kinds.len()]);
    let mut layout =
        Layout::random(&reg, plan, SiteBounds::default(), &mut SimRng::new(seed)).unwrap();
    resolve_dependencies(&mut layout, &reg, ProducerPolicy::MostUtilized).unwrap();
    layout
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_relax(c: &mut Criterion) {
    let mut group = c.benchmark_group("relax");
    group.sample_size(20);

    for count in [10, 40] {
        group.bench_function(format!("{count}_machines"), |b| {
            b.iter_batched(
                || build_layout(count, 1),
                |mut layout| {
                    relax(&mut layout, &RelaxConfig::default()).unwrap();
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_route(c: &mut Criterion) {
    let mut group = c.benchmark_group("route");
    group.sample_size(20);

    let mut layout = build_layout(40, 2);
    relax(&mut layout, &RelaxConfig::default()).unwrap();
    discretize(&mut layout);
    let router = Router::new(&RouterConfig {
        kind: RouterKind::AStar,
        ..RouterConfig::default()
    });

    group.bench_function("astar_40_machines", |b| {
        b.iter(|| {
            // Dense layouts may leave a connection unroutable; the plan
            // still exercises every search.
            let _ = router.plan(&layout);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_relax, bench_route);
criterion_main!(benches);
