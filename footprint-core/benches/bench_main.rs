use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use footprint_core::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const SIZE: usize = 400;

fn spec() -> GridSpec {
    GridSpec::new(
        SIZE,
        SIZE,
        GeoTransform::north_up(500_000.0, 9_800_000.0, 30.0, 30.0),
        "EPSG:32717",
    )
}

/// Built-up blocks of varying size scattered over the grid
fn built_mask() -> Grid<bool> {
    let mut grid = Grid::filled(spec(), false, None);
    for (i, (row, col)) in [(20, 20), (100, 300), (250, 80), (320, 320), (380, 10)]
        .into_iter()
        .enumerate()
    {
        let side = 4 + i * 8;
        for r in row..(row + side).min(SIZE) {
            for c in col..(col + side).min(SIZE) {
                grid.set(r, c, true);
            }
        }
    }
    grid
}

fn cost_grid() -> CostGrid {
    let data = (0..SIZE * SIZE)
        .map(|i| if i % 97 == 0 { IMPASSABLE } else { 500 + (i % 13) as Time * 40 })
        .collect();
    Grid::new(spec(), data, Some(IMPASSABLE)).expect("sized grid")
}

fn bench_extract_seeds(c: &mut Criterion) {
    let built = built_mask();
    c.bench_function("extract_seeds", |b| {
        b.iter(|| extract_seeds(black_box(&built), &mut ChaCha8Rng::seed_from_u64(1)));
    });
}

fn bench_cost_distance(c: &mut Criterion) {
    let cost = cost_grid();
    let seeds = extract_seeds(&built_mask(), &mut ChaCha8Rng::seed_from_u64(1));
    let mut group = c.benchmark_group("cost_distance");
    group.sample_size(20);
    for weighting in [EdgeWeighting::Destination, EdgeWeighting::Geometric] {
        let options = SolveOptions {
            weighting,
            ..SolveOptions::default()
        };
        group.bench_function(format!("{weighting:?}"), |b| {
            b.iter(|| cost_distance(black_box(&cost), black_box(&seeds), &options));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_extract_seeds, bench_cost_distance);
criterion_main!(benches);
