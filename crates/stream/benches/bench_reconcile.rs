use std::hint::black_box;
use std::time::Instant;

use gridmerge_common::{GeoBounds, GridCoord, GridSpec, LatLng, Token};
use gridmerge_kernel::{CellState, WorldStore};
use gridmerge_render::NullPresenter;
use gridmerge_stream::ActiveCellCache;

fn make_world(overrides: usize) -> WorldStore {
    let mut world = WorldStore::new(0.15);
    let side = (overrides as f64).sqrt().ceil() as i32;
    for n in 0..overrides as i32 {
        world.commit(
            GridCoord::new(n % side, n / side),
            CellState::with_token(Token::ONE),
        );
    }
    world
}

fn bench_resolve(overrides: usize, iterations: usize) {
    let world = make_world(overrides);
    let start = Instant::now();
    for n in 0..iterations {
        let c = GridCoord::new((n % 97) as i32, (n / 97) as i32);
        let _ = black_box(world.resolve(black_box(c)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  resolve ({overrides} overrides, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_neighborhood_walk(radius: u32, steps: usize) {
    let world = make_world(1000);
    let grid = GridSpec::new(LatLng::new(0.0, 0.0), 1.0);
    let mut cache = ActiveCellCache::new(grid, 1);
    let mut presenter = NullPresenter;

    let start = Instant::now();
    for step in 0..steps {
        // Simulate the player walking east one cell per step
        let center = GridCoord::new(0, step as i32);
        let _ = black_box(cache.reconcile_neighborhood(center, radius, &world, &mut presenter));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / steps as u32;
    println!("  neighborhood walk (r={radius}, {steps} steps): {per_iter:?}/step, total {elapsed:?}");
}

fn bench_viewport_pan(span: f64, steps: usize) {
    let world = make_world(1000);
    let grid = GridSpec::new(LatLng::new(0.0, 0.0), 1.0);
    let mut cache = ActiveCellCache::new(grid, 1);
    let mut presenter = NullPresenter;

    let start = Instant::now();
    for step in 0..steps {
        let center = LatLng::new(0.0, step as f64 * 0.5);
        let view = GeoBounds::around(center, span / 2.0, span);
        let _ = black_box(cache.reconcile_viewport(view, &world, &mut presenter));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / steps as u32;
    println!("  viewport pan (span={span}, {steps} steps): {per_iter:?}/step, total {elapsed:?}");
}

fn main() {
    println!("=== Active Cell Cache Benchmarks ===\n");

    println!("World resolve:");
    bench_resolve(100, 100_000);
    bench_resolve(10_000, 100_000);

    println!("\nNeighborhood walk:");
    bench_neighborhood_walk(8, 1000);
    bench_neighborhood_walk(48, 100);

    println!("\nViewport pan:");
    bench_viewport_pan(12.0, 1000);
    bench_viewport_pan(48.0, 100);

    println!("\n=== Done ===");
}
