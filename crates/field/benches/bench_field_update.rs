use std::hint::black_box;
use std::time::Instant;

use glam::Vec3;
use meadow_common::{BoundingSphere, GrassConfig, PlacementPolicy};
use meadow_field::GrassField;

fn config(count: usize, placement: PlacementPolicy) -> GrassConfig {
    GrassConfig {
        count,
        capacity: count,
        placement,
        ..GrassConfig::default()
    }
}

fn blade() -> BoundingSphere {
    BoundingSphere::new(Vec3::new(0.0, 1.0, 0.0), 1.0)
}

fn bench_build(count: usize, iterations: usize) {
    let config = config(count, PlacementPolicy::ProjectedSphere);
    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(GrassField::build(black_box(&config), blade()));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  build ({count} blades, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_update(count: usize, iterations: usize) {
    let Ok(mut field) = GrassField::build(&config(count, PlacementPolicy::AreaUniform), blade())
    else {
        println!("  update ({count} blades): build failed");
        return;
    };
    let start = Instant::now();
    for i in 0..iterations {
        black_box(field.update(black_box(i as f32 / 60.0)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  update ({count} blades, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn main() {
    println!("=== Grass Field Benchmarks ===\n");

    println!("Build (placeholders + placement):");
    bench_build(1_000, 100);
    bench_build(10_000, 10);

    println!("\nFrame update (matrix mirror + bounds):");
    bench_update(1_000, 1000);
    bench_update(10_000, 100);
    bench_update(50_000, 20);

    println!("\n=== Done ===");
}
