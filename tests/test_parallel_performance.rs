use std::time::Instant;
use voxfilter::core::{AdaptiveMedianFilter, AdaptiveMedianParams, VolumeGrid};
use voxfilter::types::Extents;

fn noisy_volume(extents: Extents) -> VolumeGrid {
    let mut state = 0x2545_f491u32;
    let samples = (0..extents.len())
        .map(|i| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            match state % 20 {
                0 => 0,
                1 => 255,
                _ => 100 + (i % 7) as u8 * 5,
            }
        })
        .collect();
    VolumeGrid::from_shape_vec(extents, samples).unwrap()
}

#[test]
fn test_parallel_vs_sequential_adaptive_median() {
    let _ = env_logger::builder().is_test(true).try_init();

    let grid = noisy_volume(Extents::new(48, 48, 32));
    let filter = AdaptiveMedianFilter::new(AdaptiveMedianParams { radius: 1, max_radius: 3 }).unwrap();

    println!("\n=== Performance Comparison: Sequential vs Parallel ===");

    let sequential_start = Instant::now();
    let sequential = grid.map_voxels_sequential_with(Vec::new, |scratch, index| {
        filter.filter_voxel(&grid, index, scratch)
    });
    let sequential_time = sequential_start.elapsed();

    let parallel_start = Instant::now();
    let parallel = filter.apply_filter(&grid).unwrap();
    let parallel_time = parallel_start.elapsed();

    let voxels = grid.extents().len() as f64;
    println!(
        "  - Sequential: {:.3} s ({:.0} voxels/s)",
        sequential_time.as_secs_f64(),
        voxels / sequential_time.as_secs_f64()
    );
    println!(
        "  - Parallel:   {:.3} s ({:.0} voxels/s)",
        parallel_time.as_secs_f64(),
        voxels / parallel_time.as_secs_f64()
    );
    println!(
        "  - Speedup: {:.2}x",
        sequential_time.as_secs_f64() / parallel_time.as_secs_f64()
    );

    assert_eq!(parallel.count_differences(&sequential), 0);
    println!("  - Replaced voxels: {}", grid.count_differences(&parallel));
}
