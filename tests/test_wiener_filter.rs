use approx::assert_relative_eq;
use voxfilter::core::neighborhood::local_moments;
use voxfilter::core::wiener_filter::{global_coefficient, local_coefficient};
use voxfilter::core::{AdaptiveWienerFilter, GaussianSmoother, OffsetSet, VolumeGrid, WienerParams, WienerStrategy};
use voxfilter::types::{Extents, VolumeError};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn filter(radius: usize, noise_variance: f64, strategy: WienerStrategy) -> AdaptiveWienerFilter {
    AdaptiveWienerFilter::new(WienerParams {
        radius,
        noise_variance,
        strategy,
        stencil: None,
    })
    .unwrap()
}

fn gradient(extents: Extents) -> VolumeGrid {
    let samples = (0..extents.len()).map(|i| (i % extents.x) as u8).collect();
    VolumeGrid::from_shape_vec(extents, samples).unwrap()
}

#[test]
fn test_zero_variance_zero_noise_outputs_zero() {
    init_logging();

    let grid = VolumeGrid::filled(Extents::new(6, 6, 6), 150).unwrap();
    let output = filter(2, 0.0, WienerStrategy::LocalStatistics).apply_filter(&grid).unwrap();
    assert!(output.as_array().iter().all(|&v| v == 0));
    assert_eq!(local_coefficient(0.0, 0.0), 0.0);
}

#[test]
fn test_flat_neighborhood_with_noise_is_suppressed() {
    // variance 0 with positive noise gives coefficient 0 as well
    let grid = VolumeGrid::filled(Extents::new(4, 4, 4), 60).unwrap();
    let output = filter(1, 25.0, WienerStrategy::LocalStatistics).apply_filter(&grid).unwrap();
    assert!(output.as_array().iter().all(|&v| v == 0));
}

#[test]
fn test_local_statistics_on_gradient() {
    init_logging();

    // x-gradient 0..=4 in a 5x3x3 volume
    let grid = gradient(Extents::new(5, 3, 3));
    let wiener = filter(1, 1.0, WienerStrategy::LocalStatistics);
    let output = wiener.apply_filter(&grid).unwrap();

    // Window at x = 2 holds nine copies of each of 1, 2, 3
    let window: Vec<u8> = [1u8, 2, 3].iter().flat_map(|&v| std::iter::repeat(v).take(9)).collect();
    let (mean, variance) = local_moments(&window);
    assert_relative_eq!(mean, 2.0);
    assert_relative_eq!(variance, 2.0 / 3.0, epsilon = 1e-12);

    let coefficient = local_coefficient(variance, 1.0);
    let expected = (coefficient * 54.0).round() as u8;
    assert_eq!(output.at([2, 1, 1]), expected);
    assert_eq!(expected, 22);

    // Window at x = 0 replicates the edge: 0, 0, 1
    let edge: Vec<u8> = [0u8, 0, 1].iter().flat_map(|&v| std::iter::repeat(v).take(9)).collect();
    let (_, edge_variance) = local_moments(&edge);
    let expected_edge = (local_coefficient(edge_variance, 1.0) * 9.0).round() as u8;
    assert_eq!(output.at([0, 1, 1]), expected_edge);
}

#[test]
fn test_large_windows_saturate() {
    let grid = gradient(Extents::new(64, 4, 4)).map_voxels_with(|| (), |_, idx| (idx[0] * 4) as u8);
    let output = filter(2, 1.0, WienerStrategy::LocalStatistics).apply_filter(&grid).unwrap();
    assert_eq!(output.at([32, 2, 2]), 255);
}

#[test]
fn test_global_variance_strategy() {
    init_logging();

    let grid = gradient(Extents::new(6, 4, 4));
    let wiener = filter(1, 2.0, WienerStrategy::GlobalVariance);
    let estimate = wiener.estimate_global(&grid).unwrap();

    let smoothed = GaussianSmoother::new(1.0).unwrap().smooth(&grid).unwrap();
    assert_relative_eq!(estimate.global_mean, smoothed.mean());
    assert_relative_eq!(estimate.signal_variance, smoothed.mean() - 2.0);
    assert_relative_eq!(estimate.alpha, 2.0 / smoothed.mean());

    // Window at x = 1 holds nine copies each of 0, 1, 2
    let convolution = (0.0 + 9.0 * 1.0 + 9.0 * 4.0) / 27.0;
    let expected = convolution * global_coefficient(convolution, estimate.alpha, 2.0);
    let output = wiener.apply_filter(&grid).unwrap();
    assert_eq!(output.at([1, 2, 2]), expected.round() as u8);
}

#[test]
fn test_strategies_are_distinct() {
    let grid = gradient(Extents::new(8, 4, 4));
    let local = filter(1, 2.0, WienerStrategy::LocalStatistics).apply_filter(&grid).unwrap();
    let global = filter(1, 2.0, WienerStrategy::GlobalVariance).apply_filter(&grid).unwrap();
    assert_ne!(local, global);
}

#[test]
fn test_stencil_matches_manual_statistics() {
    let grid = gradient(Extents::new(5, 5, 5));
    let stencil: OffsetSet = [[-1, 0, 0], [0, 0, 0], [1, 0, 0], [0, -1, 0], [0, 1, 0]].into_iter().collect();
    let wiener = AdaptiveWienerFilter::new(WienerParams {
        radius: 1,
        noise_variance: 0.5,
        strategy: WienerStrategy::LocalStatistics,
        stencil: Some(stencil),
    })
    .unwrap();

    // Cross at x = 2: 1, 2, 3 along x and 2, 2 along y
    let window = [2u8, 1, 2, 3, 2];
    let (_, variance) = local_moments(&window);
    let expected = (local_coefficient(variance, 0.5) * 10.0).round() as u8;

    let mut scratch = Vec::new();
    assert_eq!(wiener.filter_voxel_local(&grid, [2, 2, 2], &mut scratch), expected);
}

#[test]
fn test_global_variance_with_cross_stencil() {
    init_logging();

    // x-ramp 0, 3, 6, 9, 12
    let grid = gradient(Extents::new(5, 5, 5)).map_voxels_with(|| (), |_, idx| (idx[0] * 3) as u8);
    let stencil: OffsetSet = [[-1, 0, 0], [0, 0, 0], [1, 0, 0], [0, -1, 0], [0, 1, 0]].into_iter().collect();
    let wiener = AdaptiveWienerFilter::new(WienerParams {
        radius: 1,
        noise_variance: 2.0,
        strategy: WienerStrategy::GlobalVariance,
        stencil: Some(stencil),
    })
    .unwrap();
    let estimate = wiener.estimate_global(&grid).unwrap();

    // Cross at x = 2 holds 3, 6, 9 along x and 6, 6 along y; the divisor is 5
    let convolution = (9.0 + 36.0 + 81.0 + 36.0 + 36.0) / 5.0;
    assert_relative_eq!(convolution, 39.6);
    let expected = (convolution * global_coefficient(convolution, estimate.alpha, 2.0)).round() as u8;
    assert_eq!(expected, 40);
    assert_eq!(wiener.filter_voxel_global(&grid, [2, 2, 2], &estimate), expected);

    // The full 27-voxel cube averages over every offset instead
    let full = filter(1, 2.0, WienerStrategy::GlobalVariance);
    assert_eq!(full.filter_voxel_global(&grid, [2, 2, 2], &estimate), 42);
}

#[test]
fn test_negative_noise_is_rejected() {
    for strategy in [WienerStrategy::LocalStatistics, WienerStrategy::GlobalVariance] {
        let err = AdaptiveWienerFilter::new(WienerParams {
            radius: 1,
            noise_variance: -1.0,
            strategy,
            stencil: None,
        })
        .unwrap_err();
        assert!(matches!(err, VolumeError::Configuration(_)));
    }
}
