use crate::core::neighborhood::compute_neighborhood_stats;
use crate::core::volume::VolumeGrid;
use crate::types::{Radius, Sample, VolumeError, VolumeResult, VoxelIndex};
use serde::{Deserialize, Serialize};

/// Adaptive median filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptiveMedianParams {
    /// Starting window radius, at least 1
    pub radius: usize,
    /// Largest radius the window may grow to
    pub max_radius: usize,
}

impl Default for AdaptiveMedianParams {
    fn default() -> Self {
        Self {
            radius: 1,
            max_radius: 3,
        }
    }
}

impl AdaptiveMedianParams {
    pub fn validate(&self) -> VolumeResult<()> {
        if self.radius == 0 {
            return Err(VolumeError::Configuration(
                "Adaptive median radius must be at least 1".to_string(),
            ));
        }
        if self.radius > self.max_radius {
            return Err(VolumeError::Configuration(format!(
                "Adaptive median radius {} exceeds max radius {}",
                self.radius, self.max_radius
            )));
        }
        Ok(())
    }
}

/// Impulse-noise filter whose window grows until the local median is
/// strictly inside the local range
///
/// For each voxel the window (center excluded) starts at `radius`. Once
/// `min < median < max` holds the center is kept if it also lies strictly
/// inside `(min, max)` and replaced by the median otherwise. A window that
/// is still degenerate at `max_radius` yields its median.
#[derive(Debug)]
pub struct AdaptiveMedianFilter {
    params: AdaptiveMedianParams,
}

impl AdaptiveMedianFilter {
    /// Create a filter, rejecting inconsistent radii
    pub fn new(params: AdaptiveMedianParams) -> VolumeResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &AdaptiveMedianParams {
        &self.params
    }

    /// Apply the filter to a whole volume
    pub fn apply_filter(&self, input: &VolumeGrid) -> VolumeResult<VolumeGrid> {
        log::info!(
            "Applying adaptive median filter to {} volume (radius {}..={})",
            input.extents(),
            self.params.radius,
            self.params.max_radius
        );

        let capacity = Radius::uniform(self.params.max_radius).cube_len();
        let output = input.map_voxels_with(
            || Vec::with_capacity(capacity),
            |scratch, index| self.filter_voxel(input, index, scratch),
        );

        log::info!(
            "Adaptive median filtering completed: {} voxels replaced",
            input.count_differences(&output)
        );
        Ok(output)
    }

    /// Filtered value of a single voxel
    pub fn filter_voxel(&self, input: &VolumeGrid, index: VoxelIndex, scratch: &mut Vec<Sample>) -> Sample {
        let center = input.at(index);
        let mut radius = Radius::uniform(self.params.radius);
        let mut median = center;

        while radius.0.iter().all(|&r| r <= self.params.max_radius) {
            let stats = match compute_neighborhood_stats(input, index, radius, None, true, scratch) {
                Some(stats) => stats,
                // radius >= 1 always leaves 26 or more samples
                None => return center,
            };
            median = stats.median;

            if stats.min < median && median < stats.max {
                return if stats.min < center && center < stats.max {
                    center
                } else {
                    median
                };
            }

            radius = radius.grown(1);
        }

        median
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Extents;

    fn filter(radius: usize, max_radius: usize) -> AdaptiveMedianFilter {
        AdaptiveMedianFilter::new(AdaptiveMedianParams { radius, max_radius }).unwrap()
    }

    #[test]
    fn test_rejects_bad_radii() {
        let err = AdaptiveMedianFilter::new(AdaptiveMedianParams { radius: 5, max_radius: 3 }).unwrap_err();
        assert!(matches!(err, VolumeError::Configuration(_)));

        let err = AdaptiveMedianFilter::new(AdaptiveMedianParams { radius: 0, max_radius: 3 }).unwrap_err();
        assert!(matches!(err, VolumeError::Configuration(_)));

        assert!(AdaptiveMedianFilter::new(AdaptiveMedianParams { radius: 2, max_radius: 2 }).is_ok());
    }

    #[test]
    fn test_keeps_plausible_center() {
        // 3x3x3 window holds a spread of values; center is mid-range
        let extents = Extents::new(3, 3, 3);
        let samples: Vec<u8> = (0..27).map(|i| (i * 9) as u8).collect();
        let grid = VolumeGrid::from_shape_vec(extents, samples).unwrap();

        let mut scratch = Vec::new();
        let value = filter(1, 1).filter_voxel(&grid, [1, 1, 1], &mut scratch);
        assert_eq!(value, grid.at([1, 1, 1]));
    }

    #[test]
    fn test_replaces_outlier_center_with_median() {
        let extents = Extents::new(3, 3, 3);
        let mut samples: Vec<u8> = (0..27).map(|i| (i * 5) as u8).collect();
        samples[13] = 255;
        let grid = VolumeGrid::from_shape_vec(extents, samples.clone()).unwrap();

        let mut neighbors: Vec<u8> = samples.iter().enumerate().filter(|(i, _)| *i != 13).map(|(_, &v)| v).collect();
        neighbors.sort_unstable();
        let expected = neighbors[neighbors.len() / 2];

        let mut scratch = Vec::new();
        assert_eq!(filter(1, 2).filter_voxel(&grid, [1, 1, 1], &mut scratch), expected);
    }

    #[test]
    fn test_grows_past_degenerate_window() {
        // Radius-1 window around the center is flat; radius 2 sees a spread
        let mut grid = VolumeGrid::filled(Extents::new(5, 5, 5), 80).unwrap();
        for x in 0..5 {
            grid.set(x, 0, 0, 10);
            grid.set(x, 4, 4, 250);
        }
        for x in 0..5 {
            for y in 0..5 {
                grid.set(x, y, 4, 250);
            }
        }
        grid.set(2, 2, 2, 0);

        let mut scratch = Vec::new();
        // Radius 1 is flat at 80 and growth is capped, so the median is used
        assert_eq!(filter(1, 1).filter_voxel(&grid, [2, 2, 2], &mut scratch), 80);
        // At radius 2 the window spans 10..250 with median 80; center 0 is an outlier
        assert_eq!(filter(1, 2).filter_voxel(&grid, [2, 2, 2], &mut scratch), 80);

        grid.set(2, 2, 2, 90);
        assert_eq!(filter(1, 2).filter_voxel(&grid, [2, 2, 2], &mut scratch), 90);
    }

    #[test]
    fn test_constant_volume_is_unchanged() {
        let grid = VolumeGrid::filled(Extents::new(6, 5, 4), 42).unwrap();
        let output = filter(1, 3).apply_filter(&grid).unwrap();
        assert_eq!(output, grid);
    }
}
