use crate::core::neighborhood::compute_neighborhood_stats;
use crate::core::volume::VolumeGrid;
use crate::types::{Radius, Sample, VolumeResult, VoxelIndex};
use serde::{Deserialize, Serialize};

/// Fixed-radius median filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedianParams {
    /// Window radius on every axis (0 leaves the volume unchanged)
    pub radius: usize,
}

impl Default for MedianParams {
    fn default() -> Self {
        Self { radius: 1 } // 3x3x3 window
    }
}

/// Plain rank filter: every voxel becomes the median of its full window
pub struct MedianFilter {
    params: MedianParams,
}

impl MedianFilter {
    pub fn new(params: MedianParams) -> Self {
        Self { params }
    }

    pub fn standard() -> Self {
        Self::new(MedianParams::default())
    }

    pub fn params(&self) -> &MedianParams {
        &self.params
    }

    /// Apply the filter to a whole volume
    pub fn apply_filter(&self, input: &VolumeGrid) -> VolumeResult<VolumeGrid> {
        log::info!(
            "Applying median filter to {} volume",
            input.extents()
        );
        log::debug!("Median parameters: {:?}", self.params);

        let capacity = Radius::uniform(self.params.radius).cube_len();
        let output = input.map_voxels_with(
            || Vec::with_capacity(capacity),
            |scratch, index| self.filter_voxel(input, index, scratch),
        );

        log::info!(
            "Median filtering completed: {} voxels changed",
            input.count_differences(&output)
        );
        Ok(output)
    }

    /// Filtered value of a single voxel
    pub fn filter_voxel(&self, input: &VolumeGrid, index: VoxelIndex, scratch: &mut Vec<Sample>) -> Sample {
        let radius = Radius::uniform(self.params.radius);
        compute_neighborhood_stats(input, index, radius, None, false, scratch)
            .map(|stats| stats.median)
            .unwrap_or_else(|| input.at(index))
    }
}

impl Default for MedianFilter {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Extents;

    #[test]
    fn test_removes_isolated_impulse() {
        let mut grid = VolumeGrid::filled(Extents::new(5, 5, 5), 100).unwrap();
        grid.set(2, 2, 2, 255);
        grid.set(0, 4, 1, 0);

        let output = MedianFilter::standard().apply_filter(&grid).unwrap();
        assert!(output.as_array().iter().all(|&v| v == 100));
    }

    #[test]
    fn test_zero_radius_is_identity() {
        let extents = Extents::new(4, 4, 2);
        let samples = (0..extents.len()).map(|i| (i * 7 % 256) as u8).collect();
        let grid = VolumeGrid::from_shape_vec(extents, samples).unwrap();

        let output = MedianFilter::new(MedianParams { radius: 0 }).apply_filter(&grid).unwrap();
        assert_eq!(output, grid);
    }

    #[test]
    fn test_edge_replication_biases_boundary_median() {
        // A bright first x-column dominates the replicated window at x = 0
        let mut grid = VolumeGrid::filled(Extents::new(4, 3, 3), 0).unwrap();
        for z in 0..3 {
            for y in 0..3 {
                grid.set(0, y, z, 200);
            }
        }

        let filter = MedianFilter::standard();
        let mut scratch = Vec::new();
        // Window at x = 0 samples x = {0, 0, 1}: two thirds bright
        assert_eq!(filter.filter_voxel(&grid, [0, 1, 1], &mut scratch), 200);
        assert_eq!(filter.filter_voxel(&grid, [1, 1, 1], &mut scratch), 0);
    }
}
