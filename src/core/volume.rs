use crate::types::{Extents, Geometry, Sample, VolumeError, VolumeResult, VoxelIndex};
use ndarray::{Array3, ArrayView3, ArrayViewMut2, Axis};
use num_traits::Float;

/// Dense 3-D grid of 8-bit samples
///
/// Samples are stored as an `Array3` of shape `(Z, Y, X)` so that x is the
/// fastest varying axis. Any coordinate, in bounds or not, resolves to a
/// sample: out-of-range coordinates are clamped to the nearest edge voxel
/// (zero-flux Neumann boundary).
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeGrid {
    data: Array3<Sample>,
    geometry: Geometry,
}

impl VolumeGrid {
    /// Wrap an existing `(Z, Y, X)` array
    pub fn new(data: Array3<Sample>) -> VolumeResult<Self> {
        if data.is_empty() {
            return Err(VolumeError::Processing(format!(
                "Volume must have positive extents, got shape {:?}",
                data.shape()
            )));
        }

        Ok(Self {
            data,
            geometry: Geometry::default(),
        })
    }

    /// Build a grid from samples in x-fastest order
    pub fn from_shape_vec(extents: Extents, samples: Vec<Sample>) -> VolumeResult<Self> {
        let data = Array3::from_shape_vec(extents.shape(), samples).map_err(|e| {
            VolumeError::Processing(format!("Failed to shape {} volume: {}", extents, e))
        })?;
        Self::new(data)
    }

    /// Grid with every voxel set to `value`
    pub fn filled(extents: Extents, value: Sample) -> VolumeResult<Self> {
        Self::new(Array3::from_elem(extents.shape(), value))
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn extents(&self) -> Extents {
        let (z, y, x) = self.data.dim();
        Extents::new(x, y, z)
    }

    /// Sample at a possibly out-of-bounds coordinate
    #[inline]
    pub fn get(&self, x: i64, y: i64, z: i64) -> Sample {
        let (nz, ny, nx) = self.data.dim();
        self.data[[clamp_axis(z, nz), clamp_axis(y, ny), clamp_axis(x, nx)]]
    }

    /// Sample at an in-bounds index
    #[inline]
    pub fn at(&self, index: VoxelIndex) -> Sample {
        self.data[[index[2], index[1], index[0]]]
    }

    /// Store a sample. Panics if the index is outside the grid.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: Sample) {
        self.data[[z, y, x]] = value;
    }

    /// Zero-valued grid with the same extents and geometry
    pub fn same_shape_zeroed(&self) -> Self {
        Self {
            data: Array3::zeros(self.data.raw_dim()),
            geometry: self.geometry,
        }
    }

    pub fn as_array(&self) -> ArrayView3<'_, Sample> {
        self.data.view()
    }

    pub fn into_array(self) -> Array3<Sample> {
        self.data
    }

    /// Samples in x-fastest order
    pub fn to_vec(&self) -> Vec<Sample> {
        self.data.iter().copied().collect()
    }

    /// Arithmetic mean of all samples
    pub fn mean(&self) -> f64 {
        let sum: u64 = self.data.iter().map(|&v| v as u64).sum();
        sum as f64 / self.data.len() as f64
    }

    /// Number of voxels whose value differs from `other`
    pub fn count_differences(&self, other: &VolumeGrid) -> usize {
        self.data
            .iter()
            .zip(other.data.iter())
            .filter(|(a, b)| a != b)
            .count()
    }

    /// Build a new grid by evaluating `f` at every voxel
    ///
    /// `init` creates the scratch state handed to `f`; each worker gets its
    /// own. With the `parallel` feature the output is split into Z-slices
    /// that are filled concurrently.
    pub fn map_voxels_with<S, I, F>(&self, init: I, f: F) -> VolumeGrid
    where
        I: Fn() -> S + Sync + Send,
        F: Fn(&mut S, VoxelIndex) -> Sample + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        {
            use ndarray::parallel::prelude::*;

            let mut output = Array3::<Sample>::zeros(self.data.raw_dim());
            output
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .for_each_init(&init, |scratch, (z, mut slice)| {
                    fill_slice(&mut slice, z, scratch, &f);
                });

            VolumeGrid {
                data: output,
                geometry: self.geometry,
            }
        }

        #[cfg(not(feature = "parallel"))]
        {
            self.map_voxels_sequential_with(init, f)
        }
    }

    /// Single-threaded version of [`VolumeGrid::map_voxels_with`]
    pub fn map_voxels_sequential_with<S, I, F>(&self, init: I, f: F) -> VolumeGrid
    where
        I: Fn() -> S,
        F: Fn(&mut S, VoxelIndex) -> Sample,
    {
        let mut output = Array3::<Sample>::zeros(self.data.raw_dim());
        let mut scratch = init();
        for (z, mut slice) in output.axis_iter_mut(Axis(0)).enumerate() {
            fill_slice(&mut slice, z, &mut scratch, &f);
        }

        VolumeGrid {
            data: output,
            geometry: self.geometry,
        }
    }
}

/// Round a filter result to the nearest sample, saturating at `[0, 255]`
///
/// NaN maps to 0.
#[inline]
pub fn quantize<T: Float>(value: T) -> Sample {
    match value.round().to_f64() {
        Some(v) if !v.is_nan() => v.clamp(0.0, Sample::MAX as f64) as Sample,
        _ => 0,
    }
}

#[inline]
fn clamp_axis(coord: i64, len: usize) -> usize {
    coord.clamp(0, len as i64 - 1) as usize
}

fn fill_slice<S, F>(slice: &mut ArrayViewMut2<'_, Sample>, z: usize, scratch: &mut S, f: &F)
where
    F: Fn(&mut S, VoxelIndex) -> Sample,
{
    for ((y, x), out) in slice.indexed_iter_mut() {
        *out = f(scratch, [x, y, z]);
    }
}
