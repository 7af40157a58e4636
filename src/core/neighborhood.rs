use crate::core::volume::VolumeGrid;
use crate::types::{Offset, Radius, Sample, VoxelIndex};
use serde::{Deserialize, Serialize};

/// Sort key giving row-major neighborhood order (dx fastest, dz slowest)
#[inline]
fn order_key(offset: &Offset) -> (i64, i64, i64) {
    (offset[2], offset[1], offset[0])
}

/// Set of active neighborhood offsets
///
/// Offsets are kept in the same row-major order a full-cube walk visits
/// them, so a shaped neighborhood enumerates deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetSet {
    offsets: Vec<Offset>,
}

impl OffsetSet {
    /// No active offsets
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every offset of the cube `[-r, +r]` on each axis
    pub fn full_cube(radius: Radius) -> Self {
        Self {
            offsets: CubeOffsets::new(radius).collect(),
        }
    }

    /// Activate an offset. Returns false if it was already active.
    pub fn activate(&mut self, offset: Offset) -> bool {
        match self
            .offsets
            .binary_search_by_key(&order_key(&offset), order_key)
        {
            Ok(_) => false,
            Err(pos) => {
                self.offsets.insert(pos, offset);
                true
            }
        }
    }

    /// Deactivate an offset. Returns false if it was not active.
    pub fn deactivate(&mut self, offset: Offset) -> bool {
        match self
            .offsets
            .binary_search_by_key(&order_key(&offset), order_key)
        {
            Ok(pos) => {
                self.offsets.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, offset: &Offset) -> bool {
        self.offsets
            .binary_search_by_key(&order_key(offset), order_key)
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Offset> + '_ {
        self.offsets.iter()
    }
}

impl FromIterator<Offset> for OffsetSet {
    fn from_iter<T: IntoIterator<Item = Offset>>(iter: T) -> Self {
        let mut set = OffsetSet::empty();
        for offset in iter {
            set.activate(offset);
        }
        set
    }
}

/// Row-major walk over every offset of a cube
#[derive(Debug, Clone)]
pub struct CubeOffsets {
    radius: [i64; 3],
    next: Option<Offset>,
}

impl CubeOffsets {
    pub fn new(radius: Radius) -> Self {
        let r = radius.0.map(|v| v as i64);
        Self {
            radius: r,
            next: Some([-r[0], -r[1], -r[2]]),
        }
    }
}

impl Iterator for CubeOffsets {
    type Item = Offset;

    fn next(&mut self) -> Option<Offset> {
        let current = self.next?;
        let mut following = current;
        self.next = None;
        for axis in 0..3 {
            if following[axis] < self.radius[axis] {
                following[axis] += 1;
                self.next = Some(following);
                break;
            }
            following[axis] = -self.radius[axis];
        }
        Some(current)
    }
}

/// Window of samples around a center voxel
///
/// The view holds no iteration state; [`NeighborhoodView::iter`] can be
/// called any number of times and always yields the same sequence.
#[derive(Debug, Clone, Copy)]
pub struct NeighborhoodView<'a> {
    grid: &'a VolumeGrid,
    center: VoxelIndex,
    radius: Radius,
    shape: Option<&'a OffsetSet>,
}

impl<'a> NeighborhoodView<'a> {
    /// Full-cube neighborhood
    pub fn new(grid: &'a VolumeGrid, center: VoxelIndex, radius: Radius) -> Self {
        Self {
            grid,
            center,
            radius,
            shape: None,
        }
    }

    /// Restrict the view to the active offsets in `shape`
    pub fn with_offsets(mut self, shape: Option<&'a OffsetSet>) -> Self {
        self.shape = shape;
        self
    }

    pub fn center(&self) -> VoxelIndex {
        self.center
    }

    pub fn radius(&self) -> Radius {
        self.radius
    }

    /// Change the radius while keeping the same center
    pub fn set_radius(&mut self, radius: Radius) {
        self.radius = radius;
    }

    /// Number of samples the view yields
    pub fn len(&self) -> usize {
        match self.shape {
            None => self.radius.cube_len(),
            Some(shape) => shape.iter().filter(|o| self.radius.contains(o)).count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of offset `(0, 0, 0)` in the enumeration, if it is active
    pub fn center_position(&self) -> Option<usize> {
        self.iter().position(|(offset, _)| offset == [0, 0, 0])
    }

    /// Sample at `center + offset` with edge replication
    #[inline]
    pub fn sample(&self, offset: Offset) -> Sample {
        self.grid.get(
            self.center[0] as i64 + offset[0],
            self.center[1] as i64 + offset[1],
            self.center[2] as i64 + offset[2],
        )
    }

    /// `(offset, value)` pairs in row-major offset order
    pub fn iter(&self) -> impl Iterator<Item = (Offset, Sample)> + '_ {
        let offsets: Box<dyn Iterator<Item = Offset> + '_> = match self.shape {
            None => Box::new(CubeOffsets::new(self.radius)),
            Some(shape) => Box::new(
                shape
                    .iter()
                    .copied()
                    .filter(move |o| self.radius.contains(o)),
            ),
        };
        offsets.map(move |offset| (offset, self.sample(offset)))
    }

    /// Sample values in row-major offset order
    pub fn values(&self) -> impl Iterator<Item = Sample> + '_ {
        self.iter().map(|(_, value)| value)
    }
}

/// Order statistics of one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborhoodStats {
    pub count: usize,
    pub min: Sample,
    pub max: Sample,
    /// Lower median, `sorted[count / 2]`
    pub median: Sample,
}

/// Gather a window into `scratch` and compute its order statistics
///
/// `scratch` is cleared first. On return it holds the gathered samples
/// (partially reordered by the median selection). Returns `None` when the
/// window is empty.
pub fn compute_neighborhood_stats(
    grid: &VolumeGrid,
    center: VoxelIndex,
    radius: Radius,
    offsets: Option<&OffsetSet>,
    exclude_center: bool,
    scratch: &mut Vec<Sample>,
) -> Option<NeighborhoodStats> {
    scratch.clear();
    let view = NeighborhoodView::new(grid, center, radius).with_offsets(offsets);
    scratch.extend(
        view.iter()
            .filter(|(offset, _)| !(exclude_center && *offset == [0, 0, 0]))
            .map(|(_, value)| value),
    );

    if scratch.is_empty() {
        return None;
    }

    let (mut min, mut max) = (Sample::MAX, Sample::MIN);
    for &v in scratch.iter() {
        min = min.min(v);
        max = max.max(v);
    }

    let mid = scratch.len() / 2;
    let median = *scratch.select_nth_unstable(mid).1;

    Some(NeighborhoodStats {
        count: scratch.len(),
        min,
        max,
        median,
    })
}

/// Mean and population variance (divide by `n`) of a set of samples
pub fn local_moments(values: &[Sample]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }

    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;

    (mean, variance)
}
