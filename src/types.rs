//! Common types for volumetric filtering

use serde::{Deserialize, Serialize};

/// Sample type of every volume handled by the crate
pub type Sample = u8;

/// In-bounds voxel index `[x, y, z]`
pub type VoxelIndex = [usize; 3];

/// Signed neighborhood offset `[dx, dy, dz]`
pub type Offset = [i64; 3];

/// Volume extents `(X, Y, Z)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extents {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Extents {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Total number of voxels
    pub fn len(&self) -> usize {
        self.x * self.y * self.z
    }

    /// Total number of voxels, `None` if the product overflows `usize`
    pub fn checked_len(&self) -> Option<usize> {
        self.x.checked_mul(self.y)?.checked_mul(self.z)
    }

    pub fn is_empty(&self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }

    /// ndarray shape `(Z, Y, X)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.z, self.y, self.x)
    }
}

impl std::fmt::Display for Extents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}

/// Per-axis neighborhood radius `[rx, ry, rz]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Radius(pub [usize; 3]);

impl Radius {
    /// Same radius on every axis
    pub fn uniform(r: usize) -> Self {
        Self([r; 3])
    }

    /// Number of offsets in the full cube, `prod(2r+1)`
    pub fn cube_len(&self) -> usize {
        self.0.iter().map(|r| 2 * r + 1).product()
    }

    /// Grow every axis by `step`
    pub fn grown(&self, step: usize) -> Self {
        Self([self.0[0] + step, self.0[1] + step, self.0[2] + step])
    }

    /// True if `offset` lies in `[-r, +r]` on every axis
    pub fn contains(&self, offset: &Offset) -> bool {
        offset
            .iter()
            .zip(self.0.iter())
            .all(|(&o, &r)| o.unsigned_abs() as usize <= r)
    }
}

/// Physical placement of a volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Voxel spacing along x, y, z
    pub spacing: [f64; 3],
    /// Physical position of voxel (0, 0, 0)
    pub origin: [f64; 3],
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            spacing: [1.0; 3],
            origin: [0.0; 3],
        }
    }
}

/// Error types for volume filtering
#[derive(Debug, thiserror::Error)]
pub enum VolumeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid volume format: {0}")]
    InvalidFormat(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for volume operations
pub type VolumeResult<T> = Result<T, VolumeError>;
