//! I/O modules for reading and writing volumes

pub mod metaimage;
#[cfg(feature = "gdal")]
pub mod gdal_volume;

pub use metaimage::{MetaImageHeader, MetaImageReader, MetaImageWriter};
#[cfg(feature = "gdal")]
pub use gdal_volume::{GdalVolumeReader, GdalVolumeWriter};

use crate::core::volume::VolumeGrid;
use crate::types::{VolumeError, VolumeResult};
use std::path::Path;

/// Output options shared by the volume writers
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Compress voxel data where the format supports it
    pub compress: bool,
}

/// On-disk volume formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFormat {
    MetaImage,
    #[cfg(feature = "gdal")]
    Gdal,
}

impl VolumeFormat {
    /// Pick a format from the file extension
    pub fn from_path(path: &Path) -> VolumeResult<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "mha" | "mhd" => Ok(VolumeFormat::MetaImage),
            #[cfg(feature = "gdal")]
            "tif" | "tiff" | "img" | "vrt" => Ok(VolumeFormat::Gdal),
            _ => Err(VolumeError::InvalidFormat(format!(
                "Unsupported volume file extension '{}' for {}",
                ext,
                path.display()
            ))),
        }
    }
}

/// Read a volume, choosing the reader from the extension
pub fn read_volume<P: AsRef<Path>>(path: P) -> VolumeResult<VolumeGrid> {
    let path = path.as_ref();
    match VolumeFormat::from_path(path)? {
        VolumeFormat::MetaImage => MetaImageReader::read(path),
        #[cfg(feature = "gdal")]
        VolumeFormat::Gdal => GdalVolumeReader::read(path),
    }
}

/// Write a volume, choosing the writer from the extension
pub fn write_volume<P: AsRef<Path>>(path: P, grid: &VolumeGrid, options: WriteOptions) -> VolumeResult<()> {
    let path = path.as_ref();
    match VolumeFormat::from_path(path)? {
        VolumeFormat::MetaImage => MetaImageWriter::new().compressed(options.compress).write(path, grid),
        #[cfg(feature = "gdal")]
        VolumeFormat::Gdal => {
            if options.compress {
                log::warn!("Compression is ignored for GDAL output");
            }
            GdalVolumeWriter::write(path, grid)
        }
    }
}
