use crate::core::volume::VolumeGrid;
use crate::types::{Extents, Geometry, VolumeResult};
use gdal::raster::Buffer;
use gdal::{Dataset, DriverManager};
use std::path::Path;

/// Multi-band raster volumes through GDAL, one band per Z-slice
pub struct GdalVolumeReader;

impl GdalVolumeReader {
    pub fn read<P: AsRef<Path>>(path: P) -> VolumeResult<VolumeGrid> {
        let path = path.as_ref();
        log::info!("Reading GDAL volume from: {}", path.display());

        let dataset = Dataset::open(path)?;
        let (width, height) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        log::debug!("Raster size: {}x{} with {} bands", width, height, bands);

        let mut samples = Vec::with_capacity(width * height * bands);
        for band_index in 1..=bands {
            let band = dataset.rasterband(band_index as isize)?;
            let buffer = band.read_as::<u8>((0, 0), (width, height), (width, height), None)?;
            samples.extend_from_slice(&buffer.data);
        }

        let mut geometry = Geometry::default();
        if let Ok(transform) = dataset.geo_transform() {
            geometry.origin = [transform[0], transform[3], 0.0];
            geometry.spacing = [transform[1], transform[5].abs(), 1.0];
        }

        Ok(VolumeGrid::from_shape_vec(Extents::new(width, height, bands), samples)?.with_geometry(geometry))
    }
}

pub struct GdalVolumeWriter;

impl GdalVolumeWriter {
    /// Write a GeoTIFF with one `u8` band per Z-slice
    pub fn write<P: AsRef<Path>>(path: P, grid: &VolumeGrid) -> VolumeResult<()> {
        let path = path.as_ref();
        let extents = grid.extents();
        log::info!("Writing {} GDAL volume to: {}", extents, path.display());

        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let mut dataset = driver.create_with_band_type::<u8, _>(
            path,
            extents.x as isize,
            extents.y as isize,
            extents.z as isize,
        )?;

        let geometry = grid.geometry();
        dataset.set_geo_transform(&[
            geometry.origin[0],
            geometry.spacing[0],
            0.0,
            geometry.origin[1],
            0.0,
            -geometry.spacing[1],
        ])?;

        let samples = grid.to_vec();
        let slice_len = extents.x * extents.y;
        for (z, slice) in samples.chunks(slice_len).enumerate() {
            let mut band = dataset.rasterband(z as isize + 1)?;
            let buffer = Buffer {
                size: (extents.x, extents.y),
                data: slice.to_vec(),
            };
            band.write((0, 0), (extents.x, extents.y), &buffer)?;
        }

        Ok(())
    }
}
