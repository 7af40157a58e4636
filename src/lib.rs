//! voxfilter: adaptive denoising for 8-bit volumetric images
//!
//! This library provides an adaptive median filter for impulse noise, an
//! adaptive Wiener filter for statistical noise (local-statistics and
//! global-variance strategies) and a plain median filter, all operating on
//! 3-D grids of unsigned 8-bit samples with replicated edges.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{Extents, Geometry, Offset, Radius, Sample, VolumeError, VolumeResult, VoxelIndex};

pub use crate::core::{
    AdaptiveMedianFilter, AdaptiveMedianParams, AdaptiveWienerFilter, MedianFilter, MedianParams,
    NeighborhoodView, OffsetSet, VolumeGrid, WienerParams, WienerStrategy,
};

pub use io::{read_volume, write_volume, WriteOptions};

#[cfg(feature = "python")]
mod python {
    use crate::core::{
        AdaptiveMedianFilter, AdaptiveMedianParams, AdaptiveWienerFilter, MedianFilter, MedianParams,
        VolumeGrid, WienerParams, WienerStrategy,
    };
    use crate::types::VolumeError;
    use numpy::{IntoPyArray, PyArray3, PyReadonlyArray3};
    use pyo3::prelude::*;

    fn to_py_err(e: VolumeError) -> PyErr {
        match e {
            VolumeError::Configuration(_) => {
                PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e))
            }
            _ => PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}", e)),
        }
    }

    fn to_grid(volume: PyReadonlyArray3<u8>) -> PyResult<VolumeGrid> {
        VolumeGrid::new(volume.as_array().to_owned()).map_err(to_py_err)
    }

    /// Median filter over a (Z, Y, X) uint8 array
    #[pyfunction]
    fn median_filter<'py>(py: Python<'py>, volume: PyReadonlyArray3<u8>, radius: usize) -> PyResult<&'py PyArray3<u8>> {
        let grid = to_grid(volume)?;
        let output = MedianFilter::new(MedianParams { radius })
            .apply_filter(&grid)
            .map_err(to_py_err)?;
        Ok(output.into_array().into_pyarray(py))
    }

    /// Adaptive median filter over a (Z, Y, X) uint8 array
    #[pyfunction]
    fn adaptive_median_filter<'py>(
        py: Python<'py>,
        volume: PyReadonlyArray3<u8>,
        radius: usize,
        max_radius: usize,
    ) -> PyResult<&'py PyArray3<u8>> {
        let filter = AdaptiveMedianFilter::new(AdaptiveMedianParams { radius, max_radius }).map_err(to_py_err)?;
        let grid = to_grid(volume)?;
        let output = filter.apply_filter(&grid).map_err(to_py_err)?;
        Ok(output.into_array().into_pyarray(py))
    }

    /// Adaptive Wiener filter; `strategy` is "local" or "global"
    #[pyfunction]
    #[pyo3(signature = (volume, radius, noise_variance, strategy = "local"))]
    fn wiener_filter<'py>(
        py: Python<'py>,
        volume: PyReadonlyArray3<u8>,
        radius: usize,
        noise_variance: f64,
        strategy: &str,
    ) -> PyResult<&'py PyArray3<u8>> {
        let strategy = match strategy.to_lowercase().as_str() {
            "local" => WienerStrategy::LocalStatistics,
            "global" => WienerStrategy::GlobalVariance,
            _ => {
                return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
                    "Invalid Wiener strategy: {}",
                    strategy
                )))
            }
        };

        let filter = AdaptiveWienerFilter::new(WienerParams {
            radius,
            noise_variance,
            strategy,
            stencil: None,
        })
        .map_err(to_py_err)?;
        let grid = to_grid(volume)?;
        let output = filter.apply_filter(&grid).map_err(to_py_err)?;
        Ok(output.into_array().into_pyarray(py))
    }

    /// Python module definition
    #[pymodule]
    fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(median_filter, m)?)?;
        m.add_function(wrap_pyfunction!(adaptive_median_filter, m)?)?;
        m.add_function(wrap_pyfunction!(wiener_filter, m)?)?;
        Ok(())
    }
}
