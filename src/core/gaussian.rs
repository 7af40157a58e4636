use crate::core::volume::{quantize, VolumeGrid};
use crate::types::{VolumeError, VolumeResult};
use ndarray::{Array3, ArrayViewMut1, Axis, Zip};

/// Widest kernel the smoother builds, in taps
const MAX_KERNEL_WIDTH: usize = 32;

/// Separable discrete Gaussian blur with replicated edges
#[derive(Debug, Clone)]
pub struct GaussianSmoother {
    variance: f64,
    kernel: Vec<f64>,
}

impl GaussianSmoother {
    /// Smoother for the given kernel variance (sigma squared, in voxels)
    pub fn new(variance: f64) -> VolumeResult<Self> {
        if !variance.is_finite() || variance < 0.0 {
            return Err(VolumeError::Configuration(format!(
                "Gaussian variance must be finite and non-negative, got {}",
                variance
            )));
        }

        Ok(Self {
            variance,
            kernel: build_kernel(variance),
        })
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Normalized kernel taps, centre tap at `len / 2`
    pub fn kernel(&self) -> &[f64] {
        &self.kernel
    }

    /// Smooth and round back to 8-bit samples
    pub fn smooth(&self, input: &VolumeGrid) -> VolumeResult<VolumeGrid> {
        let samples = self.smooth_f64(input).mapv(quantize);
        Ok(VolumeGrid::new(samples)?.with_geometry(*input.geometry()))
    }

    /// Smooth in floating point, returning a `(Z, Y, X)` array
    pub fn smooth_f64(&self, input: &VolumeGrid) -> Array3<f64> {
        let mut data = input.as_array().mapv(|v| v as f64);
        if self.kernel.len() == 1 {
            return data;
        }

        log::debug!(
            "Gaussian smoothing with variance {} ({} taps)",
            self.variance,
            self.kernel.len()
        );

        // x, y, z
        for axis in [Axis(2), Axis(1), Axis(0)] {
            if data.len_of(axis) < 2 {
                continue;
            }
            let lanes = Zip::from(data.lanes_mut(axis));

            #[cfg(feature = "parallel")]
            lanes.par_for_each(|lane| convolve_lane(lane, &self.kernel));

            #[cfg(not(feature = "parallel"))]
            lanes.for_each(|lane| convolve_lane(lane, &self.kernel));
        }

        data
    }
}

fn build_kernel(variance: f64) -> Vec<f64> {
    let sigma = variance.sqrt();
    if sigma == 0.0 {
        return vec![1.0];
    }

    let radius = ((3.0 * sigma).ceil() as usize).min((MAX_KERNEL_WIDTH - 1) / 2);
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let d = i as f64 - radius as f64;
            (-d * d / (2.0 * variance)).exp()
        })
        .collect();

    let total: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= total);
    kernel
}

fn convolve_lane(mut lane: ArrayViewMut1<'_, f64>, kernel: &[f64]) {
    let line = lane.to_vec();
    let last = line.len() as i64 - 1;
    let radius = (kernel.len() / 2) as i64;

    for (i, out) in lane.iter_mut().enumerate() {
        *out = kernel
            .iter()
            .enumerate()
            .map(|(k, w)| {
                let src = (i as i64 + k as i64 - radius).clamp(0, last) as usize;
                w * line[src]
            })
            .sum();
    }
}
