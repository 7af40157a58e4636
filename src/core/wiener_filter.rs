use crate::core::gaussian::GaussianSmoother;
use crate::core::neighborhood::{local_moments, NeighborhoodView, OffsetSet};
use crate::core::volume::{quantize, VolumeGrid};
use crate::types::{Radius, Sample, VolumeError, VolumeResult, VoxelIndex};
use serde::{Deserialize, Serialize};

/// Variance of the pre-smoothing kernel used by the global strategy
pub const GLOBAL_SMOOTHING_VARIANCE: f64 = 1.0;

/// How the Wiener coefficient is estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WienerStrategy {
    /// Per-voxel mean and variance of the neighborhood
    LocalStatistics,
    /// One signal/noise ratio from the mean of a pre-smoothed volume
    GlobalVariance,
}

impl std::fmt::Display for WienerStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WienerStrategy::LocalStatistics => write!(f, "local-statistics"),
            WienerStrategy::GlobalVariance => write!(f, "global-variance"),
        }
    }
}

/// Adaptive Wiener filter parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WienerParams {
    /// Fixed neighborhood radius on every axis
    pub radius: usize,
    /// Noise variance, must be non-negative
    pub noise_variance: f64,
    pub strategy: WienerStrategy,
    /// Restrict statistics to these offsets instead of the full cube
    pub stencil: Option<OffsetSet>,
}

impl Default for WienerParams {
    fn default() -> Self {
        Self {
            radius: 1,
            noise_variance: 0.0,
            strategy: WienerStrategy::LocalStatistics,
            stencil: None,
        }
    }
}

impl WienerParams {
    pub fn validate(&self) -> VolumeResult<()> {
        if !self.noise_variance.is_finite() || self.noise_variance < 0.0 {
            return Err(VolumeError::Configuration(format!(
                "Noise variance must be finite and non-negative, got {}",
                self.noise_variance
            )));
        }
        Ok(())
    }
}

/// Volume-wide quantities for the global-variance strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalEstimate {
    /// Mean of the pre-smoothed volume
    pub global_mean: f64,
    /// `global_mean - noise_variance`
    pub signal_variance: f64,
    /// `noise_variance / global_mean`, 0 for an all-zero volume
    pub alpha: f64,
}

impl GlobalEstimate {
    fn new(smoothed_mean: f64, noise_variance: f64) -> Self {
        let alpha = if smoothed_mean == 0.0 {
            0.0
        } else {
            noise_variance / smoothed_mean
        };
        Self {
            global_mean: smoothed_mean,
            signal_variance: smoothed_mean - noise_variance,
            alpha,
        }
    }
}

/// Local-statistics Wiener coefficient. 0 when both variances are 0.
#[inline]
pub fn local_coefficient(variance: f64, noise_variance: f64) -> f64 {
    let denominator = variance + noise_variance;
    if denominator == 0.0 {
        0.0
    } else {
        variance / denominator
    }
}

/// Global-variance Wiener coefficient. 0 when `convolution` is 0.
#[inline]
pub fn global_coefficient(convolution: f64, alpha: f64, noise_variance: f64) -> f64 {
    let squared = convolution * convolution;
    if squared == 0.0 {
        0.0
    } else {
        1.0 / (1.0 + alpha * noise_variance / squared)
    }
}

/// Adaptive Wiener filter over a fixed-radius neighborhood
///
/// Neither strategy normalizes its output back into the input range:
/// the local strategy re-accumulates `coefficient * v` over the window and
/// the global strategy scales the mean square. Results are saturated to
/// `[0, 255]` on store.
#[derive(Debug)]
pub struct AdaptiveWienerFilter {
    params: WienerParams,
}

impl AdaptiveWienerFilter {
    /// Create a filter, rejecting a negative noise variance
    pub fn new(params: WienerParams) -> VolumeResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &WienerParams {
        &self.params
    }

    /// Apply the configured strategy to a whole volume
    pub fn apply_filter(&self, input: &VolumeGrid) -> VolumeResult<VolumeGrid> {
        log::info!(
            "Applying {} Wiener filter to {} volume (radius {}, noise variance {})",
            self.params.strategy,
            input.extents(),
            self.params.radius,
            self.params.noise_variance
        );
        if let Some(stencil) = &self.params.stencil {
            log::debug!("Using stencil with {} active offsets", stencil.len());
        }

        let output = match self.params.strategy {
            WienerStrategy::LocalStatistics => input.map_voxels_with(Vec::new, |scratch, index| {
                self.filter_voxel_local(input, index, scratch)
            }),
            WienerStrategy::GlobalVariance => {
                let estimate = self.estimate_global(input)?;
                input.map_voxels_with(|| (), |_, index| self.filter_voxel_global(input, index, &estimate))
            }
        };

        log::info!(
            "Wiener filtering completed: {} voxels changed",
            input.count_differences(&output)
        );
        Ok(output)
    }

    /// Smooth the volume once and derive the global noise ratio
    pub fn estimate_global(&self, input: &VolumeGrid) -> VolumeResult<GlobalEstimate> {
        let smoother = GaussianSmoother::new(GLOBAL_SMOOTHING_VARIANCE)?;
        let smoothed = smoother.smooth(input)?;
        log::debug!(
            "Smoothed {} volume with Gaussian variance {}",
            smoothed.extents(),
            smoother.variance()
        );
        let estimate = GlobalEstimate::new(smoothed.mean(), self.params.noise_variance);

        log::debug!("Global Wiener estimate: {:?}", estimate);
        if estimate.signal_variance <= 0.0 {
            log::warn!(
                "Noise variance {} is not below the smoothed mean {:.3}",
                self.params.noise_variance,
                estimate.global_mean
            );
        }

        Ok(estimate)
    }

    /// Local-statistics output for a single voxel
    pub fn filter_voxel_local(&self, input: &VolumeGrid, index: VoxelIndex, scratch: &mut Vec<Sample>) -> Sample {
        scratch.clear();
        scratch.extend(self.view(input, index).values());
        if scratch.is_empty() {
            return 0;
        }

        let (_, variance) = local_moments(scratch);
        let coefficient = local_coefficient(variance, self.params.noise_variance);
        let weighted: f64 = scratch.iter().map(|&v| coefficient * v as f64).sum();
        quantize(weighted)
    }

    /// Global-variance output for a single voxel
    pub fn filter_voxel_global(&self, input: &VolumeGrid, index: VoxelIndex, estimate: &GlobalEstimate) -> Sample {
        let view = self.view(input, index);
        let (sum_sq, count) = view
            .values()
            .fold((0.0f64, 0usize), |(sum, n), v| (sum + (v as f64) * (v as f64), n + 1));
        if count == 0 {
            return 0;
        }

        let convolution = sum_sq / count as f64;
        let coefficient = global_coefficient(convolution, estimate.alpha, self.params.noise_variance);
        quantize(convolution * coefficient)
    }

    fn view<'a>(&'a self, input: &'a VolumeGrid, index: VoxelIndex) -> NeighborhoodView<'a> {
        NeighborhoodView::new(input, index, Radius::uniform(self.params.radius))
            .with_offsets(self.params.stencil.as_ref())
    }
}
