//! Core volumetric filtering modules

pub mod volume;
pub mod neighborhood;
pub mod median_filter;
pub mod adaptive_median;
pub mod gaussian;
pub mod wiener_filter;

// Re-export main types
pub use volume::{quantize, VolumeGrid};
pub use neighborhood::{
    compute_neighborhood_stats, local_moments, CubeOffsets, NeighborhoodStats, NeighborhoodView, OffsetSet,
};
pub use median_filter::{MedianFilter, MedianParams};
pub use adaptive_median::{AdaptiveMedianFilter, AdaptiveMedianParams};
pub use gaussian::GaussianSmoother;
pub use wiener_filter::{AdaptiveWienerFilter, GlobalEstimate, WienerParams, WienerStrategy};
