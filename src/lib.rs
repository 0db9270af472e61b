//! DeepSORT multi-object tracking engine.
//!
//! The crate keeps object identities stable across frames from per-frame detections and their
//! appearance features. The pipeline for a frame is:
//!
//! 1. suppress redundant detections with [`utils::nms::nms`];
//! 2. advance every track with [`DeepSort::predict`](trackers::deep_sort::tracker::DeepSort::predict);
//! 3. associate detections with [`DeepSort::update`](trackers::deep_sort::tracker::DeepSort::update);
//! 4. read the [`DeepSortTrack`](trackers::deep_sort::DeepSortTrack) snapshots.
//!

use thiserror::Error;

/// Feature distances
pub mod distance;

/// Appearance feature representation
pub mod feature;

/// Synthetic boxes and features generators used by tests, benchmarks and demos
pub mod examples;

/// Frequently used types
pub mod prelude;

/// Tracker implementations
pub mod trackers;

/// Geometry, Kalman filter, NMS and assignment utilities
pub mod utils;

#[cfg(feature = "python")]
mod py;

#[derive(Error, Debug, Clone)]
pub enum Errors {
    #[error("The box has a non-positive width or height: {0:?}")]
    DegenerateBox([f32; 4]),
    #[error("Detections and features are not of the same length: {0} boxes, {1} confidences, {2} features")]
    DetectionFeatureMismatch(usize, usize, usize),
    #[error("Feature vectors have different lengths: {0} and {1}")]
    FeatureLengthMismatch(usize, usize),
    #[error("Missing track {0}")]
    MissingTrack(u64),
}

pub(crate) const EPS: f32 = 0.00001;

/// Approximate comparison for floating point structures
///
pub trait EstimateClose {
    fn almost_same(&self, other: &Self, eps: f32) -> bool;
}
