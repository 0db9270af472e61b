/// DeepSORT tracker: Kalman motion model, appearance galleries, matching cascade and IoU fallback
///
pub mod deep_sort;
