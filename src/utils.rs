/// Bounding boxes
pub mod bbox;

/// Kalman filter
pub mod kalman;

/// Minimum cost bipartite assignment
pub mod linear_sum_assignment;

/// Non maximum suppression implementation for detected boxes
pub mod nms;
