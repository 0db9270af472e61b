// Original source code idea from
// https://github.com/nwojke/deep_sort/blob/master/deep_sort/kalman_filter.py
//
use log::warn;
use nalgebra::{Cholesky, Const, SMatrix, SVector};

/// Kalman filter for (center x, center y, aspect, height) boxes
pub mod kalman_bbox;

/// 0.95 quantile of the chi-square distribution with N degrees of freedom (`CHI2INV95[N - 1]`)
///
pub const CHI2INV95: [f32; 9] = [
    3.8415, 5.9915, 7.8147, 9.4877, 11.070, 12.592, 14.067, 15.507, 16.919,
];

pub const DT: u64 = 1;

const REGULARIZATION_ATTEMPTS: usize = 6;

/// Gaussian state of the filter: mean vector and covariance matrix
///
#[derive(Debug, Clone, Copy)]
pub struct KalmanState<const X: usize> {
    pub mean: SVector<f32, X>,
    pub covariance: SMatrix<f32, X, X>,
}

impl<const X: usize> KalmanState<X> {
    pub fn new(mean: SVector<f32, X>, covariance: SMatrix<f32, X, X>) -> Self {
        Self { mean, covariance }
    }

    /// The total variance of the state
    ///
    pub fn trace(&self) -> f32 {
        self.covariance.trace()
    }
}

pub(crate) fn symmetrize<const D: usize>(m: &SMatrix<f32, D, D>) -> SMatrix<f32, D, D> {
    (m + m.transpose()) * 0.5
}

/// Cholesky factorization that tolerates covariances which lost positive definiteness because of
/// the accumulated rounding errors. The matrix is symmetrized, then the diagonal is inflated with
/// the growing jitter until the factorization succeeds.
///
pub(crate) fn robust_cholesky<const D: usize>(
    m: &SMatrix<f32, D, D>,
) -> Option<Cholesky<f32, Const<D>>> {
    let mut m = symmetrize(m);
    if let Some(c) = m.cholesky() {
        return Some(c);
    }

    let mut jitter = (m.trace().abs() / D as f32).max(1.0) * 1e-6;
    for _ in 0..REGULARIZATION_ATTEMPTS {
        for i in 0..D {
            m[(i, i)] += jitter;
        }
        if let Some(c) = m.cholesky() {
            warn!(
                "Covariance is not positive definite, regularized with jitter={}",
                jitter
            );
            return Some(c);
        }
        jitter *= 10.0;
    }
    warn!("Covariance is not positive definite and can't be regularized");
    None
}
