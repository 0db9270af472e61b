// Original source code idea from
// https://github.com/nwojke/deep_sort/blob/master/deep_sort/kalman_filter.py
//
use crate::utils::bbox::{BoundingBox, XyahBox};
use crate::utils::kalman::{robust_cholesky, symmetrize, KalmanState, CHI2INV95, DT};
use log::warn;
use nalgebra::{SMatrix, SVector};

pub const DIM_BOX: usize = 4;
pub const DIM_BOX_X2: usize = DIM_BOX * 2;

/// Squared Mahalanobis distance above which a box is considered implausible for the track
/// (0.95 quantile, 4 degrees of freedom)
///
pub const GATING_THRESHOLD: f32 = CHI2INV95[DIM_BOX - 1];

/// Kalman filter with the constant velocity model over the box state
/// `(x, y, aspect, height, vx, vy, va, vh)`.
///
#[derive(Debug, Clone)]
pub struct BoxKalmanFilter {
    motion_matrix: SMatrix<f32, DIM_BOX_X2, DIM_BOX_X2>,
    update_matrix: SMatrix<f32, DIM_BOX, DIM_BOX_X2>,
    std_position_weight: f32,
    std_velocity_weight: f32,
}

/// Default initializer
impl Default for BoxKalmanFilter {
    fn default() -> Self {
        BoxKalmanFilter::new(1.0 / 20.0, 1.0 / 160.0)
    }
}

impl BoxKalmanFilter {
    /// Constructor with custom weights (shouldn't be used without the need)
    pub fn new(position_weight: f32, velocity_weight: f32) -> Self {
        let mut motion_matrix: SMatrix<f32, DIM_BOX_X2, DIM_BOX_X2> = SMatrix::identity();

        for i in 0..DIM_BOX {
            motion_matrix[(i, DIM_BOX + i)] = DT as f32;
        }

        BoxKalmanFilter {
            motion_matrix,
            update_matrix: SMatrix::identity(),
            std_position_weight: position_weight,
            std_velocity_weight: velocity_weight,
        }
    }

    fn std_position(&self, k: f32, cnst: f32, p: f32) -> [f32; DIM_BOX] {
        let pos_weight = k * self.std_position_weight * p;
        [pos_weight, pos_weight, cnst, pos_weight]
    }

    fn std_velocity(&self, k: f32, cnst: f32, p: f32) -> [f32; DIM_BOX] {
        let vel_weight = k * self.std_velocity_weight * p;
        [vel_weight, vel_weight, cnst, vel_weight]
    }

    /// Initialize the filter with the first observation
    ///
    pub fn initiate(&self, bbox: &XyahBox) -> KalmanState<DIM_BOX_X2> {
        let mean: SVector<f32, DIM_BOX_X2> = SVector::from_iterator(
            bbox.as_array()
                .into_iter()
                .chain([0.0; DIM_BOX]),
        );

        let mut std: SVector<f32, DIM_BOX_X2> = SVector::from_iterator(
            self.std_position(2.0, 1e-2, bbox.height())
                .into_iter()
                .chain(self.std_velocity(10.0, 1e-5, bbox.height())),
        );

        std = std.component_mul(&std);

        let covariance: SMatrix<f32, DIM_BOX_X2, DIM_BOX_X2> = SMatrix::from_diagonal(&std);
        KalmanState { mean, covariance }
    }

    /// Predicts the state from the last state
    ///
    pub fn predict(&self, state: &KalmanState<DIM_BOX_X2>) -> KalmanState<DIM_BOX_X2> {
        let (mean, covariance) = (state.mean, state.covariance);
        let std_pos = self.std_position(1.0, 1e-2, mean[3]);
        let std_vel = self.std_velocity(1.0, 1e-5, mean[3]);

        let mut std: SVector<f32, DIM_BOX_X2> =
            SVector::from_iterator(std_pos.into_iter().chain(std_vel));

        std = std.component_mul(&std);

        let motion_cov: SMatrix<f32, DIM_BOX_X2, DIM_BOX_X2> = SMatrix::from_diagonal(&std);

        let mean = self.motion_matrix * mean;
        let covariance =
            self.motion_matrix * covariance * self.motion_matrix.transpose() + motion_cov;
        KalmanState {
            mean,
            covariance: symmetrize(&covariance),
        }
    }

    /// Projects the state into the measurement space, the measurement noise is included
    ///
    pub fn project(&self, state: &KalmanState<DIM_BOX_X2>) -> KalmanState<DIM_BOX> {
        let (mean, covariance) = (state.mean, state.covariance);
        let mut std: SVector<f32, DIM_BOX> =
            SVector::from_iterator(self.std_position(1.0, 1e-1, mean[3]));

        std = std.component_mul(&std);

        let innovation_cov: SMatrix<f32, DIM_BOX, DIM_BOX> = SMatrix::from_diagonal(&std);

        let mean = self.update_matrix * mean;
        let covariance =
            self.update_matrix * covariance * self.update_matrix.transpose() + innovation_cov;
        KalmanState { mean, covariance }
    }

    /// Updates the state with the current observation
    ///
    pub fn update(
        &self,
        state: &KalmanState<DIM_BOX_X2>,
        measurement: &XyahBox,
    ) -> KalmanState<DIM_BOX_X2> {
        let (mean, covariance) = (state.mean, state.covariance);
        let projected_state = self.project(state);
        let (projected_mean, projected_cov) = (projected_state.mean, projected_state.covariance);

        let Some(cholesky) = robust_cholesky(&projected_cov) else {
            warn!(
                "Unable to correct the state with {:?}, the state is initiated from the observation",
                measurement
            );
            return self.initiate(measurement);
        };

        let b = (covariance * self.update_matrix.transpose()).transpose();
        let kalman_gain = cholesky.solve(&b).transpose();

        let innovation: SVector<f32, DIM_BOX> =
            SVector::from_iterator(measurement.as_array()) - projected_mean;

        let mean = mean + kalman_gain * innovation;
        let covariance = covariance - kalman_gain * projected_cov * kalman_gain.transpose();
        KalmanState {
            mean,
            covariance: symmetrize(&covariance),
        }
    }

    /// Squared Mahalanobis distance between the projected state and the measurement
    ///
    /// `f32::INFINITY` is returned when the projected covariance is broken beyond repair, so the
    /// measurement is always gated out.
    ///
    pub fn distance(&self, state: &KalmanState<DIM_BOX_X2>, measurement: &XyahBox) -> f32 {
        let projected_state = self.project(state);
        let (mean, covariance) = (projected_state.mean, projected_state.covariance);

        let Some(cholesky) = robust_cholesky(&covariance) else {
            return f32::INFINITY;
        };

        let d: SVector<f32, DIM_BOX> = SVector::from_iterator(measurement.as_array()) - mean;
        match cholesky.l().solve_lower_triangular(&d) {
            Some(z) => z.norm_squared(),
            None => f32::INFINITY,
        }
    }

    /// The measurement is beyond the 95% confidence region of the state
    ///
    pub fn is_gated(distance: f32) -> bool {
        !(distance <= GATING_THRESHOLD)
    }
}

impl From<&KalmanState<DIM_BOX_X2>> for XyahBox {
    fn from(state: &KalmanState<DIM_BOX_X2>) -> Self {
        XyahBox::new(state.mean[0], state.mean[1], state.mean[2], state.mean[3])
    }
}

impl From<KalmanState<DIM_BOX_X2>> for XyahBox {
    fn from(state: KalmanState<DIM_BOX_X2>) -> Self {
        XyahBox::from(&state)
    }
}

impl From<&KalmanState<DIM_BOX_X2>> for BoundingBox {
    fn from(state: &KalmanState<DIM_BOX_X2>) -> Self {
        BoundingBox::from(XyahBox::from(state))
    }
}

impl From<KalmanState<DIM_BOX_X2>> for BoundingBox {
    fn from(state: KalmanState<DIM_BOX_X2>) -> Self {
        BoundingBox::from(&state)
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::bbox::{BoundingBox, XyahBox};
    use crate::utils::kalman::kalman_bbox::{BoxKalmanFilter, GATING_THRESHOLD};
    use crate::utils::kalman::KalmanState;
    use nalgebra::{SMatrix, SVector};

    #[test]
    fn constructor() {
        let f = BoxKalmanFilter::default();
        let bbox = BoundingBox::new(1.0, 2.0, 5.0, 5.0);

        let state = f.initiate(&bbox.as_xyah().unwrap());
        let new_bb = BoundingBox::from(state);
        assert_eq!(new_bb, bbox);
        assert!(state.mean.rows(4, 4).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn step() {
        let f = BoxKalmanFilter::default();
        let bbox = BoundingBox::new(-10.0, 2.0, 2.0, 5.0);

        let state = f.initiate(&bbox.as_xyah().unwrap());
        let state = f.predict(&state);
        let p = XyahBox::from(state);

        let est_p = XyahBox::new(-9.0, 4.5, 0.4, 5.0);
        assert_eq!(p, est_p);

        let observation = BoundingBox::new(-8.0, 2.0, 2.0, 5.0).as_xyah().unwrap();
        let updated = f.update(&state, &observation);
        let p = XyahBox::from(updated);
        assert!(p.x() > -9.0 && p.x() < -7.0);
        assert!(updated.mean[4] > 0.0);
        assert!(updated.trace() < state.trace());
    }

    #[test]
    fn follows_moving_object() {
        let f = BoxKalmanFilter::default();
        let mut state = f.initiate(&BoundingBox::new(0.0, 0.0, 10.0, 20.0).as_xyah().unwrap());

        for i in 1..30 {
            state = f.predict(&state);
            let bb = BoundingBox::new(2.0 * i as f32, i as f32, 10.0, 20.0);
            state = f.update(&state, &bb.as_xyah().unwrap());
        }

        assert!((state.mean[4] - 2.0).abs() < 0.1);
        assert!((state.mean[5] - 1.0).abs() < 0.1);

        let predicted = BoundingBox::from(f.predict(&state));
        assert!((predicted.left() - 60.0).abs() < 0.5);
        assert!((predicted.top() - 30.0).abs() < 0.5);
    }

    #[test]
    fn uncertainty_grows_without_observations() {
        let f = BoxKalmanFilter::default();
        let mut state = f.initiate(&BoundingBox::new(10.0, 10.0, 20.0, 40.0).as_xyah().unwrap());
        let mut trace = state.trace();
        let mut projected_trace = f.project(&state).trace();

        for _ in 0..50 {
            state = f.predict(&state);
            let projected = f.project(&state);
            assert!(state.trace() > trace);
            assert!(projected.trace() > projected_trace);
            trace = state.trace();
            projected_trace = projected.trace();
        }
    }

    #[test]
    fn gating_distance() {
        let f = BoxKalmanFilter::default();
        let bbox = BoundingBox::new(-10.0, 2.0, 2.0, 5.0);

        let upd_bbox = BoundingBox::new(-9.5, 2.1, 2.0, 5.0);

        let new_bbox_1 = BoundingBox::new(-9.0, 2.2, 2.0, 5.0);

        let new_bbox_2 = BoundingBox::new(-5.0, 1.5, 2.2, 5.0);

        let state = f.initiate(&bbox.as_xyah().unwrap());
        let state = f.predict(&state);
        let state = f.update(&state, &upd_bbox.as_xyah().unwrap());
        let state = f.predict(&state);

        let dist = f.distance(&state, &new_bbox_1.as_xyah().unwrap());
        assert!((0.0..GATING_THRESHOLD).contains(&dist));
        assert!(!BoxKalmanFilter::is_gated(dist));

        let dist = f.distance(&state, &new_bbox_2.as_xyah().unwrap());
        assert!(dist > GATING_THRESHOLD);
        assert!(BoxKalmanFilter::is_gated(dist));
        assert!(BoxKalmanFilter::is_gated(f32::INFINITY));
        assert!(BoxKalmanFilter::is_gated(f32::NAN));
    }

    #[test]
    fn degenerate_covariance_is_recovered() {
        let f = BoxKalmanFilter::default();
        let mean = SVector::<f32, 8>::from_iterator([10.0, 10.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let state = KalmanState::new(mean, SMatrix::zeros());

        let observation = XyahBox::new(11.0, 10.0, 0.5, 10.0);
        let dist = f.distance(&state, &observation);
        assert!(!dist.is_nan());

        let updated = f.update(&state, &observation);
        assert!(updated.mean.iter().all(|v| v.is_finite()));
        assert!(updated.covariance.iter().all(|v| v.is_finite()));
    }
}
