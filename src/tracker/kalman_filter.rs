//! Constant-velocity Kalman filter over `[cx, cy, aspect, h]` box measurements.
//!
//! The 8-dimensional state is `[cx, cy, a, h, vx, vy, va, vh]`. All arithmetic
//! is single precision, with ndarray for the products and nalgebra for the
//! 4x4 innovation inverse.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::KalmanError;
use crate::tracker::rect::Rect;

const NDIM: usize = 4;

/// Index of the height velocity in the state vector.
const HEIGHT_VELOCITY: usize = 7;

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f32>,
    update_mat: Array2<f32>,
    std_weight_position: f32,
    std_weight_velocity: f32,
    mean: Array1<f32>,
    covariance: Array2<f32>,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new(1.0 / 20.0, 1.0 / 160.0)
    }
}

impl KalmanFilter {
    /// Create a filter with the given noise weights, relative to box height.
    ///
    /// The state is zero until [`initiate`](Self::initiate) is called.
    pub fn new(std_weight_position: f32, std_weight_velocity: f32) -> Self {
        let mut motion_mat = Array2::eye(2 * NDIM);
        for i in 0..NDIM {
            motion_mat[[i, NDIM + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((NDIM, 2 * NDIM));
        for i in 0..NDIM {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position,
            std_weight_velocity,
            mean: Array1::zeros(2 * NDIM),
            covariance: Array2::zeros((2 * NDIM, 2 * NDIM)),
        }
    }

    pub fn mean(&self) -> ArrayView1<'_, f32> {
        self.mean.view()
    }

    pub fn covariance(&self) -> ArrayView2<'_, f32> {
        self.covariance.view()
    }

    /// Start tracking from an unassociated measurement. Velocities start at zero.
    pub fn initiate(&mut self, measurement: &Rect) {
        let xyah = measurement.to_xyah();
        self.mean = Array1::zeros(2 * NDIM);
        for i in 0..NDIM {
            self.mean[i] = xyah[i];
        }

        let h = measurement.height;
        let std = [
            2.0 * self.std_weight_position * h,
            2.0 * self.std_weight_position * h,
            1e-2,
            2.0 * self.std_weight_position * h,
            10.0 * self.std_weight_velocity * h,
            10.0 * self.std_weight_velocity * h,
            1e-5,
            10.0 * self.std_weight_velocity * h,
        ];
        self.covariance = diag_squared(&std);
    }

    /// Advance the state by one frame and return the predicted box.
    ///
    /// With `reset_height_velocity` the height velocity is zeroed first, so a
    /// coasting track keeps its size instead of extrapolating it. This is the
    /// same state index (7) upstream ByteTrack resets.
    pub fn predict(&mut self, reset_height_velocity: bool) -> Rect {
        if reset_height_velocity {
            self.mean[HEIGHT_VELOCITY] = 0.0;
        }

        let h = self.mean[3];
        let std = [
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-2,
            self.std_weight_position * h,
            self.std_weight_velocity * h,
            self.std_weight_velocity * h,
            1e-5,
            self.std_weight_velocity * h,
        ];
        let motion_cov = diag_squared(&std);

        self.mean = self.motion_mat.dot(&self.mean);
        self.covariance =
            self.motion_mat.dot(&self.covariance).dot(&self.motion_mat.t()) + motion_cov;

        self.rect()
    }

    /// Project the state distribution into measurement space.
    pub fn project(&self) -> (Array1<f32>, Array2<f32>) {
        let h = self.mean[3];
        let std = [
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-1,
            self.std_weight_position * h,
        ];
        let innovation_cov = diag_squared(&std);

        let mean_proj = self.update_mat.dot(&self.mean);
        let covariance_proj =
            self.update_mat.dot(&self.covariance).dot(&self.update_mat.t()) + innovation_cov;

        (mean_proj, covariance_proj)
    }

    /// Correct the state with a measured box and return the corrected box.
    pub fn update(&mut self, measurement: &Rect) -> Result<Rect, KalmanError> {
        let (projected_mean, projected_cov) = self.project();

        let innovation = Array1::from_vec(measurement.to_xyah().to_vec()) - projected_mean;

        // K = P * H^T * S^-1
        let s_inv = invert_4x4(&projected_cov)?;
        let pht = self.covariance.dot(&self.update_mat.t()); // 8x4
        let kalman_gain = pht.dot(&s_inv); // 8x4

        self.mean = &self.mean + &kalman_gain.dot(&innovation);
        self.covariance =
            &self.covariance - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());

        Ok(self.rect())
    }

    /// Current box estimate from the position part of the state.
    pub fn rect(&self) -> Rect {
        Rect::from_xyah(self.mean[0], self.mean[1], self.mean[2], self.mean[3])
    }
}

fn diag_squared(std: &[f32]) -> Array2<f32> {
    Array2::from_diag(&Array1::from_iter(std.iter().map(|s| s * s)))
}

fn invert_4x4(m: &Array2<f32>) -> Result<Array2<f32>, KalmanError> {
    let nm = nalgebra::Matrix4::from_fn(|i, j| m[[i, j]]);
    let inv = nm.try_inverse().ok_or(KalmanError::SingularInnovation)?;
    Ok(Array2::from_shape_fn((NDIM, NDIM), |(i, j)| inv[(i, j)]))
}
