//! Calibration Engine (§4.8, §9): a tiny explicit state machine that
//! derives the device→kart rotation from a stationary gravity phase and a
//! driving-straight forward phase.
//!
//! States: `awaiting-gravity → awaiting-forward → done | failed`. The
//! engine mutates only its own two sample buffers; callers must serialise
//! pushes to a given instance (§5).

use nalgebra::{Matrix3, Vector3};

use crate::error::CoreError;

const MIN_GRAVITY_SAMPLES: usize = 150;
const MIN_FORWARD_SAMPLES: usize = 250;
const LINEAR_ACCEL_RETAIN_THRESHOLD: f64 = 0.5;
const MIN_RETAINED_FOR_FILTERED_PCA: usize = 20;
const POWER_ITERATIONS: usize = 50;
const EXPECTED_GRAVITY_MAGNITUDE: f64 = 9.81;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    AwaitingGravity,
    AwaitingForward,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationData {
    pub gravity: [f64; 3],
    pub forward: [f64; 3],
    pub right: [f64; 3],
    pub up: [f64; 3],
    pub rotation: [[f64; 3]; 3],
    pub quality: f64,
    pub timestamp: f64,
}

#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    state: CalibrationState,
    gravity_samples: Vec<Vector3<f64>>,
    forward_samples: Vec<Vector3<f64>>,
    result: Option<CalibrationData>,
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationEngine {
    pub fn new() -> Self {
        Self {
            state: CalibrationState::AwaitingGravity,
            gravity_samples: Vec::new(),
            forward_samples: Vec::new(),
            result: None,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn result(&self) -> Option<&CalibrationData> {
        self.result.as_ref()
    }

    /// Progress in `[0,1]` through the current phase's minimum sample
    /// requirement.
    pub fn progress(&self) -> f64 {
        match self.state {
            CalibrationState::AwaitingGravity => {
                (self.gravity_samples.len() as f64 / MIN_GRAVITY_SAMPLES as f64).min(1.0)
            }
            CalibrationState::AwaitingForward => {
                (self.forward_samples.len() as f64 / MIN_FORWARD_SAMPLES as f64).min(1.0)
            }
            CalibrationState::Done | CalibrationState::Failed => 1.0,
        }
    }

    /// Pushes one acceleration-including-gravity or forward-phase sample
    /// (device frame, m/s^2) into whichever buffer the current state
    /// targets. Returns the (unchanged) state and updated progress.
    pub fn push_sample(&mut self, accel: [f64; 3]) -> (CalibrationState, f64) {
        let v = Vector3::new(accel[0], accel[1], accel[2]);
        match self.state {
            CalibrationState::AwaitingGravity => self.gravity_samples.push(v),
            CalibrationState::AwaitingForward => self.forward_samples.push(v),
            CalibrationState::Done | CalibrationState::Failed => {}
        }
        (self.state, self.progress())
    }

    /// Ends the gravity phase and begins the forward phase.
    pub fn end_gravity_phase(&mut self) -> Result<CalibrationState, CoreError> {
        if self.gravity_samples.len() < MIN_GRAVITY_SAMPLES {
            self.state = CalibrationState::Failed;
            return Err(CoreError::insufficient(
                "calibration_engine",
                format!("gravity phase has {} samples, needs {}", self.gravity_samples.len(), MIN_GRAVITY_SAMPLES),
            ));
        }
        self.state = CalibrationState::AwaitingForward;
        Ok(self.state)
    }

    /// Ends the forward phase, runs PCA, and assembles the calibration.
    pub fn finish(&mut self, timestamp: f64) -> Result<&CalibrationData, CoreError> {
        if self.forward_samples.len() < MIN_FORWARD_SAMPLES {
            self.state = CalibrationState::Failed;
            return Err(CoreError::insufficient(
                "calibration_engine",
                format!("forward phase has {} samples, needs {}", self.forward_samples.len(), MIN_FORWARD_SAMPLES),
            ));
        }

        let gravity = mean(&self.gravity_samples);
        let linear: Vec<Vector3<f64>> = self.forward_samples.iter().map(|a| a - gravity).collect();
        let retained: Vec<Vector3<f64>> =
            linear.iter().copied().filter(|v| v.norm() > LINEAR_ACCEL_RETAIN_THRESHOLD).collect();
        let used: &[Vector3<f64>] = if retained.len() >= MIN_RETAINED_FOR_FILTERED_PCA { &retained } else { &linear };

        let mean_linear = mean(used);
        let (f_raw, _direction) = dominant_axis(used);

        let f_raw = if mean_linear.dot(&f_raw) < 0.0 { -f_raw } else { f_raw };

        let up = gravity / gravity.norm();
        let f_component = f_raw - (f_raw.dot(&up)) * up;
        let forward = if f_component.norm() > 0.0 { f_component / f_component.norm() } else { f_component };
        let right = forward.cross(&up);

        let q_g = 1.0 - ((gravity.norm() - EXPECTED_GRAVITY_MAGNITUDE).abs() / 2.0).min(1.0);
        let q_f = (f_raw.norm() / 2.0).min(1.0);
        let q_perp = (1.0 - f_raw.dot(&up).abs()).clamp(0.0, 1.0);
        let quality = (q_g + q_f + q_perp) / 3.0;

        let rotation = Matrix3::from_rows(&[forward.transpose(), right.transpose(), up.transpose()]);

        let data = CalibrationData {
            gravity: vector3_to_array(&gravity),
            forward: vector3_to_array(&forward),
            right: vector3_to_array(&right),
            up: vector3_to_array(&up),
            rotation: matrix3_to_arrays(&rotation),
            quality,
            timestamp,
        };

        self.result = Some(data);
        self.state = CalibrationState::Done;
        Ok(self.result.as_ref().unwrap())
    }

    /// Discards both buffers and returns the machine to `awaiting-gravity`.
    pub fn reset(&mut self) {
        self.gravity_samples.clear();
        self.forward_samples.clear();
        self.result = None;
        self.state = CalibrationState::AwaitingGravity;
    }
}

fn mean(samples: &[Vector3<f64>]) -> Vector3<f64> {
    if samples.is_empty() {
        return Vector3::zeros();
    }
    let sum: Vector3<f64> = samples.iter().fold(Vector3::zeros(), |acc, v| acc + v);
    sum / samples.len() as f64
}

/// Dominant-axis estimation via power iteration on the uncentred
/// second-moment matrix `C = mean(x x^T)`. Using the uncentred moment
/// (rather than textbook mean-deviation covariance) keeps a constant,
/// noiseless forward-phase signal (as in the worked calibration example)
/// from degenerating to a zero covariance matrix.
fn dominant_axis(samples: &[Vector3<f64>]) -> (Vector3<f64>, Vector3<f64>) {
    if samples.is_empty() {
        return (Vector3::zeros(), Vector3::zeros());
    }
    let n = samples.len() as f64;
    let mut c = Matrix3::zeros();
    for s in samples {
        c += s * s.transpose();
    }
    c /= n;

    let mut v = Vector3::new(1.0, 1.0, 1.0) / 3.0f64.sqrt();
    let mut raw = v;
    for _ in 0..POWER_ITERATIONS {
        raw = c * v;
        let norm = raw.norm();
        v = if norm > 0.0 { raw / norm } else { v };
    }
    (raw, v)
}

fn vector3_to_array(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

fn matrix3_to_arrays(m: &Matrix3<f64>) -> [[f64; 3]; 3] {
    [
        [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
        [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn orthonormal_calibration_from_worked_example() {
        let mut engine = CalibrationEngine::new();
        for _ in 0..150 {
            engine.push_sample([0.0, 0.0, 9.81]);
        }
        engine.end_gravity_phase().unwrap();
        for _ in 0..250 {
            engine.push_sample([2.0, 0.0, 9.81]);
        }
        let data = engine.finish(0.0).unwrap();

        assert_abs_diff_eq!(data.forward[0], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(data.forward[1], 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(data.forward[2], 0.0, epsilon = 1e-3);

        assert_abs_diff_eq!(data.up[2], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(data.right[1], -1.0, epsilon = 1e-3);

        let f = Vector3::from(data.forward);
        let r = Vector3::from(data.right);
        let u = Vector3::from(data.up);
        assert_abs_diff_eq!(f.norm(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(r.norm(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(u.norm(), 1.0, epsilon = 1e-6);
        assert!(f.dot(&u).abs() < 1e-6);
        assert!(f.dot(&r).abs() < 1e-6);
        assert!(r.dot(&u).abs() < 1e-6);

        assert!(data.quality >= 0.9, "quality was {}", data.quality);
    }

    #[test]
    fn quality_stays_within_unit_interval_for_tilted_strong_signal() {
        let mut engine = CalibrationEngine::new();
        for _ in 0..150 {
            engine.push_sample([0.0, 0.0, 9.81]);
        }
        engine.end_gravity_phase().unwrap();
        // Strong forward-phase signal tilted well away from the up axis:
        // gravity-removed linear accel is (2.0, 0.0, 2.0), large enough that
        // the unnormalized power-iteration vector's dot with `up` exceeds 1.
        for _ in 0..250 {
            engine.push_sample([2.0, 0.0, 11.81]);
        }
        let data = engine.finish(0.0).unwrap();
        assert!(data.quality >= 0.0 && data.quality <= 1.0, "quality out of range: {}", data.quality);
    }

    #[test]
    fn insufficient_gravity_samples_fails() {
        let mut engine = CalibrationEngine::new();
        for _ in 0..10 {
            engine.push_sample([0.0, 0.0, 9.81]);
        }
        let err = engine.end_gravity_phase().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InsufficientSamples);
        assert_eq!(engine.state(), CalibrationState::Failed);
    }

    #[test]
    fn reset_clears_buffers_and_returns_to_awaiting_gravity() {
        let mut engine = CalibrationEngine::new();
        engine.push_sample([0.0, 0.0, 9.81]);
        engine.reset();
        assert_eq!(engine.state(), CalibrationState::AwaitingGravity);
        assert_eq!(engine.progress(), 0.0);
    }
}
