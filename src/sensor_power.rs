//! Sensor Power Engine (§4.9): transforms raw device-frame acceleration
//! into kart-frame forward acceleration using a calibration, computes
//! force-balance power per sample, bins by speed, and smooths.

use nalgebra::{Matrix3, Vector3};

use crate::calibration::CalibrationData;
use crate::smoothing::smooth_speed_curve;

const STANDARD_GRAVITY: f64 = 9.80665;
const CV_WATTS: f64 = 735.5;
const MIN_VALID_SPEED_MPS: f64 = 0.5;
const BIN_WIDTH_KMH: f64 = 5.0;
const MIN_SAMPLES_PER_BIN: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct GpsSample {
    pub speed_mps: f64,
    pub accuracy_m: f64,
    pub lat: f64,
    pub lon: f64,
}

/// One raw accelerometer sample, device frame, plus an optional GPS fix
/// taken at the same wall clock (§3 "Sensor sample").
#[derive(Debug, Clone, Copy)]
pub struct SensorSample {
    pub timestamp_ms: f64,
    pub accel_device: [f64; 3],
    pub gps: Option<GpsSample>,
}

/// Kart-frame parameters used when the caller has no dedicated vehicle
/// config; defaults per §4.9.
#[derive(Debug, Clone, Copy)]
pub struct SensorVehicleParams {
    pub mass_kg: f64,
    pub frontal_area_m2: f64,
    pub drag_coefficient: f64,
    pub rolling_coefficient: f64,
    pub air_density: f64,
}

impl Default for SensorVehicleParams {
    fn default() -> Self {
        Self {
            mass_kg: 175.0,
            frontal_area_m2: 0.5,
            drag_coefficient: 0.8,
            rolling_coefficient: 0.02,
            air_density: 1.225,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct AcceptedSample {
    speed_mps: f64,
    power_cv: f64,
    forward_accel_mps2: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SpeedBin {
    pub bin_centre_kmh: f64,
    pub bin_centre_mps: f64,
    pub mean_power_cv: f64,
    pub mean_power_w: f64,
    pub mean_forward_accel_mps2: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SensorStatistics {
    pub peak_power_cv: f64,
    pub peak_power_speed_kmh: f64,
    pub max_observed_speed_kmh: f64,
    pub max_forward_accel_g: f64,
    pub max_deceleration_g: f64,
    pub total_samples: usize,
    pub valid_speed_samples: usize,
}

fn rotation_from(data: &CalibrationData) -> Matrix3<f64> {
    Matrix3::from_rows(&[
        Vector3::from(data.forward).transpose(),
        Vector3::from(data.right).transpose(),
        Vector3::from(data.up).transpose(),
    ])
}

/// Processes a sensor sample stream into speed bins and statistics.
pub fn process(
    samples: &[SensorSample],
    calibration: &CalibrationData,
    params: &SensorVehicleParams,
    filter_level: f64,
) -> (Vec<SpeedBin>, SensorStatistics) {
    let gravity = Vector3::from(calibration.gravity);
    let rotation = rotation_from(calibration);

    let mut stats = SensorStatistics::default();
    let mut accepted: Vec<AcceptedSample> = Vec::new();

    for sample in samples {
        stats.total_samples += 1;
        let Some(gps) = sample.gps else { continue };
        let speed_mps = gps.speed_mps;
        if speed_mps > MIN_VALID_SPEED_MPS {
            stats.valid_speed_samples += 1;
        }
        if speed_mps < MIN_VALID_SPEED_MPS {
            continue;
        }

        let device = Vector3::new(sample.accel_device[0], sample.accel_device[1], sample.accel_device[2]);
        let linear = device - gravity;
        let kart = rotation * linear;
        let forward_accel = kart.x;

        let drag = 0.5 * params.air_density * params.frontal_area_m2 * params.drag_coefficient * speed_mps * speed_mps;
        let rolling = params.mass_kg * STANDARD_GRAVITY * params.rolling_coefficient;
        let force = params.mass_kg * forward_accel + drag + rolling;
        let power_watts = force * speed_mps;
        let power_cv = power_watts / CV_WATTS;

        if power_cv <= 0.0 {
            continue;
        }

        // Stats below are "from raw accepted" (§4.9): only samples retained
        // past the power filter count toward them.
        let forward_g = forward_accel / STANDARD_GRAVITY;
        if forward_g > stats.max_forward_accel_g {
            stats.max_forward_accel_g = forward_g;
        }
        if -forward_g > stats.max_deceleration_g {
            stats.max_deceleration_g = -forward_g;
        }

        let speed_kmh = speed_mps * 3.6;
        if speed_kmh > stats.max_observed_speed_kmh {
            stats.max_observed_speed_kmh = speed_kmh;
        }

        accepted.push(AcceptedSample { speed_mps, power_cv, forward_accel_mps2: forward_accel });
    }

    let bins = bin_and_smooth(&accepted, filter_level);

    if let Some(peak) = bins.iter().max_by(|a, b| a.mean_power_cv.partial_cmp(&b.mean_power_cv).unwrap()) {
        stats.peak_power_cv = peak.mean_power_cv;
        stats.peak_power_speed_kmh = peak.bin_centre_kmh;
    }

    (bins, stats)
}

fn bin_and_smooth(accepted: &[AcceptedSample], filter_level: f64) -> Vec<SpeedBin> {
    use std::collections::BTreeMap;

    let mut buckets: BTreeMap<i64, Vec<&AcceptedSample>> = BTreeMap::new();
    for sample in accepted {
        let kmh = sample.speed_mps * 3.6;
        let bin = (kmh / BIN_WIDTH_KMH).floor() as i64;
        buckets.entry(bin).or_default().push(sample);
    }

    let mut bins: Vec<SpeedBin> = Vec::new();
    for (bin, members) in buckets {
        if members.len() < MIN_SAMPLES_PER_BIN {
            continue;
        }
        let n = members.len() as f64;
        let mean_power_cv = members.iter().map(|s| s.power_cv).sum::<f64>() / n;
        let mean_power_w = mean_power_cv * CV_WATTS;
        let mean_forward_accel = members.iter().map(|s| s.forward_accel_mps2).sum::<f64>() / n;
        let bin_centre_kmh = (bin as f64 + 0.5) * BIN_WIDTH_KMH;

        bins.push(SpeedBin {
            bin_centre_kmh,
            bin_centre_mps: bin_centre_kmh / 3.6,
            mean_power_cv,
            mean_power_w,
            mean_forward_accel_mps2: mean_forward_accel,
            sample_count: members.len(),
        });
    }

    bins.sort_by(|a, b| a.bin_centre_kmh.partial_cmp(&b.bin_centre_kmh).unwrap());

    let powers: Vec<f64> = bins.iter().map(|b| b.mean_power_cv).collect();
    let smoothed = smooth_speed_curve(&powers, filter_level);
    for (i, bin) in bins.iter_mut().enumerate() {
        bin.mean_power_cv = smoothed[i];
        bin.mean_power_w = smoothed[i] * CV_WATTS;
    }

    bins
}
