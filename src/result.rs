//! Analysis result documents (§3 "Analysis result") returned by the
//! Pipeline Orchestrator for the logger and sensor paths.

use serde::Serialize;

use crate::binning::{RpmBin, RpmStatistics};
use crate::config::AnalysisConfig;
use crate::sensor_power::{SensorStatistics, SpeedBin};

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpmBinDoc {
    pub bin_centre_rpm: f64,
    pub mean_wheel_speed_kmh: f64,
    pub mean_power_cv: f64,
    pub mean_torque_nm: f64,
    pub mean_head_temp_c: f64,
    pub mean_coolant_temp_c: f64,
    pub mean_exhaust_temp_c: f64,
    pub mean_lambda: f64,
    pub sample_count: usize,
}

impl From<RpmBin> for RpmBinDoc {
    fn from(b: RpmBin) -> Self {
        Self {
            bin_centre_rpm: b.bin_centre_rpm,
            mean_wheel_speed_kmh: b.mean_wheel_speed_kmh,
            mean_power_cv: b.mean_power_cv,
            mean_torque_nm: b.mean_torque_nm,
            mean_head_temp_c: b.mean_head_temp_c,
            mean_coolant_temp_c: b.mean_coolant_temp_c,
            mean_exhaust_temp_c: b.mean_exhaust_temp_c,
            mean_lambda: b.mean_lambda,
            sample_count: b.sample_count,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpmStatisticsDoc {
    pub peak_power_cv: f64,
    pub peak_power_rpm: f64,
    pub peak_torque_nm: f64,
    pub peak_torque_rpm: f64,
    pub mean_power_cv: f64,
    pub mean_torque_nm: f64,
    pub rpm_min: f64,
    pub rpm_max: f64,
    pub total_accepted_samples: usize,
}

impl From<RpmStatistics> for RpmStatisticsDoc {
    fn from(s: RpmStatistics) -> Self {
        Self {
            peak_power_cv: s.peak_power_cv,
            peak_power_rpm: s.peak_power_rpm,
            peak_torque_nm: s.peak_torque_nm,
            peak_torque_rpm: s.peak_torque_rpm,
            mean_power_cv: s.mean_power_cv,
            mean_torque_nm: s.mean_torque_nm,
            rpm_min: s.rpm_min,
            rpm_max: s.rpm_max,
            total_accepted_samples: s.total_accepted_samples,
        }
    }
}

/// One lap's telemetry trace, time rebased to lap start (§4.10).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LapTrace {
    pub lap_index: usize,
    pub is_out_lap: bool,
    pub is_in_lap: bool,
    pub lap_time_s: f64,
    pub time_s: Vec<f64>,
    pub engine_rpm: Vec<f64>,
    pub wheel_speed_kmh: Vec<f64>,
    pub gear: Vec<u32>,
    pub power_cv: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerAnalysisResult {
    pub rpm_bins: Vec<RpmBinDoc>,
    pub raw_accepted_count: usize,
    pub laps: Vec<LapTrace>,
    pub statistics: RpmStatisticsDoc,
    pub configuration: AnalysisConfig,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedBinDoc {
    pub bin_centre_kmh: f64,
    pub bin_centre_mps: f64,
    pub mean_power_cv: f64,
    pub mean_power_w: f64,
    pub mean_forward_accel_mps2: f64,
    pub sample_count: usize,
}

impl From<SpeedBin> for SpeedBinDoc {
    fn from(b: SpeedBin) -> Self {
        Self {
            bin_centre_kmh: b.bin_centre_kmh,
            bin_centre_mps: b.bin_centre_mps,
            mean_power_cv: b.mean_power_cv,
            mean_power_w: b.mean_power_w,
            mean_forward_accel_mps2: b.mean_forward_accel_mps2,
            sample_count: b.sample_count,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorStatisticsDoc {
    pub peak_power_cv: f64,
    pub peak_power_speed_kmh: f64,
    pub max_observed_speed_kmh: f64,
    pub max_forward_accel_g: f64,
    pub max_deceleration_g: f64,
    pub total_samples: usize,
    pub valid_speed_samples: usize,
}

impl From<SensorStatistics> for SensorStatisticsDoc {
    fn from(s: SensorStatistics) -> Self {
        Self {
            peak_power_cv: s.peak_power_cv,
            peak_power_speed_kmh: s.peak_power_speed_kmh,
            max_observed_speed_kmh: s.max_observed_speed_kmh,
            max_forward_accel_g: s.max_forward_accel_g,
            max_deceleration_g: s.max_deceleration_g,
            total_samples: s.total_samples,
            valid_speed_samples: s.valid_speed_samples,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorAnalysisResult {
    pub speed_bins: Vec<SpeedBinDoc>,
    pub statistics: SensorStatisticsDoc,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum AnalysisResult {
    Logger(LoggerAnalysisResult),
    Sensor(SensorAnalysisResult),
}
