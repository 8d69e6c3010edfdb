//! Logger Power Engine (§4.6): computes instantaneous wheel force, power,
//! and torque for every valid sample in the selected laps.

use crate::config::{AnalysisParams, VehicleConfig};
use crate::gear;
use crate::laps::Lap;
use crate::telemetry::TelemetryChannels;

const STANDARD_GRAVITY: f64 = 9.80665;
const MIN_SPEED_MPS: f64 = 5.0 / 3.6;
const CV_WATTS: f64 = 735.5;

#[derive(Debug, Clone, Copy)]
pub struct SamplePoint {
    pub engine_rpm: f64,
    pub wheel_speed_kmh: f64,
    pub wheel_power_cv: f64,
    pub wheel_torque_nm: f64,
    pub gear: u32,
    pub head_temp_c: f64,
    pub coolant_temp_c: f64,
    pub exhaust_temp_c: f64,
    pub lambda: f64,
    pub lap_index: usize,
    pub sample_index: usize,
}

fn channel_value(channel: &Option<Vec<f64>>, idx: usize) -> f64 {
    channel.as_ref().and_then(|c| c.get(idx)).copied().unwrap_or(0.0)
}

/// Processes every sample within `laps[lap_idx].start..end` for each
/// `lap_idx` in `selected_laps`, rejecting samples per §4.6, and returns
/// the accepted sample points in ascending sample-index order.
pub fn process(
    telemetry: &TelemetryChannels,
    laps: &[Lap],
    selected_laps: &[usize],
    vehicle: &VehicleConfig,
    analysis: &AnalysisParams,
    air_density: f64,
) -> Vec<SamplePoint> {
    let radius_m = vehicle.tyre.radius_m();
    let final_ratio = vehicle.final_drive.ratio();
    let mut accepted = Vec::new();

    for &lap_idx in selected_laps {
        let Some(lap) = laps.get(lap_idx) else { continue };
        for i in lap.start..lap.end.min(telemetry.len()) {
            let v = telemetry.gps_speed_kmh[i] / 3.6;
            let a = telemetry.lon_acc_g[i] * STANDARD_GRAVITY;
            let rpm = telemetry.engine_rpm[i];

            if v < MIN_SPEED_MPS {
                continue;
            }
            if a <= 0.0 {
                continue;
            }
            if rpm < analysis.min_rpm || rpm > analysis.max_rpm {
                continue;
            }

            let gear_result = gear::detect(rpm, v, radius_m, final_ratio, &vehicle.engine);
            if gear_result.gear == 0 {
                continue;
            }

            let drag = 0.5 * air_density * vehicle.kart.frontal_area_m2 * vehicle.kart.drag_coefficient * v * v;
            let rolling = vehicle.kart.mass_kg * STANDARD_GRAVITY * (vehicle.tyre.c1 + vehicle.tyre.c2 * v * v);
            let linear_inertia = vehicle.kart.mass_kg * a;
            let wheel_inertia = 2.0 * vehicle.tyre.inertia_kgm2 * (a / radius_m) / radius_m;
            let engine_inertia =
                vehicle.engine.inertia_kgm2 * (a / radius_m) * gear_result.total_ratio * gear_result.total_ratio / radius_m;

            let force = linear_inertia + drag + rolling + wheel_inertia + engine_inertia;
            let power_watts = force * v;
            let power_cv = power_watts / CV_WATTS;
            let torque_nm = force * radius_m;

            if power_cv < 0.0 || power_cv > analysis.power_sanity_max_cv {
                continue;
            }

            accepted.push(SamplePoint {
                engine_rpm: rpm,
                wheel_speed_kmh: telemetry.gps_speed_kmh[i],
                wheel_power_cv: power_cv,
                wheel_torque_nm: torque_nm,
                gear: gear_result.gear,
                head_temp_c: channel_value(&telemetry.head_temp, i),
                coolant_temp_c: channel_value(&telemetry.coolant_temp, i),
                exhaust_temp_c: channel_value(&telemetry.exhaust_temp, i),
                lambda: channel_value(&telemetry.lambda, i),
                lap_index: lap_idx,
                sample_index: i,
            });
        }
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, GearRatio};
    use crate::laps::Lap;

    fn synthetic_run() -> (TelemetryChannels, AnalysisConfig) {
        let n = 1000;
        let dt = 0.1;
        let radius = 0.14;
        let primary = 10.0 / 10.0;
        let final_ratio = 80.0 / 11.0;
        let total_ratio = primary * final_ratio;

        let mut time = Vec::with_capacity(n);
        let mut speed_kmh = Vec::with_capacity(n);
        let mut lon_acc = Vec::with_capacity(n);
        let mut rpm = Vec::with_capacity(n);
        for i in 0..n {
            let t = i as f64 * dt;
            let v = 5.0 + 2.0 * t;
            time.push(t);
            speed_kmh.push(v * 3.6);
            lon_acc.push(2.0 / 9.80665);
            let wheel_omega = v / radius;
            let engine_omega = wheel_omega * total_ratio;
            rpm.push(engine_omega * 30.0 / std::f64::consts::PI);
        }

        let telemetry = TelemetryChannels {
            time,
            engine_rpm: rpm,
            gps_speed_kmh: speed_kmh,
            lon_acc_g: lon_acc,
            ..Default::default()
        };

        let mut cfg = AnalysisConfig::default();
        cfg.vehicle.engine.primary = GearRatio { input: 10, output: 10 };
        cfg.vehicle.engine.gears = vec![];
        cfg.vehicle.final_drive.front_teeth = 11;
        cfg.vehicle.final_drive.rear_teeth = 80;
        cfg.vehicle.tyre.diameter_mm = 280.0;
        cfg.vehicle.tyre.inertia_kgm2 = 0.027;
        cfg.vehicle.tyre.c1 = 0.03;
        cfg.vehicle.tyre.c2 = 1e-5;
        cfg.vehicle.kart.mass_kg = 175.0;
        cfg.vehicle.kart.frontal_area_m2 = 0.5784;
        cfg.vehicle.kart.drag_coefficient = 0.804;
        cfg.vehicle.engine.inertia_kgm2 = 0.003;
        cfg.analysis.min_rpm = 1000.0;
        cfg.analysis.max_rpm = 20000.0;

        (telemetry, cfg)
    }

    #[test]
    fn single_lap_direct_drive_accepts_many_samples_with_positive_power() {
        let (telemetry, cfg) = synthetic_run();
        let laps = vec![Lap { start: 0, end: telemetry.len(), lap_time_s: 99.9, is_out_lap: false, is_in_lap: false }];
        let density = crate::environment::humid_air_density(1013.0, 20.0, 50.0);
        let accepted = process(&telemetry, &laps, &[0], &cfg.vehicle, &cfg.analysis, density);

        assert!(accepted.len() >= 80, "expected >=80 accepted samples, got {}", accepted.len());
        assert!(accepted.iter().all(|s| s.gear == 1));
        assert!(accepted.iter().any(|s| s.wheel_power_cv > 0.0));
    }
}
