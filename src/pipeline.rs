//! Pipeline Orchestrator (§4.10): wires the logger and sensor components
//! together, enforces the configuration invariants, and assembles the
//! analysis result documents. No state is retained across calls.

use crate::binning;
use crate::calibration::CalibrationData;
use crate::channels;
use crate::config::AnalysisConfig;
use crate::csv_decoder;
use crate::environment;
use crate::error::CoreError;
use crate::gear;
use crate::laps::{self, Lap};
use crate::logger_power;
use crate::result::{AnalysisResult, LapTrace, LoggerAnalysisResult, SensorAnalysisResult};
use crate::sensor_power::{self, SensorSample, SensorVehicleParams};
use crate::telemetry::{self, TelemetryChannels};

/// Decodes logger CSV bytes, extracts laps, and materializes dense
/// telemetry arrays, without running the physics model.
pub fn decode_logger_csv(bytes: &[u8]) -> Result<(TelemetryChannels, Vec<Lap>), CoreError> {
    let decoded = csv_decoder::decode(bytes)?;
    let map = channels::resolve(&decoded.headers);
    let telemetry = telemetry::materialize(&decoded, &map)?;
    let lap_channel = telemetry.lap_index.as_deref();
    let laps = laps::extract(&telemetry.time, lap_channel, &decoded.metadata);
    Ok((telemetry, laps))
}

fn lap_power_estimate(mass_kg: f64, v_mps: f64, a_mps2: f64, gear_idx: u32) -> f64 {
    if v_mps > 1.0 && gear_idx > 0 && a_mps2 > 0.0 {
        (mass_kg * a_mps2 * v_mps) / 735.5
    } else {
        0.0
    }
}

fn build_lap_traces(
    telemetry: &TelemetryChannels,
    laps: &[Lap],
    selected_laps: &[usize],
    cfg: &AnalysisConfig,
) -> Vec<LapTrace> {
    const STANDARD_GRAVITY: f64 = 9.80665;

    let radius_m = cfg.vehicle.tyre.radius_m();
    let final_ratio = cfg.vehicle.final_drive.ratio();
    let mut traces = Vec::new();

    for &lap_idx in selected_laps {
        let Some(lap) = laps.get(lap_idx) else { continue };
        let lap_start_time = telemetry.time.get(lap.start).copied().unwrap_or(0.0);

        let mut trace = LapTrace {
            lap_index: lap_idx,
            is_out_lap: lap.is_out_lap,
            is_in_lap: lap.is_in_lap,
            lap_time_s: lap.lap_time_s,
            ..Default::default()
        };

        for i in lap.start..lap.end.min(telemetry.len()) {
            let v = telemetry.gps_speed_kmh[i] / 3.6;
            let a = telemetry.lon_acc_g[i] * STANDARD_GRAVITY;
            let rpm = telemetry.engine_rpm[i];
            let gear_result = gear::detect(rpm, v, radius_m, final_ratio, &cfg.vehicle.engine);

            trace.time_s.push(telemetry.time[i] - lap_start_time);
            trace.engine_rpm.push(rpm);
            trace.wheel_speed_kmh.push(telemetry.gps_speed_kmh[i]);
            trace.gear.push(gear_result.gear);
            trace.power_cv.push(lap_power_estimate(cfg.vehicle.kart.mass_kg, v, a, gear_result.gear));
        }

        traces.push(trace);
    }

    traces
}

/// Runs the full logger-path analysis: CSV decode, gear/physics per
/// accepted sample, RPM binning and smoothing, per-lap traces.
pub fn analyze_logger(bytes: &[u8], cfg: &AnalysisConfig, timestamp: f64) -> Result<AnalysisResult, CoreError> {
    cfg.vehicle.validate()?;
    cfg.analysis.validate()?;

    let (telemetry, laps) = decode_logger_csv(bytes)?;

    let selected_laps: Vec<usize> = if cfg.analysis.selected_laps.is_empty() {
        (0..laps.len()).collect()
    } else {
        cfg.analysis.selected_laps.clone()
    };

    let air_density = environment::humid_air_density(
        cfg.vehicle.run_conditions.pressure_mbar,
        cfg.vehicle.run_conditions.temperature_c,
        cfg.vehicle.run_conditions.humidity_pct,
    );

    let accepted = logger_power::process(&telemetry, &laps, &selected_laps, &cfg.vehicle, &cfg.analysis, air_density);
    let (bins, stats) = binning::bin_and_smooth(&accepted, cfg.analysis.filter_level);
    let lap_traces = build_lap_traces(&telemetry, &laps, &selected_laps, cfg);

    Ok(AnalysisResult::Logger(LoggerAnalysisResult {
        rpm_bins: bins.into_iter().map(Into::into).collect(),
        raw_accepted_count: accepted.len(),
        laps: lap_traces,
        statistics: stats.into(),
        configuration: cfg.clone(),
        timestamp,
    }))
}

/// Runs the full sensor-path analysis: transforms each sample into the
/// kart frame using an already-computed calibration, computes
/// force-balance power, speed-bins, and smooths.
pub fn analyze_sensor(
    samples: &[SensorSample],
    calibration: &CalibrationData,
    params: &SensorVehicleParams,
    filter_level: f64,
) -> Result<AnalysisResult, CoreError> {
    let (bins, stats) = sensor_power::process(samples, calibration, params, filter_level);
    Ok(AnalysisResult::Sensor(SensorAnalysisResult {
        speed_bins: bins.into_iter().map(Into::into).collect(),
        statistics: stats.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationEngine;
    use crate::config::GearRatio;
    use crate::sensor_power::GpsSample;

    #[test]
    fn zero_input_empty_session_is_malformed() {
        let csv = "Time,Distance,RPM,GPS_Speed,GPS_LatAcc,GPS_LonAcc\n";
        let cfg = AnalysisConfig::default();
        let err = analyze_logger(csv.as_bytes(), &cfg, 0.0).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedInput);
    }

    fn synthetic_direct_drive_csv() -> String {
        let mut csv = String::from("Format,Synthetic\nTime,RPM,GPS_Speed,GPS_LonAcc\n");
        let radius = 0.14;
        let total_ratio = 1.0 * (80.0 / 11.0);
        for i in 0..1000 {
            let t = i as f64 * 0.1;
            let v = 5.0 + 2.0 * t;
            let rpm = (v / radius) * total_ratio * 30.0 / std::f64::consts::PI;
            csv.push_str(&format!("{:.3},{:.3},{:.3},{:.3}\n", t, rpm, v * 3.6, 2.0 / 9.80665));
        }
        csv
    }

    #[test]
    fn single_lap_direct_drive_produces_bins_and_peak_power() {
        let csv = synthetic_direct_drive_csv();
        let mut cfg = AnalysisConfig::default();
        cfg.vehicle.engine.primary = GearRatio { input: 1, output: 1 };
        cfg.vehicle.engine.gears = vec![];
        cfg.vehicle.final_drive.front_teeth = 11;
        cfg.vehicle.final_drive.rear_teeth = 80;
        cfg.vehicle.tyre.diameter_mm = 280.0;
        cfg.analysis.min_rpm = 500.0;
        cfg.analysis.max_rpm = 20000.0;

        let result = analyze_logger(csv.as_bytes(), &cfg, 0.0).unwrap();
        let AnalysisResult::Logger(doc) = result else { panic!("expected logger result") };

        assert!(doc.raw_accepted_count >= 80);
        assert!(doc.rpm_bins.len() >= 5);
        assert!(doc.rpm_bins.iter().all(|b| {
            let n = (b.bin_centre_rpm - 50.0) / 100.0;
            (n - n.round()).abs() < 1e-6
        }));
        assert!(doc.statistics.peak_power_cv > 0.0);
    }

    #[test]
    fn shifter_gear_detection_all_six_gears() {
        let engine_primary = GearRatio { input: 19, output: 75 };
        let gears = vec![
            GearRatio { input: 13, output: 33 },
            GearRatio { input: 16, output: 29 },
            GearRatio { input: 18, output: 27 },
            GearRatio { input: 22, output: 27 },
            GearRatio { input: 22, output: 23 },
            GearRatio { input: 27, output: 25 },
        ];
        let final_ratio = 80.0 / 11.0;
        let radius = 0.14;

        let mut cfg = AnalysisConfig::default();
        cfg.vehicle.engine.primary = engine_primary;
        cfg.vehicle.engine.gears = gears.clone();
        cfg.vehicle.final_drive.front_teeth = 11;
        cfg.vehicle.final_drive.rear_teeth = 80;
        cfg.vehicle.tyre.diameter_mm = radius * 2000.0;

        for (k, gear) in gears.iter().enumerate() {
            let v = 8.0 + 0.5 * (k as f64 + 1.0);
            let total_ratio = engine_primary.ratio() * gear.ratio() * final_ratio;
            let rpm = (v / radius) * total_ratio * 30.0 / std::f64::consts::PI;
            let result = gear::detect(rpm, v, radius, final_ratio, &cfg.vehicle.engine);
            assert_eq!(result.gear, (k + 1) as u32);
        }
    }

    #[test]
    fn beacon_marker_laps_end_to_end() {
        let mut csv = String::from("Beacon Markers,60.0,125.3,188.1\nTime,RPM,GPS_Speed,GPS_LonAcc\n");
        for i in 0..2000 {
            let t = i as f64 * 0.1;
            csv.push_str(&format!("{:.3},9000,30,0.1\n", t));
        }
        let cfg = AnalysisConfig::default();
        let (_telemetry, laps) = decode_logger_csv(csv.as_bytes()).unwrap();
        assert_eq!(laps.len(), 3);
        assert!((laps[0].lap_time_s - 60.0).abs() < 0.2);
        assert!(laps[0].is_out_lap);
        assert!(!laps[2].is_in_lap);
        let _ = cfg;
    }

    #[test]
    fn calibration_orthonormal_end_to_end() {
        let mut engine = CalibrationEngine::new();
        for _ in 0..150 {
            engine.push_sample([0.0, 0.0, 9.81]);
        }
        engine.end_gravity_phase().unwrap();
        for _ in 0..250 {
            engine.push_sample([2.0, 0.0, 9.81]);
        }
        let data = *engine.finish(0.0).unwrap();
        assert!(data.quality >= 0.9);

        let samples: Vec<SensorSample> = (0..500)
            .map(|i| {
                let t = i as f64 / 50.0;
                SensorSample {
                    timestamp_ms: t * 1000.0,
                    accel_device: [1.0, 0.0, 9.81],
                    gps: Some(GpsSample { speed_mps: 30.0 * (t / 10.0), accuracy_m: 1.0, lat: 0.0, lon: 0.0 }),
                }
            })
            .collect();

        let params = SensorVehicleParams { mass_kg: 180.0, ..Default::default() };
        let result = analyze_sensor(&samples, &data, &params, 0.0).unwrap();
        let AnalysisResult::Sensor(doc) = result else { panic!("expected sensor result") };
        assert!(doc.speed_bins.len() >= 5);
        assert!(doc.statistics.peak_power_cv > 0.0);
    }
}
