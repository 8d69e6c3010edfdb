//! Gear Detector (§4.5): infers the engaged gear from the observed
//! RPM/wheel-speed ratio against the gearbox chain.

use crate::config::EngineConfig;

const GEAR_MATCH_THRESHOLD: f64 = 0.15;
const MIN_SPEED_MPS: f64 = 1.0;

#[derive(Debug, Clone, Copy)]
pub struct GearResult {
    /// 1-based gear index, or 0 if undetected.
    pub gear: u32,
    pub total_ratio: f64,
}

/// Detects the engaged gear and total drivetrain ratio.
///
/// `wheel_speed_mps` is the linear speed at the tyre contact patch,
/// `wheel_radius_m` the rolling radius, `final_ratio` rear/front final
/// drive teeth.
pub fn detect(engine_rpm: f64, wheel_speed_mps: f64, wheel_radius_m: f64, final_ratio: f64, engine: &EngineConfig) -> GearResult {
    let primary_ratio = engine.primary.ratio();

    if engine.is_direct_drive() {
        return GearResult { gear: 1, total_ratio: primary_ratio * final_ratio };
    }

    if wheel_speed_mps < MIN_SPEED_MPS {
        return GearResult { gear: 0, total_ratio: 0.0 };
    }

    let wheel_omega = wheel_speed_mps / wheel_radius_m;
    let engine_omega = engine_rpm * std::f64::consts::PI / 30.0;
    let observed_ratio = engine_omega / wheel_omega;

    let mut best: Option<(usize, f64, f64)> = None; // (index, relative_error, ratio)
    for (i, gear) in engine.gears.iter().enumerate() {
        let candidate_ratio = primary_ratio * gear.ratio() * final_ratio;
        let relative_error = (observed_ratio - candidate_ratio).abs() / candidate_ratio;
        match &best {
            None => best = Some((i, relative_error, candidate_ratio)),
            Some((_, best_err, _)) if relative_error < *best_err => best = Some((i, relative_error, candidate_ratio)),
            _ => {}
        }
    }

    match best {
        Some((idx, relative_error, ratio)) if relative_error < GEAR_MATCH_THRESHOLD => {
            GearResult { gear: (idx + 1) as u32, total_ratio: ratio }
        }
        _ => GearResult { gear: 0, total_ratio: 0.0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GearRatio;

    fn shifter_engine() -> EngineConfig {
        EngineConfig {
            inertia_kgm2: 0.003,
            primary: GearRatio { input: 19, output: 75 },
            gears: vec![
                GearRatio { input: 13, output: 33 },
                GearRatio { input: 16, output: 29 },
                GearRatio { input: 18, output: 27 },
                GearRatio { input: 22, output: 27 },
                GearRatio { input: 22, output: 23 },
                GearRatio { input: 27, output: 25 },
            ],
        }
    }

    #[test]
    fn direct_drive_always_gear_one() {
        let engine = EngineConfig { inertia_kgm2: 0.003, primary: GearRatio { input: 10, output: 10 }, gears: vec![] };
        let result = detect(12000.0, 20.0, 0.14, 80.0 / 11.0, &engine);
        assert_eq!(result.gear, 1);
    }

    #[test]
    fn detects_each_of_six_gears_exactly() {
        let engine = shifter_engine();
        let final_ratio = 80.0 / 11.0;
        let radius = 0.14;
        for k in 1..=6usize {
            let v = 8.0 + 0.5 * k as f64;
            let gear = &engine.gears[k - 1];
            let total_ratio = engine.primary.ratio() * gear.ratio() * final_ratio;
            let wheel_omega = v / radius;
            let engine_omega = wheel_omega * total_ratio;
            let rpm = engine_omega * 30.0 / std::f64::consts::PI;
            let result = detect(rpm, v, radius, final_ratio, &engine);
            assert_eq!(result.gear, k as u32, "gear {k} not detected");
        }
    }

    #[test]
    fn low_speed_returns_zero_without_attempting() {
        let engine = shifter_engine();
        let result = detect(9000.0, 0.5, 0.14, 80.0 / 11.0, &engine);
        assert_eq!(result.gear, 0);
    }

    #[test]
    fn off_by_more_than_fifteen_percent_returns_zero() {
        let engine = shifter_engine();
        let final_ratio = 80.0 / 11.0;
        let radius = 0.14;
        let gear = &engine.gears[0];
        let total_ratio = engine.primary.ratio() * gear.ratio() * final_ratio;
        let v = 8.5;
        let wheel_omega = v / radius;
        let rpm = wheel_omega * total_ratio * 30.0 / std::f64::consts::PI * 1.30; // 30% off
        let result = detect(rpm, v, radius, final_ratio, &engine);
        assert_eq!(result.gear, 0);
    }
}
