//! Configuration loading for the `analyze` and `calibrate` binaries.

use std::path::Path;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct GearRatio {
    #[serde(rename = "in")]
    pub input: u32,
    #[serde(rename = "out")]
    pub output: u32,
}

impl GearRatio {
    pub fn ratio(&self) -> f64 {
        self.output as f64 / self.input as f64
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct KartConfig {
    #[serde(default = "default_mass")]
    pub mass_kg: f64,
    #[serde(default = "default_frontal_area")]
    pub frontal_area_m2: f64,
    #[serde(default = "default_drag_coefficient")]
    pub drag_coefficient: f64,
}

impl Default for KartConfig {
    fn default() -> Self {
        Self {
            mass_kg: default_mass(),
            frontal_area_m2: default_frontal_area(),
            drag_coefficient: default_drag_coefficient(),
        }
    }
}

fn default_mass() -> f64 {
    175.0
}
fn default_frontal_area() -> f64 {
    0.5784
}
fn default_drag_coefficient() -> f64 {
    0.804
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_inertia")]
    pub inertia_kgm2: f64,
    #[serde(default = "default_primary")]
    pub primary: GearRatio,
    /// Empty gear list means a direct-drive engine (§4.5).
    #[serde(default)]
    pub gears: Vec<GearRatio>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            inertia_kgm2: default_engine_inertia(),
            primary: default_primary(),
            gears: Vec::new(),
        }
    }
}

fn default_engine_inertia() -> f64 {
    0.003
}
fn default_primary() -> GearRatio {
    GearRatio { input: 1, output: 1 }
}

impl EngineConfig {
    pub fn is_direct_drive(&self) -> bool {
        self.gears.is_empty()
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct TyreConfig {
    #[serde(default = "default_diameter_mm")]
    pub diameter_mm: f64,
    #[serde(default = "default_tyre_inertia")]
    pub inertia_kgm2: f64,
    #[serde(default = "default_c1")]
    pub c1: f64,
    #[serde(default = "default_c2")]
    pub c2: f64,
}

impl Default for TyreConfig {
    fn default() -> Self {
        Self {
            diameter_mm: default_diameter_mm(),
            inertia_kgm2: default_tyre_inertia(),
            c1: default_c1(),
            c2: default_c2(),
        }
    }
}

impl TyreConfig {
    pub fn radius_m(&self) -> f64 {
        self.diameter_mm / 2000.0
    }
}

fn default_diameter_mm() -> f64 {
    280.0
}
fn default_tyre_inertia() -> f64 {
    0.027
}
fn default_c1() -> f64 {
    0.03
}
fn default_c2() -> f64 {
    1e-5
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct FinalDriveConfig {
    #[serde(default = "default_front_teeth")]
    pub front_teeth: u32,
    #[serde(default = "default_rear_teeth")]
    pub rear_teeth: u32,
}

impl Default for FinalDriveConfig {
    fn default() -> Self {
        Self { front_teeth: default_front_teeth(), rear_teeth: default_rear_teeth() }
    }
}

impl FinalDriveConfig {
    pub fn ratio(&self) -> f64 {
        self.rear_teeth as f64 / self.front_teeth as f64
    }
}

fn default_front_teeth() -> u32 {
    11
}
fn default_rear_teeth() -> u32 {
    80
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct RunConditions {
    #[serde(default = "default_pressure")]
    pub pressure_mbar: f64,
    #[serde(default = "default_temperature")]
    pub temperature_c: f64,
    #[serde(default = "default_humidity")]
    pub humidity_pct: f64,
    #[serde(default = "default_grip")]
    pub track_grip: f64,
}

impl Default for RunConditions {
    fn default() -> Self {
        Self {
            pressure_mbar: default_pressure(),
            temperature_c: default_temperature(),
            humidity_pct: default_humidity(),
            track_grip: default_grip(),
        }
    }
}

fn default_pressure() -> f64 {
    1013.0
}
fn default_temperature() -> f64 {
    20.0
}
fn default_humidity() -> f64 {
    50.0
}
fn default_grip() -> f64 {
    0.8
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct VehicleConfig {
    #[serde(default)]
    pub kart: KartConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub tyre: TyreConfig,
    #[serde(default, rename = "final_drive")]
    pub final_drive: FinalDriveConfig,
    #[serde(default)]
    pub run_conditions: RunConditions,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalysisParams {
    #[serde(default = "default_min_rpm")]
    pub min_rpm: f64,
    #[serde(default = "default_max_rpm")]
    pub max_rpm: f64,
    #[serde(default = "default_filter_level")]
    pub filter_level: f64,
    /// Configurable sanity bound on accepted wheel power (CV). Spec §9 Open
    /// Question 2: kept as a field rather than a hard-coded constant so
    /// karts above 100 CV at the wheel are not silently dropped.
    #[serde(default = "default_power_sanity_max_cv")]
    pub power_sanity_max_cv: f64,
    #[serde(default)]
    pub selected_laps: Vec<usize>,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            min_rpm: default_min_rpm(),
            max_rpm: default_max_rpm(),
            filter_level: default_filter_level(),
            power_sanity_max_cv: default_power_sanity_max_cv(),
            selected_laps: Vec::new(),
        }
    }
}

fn default_min_rpm() -> f64 {
    1000.0
}
fn default_max_rpm() -> f64 {
    20000.0
}
fn default_filter_level() -> f64 {
    50.0
}
fn default_power_sanity_max_cv() -> f64 {
    100.0
}

impl AnalysisParams {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.min_rpm >= self.max_rpm {
            return Err(CoreError::config_invalid(
                "analysis_params",
                format!("min_rpm ({}) must be less than max_rpm ({})", self.min_rpm, self.max_rpm),
            ));
        }
        Ok(())
    }
}

impl VehicleConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.kart.mass_kg <= 0.0 {
            return Err(CoreError::config_invalid("kart", "mass_kg must be positive"));
        }
        if self.tyre.diameter_mm <= 0.0 {
            return Err(CoreError::config_invalid("tyre", "diameter_mm must be positive"));
        }
        if self.final_drive.front_teeth == 0 || self.final_drive.rear_teeth == 0 {
            return Err(CoreError::config_invalid("final_drive", "teeth counts must be positive"));
        }
        if self.engine.primary.input == 0 || self.engine.primary.output == 0 {
            return Err(CoreError::config_invalid("engine", "primary reduction teeth counts must be positive"));
        }
        for (idx, gear) in self.engine.gears.iter().enumerate() {
            if gear.input == 0 || gear.output == 0 {
                return Err(CoreError::config_invalid(
                    "engine",
                    format!("gear {} has a non-positive teeth count", idx + 1),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub analysis: AnalysisParams,
}

/// Loads an analysis configuration from a TOML file. Returns defaults (§6)
/// when `path` is `None`, mirroring the teacher's `load_config` pattern of
/// falling back to `Default::default()` rather than erroring.
pub fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, CoreError> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| {
        CoreError::config_invalid("config", format!("cannot read {}: {}", path.display(), e))
    })?;
    let cfg: AnalysisConfig = toml::from_str(&text)
        .map_err(|e| CoreError::config_invalid("config", format!("cannot parse {}: {}", path.display(), e)))?;
    cfg.vehicle.validate()?;
    cfg.analysis.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.vehicle.kart.mass_kg, 175.0);
        assert_eq!(cfg.vehicle.tyre.diameter_mm, 280.0);
        assert_eq!(cfg.vehicle.run_conditions.pressure_mbar, 1013.0);
        assert!(cfg.vehicle.engine.is_direct_drive());
    }

    #[test]
    fn rejects_inverted_rpm_window() {
        let mut params = AnalysisParams::default();
        params.min_rpm = 15000.0;
        params.max_rpm = 8000.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn load_config_none_is_default() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.vehicle.kart.mass_kg, 175.0);
    }
}
