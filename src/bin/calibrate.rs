//! `calibrate` — offline test harness for the Calibration Engine (§4.8).
//!
//! Reads a JSON file with `gravityPhase` and `forwardPhase` arrays of
//! `[x, y, z]` device-frame acceleration samples (m/s^2), runs them through
//! the calibration state machine, and prints the resulting rotation and
//! quality score. Exit codes: 0 success, 2 insufficient samples, 3 I/O,
//! 4 malformed samples file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Deserialize;
use tracing::{error, info};

use kart_power_curve::calibration::CalibrationEngine;
use kart_power_curve::error::ErrorKind;

#[derive(Parser, Debug)]
#[command(name = "calibrate", about = "Run the device-to-kart calibration engine against a recorded sample file", version)]
struct Cli {
    /// Path to a JSON file with `gravityPhase`/`forwardPhase` sample arrays.
    #[arg(long)]
    samples: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalibrationSamplesFile {
    gravity_phase: Vec<[f64; 3]>,
    forward_phase: Vec<[f64; 3]>,
}

fn run(cli: Cli) -> ExitCode {
    let text = match std::fs::read_to_string(&cli.samples) {
        Ok(text) => text,
        Err(e) => {
            error!("cannot read {}: {e}", cli.samples.display());
            return ExitCode::from(3);
        }
    };

    let samples: CalibrationSamplesFile = match serde_json::from_str(&text) {
        Ok(samples) => samples,
        Err(e) => {
            error!("malformed samples file {}: {e}", cli.samples.display());
            return ExitCode::from(4);
        }
    };

    let mut engine = CalibrationEngine::new();
    for s in &samples.gravity_phase {
        engine.push_sample(*s);
    }
    if let Err(e) = engine.end_gravity_phase() {
        error!(component = e.component(), "{e}");
        return exit_for(&e);
    }

    for s in &samples.forward_phase {
        engine.push_sample(*s);
    }
    let data = match engine.finish(0.0) {
        Ok(data) => data,
        Err(e) => {
            error!(component = e.component(), "{e}");
            return exit_for(&e);
        }
    };

    info!(quality = data.quality, "calibration complete");
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!("cannot serialize calibration result: {e}");
            return ExitCode::from(3);
        }
    }

    ExitCode::SUCCESS
}

fn exit_for(e: &kart_power_curve::error::CoreError) -> ExitCode {
    match e.kind() {
        ErrorKind::InsufficientSamples => ExitCode::from(2),
        ErrorKind::MalformedInput => ExitCode::from(4),
        ErrorKind::ConfigurationInvalid => ExitCode::from(4),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();
    run(Cli::parse())
}
