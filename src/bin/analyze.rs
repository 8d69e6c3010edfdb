//! `analyze` — logger-path CLI front end for the power-curve core.
//!
//! Reads a CSV file plus an optional TOML configuration, runs the pipeline
//! once, and writes the analysis result as camelCase JSON. Exit codes per
//! the external-interface contract: 0 success, 2 malformed input, 3 I/O
//! error, 4 invalid configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use kart_power_curve::config::{self, AnalysisConfig};
use kart_power_curve::error::ErrorKind;
use kart_power_curve::export;
use kart_power_curve::pipeline;

#[derive(Parser, Debug)]
#[command(name = "analyze", about = "Reconstruct wheel-power and wheel-torque curves from a logger CSV", version)]
struct Cli {
    /// Path to the logger CSV file.
    #[arg(long)]
    csv: PathBuf,

    /// Path to a TOML vehicle/engine/tyre configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma-separated lap indices to include (0-based); defaults to all laps.
    #[arg(long, value_delimiter = ',')]
    laps: Vec<usize>,

    /// Minimum accepted engine RPM.
    #[arg(long)]
    min_rpm: Option<f64>,

    /// Maximum accepted engine RPM.
    #[arg(long)]
    max_rpm: Option<f64>,

    /// Smoothing filter level, 0-100.
    #[arg(long)]
    filter: Option<f64>,

    /// Output JSON path.
    #[arg(long)]
    out: PathBuf,
}

fn run(cli: Cli) -> ExitCode {
    let mut cfg: AnalysisConfig = match config::load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(component = e.component(), "{e}");
            return ExitCode::from(4);
        }
    };

    if !cli.laps.is_empty() {
        cfg.analysis.selected_laps = cli.laps;
    }
    if let Some(min_rpm) = cli.min_rpm {
        cfg.analysis.min_rpm = min_rpm;
    }
    if let Some(max_rpm) = cli.max_rpm {
        cfg.analysis.max_rpm = max_rpm;
    }
    if let Some(filter) = cli.filter {
        cfg.analysis.filter_level = filter;
    }

    if let Err(e) = cfg.analysis.validate() {
        error!(component = e.component(), "{e}");
        return ExitCode::from(4);
    }

    let bytes = match std::fs::read(&cli.csv) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("cannot read {}: {e}", cli.csv.display());
            return ExitCode::from(3);
        }
    };

    info!(path = %cli.csv.display(), "decoding logger CSV");
    let result = match pipeline::analyze_logger(&bytes, &cfg, 0.0) {
        Ok(result) => result,
        Err(e) => {
            error!(component = e.component(), "{e}");
            return match e.kind() {
                ErrorKind::MalformedInput => ExitCode::from(2),
                ErrorKind::ConfigurationInvalid => ExitCode::from(4),
                ErrorKind::InsufficientSamples => ExitCode::from(2),
            };
        }
    };

    if let Err(e) = export::write_json(&result, &cli.out) {
        error!(component = e.component(), "{e}");
        return ExitCode::from(3);
    }

    info!(out = %cli.out.display(), "wrote analysis result");
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();
    run(Cli::parse())
}
