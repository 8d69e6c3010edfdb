//! Kart telemetry measurement-to-curve core.
//!
//! Ingests logger CSV or raw sensor samples from a kart, reconstructs
//! wheel-power and wheel-torque curves, and produces per-lap telemetry
//! traces. Every component below is a pure function over its inputs except
//! the calibration engine, which is a tiny explicit state machine. The core
//! performs no I/O and never logs; that is left to the binaries in `bin/`.

pub mod binning;
pub mod calibration;
pub mod channels;
pub mod config;
pub mod csv_decoder;
pub mod environment;
pub mod error;
pub mod export;
pub mod gear;
pub mod laps;
pub mod logger_power;
pub mod pipeline;
pub mod result;
pub mod sensor_power;
pub mod smoothing;
pub mod telemetry;

pub use error::{CoreError, ErrorKind};
