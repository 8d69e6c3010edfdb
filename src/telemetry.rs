//! Materialises a `ChannelMap` plus decoded CSV rows into dense,
//! equal-length numeric arrays (§3 "Telemetry channel set").

use crate::channels::{Channel, ChannelMap};
use crate::csv_decoder::DecodedCsv;
use crate::error::CoreError;

#[derive(Debug, Clone, Default)]
pub struct TelemetryChannels {
    pub time: Vec<f64>,
    pub engine_rpm: Vec<f64>,
    pub gps_speed_kmh: Vec<f64>,
    pub lon_acc_g: Vec<f64>,
    pub lat_acc_g: Option<Vec<f64>>,
    pub distance: Option<Vec<f64>>,
    pub slope: Option<Vec<f64>>,
    pub head_temp: Option<Vec<f64>>,
    pub coolant_temp: Option<Vec<f64>>,
    pub exhaust_temp: Option<Vec<f64>>,
    pub lambda: Option<Vec<f64>>,
    pub throttle: Option<Vec<f64>>,
    pub lap_index: Option<Vec<f64>>,
}

impl TelemetryChannels {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

fn header_index(headers: &[String], header: &str) -> Option<usize> {
    headers.iter().position(|h| h == header)
}

fn extract(decoded: &DecodedCsv, map: &ChannelMap, channel: Channel) -> Option<Vec<f64>> {
    let mapping = map.get(channel);
    let header = mapping.header.as_deref()?;
    let idx = header_index(&decoded.headers, header)?;
    let multiplier = mapping.multiplier;
    Some(
        decoded
            .rows
            .iter()
            .map(|row| row.get(idx).and_then(|c| c.trim().parse::<f64>().ok()).unwrap_or(0.0) * multiplier)
            .collect(),
    )
}

/// Builds the dense telemetry arrays from decoded CSV rows and a channel
/// mapping. Required channels missing a matched header is a
/// `malformed-input` condition, since the decoder contract (§3) requires
/// `time`, `engine speed`, `GPS speed`, and `longitudinal acceleration`.
pub fn materialize(decoded: &DecodedCsv, map: &ChannelMap) -> Result<TelemetryChannels, CoreError> {
    let time = extract(decoded, map, Channel::Time)
        .ok_or_else(|| CoreError::malformed("telemetry", "time channel unmatched"))?;
    let engine_rpm = extract(decoded, map, Channel::EngineRpm)
        .ok_or_else(|| CoreError::malformed("telemetry", "engine rpm channel unmatched"))?;
    let gps_speed_kmh = extract(decoded, map, Channel::GpsSpeed)
        .ok_or_else(|| CoreError::malformed("telemetry", "gps speed channel unmatched"))?;
    let lon_acc_g = extract(decoded, map, Channel::LonAcc)
        .ok_or_else(|| CoreError::malformed("telemetry", "longitudinal acceleration channel unmatched"))?;

    Ok(TelemetryChannels {
        time,
        engine_rpm,
        gps_speed_kmh,
        lon_acc_g,
        lat_acc_g: extract(decoded, map, Channel::LatAcc),
        distance: extract(decoded, map, Channel::Distance),
        slope: extract(decoded, map, Channel::Slope),
        head_temp: extract(decoded, map, Channel::HeadTemp),
        coolant_temp: extract(decoded, map, Channel::CoolantTemp),
        exhaust_temp: extract(decoded, map, Channel::ExhaustTemp),
        lambda: extract(decoded, map, Channel::Lambda),
        throttle: extract(decoded, map, Channel::Throttle),
        lap_index: extract(decoded, map, Channel::LapIndex),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::resolve;
    use crate::csv_decoder::decode;

    #[test]
    fn materializes_required_channels() {
        let csv = "Time,RPM,GPS_Speed,GPS_LonAcc\n0.0,9000,30,2.0\n0.1,9100,31,2.1\n";
        let decoded = decode(csv.as_bytes()).unwrap();
        let map = resolve(&decoded.headers);
        let telemetry = materialize(&decoded, &map).unwrap();
        assert_eq!(telemetry.len(), 2);
        assert_eq!(telemetry.engine_rpm, vec![9000.0, 9100.0]);
    }
}
