//! CSV Decoder (§4.2): tokenises a logger file, extracts the metadata
//! block, finds the header row, and parses the numeric data rows.

use crate::channels::ALL_CHANNELS;
use crate::error::CoreError;

const RESERVED_METADATA_KEYS: &[&str] = &[
    "format",
    "venue",
    "vehicle",
    "user",
    "driver",
    "data source",
    "comment",
    "date",
    "sample rate",
    "duration",
    "segment",
    "beacon markers",
    "segment times",
    "session",
];

const UNIT_TOKENS: &[&str] = &["sec", "km", "km/h", "rpm", "g", "m/s", "m", "%", "°c"];

#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub format: Option<String>,
    pub venue: Option<String>,
    pub vehicle: Option<String>,
    pub driver: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub sample_rate_hz: Option<f64>,
    pub duration_s: Option<f64>,
    /// Cumulative seconds at which each lap boundary occurs.
    pub beacon_markers: Vec<f64>,
    /// Either cumulative seconds (if monotone increasing) or raw per-lap
    /// times, per §4.2 step 3.
    pub segment_times: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct DecodedCsv {
    pub metadata: Metadata,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn tokenize(bytes: &[u8]) -> Result<Vec<Vec<String>>, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| CoreError::malformed("csv_decoder", format!("tokenisation failed: {e}")))?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    Ok(rows)
}

fn is_time_or_distance(cell: &str) -> bool {
    let c = cell.trim().to_lowercase();
    c == "time" || c == "distance"
}

fn matches_known_alias(cell: &str) -> bool {
    let c = cell.trim().to_lowercase();
    if c.is_empty() {
        return false;
    }
    for channel in ALL_CHANNELS {
        if channel_aliases(channel).iter().any(|a| c == *a || c.contains(a)) {
            return true;
        }
    }
    false
}

// Mirrors channels::aliases but duplicated here to avoid making that
// function pub(crate) across module boundaries for a single call site.
fn channel_aliases(channel: crate::channels::Channel) -> &'static [&'static str] {
    use crate::channels::Channel::*;
    match channel {
        Time => &["time"],
        EngineRpm => &["rpm", "engine rpm", "engine speed"],
        GpsSpeed => &["gps_speed", "gps speed", "speed"],
        LonAcc => &["gps_lonacc", "lon acc", "longitudinal"],
        LatAcc => &["gps_latacc", "lat acc", "lateral"],
        Distance => &["distance", "dist"],
        Slope => &["slope", "gradient"],
        HeadTemp => &["head temp", "cylinder head"],
        CoolantTemp => &["water temp", "coolant"],
        ExhaustTemp => &["exhaust temp", "egt"],
        Lambda => &["lambda", "afr"],
        Throttle => &["throttle", "tps"],
        LapIndex => &["lap", "lap index"],
        BrakePressure => &["brake", "brake pressure"],
    }
}

fn is_reserved_metadata_key(cell: &str) -> bool {
    let c = cell.trim().to_lowercase();
    RESERVED_METADATA_KEYS.contains(&c.as_str())
}

fn is_header_row(row: &[String]) -> bool {
    let non_empty = row.iter().filter(|c| !c.trim().is_empty()).count();
    if non_empty < 3 {
        return false;
    }
    let first = row.first().map(|s| s.as_str()).unwrap_or("");
    if is_reserved_metadata_key(first) {
        return false;
    }
    if is_time_or_distance(first) {
        return true;
    }
    let alias_matches = row.iter().filter(|c| matches_known_alias(c)).count();
    alias_matches >= 3
}

fn is_unit_row(row: &[String]) -> bool {
    row.iter().any(|c| {
        let c = c.trim().to_lowercase();
        UNIT_TOKENS.contains(&c.as_str())
    })
}

fn is_channel_index_row(row: &[String]) -> bool {
    let mut any_non_empty = false;
    for cell in row {
        let c = cell.trim();
        if c.is_empty() {
            continue;
        }
        any_non_empty = true;
        match c.parse::<i64>() {
            Ok(v) if (0..=20).contains(&v) => {}
            _ => return false,
        }
    }
    any_non_empty
}

fn parse_metadata_row(metadata: &mut Metadata, row: &[String]) {
    if row.is_empty() {
        return;
    }
    let key = row[0].trim().to_lowercase();
    let values: Vec<&str> = row[1..].iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    match key.as_str() {
        "format" => metadata.format = values.first().map(|s| s.to_string()),
        "venue" => metadata.venue = values.first().map(|s| s.to_string()),
        "vehicle" => metadata.vehicle = values.first().map(|s| s.to_string()),
        "driver" | "user" => metadata.driver = values.first().map(|s| s.to_string()),
        "date" => metadata.date = values.first().map(|s| s.to_string()),
        "time" => metadata.time = values.first().map(|s| s.to_string()),
        "sample rate" => metadata.sample_rate_hz = values.first().and_then(|s| s.parse().ok()),
        "duration" => metadata.duration_s = values.first().and_then(|s| s.parse().ok()),
        "beacon markers" => {
            metadata.beacon_markers = values.iter().filter_map(|s| s.parse::<f64>().ok()).collect();
        }
        "segment times" | "segment" => {
            metadata.segment_times = values
                .iter()
                .filter_map(|s| parse_segment_time(s))
                .collect();
        }
        _ => {}
    }
}

/// Segment times may be either cumulative seconds or `mm:ss.xxx`.
fn parse_segment_time(s: &str) -> Option<f64> {
    if let Ok(v) = s.parse::<f64>() {
        return Some(v);
    }
    let (mins, rest) = s.split_once(':')?;
    let mins: f64 = mins.parse().ok()?;
    let secs: f64 = rest.parse().ok()?;
    Some(mins * 60.0 + secs)
}

fn is_monotone_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[1] >= w[0])
}

impl Metadata {
    /// Resolves the raw `segment_times` field into cumulative seconds,
    /// per §4.2 step 3: "if segment times are monotone-increasing they are
    /// already cumulative, else convert individual lap times to cumulative
    /// by prefix sum."
    pub fn cumulative_segment_times(&self) -> Vec<f64> {
        if self.segment_times.is_empty() {
            return Vec::new();
        }
        if is_monotone_increasing(&self.segment_times) {
            self.segment_times.clone()
        } else {
            let mut acc = 0.0;
            self.segment_times
                .iter()
                .map(|t| {
                    acc += t;
                    acc
                })
                .collect()
        }
    }
}

fn is_data_row(row: &[String], header_len: usize) -> bool {
    let Some(first) = row.first() else { return false };
    let parses = first.trim().parse::<f64>().map(|v| v.is_finite()).unwrap_or(false);
    if !parses {
        return false;
    }
    row.len() >= header_len.min(3)
}

/// Decodes logger CSV bytes into metadata, header row, and data rows.
/// Fails with `malformed-input` if no header row or no data rows are found.
pub fn decode(bytes: &[u8]) -> Result<DecodedCsv, CoreError> {
    let rows = tokenize(bytes)?;

    let scan_limit = rows.len().min(30);
    let mut header_idx = None;
    for (idx, row) in rows.iter().enumerate().take(scan_limit) {
        if is_header_row(row) {
            header_idx = Some(idx);
            break;
        }
    }
    let Some(header_idx) = header_idx else {
        return Err(CoreError::malformed("csv_decoder", "no header row found in first 30 rows"));
    };

    let mut metadata = Metadata::default();
    for row in &rows[..header_idx] {
        parse_metadata_row(&mut metadata, row);
    }

    let headers = rows[header_idx].clone();

    let mut idx = header_idx + 1;
    while idx < rows.len() {
        let row = &rows[idx];
        if row == &headers || is_unit_row(row) || is_channel_index_row(row) {
            idx += 1;
            continue;
        }
        break;
    }

    let mut data_rows = Vec::new();
    for row in &rows[idx..] {
        if is_data_row(row, headers.len()) {
            data_rows.push(row.clone());
        }
    }

    if data_rows.is_empty() {
        return Err(CoreError::malformed("csv_decoder", "no data rows found"));
    }

    Ok(DecodedCsv { metadata, headers, rows: data_rows })
}
