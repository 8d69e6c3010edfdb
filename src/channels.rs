//! Channel Resolver (§4.1): maps ambiguous logger column headers onto a
//! fixed set of semantic channels.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    Time,
    EngineRpm,
    GpsSpeed,
    LonAcc,
    LatAcc,
    Distance,
    Slope,
    HeadTemp,
    CoolantTemp,
    ExhaustTemp,
    Lambda,
    Throttle,
    LapIndex,
    BrakePressure,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Every semantic channel in canonical-alias-list order. Tie-breaks in
/// §4.1 ("earliest channel in the canonical list order") refer to this
/// ordering.
pub const ALL_CHANNELS: [Channel; 14] = [
    Channel::Time,
    Channel::EngineRpm,
    Channel::GpsSpeed,
    Channel::LonAcc,
    Channel::LatAcc,
    Channel::Distance,
    Channel::Slope,
    Channel::HeadTemp,
    Channel::CoolantTemp,
    Channel::ExhaustTemp,
    Channel::Lambda,
    Channel::Throttle,
    Channel::LapIndex,
    Channel::BrakePressure,
];

fn aliases(channel: Channel) -> &'static [&'static str] {
    match channel {
        Channel::Time => &["time", "time (s)"],
        Channel::EngineRpm => &["rpm", "engine rpm", "engine speed", "enginerpm"],
        Channel::GpsSpeed => &["gps_speed", "gps speed", "speed", "ground speed", "vehicle speed"],
        Channel::LonAcc => &["gps_lonacc", "lon acc", "longitudinal", "long acc", "accx", "acc_x"],
        Channel::LatAcc => &["gps_latacc", "lat acc", "lateral", "accy", "acc_y"],
        Channel::Distance => &["distance", "dist"],
        Channel::Slope => &["slope", "gradient", "incline"],
        Channel::HeadTemp => &["head temp", "cylinder head", "head_temp"],
        Channel::CoolantTemp => &["water temp", "coolant", "coolant_temp"],
        Channel::ExhaustTemp => &["exhaust temp", "egt", "exhaust_temp"],
        Channel::Lambda => &["lambda", "afr", "air fuel ratio"],
        Channel::Throttle => &["throttle", "tps"],
        Channel::LapIndex => &["lap", "lap index", "lap_number", "lapnumber"],
        Channel::BrakePressure => &["brake", "brake pressure", "brake_press"],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStatus {
    AutoMatched,
    ManuallySet,
    Unmatched,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChannelMapping {
    pub header: Option<String>,
    pub status: MatchStatus,
    pub multiplier: f64,
}

impl Default for ChannelMapping {
    fn default() -> Self {
        Self { header: None, status: MatchStatus::Unmatched, multiplier: 1.0 }
    }
}

/// A complete resolution of raw headers to the 14 semantic channels.
#[derive(Debug, Clone, Default)]
pub struct ChannelMap {
    mapping: std::collections::HashMap<Channel, ChannelMapping>,
}

impl ChannelMap {
    pub fn get(&self, channel: Channel) -> &ChannelMapping {
        static EMPTY: std::sync::OnceLock<ChannelMapping> = std::sync::OnceLock::new();
        self.mapping
            .get(&channel)
            .unwrap_or_else(|| EMPTY.get_or_init(ChannelMapping::default))
    }

    /// Overrides a channel to point at an explicit header, status
    /// `manually-set` (§4.1: "users may override").
    pub fn set_manual(&mut self, channel: Channel, header: impl Into<String>, multiplier: f64) {
        self.mapping.insert(channel, ChannelMapping { header: Some(header.into()), status: MatchStatus::ManuallySet, multiplier });
    }
}

fn normalize(header: &str) -> String {
    header.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_lowercase()
}

fn looks_like_time_pattern(s: &str) -> bool {
    let mut saw_colon = false;
    let mut digits_before = false;
    let mut digits_after = false;
    for c in s.chars() {
        if c == ':' {
            if saw_colon {
                return false;
            }
            saw_colon = true;
        } else if c.is_ascii_digit() {
            if saw_colon {
                digits_after = true;
            } else {
                digits_before = true;
            }
        } else {
            return false;
        }
    }
    saw_colon && digits_before && digits_after
}

/// Resolves raw header strings to semantic channels. Never raises; headers
/// that match nothing remain `unmatched`.
pub fn resolve(headers: &[String]) -> ChannelMap {
    let mut map = ChannelMap::default();
    let normalized: Vec<String> = headers.iter().map(|h| normalize(h)).collect();

    for &channel in ALL_CHANNELS.iter() {
        if map.mapping.contains_key(&channel) {
            continue;
        }
        let mut best: Option<usize> = None;
        for (idx, header) in normalized.iter().enumerate() {
            if header.is_empty() || looks_like_time_pattern(header) {
                continue;
            }
            let matched_already = map.mapping.values().any(|m| m.header.as_deref() == Some(headers[idx].as_str()));
            if matched_already {
                continue;
            }
            if aliases(channel).iter().any(|alias| header == alias || header.contains(alias)) {
                best = Some(idx);
                break;
            }
        }
        if let Some(idx) = best {
            map.mapping.insert(
                channel,
                ChannelMapping { header: Some(headers[idx].clone()), status: MatchStatus::AutoMatched, multiplier: 1.0 },
            );
        }
    }
    map
}
