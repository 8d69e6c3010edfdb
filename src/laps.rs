//! Lap Extractor (§4.3): derives per-lap index ranges and lap times from a
//! lap-marker channel, metadata beacons/segment times, or the whole file.

use crate::csv_decoder::Metadata;

const IN_LAP_THRESHOLD_S: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lap {
    pub start: usize,
    pub end: usize,
    pub lap_time_s: f64,
    pub is_out_lap: bool,
    pub is_in_lap: bool,
}

fn first_index_at_or_after(time: &[f64], boundary: f64) -> usize {
    time.iter().position(|&t| t >= boundary).unwrap_or(time.len())
}

fn finish_flags(laps: &mut [Lap]) {
    if let Some(first) = laps.first_mut() {
        first.is_out_lap = true;
    }
    if let Some(last) = laps.last_mut() {
        last.is_in_lap = last.lap_time_s > IN_LAP_THRESHOLD_S;
    }
}

fn laps_from_boundaries(time: &[f64], boundaries: &[f64], explicit_lap_times: Option<&[f64]>) -> Vec<Lap> {
    let mut laps = Vec::with_capacity(boundaries.len());
    let mut prev_boundary = 0.0;
    for (i, &boundary) in boundaries.iter().enumerate() {
        let start = first_index_at_or_after(time, prev_boundary);
        let end = first_index_at_or_after(time, boundary);
        let lap_time = match explicit_lap_times {
            Some(list) if i < list.len() => list[i],
            _ => boundary - prev_boundary,
        };
        laps.push(Lap { start, end, lap_time_s: lap_time, is_out_lap: false, is_in_lap: false });
        prev_boundary = boundary;
    }
    finish_flags(&mut laps);
    laps
}

fn laps_from_lap_channel(time: &[f64], lap_index: &[f64]) -> Vec<Lap> {
    let mut laps = Vec::new();
    if lap_index.is_empty() {
        return laps;
    }
    let mut start = 0usize;
    let mut current = lap_index[0];
    for i in 1..lap_index.len() {
        if lap_index[i] != current {
            let end = i;
            let lap_time = time[end.min(time.len() - 1)] - time[start];
            laps.push(Lap { start, end, lap_time_s: lap_time, is_out_lap: false, is_in_lap: false });
            start = i;
            current = lap_index[i];
        }
    }
    let end = lap_index.len();
    let lap_time = time[end - 1] - time[start];
    laps.push(Lap { start, end, lap_time_s: lap_time, is_out_lap: false, is_in_lap: false });
    finish_flags(&mut laps);
    laps
}

/// Extracts laps. `lap_index` is the optional lap-marker channel.
pub fn extract(time: &[f64], lap_index: Option<&[f64]>, metadata: &Metadata) -> Vec<Lap> {
    if let Some(lap_index) = lap_index {
        if !lap_index.is_empty() {
            return laps_from_lap_channel(time, lap_index);
        }
    }

    if !metadata.beacon_markers.is_empty() {
        return laps_from_boundaries(time, &metadata.beacon_markers, None);
    }

    if !metadata.segment_times.is_empty() {
        let monotone = metadata.segment_times.windows(2).all(|w| w[1] >= w[0]);
        let boundaries = metadata.cumulative_segment_times();
        let explicit = if monotone { None } else { Some(metadata.segment_times.as_slice()) };
        return laps_from_boundaries(time, &boundaries, explicit);
    }

    if time.is_empty() {
        return Vec::new();
    }
    vec![Lap { start: 0, end: time.len(), lap_time_s: time[time.len() - 1] - time[0], is_out_lap: false, is_in_lap: false }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn time_series(duration_s: f64, hz: f64) -> Vec<f64> {
        let n = (duration_s * hz) as usize;
        (0..n).map(|i| i as f64 / hz).collect()
    }

    #[test]
    fn beacon_markers_produce_three_laps_with_expected_times() {
        let time = time_series(200.0, 10.0);
        let metadata = Metadata { beacon_markers: vec![60.0, 125.3, 188.1], ..Default::default() };
        let laps = extract(&time, None, &metadata);
        assert_eq!(laps.len(), 3);
        assert_abs_diff_eq!(laps[0].lap_time_s, 60.0, epsilon = 0.1);
        assert_abs_diff_eq!(laps[1].lap_time_s, 65.3, epsilon = 0.1);
        assert_abs_diff_eq!(laps[2].lap_time_s, 62.8, epsilon = 0.1);
        assert!(laps[0].is_out_lap);
        assert!(!laps[2].is_in_lap);
    }

    #[test]
    fn whole_file_single_lap_when_no_markers() {
        let time = time_series(20.0, 10.0);
        let metadata = Metadata::default();
        let laps = extract(&time, None, &metadata);
        assert_eq!(laps.len(), 1);
        assert!(!laps[0].is_out_lap);
        assert!(!laps[0].is_in_lap);
    }
}
