//! RPM Binner + Smoother (§4.7): groups accepted logger samples into
//! 100-rpm bins, averages, smooths, and computes summary statistics.

use crate::logger_power::SamplePoint;
use crate::smoothing::smooth_rpm_curve;

const BIN_WIDTH_RPM: f64 = 100.0;

#[derive(Debug, Clone, Copy)]
pub struct RpmBin {
    pub bin_centre_rpm: f64,
    pub mean_wheel_speed_kmh: f64,
    pub mean_power_cv: f64,
    pub mean_torque_nm: f64,
    pub mean_head_temp_c: f64,
    pub mean_coolant_temp_c: f64,
    pub mean_exhaust_temp_c: f64,
    pub mean_lambda: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RpmStatistics {
    pub peak_power_cv: f64,
    pub peak_power_rpm: f64,
    pub peak_torque_nm: f64,
    pub peak_torque_rpm: f64,
    pub mean_power_cv: f64,
    pub mean_torque_nm: f64,
    pub rpm_min: f64,
    pub rpm_max: f64,
    pub total_accepted_samples: usize,
}

fn mean_excluding_non_positive(values: &[f64]) -> f64 {
    let positive: Vec<f64> = values.iter().copied().filter(|&v| v > 0.0).collect();
    if positive.is_empty() {
        0.0
    } else {
        positive.iter().sum::<f64>() / positive.len() as f64
    }
}

/// Bins accepted samples by RPM, drops empty/non-positive-power bins, and
/// applies the Savitzky–Golay ladder to the power/torque curves.
pub fn bin_and_smooth(samples: &[SamplePoint], filter_level: f64) -> (Vec<RpmBin>, RpmStatistics) {
    use std::collections::BTreeMap;

    let mut buckets: BTreeMap<i64, Vec<&SamplePoint>> = BTreeMap::new();
    for sample in samples {
        let bin = (sample.engine_rpm / BIN_WIDTH_RPM).floor() as i64 * BIN_WIDTH_RPM as i64;
        buckets.entry(bin).or_default().push(sample);
    }

    let mut bins: Vec<RpmBin> = Vec::new();
    for (bin, members) in buckets {
        if members.is_empty() {
            continue;
        }
        let mean_power: f64 = members.iter().map(|s| s.wheel_power_cv).sum::<f64>() / members.len() as f64;
        if mean_power <= 0.0 {
            continue;
        }
        let mean_speed: f64 = members.iter().map(|s| s.wheel_speed_kmh).sum::<f64>() / members.len() as f64;
        let mean_torque: f64 = members.iter().map(|s| s.wheel_torque_nm).sum::<f64>() / members.len() as f64;
        let head_temps: Vec<f64> = members.iter().map(|s| s.head_temp_c).collect();
        let coolant_temps: Vec<f64> = members.iter().map(|s| s.coolant_temp_c).collect();
        let exhaust_temps: Vec<f64> = members.iter().map(|s| s.exhaust_temp_c).collect();
        let lambdas: Vec<f64> = members.iter().map(|s| s.lambda).collect();

        bins.push(RpmBin {
            bin_centre_rpm: bin as f64 + 50.0,
            mean_wheel_speed_kmh: mean_speed,
            mean_power_cv: mean_power,
            mean_torque_nm: mean_torque,
            mean_head_temp_c: mean_excluding_non_positive(&head_temps),
            mean_coolant_temp_c: mean_excluding_non_positive(&coolant_temps),
            mean_exhaust_temp_c: mean_excluding_non_positive(&exhaust_temps),
            mean_lambda: mean_excluding_non_positive(&lambdas),
            sample_count: members.len(),
        });
    }

    bins.sort_by(|a, b| a.bin_centre_rpm.partial_cmp(&b.bin_centre_rpm).unwrap());

    let powers: Vec<f64> = bins.iter().map(|b| b.mean_power_cv).collect();
    let torques: Vec<f64> = bins.iter().map(|b| b.mean_torque_nm).collect();
    let smoothed_powers = smooth_rpm_curve(&powers, filter_level);
    let smoothed_torques = smooth_rpm_curve(&torques, filter_level);
    for (i, bin) in bins.iter_mut().enumerate() {
        bin.mean_power_cv = smoothed_powers[i];
        bin.mean_torque_nm = smoothed_torques[i];
    }

    let stats = compute_statistics(&bins);
    (bins, stats)
}

fn compute_statistics(bins: &[RpmBin]) -> RpmStatistics {
    let mut stats = RpmStatistics::default();
    if bins.is_empty() {
        return stats;
    }

    let mut peak_power = f64::MIN;
    let mut peak_power_rpm = 0.0;
    let mut peak_torque = f64::MIN;
    let mut peak_torque_rpm = 0.0;
    let mut power_sum = 0.0;
    let mut torque_sum = 0.0;
    let mut total_samples = 0usize;

    for bin in bins {
        if bin.mean_power_cv > peak_power {
            peak_power = bin.mean_power_cv;
            peak_power_rpm = bin.bin_centre_rpm;
        }
        if bin.mean_torque_nm > peak_torque {
            peak_torque = bin.mean_torque_nm;
            peak_torque_rpm = bin.bin_centre_rpm;
        }
        power_sum += bin.mean_power_cv;
        torque_sum += bin.mean_torque_nm;
        total_samples += bin.sample_count;
    }

    stats.peak_power_cv = peak_power;
    stats.peak_power_rpm = peak_power_rpm;
    stats.peak_torque_nm = peak_torque;
    stats.peak_torque_rpm = peak_torque_rpm;
    stats.mean_power_cv = power_sum / bins.len() as f64;
    stats.mean_torque_nm = torque_sum / bins.len() as f64;
    stats.rpm_min = bins.first().unwrap().bin_centre_rpm;
    stats.rpm_max = bins.last().unwrap().bin_centre_rpm;
    stats.total_accepted_samples = total_samples;
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(rpm: f64, power: f64, torque: f64) -> SamplePoint {
        SamplePoint {
            engine_rpm: rpm,
            wheel_speed_kmh: 50.0,
            wheel_power_cv: power,
            wheel_torque_nm: torque,
            gear: 1,
            head_temp_c: 0.0,
            coolant_temp_c: 0.0,
            exhaust_temp_c: 0.0,
            lambda: 0.0,
            lap_index: 0,
            sample_index: 0,
        }
    }

    #[test]
    fn idempotent_smoothing_at_zero_filter_level() {
        let samples = vec![sample(9050.0, 10.0, 5.0), sample(9060.0, 12.0, 6.0), sample(10050.0, 15.0, 7.0)];
        let (bins, _) = bin_and_smooth(&samples, 0.0);
        assert_eq!(bins.len(), 2);
        assert!((bins[0].mean_power_cv - 11.0).abs() < 1e-9);
    }

    #[test]
    fn bin_centres_are_fifty_mod_hundred() {
        let samples = vec![sample(9050.0, 10.0, 5.0), sample(10050.0, 11.0, 6.0)];
        let (bins, _) = bin_and_smooth(&samples, 0.0);
        for bin in &bins {
            let n = (bin.bin_centre_rpm - 50.0) / 100.0;
            assert!((n - n.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn sample_count_sum_matches_input() {
        let samples = vec![sample(9050.0, 10.0, 5.0), sample(9060.0, 11.0, 6.0), sample(10050.0, 12.0, 6.0)];
        let (_, stats) = bin_and_smooth(&samples, 0.0);
        assert_eq!(stats.total_accepted_samples, 3);
    }
}
