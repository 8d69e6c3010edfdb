//! Savitzky–Golay smoothing ladder shared by the RPM Binner (§4.7) and the
//! Sensor Power Engine (§4.9).

const SG5: [f64; 5] = [-3.0, 12.0, 17.0, 12.0, -3.0];
const SG5_NORM: f64 = 35.0;
const SG7: [f64; 7] = [-2.0, 3.0, 6.0, 7.0, 6.0, 3.0, -2.0];
const SG7_NORM: f64 = 21.0;
const SG9: [f64; 9] = [-21.0, 14.0, 39.0, 54.0, 59.0, 54.0, 39.0, 14.0, -21.0];
const SG9_NORM: f64 = 231.0;

fn clamp_index(i: isize, n: usize) -> usize {
    i.clamp(0, n as isize - 1) as usize
}

fn convolve(values: &[f64], coeffs: &[f64], norm: f64) -> Vec<f64> {
    let n = values.len();
    if n < 3 {
        return values.to_vec();
    }
    let half = (coeffs.len() / 2) as isize;
    (0..n)
        .map(|i| {
            let mut acc = 0.0;
            for (k, &c) in coeffs.iter().enumerate() {
                let offset = k as isize - half;
                let idx = clamp_index(i as isize + offset, n);
                acc += c * values[idx];
            }
            acc / norm
        })
        .collect()
}

pub fn sg5(values: &[f64]) -> Vec<f64> {
    convolve(values, &SG5, SG5_NORM)
}

pub fn sg7(values: &[f64]) -> Vec<f64> {
    convolve(values, &SG7, SG7_NORM)
}

pub fn sg9(values: &[f64]) -> Vec<f64> {
    convolve(values, &SG9, SG9_NORM)
}

/// Centred moving average, clamp-boundary, matching the SG convolution's
/// boundary policy.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if n < 3 || window < 2 {
        return values.to_vec();
    }
    let half = (window / 2) as isize;
    (0..n)
        .map(|i| {
            let mut acc = 0.0;
            let mut count = 0usize;
            for offset in -half..=half {
                let idx = clamp_index(i as isize + offset, n);
                acc += values[idx];
                count += 1;
            }
            acc / count as f64
        })
        .collect()
}

/// SG ladder for RPM-binned curves (§4.7): L<=0 none; L<=25 SG5; L<=50 SG7;
/// L<=75 SG9; L>75 SG9 then a 5-sample moving average.
pub fn smooth_rpm_curve(values: &[f64], filter_level: f64) -> Vec<f64> {
    if filter_level <= 0.0 {
        return values.to_vec();
    }
    if filter_level <= 25.0 {
        return sg5(values);
    }
    if filter_level <= 50.0 {
        return sg7(values);
    }
    if filter_level <= 75.0 {
        return sg9(values);
    }
    moving_average(&sg9(values), 5)
}

/// SG ladder for speed-binned curves (§4.9): the same ladder as 4.7
/// (including the L>75 moving-average rung), with an extra SG-5 pass on
/// top when the filter level exceeds 80.
pub fn smooth_speed_curve(values: &[f64], filter_level: f64) -> Vec<f64> {
    let base = smooth_rpm_curve(values, filter_level);
    if filter_level > 80.0 {
        sg5(&base)
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn zero_filter_level_is_identity() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(smooth_rpm_curve(&values, 0.0), values);
    }

    #[test]
    fn short_arrays_are_unchanged() {
        let values = vec![1.0, 2.0];
        assert_eq!(sg5(&values), values);
    }

    #[test]
    fn sg5_preserves_constant_signal() {
        let values = vec![4.0; 10];
        let smoothed = sg5(&values);
        for v in smoothed {
            assert_abs_diff_eq!(v, 4.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn sg9_preserves_linear_ramp_away_from_boundary() {
        let values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let smoothed = sg9(&values);
        assert_abs_diff_eq!(smoothed[10], 10.0, epsilon = 1e-6);
    }

    #[test]
    fn speed_curve_matches_rpm_ladder_through_l80() {
        let values: Vec<f64> = (0..20).map(|i| i as f64 * 1.3).collect();
        for level in [10.0, 40.0, 70.0, 80.0] {
            assert_eq!(smooth_speed_curve(&values, level), smooth_rpm_curve(&values, level));
        }
    }

    #[test]
    fn speed_curve_adds_sg5_pass_above_l80() {
        let values: Vec<f64> = (0..20).map(|i| (i as f64 * 0.7).sin() * 10.0).collect();
        let expected = sg5(&smooth_rpm_curve(&values, 90.0));
        assert_eq!(smooth_speed_curve(&values, 90.0), expected);
    }
}
