//! Statistics engine.
//!
//! Reduces a sequence of sample durations (milliseconds) into a
//! [`TaskResult`]. Everything here is pure: no clock, no state, no I/O.
//!
//! - Variance uses Bessel's correction (`n - 1` divisor).
//! - The margin of error is a 95% two-tailed Student t interval.
//! - Percentiles interpolate linearly between ranks of a sorted copy, so
//!   the stored sample order is never touched.
//! - An empty sequence yields an all-zero result instead of `NaN`.

use serde::{Deserialize, Serialize};

/// Two-tailed 95% critical values of Student's t distribution for
/// 1..=30 degrees of freedom.
const T_TABLE_95: [f64; 30] = [
    12.706, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, // 1-10
    2.201, 2.179, 2.160, 2.145, 2.131, 2.120, 2.110, 2.101, 2.093, 2.086, // 11-20
    2.080, 2.074, 2.069, 2.064, 2.060, 2.056, 2.052, 2.048, 2.045, 2.042, // 21-30
];

/// Normal approximation used past the end of the t table.
pub const Z_95: f64 = 1.96;

/// Statistics for one completed task.
///
/// All durations are in milliseconds.
///
/// # Example
///
/// ```
/// use taskbench::compute_result;
///
/// let result = compute_result(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
/// assert_eq!(result.mean, 5.0);
/// assert_eq!(result.df, 7);
/// assert_eq!(result.hz, 200.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Every measured duration, in invocation order.
    pub samples: Vec<f64>,
    /// Sum of all samples.
    pub total_time: f64,
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
    /// Arithmetic mean (estimate of the population mean).
    pub mean: f64,
    /// Sample variance with Bessel's correction.
    pub variance: f64,
    /// Sample standard deviation.
    pub sd: f64,
    /// Standard error of the mean.
    pub sem: f64,
    /// Degrees of freedom (`n - 1`).
    pub df: u64,
    /// Two-tailed 95% critical value for `df`.
    pub critical: f64,
    /// Margin of error (`critical * sem`).
    pub moe: f64,
    /// Relative margin of error, in percent of the mean.
    pub rme: f64,
    /// 75th percentile.
    pub p75: f64,
    /// 99th percentile.
    pub p99: f64,
    /// 99.5th percentile.
    pub p995: f64,
    /// 99.9th percentile.
    pub p999: f64,
    /// Duration of one invocation (equal to `mean`).
    pub period: f64,
    /// Invocations per second.
    pub hz: f64,
}

impl TaskResult {
    /// Number of samples the result was computed from.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

/// Two-tailed 95% critical value for `df` degrees of freedom.
///
/// Uses the t table for `1..=30` and falls back to [`Z_95`] otherwise
/// (including `df == 0`, where the standard error is zero anyway).
///
/// ```
/// use taskbench::stats::critical_value;
///
/// assert_eq!(critical_value(1), 12.706);
/// assert_eq!(critical_value(30), 2.042);
/// assert_eq!(critical_value(1_000), 1.96);
/// ```
pub fn critical_value(df: u64) -> f64 {
    match df {
        1..=30 => T_TABLE_95[(df - 1) as usize],
        _ => Z_95,
    }
}

/// Linear-interpolated percentile of an ascending-sorted slice.
///
/// `percentile` is in percent (`99.9` for p999). Returns `0.0` for an
/// empty slice.
///
/// ```
/// use taskbench::stats::percentile;
///
/// let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(percentile(&sorted, 50.0), 3.0);
/// assert_eq!(percentile(&sorted, 75.0), 4.0);
/// ```
pub fn percentile(sorted: &[f64], percentile: f64) -> f64 {
    match sorted {
        [] => 0.0,
        [only] => *only,
        _ => {
            let n = sorted.len();
            let p = (percentile / 100.0).clamp(0.0, 1.0);

            let rank = p * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            let fraction = rank - lower as f64;

            sorted[lower] + fraction * (sorted[upper] - sorted[lower])
        }
    }
}

/// Reduces `samples` into a [`TaskResult`].
///
/// Deterministic and side-effect free. `samples` is cloned into the result
/// unchanged; sorting happens on a separate copy.
pub fn compute_result(samples: &[f64]) -> TaskResult {
    let n = samples.len();
    if n == 0 {
        return TaskResult {
            samples: Vec::new(),
            total_time: 0.0,
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            variance: 0.0,
            sd: 0.0,
            sem: 0.0,
            df: 0,
            critical: Z_95,
            moe: 0.0,
            rme: 0.0,
            p75: 0.0,
            p99: 0.0,
            p995: 0.0,
            p999: 0.0,
            period: 0.0,
            hz: 0.0,
        };
    }

    let total_time: f64 = samples.iter().sum();
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // Rounding in the sum can push the quotient one ulp past the extrema.
    let mean = (total_time / n as f64).max(min).min(max);

    let variance = if n > 1 {
        samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        0.0
    };
    let sd = variance.sqrt();
    let sem = sd / (n as f64).sqrt();
    let df = (n - 1) as u64;
    let critical = critical_value(df);
    let moe = critical * sem;
    let rme = if mean == 0.0 { 0.0 } else { moe / mean * 100.0 };

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let period = mean;
    let hz = if period > 0.0 { 1_000.0 / period } else { 0.0 };

    TaskResult {
        samples: samples.to_vec(),
        total_time,
        min,
        max,
        mean,
        variance,
        sd,
        sem,
        df,
        critical,
        moe,
        rme,
        p75: percentile(&sorted, 75.0),
        p99: percentile(&sorted, 99.0),
        p995: percentile(&sorted, 99.5),
        p999: percentile(&sorted, 99.9),
        period,
        hz,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_known_distribution() {
        let result = compute_result(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);

        assert!(close(result.mean, 5.0));
        assert!(close(result.variance, 32.0 / 7.0));
        assert!(close(result.sd, (32.0f64 / 7.0).sqrt()));
        assert!(close(result.sem, result.sd / 8.0f64.sqrt()));
        assert_eq!(result.df, 7);
        assert_eq!(result.critical, 2.365);
        assert!(close(result.moe, 2.365 * result.sem));
        assert!(close(result.rme, result.moe / 5.0 * 100.0));
        assert_eq!(result.min, 2.0);
        assert_eq!(result.max, 9.0);
        assert!(close(result.total_time, 40.0));
        assert!(close(result.p75, 5.5));
        assert!(close(result.hz, 200.0));
        assert!(close(result.period, 5.0));
    }

    #[test]
    fn test_variance_matches_two_pass_reference() {
        let samples: Vec<f64> = (0..257).map(|i| ((i * 37) % 101) as f64 * 0.013 + 0.5).collect();
        let result = compute_result(&samples);

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let mut m2 = 0.0;
        for x in &samples {
            m2 += (x - mean) * (x - mean);
        }
        let reference = m2 / (n - 1.0);

        assert!((result.variance - reference).abs() < 1e-12);
        assert_eq!(result.critical, Z_95);
    }

    #[test]
    fn test_empty_samples() {
        let result = compute_result(&[]);

        assert!(result.samples.is_empty());
        assert_eq!(result.mean, 0.0);
        assert_eq!(result.variance, 0.0);
        assert_eq!(result.sem, 0.0);
        assert_eq!(result.df, 0);
        assert_eq!(result.moe, 0.0);
        assert_eq!(result.rme, 0.0);
        assert_eq!(result.min, 0.0);
        assert_eq!(result.max, 0.0);
        assert_eq!(result.hz, 0.0);
        assert!(!result.critical.is_nan());
    }

    #[test]
    fn test_single_sample() {
        let result = compute_result(&[4.0]);

        assert_eq!(result.mean, 4.0);
        assert_eq!(result.variance, 0.0);
        assert_eq!(result.df, 0);
        assert_eq!(result.moe, 0.0);
        assert_eq!(result.min, 4.0);
        assert_eq!(result.max, 4.0);
        assert_eq!(result.p75, 4.0);
        assert_eq!(result.p999, 4.0);
        assert_eq!(result.hz, 250.0);
    }

    #[test]
    fn test_zero_durations_do_not_divide_by_zero() {
        let result = compute_result(&[0.0, 0.0, 0.0]);
        assert_eq!(result.rme, 0.0);
        assert_eq!(result.hz, 0.0);
    }

    #[test]
    fn test_mean_stays_within_extrema_for_identical_samples() {
        let result = compute_result(&[0.1, 0.1, 0.1]);
        assert!(result.min <= result.mean && result.mean <= result.max);
        assert_eq!(result.mean, 0.1);
        assert_eq!(result.period, 0.1);
        assert_eq!(result.hz, 1_000.0 / 0.1);
    }

    #[test]
    fn test_sample_order_preserved() {
        let samples = [3.0, 1.0, 2.0, 10.0, 0.5];
        let result = compute_result(&samples);

        assert_eq!(result.samples, samples);
        assert_eq!(result.min, 0.5);
        assert_eq!(result.max, 10.0);
    }

    #[test]
    fn test_percentiles_ordered_within_extrema() {
        let samples: Vec<f64> = (1..=1000).rev().map(|x| x as f64 / 7.0).collect();
        let r = compute_result(&samples);

        assert!(r.min <= r.p75);
        assert!(r.p75 <= r.p99);
        assert!(r.p99 <= r.p995);
        assert!(r.p995 <= r.p999);
        assert!(r.p999 <= r.max);
        assert!(r.min <= r.mean && r.mean <= r.max);
    }

    #[test]
    fn test_critical_value_table_edges() {
        assert_eq!(critical_value(0), Z_95);
        assert_eq!(critical_value(1), 12.706);
        assert_eq!(critical_value(2), 4.303);
        assert_eq!(critical_value(30), 2.042);
        assert_eq!(critical_value(31), Z_95);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        assert!(close(percentile(&sorted, 75.0), 75.25));
        assert!(close(percentile(&sorted, 0.0), 1.0));
        assert!(close(percentile(&sorted, 100.0), 100.0));
        assert_eq!(percentile(&[], 50.0), 0.0);
    }
}
