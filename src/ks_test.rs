//! Two-sample Kolmogorov–Smirnov test, used to compare drawn samples against a
//! reference generator.
//!
//! The p-value follows the asymptotic Kolmogorov distribution with the
//! effective sample size `n·m / (n + m)`, evaluated with the series from
//! *Numerical Recipes* (third edition).

use std::cmp::Ordering;

use thiserror::Error;

/// Why a KS test could not be carried out.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KsError {
    #[error("sample {0} is empty")]
    EmptySample(usize),
    #[error("the asymptotic p-value needs more than 7 values per sample, got {0} and {1}")]
    SampleTooSmall(usize, usize),
    #[error("KS distribution is undefined at z = {0}")]
    BadArgument(f64),
}

/// Outcome of [`two_sample_ks_test`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    /// True if the samples are judged to come from different distributions.
    pub is_rejected: bool,
    /// Largest distance between the two empirical CDFs.
    pub statistic: f64,
    pub p_value: f64,
    pub level: f64,
}

/// Tests whether `sample_1` and `sample_2` come from the same continuous
/// distribution, rejecting at significance `level`.
pub fn two_sample_ks_test(
    sample_1: &[f64],
    sample_2: &[f64],
    level: f64,
) -> Result<KsResult, KsError> {
    let statistic = ks_statistic(sample_1, sample_2)?;
    let (n, m) = (sample_1.len(), sample_2.len());
    if n <= 7 || m <= 7 {
        return Err(KsError::SampleTooSmall(n, m));
    }
    let effective = ((n * m) as f64 / (n + m) as f64).sqrt();
    let p_value = qks(effective * statistic)?.clamp(0.0, 1.0);
    Ok(KsResult {
        is_rejected: p_value < level,
        statistic,
        p_value,
        level,
    })
}

/// `sup_x |F_1(x) - F_2(x)|` over the empirical CDFs of both samples.
pub fn ks_statistic(sample_1: &[f64], sample_2: &[f64]) -> Result<f64, KsError> {
    if sample_1.is_empty() {
        return Err(KsError::EmptySample(1));
    }
    if sample_2.is_empty() {
        return Err(KsError::EmptySample(2));
    }
    let a = sorted(sample_1);
    let b = sorted(sample_2);
    let (n, m) = (a.len() as f64, b.len() as f64);

    let (mut i, mut j) = (0, 0);
    let mut max_diff: f64 = 0.0;
    while i < a.len() && j < b.len() {
        // Step past every copy of the smallest pending value in both samples
        // before comparing, so ties never open a spurious gap.
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        max_diff = max_diff.max((i as f64 / n - j as f64 / m).abs());
    }
    Ok(max_diff)
}

fn sorted(sample: &[f64]) -> Vec<f64> {
    let mut v = sample.to_vec();
    v.sort_unstable_by(cmp_f64);
    v
}

/// CDF of the Kolmogorov distribution.
fn pks(z: f64) -> Result<f64, KsError> {
    if z < 0.0 || z.is_nan() {
        return Err(KsError::BadArgument(z));
    }
    if z == 0.0 {
        return Ok(0.0);
    }
    if z < 1.18 {
        let y = (-1.233_700_550_136_169_7 / z.powi(2)).exp();
        return Ok(2.256_758_334_191_025
            * (-y.ln()).sqrt()
            * (y + y.powi(9) + y.powi(25) + y.powi(49)));
    }
    let x = (-2.0 * z.powi(2)).exp();
    Ok(1.0 - 2.0 * (x - x.powi(4) + x.powi(9)))
}

/// Complementary CDF of the Kolmogorov distribution.
fn qks(z: f64) -> Result<f64, KsError> {
    if z < 0.0 || z.is_nan() {
        return Err(KsError::BadArgument(z));
    }
    if z == 0.0 {
        return Ok(1.0);
    }
    if z < 1.18 {
        return Ok(1.0 - pks(z)?);
    }
    let x = (-2.0 * z.powi(2)).exp();
    Ok(2.0 * (x - x.powi(4) + x.powi(9)))
}

/// Total order on `f64` placing NaN after every other value.
fn cmp_f64(a: &f64, b: &f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_statistic_partial_overlap() {
        let d = ks_statistic(&[1.0, 2.0, 3.0], &[2.0, 3.0, 4.0]).unwrap();
        assert_abs_diff_eq!(d, 1.0 / 3.0, epsilon = 1e-12);
        let d = ks_statistic(&[0.0, 1.0, 2.0, 3.0], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_abs_diff_eq!(d, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_statistic_extremes() {
        assert_eq!(ks_statistic(&[3.0, 1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap(), 0.0);
        assert_eq!(ks_statistic(&[1.0, 2.0], &[10.0, 11.0]).unwrap(), 1.0);
        assert_eq!(ks_statistic(&[2.0], &[5.0]).unwrap(), 1.0);
    }

    #[test]
    fn test_statistic_with_ties() {
        let d = ks_statistic(&[1.0, 1.0, 1.0, 2.0, 2.0], &[1.0, 1.0, 2.0, 2.0, 2.0]).unwrap();
        assert_abs_diff_eq!(d, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_samples_rejected() {
        assert_eq!(ks_statistic(&[], &[1.0]), Err(KsError::EmptySample(1)));
        assert_eq!(ks_statistic(&[1.0], &[]), Err(KsError::EmptySample(2)));
    }

    #[test]
    fn test_small_samples_rejected() {
        let res = two_sample_ks_test(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 0.05);
        assert_eq!(res, Err(KsError::SampleTooSmall(3, 3)));
    }

    #[test]
    fn test_p_value_of_repeated_pattern() {
        let base = [0.12, 0.25, 0.25, 0.78, 0.99, 0.33, 0.15];
        let s1: Vec<f64> = base.iter().chain(&[0.5]).cycle().take(160).copied().collect();
        let s2: Vec<f64> = base.iter().chain(&[0.51]).cycle().take(160).copied().collect();
        let result = two_sample_ks_test(&s1, &s2, 0.05).unwrap();
        assert_abs_diff_eq!(result.statistic, 0.125, epsilon = 1e-9);
        assert_abs_diff_eq!(result.p_value, 0.1641, epsilon = 1e-4);
        assert!(!result.is_rejected);
    }

    #[test]
    fn test_kolmogorov_cdf_values() {
        assert_eq!(pks(0.0).unwrap(), 0.0);
        assert_eq!(qks(0.0).unwrap(), 1.0);
        assert_abs_diff_eq!(pks(1.23).unwrap(), 0.9029731024047791, epsilon = 1e-8);
        assert_abs_diff_eq!(pks(2.34).unwrap(), 0.9999649260833611, epsilon = 1e-8);
        assert_abs_diff_eq!(pks(3.45).unwrap(), 1.0, epsilon = 1e-8);
        assert!(pks(-1.0).is_err());
    }

    #[test]
    fn test_nan_sorts_last() {
        let mut s = [f64::NAN, 2.0, 1.0, f64::NAN];
        s.sort_by(cmp_f64);
        assert!(s[0] == 1.0 && s[1] == 2.0 && s[2].is_nan() && s[3].is_nan());
    }
}
