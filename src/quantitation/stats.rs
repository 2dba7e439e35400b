//! Descriptive statistics that skip non-finite values

/// Minimum and maximum over finite values, `None` if there are none
pub(crate) fn finite_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|x| x.is_finite())
        .fold(None, |acc, x| match acc {
            None => Some((x, x)),
            Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
        })
}

/// Mean over finite values, NaN if there are none
pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .filter(|x| x.is_finite())
        .fold((0.0, 0usize), |(sum, n), x| (sum + x, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Sample variance (n - 1 denominator) around a precomputed mean
pub(crate) fn sample_variance(values: impl IntoIterator<Item = f64>, mean: f64) -> f64 {
    let (ss, n) = values
        .into_iter()
        .filter(|x| x.is_finite())
        .fold((0.0, 0usize), |(ss, n), x| (ss + (x - mean) * (x - mean), n + 1));
    if n < 2 {
        f64::NAN
    } else {
        ss / (n - 1) as f64
    }
}

/// Median over finite values, NaN if there are none
pub(crate) fn median(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut finite: Vec<f64> = values.into_iter().filter(|x| x.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.sort_by(|a, b| a.total_cmp(b));
    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        (finite[mid - 1] + finite[mid]) / 2.0
    } else {
        finite[mid]
    }
}

/// NumPy-style `isclose`: `|a - b| < rtol * |b| + atol`
pub(crate) fn is_close(a: f64, b: f64, rtol: f64, atol: f64) -> bool {
    a == b || (a - b).abs() < rtol * b.abs() + atol
}

/// `isclose(a, 0)`; the relative tolerance vanishes when comparing to zero
pub(crate) fn is_close_to_zero(a: f64, atol: f64) -> bool {
    a == 0.0 || a.abs() < atol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_range_skips_missing() {
        let range = finite_range([f64::NAN, 3.0, f64::INFINITY, -1.0, 2.0]);
        assert_eq!(range, Some((-1.0, 3.0)));
        assert_eq!(finite_range([f64::NAN, f64::NEG_INFINITY]), None);
    }

    #[test]
    fn test_mean_and_median() {
        assert_eq!(mean([1.0, 2.0, f64::NAN, 6.0]), 3.0);
        assert!(mean([f64::NAN]).is_nan());
        assert_eq!(median([5.0, 1.0, 3.0]), 3.0);
        assert_eq!(median([4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(median(Vec::new()).is_nan());
    }

    #[test]
    fn test_sample_variance() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(v);
        assert!((sample_variance(v, m) - 32.0 / 7.0).abs() < 1e-12);
        assert!(sample_variance([1.0], 1.0).is_nan());
    }

    #[test]
    fn test_is_close() {
        assert!(is_close(100.0, 100.0, 1e-5, 1e-8));
        assert!(is_close(99.9995, 100.0, 1e-5, 1e-8));
        assert!(!is_close(99.9, 100.0, 1e-5, 1e-8));
        assert!(is_close_to_zero(5e-9, 1e-8));
        assert!(!is_close_to_zero(1e-6, 1e-8));
        assert!(!is_close_to_zero(f64::NAN, 1e-8));
    }
}
