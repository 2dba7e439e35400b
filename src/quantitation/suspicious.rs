use log::warn;

use super::stats::{finite_range, mean};
use super::{ExpressionMatrix, QuantitationError, QuantitationType, ScaleType, SuspiciousValueResult};

/// Flag values of `matrix` that are implausible for the quantitation type `qt`.
///
/// Each column is checked against the value envelope of the scale, and its
/// mean is checked to be within (or away from) a range. Scales without a
/// known envelope (percentages, `OTHER`, ...) pass without checks, and so
/// does any background-subtracted or normalized data.
///
/// # Errors
///
/// [`QuantitationError::SuspiciousValues`] carrying every finding.
pub fn detect_suspicious_values(
    matrix: &ExpressionMatrix,
    qt: &QuantitationType,
) -> Result<(), QuantitationError> {
    if qt.is_background_subtracted || qt.is_normalized {
        warn!("Expression data is either background subtracted or normalized, suspicious values will not be flagged.");
        return Ok(());
    }

    let mut findings = Vec::new();

    match qt.scale {
        ScaleType::Log2 => {
            if qt.is_ratio {
                ensure_within(matrix, -15.0, 15.0, &mut findings);
                ensure_mean_within(matrix, -0.5, 0.5, &mut findings);
            } else {
                ensure_within(matrix, 0.0, 20.0, &mut findings);
                ensure_mean_outside(matrix, -0.1, 0.1, &mut findings);
            }
        }
        // roughly 0.3 times the log2 envelope, since log(2)/log(10) = 0.3
        ScaleType::Log10 => {
            if qt.is_ratio {
                ensure_within(matrix, -4.5, 4.5, &mut findings);
                ensure_mean_within(matrix, -0.5, 0.5, &mut findings);
            } else {
                ensure_within(matrix, 0.0, 9.0, &mut findings);
                ensure_mean_outside(matrix, -0.03, 0.03, &mut findings);
            }
        }
        ScaleType::Linear => {
            if qt.is_ratio {
                findings.push(SuspiciousValueResult::whole_matrix(
                    "Linear data should not be ratiometric",
                ));
            } else {
                ensure_within(matrix, 1e-3, 1e6, &mut findings);
                ensure_mean_within(matrix, 50.0, 10000.0, &mut findings);
            }
        }
        ScaleType::Count => {
            ensure_within(matrix, 0.0, 1e8, &mut findings);
            if matrix
                .values()
                .iter()
                .any(|x| x.is_finite() && x.fract() != 0.0)
            {
                findings.push(SuspiciousValueResult::whole_matrix(
                    "Counting data contains non-integer values.",
                ));
            }
        }
        ScaleType::LogBaseUnknown
        | ScaleType::Percent
        | ScaleType::Percent1
        | ScaleType::Other => {}
    }

    if findings.is_empty() {
        Ok(())
    } else {
        Err(QuantitationError::SuspiciousValues {
            quantitation_type: qt.clone(),
            findings,
        })
    }
}

fn ensure_within(
    matrix: &ExpressionMatrix,
    lower: f64,
    upper: f64,
    findings: &mut Vec<SuspiciousValueResult>,
) {
    for j in 0..matrix.columns() {
        let Some((minimum, maximum)) = finite_range(matrix.column(j)) else {
            continue;
        };
        if minimum < lower {
            findings.push(SuspiciousValueResult::column(
                j,
                matrix.column_name(j),
                format!("minimum of {:.2} is too small; lower bound is {:.2}", minimum, lower),
            ));
        }
        if maximum > upper {
            findings.push(SuspiciousValueResult::column(
                j,
                matrix.column_name(j),
                format!("maximum of {:.2} is too high; upper bound is {:.2}", maximum, upper),
            ));
        }
    }
}

fn ensure_mean_within(
    matrix: &ExpressionMatrix,
    lower: f64,
    upper: f64,
    findings: &mut Vec<SuspiciousValueResult>,
) {
    for j in 0..matrix.columns() {
        let m = mean(matrix.column(j));
        if m < lower || m > upper {
            findings.push(SuspiciousValueResult::column(
                j,
                matrix.column_name(j),
                format!(
                    "{:.2} is outside expected range of [{:.2}, {:.2}] for mean",
                    m, lower, upper
                ),
            ));
        }
    }
}

fn ensure_mean_outside(
    matrix: &ExpressionMatrix,
    lower: f64,
    upper: f64,
    findings: &mut Vec<SuspiciousValueResult>,
) {
    for j in 0..matrix.columns() {
        let m = mean(matrix.column(j));
        if m >= lower && m <= upper {
            findings.push(SuspiciousValueResult::column(
                j,
                matrix.column_name(j),
                format!(
                    "{:.2} is inside suspicious range of [{:.2}, {:.2}] for mean",
                    m, lower, upper
                ),
            ));
        }
    }
}
