use log::{debug, info, warn};

use super::stats::{finite_range, is_close, is_close_to_zero, mean, median, sample_variance};
use super::{
    ExpressionMatrix, InferenceConfig, InferredQuantitationType, QuantitationError,
    QuantitationType, ScaleType, StandardQuantitationType,
};

const LOG_SCALES: [ScaleType; 3] = [ScaleType::Log10, ScaleType::LogBaseUnknown, ScaleType::Log2];

/// Heuristic classifier of the scale an expression matrix is encoded in
///
/// The detector is stateless apart from its thresholds; the same matrix always
/// yields the same classification.
#[derive(Debug, Clone, Default)]
pub struct QuantitationTypeDetector {
    config: InferenceConfig,
}

impl QuantitationTypeDetector {
    /// Create a detector with custom thresholds
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use
    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Infer the quantitation type of `matrix`.
    ///
    /// The rules are tried in a fixed order and the first one that matches
    /// wins: present/absent, fractions, counts, percentages, z-scores, log
    /// scales (ratiometric or not), negative values, and finally linear data,
    /// possibly z-scored in the log-space.
    ///
    /// # Errors
    ///
    /// - [`QuantitationError::InvalidArgument`] if the matrix is empty and no
    ///   `fallback` is given
    /// - [`QuantitationError::NoFiniteValues`] if the matrix holds no finite value
    pub fn infer(
        &self,
        matrix: &ExpressionMatrix,
        fallback: Option<InferredQuantitationType>,
        is_microarray: bool,
    ) -> Result<InferredQuantitationType, QuantitationError> {
        if matrix.is_empty() {
            return match fallback {
                Some(fallback) => {
                    warn!(
                        "There is no data to infer quantitation type from, but a fallback was provided: {}",
                        fallback
                    );
                    Ok(fallback)
                }
                None => Err(QuantitationError::InvalidArgument(
                    "Cannot infer quantitation type without data.".to_string(),
                )),
            };
        }

        let is_percent = self.is_percent(matrix);
        let mut is_count = self.is_count(matrix);

        if is_count && is_microarray {
            warn!("Data appears to have been rounded and a microarray platform was detected, will not treat as counts.");
            is_count = false;
        }

        if is_percent && is_count {
            warn!(
                "Data only contains zeroes and ones, there is no binary scale so it will be reported as {}.",
                ScaleType::Other
            );
            return Ok(InferredQuantitationType::new(
                StandardQuantitationType::PresentAbsent,
                ScaleType::Other,
                false,
            ));
        }

        if is_percent {
            info!("Data contains values between 0 and 1, will report as {}.", ScaleType::Percent1);
            return Ok(InferredQuantitationType::new(
                StandardQuantitationType::Amount,
                ScaleType::Percent1,
                false,
            ));
        }

        if is_count {
            info!("Data appears to contain counts, will report as {}.", ScaleType::Count);
            return Ok(InferredQuantitationType::new(
                StandardQuantitationType::Count,
                ScaleType::Count,
                false,
            ));
        }

        let (minimum, maximum) =
            finite_range(matrix.values().iter().copied()).ok_or(QuantitationError::NoFiniteValues)?;

        if self.is_percent100(matrix, maximum) {
            info!(
                "Data contains values between 0 and 100 close enough to the boundaries, will report as {}.",
                ScaleType::Percent
            );
            return Ok(InferredQuantitationType::new(
                StandardQuantitationType::Amount,
                ScaleType::Percent,
                false,
            ));
        }

        if self.is_zscore(matrix) {
            info!("Data is normalized sample-wise: one or more samples have either zero mean or zero median.");
            let scale = if maximum < self.config.zscore_log_maximum {
                ScaleType::LogBaseUnknown
            } else {
                ScaleType::Other
            };
            return Ok(InferredQuantitationType::new(
                StandardQuantitationType::ZScore,
                scale,
                false,
            ));
        }

        let is_ratio = self.is_ratiometric(matrix);
        let bounds = if is_ratio {
            &self.config.ratiometric_upper_bounds
        } else {
            &self.config.log_upper_bounds
        };
        for (i, (&bound, &scale)) in bounds.iter().zip(LOG_SCALES.iter()).enumerate() {
            if maximum < bound {
                info!(
                    "Data appears to be in the {}{} scale: maximum value observed is {} which is within bounds [{}, {}[.",
                    if is_ratio { "ratiometric " } else { "" },
                    scale,
                    maximum,
                    if i > 0 { bounds[i - 1] } else { 0.0 },
                    bound
                );
                return Ok(InferredQuantitationType::new(
                    StandardQuantitationType::Amount,
                    scale,
                    is_ratio,
                ));
            }
        }

        // negative values are only possible after a log-transform
        if minimum < 0.0 {
            info!("Data contains negative values, will report as {}.", ScaleType::LogBaseUnknown);
            return Ok(InferredQuantitationType::new(
                StandardQuantitationType::Amount,
                ScaleType::LogBaseUnknown,
                is_ratio,
            ));
        }

        let scale = if maximum >= self.config.linear_minimum_maximum {
            ScaleType::Linear
        } else {
            ScaleType::Other
        };

        // zero in the log-space is one in the linear space
        if self.is_zscore(&matrix.map(f64::ln)) {
            info!("Data appears to be normalized sample-wise in the log-space.");
            return Ok(InferredQuantitationType::new(
                StandardQuantitationType::ZScore,
                scale,
                false,
            ));
        }

        debug!("No transform detected, reporting as {}.", scale);
        Ok(InferredQuantitationType::new(
            StandardQuantitationType::Amount,
            scale,
            false,
        ))
    }

    /// All finite values within `[0, 1]`, with at least one finite value.
    fn is_percent(&self, matrix: &ExpressionMatrix) -> bool {
        let mut seen = false;
        for &x in matrix.values().iter().filter(|x| x.is_finite()) {
            if !(0.0..=1.0).contains(&x) {
                return false;
            }
            seen = true;
        }
        seen
    }

    /// All finite values are non-negative integers, with enough of them to tell.
    fn is_count(&self, matrix: &ExpressionMatrix) -> bool {
        let mut n = 0usize;
        for &x in matrix.values().iter().filter(|x| x.is_finite()) {
            if x < 0.0 || x.round() != x {
                return false;
            }
            n += 1;
        }
        if n < self.config.min_count_values {
            warn!("Matrix is too small to detect counts ({} values).", n);
            return false;
        }
        true
    }

    /// Values within `[0, 100]` with a maximum close to 100.
    fn is_percent100(&self, matrix: &ExpressionMatrix, maximum: f64) -> bool {
        is_close(maximum, 100.0, self.config.rtol, self.config.atol)
            && matrix
                .values()
                .iter()
                .filter(|x| x.is_finite())
                .all(|x| (0.0..=100.0).contains(x))
    }

    /// Whether any column has a mean or a median close to zero.
    fn is_zscore(&self, matrix: &ExpressionMatrix) -> bool {
        (0..matrix.columns()).any(|j| self.is_zscore_column(matrix, j))
    }

    fn is_zscore_column(&self, matrix: &ExpressionMatrix, j: usize) -> bool {
        let m = mean(matrix.column(j));
        if is_close_to_zero(m, self.config.atol) {
            let var = sample_variance(matrix.column(j), m);
            if !is_close(var, 1.0, self.config.rtol, self.config.atol) {
                warn!(
                    "Mean of column {} is zero, but standard deviation {} is not close enough to one. Will still report as Z-score.",
                    j,
                    var.sqrt()
                );
            }
            return true;
        }
        is_close_to_zero(median(matrix.column(j)), self.config.atol)
    }

    /// Every column is centered within the ratiometric bound of zero.
    fn is_ratiometric(&self, matrix: &ExpressionMatrix) -> bool {
        (0..matrix.columns())
            .all(|j| mean(matrix.column(j)).abs() < self.config.ratiometric_mean_bound)
    }

    /// Check that a declared quantitation type agrees with the one inferred from `matrix`.
    ///
    /// The type, the scale and the ratio flag are compared in that order. With
    /// `ignore_mismatch`, disagreements are only logged.
    pub fn lint_quantitation_type(
        &self,
        declared: &QuantitationType,
        matrix: &ExpressionMatrix,
        is_microarray: bool,
        ignore_mismatch: bool,
    ) -> Result<(), QuantitationError> {
        let inferred = self.infer(matrix, Some(declared.into()), is_microarray)?;

        let mut mismatches = Vec::new();
        if declared.quantitation_type != inferred.quantitation_type {
            mismatches.push(format!(
                "The type {} differs from the one inferred from data: {}.",
                declared.quantitation_type, inferred.quantitation_type
            ));
        }
        if declared.scale != inferred.scale {
            mismatches.push(format!(
                "The scale {} differs from the one inferred from data: {}.",
                declared.scale, inferred.scale
            ));
        }
        if declared.is_ratio != inferred.is_ratio {
            mismatches.push(format!(
                "The expression data {} to be ratiometric, but the quantitation type says otherwise.",
                if inferred.is_ratio { "appears" } else { "does not appear" }
            ));
        }

        for message in mismatches {
            if ignore_mismatch {
                warn!("{}", message);
            } else {
                return Err(QuantitationError::InferredMismatch {
                    declared: declared.clone(),
                    inferred: inferred.apply_to(declared),
                    message,
                });
            }
        }
        Ok(())
    }

    /// Infer a complete quantitation type from `matrix`.
    pub fn infer_quantitation_type(
        &self,
        matrix: &ExpressionMatrix,
        is_microarray: bool,
    ) -> Result<QuantitationType, QuantitationError> {
        let inferred = self.infer(matrix, None, is_microarray)?;
        Ok(QuantitationType::new(
            "inferred",
            inferred.quantitation_type,
            inferred.scale,
            inferred.is_ratio,
        ))
    }
}

/// Infer the quantitation type of `matrix` with the default thresholds.
///
/// See [`QuantitationTypeDetector::infer`].
pub fn infer(
    matrix: &ExpressionMatrix,
    fallback: Option<InferredQuantitationType>,
    is_microarray: bool,
) -> Result<InferredQuantitationType, QuantitationError> {
    QuantitationTypeDetector::default().infer(matrix, fallback, is_microarray)
}

/// Infer a complete quantitation type with the default thresholds.
pub fn infer_quantitation_type(
    matrix: &ExpressionMatrix,
    is_microarray: bool,
) -> Result<QuantitationType, QuantitationError> {
    QuantitationTypeDetector::default().infer_quantitation_type(matrix, is_microarray)
}

/// Check a declared quantitation type against the data with the default thresholds.
///
/// See [`QuantitationTypeDetector::lint_quantitation_type`].
pub fn lint_quantitation_type(
    declared: &QuantitationType,
    matrix: &ExpressionMatrix,
    is_microarray: bool,
    ignore_mismatch: bool,
) -> Result<(), QuantitationError> {
    QuantitationTypeDetector::default().lint_quantitation_type(
        declared,
        matrix,
        is_microarray,
        ignore_mismatch,
    )
}
