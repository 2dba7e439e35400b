use super::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn matrix(rows: Vec<Vec<f64>>) -> ExpressionMatrix {
    ExpressionMatrix::from_rows(rows).expect("rectangular matrix")
}

fn inferred(
    quantitation_type: StandardQuantitationType,
    scale: ScaleType,
    is_ratio: bool,
) -> InferredQuantitationType {
    InferredQuantitationType::new(quantitation_type, scale, is_ratio)
}

#[test]
fn test_fractions_are_percent1() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let rows = (0..10)
        .map(|i| (0..3).map(|j| (i * 3 + j) as f64 / 40.0 + 0.01).collect())
        .collect();
    let result = infer(&matrix(rows), None, false)?;
    assert_eq!(
        result,
        inferred(StandardQuantitationType::Amount, ScaleType::Percent1, false)
    );
    Ok(())
}

#[test]
fn test_missing_values_are_tolerated() -> Result<(), Box<dyn std::error::Error>> {
    let m = matrix(vec![
        vec![0.1, f64::NAN, 0.3],
        vec![0.4, 0.5, f64::INFINITY],
    ]);
    assert_eq!(infer(&m, None, false)?.scale, ScaleType::Percent1);
    Ok(())
}

#[test]
fn test_integers_are_counts() -> Result<(), Box<dyn std::error::Error>> {
    let rows = (0..4)
        .map(|i| (0..3).map(|j| ((i * 3 + j) * 7) as f64).collect())
        .collect();
    let result = infer(&matrix(rows), None, false)?;
    assert_eq!(
        result,
        inferred(StandardQuantitationType::Count, ScaleType::Count, false)
    );
    Ok(())
}

#[test]
fn test_microarray_suppresses_counts() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let rows = (0..4)
        .map(|i| (0..3).map(|j| ((i * 3 + j) * 7) as f64).collect())
        .collect();
    let result = infer(&matrix(rows), None, true)?;
    assert_eq!(
        result,
        inferred(StandardQuantitationType::Amount, ScaleType::Other, false)
    );
    Ok(())
}

#[test]
fn test_too_few_integers_are_not_counts() -> Result<(), Box<dyn std::error::Error>> {
    let m = matrix(vec![vec![3000.0, 2.0, 5.0], vec![7.0, 11.0, 13.0]]);
    let result = infer(&m, None, false)?;
    assert_ne!(result.quantitation_type, StandardQuantitationType::Count);
    assert_eq!(result.scale, ScaleType::Linear);
    Ok(())
}

#[test]
fn test_zeroes_and_ones_are_present_absent() -> Result<(), Box<dyn std::error::Error>> {
    let rows = (0..5)
        .map(|i| (0..2).map(|j| ((i + j) % 2) as f64).collect())
        .collect();
    let result = infer(&matrix(rows), None, false)?;
    assert_eq!(
        result,
        inferred(StandardQuantitationType::PresentAbsent, ScaleType::Other, false)
    );
    Ok(())
}

#[test]
fn test_percent_up_to_100() -> Result<(), Box<dyn std::error::Error>> {
    let m = matrix(vec![
        vec![100.0, 50.5, 20.25],
        vec![10.5, 3.5, 99.5],
        vec![42.0, 0.0, 63.75],
    ]);
    let result = infer(&m, None, false)?;
    assert_eq!(
        result,
        inferred(StandardQuantitationType::Amount, ScaleType::Percent, false)
    );
    Ok(())
}

#[test]
fn test_zero_mean_column_is_zscore() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let m = matrix(vec![
        vec![-15.0, 10.0],
        vec![15.0, 12.0],
        vec![-5.0, 14.0],
        vec![5.0, 15.0],
    ]);
    let result = infer(&m, None, false)?;
    assert_eq!(
        result,
        inferred(StandardQuantitationType::ZScore, ScaleType::LogBaseUnknown, false)
    );
    Ok(())
}

#[test]
fn test_zscore_with_large_values_has_other_scale() -> Result<(), Box<dyn std::error::Error>> {
    let m = matrix(vec![
        vec![-30.0, 10.0],
        vec![30.0, 12.0],
        vec![-5.0, 14.0],
        vec![5.0, 15.0],
    ]);
    let result = infer(&m, None, false)?;
    assert_eq!(
        result,
        inferred(StandardQuantitationType::ZScore, ScaleType::Other, false)
    );
    Ok(())
}

#[test]
fn test_zero_median_column_is_zscore() -> Result<(), Box<dyn std::error::Error>> {
    let m = matrix(vec![
        vec![-1.0, 10.5],
        vec![0.0, 12.5],
        vec![7.0, 8.5],
    ]);
    let result = infer(&m, None, false)?;
    assert_eq!(result.quantitation_type, StandardQuantitationType::ZScore);
    Ok(())
}

#[test]
fn test_log2_data() -> Result<(), Box<dyn std::error::Error>> {
    let m = matrix(vec![
        vec![5.5, 8.25, 9.75],
        vec![14.3, 10.5, 6.125],
        vec![7.75, 12.5, 11.25],
    ]);
    let result = infer(&m, None, false)?;
    assert_eq!(
        result,
        inferred(StandardQuantitationType::Amount, ScaleType::Log2, false)
    );
    Ok(())
}

#[test]
fn test_log10_data() -> Result<(), Box<dyn std::error::Error>> {
    let m = matrix(vec![
        vec![2.1, 3.25, 4.5],
        vec![3.75, 2.5, 3.125],
        vec![4.25, 3.5, 2.75],
    ]);
    let result = infer(&m, None, false)?;
    assert_eq!(
        result,
        inferred(StandardQuantitationType::Amount, ScaleType::Log10, false)
    );
    Ok(())
}

#[test]
fn test_unknown_log_base_data() -> Result<(), Box<dyn std::error::Error>> {
    let m = matrix(vec![
        vec![5.5, 8.25, 9.75],
        vec![7.3, 10.5, 6.125],
        vec![7.75, 6.5, 10.25],
    ]);
    let result = infer(&m, None, false)?;
    assert_eq!(
        result,
        inferred(StandardQuantitationType::Amount, ScaleType::LogBaseUnknown, false)
    );
    Ok(())
}

#[test]
fn test_natural_log_data_is_unknown_base() -> Result<(), Box<dyn std::error::Error>> {
    let rows = [[150.0, 900.0, 2500.0], [400.0, 12000.0, 30000.0], [700.0, 5000.0, 60.0]]
        .iter()
        .map(|row| row.iter().map(|v: &f64| v.ln()).collect())
        .collect();
    let result = infer(&matrix(rows), None, false)?;
    assert_eq!(result.scale, ScaleType::LogBaseUnknown);
    assert_eq!(result.scale.to_string(), "LOGBASEUNKNOWN");
    Ok(())
}

#[test]
fn test_ratiometric_log2_data() -> Result<(), Box<dyn std::error::Error>> {
    let m = matrix(vec![
        vec![-1.2, 0.5],
        vec![0.4, -0.9],
        vec![3.5, 1.1],
        vec![-1.5, -1.3],
    ]);
    let result = infer(&m, None, false)?;
    assert_eq!(
        result,
        inferred(StandardQuantitationType::Amount, ScaleType::Log2, true)
    );
    Ok(())
}

#[test]
fn test_negative_values_imply_log_transform() -> Result<(), Box<dyn std::error::Error>> {
    let m = matrix(vec![
        vec![-5.0, 1.5],
        vec![30.5, 25.0],
        vec![40.0, 35.0],
        vec![50.0, 45.0],
    ]);
    let result = infer(&m, None, false)?;
    assert_eq!(
        result,
        inferred(StandardQuantitationType::Amount, ScaleType::LogBaseUnknown, false)
    );
    Ok(())
}

#[test]
fn test_linear_data() -> Result<(), Box<dyn std::error::Error>> {
    let m = matrix(vec![
        vec![120.5, 3400.25, 50000.0],
        vec![980.75, 101.5, 2200.5],
        vec![4500.5, 760.25, 333.5],
    ]);
    let result = infer(&m, None, false)?;
    assert_eq!(
        result,
        inferred(StandardQuantitationType::Amount, ScaleType::Linear, false)
    );
    Ok(())
}

#[test]
fn test_moderate_range_is_other() -> Result<(), Box<dyn std::error::Error>> {
    let m = matrix(vec![
        vec![120.5, 340.25, 500.5],
        vec![98.75, 101.5, 220.5],
        vec![450.5, 76.25, 333.5],
    ]);
    let result = infer(&m, None, false)?;
    assert_eq!(
        result,
        inferred(StandardQuantitationType::Amount, ScaleType::Other, false)
    );
    Ok(())
}

#[test]
fn test_zscore_in_log_space() -> Result<(), Box<dyn std::error::Error>> {
    let e = std::f64::consts::E;
    let m = matrix(vec![
        vec![e.powi(-2), 3000.5],
        vec![e.powi(2), 2000.25],
        vec![e.powi(-1), 2500.75],
        vec![e, 1800.5],
    ]);
    let result = infer(&m, None, false)?;
    assert_eq!(
        result,
        inferred(StandardQuantitationType::ZScore, ScaleType::Linear, false)
    );
    Ok(())
}

#[test]
fn test_empty_matrix() {
    let empty = ExpressionMatrix::new(0, 3, Vec::new()).expect("empty matrix");

    let err = infer(&empty, None, false).unwrap_err();
    assert!(matches!(err, QuantitationError::InvalidArgument(_)));

    let fallback = inferred(StandardQuantitationType::Amount, ScaleType::Log2, true);
    let result = infer(&empty, Some(fallback), false).expect("fallback is returned");
    assert_eq!(result, fallback);
}

#[test]
fn test_no_finite_values() {
    let m = ExpressionMatrix::new(3, 4, vec![f64::NAN; 12]).expect("matrix");
    let err = infer(&m, None, false).unwrap_err();
    assert!(matches!(err, QuantitationError::NoFiniteValues));
}

#[test]
fn test_inference_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let m = matrix(vec![
        vec![5.5, 8.25, 9.75],
        vec![14.3, 10.5, 6.125],
    ]);
    let detector = QuantitationTypeDetector::default();
    assert_eq!(detector.infer(&m, None, false)?, detector.infer(&m, None, false)?);
    Ok(())
}

#[test]
fn test_custom_thresholds() -> Result<(), Box<dyn std::error::Error>> {
    let rows: Vec<Vec<f64>> = (0..2)
        .map(|i| (0..3).map(|j| ((i * 3 + j) * 7) as f64).collect())
        .collect();
    let m = matrix(rows);
    // six values are not enough by default
    assert_ne!(infer(&m, None, false)?.scale, ScaleType::Count);

    let detector = QuantitationTypeDetector::new(InferenceConfig {
        min_count_values: 5,
        ..InferenceConfig::default()
    });
    assert_eq!(detector.infer(&m, None, false)?.scale, ScaleType::Count);
    Ok(())
}

#[test]
fn test_matrix_shape_is_checked() {
    assert!(ExpressionMatrix::new(2, 2, vec![1.0; 3]).is_err());
    assert!(ExpressionMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).is_err());
    let m = matrix(vec![vec![1.0, 2.0]]);
    assert!(m.with_column_names(vec!["a".to_string()]).is_err());
}

#[test]
fn test_lint_matching_declaration() -> Result<(), Box<dyn std::error::Error>> {
    let m = matrix(vec![
        vec![5.5, 8.25, 9.75],
        vec![14.3, 10.5, 6.125],
    ]);
    let declared = QuantitationType::new("log2 intensity", StandardQuantitationType::Amount, ScaleType::Log2, false);
    lint_quantitation_type(&declared, &m, false, false)?;
    Ok(())
}

#[test]
fn test_lint_mismatched_scale() {
    init_logging();
    let m = matrix(vec![
        vec![5.5, 8.25, 9.75],
        vec![14.3, 10.5, 6.125],
    ]);
    let declared = QuantitationType::new("intensity", StandardQuantitationType::Amount, ScaleType::Linear, false);

    let err = lint_quantitation_type(&declared, &m, false, false).unwrap_err();
    match &err {
        QuantitationError::InferredMismatch {
            declared: d,
            inferred,
            message,
        } => {
            assert_eq!(d, &declared);
            assert_eq!(inferred.scale, ScaleType::Log2);
            assert_eq!(inferred.name, "intensity");
            assert_eq!(
                message,
                "The scale LINEAR differs from the one inferred from data: LOG2."
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        err.inferred(),
        Some(inferred(StandardQuantitationType::Amount, ScaleType::Log2, false))
    );

    assert!(lint_quantitation_type(&declared, &m, false, true).is_ok());
}

#[test]
fn test_lint_ratio_mismatch() {
    let m = matrix(vec![
        vec![-1.2, 0.5],
        vec![0.4, -0.9],
        vec![3.5, 1.1],
        vec![-1.5, -1.3],
    ]);
    let declared = QuantitationType::new("log ratio", StandardQuantitationType::Amount, ScaleType::Log2, false);
    let err = lint_quantitation_type(&declared, &m, false, false).unwrap_err();
    assert!(err.to_string().contains("appears to be ratiometric"));
}

#[test]
fn test_infer_quantitation_type() -> Result<(), Box<dyn std::error::Error>> {
    let rows = (0..4)
        .map(|i| (0..3).map(|j| ((i * 3 + j) * 7) as f64).collect())
        .collect();
    let qt = infer_quantitation_type(&matrix(rows), false)?;
    assert_eq!(qt.quantitation_type, StandardQuantitationType::Count);
    assert_eq!(qt.scale, ScaleType::Count);
    assert!(!qt.is_ratio);
    assert!(!qt.is_normalized);
    Ok(())
}

#[test]
fn test_technology_type() {
    assert!(TechnologyType::OneColor.is_microarray());
    assert!(TechnologyType::TwoColor.is_microarray());
    assert!(TechnologyType::DualMode.is_microarray());
    assert!(!TechnologyType::Sequencing.is_microarray());
    assert!(!TechnologyType::GeneList.is_microarray());
}

fn log2_qt(is_ratio: bool) -> QuantitationType {
    QuantitationType::new("qt", StandardQuantitationType::Amount, ScaleType::Log2, is_ratio)
}

#[test]
fn test_log2_value_too_high() {
    let m = matrix(vec![vec![8.0, 7.0], vec![25.0, 9.0], vec![10.0, 11.0]])
        .with_column_names(vec!["GSM1".to_string(), "GSM2".to_string()])
        .expect("names");

    let err = detect_suspicious_values(&m, &log2_qt(false)).unwrap_err();
    let findings = err.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].column, Some(0));
    assert_eq!(findings[0].column_label.as_deref(), Some("GSM1"));
    assert_eq!(findings[0].row, None);
    assert!(findings[0].message.contains("too high"));
    assert_eq!(
        findings[0].message,
        "maximum of 25.00 is too high; upper bound is 20.00"
    );
}

#[test]
fn test_log2_mean_near_zero_is_suspicious() {
    let m = matrix(vec![vec![0.0, 7.0], vec![0.05, 9.0], vec![0.0, 11.0]]);
    let err = detect_suspicious_values(&m, &log2_qt(false)).unwrap_err();
    let findings = err.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].column, Some(0));
    assert!(findings[0].message.contains("inside suspicious range"));
}

#[test]
fn test_log2_ratio_envelope() {
    let m = matrix(vec![vec![-16.0, 0.1], vec![3.0, -0.2], vec![4.0, 0.3]]);
    let err = detect_suspicious_values(&m, &log2_qt(true)).unwrap_err();
    let messages: Vec<&str> = err.findings().iter().map(|f| f.message.as_str()).collect();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].starts_with("minimum of -16.00 is too small"));
    assert!(messages[1].contains("outside expected range of [-0.50, 0.50] for mean"));
}

#[test]
fn test_plausible_log2_data_passes() {
    let m = matrix(vec![vec![8.0, 7.0], vec![12.0, 9.0], vec![10.0, 11.0]]);
    assert!(detect_suspicious_values(&m, &log2_qt(false)).is_ok());
}

#[test]
fn test_log10_envelopes() {
    let qt = QuantitationType::new("qt", StandardQuantitationType::Amount, ScaleType::Log10, false);
    let m = matrix(vec![vec![2.0, 3.5], vec![10.0, 4.0]]);
    let err = detect_suspicious_values(&m, &qt).unwrap_err();
    assert_eq!(err.findings().len(), 1);
    assert!(err.findings()[0].message.contains("upper bound is 9.00"));

    let ratio = QuantitationType { is_ratio: true, ..qt };
    let m = matrix(vec![vec![0.1, -0.2], vec![-0.1, 0.3]]);
    assert!(detect_suspicious_values(&m, &ratio).is_ok());
}

#[test]
fn test_linear_ratio_is_always_flagged() {
    let qt = QuantitationType::new("qt", StandardQuantitationType::Amount, ScaleType::Linear, true);
    let m = matrix(vec![vec![100.0, 200.0]]);
    let err = detect_suspicious_values(&m, &qt).unwrap_err();
    let findings = err.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].column, None);
    assert_eq!(findings[0].message, "Linear data should not be ratiometric");
}

#[test]
fn test_linear_envelope() {
    let qt = QuantitationType::new("qt", StandardQuantitationType::Amount, ScaleType::Linear, false);
    let m = matrix(vec![vec![100.0, 20.0], vec![300.0, 10.0]]);
    let err = detect_suspicious_values(&m, &qt).unwrap_err();
    let findings = err.findings();
    // second column has a mean of 15, below the expected 50
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].column, Some(1));
}

#[test]
fn test_count_envelope() {
    let qt = QuantitationType::new("qt", StandardQuantitationType::Count, ScaleType::Count, false);
    let m = matrix(vec![vec![-1.0, 2.5], vec![3.0, 4.0]]);
    let err = detect_suspicious_values(&m, &qt).unwrap_err();
    let messages: Vec<&str> = err.findings().iter().map(|f| f.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "minimum of -1.00 is too small; lower bound is 0.00",
            "Counting data contains non-integer values.",
        ]
    );
}

#[test]
fn test_scales_without_envelope_pass() {
    let m = matrix(vec![vec![-1000.0, 1e12]]);
    for scale in [
        ScaleType::Percent,
        ScaleType::Percent1,
        ScaleType::Other,
        ScaleType::LogBaseUnknown,
    ] {
        let qt = QuantitationType::new("qt", StandardQuantitationType::Amount, scale, false);
        assert!(detect_suspicious_values(&m, &qt).is_ok());
    }
}

#[test]
fn test_processed_data_is_not_linted() {
    let m = matrix(vec![vec![25.0, 100.0]]);
    let mut qt = log2_qt(false);
    qt.is_normalized = true;
    assert!(detect_suspicious_values(&m, &qt).is_ok());

    let mut qt = log2_qt(false);
    qt.is_background_subtracted = true;
    assert!(detect_suspicious_values(&m, &qt).is_ok());
}

#[test]
fn test_suspicious_values_display() {
    let m = matrix(vec![vec![8.0], vec![25.0]]);
    let err = detect_suspicious_values(&m, &log2_qt(false)).unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("Expression data matrix contains suspicious values for qt [AMOUNT/LOG2]"));
    assert!(text.contains("  - [column 0] maximum of 25.00 is too high"));
}

#[test]
fn test_quantitation_type_serialization() -> Result<(), Box<dyn std::error::Error>> {
    let qt = log2_qt(true);
    let json = serde_json::to_string(&qt)?;
    assert!(json.contains("\"scale\":\"LOG2\""));
    let back: QuantitationType = serde_json::from_str(&json)?;
    assert_eq!(back, qt);
    Ok(())
}
