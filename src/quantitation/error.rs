use std::fmt;

use super::{InferredQuantitationType, QuantitationType};

/// Errors that can occur during quantitation inference and linting
#[derive(Debug, thiserror::Error)]
pub enum QuantitationError {
    /// Structurally invalid input, such as an empty matrix without a fallback
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The matrix holds no finite value to classify
    #[error("Matrix does not contain any finite value")]
    NoFiniteValues,

    /// The inferred quantitation type disagrees with the declared one
    #[error("{message}")]
    InferredMismatch {
        /// Quantitation type declared by the caller
        declared: QuantitationType,
        /// Declared type with the inferred type, scale and ratio flag applied
        inferred: QuantitationType,
        /// Description of the first disagreement
        message: String,
    },

    /// One or more values are implausible for the declared quantitation type
    #[error("Expression data matrix contains suspicious values for {quantitation_type}:\n{}", FindingList(.findings))]
    SuspiciousValues {
        /// Quantitation type the values were checked against
        quantitation_type: QuantitationType,
        /// Every rule violation that was found
        findings: Vec<SuspiciousValueResult>,
    },
}

impl QuantitationError {
    /// Inferred quantitation type carried by a mismatch error
    pub fn inferred(&self) -> Option<InferredQuantitationType> {
        match self {
            QuantitationError::InferredMismatch { inferred, .. } => Some(inferred.into()),
            _ => None,
        }
    }

    /// Findings carried by a suspicious values error
    pub fn findings(&self) -> &[SuspiciousValueResult] {
        match self {
            QuantitationError::SuspiciousValues { findings, .. } => findings,
            _ => &[],
        }
    }
}

/// A single suspicious value finding
///
/// `None` for the row or column means the finding applies to all rows or all
/// columns respectively.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SuspiciousValueResult {
    /// Row the finding applies to
    pub row: Option<usize>,
    /// Label of that row
    pub row_label: Option<String>,
    /// Column the finding applies to
    pub column: Option<usize>,
    /// Label of that column
    pub column_label: Option<String>,
    /// Description of the violation
    pub message: String,
}

impl SuspiciousValueResult {
    pub(crate) fn whole_matrix(message: impl Into<String>) -> Self {
        Self {
            row: None,
            row_label: None,
            column: None,
            column_label: None,
            message: message.into(),
        }
    }

    pub(crate) fn column(column: usize, label: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            row: None,
            row_label: None,
            column: Some(column),
            column_label: label.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for SuspiciousValueResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.row, self.column) {
            (None, None) => {}
            (row, column) => {
                f.write_str("[")?;
                if let Some(row) = row {
                    write!(f, "row {}", self.row_label.as_deref().unwrap_or(&row.to_string()))?;
                    if column.is_some() {
                        f.write_str(", ")?;
                    }
                }
                if let Some(column) = column {
                    write!(
                        f,
                        "column {}",
                        self.column_label.as_deref().unwrap_or(&column.to_string())
                    )?;
                }
                f.write_str("] ")?;
            }
        }
        f.write_str(&self.message)
    }
}

struct FindingList<'a>(&'a [SuspiciousValueResult]);

impl fmt::Display for FindingList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, finding) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "  - {}", finding)?;
        }
        Ok(())
    }
}
