//! # Quantitation Type Inference
//!
//! Determines how the values of an expression matrix are encoded (linear,
//! log2, log10, z-score, percent, count, ratio) and flags values that are
//! implausible for a claimed encoding.
//!
//! ## Example
//!
//! ```rust
//! use qtlens::quantitation::{infer, ExpressionMatrix, ScaleType};
//!
//! let matrix = ExpressionMatrix::from_rows(vec![
//!     vec![0.1, 0.5, 0.9],
//!     vec![0.2, 0.4, 0.3],
//! ])?;
//! let inferred = infer(&matrix, None, false)?;
//! assert_eq!(inferred.scale, ScaleType::Percent1);
//! # Ok::<(), qtlens::quantitation::QuantitationError>(())
//! ```
//!
//! Inference and linting are pure functions over a materialized matrix; the
//! only state is the [`InferenceConfig`] a [`QuantitationTypeDetector`] is
//! built with.

mod config;
mod error;
mod infer;
mod matrix;
mod stats;
mod suspicious;
mod types;

#[cfg(test)]
mod tests;

pub use config::{Config, InferenceConfig};
pub use error::{QuantitationError, SuspiciousValueResult};
pub use infer::{infer, infer_quantitation_type, lint_quantitation_type, QuantitationTypeDetector};
pub use matrix::ExpressionMatrix;
pub use suspicious::detect_suspicious_values;
pub use types::{
    InferredQuantitationType, QuantitationType, ScaleType, StandardQuantitationType,
    TechnologyType,
};
