use std::fmt;

use serde::{Deserialize, Serialize};

/// Statistical kind of the values held by an expression matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StandardQuantitationType {
    /// Measured amount (intensity, expression level)
    Amount,
    /// Raw counts
    Count,
    /// Binary presence/absence calls
    PresentAbsent,
    /// Sample-wise standardized values
    ZScore,
}

impl fmt::Display for StandardQuantitationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StandardQuantitationType::Amount => "AMOUNT",
            StandardQuantitationType::Count => "COUNT",
            StandardQuantitationType::PresentAbsent => "PRESENTABSENT",
            StandardQuantitationType::ZScore => "ZSCORE",
        };
        f.write_str(name)
    }
}

/// Numeric transform applied to the underlying measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScaleType {
    /// Untransformed
    Linear,
    /// Base-2 logarithm
    Log2,
    /// Base-10 logarithm
    Log10,
    /// Logarithm of undetermined base
    LogBaseUnknown,
    /// Percentages in `[0, 100]`
    Percent,
    /// Fractions in `[0, 1]`
    Percent1,
    /// Integer counts
    Count,
    /// Anything else
    Other,
}

impl fmt::Display for ScaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScaleType::Linear => "LINEAR",
            ScaleType::Log2 => "LOG2",
            ScaleType::Log10 => "LOG10",
            ScaleType::LogBaseUnknown => "LOGBASEUNKNOWN",
            ScaleType::Percent => "PERCENT",
            ScaleType::Percent1 => "PERCENT1",
            ScaleType::Count => "COUNT",
            ScaleType::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// Technology of the platform a matrix was measured on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TechnologyType {
    /// Single-channel microarray
    OneColor,
    /// Two-channel microarray
    TwoColor,
    /// Microarray usable in both modes
    DualMode,
    /// Sequencing-based platform
    Sequencing,
    /// Gene list without measurements
    GeneList,
    /// Unknown or other technology
    Other,
}

impl TechnologyType {
    /// Whether this technology is a microarray.
    ///
    /// Microarray intensities are never true counts, even when rounded.
    pub fn is_microarray(&self) -> bool {
        matches!(
            self,
            TechnologyType::OneColor | TechnologyType::TwoColor | TechnologyType::DualMode
        )
    }
}

/// Outcome of an inference: type, scale and ratio flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InferredQuantitationType {
    /// Statistical kind
    pub quantitation_type: StandardQuantitationType,
    /// Scale
    pub scale: ScaleType,
    /// Whether values are ratios of two signals
    pub is_ratio: bool,
}

impl InferredQuantitationType {
    /// Create an inferred quantitation type
    pub fn new(quantitation_type: StandardQuantitationType, scale: ScaleType, is_ratio: bool) -> Self {
        Self {
            quantitation_type,
            scale,
            is_ratio,
        }
    }

    /// Apply this inference on top of a declared quantitation type, keeping its other fields
    pub fn apply_to(&self, base: &QuantitationType) -> QuantitationType {
        QuantitationType {
            quantitation_type: self.quantitation_type,
            scale: self.scale,
            is_ratio: self.is_ratio,
            ..base.clone()
        }
    }
}

impl fmt::Display for InferredQuantitationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.quantitation_type, self.scale)?;
        if self.is_ratio {
            f.write_str(" (ratio)")?;
        }
        Ok(())
    }
}

impl From<&QuantitationType> for InferredQuantitationType {
    fn from(qt: &QuantitationType) -> Self {
        Self::new(qt.quantitation_type, qt.scale, qt.is_ratio)
    }
}

/// Declared description of how the values of a matrix are to be interpreted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantitationType {
    /// Free-form name, usually taken from the data source
    pub name: String,
    /// Statistical kind
    pub quantitation_type: StandardQuantitationType,
    /// Scale
    pub scale: ScaleType,
    /// Whether values are ratios of two signals
    pub is_ratio: bool,
    /// Whether background was subtracted from the values
    #[serde(default)]
    pub is_background_subtracted: bool,
    /// Whether the values were normalized
    #[serde(default)]
    pub is_normalized: bool,
}

impl QuantitationType {
    /// Create a raw (not normalized, not background-subtracted) quantitation type
    pub fn new(
        name: impl Into<String>,
        quantitation_type: StandardQuantitationType,
        scale: ScaleType,
        is_ratio: bool,
    ) -> Self {
        Self {
            name: name.into(),
            quantitation_type,
            scale,
            is_ratio,
            is_background_subtracted: false,
            is_normalized: false,
        }
    }
}

impl fmt::Display for QuantitationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]",
            self.name,
            InferredQuantitationType::from(self)
        )
    }
}
