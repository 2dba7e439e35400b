//! # qtlens - Quantitation Types for Expression Data
//!
//! `qtlens` works out how the values of an expression matrix are encoded
//! and reads the AnnData stores that single-cell expression data ships in.
//!
//! ## Key Features
//!
//! - **Quantitation-type inference**: classify a matrix as counts, linear
//!   amounts, log2/log10/unknown-base log values, z-scores, percentages or
//!   ratios from its value distribution alone.
//!
//! - **Suspicious-value linting**: check a declared quantitation type
//!   against the data and report values that cannot belong to it.
//!
//! - **AnnData reader**: typed views over `obs`/`var` dataframes, dense and
//!   sparse matrices, layers and `uns`, backed by Zarr directories, zipped
//!   Zarr stores or (with the `hdf5` feature) `.h5ad` files.
//!
//! - **Validation**: a full structural report on an AnnData store instead of
//!   a single error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qtlens::prelude::*;
//!
//! let container = Container::open("pbmc.zarr")?;
//! let adata = AnnData::open(&container)?;
//!
//! let matrix = adata.expression_matrix(None)?;
//! let inferred = infer(&matrix, None, false)?;
//! println!("X holds {} values", inferred);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`quantitation`]: inference, linting and their configuration
//! - [`container`]: hierarchical storage backends behind one handle type
//! - [`anndata`]: AnnData encoding on top of a container
//! - [`validator`]: structural validation reports

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod anndata;
pub mod container;
pub mod quantitation;
pub mod validator;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::anndata::{AnnData, Column, Dataframe, Layer, Matrix};
    pub use crate::container::{Container, ContainerError};
    pub use crate::quantitation::{
        detect_suspicious_values, infer, infer_quantitation_type, lint_quantitation_type,
        ExpressionMatrix, InferenceConfig, InferredQuantitationType, QuantitationError,
        QuantitationType, QuantitationTypeDetector, ScaleType, StandardQuantitationType,
    };
    pub use crate::validator::{validate_anndata, validate_path, ValidationReport};
}
