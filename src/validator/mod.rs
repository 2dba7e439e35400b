//! # AnnData Validation
//!
//! Structural validation of AnnData stores. Unlike [`AnnData::open`], which
//! stops at the first problem, the validator runs every check it can and
//! collects the outcomes in a [`ValidationReport`].
//!
//! ## Checks
//!
//! 1. **Root**: `encoding-type = "anndata"` and an `encoding-version`
//! 2. **Dataframes**: `obs` and `var` open, and each column decodes to one
//!    entry per row
//! 3. **Matrices**: `X` and each layer are encoded as a dense or sparse matrix
//!    of shape `(n_obs, n_vars)` with consistent sparse offsets
//! 4. **uns**: encoded as a dict when present
//!
//! ## Usage
//!
//! ```rust,no_run
//! use qtlens::validator::validate_path;
//! use std::path::Path;
//!
//! match validate_path(Path::new("pbmc.zarr")) {
//!     Ok(report) => println!("{}", report.format_colored()),
//!     Err(e) => eprintln!("Validation failed: {:#}", e),
//! }
//! ```
//!
//! [`AnnData::open`]: crate::anndata::AnnData::open

use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::container::Container;

pub use report::{CheckStatus, ValidationCheck, ValidationReport};

mod data;
mod report;
mod structure;


/// Validate the AnnData hierarchy held by `container`
pub fn validate_anndata(container: &Container) -> ValidationReport {
    let mut report = ValidationReport::new(format!("{} store", container.format_name()));
    let root = match container.root() {
        Ok(root) => root,
        Err(e) => {
            report.add_check(ValidationCheck::failed("Container readable", e.to_string()));
            return report;
        }
    };

    structure::check_root(&root, &mut report);
    let obs = structure::check_dataframe(&root, "obs", &mut report);
    let var = structure::check_dataframe(&root, "var", &mut report);
    let expected = obs.zip(var).map(|(obs, var)| (obs.len(), var.len()));

    data::check_x(&root, expected, &mut report);
    data::check_layers(&root, expected, &mut report);
    structure::check_uns(&root, &mut report);

    info!(
        "Validated {}: {} passed, {} warnings, {} failed",
        report.source,
        report.success_count(),
        report.warning_count(),
        report.failure_count()
    );
    report
}

/// Open the store at `path` and validate it
///
/// Fails only if the store cannot be opened at all; everything else ends up
/// in the report.
pub fn validate_path(path: &Path) -> Result<ValidationReport> {
    let container = Container::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut report = validate_anndata(&container);
    report.source = path.display().to_string();
    Ok(report)
}
