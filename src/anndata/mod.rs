//! # AnnData Views
//!
//! Typed, validated views over an AnnData hierarchy stored in a
//! [`Container`]: the `obs` and `var` dataframes, the `X` matrix, named
//! `layers` and the `uns` mapping.
//!
//! Every element is tagged with an `encoding-type` attribute. Views check it
//! when they are built, so a view that exists is structurally sound; the
//! values themselves are only read on request.
//!
//! ## Example
//!
//! ```rust,no_run
//! use qtlens::anndata::AnnData;
//! use qtlens::container::Container;
//!
//! let container = Container::open("pbmc.zarr")?;
//! let adata = AnnData::open(&container)?;
//! println!("{} cells x {} genes", adata.n_obs(), adata.n_vars());
//!
//! if let Some(x) = adata.x()? {
//!     println!("X is a {} of shape {:?}", x.encoding_type(), x.shape());
//! }
//! let cell_types = adata.obs().categorical_column::<String>("cell_type")?;
//! println!("first cell: {:?}", cell_types.get(0)?);
//! # Ok::<(), qtlens::container::ContainerError>(())
//! ```

mod array;
mod dataframe;
pub(crate) mod encoding;
mod matrix;


pub use array::{CategoricalArray, Element, NullableArray, Value};
pub use dataframe::{Column, Dataframe};
pub use matrix::{DenseMatrix, Layer, Matrix, SparseFormat, SparseMatrix};

use log::debug;

use self::encoding::{check_encoding, encoding_type, ANNDATA, DICT, ENCODING_VERSION};
use self::matrix::zeros;
use crate::container::{element_count, Container, ContainerError, Group};
use crate::quantitation::ExpressionMatrix;

/// Annotated data matrix: observations x variables with their annotations
#[derive(Debug)]
pub struct AnnData {
    root: Group,
    encoding_version: String,
    obs: Dataframe,
    var: Dataframe,
}

impl AnnData {
    /// Open the AnnData hierarchy at the root of `container`
    ///
    /// # Errors
    ///
    /// [`ContainerError::InvalidFormat`] if the root is not tagged with
    /// `encoding-type = "anndata"` and an `encoding-version`, or if `obs` or
    /// `var` is missing. Errors from validating `obs` and `var` are passed on.
    pub fn open(container: &Container) -> Result<Self, ContainerError> {
        let root = container.root()?;

        match encoding_type(&root)? {
            Some(encoding) if encoding == ANNDATA => {}
            Some(encoding) => {
                return Err(ContainerError::invalid_format(
                    "",
                    format!(
                        "the root has encoding-type '{}', expected '{}'",
                        encoding, ANNDATA
                    ),
                ))
            }
            None => {
                return Err(ContainerError::invalid_format(
                    "",
                    "the root lacks a string 'encoding-type' attribute",
                ))
            }
        }

        let encoding_version = match root.attr(ENCODING_VERSION)? {
            Some(attr) => match attr.value().as_str() {
                Some(version) => version.to_string(),
                None => format!("{:?}", attr.value()),
            },
            None => {
                return Err(ContainerError::invalid_format(
                    "",
                    "the root lacks an 'encoding-version' attribute",
                ))
            }
        };

        let obs = Self::open_dataframe(&root, "obs")?;
        let var = Self::open_dataframe(&root, "var")?;
        debug!(
            "Opened AnnData {} with {} observations and {} variables",
            encoding_version,
            obs.len(),
            var.len()
        );

        Ok(Self {
            root,
            encoding_version,
            obs,
            var,
        })
    }

    fn open_dataframe(root: &Group, name: &str) -> Result<Dataframe, ContainerError> {
        if !root.contains(name)? {
            return Err(ContainerError::invalid_format(
                "",
                format!("the '{}' dataframe is missing", name),
            ));
        }
        Dataframe::open(root.group(name)?)
    }

    /// Value of the root `encoding-version` attribute
    pub fn encoding_version(&self) -> &str {
        &self.encoding_version
    }

    /// Per-observation annotations
    pub fn obs(&self) -> &Dataframe {
        &self.obs
    }

    /// Per-variable annotations
    pub fn var(&self) -> &Dataframe {
        &self.var
    }

    /// Number of observations
    pub fn n_obs(&self) -> usize {
        self.obs.len()
    }

    /// Number of variables
    pub fn n_vars(&self) -> usize {
        self.var.len()
    }

    /// Main matrix, if the store has one
    pub fn x(&self) -> Result<Option<Matrix>, ContainerError> {
        if !self.root.contains("X")? {
            return Ok(None);
        }
        Matrix::open(&self.root, "X").map(Some)
    }

    /// Names of the layers; empty without a `layers` group
    pub fn layers(&self) -> Result<Vec<String>, ContainerError> {
        if !self.root.contains("layers")? {
            return Ok(Vec::new());
        }
        self.root.group("layers")?.children()
    }

    /// Layer `name`
    ///
    /// # Errors
    ///
    /// [`ContainerError::InvalidArgument`] listing the available layers when
    /// there is no layer `name`.
    pub fn layer(&self, name: &str) -> Result<Layer, ContainerError> {
        let layers = self.layers()?;
        if !layers.iter().any(|l| l == name) {
            return Err(ContainerError::InvalidArgument(format!(
                "There is no layer named {}. Possible layers are: {}.",
                name,
                layers.join(", ")
            )));
        }
        let group = self.root.group("layers")?;
        Ok(Layer::new(name.to_string(), Matrix::open(&group, name)?))
    }

    /// Keys of the `uns` mapping; empty without an `uns` group
    pub fn uns_keys(&self) -> Result<Vec<String>, ContainerError> {
        if !self.root.contains("uns")? {
            return Ok(Vec::new());
        }
        let uns = self.root.group("uns")?;
        check_encoding(&uns, &[DICT])?;
        uns.children()
    }

    /// `X`, or layer `layer`, as an expression matrix with variables as rows
    /// and observations as columns
    ///
    /// Rows are named after the `var` index and columns after the `obs` index.
    pub fn expression_matrix(&self, layer: Option<&str>) -> Result<ExpressionMatrix, ContainerError> {
        let matrix = match layer {
            Some(name) => self.layer(name)?.into_matrix(),
            None => self.x()?.ok_or_else(|| ContainerError::not_found("X"))?,
        };
        let (n_obs, n_vars) = matrix.shape();
        let path = layer.map_or_else(|| "X".to_string(), |name| format!("layers/{}", name));
        let dense = matrix.to_dense()?;
        if dense.len() != element_count(&path, &[n_obs, n_vars])? {
            return Err(ContainerError::invalid_format(
                &path,
                format!("{} values for a matrix of shape {:?}", dense.len(), (n_obs, n_vars)),
            ));
        }

        let mut transposed = zeros(&path, n_vars, n_obs)?;
        for o in 0..n_obs {
            for v in 0..n_vars {
                transposed[v * n_obs + o] = dense[o * n_vars + v];
            }
        }

        let row_names = self.var.index()?;
        let column_names = self.obs.index()?;
        ExpressionMatrix::new(n_vars, n_obs, transposed)
            .and_then(|m| m.with_row_names(row_names))
            .and_then(|m| m.with_column_names(column_names))
            .map_err(|e| ContainerError::invalid_format(&path, e.to_string()))
    }
}
