use std::fmt;

use super::array::{read_vector, required_dataset};
use super::encoding::{check_encoding, read_shape, ARRAY, CSC_MATRIX, CSR_MATRIX};
use crate::container::{element_count, ContainerError, Dataset, Group, NodeKind, ScalarType};

/// Compression axis of a sparse matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SparseFormat {
    /// Compressed sparse rows
    Csr,
    /// Compressed sparse columns
    Csc,
}

impl SparseFormat {
    /// `encoding-type` value of the format
    pub fn encoding_type(&self) -> &'static str {
        match self {
            SparseFormat::Csr => CSR_MATRIX,
            SparseFormat::Csc => CSC_MATRIX,
        }
    }
}

impl fmt::Display for SparseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encoding_type())
    }
}

fn to_f64(dataset: &Dataset) -> Result<Vec<f64>, ContainerError> {
    dataset.read()?.to_f64().ok_or_else(|| {
        ContainerError::invalid_format(dataset.path(), "matrix values must be numeric")
    })
}

/// Zero-filled row-major buffer, failing instead of aborting when it cannot be allocated
pub(crate) fn zeros(path: &str, rows: usize, cols: usize) -> Result<Vec<f64>, ContainerError> {
    let len = element_count(path, &[rows, cols])?;
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|e| {
        ContainerError::invalid_format(path, format!("cannot allocate a {}x{} matrix: {}", rows, cols, e))
    })?;
    buffer.resize(len, 0.0);
    Ok(buffer)
}

/// Two-dimensional array stored as a single dataset
#[derive(Debug)]
pub struct DenseMatrix {
    dataset: Dataset,
    shape: (usize, usize),
}

impl DenseMatrix {
    pub(crate) fn open(dataset: Dataset) -> Result<Self, ContainerError> {
        check_encoding(&dataset, &[ARRAY])?;
        let shape = match dataset.shape()?.as_slice() {
            [rows, cols] => (*rows, *cols),
            other => {
                return Err(ContainerError::invalid_format(
                    dataset.path(),
                    format!("a dense matrix must have rank 2, found shape {:?}", other),
                ))
            }
        };
        element_count(dataset.path(), &[shape.0, shape.1])?;
        Ok(Self { dataset, shape })
    }

    /// Number of rows and columns
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Declared element type
    pub fn data_type(&self) -> Result<ScalarType, ContainerError> {
        self.dataset.data_type()
    }

    /// Read row `i` only
    pub fn row(&self, i: usize) -> Result<Vec<f64>, ContainerError> {
        let (rows, cols) = self.shape;
        if i >= rows {
            return Err(ContainerError::IndexOutOfBounds {
                index: i,
                len: rows,
            });
        }
        self.dataset
            .read_range(i * cols, cols)?
            .to_f64()
            .ok_or_else(|| {
                ContainerError::invalid_format(self.dataset.path(), "matrix values must be numeric")
            })
    }

    /// All values, row-major
    pub fn to_dense(&self) -> Result<Vec<f64>, ContainerError> {
        to_f64(&self.dataset)
    }
}

/// Sparse matrix in CSR or CSC layout
///
/// `indptr` has one entry per row (CSR) or column (CSC) plus one, and
/// `indices` and `data` have one entry per stored value.
#[derive(Debug)]
pub struct SparseMatrix {
    group: Group,
    format: SparseFormat,
    shape: (usize, usize),
    nnz: usize,
}

impl SparseMatrix {
    pub(crate) fn open(group: Group) -> Result<Self, ContainerError> {
        let format = match check_encoding(&group, &[CSR_MATRIX, CSC_MATRIX])?.as_str() {
            CSR_MATRIX => SparseFormat::Csr,
            _ => SparseFormat::Csc,
        };
        let shape = read_shape(&group)?;

        let one_dimensional = |name: &str| -> Result<usize, ContainerError> {
            let dataset = required_dataset(&group, name)?;
            match dataset.shape()?.as_slice() {
                [n] => Ok(*n),
                other => Err(ContainerError::invalid_format(
                    dataset.path(),
                    format!("expected a one-dimensional dataset, found shape {:?}", other),
                )),
            }
        };
        let data_len = one_dimensional("data")?;
        let indices_len = one_dimensional("indices")?;
        let indptr_len = one_dimensional("indptr")?;

        let major = match format {
            SparseFormat::Csr => shape.0,
            SparseFormat::Csc => shape.1,
        };
        if indptr_len != major + 1 {
            return Err(ContainerError::invalid_format(
                group.path(),
                format!(
                    "indptr has {} entries, expected {} for a {} of shape {:?}",
                    indptr_len,
                    major + 1,
                    format,
                    shape
                ),
            ));
        }
        if data_len != indices_len {
            return Err(ContainerError::invalid_format(
                group.path(),
                format!(
                    "data has {} entries but indices has {}",
                    data_len, indices_len
                ),
            ));
        }

        Ok(Self {
            group,
            format,
            shape,
            nnz: data_len,
        })
    }

    /// Number of rows and columns
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Compression axis
    pub fn format(&self) -> SparseFormat {
        self.format
    }

    /// Number of stored values
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    /// Declared element type of the stored values
    pub fn data_type(&self) -> Result<ScalarType, ContainerError> {
        self.group.dataset("data")?.data_type()
    }

    /// Offsets into `indices` and `data`
    pub fn indptr(&self) -> Result<Vec<i64>, ContainerError> {
        read_vector::<i64>(&self.group.dataset("indptr")?)
    }

    /// Column (CSR) or row (CSC) of each stored value
    pub fn indices(&self) -> Result<Vec<i64>, ContainerError> {
        read_vector::<i64>(&self.group.dataset("indices")?)
    }

    /// Stored values
    pub fn data(&self) -> Result<Vec<f64>, ContainerError> {
        to_f64(&self.group.dataset("data")?)
    }

    /// All values, row-major, with zeros where nothing is stored
    pub fn to_dense(&self) -> Result<Vec<f64>, ContainerError> {
        let (rows, cols) = self.shape;
        let (major, minor) = match self.format {
            SparseFormat::Csr => (rows, cols),
            SparseFormat::Csc => (cols, rows),
        };
        let indptr = self.indptr()?;
        let indices = self.indices()?;
        let data = self.data()?;
        if indptr.len() != major + 1 || indices.len() != data.len() {
            return Err(ContainerError::invalid_format(
                self.group.path(),
                "sparse matrix components changed size since it was opened",
            ));
        }

        let mut dense = zeros(self.group.path(), rows, cols)?;
        for m in 0..major {
            let (start, end) = (indptr[m], indptr[m + 1]);
            if start < 0 || end < start || end as usize > data.len() {
                return Err(ContainerError::invalid_format(
                    self.group.path(),
                    format!("invalid indptr range [{}, {}) at {}", start, end, m),
                ));
            }
            for k in start as usize..end as usize {
                let n = indices[k];
                if n < 0 || n as usize >= minor {
                    return Err(ContainerError::invalid_format(
                        self.group.path(),
                        format!("index {} is out of bounds for {} entries", n, minor),
                    ));
                }
                let (i, j) = match self.format {
                    SparseFormat::Csr => (m, n as usize),
                    SparseFormat::Csc => (n as usize, m),
                };
                dense[i * cols + j] += data[k];
            }
        }
        Ok(dense)
    }
}

/// Dense or sparse matrix, resolved from its `encoding-type`
#[derive(Debug)]
pub enum Matrix {
    /// Dense array
    Dense(DenseMatrix),
    /// CSR or CSC sparse matrix
    Sparse(SparseMatrix),
}

impl Matrix {
    /// Open the child `name` of `parent` as a matrix
    pub(crate) fn open(parent: &Group, name: &str) -> Result<Self, ContainerError> {
        match parent.child_kind(name)? {
            Some(NodeKind::Dataset) => Ok(Matrix::Dense(DenseMatrix::open(parent.dataset(name)?)?)),
            Some(NodeKind::Group) => Ok(Matrix::Sparse(SparseMatrix::open(parent.group(name)?)?)),
            None => Err(ContainerError::NotFound {
                path: crate::container::join_path(parent.path(), name),
            }),
        }
    }

    /// Number of rows and columns
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Matrix::Dense(m) => m.shape(),
            Matrix::Sparse(m) => m.shape(),
        }
    }

    /// Declared element type of the values
    pub fn data_type(&self) -> Result<ScalarType, ContainerError> {
        match self {
            Matrix::Dense(m) => m.data_type(),
            Matrix::Sparse(m) => m.data_type(),
        }
    }

    /// `encoding-type` of the matrix
    pub fn encoding_type(&self) -> &'static str {
        match self {
            Matrix::Dense(_) => ARRAY,
            Matrix::Sparse(m) => m.format().encoding_type(),
        }
    }

    /// All values, row-major
    pub fn to_dense(&self) -> Result<Vec<f64>, ContainerError> {
        match self {
            Matrix::Dense(m) => m.to_dense(),
            Matrix::Sparse(m) => m.to_dense(),
        }
    }
}

/// A named alternative matrix under `layers`
#[derive(Debug)]
pub struct Layer {
    name: String,
    matrix: Matrix,
}

impl Layer {
    pub(crate) fn new(name: String, matrix: Matrix) -> Self {
        Self { name, matrix }
    }

    /// Layer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Matrix of the layer
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Take the matrix out of the layer
    pub fn into_matrix(self) -> Matrix {
        self.matrix
    }
}
