use crate::anndata::{Matrix, SparseFormat, SparseMatrix};
use crate::container::{ContainerError, Group, ScalarType};

use super::{ValidationCheck, ValidationReport};

/// `X`, which is optional
pub(crate) fn check_x(root: &Group, expected: Option<(usize, usize)>, report: &mut ValidationReport) {
    match root.contains("X") {
        Ok(true) => check_matrix(root, "X", "X", expected, report),
        Ok(false) => report.add_check(ValidationCheck::warning("X", "no X matrix")),
        Err(e) => report.add_check(ValidationCheck::failed("X", e.to_string())),
    }
}

/// Every matrix under `layers`
pub(crate) fn check_layers(
    root: &Group,
    expected: Option<(usize, usize)>,
    report: &mut ValidationReport,
) {
    let layers = match root.contains("layers") {
        Ok(false) => return,
        Ok(true) => root.group("layers").and_then(|group| {
            let names = group.children()?;
            Ok((group, names))
        }),
        Err(e) => Err(e),
    };
    match layers {
        Ok((group, names)) => {
            for name in names {
                check_matrix(&group, &name, &format!("layer '{}'", name), expected, report);
            }
        }
        Err(e) => report.add_check(ValidationCheck::failed("layers", e.to_string())),
    }
}

fn check_matrix(
    parent: &Group,
    name: &str,
    label: &str,
    expected: Option<(usize, usize)>,
    report: &mut ValidationReport,
) {
    let matrix = match Matrix::open(parent, name) {
        Ok(matrix) => matrix,
        Err(e) => {
            report.add_check(ValidationCheck::failed(format!("{} encoding", label), e.to_string()));
            return;
        }
    };
    report.add_check(ValidationCheck::ok(format!("{} encoding", label)));

    let shape = matrix.shape();
    match expected {
        Some(expected) if expected != shape => report.add_check(ValidationCheck::failed(
            format!("{} shape", label),
            format!(
                "{:?} does not match (n_obs, n_vars) = {:?}",
                shape, expected
            ),
        )),
        Some(_) => report.add_check(ValidationCheck::ok(format!("{} shape", label))),
        None => report.add_check(ValidationCheck::warning(
            format!("{} shape", label),
            "obs or var is unreadable, shape not checked",
        )),
    }

    match matrix.data_type() {
        Ok(ScalarType::String) => report.add_check(ValidationCheck::failed(
            format!("{} values", label),
            "values are strings",
        )),
        Ok(ScalarType::Bool) => report.add_check(ValidationCheck::warning(
            format!("{} values", label),
            "values are booleans",
        )),
        Ok(_) => report.add_check(ValidationCheck::ok(format!("{} values", label))),
        Err(e) => report.add_check(ValidationCheck::failed(format!("{} values", label), e.to_string())),
    }

    if let Matrix::Sparse(sparse) = &matrix {
        let name = format!("{} {} structure", label, sparse.format());
        match check_sparse(sparse) {
            Ok(None) => report.add_check(ValidationCheck::ok(name)),
            Ok(Some(problem)) => report.add_check(ValidationCheck::failed(name, problem)),
            Err(e) => report.add_check(ValidationCheck::failed(name, e.to_string())),
        }
    }
}

/// First inconsistency between `indptr` and `indices`, if any
fn check_sparse(matrix: &SparseMatrix) -> Result<Option<String>, ContainerError> {
    let (rows, cols) = matrix.shape();
    let minor = match matrix.format() {
        SparseFormat::Csr => cols,
        SparseFormat::Csc => rows,
    };
    let indptr = matrix.indptr()?;
    let indices = matrix.indices()?;

    if indptr.first().copied().unwrap_or(0) != 0 {
        return Ok(Some("indptr does not start at 0".to_string()));
    }
    if let Some(w) = indptr.windows(2).find(|w| w[1] < w[0]) {
        return Ok(Some(format!("indptr decreases from {} to {}", w[0], w[1])));
    }
    let last = indptr.last().copied().unwrap_or(0);
    if last != matrix.nnz() as i64 {
        return Ok(Some(format!(
            "indptr ends at {}, but {} values are stored",
            last,
            matrix.nnz()
        )));
    }
    if let Some(index) = indices.iter().find(|&&i| i < 0 || i as usize >= minor) {
        return Ok(Some(format!(
            "index {} is out of bounds for {} entries",
            index, minor
        )));
    }
    Ok(None)
}
