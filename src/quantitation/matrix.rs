use super::QuantitationError;

/// Immutable row-major matrix of expression values
///
/// Rows are measured features (genes, transcripts), columns are samples. Non-finite
/// values are accepted and treated as missing by every statistic computed on
/// the matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionMatrix {
    rows: usize,
    columns: usize,
    values: Vec<f64>,
    row_names: Option<Vec<String>>,
    column_names: Option<Vec<String>>,
}

impl ExpressionMatrix {
    /// Create a matrix from row-major values
    pub fn new(rows: usize, columns: usize, values: Vec<f64>) -> Result<Self, QuantitationError> {
        if rows.checked_mul(columns) != Some(values.len()) {
            return Err(QuantitationError::InvalidArgument(format!(
                "expected {} values for a {}x{} matrix, got {}",
                rows.saturating_mul(columns),
                rows,
                columns,
                values.len()
            )));
        }
        Ok(Self {
            rows,
            columns,
            values,
            row_names: None,
            column_names: None,
        })
    }

    /// Create a matrix from a list of rows, which must all have the same length
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, QuantitationError> {
        let n_rows = rows.len();
        let n_columns = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(n_rows * n_columns);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_columns {
                return Err(QuantitationError::InvalidArgument(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    n_columns
                )));
            }
            values.extend(row);
        }
        Self::new(n_rows, n_columns, values)
    }

    /// Attach row names
    pub fn with_row_names(mut self, names: Vec<String>) -> Result<Self, QuantitationError> {
        if names.len() != self.rows {
            return Err(QuantitationError::InvalidArgument(format!(
                "{} row names given for {} rows",
                names.len(),
                self.rows
            )));
        }
        self.row_names = Some(names);
        Ok(self)
    }

    /// Attach column (sample) names
    pub fn with_column_names(mut self, names: Vec<String>) -> Result<Self, QuantitationError> {
        if names.len() != self.columns {
            return Err(QuantitationError::InvalidArgument(format!(
                "{} column names given for {} columns",
                names.len(),
                self.columns
            )));
        }
        self.column_names = Some(names);
        Ok(self)
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Whether the matrix has no rows or no columns
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.columns == 0
    }

    /// Value at row `i`, column `j`
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i < self.rows && j < self.columns {
            Some(self.values[i * self.columns + j])
        } else {
            None
        }
    }

    /// All values in row-major order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate over the values of column `j`
    pub fn column(&self, j: usize) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().skip(j).step_by(self.columns.max(1)).copied()
    }

    /// Name of row `i`, if names were attached
    pub fn row_name(&self, i: usize) -> Option<&str> {
        self.row_names.as_ref().and_then(|n| n.get(i)).map(String::as_str)
    }

    /// Name of column `j`, if names were attached
    pub fn column_name(&self, j: usize) -> Option<&str> {
        self.column_names.as_ref().and_then(|n| n.get(j)).map(String::as_str)
    }

    /// Apply `f` to every value, keeping names
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            rows: self.rows,
            columns: self.columns,
            values: self.values.iter().map(|&x| f(x)).collect(),
            row_names: self.row_names.clone(),
            column_names: self.column_names.clone(),
        }
    }
}
