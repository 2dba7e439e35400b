use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};
use std::fmt;

use log::warn;

use super::array::{read_vector, CategoricalArray, Element, NullableArray, Value};
use super::encoding::{
    check_encoding, child_encoding_type, require_attr, require_string_attr, ARRAY, CATEGORICAL,
    COLUMN_ENCODINGS, COLUMN_ORDER, DATAFRAME, ENCODING_TYPE, ENCODING_VERSION, INDEX,
    NULLABLE_BOOLEAN, NULLABLE_INTEGER, STRING_ARRAY,
};
use crate::container::{join_path, ArrayData, ContainerError, Dataset, Group, ScalarType};

/// Decoded dataframe column
///
/// Resolved once from the column's `encoding-type`.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Plain array (`array`)
    Array(ArrayData),
    /// Array of strings (`string-array`)
    StringArray(Vec<String>),
    /// Codes into a category table (`categorical`)
    Categorical(CategoricalArray<Value>),
    /// Integers with a presence mask (`nullable-integer`)
    NullableInteger(NullableArray<i64>),
    /// Booleans with a presence mask (`nullable-boolean`)
    NullableBoolean(NullableArray<bool>),
}

impl Column {
    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            Column::Array(data) => data.len(),
            Column::StringArray(v) => v.len(),
            Column::Categorical(c) => c.len(),
            Column::NullableInteger(n) => n.len(),
            Column::NullableBoolean(n) => n.len(),
        }
    }

    /// Whether there are no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encoding the column was read from
    pub fn encoding_type(&self) -> &'static str {
        match self {
            Column::Array(_) => ARRAY,
            Column::StringArray(_) => STRING_ARRAY,
            Column::Categorical(_) => CATEGORICAL,
            Column::NullableInteger(_) => NULLABLE_INTEGER,
            Column::NullableBoolean(_) => NULLABLE_BOOLEAN,
        }
    }

    /// Element `i`, `None` where it is missing
    pub fn get(&self, i: usize) -> Result<Option<Value>, ContainerError> {
        if i >= self.len() {
            return Err(ContainerError::IndexOutOfBounds {
                index: i,
                len: self.len(),
            });
        }
        Ok(match self {
            Column::Array(data) => array_value(data, i),
            Column::StringArray(v) => Some(Value::Str(v[i].clone())),
            Column::Categorical(c) => c.get(i)?.cloned(),
            Column::NullableInteger(n) => n.get(i)?.copied().map(Value::Int),
            Column::NullableBoolean(n) => n.get(i)?.copied().map(Value::Bool),
        })
    }

    /// Every element, `None` where missing
    pub fn to_values(&self) -> Vec<Option<Value>> {
        match self {
            Column::Array(data) => (0..data.len()).map(|i| array_value(data, i)).collect(),
            Column::StringArray(v) => v.iter().cloned().map(Value::Str).map(Some).collect(),
            Column::Categorical(c) => c.to_vec(),
            Column::NullableInteger(n) => n
                .to_vec()
                .into_iter()
                .map(|v| v.map(Value::Int))
                .collect(),
            Column::NullableBoolean(n) => n
                .to_vec()
                .into_iter()
                .map(|v| v.map(Value::Bool))
                .collect(),
        }
    }

    /// Position of the first element equal to `value`
    pub fn position(&self, value: &Value) -> Option<usize> {
        self.to_values()
            .iter()
            .position(|v| v.as_ref() == Some(value))
    }

    /// Distinct values in order of first appearance, missing ones left out
    ///
    /// A categorical column yields its whole category table, used or not.
    pub fn unique_values(&self) -> Vec<Value> {
        if let Column::Categorical(c) = self {
            return c.categories().to_vec();
        }
        let values = self.to_values();
        let mut seen = HashSet::new();
        values
            .iter()
            .flatten()
            .filter(|v| seen.insert(ValueKey::of(*v)))
            .cloned()
            .collect()
    }
}

fn array_value(data: &ArrayData, i: usize) -> Option<Value> {
    match data {
        ArrayData::Bool(v) => v.get(i).copied().map(Value::Bool),
        ArrayData::Int(v) => v.get(i).copied().map(Value::Int),
        ArrayData::Float(v) => v.get(i).copied().map(Value::Float),
        ArrayData::Str(v) => v.get(i).cloned().map(Value::Str),
    }
}

/// Hashable identity of a [`Value`]; `0.0` and `-0.0` are the same float
#[derive(PartialEq, Eq, Hash)]
enum ValueKey<'a> {
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(&'a str),
}

impl<'a> ValueKey<'a> {
    fn of(value: &'a Value) -> Self {
        match value {
            Value::Bool(b) => ValueKey::Bool(*b),
            Value::Int(i) => ValueKey::Int(*i),
            Value::Float(x) if *x == 0.0 => ValueKey::Float(0f64.to_bits()),
            Value::Float(x) => ValueKey::Float(x.to_bits()),
            Value::Str(s) => ValueKey::Str(s),
        }
    }
}

/// Columnar table of per-observation or per-variable annotations
pub struct Dataframe {
    group: Group,
    index_column: String,
    column_order: Vec<String>,
    len: usize,
    rows_by_key: OnceCell<HashMap<String, usize>>,
}

impl Dataframe {
    /// Validate the dataframe group `group`
    ///
    /// The group must carry `encoding-type = "dataframe"`, an
    /// `encoding-version`, an `_index` naming an existing one-dimensional
    /// dataset, and a `column-order` listing existing columns.
    pub(crate) fn open(group: Group) -> Result<Self, ContainerError> {
        check_encoding(&group, &[DATAFRAME])?;
        require_attr(&group, ENCODING_VERSION)?;
        let index_column = require_string_attr(&group, INDEX)?;

        let column_order = require_attr(&group, COLUMN_ORDER)?
            .as_str_array()
            .ok_or_else(|| ContainerError::InvalidEncodingAttribute {
                path: group.path().to_string(),
                attribute: COLUMN_ORDER.to_string(),
                expected: "a list of column names".to_string(),
                actual: "a non-string value".to_string(),
            })?;

        if !group.contains(&index_column)? {
            return Err(ContainerError::invalid_format(
                group.path(),
                format!("index column '{}' does not exist", index_column),
            ));
        }
        let index_shape = group.dataset(&index_column)?.shape()?;
        let len = match index_shape.as_slice() {
            [n] => *n,
            _ => {
                return Err(ContainerError::invalid_format(
                    group.path(),
                    format!("index must be one-dimensional, found shape {:?}", index_shape),
                ))
            }
        };

        for column in &column_order {
            if !group.contains(column)? {
                return Err(ContainerError::invalid_format(
                    group.path(),
                    format!("column '{}' is listed in column-order but does not exist", column),
                ));
            }
        }

        Ok(Self {
            group,
            index_column,
            column_order,
            len,
            rows_by_key: OnceCell::new(),
        })
    }

    /// Path of the dataframe group
    pub fn path(&self) -> &str {
        self.group.path()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the dataframe has no rows
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Name of the column used as index
    pub fn index_column(&self) -> &str {
        &self.index_column
    }

    /// Row labels, formatted as strings
    pub fn index(&self) -> Result<Vec<String>, ContainerError> {
        read_vector::<String>(&self.group.dataset(&self.index_column)?)
    }

    /// Row labelled `key` in the index; the first row wins when labels repeat
    ///
    /// The index is read once, on the first lookup.
    pub fn row_of(&self, key: &str) -> Result<Option<usize>, ContainerError> {
        Ok(self.rows_by_key()?.get(key).copied())
    }

    fn rows_by_key(&self) -> Result<&HashMap<String, usize>, ContainerError> {
        if let Some(rows) = self.rows_by_key.get() {
            return Ok(rows);
        }
        let mut rows = HashMap::with_capacity(self.len);
        for (row, key) in self.index()?.into_iter().enumerate() {
            rows.entry(key).or_insert(row);
        }
        Ok(self.rows_by_key.get_or_init(|| rows))
    }

    /// Element of column `name` in the row labelled `key`, `None` where missing
    pub fn value(&self, name: &str, key: &str) -> Result<Option<Value>, ContainerError> {
        let row = self.row_of(key)?.ok_or_else(|| {
            ContainerError::InvalidArgument(format!(
                "No entry with key {} found in the index of {}.",
                key,
                self.path()
            ))
        })?;
        self.column(name)?.get(row)
    }

    /// Column names in their declared order, without the index
    pub fn column_order(&self) -> &[String] {
        &self.column_order
    }

    /// Every child with a supported column encoding, the index included
    ///
    /// Children lacking an `encoding-type`, or with an encoding that is not a
    /// column encoding, are skipped with a warning.
    pub fn columns(&self) -> Result<Vec<String>, ContainerError> {
        let mut columns = Vec::new();
        for name in self.group.children()? {
            match child_encoding_type(&self.group, &name)? {
                Some(encoding) if COLUMN_ENCODINGS.contains(&encoding.as_str()) => {
                    columns.push(name)
                }
                Some(encoding) => warn!(
                    "Ignoring unknown encoding type '{}' for column '{}' of {}.",
                    encoding,
                    name,
                    self.path()
                ),
                None => warn!(
                    "Ignoring '{}' of {}: it lacks an 'encoding-type' attribute.",
                    name,
                    self.path()
                ),
            }
        }
        Ok(columns)
    }

    fn check_column_exists(&self, name: &str, encoding: Option<&str>) -> Result<(), ContainerError> {
        if self.group.contains(name)? {
            return Ok(());
        }
        let mut candidates = Vec::new();
        for column in self.columns()? {
            if encoding.is_none() || child_encoding_type(&self.group, &column)?.as_deref() == encoding
            {
                candidates.push(column);
            }
        }
        Err(ContainerError::InvalidArgument(format!(
            "There is no {} named {} in {}. Possible columns are: {}.",
            encoding.map_or_else(|| "column".to_string(), |e| format!("{} column", e)),
            name,
            self.path(),
            candidates.join(", ")
        )))
    }

    /// Declared `encoding-type` of column `name`
    pub fn column_type(&self, name: &str) -> Result<String, ContainerError> {
        self.check_column_exists(name, None)?;
        child_encoding_type(&self.group, name)?.ok_or_else(|| {
            ContainerError::MissingEncodingAttribute {
                path: join_path(self.path(), name),
                attribute: ENCODING_TYPE.to_string(),
            }
        })
    }

    /// Element type of an `array` column
    pub fn column_data_type(&self, name: &str) -> Result<ScalarType, ContainerError> {
        self.array_dataset(name)?.data_type()
    }

    /// Check that column `name` exists and is encoded as `expected`
    fn check_column_encoding(&self, name: &str, expected: &str) -> Result<(), ContainerError> {
        self.check_column_exists(name, Some(expected))?;
        let path = join_path(self.path(), name);
        match child_encoding_type(&self.group, name)? {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(ContainerError::InvalidEncodingAttribute {
                path,
                attribute: ENCODING_TYPE.to_string(),
                expected: format!("'{}'", expected),
                actual: format!("'{}'", actual),
            }),
            None => Err(ContainerError::MissingEncodingAttribute {
                path,
                attribute: ENCODING_TYPE.to_string(),
            }),
        }
    }

    fn array_dataset(&self, name: &str) -> Result<Dataset, ContainerError> {
        self.check_column_encoding(name, ARRAY)?;
        self.group.dataset(name)
    }

    /// Column `name`, which must be encoded as `array`
    pub fn array_column<T: Element>(&self, name: &str) -> Result<Vec<T>, ContainerError> {
        read_vector::<T>(&self.array_dataset(name)?)
    }

    /// Column `name`, which must be encoded as `string-array`
    pub fn string_array_column(&self, name: &str) -> Result<Vec<String>, ContainerError> {
        self.check_column_encoding(name, STRING_ARRAY)?;
        read_vector::<String>(&self.group.dataset(name)?)
    }

    /// Column `name`, which must be encoded as `categorical`
    pub fn categorical_column<T: Element>(
        &self,
        name: &str,
    ) -> Result<CategoricalArray<T>, ContainerError> {
        self.check_column_encoding(name, CATEGORICAL)?;
        CategoricalArray::read(&self.group.group(name)?)
    }

    /// Column `name`, which must be encoded as `nullable-integer`
    pub fn nullable_integer_column(&self, name: &str) -> Result<NullableArray<i64>, ContainerError> {
        self.check_column_encoding(name, NULLABLE_INTEGER)?;
        NullableArray::read(&self.group.group(name)?, NULLABLE_INTEGER)
    }

    /// Column `name`, which must be encoded as `nullable-boolean`
    pub fn nullable_boolean_column(&self, name: &str) -> Result<NullableArray<bool>, ContainerError> {
        self.check_column_encoding(name, NULLABLE_BOOLEAN)?;
        NullableArray::read(&self.group.group(name)?, NULLABLE_BOOLEAN)
    }

    /// Column `name`, decoded according to its encoding
    pub fn column(&self, name: &str) -> Result<Column, ContainerError> {
        let encoding = self.column_type(name)?;
        match encoding.as_str() {
            ARRAY => Ok(Column::Array(self.array_dataset(name)?.read()?)),
            STRING_ARRAY => Ok(Column::StringArray(self.string_array_column(name)?)),
            CATEGORICAL => Ok(Column::Categorical(self.categorical_column(name)?)),
            NULLABLE_INTEGER => Ok(Column::NullableInteger(self.nullable_integer_column(name)?)),
            NULLABLE_BOOLEAN => Ok(Column::NullableBoolean(self.nullable_boolean_column(name)?)),
            other => Err(ContainerError::Unsupported(format!(
                "column encoding '{}' of '{}'",
                other, name
            ))),
        }
    }
}

impl fmt::Debug for Dataframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataframe")
            .field("path", &self.group.path())
            .field("index_column", &self.index_column)
            .field("len", &self.len)
            .finish()
    }
}
