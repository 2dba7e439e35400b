use std::fmt;

use super::encoding::{check_encoding, require_attr, CATEGORICAL, ORDERED};
use crate::container::{ArrayData, ContainerError, Dataset, Group};

/// Element types that dataset contents can be decoded into
pub trait Element: Sized + Clone {
    /// Name of the element type, for error messages
    const KIND: &'static str;

    /// Convert decoded dataset contents, failing if the data does not fit
    fn from_array(path: &str, data: ArrayData) -> Result<Vec<Self>, ContainerError>;
}

fn mismatch(path: &str, expected: &str, data: &ArrayData) -> ContainerError {
    ContainerError::invalid_format(
        path,
        format!("expected {} data, found {} data", expected, data.kind()),
    )
}

impl Element for bool {
    const KIND: &'static str = "bool";

    fn from_array(path: &str, data: ArrayData) -> Result<Vec<Self>, ContainerError> {
        match data {
            ArrayData::Bool(v) => Ok(v),
            ArrayData::Int(v) if v.iter().all(|&x| x == 0 || x == 1) => {
                Ok(v.into_iter().map(|x| x == 1).collect())
            }
            other => Err(mismatch(path, Self::KIND, &other)),
        }
    }
}

impl Element for i64 {
    const KIND: &'static str = "integer";

    fn from_array(path: &str, data: ArrayData) -> Result<Vec<Self>, ContainerError> {
        match data {
            ArrayData::Int(v) => Ok(v),
            ArrayData::Bool(v) => Ok(v.into_iter().map(i64::from).collect()),
            other => Err(mismatch(path, Self::KIND, &other)),
        }
    }
}

impl Element for f64 {
    const KIND: &'static str = "float";

    fn from_array(path: &str, data: ArrayData) -> Result<Vec<Self>, ContainerError> {
        match data {
            ArrayData::Float(v) => Ok(v),
            ArrayData::Int(v) => Ok(v.into_iter().map(|x| x as f64).collect()),
            other => Err(mismatch(path, Self::KIND, &other)),
        }
    }
}

impl Element for String {
    const KIND: &'static str = "string";

    /// Numbers and booleans are formatted
    fn from_array(_path: &str, data: ArrayData) -> Result<Vec<Self>, ContainerError> {
        Ok(match data {
            ArrayData::Str(v) => v,
            ArrayData::Int(v) => v.into_iter().map(|x| x.to_string()).collect(),
            ArrayData::Float(v) => v.into_iter().map(|x| x.to_string()).collect(),
            ArrayData::Bool(v) => v.into_iter().map(|x| x.to_string()).collect(),
        })
    }
}

/// A single element of any supported type
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Text
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl Element for Value {
    const KIND: &'static str = "any";

    fn from_array(_path: &str, data: ArrayData) -> Result<Vec<Self>, ContainerError> {
        Ok(match data {
            ArrayData::Bool(v) => v.into_iter().map(Value::Bool).collect(),
            ArrayData::Int(v) => v.into_iter().map(Value::Int).collect(),
            ArrayData::Float(v) => v.into_iter().map(Value::Float).collect(),
            ArrayData::Str(v) => v.into_iter().map(Value::Str).collect(),
        })
    }
}

/// Child dataset `name` of an encoded group; its absence breaks the encoding
pub(crate) fn required_dataset(group: &Group, name: &str) -> Result<Dataset, ContainerError> {
    if !group.contains(name)? {
        return Err(ContainerError::invalid_format(
            group.path(),
            format!("missing '{}' dataset", name),
        ));
    }
    group.dataset(name)
}

/// One-dimensional dataset read as `T`
pub(crate) fn read_vector<T: Element>(dataset: &Dataset) -> Result<Vec<T>, ContainerError> {
    let shape = dataset.shape()?;
    if shape.len() != 1 {
        return Err(ContainerError::invalid_format(
            dataset.path(),
            format!("expected a one-dimensional dataset, found shape {:?}", shape),
        ));
    }
    T::from_array(dataset.path(), dataset.read()?)
}

fn check_index(index: usize, len: usize) -> Result<(), ContainerError> {
    if index >= len {
        Err(ContainerError::IndexOutOfBounds { index, len })
    } else {
        Ok(())
    }
}

/// Categorical column: integer codes into a table of categories
///
/// A code of `-1` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalArray<T> {
    categories: Vec<T>,
    codes: Vec<i64>,
    ordered: bool,
}

impl<T: Element> CategoricalArray<T> {
    /// Decode the categorical group `group`
    pub(crate) fn read(group: &Group) -> Result<Self, ContainerError> {
        check_encoding(group, &[CATEGORICAL])?;
        let ordered = match require_attr(group, ORDERED)?.as_bool() {
            Some(ordered) => ordered,
            None => {
                return Err(ContainerError::InvalidEncodingAttribute {
                    path: group.path().to_string(),
                    attribute: ORDERED.to_string(),
                    expected: "a boolean".to_string(),
                    actual: "a non-boolean value".to_string(),
                })
            }
        };
        let categories = read_vector::<T>(&required_dataset(group, "categories")?)?;
        let codes = read_vector::<i64>(&required_dataset(group, "codes")?)?;
        Self::new(group.path(), categories, codes, ordered)
    }

    fn new(path: &str, categories: Vec<T>, codes: Vec<i64>, ordered: bool) -> Result<Self, ContainerError> {
        let n = categories.len() as i64;
        if let Some(code) = codes.iter().find(|&&c| c < -1 || c >= n) {
            return Err(ContainerError::invalid_format(
                path,
                format!("code {} does not refer to one of {} categories", code, n),
            ));
        }
        Ok(Self {
            categories,
            codes,
            ordered,
        })
    }
}

impl<T> CategoricalArray<T> {
    /// Category of element `i`, `None` if it is missing
    pub fn get(&self, i: usize) -> Result<Option<&T>, ContainerError> {
        check_index(i, self.codes.len())?;
        let code = self.codes[i];
        Ok(if code < 0 {
            None
        } else {
            self.categories.get(code as usize)
        })
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether there are no elements
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Table of categories
    pub fn categories(&self) -> &[T] {
        &self.categories
    }

    /// Codes, `-1` for missing values
    pub fn codes(&self) -> &[i64] {
        &self.codes
    }

    /// Whether the categories have a meaningful order
    pub fn ordered(&self) -> bool {
        self.ordered
    }
}

impl<T: Clone> CategoricalArray<T> {
    /// Every element, `None` where missing
    pub fn to_vec(&self) -> Vec<Option<T>> {
        self.codes
            .iter()
            .map(|&code| {
                if code < 0 {
                    None
                } else {
                    self.categories.get(code as usize).cloned()
                }
            })
            .collect()
    }
}

/// Column with a parallel presence mask
///
/// Element `i` is present when `mask[i]` is true.
#[derive(Debug, Clone, PartialEq)]
pub struct NullableArray<T> {
    values: Vec<T>,
    mask: Vec<bool>,
}

impl<T: Element> NullableArray<T> {
    /// Decode the nullable group `group` of encoding `encoding`
    pub(crate) fn read(group: &Group, encoding: &str) -> Result<Self, ContainerError> {
        check_encoding(group, &[encoding])?;
        let values = read_vector::<T>(&required_dataset(group, "values")?)?;
        let mask = read_vector::<bool>(&required_dataset(group, "mask")?)?;
        if values.len() != mask.len() {
            return Err(ContainerError::invalid_format(
                group.path(),
                format!(
                    "{} values but {} mask entries",
                    values.len(),
                    mask.len()
                ),
            ));
        }
        Ok(Self { values, mask })
    }
}

impl<T> NullableArray<T> {
    /// Element `i`, `None` if it is masked out
    pub fn get(&self, i: usize) -> Result<Option<&T>, ContainerError> {
        check_index(i, self.values.len())?;
        Ok(if self.mask[i] {
            Some(&self.values[i])
        } else {
            None
        })
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no elements
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw values, including the masked ones
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Presence mask
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }
}

impl<T: Clone> NullableArray<T> {
    /// Every element, `None` where masked out
    pub fn to_vec(&self) -> Vec<Option<T>> {
        self.values
            .iter()
            .zip(&self.mask)
            .map(|(value, &present)| present.then(|| value.clone()))
            .collect()
    }
}
