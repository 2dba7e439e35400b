//! Storage backend abstraction.
//!
//! A backend exposes a hierarchical store addressed by slash-separated paths
//! relative to the root (`""` is the root itself, `"layers/raw"` a nested
//! node). Backends are format readers only: they know nothing about AnnData.

use std::fmt;
use std::ops::Range;

use super::ContainerError;

/// Kind of node found at a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A group holding other nodes
    Group,
    /// An n-dimensional array
    Dataset,
}

/// Declared element type of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Boolean
    Bool,
    /// Signed 8-bit integer
    Int8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Unsigned 32-bit integer
    UInt32,
    /// Unsigned 64-bit integer
    UInt64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Text
    String,
}

impl ScalarType {
    /// Whether values of this type decode to [`ArrayData::Int`]
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ScalarType::Int8
                | ScalarType::Int16
                | ScalarType::Int32
                | ScalarType::Int64
                | ScalarType::UInt8
                | ScalarType::UInt16
                | ScalarType::UInt32
                | ScalarType::UInt64
        )
    }

    /// Whether values of this type decode to [`ArrayData::Float`]
    pub fn is_float(&self) -> bool {
        matches!(self, ScalarType::Float32 | ScalarType::Float64)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Bool => "bool",
            ScalarType::Int8 => "int8",
            ScalarType::Int16 => "int16",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::UInt8 => "uint8",
            ScalarType::UInt16 => "uint16",
            ScalarType::UInt32 => "uint32",
            ScalarType::UInt64 => "uint64",
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
            ScalarType::String => "string",
        };
        f.write_str(name)
    }
}

/// Decoded contents of a dataset, flattened in row-major order
///
/// Integer types of every width decode to `Int`, both float widths to `Float`.
/// The declared width is available from [`Backend::dataset_type`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    /// Boolean values
    Bool(Vec<bool>),
    /// Integer values
    Int(Vec<i64>),
    /// Floating point values
    Float(Vec<f64>),
    /// Text values
    Str(Vec<String>),
}

impl ArrayData {
    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Bool(v) => v.len(),
            ArrayData::Int(v) => v.len(),
            ArrayData::Float(v) => v.len(),
            ArrayData::Str(v) => v.len(),
        }
    }

    /// Whether there are no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ArrayData::Bool(_) => "bool",
            ArrayData::Int(_) => "integer",
            ArrayData::Float(_) => "float",
            ArrayData::Str(_) => "string",
        }
    }

    /// Copy of the elements in `start..start + len`
    pub fn slice(&self, start: usize, len: usize) -> Option<ArrayData> {
        let end = start.checked_add(len)?;
        if end > self.len() {
            return None;
        }
        Some(match self {
            ArrayData::Bool(v) => ArrayData::Bool(v[start..end].to_vec()),
            ArrayData::Int(v) => ArrayData::Int(v[start..end].to_vec()),
            ArrayData::Float(v) => ArrayData::Float(v[start..end].to_vec()),
            ArrayData::Str(v) => ArrayData::Str(v[start..end].to_vec()),
        })
    }

    /// Numeric values as `f64`; booleans map to 0 and 1
    pub fn to_f64(&self) -> Option<Vec<f64>> {
        match self {
            ArrayData::Bool(v) => Some(v.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect()),
            ArrayData::Int(v) => Some(v.iter().map(|&x| x as f64).collect()),
            ArrayData::Float(v) => Some(v.clone()),
            ArrayData::Str(_) => None,
        }
    }
}

/// Value of an attribute attached to a group or dataset
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Scalar boolean
    Bool(bool),
    /// Scalar integer
    Int(i64),
    /// Scalar float
    Float(f64),
    /// Scalar string
    Str(String),
    /// One-dimensional array
    Array(ArrayData),
}

impl AttributeValue {
    /// The value as a string, if it is a scalar string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a boolean; integers 0 and 1 are accepted
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            AttributeValue::Int(0) => Some(false),
            AttributeValue::Int(1) => Some(true),
            _ => None,
        }
    }

    /// The value as a list of integers; a scalar integer is a list of one
    pub fn as_int_array(&self) -> Option<Vec<i64>> {
        match self {
            AttributeValue::Int(i) => Some(vec![*i]),
            AttributeValue::Array(ArrayData::Int(v)) => Some(v.clone()),
            // JSON stores cannot tell an empty int list from an empty float list
            AttributeValue::Array(ArrayData::Float(v)) if v.is_empty() => Some(Vec::new()),
            _ => None,
        }
    }

    /// The value as a list of strings; a scalar string is a list of one
    pub fn as_str_array(&self) -> Option<Vec<String>> {
        match self {
            AttributeValue::Str(s) => Some(vec![s.clone()]),
            AttributeValue::Array(ArrayData::Str(v)) => Some(v.clone()),
            AttributeValue::Array(a) if a.is_empty() => Some(Vec::new()),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Str(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Str(s)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Int(i)
    }
}

impl From<f64> for AttributeValue {
    fn from(x: f64) -> Self {
        AttributeValue::Float(x)
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(v: Vec<i64>) -> Self {
        AttributeValue::Array(ArrayData::Int(v))
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(v: Vec<String>) -> Self {
        AttributeValue::Array(ArrayData::Str(v))
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(v: Vec<&str>) -> Self {
        AttributeValue::Array(ArrayData::Str(v.into_iter().map(str::to_string).collect()))
    }
}

/// Read access to a hierarchical store
///
/// Implementations are not expected to be thread-safe; a
/// [`Container`](super::Container) never shares its backend across threads.
pub trait Backend {
    /// Short description of the store format, for logs and reports
    fn format_name(&self) -> &'static str;

    /// Kind of the node at `path`, `None` if nothing exists there
    fn node_kind(&self, path: &str) -> Result<Option<NodeKind>, ContainerError>;

    /// Names of the direct children of the group at `path`, sorted
    fn children(&self, path: &str) -> Result<Vec<String>, ContainerError>;

    /// Names of the attributes of the node at `path`, sorted
    fn attribute_names(&self, path: &str) -> Result<Vec<String>, ContainerError>;

    /// Value of attribute `name` of the node at `path`
    fn attribute(&self, path: &str, name: &str) -> Result<Option<AttributeValue>, ContainerError>;

    /// Shape of the dataset at `path`; empty for a scalar dataset
    fn dataset_shape(&self, path: &str) -> Result<Vec<usize>, ContainerError>;

    /// Declared element type of the dataset at `path`
    fn dataset_type(&self, path: &str) -> Result<ScalarType, ContainerError>;

    /// Read the whole dataset at `path`
    fn read_dataset(&self, path: &str) -> Result<ArrayData, ContainerError>;

    /// Read `len` elements starting at flat offset `start`.
    ///
    /// The default implementation reads the whole dataset and copies the
    /// requested range out of it.
    fn read_dataset_range(
        &self,
        path: &str,
        start: usize,
        len: usize,
    ) -> Result<ArrayData, ContainerError> {
        let data = self.read_dataset(path)?;
        let total = data.len();
        data.slice(start, len).ok_or(ContainerError::IndexOutOfBounds {
            index: start.saturating_add(len),
            len: total,
        })
    }
}

/// Join a parent path and a child name
pub(crate) fn join_path(parent: &str, child: &str) -> String {
    let parent = parent.trim_matches('/');
    let child = child.trim_matches('/');
    if parent.is_empty() {
        child.to_string()
    } else if child.is_empty() {
        parent.to_string()
    } else {
        format!("{}/{}", parent, child)
    }
}

/// Canonical form of a path: no leading, trailing or repeated slashes
pub(crate) fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Number of elements in an array of `shape`
///
/// Fails when the count, taken as 8-byte values, would not fit in memory.
pub(crate) fn element_count(path: &str, shape: &[usize]) -> Result<usize, ContainerError> {
    shape
        .iter()
        .try_fold(1usize, |count, &dim| count.checked_mul(dim))
        .filter(|&count| {
            count
                .checked_mul(std::mem::size_of::<f64>())
                .map_or(false, |bytes| bytes <= isize::MAX as usize)
        })
        .ok_or_else(|| {
            ContainerError::invalid_format(path, format!("shape {:?} is too large", shape))
        })
}

/// Leading-axis rows holding a flat element range
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RowSpan {
    /// Rows to read
    pub(crate) rows: Range<usize>,
    /// Flat offset of the first requested element within those rows
    pub(crate) offset: usize,
}

/// Rows of an array of `shape` covering `start..start + len`; `None` for a scalar
pub(crate) fn row_span(
    path: &str,
    shape: &[usize],
    start: usize,
    len: usize,
) -> Result<Option<RowSpan>, ContainerError> {
    let total = element_count(path, shape)?;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= total)
        .ok_or(ContainerError::IndexOutOfBounds {
            index: start.saturating_add(len),
            len: total,
        })?;
    let Some((_, inner)) = shape.split_first() else {
        return Ok(None);
    };
    let row_len = element_count(path, inner)?;
    if len == 0 || row_len == 0 {
        return Ok(Some(RowSpan {
            rows: 0..0,
            offset: 0,
        }));
    }
    let first = start / row_len;
    let last = (end - 1) / row_len;
    Ok(Some(RowSpan {
        rows: first..last + 1,
        offset: start - first * row_len,
    }))
}
