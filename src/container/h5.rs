//! HDF5 backend for `.h5ad` files.
//!
//! Requires the `hdf5` feature flag and a system HDF5 library installation.

use std::ops::Range;
use std::path::Path;

use hdf5::types::{FloatSize, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Attribute, Container as H5Container, Dataset, File, H5Type, Location};
use log::debug;

use super::backend::{element_count, normalize_path, row_span};
use super::{ArrayData, AttributeValue, Backend, ContainerError, NodeKind, ScalarType};

/// Reader for HDF5 files
pub struct Hdf5Backend {
    file: File,
}

impl Hdf5Backend {
    /// Open an HDF5 file read-only
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        debug!("Opening HDF5 file {}", path.display());
        Ok(Self {
            file: File::open(path)?,
        })
    }

    /// Walk `path` one link at a time so that missing parents are not errors
    fn exists(&self, path: &str) -> bool {
        let mut current = String::new();
        for part in path.split('/') {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(part);
            if !self.file.link_exists(&current) {
                return false;
            }
        }
        true
    }

    fn location(&self, path: &str) -> Result<Location, ContainerError> {
        let path = normalize_path(path);
        if path.is_empty() {
            let root: &Location = &self.file;
            return Ok(root.clone());
        }
        if !self.exists(&path) {
            return Err(ContainerError::not_found(&path));
        }
        if let Ok(group) = self.file.group(&path) {
            let location: &Location = &group;
            return Ok(location.clone());
        }
        let dataset = self.file.dataset(&path)?;
        let location: &Location = &dataset;
        Ok(location.clone())
    }

    fn dataset(&self, path: &str) -> Result<Dataset, ContainerError> {
        let path = normalize_path(path);
        if !self.exists(&path) {
            return Err(ContainerError::not_found(&path));
        }
        Ok(self.file.dataset(&path)?)
    }
}

fn scalar_type(path: &str, descriptor: &TypeDescriptor) -> Result<ScalarType, ContainerError> {
    use hdf5::types::IntSize;

    Ok(match descriptor {
        TypeDescriptor::Boolean => ScalarType::Bool,
        TypeDescriptor::Integer(IntSize::U1) => ScalarType::Int8,
        TypeDescriptor::Integer(IntSize::U2) => ScalarType::Int16,
        TypeDescriptor::Integer(IntSize::U4) => ScalarType::Int32,
        TypeDescriptor::Integer(IntSize::U8) => ScalarType::Int64,
        TypeDescriptor::Unsigned(IntSize::U1) => ScalarType::UInt8,
        TypeDescriptor::Unsigned(IntSize::U2) => ScalarType::UInt16,
        TypeDescriptor::Unsigned(IntSize::U4) => ScalarType::UInt32,
        TypeDescriptor::Unsigned(IntSize::U8) => ScalarType::UInt64,
        TypeDescriptor::Float(FloatSize::U4) => ScalarType::Float32,
        TypeDescriptor::Float(FloatSize::U8) => ScalarType::Float64,
        TypeDescriptor::VarLenUnicode | TypeDescriptor::VarLenAscii => ScalarType::String,
        other => {
            return Err(ContainerError::Unsupported(format!(
                "HDF5 type {:?} at '{}'",
                other, path
            )))
        }
    })
}

fn u64_to_i64(path: &str, values: Vec<u64>) -> Result<Vec<i64>, ContainerError> {
    values
        .into_iter()
        .map(|v| {
            i64::try_from(v).map_err(|_| {
                ContainerError::Unsupported(format!(
                    "uint64 value {} at '{}' exceeds the int64 range",
                    v, path
                ))
            })
        })
        .collect()
}

fn read_all<T: H5Type>(container: &H5Container) -> Result<Vec<T>, ContainerError> {
    Ok(container.read_raw::<T>()?)
}

/// Hyperslab of whole leading-axis rows of a rank-1 or rank-2 dataset
fn read_rows<T: H5Type + Clone>(
    dataset: &Dataset,
    rank: usize,
    rows: Range<usize>,
) -> Result<Vec<T>, ContainerError> {
    Ok(if rank == 1 {
        dataset.read_slice_1d::<T, _>(rows)?.iter().cloned().collect()
    } else {
        dataset.read_slice_2d::<T, _>((rows, ..))?.iter().cloned().collect()
    })
}

/// Decode through `$read::<T>(args)` with `T` picked from the HDF5 type
macro_rules! read_container {
    ($path:expr, $descriptor:expr, $read:ident($($arg:expr),*)) => {{
        match scalar_type($path, $descriptor)? {
            ScalarType::Bool => ArrayData::Bool($read::<bool>($($arg),*)?),
            ScalarType::UInt64 => ArrayData::Int(u64_to_i64($path, $read::<u64>($($arg),*)?)?),
            t if t.is_integer() => ArrayData::Int($read::<i64>($($arg),*)?),
            t if t.is_float() => ArrayData::Float($read::<f64>($($arg),*)?),
            _ => match $descriptor {
                TypeDescriptor::VarLenAscii => ArrayData::Str(
                    $read::<VarLenAscii>($($arg),*)?
                        .iter()
                        .map(|s| s.as_str().to_string())
                        .collect(),
                ),
                _ => ArrayData::Str(
                    $read::<VarLenUnicode>($($arg),*)?
                        .iter()
                        .map(|s| s.as_str().to_string())
                        .collect(),
                ),
            },
        }
    }};
}

fn read_attribute(path: &str, attr: &Attribute) -> Result<AttributeValue, ContainerError> {
    let descriptor = attr.dtype()?.to_descriptor()?;
    let data = read_container!(path, &descriptor, read_all(attr));
    if attr.ndim() > 0 {
        return Ok(AttributeValue::Array(data));
    }
    Ok(match data {
        ArrayData::Bool(v) => v.first().copied().map(AttributeValue::Bool),
        ArrayData::Int(v) => v.first().copied().map(AttributeValue::Int),
        ArrayData::Float(v) => v.first().copied().map(AttributeValue::Float),
        ArrayData::Str(v) => v.into_iter().next().map(AttributeValue::Str),
    }
    .ok_or_else(|| ContainerError::invalid_format(path, "empty scalar attribute"))?)
}

impl Backend for Hdf5Backend {
    fn format_name(&self) -> &'static str {
        "hdf5"
    }

    fn node_kind(&self, path: &str) -> Result<Option<NodeKind>, ContainerError> {
        let path = normalize_path(path);
        if path.is_empty() {
            return Ok(Some(NodeKind::Group));
        }
        if !self.exists(&path) {
            return Ok(None);
        }
        if self.file.group(&path).is_ok() {
            Ok(Some(NodeKind::Group))
        } else if self.file.dataset(&path).is_ok() {
            Ok(Some(NodeKind::Dataset))
        } else {
            Ok(None)
        }
    }

    fn children(&self, path: &str) -> Result<Vec<String>, ContainerError> {
        let path = normalize_path(path);
        let mut names = if path.is_empty() {
            self.file.member_names()?
        } else {
            if !self.exists(&path) {
                return Err(ContainerError::not_found(&path));
            }
            self.file.group(&path)?.member_names()?
        };
        names.sort();
        Ok(names)
    }

    fn attribute_names(&self, path: &str) -> Result<Vec<String>, ContainerError> {
        let mut names = self.location(path)?.attr_names()?;
        names.sort();
        Ok(names)
    }

    fn attribute(&self, path: &str, name: &str) -> Result<Option<AttributeValue>, ContainerError> {
        let location = self.location(path)?;
        if !location.attr_names()?.iter().any(|n| n == name) {
            return Ok(None);
        }
        let attr = location.attr(name)?;
        read_attribute(path, &attr).map(Some)
    }

    fn dataset_shape(&self, path: &str) -> Result<Vec<usize>, ContainerError> {
        let shape = self.dataset(path)?.shape();
        element_count(path, &shape)?;
        Ok(shape)
    }

    fn dataset_type(&self, path: &str) -> Result<ScalarType, ContainerError> {
        let descriptor = self.dataset(path)?.dtype()?.to_descriptor()?;
        scalar_type(path, &descriptor)
    }

    fn read_dataset(&self, path: &str) -> Result<ArrayData, ContainerError> {
        let dataset = self.dataset(path)?;
        let descriptor = dataset.dtype()?.to_descriptor()?;
        Ok(read_container!(path, &descriptor, read_all(&dataset)))
    }

    /// Read a hyperslab of the rows that cover the range
    fn read_dataset_range(
        &self,
        path: &str,
        start: usize,
        len: usize,
    ) -> Result<ArrayData, ContainerError> {
        let dataset = self.dataset(path)?;
        let shape = dataset.shape();
        let (data, offset) = match row_span(path, &shape, start, len)? {
            Some(span) if shape.len() <= 2 => {
                let descriptor = dataset.dtype()?.to_descriptor()?;
                let rank = shape.len();
                let rows = span.rows;
                let data = read_container!(path, &descriptor, read_rows(&dataset, rank, rows.clone()));
                (data, span.offset)
            }
            _ => (self.read_dataset(path)?, start),
        };
        let total = data.len();
        data.slice(offset, len).ok_or(ContainerError::IndexOutOfBounds {
            index: start.saturating_add(len),
            len: total,
        })
    }
}
