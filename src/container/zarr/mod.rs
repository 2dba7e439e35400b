//! Zarr backend, over a directory or a ZIP archive.
//!
//! Metadata, chunk grids and codecs are handled by `zarrs`: Zarr v2
//! hierarchies (`.zgroup`, `.zarray`, `.zattrs`) as written by AnnData, with
//! blosc, zlib, gzip or zstd compression and `vlen-utf8` strings, and Zarr v3
//! hierarchies (`zarr.json`). Missing chunks read as the fill value.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use log::debug;
use serde_json::{Map, Value};
use zarrs::array::{Array, DataType, ElementOwned};
use zarrs::array_subset::ArraySubset;
use zarrs::filesystem::FilesystemStore;
use zarrs::group::Group as ZarrGroup;
use zarrs::storage::{
    ListableStorageTraits, ReadableListableStorage, ReadableListableStorageTraits,
    ReadableStorageTraits, StoreKey, StorePrefix,
};
use zarrs_zip::ZipStorageAdapter;
use zip::ZipArchive;

use super::backend::{element_count, join_path, normalize_path, row_span};
use super::{ArrayData, AttributeValue, Backend, ContainerError, NodeKind, ScalarType};

const ZARRAY: &str = ".zarray";
const ZGROUP: &str = ".zgroup";
const ZARR_JSON: &str = "zarr.json";

type ZarrArray = Array<dyn ReadableListableStorageTraits>;

/// Reader for Zarr hierarchies
pub struct ZarrBackend {
    storage: ReadableListableStorage,
    zip: bool,
    arrays: RefCell<HashMap<String, Rc<ZarrArray>>>,
}

impl ZarrBackend {
    /// Open a hierarchy stored as a directory tree
    pub fn open_directory<P: AsRef<Path>>(path: P) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        if !path.join(ZGROUP).is_file() && !path.join(ZARR_JSON).is_file() {
            return Err(ContainerError::invalid_format(
                "",
                format!("{} holds no {} file", path.display(), ZGROUP),
            ));
        }
        debug!("Opening Zarr directory store {}", path.display());
        let store = FilesystemStore::new(path).map_err(|e| ContainerError::zarr("", e))?;
        Ok(Self::with_storage(Arc::new(store), false))
    }

    /// Open a hierarchy packed in a ZIP archive
    ///
    /// When the hierarchy sits below a top-level folder of the archive
    /// (`store.zarr/.zgroup`), that folder becomes the root.
    pub fn open_zip<P: AsRef<Path>>(path: P) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        let root = zip_root(path)?;
        debug!(
            "Opening Zarr ZIP store {} rooted at '{}'",
            path.display(),
            root
        );

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ContainerError::InvalidArgument(format!("{} is not a file", path.display())))?;

        let directory = Arc::new(FilesystemStore::new(directory).map_err(|e| ContainerError::zarr("", e))?);
        let key = StoreKey::new(file_name).map_err(|e| ContainerError::zarr("", e))?;
        let adapter = ZipStorageAdapter::new_with_path(directory, key, root)
            .map_err(|e| ContainerError::zarr("", e))?;
        Ok(Self::with_storage(Arc::new(adapter), true))
    }

    fn with_storage(storage: ReadableListableStorage, zip: bool) -> Self {
        Self {
            storage,
            zip,
            arrays: RefCell::new(HashMap::new()),
        }
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ContainerError> {
        let store_key = StoreKey::new(key).map_err(|e| ContainerError::zarr(key, e))?;
        Ok(self
            .storage
            .get(&store_key)
            .map_err(|e| ContainerError::zarr(key, e))?
            .map(|bytes| bytes.to_vec()))
    }

    fn array(&self, path: &str) -> Result<Rc<ZarrArray>, ContainerError> {
        let path = normalize_path(path);
        if let Some(array) = self.arrays.borrow().get(&path) {
            return Ok(Rc::clone(array));
        }
        if self.node_kind(&path)? != Some(NodeKind::Dataset) {
            return Err(ContainerError::not_found(&path));
        }
        let array = Rc::new(
            Array::open(self.storage.clone(), &node_path(&path))
                .map_err(|e| ContainerError::zarr(&path, e))?,
        );
        self.arrays.borrow_mut().insert(path, Rc::clone(&array));
        Ok(array)
    }

    fn attributes(&self, path: &str) -> Result<Map<String, Value>, ContainerError> {
        let path = normalize_path(path);
        match self.node_kind(&path)? {
            Some(NodeKind::Dataset) => Ok(self.array(&path)?.attributes().clone()),
            Some(NodeKind::Group) => {
                let group = ZarrGroup::open(self.storage.clone(), &node_path(&path))
                    .map_err(|e| ContainerError::zarr(&path, e))?;
                Ok(group.attributes().clone())
            }
            None => Err(ContainerError::not_found(&path)),
        }
    }

    fn read_subset(&self, path: &str, subset: &ArraySubset) -> Result<ArrayData, ContainerError> {
        let array = self.array(path)?;
        let read = Subset {
            path,
            array: &array,
            subset,
        };
        Ok(match scalar_type(path, array.data_type())? {
            ScalarType::Bool => ArrayData::Bool(read.elements::<bool>()?),
            ScalarType::Int8 => ArrayData::Int(read.widened::<i8>()?),
            ScalarType::Int16 => ArrayData::Int(read.widened::<i16>()?),
            ScalarType::Int32 => ArrayData::Int(read.widened::<i32>()?),
            ScalarType::Int64 => ArrayData::Int(read.elements::<i64>()?),
            ScalarType::UInt8 => ArrayData::Int(read.widened::<u8>()?),
            ScalarType::UInt16 => ArrayData::Int(read.widened::<u16>()?),
            ScalarType::UInt32 => ArrayData::Int(read.widened::<u32>()?),
            ScalarType::UInt64 => ArrayData::Int(read.widened::<u64>()?),
            ScalarType::Float32 => ArrayData::Float(
                read.elements::<f32>()?
                    .into_iter()
                    .map(f64::from)
                    .collect(),
            ),
            ScalarType::Float64 => ArrayData::Float(read.elements::<f64>()?),
            ScalarType::String => ArrayData::Str(read.elements::<String>()?),
        })
    }
}

/// Part of one array to decode
struct Subset<'a> {
    path: &'a str,
    array: &'a ZarrArray,
    subset: &'a ArraySubset,
}

impl Subset<'_> {
    fn elements<T: ElementOwned>(&self) -> Result<Vec<T>, ContainerError> {
        self.array
            .retrieve_array_subset_elements::<T>(self.subset)
            .map_err(|e| ContainerError::zarr(self.path, e))
    }

    fn widened<T: ElementOwned + Copy>(&self) -> Result<Vec<i64>, ContainerError>
    where
        i64: TryFrom<T>,
        T: std::fmt::Display,
    {
        self.elements::<T>()?
            .into_iter()
            .map(|v| {
                i64::try_from(v).map_err(|_| {
                    ContainerError::Unsupported(format!(
                        "value {} at '{}' exceeds the int64 range",
                        v, self.path
                    ))
                })
            })
            .collect()
    }
}

/// `zarrs` node path of a backend path
fn node_path(path: &str) -> String {
    format!("/{}", path)
}

/// Archive folder holding the top-level `.zgroup` or `zarr.json`, `""` for the archive root
fn zip_root(path: &Path) -> Result<String, ContainerError> {
    let archive = ZipArchive::new(BufReader::new(File::open(path)?))?;
    let root = archive
        .file_names()
        .filter_map(|name| {
            name.strip_suffix(ZGROUP)
                .or_else(|| name.strip_suffix(ZARR_JSON))
        })
        .filter(|dir| dir.is_empty() || dir.ends_with('/'))
        .min_by_key(|dir| dir.len())
        .map(|dir| dir.trim_end_matches('/').to_string());
    root.ok_or_else(|| {
        ContainerError::invalid_format("", "ZIP archive holds no .zgroup or zarr.json entry")
    })
}

fn scalar_type(path: &str, data_type: &DataType) -> Result<ScalarType, ContainerError> {
    Ok(match data_type {
        DataType::Bool => ScalarType::Bool,
        DataType::Int8 => ScalarType::Int8,
        DataType::Int16 => ScalarType::Int16,
        DataType::Int32 => ScalarType::Int32,
        DataType::Int64 => ScalarType::Int64,
        DataType::UInt8 => ScalarType::UInt8,
        DataType::UInt16 => ScalarType::UInt16,
        DataType::UInt32 => ScalarType::UInt32,
        DataType::UInt64 => ScalarType::UInt64,
        DataType::Float32 => ScalarType::Float32,
        DataType::Float64 => ScalarType::Float64,
        DataType::String => ScalarType::String,
        other => {
            return Err(ContainerError::Unsupported(format!(
                "data type {:?} at '{}'",
                other, path
            )))
        }
    })
}

/// Convert a JSON attribute; anything without a direct counterpart keeps its JSON text
fn attribute_from_json(value: &Value) -> AttributeValue {
    match value {
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => AttributeValue::Str(s.clone()),
        Value::Array(items) => {
            if items.is_empty() {
                AttributeValue::Array(ArrayData::Float(Vec::new()))
            } else if let Some(strings) = items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
            {
                AttributeValue::Array(ArrayData::Str(strings))
            } else if let Some(bools) = items.iter().map(Value::as_bool).collect::<Option<Vec<_>>>() {
                AttributeValue::Array(ArrayData::Bool(bools))
            } else if let Some(ints) = items.iter().map(Value::as_i64).collect::<Option<Vec<_>>>() {
                AttributeValue::Array(ArrayData::Int(ints))
            } else if let Some(floats) = items.iter().map(Value::as_f64).collect::<Option<Vec<_>>>() {
                AttributeValue::Array(ArrayData::Float(floats))
            } else {
                AttributeValue::Str(value.to_string())
            }
        }
        Value::Null | Value::Object(_) => AttributeValue::Str(value.to_string()),
    }
}

impl Backend for ZarrBackend {
    fn format_name(&self) -> &'static str {
        if self.zip {
            "zarr (zip)"
        } else {
            "zarr"
        }
    }

    fn node_kind(&self, path: &str) -> Result<Option<NodeKind>, ContainerError> {
        let path = normalize_path(path);
        if self.get(&join_path(&path, ZARRAY))?.is_some() {
            return Ok(Some(NodeKind::Dataset));
        }
        if self.get(&join_path(&path, ZGROUP))?.is_some() {
            return Ok(Some(NodeKind::Group));
        }
        let Some(bytes) = self.get(&join_path(&path, ZARR_JSON))? else {
            return Ok(None);
        };
        let metadata: Value = serde_json::from_slice(&bytes)?;
        match metadata.get("node_type").and_then(Value::as_str) {
            Some("array") => Ok(Some(NodeKind::Dataset)),
            Some("group") => Ok(Some(NodeKind::Group)),
            other => Err(ContainerError::invalid_format(
                &path,
                format!("unknown node_type {:?} in {}", other, ZARR_JSON),
            )),
        }
    }

    fn children(&self, path: &str) -> Result<Vec<String>, ContainerError> {
        let path = normalize_path(path);
        match self.node_kind(&path)? {
            Some(NodeKind::Group) => {}
            Some(NodeKind::Dataset) => {
                return Err(ContainerError::invalid_format(&path, "not a group"))
            }
            None => return Err(ContainerError::not_found(&path)),
        }

        let prefix = if path.is_empty() {
            StorePrefix::root()
        } else {
            StorePrefix::new(format!("{}/", path)).map_err(|e| ContainerError::zarr(&path, e))?
        };
        let listing = self
            .storage
            .list_dir(&prefix)
            .map_err(|e| ContainerError::zarr(&path, e))?;

        let mut children = Vec::new();
        for child in listing.prefixes() {
            let name = child
                .as_str()
                .strip_prefix(prefix.as_str())
                .unwrap_or_default()
                .trim_end_matches('/');
            if !name.is_empty() && self.node_kind(&join_path(&path, name))?.is_some() {
                children.push(name.to_string());
            }
        }
        children.sort();
        Ok(children)
    }

    fn attribute_names(&self, path: &str) -> Result<Vec<String>, ContainerError> {
        let mut names: Vec<String> = self.attributes(path)?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn attribute(&self, path: &str, name: &str) -> Result<Option<AttributeValue>, ContainerError> {
        Ok(self.attributes(path)?.get(name).map(attribute_from_json))
    }

    fn dataset_shape(&self, path: &str) -> Result<Vec<usize>, ContainerError> {
        let array = self.array(path)?;
        let shape = array
            .shape()
            .iter()
            .map(|&dim| usize::try_from(dim))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| {
                ContainerError::invalid_format(path, format!("shape {:?} is too large", array.shape()))
            })?;
        element_count(path, &shape)?;
        Ok(shape)
    }

    fn dataset_type(&self, path: &str) -> Result<ScalarType, ContainerError> {
        scalar_type(path, self.array(path)?.data_type())
    }

    fn read_dataset(&self, path: &str) -> Result<ArrayData, ContainerError> {
        self.dataset_shape(path)?;
        let subset = self.array(path)?.subset_all();
        self.read_subset(path, &subset)
    }

    /// Decode only the chunks holding the rows that cover the range
    fn read_dataset_range(
        &self,
        path: &str,
        start: usize,
        len: usize,
    ) -> Result<ArrayData, ContainerError> {
        let shape = self.dataset_shape(path)?;
        let (data, offset) = match row_span(path, &shape, start, len)? {
            Some(span) => {
                let mut ranges = vec![span.rows.start as u64..span.rows.end as u64];
                ranges.extend(shape[1..].iter().map(|&dim| 0..dim as u64));
                let subset = ArraySubset::new_with_ranges(&ranges);
                (self.read_subset(path, &subset)?, span.offset)
            }
            None => (self.read_dataset(path)?, start),
        };
        let total = data.len();
        data.slice(offset, len).ok_or(ContainerError::IndexOutOfBounds {
            index: start.saturating_add(len),
            len: total,
        })
    }
}
