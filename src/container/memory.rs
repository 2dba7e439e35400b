use std::collections::BTreeMap;

use super::backend::{element_count, join_path, normalize_path};
use super::{ArrayData, AttributeValue, Backend, ContainerError, NodeKind, ScalarType};

#[derive(Debug, Clone)]
enum MemoryNode {
    Group,
    Dataset {
        shape: Vec<usize>,
        dtype: ScalarType,
        data: ArrayData,
    },
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    node: MemoryNode,
    attributes: BTreeMap<String, AttributeValue>,
}

/// In-memory store, built programmatically
///
/// ```rust
/// use qtlens::container::{ArrayData, Container, MemoryBackend, ScalarType};
///
/// let mut store = MemoryBackend::new();
/// store.set_attr("", "encoding-type", "anndata")?;
/// store.create_dataset("X", vec![2, 2], ScalarType::Float64, ArrayData::Float(vec![1.0; 4]))?;
///
/// let container = Container::from_backend(store);
/// assert_eq!(container.dataset("X")?.shape()?, vec![2, 2]);
/// # Ok::<(), qtlens::container::ContainerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    nodes: BTreeMap<String, MemoryEntry>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create a store holding only an empty root group
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            String::new(),
            MemoryEntry {
                node: MemoryNode::Group,
                attributes: BTreeMap::new(),
            },
        );
        Self { nodes }
    }

    /// Create a group at `path`, along with any missing parent groups
    pub fn create_group(&mut self, path: &str) -> Result<&mut Self, ContainerError> {
        let path = normalize_path(path);
        let mut current = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current = join_path(&current, part);
            match self.nodes.get(&current) {
                Some(MemoryEntry {
                    node: MemoryNode::Group,
                    ..
                }) => {}
                Some(_) => {
                    return Err(ContainerError::invalid_format(
                        &current,
                        "a dataset already exists at this path",
                    ))
                }
                None => {
                    self.nodes.insert(
                        current.clone(),
                        MemoryEntry {
                            node: MemoryNode::Group,
                            attributes: BTreeMap::new(),
                        },
                    );
                }
            }
        }
        Ok(self)
    }

    /// Create a dataset at `path`; parent groups are created as needed.
    ///
    /// The number of elements must match the shape (one element for an empty,
    /// scalar shape) and the data variant must match `dtype`.
    pub fn create_dataset(
        &mut self,
        path: &str,
        shape: Vec<usize>,
        dtype: ScalarType,
        data: ArrayData,
    ) -> Result<&mut Self, ContainerError> {
        let path = normalize_path(path);
        if path.is_empty() {
            return Err(ContainerError::InvalidArgument(
                "the root cannot be a dataset".to_string(),
            ));
        }

        let expected = element_count(&path, &shape)?;
        if expected != data.len() {
            return Err(ContainerError::InvalidArgument(format!(
                "shape {:?} holds {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        let matches = match &data {
            ArrayData::Bool(_) => dtype == ScalarType::Bool,
            ArrayData::Int(_) => dtype.is_integer(),
            ArrayData::Float(_) => dtype.is_float(),
            ArrayData::Str(_) => dtype == ScalarType::String,
        };
        if !matches {
            return Err(ContainerError::InvalidArgument(format!(
                "{} data cannot be stored as {}",
                data.kind(),
                dtype
            )));
        }

        if let Some((parent, _)) = path.rsplit_once('/') {
            self.create_group(parent)?;
        }
        if let Some(existing) = self.nodes.get(&path) {
            if matches!(existing.node, MemoryNode::Group) {
                return Err(ContainerError::invalid_format(
                    &path,
                    "a group already exists at this path",
                ));
            }
        }
        self.nodes.insert(
            path,
            MemoryEntry {
                node: MemoryNode::Dataset { shape, dtype, data },
                attributes: BTreeMap::new(),
            },
        );
        Ok(self)
    }

    /// Set attribute `name` on the existing node at `path`
    pub fn set_attr(
        &mut self,
        path: &str,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<&mut Self, ContainerError> {
        let path = normalize_path(path);
        let entry = self
            .nodes
            .get_mut(&path)
            .ok_or_else(|| ContainerError::not_found(&path))?;
        entry.attributes.insert(name.to_string(), value.into());
        Ok(self)
    }

    fn entry(&self, path: &str) -> Result<&MemoryEntry, ContainerError> {
        let path = normalize_path(path);
        self.nodes
            .get(&path)
            .ok_or_else(|| ContainerError::not_found(&path))
    }

    fn dataset(&self, path: &str) -> Result<(&[usize], ScalarType, &ArrayData), ContainerError> {
        match &self.entry(path)?.node {
            MemoryNode::Dataset { shape, dtype, data } => Ok((shape, *dtype, data)),
            MemoryNode::Group => Err(ContainerError::invalid_format(path, "not a dataset")),
        }
    }
}

impl Backend for MemoryBackend {
    fn format_name(&self) -> &'static str {
        "memory"
    }

    fn node_kind(&self, path: &str) -> Result<Option<NodeKind>, ContainerError> {
        Ok(self
            .nodes
            .get(&normalize_path(path))
            .map(|entry| match entry.node {
                MemoryNode::Group => NodeKind::Group,
                MemoryNode::Dataset { .. } => NodeKind::Dataset,
            }))
    }

    fn children(&self, path: &str) -> Result<Vec<String>, ContainerError> {
        let path = normalize_path(path);
        match self.entry(&path)?.node {
            MemoryNode::Group => {}
            MemoryNode::Dataset { .. } => {
                return Err(ContainerError::invalid_format(&path, "not a group"))
            }
        }
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path)
        };
        Ok(self
            .nodes
            .keys()
            .filter(|key| !key.is_empty())
            .filter_map(|key| key.strip_prefix(prefix.as_str()))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(str::to_string)
            .collect())
    }

    fn attribute_names(&self, path: &str) -> Result<Vec<String>, ContainerError> {
        Ok(self.entry(path)?.attributes.keys().cloned().collect())
    }

    fn attribute(&self, path: &str, name: &str) -> Result<Option<AttributeValue>, ContainerError> {
        Ok(self.entry(path)?.attributes.get(name).cloned())
    }

    fn dataset_shape(&self, path: &str) -> Result<Vec<usize>, ContainerError> {
        Ok(self.dataset(path)?.0.to_vec())
    }

    fn dataset_type(&self, path: &str) -> Result<ScalarType, ContainerError> {
        Ok(self.dataset(path)?.1)
    }

    fn read_dataset(&self, path: &str) -> Result<ArrayData, ContainerError> {
        Ok(self.dataset(path)?.2.clone())
    }

    fn read_dataset_range(
        &self,
        path: &str,
        start: usize,
        len: usize,
    ) -> Result<ArrayData, ContainerError> {
        let data = self.dataset(path)?.2;
        data.slice(start, len).ok_or(ContainerError::IndexOutOfBounds {
            index: start.saturating_add(len),
            len: data.len(),
        })
    }
}
