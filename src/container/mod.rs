//! # Hierarchical Container Access
//!
//! A [`Container`] opens a hierarchical binary store (Zarr directory or ZIP
//! archive, HDF5 with the `hdf5` feature, or an in-memory store) and hands out
//! lightweight [`Group`] and [`Dataset`] views addressed by slash-separated
//! paths.
//!
//! ## Lifecycle
//!
//! The container is either open or closed. Every view holds a scoped handle
//! on the container: dropping (or explicitly closing) a view releases that
//! handle only, while [`Container::close`] invalidates every view at once.
//! Any read through a view of a closed container fails with
//! [`ContainerError::UseAfterClose`].
//!
//! ```rust
//! use qtlens::container::{ArrayData, Container, ContainerError, MemoryBackend, ScalarType};
//!
//! let mut store = MemoryBackend::new();
//! store.create_dataset("obs/cell", vec![2], ScalarType::String,
//!     ArrayData::Str(vec!["a".into(), "b".into()]))?;
//!
//! let container = Container::from_backend(store);
//! let obs = container.group("obs")?;
//! assert_eq!(obs.children()?, vec!["cell".to_string()]);
//! assert_eq!(container.open_handles(), 1);
//!
//! container.close();
//! assert!(matches!(obs.children(), Err(ContainerError::UseAfterClose { .. })));
//! # Ok::<(), ContainerError>(())
//! ```
//!
//! Containers are single-threaded: the shared state lives behind `Rc` and
//! `RefCell`, so neither the container nor its views are `Send`.

mod backend;
mod error;
#[cfg(feature = "hdf5")]
mod h5;
mod memory;
mod zarr;

#[cfg(test)]
mod tests;

pub use backend::{ArrayData, AttributeValue, Backend, NodeKind, ScalarType};
pub use error::ContainerError;
#[cfg(feature = "hdf5")]
pub use h5::Hdf5Backend;
pub use memory::MemoryBackend;
pub use zarr::ZarrBackend;

pub(crate) use backend::{element_count, join_path, normalize_path};

use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use log::{debug, info};

struct ContainerState {
    backend: Option<Box<dyn Backend>>,
    format: &'static str,
    open_handles: usize,
}

/// Scoped reference to a node, counted by the owning container
struct Handle {
    state: Rc<RefCell<ContainerState>>,
    path: String,
}

impl Handle {
    fn new(state: &Rc<RefCell<ContainerState>>, path: String) -> Self {
        state.borrow_mut().open_handles += 1;
        Self {
            state: Rc::clone(state),
            path,
        }
    }

    fn with_backend<R>(
        &self,
        f: impl FnOnce(&dyn Backend) -> Result<R, ContainerError>,
    ) -> Result<R, ContainerError> {
        let state = self.state.borrow();
        match state.backend.as_deref() {
            Some(backend) => f(backend),
            None => Err(ContainerError::UseAfterClose {
                path: self.path.clone(),
            }),
        }
    }

    fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    fn attribute_names(&self) -> Result<Vec<String>, ContainerError> {
        self.with_backend(|b| b.attribute_names(&self.path))
    }

    fn attr(&self, name: &str) -> Result<Option<Attribute>, ContainerError> {
        Ok(self
            .with_backend(|b| b.attribute(&self.path, name))?
            .map(|value| Attribute {
                name: name.to_string(),
                value,
            }))
    }
}

impl Clone for Handle {
    fn clone(&self) -> Self {
        Handle::new(&self.state, self.path.clone())
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.open_handles = state.open_handles.saturating_sub(1);
    }
}

/// An open hierarchical store
pub struct Container {
    state: Rc<RefCell<ContainerState>>,
}

impl Container {
    /// Open the store at `path`
    ///
    /// The format is detected from the path:
    /// - directories holding a `.zgroup` or `zarr.json` file are Zarr directory stores
    /// - `.zip` files are Zarr ZIP stores
    /// - `.h5`, `.h5ad` and `.hdf5` files are HDF5 files (needs the `hdf5` feature)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let backend: Box<dyn Backend> = if metadata.is_dir() {
            Box::new(ZarrBackend::open_directory(path)?)
        } else if extension == "zip" {
            Box::new(ZarrBackend::open_zip(path)?)
        } else if matches!(extension.as_str(), "h5" | "h5ad" | "hdf5") {
            Self::open_hdf5(path)?
        } else {
            return Err(ContainerError::Unsupported(format!(
                "cannot detect the container format of {}",
                path.display()
            )));
        };

        info!("Opened {} container {}", backend.format_name(), path.display());
        Ok(Self::from_boxed(backend))
    }

    #[cfg(feature = "hdf5")]
    fn open_hdf5(path: &Path) -> Result<Box<dyn Backend>, ContainerError> {
        Ok(Box::new(Hdf5Backend::open(path)?))
    }

    #[cfg(not(feature = "hdf5"))]
    fn open_hdf5(path: &Path) -> Result<Box<dyn Backend>, ContainerError> {
        Err(ContainerError::Unsupported(format!(
            "{} is an HDF5 file; rebuild with the `hdf5` feature to read it",
            path.display()
        )))
    }

    /// Wrap an already opened backend
    pub fn from_backend<B: Backend + 'static>(backend: B) -> Self {
        Self::from_boxed(Box::new(backend))
    }

    fn from_boxed(backend: Box<dyn Backend>) -> Self {
        let format = backend.format_name();
        Self {
            state: Rc::new(RefCell::new(ContainerState {
                backend: Some(backend),
                format,
                open_handles: 0,
            })),
        }
    }

    /// Name of the underlying store format
    pub fn format_name(&self) -> &'static str {
        self.state.borrow().format
    }

    /// Whether the container is still open
    pub fn is_open(&self) -> bool {
        self.state.borrow().backend.is_some()
    }

    /// Number of live group and dataset views
    pub fn open_handles(&self) -> usize {
        self.state.borrow().open_handles
    }

    /// Close the container, invalidating every view derived from it
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) {
        let mut state = self.state.borrow_mut();
        if state.backend.take().is_some() {
            debug!(
                "Closed {} container with {} live view(s)",
                state.format, state.open_handles
            );
        }
    }

    fn node_kind(&self, path: &str) -> Result<Option<NodeKind>, ContainerError> {
        let state = self.state.borrow();
        match state.backend.as_deref() {
            Some(backend) => backend.node_kind(path),
            None => Err(ContainerError::UseAfterClose {
                path: path.to_string(),
            }),
        }
    }

    /// Whether a node exists at `path`
    pub fn exists(&self, path: &str) -> Result<bool, ContainerError> {
        Ok(self.node_kind(&normalize_path(path))?.is_some())
    }

    /// View of the root group
    pub fn root(&self) -> Result<Group, ContainerError> {
        self.group("")
    }

    /// View of the group at `path`
    pub fn group(&self, path: &str) -> Result<Group, ContainerError> {
        let path = normalize_path(path);
        match self.node_kind(&path)? {
            Some(NodeKind::Group) => Ok(Group {
                handle: Handle::new(&self.state, path),
            }),
            Some(NodeKind::Dataset) => Err(ContainerError::invalid_format(
                &path,
                "expected a group, found a dataset",
            )),
            None => Err(ContainerError::not_found(&path)),
        }
    }

    /// View of the dataset at `path`
    pub fn dataset(&self, path: &str) -> Result<Dataset, ContainerError> {
        let path = normalize_path(path);
        match self.node_kind(&path)? {
            Some(NodeKind::Dataset) => Ok(Dataset {
                handle: Handle::new(&self.state, path),
            }),
            Some(NodeKind::Group) => Err(ContainerError::invalid_format(
                &path,
                "expected a dataset, found a group",
            )),
            None => Err(ContainerError::not_found(&path)),
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Container")
            .field("format", &state.format)
            .field("open", &state.backend.is_some())
            .field("open_handles", &state.open_handles)
            .finish()
    }
}

/// A named attribute with its value
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    value: AttributeValue,
}

impl Attribute {
    /// Attribute name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value
    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    /// Take the value out of the attribute
    pub fn into_value(self) -> AttributeValue {
        self.value
    }
}

/// View of a group node
#[derive(Clone)]
pub struct Group {
    handle: Handle,
}

impl Group {
    /// Full path of the group, empty for the root
    pub fn path(&self) -> &str {
        &self.handle.path
    }

    /// Last component of the path
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Names of the direct children, sorted
    pub fn children(&self) -> Result<Vec<String>, ContainerError> {
        self.handle.with_backend(|b| b.children(&self.handle.path))
    }

    /// Kind of the child `name`, `None` if absent
    pub fn child_kind(&self, name: &str) -> Result<Option<NodeKind>, ContainerError> {
        let path = join_path(&self.handle.path, name);
        self.handle.with_backend(|b| b.node_kind(&path))
    }

    /// Whether a child `name` exists
    pub fn contains(&self, name: &str) -> Result<bool, ContainerError> {
        Ok(self.child_kind(name)?.is_some())
    }

    /// View of the child group `name`
    pub fn group(&self, name: &str) -> Result<Group, ContainerError> {
        let path = join_path(&self.handle.path, name);
        match self.child_kind(name)? {
            Some(NodeKind::Group) => Ok(Group {
                handle: Handle::new(&self.handle.state, path),
            }),
            Some(NodeKind::Dataset) => Err(ContainerError::invalid_format(
                &path,
                "expected a group, found a dataset",
            )),
            None => Err(ContainerError::not_found(&path)),
        }
    }

    /// View of the child dataset `name`
    pub fn dataset(&self, name: &str) -> Result<Dataset, ContainerError> {
        let path = join_path(&self.handle.path, name);
        match self.child_kind(name)? {
            Some(NodeKind::Dataset) => Ok(Dataset {
                handle: Handle::new(&self.handle.state, path),
            }),
            Some(NodeKind::Group) => Err(ContainerError::invalid_format(
                &path,
                "expected a dataset, found a group",
            )),
            None => Err(ContainerError::not_found(&path)),
        }
    }

    /// Names of the attributes, sorted
    pub fn attribute_names(&self) -> Result<Vec<String>, ContainerError> {
        self.handle.attribute_names()
    }

    /// Attribute `name`, `None` if absent
    pub fn attr(&self, name: &str) -> Result<Option<Attribute>, ContainerError> {
        self.handle.attr(name)
    }

    /// Release this view's handle
    pub fn close(self) {}
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group").field("path", &self.handle.path).finish()
    }
}

/// View of an n-dimensional array node
#[derive(Clone)]
pub struct Dataset {
    handle: Handle,
}

impl Dataset {
    /// Full path of the dataset
    pub fn path(&self) -> &str {
        &self.handle.path
    }

    /// Last component of the path
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Shape; empty for a scalar
    pub fn shape(&self) -> Result<Vec<usize>, ContainerError> {
        self.handle.with_backend(|b| b.dataset_shape(&self.handle.path))
    }

    /// Number of elements
    pub fn len(&self) -> Result<usize, ContainerError> {
        element_count(self.path(), &self.shape()?)
    }

    /// Whether the dataset holds no elements
    pub fn is_empty(&self) -> Result<bool, ContainerError> {
        Ok(self.len()? == 0)
    }

    /// Declared element type
    pub fn data_type(&self) -> Result<ScalarType, ContainerError> {
        self.handle.with_backend(|b| b.dataset_type(&self.handle.path))
    }

    /// Read every element, in row-major order
    pub fn read(&self) -> Result<ArrayData, ContainerError> {
        self.handle.with_backend(|b| b.read_dataset(&self.handle.path))
    }

    /// Read `len` elements starting at flat offset `start`
    pub fn read_range(&self, start: usize, len: usize) -> Result<ArrayData, ContainerError> {
        self.handle
            .with_backend(|b| b.read_dataset_range(&self.handle.path, start, len))
    }

    /// Names of the attributes, sorted
    pub fn attribute_names(&self) -> Result<Vec<String>, ContainerError> {
        self.handle.attribute_names()
    }

    /// Attribute `name`, `None` if absent
    pub fn attr(&self, name: &str) -> Result<Option<Attribute>, ContainerError> {
        self.handle.attr(name)
    }

    /// Release this view's handle
    pub fn close(self) {}
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("path", &self.handle.path)
            .finish()
    }
}
