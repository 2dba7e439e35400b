/// Errors that can occur while accessing a container
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON metadata parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Zarr metadata, storage or codec error
    #[error("Zarr error at '{path}': {message}")]
    Zarr {
        /// Path of the node being read
        path: String,
        /// Error reported by the Zarr reader
        message: String,
    },

    /// HDF5 library error
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// Node does not follow the expected layout
    #[error("Invalid format at '{path}': {message}")]
    InvalidFormat {
        /// Path of the offending node
        path: String,
        /// What is wrong with it
        message: String,
    },

    /// A required encoding attribute is absent
    #[error("Missing attribute '{attribute}' at '{path}'")]
    MissingEncodingAttribute {
        /// Path of the node
        path: String,
        /// Name of the missing attribute
        attribute: String,
    },

    /// An encoding attribute has an unexpected value
    #[error("Invalid value for attribute '{attribute}' at '{path}': expected {expected}, got {actual}")]
    InvalidEncodingAttribute {
        /// Path of the node
        path: String,
        /// Name of the attribute
        attribute: String,
        /// Accepted value(s)
        expected: String,
        /// Value found
        actual: String,
    },

    /// Caller supplied an invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No node at the given path
    #[error("Not found: '{path}'")]
    NotFound {
        /// Requested path
        path: String,
    },

    /// Container was closed before the view was used
    #[error("Container is closed, cannot access '{path}'")]
    UseAfterClose {
        /// Path the view points to
        path: String,
    },

    /// Element index beyond the end of an array
    #[error("Index {index} is out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Length of the array
        len: usize,
    },

    /// Store feature that this reader does not handle
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl ContainerError {
    pub(crate) fn invalid_format(path: &str, message: impl Into<String>) -> Self {
        ContainerError::InvalidFormat {
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn zarr(path: &str, error: impl std::fmt::Display) -> Self {
        ContainerError::Zarr {
            path: path.to_string(),
            message: error.to_string(),
        }
    }

    pub(crate) fn not_found(path: &str) -> Self {
        ContainerError::NotFound {
            path: path.to_string(),
        }
    }
}
