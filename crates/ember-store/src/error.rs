use ember_params::{Dim, ParamError};

use crate::ConfigError;

/// Errors raised while saving or loading parameters.
///
/// Every error aborts the operation that raised it. Nothing written before the failure is
/// rolled back.
#[derive(thiserror::Error, Debug)]
pub enum PackerError {
    /// The key is already present in the metadata file.
    #[error("Duplicate key '{key}' in metadata file: {path}")]
    DuplicateKey {
        /// The rejected key.
        key: String,
        /// The metadata file.
        path: String,
    },

    /// The key can't be written to the metadata file.
    #[error("Invalid key '{0}': keys can't contain ':', '|' or line breaks")]
    InvalidKey(String),

    /// No entry of the metadata file has this key.
    #[error("Load error: no such key: {0}")]
    KeyNotFound(String),

    /// No entry of the metadata file has this model key.
    #[error("Load error: no such key: {key} under model: {model}")]
    ModelNotFound {
        /// The model key that wasn't found.
        model: String,
        /// The nested key requested under the model.
        key: String,
    },

    /// A line of the data or metadata file doesn't follow the expected layout.
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    /// A record name doesn't start with the namespace of the target collection.
    #[error("Inconsistent namespace: '{name}' is not under '{namespace}'")]
    NamespaceMismatch {
        /// Name of the record.
        name: String,
        /// Namespace of the target collection.
        namespace: String,
    },

    /// The target parameter doesn't have the dimension of the record.
    #[error("Dimension is not consistent: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Dimension of the target parameter.
        expected: Dim,
        /// Dimension of the record.
        found: Dim,
    },

    /// The operation isn't supported.
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    /// Parameter storage rejected the loaded values.
    #[error("Parameter error: {0}")]
    Param(#[from] ParamError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
