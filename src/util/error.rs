//! Error types for the asset node pipeline.

use thiserror::Error;

use super::AttributeOwner;

/// Main error type for cook and translation operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The asset handle is missing or was destroyed by the engine.
    #[error("Asset is not loaded or its handle is no longer valid")]
    AssetInvalid,

    /// The engine reported a cook failure.
    #[error("Cook failed: {0}")]
    CookFailed(String),

    /// A requested attribute does not exist on the part.
    #[error("Attribute not found: {name} ({owner})")]
    AttributeMissing { owner: AttributeOwner, name: String },

    /// Array lengths disagree with each other or with the part's counts.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Parameter id is not part of the asset's parameter table.
    #[error("Parameter not found: {0}")]
    ParmNotFound(String),

    /// Data came back with a storage type that cannot be converted.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Any other failure reported by the engine boundary.
    #[error("Engine error: {0}")]
    Engine(String),

    /// Invalid node configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an engine error from a string.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Create a shape mismatch error.
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    /// Create an attribute-missing error.
    pub fn missing(owner: AttributeOwner, name: impl Into<String>) -> Self {
        Self::AttributeMissing { owner, name: name.into() }
    }

    /// True for failures that abort a whole pass rather than a single part.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AssetInvalid | Self::CookFailed(_))
    }
}

/// Result type alias for asset node operations.
pub type Result<T> = std::result::Result<T, Error>;
