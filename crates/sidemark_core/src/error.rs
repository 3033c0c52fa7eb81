use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for sidemark operations
#[derive(Debug, Error)]
pub enum SidemarkError {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Config errors
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    // Image collaborator errors
    #[error("Image store failed: {message}")]
    ImageStore { message: String },

    #[error("Unknown image reference '@img:{0}'")]
    ImageNotFound(String),
}

/// Result type alias for sidemark operations
pub type Result<T> = std::result::Result<T, SidemarkError>;

impl SidemarkError {
    /// Build an [`SidemarkError::ImageStore`] from anything displayable.
    pub fn image_store(message: impl std::fmt::Display) -> Self {
        SidemarkError::ImageStore {
            message: message.to_string(),
        }
    }

    /// Whether this error came from the image collaborator rather than the converter's caller.
    pub fn is_image_error(&self) -> bool {
        matches!(
            self,
            SidemarkError::ImageStore { .. } | SidemarkError::ImageNotFound(_)
        )
    }
}
