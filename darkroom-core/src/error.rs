use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatherError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    #[error("Invalid sidecar {path:?}: {reason}")]
    InvalidSidecar { path: PathBuf, reason: String },

    /// Listing the remote catalog failed. The only fatal error of a run.
    #[error("Catalog enumeration failed: {0}")]
    Catalog(String),

    #[error("Fetch of {asset} failed: {source}")]
    Fetch {
        asset: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Thumbnail transform failed: {0}")]
    Transform(String),

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatherError {
    /// Whether this error ends the whole run rather than a single asset task.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GatherError::Catalog(_))
    }
}

pub type Result<T> = std::result::Result<T, GatherError>;
