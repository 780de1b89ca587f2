use std::path::{Path, PathBuf};

use crate::asset::Asset;
use crate::error::Result;
use crate::thumbnail::ThumbnailSpec;

pub const DOWNLOAD_DIR: &str = "download";
pub const THUMBNAILS_DIR: &str = "thumbnails";
pub const METADATA_DIR: &str = "metadata";

/// Canonical on-disk layout under the configured base directory:
///
/// ```text
/// <base>/download/<asset name>                 fetched originals
/// <base>/thumbnails/<spec key>/<asset name>    derived artifacts
/// <base>/metadata/<asset name>.json            copied sidecars
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageLayout {
    base_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn download_dir(&self) -> PathBuf {
        self.base_dir.join(DOWNLOAD_DIR)
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.base_dir.join(THUMBNAILS_DIR)
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.base_dir.join(METADATA_DIR)
    }

    pub fn download_path(&self, asset: &Asset) -> Result<PathBuf> {
        Ok(self.download_dir().join(asset.relative_path()?))
    }

    pub fn thumbnail_path(
        &self,
        asset: &Asset,
        spec: &ThumbnailSpec,
    ) -> Result<PathBuf> {
        Ok(self
            .thumbnails_dir()
            .join(spec.cache_key())
            .join(asset.relative_path()?))
    }

    pub fn metadata_path(&self, asset: &Asset) -> Result<PathBuf> {
        Ok(self.metadata_dir().join(asset.sidecar_path()?))
    }
}
