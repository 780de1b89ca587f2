//! Derived thumbnail artifacts.
//!
//! Presence of the file at the canonical path is the whole cache contract:
//! no hashes, no timestamps, no invalidation. An artifact, once published, is
//! never regenerated or removed here.

mod orientation;
mod spec;
mod transform;

pub use orientation::{Orientation, OrientationPolicy};
pub use spec::ThumbnailSpec;
pub use transform::{ImageTransform, JpegThumbnailer, RenderedThumbnail, fill_center};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::asset::Asset;
use crate::error::{GatherError, Result};
use crate::layout::StorageLayout;
use crate::store::{file_exists, write_atomically};

/// Result of checking one `(asset, spec)` slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Probe {
    Present(PathBuf),
    /// Not there yet; the path it will be generated at.
    Missing(PathBuf),
}

impl Probe {
    pub fn is_missing(&self) -> bool {
        matches!(self, Probe::Missing(_))
    }

    pub fn path(&self) -> &Path {
        match self {
            Probe::Present(path) | Probe::Missing(path) => path,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedThumbnail {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone)]
pub struct ThumbnailCache {
    layout: StorageLayout,
    transform: Arc<dyn ImageTransform>,
}

impl fmt::Debug for ThumbnailCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailCache")
            .field("thumbnails_dir", &self.layout.thumbnails_dir())
            .field("transform", &self.transform)
            .finish()
    }
}

impl ThumbnailCache {
    pub fn new(layout: StorageLayout, transform: Arc<dyn ImageTransform>) -> Self {
        Self { layout, transform }
    }

    pub async fn probe(&self, asset: &Asset, spec: &ThumbnailSpec) -> Result<Probe> {
        let path = self.layout.thumbnail_path(asset, spec)?;
        if file_exists(&path).await? {
            Ok(Probe::Present(path))
        } else {
            Ok(Probe::Missing(path))
        }
    }

    /// Render `spec` from the original at `source` and publish it at the
    /// canonical path.
    pub async fn generate(
        &self,
        source: &Path,
        asset: &Asset,
        spec: &ThumbnailSpec,
    ) -> Result<GeneratedThumbnail> {
        let path = self.layout.thumbnail_path(asset, spec)?;
        let bytes = tokio::fs::read(source).await?;

        let transform = Arc::clone(&self.transform);
        let spec_owned = *spec;
        let render = tokio::task::spawn_blocking(move || {
            transform.render(&bytes, &spec_owned)
        });
        let rendered = match render.await {
            Ok(rendered) => rendered?,
            // Re-raise so the asset task reports the panic.
            Err(err) if err.is_panic() => {
                std::panic::resume_unwind(err.into_panic())
            }
            Err(err) => {
                return Err(GatherError::Internal(format!(
                    "Failed to join thumbnail task: {err}"
                )));
            }
        };

        write_atomically(&path, &rendered.bytes).await?;
        debug!(
            asset = %asset,
            spec = %spec,
            width = rendered.width,
            height = rendered.height,
            "published thumbnail"
        );

        Ok(GeneratedThumbnail {
            path,
            width: rendered.width,
            height: rendered.height,
        })
    }
}
