use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::layout::StorageLayout;
use crate::thumbnail::{OrientationPolicy, ThumbnailSpec};

pub const DEFAULT_BASE_DIR: &str = "/tmp/pictures-foo";
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_MAX_CONCURRENT_ASSETS: usize = 10;
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

pub fn default_extensions() -> Vec<String> {
    vec!["jpg".to_string()]
}

pub fn default_thumbnail_specs() -> Vec<ThumbnailSpec> {
    vec![
        ThumbnailSpec::new(1024, 768, true),
        ThumbnailSpec::new(320, 240, false),
    ]
}

/// Immutable settings for one reconciliation pass.
///
/// Built once (usually by `darkroom-config`) and shared by `Arc` between the
/// orchestrator and every component it constructs. Nothing mutates it after
/// the run starts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatherConfig {
    /// Root of the local `download/`, `thumbnails/` and `metadata/` areas.
    pub base_dir: PathBuf,
    /// Directories consulted, in order, for an existing copy of an asset or
    /// its sidecar. The first hit wins; copies are never merged.
    pub search_roots: Vec<PathBuf>,
    /// Consult `<base>/download` ahead of `search_roots`, so originals fetched
    /// by an earlier run are reused instead of fetched again.
    pub search_download_root: bool,
    /// Catalog prefix to enumerate.
    pub prefix: String,
    /// Assets requested per catalog page.
    pub page_size: usize,
    /// Upper bound on simultaneously active asset tasks.
    pub max_concurrent_assets: usize,
    /// Processable extensions, compared case-insensitively, without dots.
    pub extensions: Vec<String>,
    /// Derived artifacts every processable asset must have.
    pub thumbnails: Vec<ThumbnailSpec>,
    pub jpeg_quality: u8,
    pub orientation: OrientationPolicy,
}

impl Default for GatherConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            search_roots: Vec::new(),
            search_download_root: true,
            prefix: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            max_concurrent_assets: DEFAULT_MAX_CONCURRENT_ASSETS,
            extensions: default_extensions(),
            thumbnails: default_thumbnail_specs(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            orientation: OrientationPolicy::default(),
        }
    }
}

impl GatherConfig {
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(self.base_dir.clone())
    }

    /// Search roots in lookup order, with the download root first when
    /// `search_download_root` is set.
    pub fn effective_search_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::with_capacity(self.search_roots.len() + 1);
        if self.search_download_root {
            roots.push(self.layout().download_dir());
        }
        for root in &self.search_roots {
            if !roots.contains(root) {
                roots.push(root.clone());
            }
        }
        roots
    }
}
