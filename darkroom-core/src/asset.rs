use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GatherError, Result};

/// Suffix appended to an asset name to locate its metadata sidecar.
pub const SIDECAR_SUFFIX: &str = ".json";

/// A photographic object listed by the remote catalog.
///
/// The name is the catalog key (for example `2019/holiday/IMG_0001.JPG`) and
/// doubles as the relative path under every local storage area.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    name: String,
    /// Size in bytes as reported by the catalog, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

impl Asset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Lower-cased extension without the leading dot, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// Case-insensitive extension filter. A leading dot on a configured
    /// extension is ignored, so `".jpg"` and `"jpg"` match alike.
    pub fn is_processable<S: AsRef<str>>(&self, extensions: &[S]) -> bool {
        let Some(ext) = self.extension() else {
            return false;
        };
        extensions.iter().any(|allowed| {
            let allowed = allowed.as_ref().trim();
            let allowed = allowed.strip_prefix('.').unwrap_or(allowed);
            allowed.eq_ignore_ascii_case(&ext)
        })
    }

    /// The asset name as a relative path that cannot escape the directory it
    /// is joined onto.
    pub fn relative_path(&self) -> Result<PathBuf> {
        relative_key(&self.name)
    }

    /// Relative path of the metadata sidecar (`<name>.json`).
    pub fn sidecar_path(&self) -> Result<PathBuf> {
        relative_key(&self.sidecar_name())
    }

    pub fn sidecar_name(&self) -> String {
        format!("{}{}", self.name, SIDECAR_SUFFIX)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Catalog-style key (`/`-separated) for a relative filesystem path.
/// `None` when a component is not valid UTF-8.
pub(crate) fn key_from_relative(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        parts.push(component.as_os_str().to_str()?);
    }
    Some(parts.join("/"))
}

fn relative_key(key: &str) -> Result<PathBuf> {
    if key.is_empty() {
        return Err(GatherError::InvalidAsset("empty asset name".into()));
    }

    let mut out = PathBuf::new();
    for component in Path::new(key).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => {
                return Err(GatherError::InvalidAsset(format!(
                    "asset name escapes storage root: {key}"
                )));
            }
        }
    }

    if out.as_os_str().is_empty() {
        return Err(GatherError::InvalidAsset(format!(
            "asset name has no file component: {key}"
        )));
    }
    Ok(out)
}
