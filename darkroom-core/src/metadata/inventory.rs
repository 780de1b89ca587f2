use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use super::sidecar::{Sidecar, parse_sidecar};
use crate::asset::{SIDECAR_SUFFIX, key_from_relative};
use crate::error::{GatherError, Result};

#[derive(Debug)]
pub struct InventoryEntry {
    /// Asset name the sidecar belongs to (relative path minus `.json`).
    pub asset: String,
    pub path: PathBuf,
    pub sidecar: Result<Sidecar>,
}

/// Read-only view over the local metadata area. This is what a downstream
/// indexer consumes; one bad sidecar never hides the others.
#[derive(Clone, Debug)]
pub struct SidecarInventory {
    root: PathBuf,
}

impl SidecarInventory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the metadata area, parsing every `*.json` file. Blocking; run it
    /// on the blocking pool from async code. Walk order sorts file names
    /// within each directory.
    pub fn scan(&self) -> Vec<InventoryEntry> {
        if !self.root.exists() {
            return Vec::new();
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        root = %self.root.display(),
                        error = %err,
                        "skipping unreadable metadata entry"
                    );
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(key) = path
                .strip_prefix(&self.root)
                .ok()
                .and_then(key_from_relative)
            else {
                continue;
            };
            let Some(asset) = key.strip_suffix(SIDECAR_SUFFIX) else {
                continue;
            };

            let sidecar = std::fs::read(path)
                .map_err(GatherError::from)
                .and_then(|bytes| parse_sidecar(&bytes, path));
            entries.push(InventoryEntry {
                asset: asset.to_string(),
                path: path.to_path_buf(),
                sidecar,
            });
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_sidecars_by_asset_name_and_isolates_bad_ones() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("2019")).unwrap();
        std::fs::write(
            root.join("2019/a.jpg.json"),
            br#"[{"EXIF:Make": "Canon", "XMP:Rating": 5}]"#,
        )
        .unwrap();
        std::fs::write(root.join("b.jpg.json"), b"{ nope").unwrap();
        std::fs::write(root.join("notes.txt"), b"ignored").unwrap();

        let entries = SidecarInventory::new(root).scan();
        let names: Vec<_> = entries.iter().map(|e| e.asset.as_str()).collect();
        assert_eq!(names, vec!["2019/a.jpg", "b.jpg"]);

        let good = entries[0].sidecar.as_ref().unwrap();
        assert_eq!(good.make.as_deref(), Some("Canon"));
        assert_eq!(good.rating, Some(5));
        assert!(entries[1].sidecar.is_err());
    }

    #[test]
    fn missing_area_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let entries = SidecarInventory::new(dir.path().join("metadata")).scan();
        assert!(entries.is_empty());
    }
}
