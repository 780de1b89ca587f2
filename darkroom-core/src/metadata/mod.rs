//! Metadata sidecars: local reconciliation plus read-side parsing.

mod inventory;
mod sidecar;

pub use inventory::{InventoryEntry, SidecarInventory};
pub use sidecar::{Sidecar, parse_sidecar, read_sidecar};

use std::path::PathBuf;

use tracing::{debug, info};

use crate::asset::Asset;
use crate::error::Result;
use crate::layout::StorageLayout;
use crate::resolver::LocalResolver;
use crate::store::{copy_atomically, file_exists};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataStatus {
    /// `metadata/<name>.json` was already there.
    Present,
    /// Copied verbatim from a search root.
    Copied { from: PathBuf },
    /// No search root has a sidecar for this asset. Not an error; there is
    /// no remote sidecar source to fall back to.
    Unresolved,
}

/// Makes sure `<base>/metadata/<name>.json` exists, copying it from the first
/// search root that holds `<name>.json`.
#[derive(Clone, Debug)]
pub struct MetadataReconciler {
    layout: StorageLayout,
    resolver: LocalResolver,
}

impl MetadataReconciler {
    pub fn new(layout: StorageLayout, resolver: LocalResolver) -> Self {
        Self { layout, resolver }
    }

    pub async fn ensure(&self, asset: &Asset) -> Result<MetadataStatus> {
        let local = self.layout.metadata_path(asset)?;
        if file_exists(&local).await? {
            return Ok(MetadataStatus::Present);
        }

        let Some(found) = self.resolver.find(&asset.sidecar_path()?).await? else {
            info!(asset = %asset, "cannot find metadata");
            return Ok(MetadataStatus::Unresolved);
        };

        let bytes = copy_atomically(&found, &local).await?;
        debug!(asset = %asset, from = %found.display(), bytes, "copied metadata");
        Ok(MetadataStatus::Copied { from: found })
    }
}
