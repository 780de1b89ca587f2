use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::Result;
use crate::store::file_exists;

/// Ordered list of local storage roots. Priority is positional: the first
/// root holding a file with the requested relative name is authoritative.
#[derive(Clone, Debug, Default)]
pub struct LocalResolver {
    roots: Vec<PathBuf>,
}

impl LocalResolver {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Path of the first root containing `relative`, or `None` when no root
    /// has it. One existence check per root, stopping at the first hit.
    pub async fn find(&self, relative: &Path) -> Result<Option<PathBuf>> {
        for root in &self.roots {
            let candidate = root.join(relative);
            if file_exists(&candidate).await? {
                trace!(path = %candidate.display(), "local hit");
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}
