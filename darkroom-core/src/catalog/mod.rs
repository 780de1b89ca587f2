//! Seams to the remote object store.
//!
//! The reconciliation pipeline only ever sees these two traits. A real
//! object-store client implements them; [`DirectoryStore`] implements both
//! over a local directory tree.

mod directory;

pub use directory::DirectoryStore;

use std::fmt;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::asset::Asset;
use crate::error::Result;

/// Opaque continuation token handed out by a [`CatalogEnumerator`]. Callers
/// never inspect it; they pass it back verbatim for the next page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of a catalog listing. `next == None` ends the walk.
#[derive(Clone, Debug, Default)]
pub struct CatalogPage {
    pub assets: Vec<Asset>,
    pub next: Option<Cursor>,
}

impl CatalogPage {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

#[async_trait]
pub trait CatalogEnumerator: Send + Sync + fmt::Debug {
    /// List up to `page_size` assets under `prefix`, resuming at `cursor`.
    /// A failure here is fatal to the run.
    async fn list(
        &self,
        prefix: &str,
        page_size: usize,
        cursor: Option<&Cursor>,
    ) -> Result<CatalogPage>;
}

pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait BlobFetcher: Send + Sync + fmt::Debug {
    /// Open the remote bytes of `asset` as a stream. Consumed once.
    async fn open(&self, asset: &Asset) -> std::io::Result<BlobReader>;
}
