use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::asset::Asset;
use crate::catalog::BlobFetcher;
use crate::error::{GatherError, Result};
use crate::layout::StorageLayout;
use crate::resolver::LocalResolver;
use crate::store::{StreamError, stream_atomically};

/// Where a resolved source came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceOrigin {
    /// Found in one of the search roots.
    Local,
    /// Streamed from the remote store into the download root.
    Fetched,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSource {
    pub path: PathBuf,
    pub origin: SourceOrigin,
}

/// Local lookup with remote fallback. Misses are streamed into
/// `<base>/download/<asset name>`.
#[derive(Clone)]
pub struct FetchCache {
    resolver: LocalResolver,
    layout: StorageLayout,
    fetcher: Arc<dyn BlobFetcher>,
}

impl fmt::Debug for FetchCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCache")
            .field("search_roots", &self.resolver.roots())
            .field("download_dir", &self.layout.download_dir())
            .field("fetcher", &self.fetcher)
            .finish()
    }
}

impl FetchCache {
    pub fn new(
        resolver: LocalResolver,
        layout: StorageLayout,
        fetcher: Arc<dyn BlobFetcher>,
    ) -> Self {
        Self {
            resolver,
            layout,
            fetcher,
        }
    }

    pub fn resolver(&self) -> &LocalResolver {
        &self.resolver
    }

    /// Local path of the asset's original, fetching it when no search root
    /// has a copy. Failures only concern this asset.
    pub async fn resolve(
        &self,
        asset: &Asset,
        cancel: &CancellationToken,
    ) -> Result<ResolvedSource> {
        let relative = asset.relative_path()?;
        if let Some(path) = self.resolver.find(&relative).await? {
            debug!(asset = %asset, path = %path.display(), "source found locally");
            return Ok(ResolvedSource {
                path,
                origin: SourceOrigin::Local,
            });
        }

        let dest = self.layout.download_path(asset)?;
        info!(asset = %asset, dest = %dest.display(), "fetching source from remote");

        let mut reader = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(GatherError::Cancelled(format!("fetch of {asset}")));
            }
            opened = self.fetcher.open(asset) => opened.map_err(|source| {
                GatherError::Fetch { asset: asset.name().to_string(), source }
            })?,
        };

        let copied = stream_atomically(&mut reader, &dest, cancel)
            .await
            .map_err(|err| match err {
                StreamError::Transfer(source) => GatherError::Fetch {
                    asset: asset.name().to_string(),
                    source,
                },
                StreamError::Local(err) => err,
                StreamError::Cancelled => {
                    GatherError::Cancelled(format!("fetch of {asset}"))
                }
            })?;

        if let Some(expected) = asset.size()
            && expected != copied
        {
            let _ = tokio::fs::remove_file(&dest).await;
            return Err(GatherError::Fetch {
                asset: asset.name().to_string(),
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("expected {expected} bytes, received {copied}"),
                ),
            });
        }

        debug!(asset = %asset, bytes = copied, "fetched source");
        Ok(ResolvedSource {
            path: dest,
            origin: SourceOrigin::Fetched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DirectoryStore;

    #[tokio::test]
    async fn fetches_missing_asset_into_download_root() {
        let remote = tempfile::tempdir().unwrap();
        let base = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(remote.path().join("2021"))
            .await
            .unwrap();
        tokio::fs::write(remote.path().join("2021/IMG_9.jpg"), b"remote bytes")
            .await
            .unwrap();

        let layout = StorageLayout::new(base.path());
        let cache = FetchCache::new(
            LocalResolver::new(vec![layout.download_dir()]),
            layout.clone(),
            Arc::new(DirectoryStore::new(remote.path())),
        );
        let asset = Asset::new("2021/IMG_9.jpg").with_size(12);
        let cancel = CancellationToken::new();

        let first = cache.resolve(&asset, &cancel).await.unwrap();
        assert_eq!(first.origin, SourceOrigin::Fetched);
        assert_eq!(first.path, base.path().join("download/2021/IMG_9.jpg"));
        assert_eq!(tokio::fs::read(&first.path).await.unwrap(), b"remote bytes");

        let second = cache.resolve(&asset, &cancel).await.unwrap();
        assert_eq!(second.origin, SourceOrigin::Local);
        assert_eq!(second.path, first.path);
    }

    #[tokio::test]
    async fn short_transfer_is_rejected_and_removed() {
        let remote = tempfile::tempdir().unwrap();
        let base = tempfile::tempdir().unwrap();
        tokio::fs::write(remote.path().join("IMG_1.jpg"), b"abc")
            .await
            .unwrap();

        let layout = StorageLayout::new(base.path());
        let cache = FetchCache::new(
            LocalResolver::default(),
            layout.clone(),
            Arc::new(DirectoryStore::new(remote.path())),
        );
        let asset = Asset::new("IMG_1.jpg").with_size(10);

        let err = cache
            .resolve(&asset, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatherError::Fetch { .. }));
        assert!(!layout.download_path(&asset).unwrap().exists());
    }

    #[tokio::test]
    async fn cancelled_fetch_publishes_nothing() {
        let remote = tempfile::tempdir().unwrap();
        let base = tempfile::tempdir().unwrap();
        tokio::fs::write(remote.path().join("IMG_1.jpg"), b"abc")
            .await
            .unwrap();

        let layout = StorageLayout::new(base.path());
        let cache = FetchCache::new(
            LocalResolver::default(),
            layout.clone(),
            Arc::new(DirectoryStore::new(remote.path())),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = cache
            .resolve(&Asset::new("IMG_1.jpg"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, GatherError::Cancelled(_)));
        assert!(!base.path().join("download/IMG_1.jpg").exists());
    }
}
