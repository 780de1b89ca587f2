use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{BlobFetcher, BlobReader, CatalogEnumerator, CatalogPage, Cursor};
use crate::asset::{Asset, key_from_relative};
use crate::error::{GatherError, Result};

/// A directory tree treated as a remote bucket.
///
/// Keys are `/`-separated paths relative to the root, listed in
/// lexicographic order. The cursor is the last key of the previous page.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collect_keys(
        root: &Path,
        prefix: &str,
    ) -> Result<Vec<(String, Option<u64>)>> {
        let mut keys = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|err| {
                GatherError::Catalog(format!(
                    "failed to walk {}: {err}",
                    root.display()
                ))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let Some(key) = key_from_relative(relative) else {
                warn!(path = %entry.path().display(), "skipping non UTF-8 key");
                continue;
            };
            if !key.starts_with(prefix) {
                continue;
            }

            // An unknown size disables the length check on fetch.
            let size = entry.metadata().ok().map(|meta| meta.len());
            keys.push((key, size));
        }
        keys.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        Ok(keys)
    }
}

fn catalog_asset(key: String, size: Option<u64>) -> Asset {
    let asset = Asset::new(key);
    match size {
        Some(size) => asset.with_size(size),
        None => asset,
    }
}

#[async_trait]
impl CatalogEnumerator for DirectoryStore {
    async fn list(
        &self,
        prefix: &str,
        page_size: usize,
        cursor: Option<&Cursor>,
    ) -> Result<CatalogPage> {
        let root = self.root.clone();
        let owned_prefix = prefix.to_string();
        let keys = tokio::task::spawn_blocking(move || {
            Self::collect_keys(&root, &owned_prefix)
        })
        .await
        .map_err(|err| {
            GatherError::Internal(format!("catalog walk task failed: {err}"))
        })??;

        let after = cursor.map(Cursor::as_str);
        let mut remaining = keys
            .into_iter()
            .filter(|(key, _)| after.is_none_or(|last| key.as_str() > last))
            .peekable();

        let page_size = page_size.max(1);
        let mut assets = Vec::with_capacity(page_size);
        while assets.len() < page_size {
            match remaining.next() {
                Some((key, size)) => assets.push(catalog_asset(key, size)),
                None => break,
            }
        }

        let next = match (remaining.peek(), assets.last()) {
            (Some(_), Some(last)) => Some(Cursor::new(last.name())),
            _ => None,
        };

        debug!(
            root = %self.root.display(),
            prefix,
            listed = assets.len(),
            more = next.is_some(),
            "listed directory catalog page"
        );
        Ok(CatalogPage { assets, next })
    }
}

#[async_trait]
impl BlobFetcher for DirectoryStore {
    async fn open(&self, asset: &Asset) -> io::Result<BlobReader> {
        let relative = asset.relative_path().map_err(|err| {
            io::Error::new(io::ErrorKind::InvalidInput, err.to_string())
        })?;
        let file = tokio::fs::File::open(self.root.join(relative)).await?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn seed(root: &Path, names: &[&str]) {
        for name in names {
            let path = root.join(name);
            tokio::fs::create_dir_all(path.parent().unwrap())
                .await
                .unwrap();
            tokio::fs::write(&path, name.as_bytes()).await.unwrap();
        }
    }

    #[tokio::test]
    async fn pages_through_keys_in_order() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), &["b/2.jpg", "a/1.jpg", "c.txt", "a/0.JPG", "b/3.jpg"])
            .await;
        let store = DirectoryStore::new(dir.path());

        let mut names = Vec::new();
        let mut cursor: Option<Cursor> = None;
        let mut pages = 0;
        loop {
            let page = store.list("", 2, cursor.as_ref()).await.unwrap();
            pages += 1;
            names.extend(page.assets.iter().map(|a| a.name().to_string()));
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(
            names,
            vec!["a/0.JPG", "a/1.jpg", "b/2.jpg", "b/3.jpg", "c.txt"]
        );
    }

    #[tokio::test]
    async fn prefix_limits_listing_and_exact_fit_ends_walk() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), &["a/1.jpg", "a/2.jpg", "b/1.jpg"]).await;
        let store = DirectoryStore::new(dir.path());

        let page = store.list("a/", 2, None).await.unwrap();
        assert_eq!(page.assets.len(), 2);
        assert!(page.is_last());
    }

    #[tokio::test]
    async fn listed_sizes_come_from_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), &["x/y.jpg"]).await;
        let store = DirectoryStore::new(dir.path());

        let page = store.list("", 10, None).await.unwrap();
        assert_eq!(page.assets[0].size(), Some("x/y.jpg".len() as u64));
    }

    #[test]
    fn unknown_size_is_not_reported_as_empty() {
        assert_eq!(catalog_asset("a.jpg".into(), None).size(), None);
        assert_eq!(catalog_asset("a.jpg".into(), Some(0)).size(), Some(0));
    }

    #[tokio::test]
    async fn open_streams_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), &["x/y.jpg"]).await;
        let store = DirectoryStore::new(dir.path());

        let mut reader = store.open(&Asset::new("x/y.jpg")).await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"x/y.jpg");

        assert!(store.open(&Asset::new("../escape.jpg")).await.is_err());
    }
}
