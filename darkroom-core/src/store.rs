//! Filesystem primitives shared by every cache area.
//!
//! Existence is the only cache signal in this crate, so nothing may ever
//! appear at a final path half-written. All writers stage into a sibling temp
//! file and rename into place.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{GatherError, Result};

/// `Ok(true)` when a regular file exists at `path`. Absence is not an error;
/// any other stat failure is.
pub async fn file_exists(path: &Path) -> Result<bool> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(
        ".{file_name}.tmp-{}",
        Uuid::new_v4().simple()
    ))
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|source| {
            GatherError::Write {
                path: parent.to_path_buf(),
                source,
            }
        })?;
    }
    Ok(())
}

async fn publish(tmp: &Path, path: &Path) -> Result<()> {
    tokio::fs::rename(tmp, path).await.map_err(|source| {
        GatherError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Write `bytes` to `path` via temp file + rename, creating parents.
pub async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_parent(path).await?;
    let tmp = temp_path_for(path);

    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await
    }
    .await;

    if let Err(source) = result {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(GatherError::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    publish(&tmp, path).await
}

/// Byte-for-byte copy of `source` to `dest` via temp file + rename.
pub async fn copy_atomically(source: &Path, dest: &Path) -> Result<u64> {
    ensure_parent(dest).await?;
    let tmp = temp_path_for(dest);

    let copied = match tokio::fs::copy(source, &tmp).await {
        Ok(copied) => copied,
        Err(source_err) => {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(GatherError::Write {
                path: dest.to_path_buf(),
                source: source_err,
            });
        }
    };

    publish(&tmp, dest).await?;
    Ok(copied)
}

/// Drain `reader` into `dest` via temp file + rename.
///
/// Returns the number of bytes written. The temp file is removed when the
/// stream fails or `cancel` fires, so no partial file is ever published.
pub async fn stream_atomically<R>(
    reader: &mut R,
    dest: &Path,
    cancel: &CancellationToken,
) -> std::result::Result<u64, StreamError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    ensure_parent(dest).await.map_err(StreamError::Local)?;
    let tmp = temp_path_for(dest);

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StreamError::Cancelled),
        res = async {
            let mut file = tokio::fs::File::create(&tmp)
                .await
                .map_err(|source| StreamError::Local(GatherError::Write {
                    path: tmp.clone(),
                    source,
                }))?;
            let copied = tokio::io::copy(reader, &mut file)
                .await
                .map_err(StreamError::Transfer)?;
            file.flush().await.map_err(StreamError::Transfer)?;
            file.sync_all().await.map_err(|source| {
                StreamError::Local(GatherError::Write {
                    path: tmp.clone(),
                    source,
                })
            })?;
            Ok::<u64, StreamError>(copied)
        } => res,
    };

    match outcome {
        Ok(copied) => {
            publish(&tmp, dest).await.map_err(StreamError::Local)?;
            Ok(copied)
        }
        Err(err) => {
            let _ = tokio::fs::remove_file(&tmp).await;
            Err(err)
        }
    }
}

/// Why [`stream_atomically`] gave up.
#[derive(Debug)]
pub enum StreamError {
    /// Reading from the source stream failed.
    Transfer(io::Error),
    /// Creating, writing or publishing the local file failed.
    Local(GatherError),
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_atomically_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/c.bin");

        write_atomically(&target, b"hello").await.unwrap();

        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"hello");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("a/b"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[tokio::test]
    async fn file_exists_distinguishes_files_from_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.jpg");
        tokio::fs::write(&file, b"x").await.unwrap();

        assert!(file_exists(&file).await.unwrap());
        assert!(!file_exists(dir.path()).await.unwrap());
        assert!(!file_exists(&dir.path().join("missing")).await.unwrap());
    }

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "peer went away",
            )))
        }
    }

    #[tokio::test]
    async fn failed_stream_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("download/x.jpg");

        let err = stream_atomically(
            &mut FailingReader,
            &target,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, StreamError::Transfer(_)));
        assert!(!target.exists());
        let leftovers = std::fs::read_dir(dir.path().join("download"))
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
    }
}
