use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use darkroom_core::DirectoryStore;

const DIR_SCHEME: &str = "dir://";

/// Remote object store named on the command line.
///
/// Only `dir://<root>` is understood: a directory tree whose relative file
/// paths are the asset keys. The catalog prefix comes from `--prefix` or the
/// config, never from the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remote {
    Directory(PathBuf),
}

impl Remote {
    pub fn connect(&self) -> Arc<DirectoryStore> {
        match self {
            Remote::Directory(root) => Arc::new(DirectoryStore::new(root.clone())),
        }
    }
}

impl FromStr for Remote {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let Some(path) = raw.strip_prefix(DIR_SCHEME) else {
            return Err(format!(
                "unsupported remote {raw:?}; expected {DIR_SCHEME}<directory>"
            ));
        };
        if path.is_empty() {
            return Err(format!("remote {raw:?} names no directory"));
        }
        Ok(Remote::Directory(PathBuf::from(path)))
    }
}

impl fmt::Display for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remote::Directory(root) => write!(f, "{DIR_SCHEME}{}", root.display()),
        }
    }
}
