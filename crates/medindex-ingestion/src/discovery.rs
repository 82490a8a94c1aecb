//! File discovery.
//!
//! Walks a root path (single file or directory tree) and yields files whose
//! name contains the extractor's extension. No ordering guarantee.

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use medindex_common::{MedindexError, Result};

#[derive(Debug, Clone)]
pub struct Discovery {
    root: PathBuf,
    extension: String,
}

impl Discovery {
    /// Fails with `NotFound` unless `root` is an existing file or directory.
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Result<Self> {
        let root = root.into();
        if !root.is_file() && !root.is_dir() {
            return Err(MedindexError::NotFound(root));
        }
        Ok(Self { root, extension: extension.into() })
    }

    /// Lazily walk the tree. A file root yields itself iff it matches.
    pub fn into_paths(self) -> impl Iterator<Item = PathBuf> + Send {
        let extension = self.extension;
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(move |entry| matches_extension(entry.path(), &extension))
            .map(|entry| entry.into_path())
    }
}

/// Substring match on the file name only, never on parent directories.
pub fn matches_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().contains(extension))
        .unwrap_or(false)
}

/// Collect every matching path under `root`.
pub fn discover_files(root: impl AsRef<Path>, extension: &str) -> Result<Vec<PathBuf>> {
    Ok(Discovery::new(root.as_ref(), extension)?.into_paths().collect())
}
