//! Scoped temporary files and staging directories.
//!
//! Everything here is removed on drop. A resource that is already gone when
//! cleanup runs is not an error.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};

/// Temporary file removed when dropped.
#[derive(Debug)]
pub struct TempFile {
    inner: NamedTempFile,
}

impl TempFile {
    /// Create a temp file in the system temp directory.
    pub fn new(prefix: &str, suffix: &str) -> io::Result<Self> {
        let inner = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile()?;
        Ok(Self { inner })
    }

    /// Create a temp file holding `contents`.
    pub fn with_contents(prefix: &str, suffix: &str, contents: &[u8]) -> io::Result<Self> {
        let temp = Self::new(prefix, suffix)?;
        fs::write(temp.path(), contents)?;
        Ok(temp)
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    pub fn as_file_mut(&mut self) -> &mut File {
        self.inner.as_file_mut()
    }

    /// Open a second read handle on the file.
    pub fn reopen(&self) -> io::Result<File> {
        self.inner.reopen()
    }
}

/// Staging directory that is either promoted into place or deleted.
#[derive(Debug)]
pub struct StagingDir {
    dir: TempDir,
}

impl StagingDir {
    /// Create a staging directory inside `parent`.
    ///
    /// `parent` is created if needed. Staging next to the destination keeps
    /// [`StagingDir::promote`] a same-filesystem rename.
    pub fn new_in(parent: &Path, prefix: &str) -> io::Result<Self> {
        fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new().prefix(prefix).tempdir_in(parent)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Move the staged tree to `dest`, which must not exist.
    ///
    /// On failure the staged tree is removed.
    pub fn promote(self, dest: &Path) -> io::Result<PathBuf> {
        let staged = self.dir.keep();
        if let Err(err) = fs::rename(&staged, dest) {
            remove_dir_quietly(&staged);
            return Err(err);
        }
        Ok(dest.to_path_buf())
    }
}

/// Remove a directory tree, ignoring "already removed".
pub fn remove_dir_quietly(path: &Path) {
    if let Err(err) = fs::remove_dir_all(path) {
        if err.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove temporary directory");
        }
    }
}

/// Remove a directory tree, treating "already absent" as success.
pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
