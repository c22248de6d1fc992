//! Cross-process lock for the page cache
//!
//! Every read of the cache root and the final swap of an update run under
//! this lock. It is an advisory lock on a file next to the cache root (not
//! inside it, so replacing the cache root never removes the lock):
//! - bounded wait, failing with [`LockError::Timeout`]
//! - one contention warning
//! - released on drop

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Lock result type
pub type LockResult<T> = Result<T, LockError>;

/// Errors from lock operations
#[derive(Debug, Error)]
pub enum LockError {
    #[error("timed out after {timeout:?} waiting for {}", path.display())]
    Timeout { path: PathBuf, timeout: Duration },

    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Advisory file lock, released when dropped.
#[derive(Debug)]
pub struct CacheLock {
    lock_path: PathBuf,
    #[allow(dead_code)]
    lock_file: File,
}

impl CacheLock {
    const POLL_INTERVAL: Duration = Duration::from_millis(50);
    const WARN_AFTER: Duration = Duration::from_millis(500);

    /// Acquire the lock at `lock_path`, waiting up to `timeout`.
    ///
    /// Creates the parent directory and the lock file if needed.
    pub fn acquire(lock_path: &Path, timeout: Duration) -> LockResult<Self> {
        let io_error = |source: io::Error| LockError::Io {
            path: lock_path.to_path_buf(),
            source,
        };

        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let start = Instant::now();
        let mut warned = false;

        loop {
            match Self::try_acquire_exclusive(lock_path) {
                Ok(file) => {
                    if warned {
                        tracing::info!(
                            path = %lock_path.display(),
                            waited_secs = start.elapsed().as_secs_f64(),
                            "cache lock acquired after contention"
                        );
                    }
                    return Ok(Self {
                        lock_path: lock_path.to_path_buf(),
                        lock_file: file,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if !warned && start.elapsed() > Self::WARN_AFTER {
                        tracing::warn!(path = %lock_path.display(), "cache lock is held by another process, waiting");
                        warned = true;
                    }
                }
                Err(e) => return Err(io_error(e)),
            }

            if start.elapsed() >= timeout {
                return Err(LockError::Timeout {
                    path: lock_path.to_path_buf(),
                    timeout,
                });
            }

            std::thread::sleep(Self::POLL_INTERVAL);
        }
    }

    #[cfg(unix)]
    fn try_acquire_exclusive(lock_path: &Path) -> io::Result<File> {
        use std::os::unix::fs::OpenOptionsExt;
        use std::os::unix::io::AsRawFd;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o644)
            .open(lock_path)?;

        // SAFETY: the descriptor is owned by `file` and stays open for the call.
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };

        if result == 0 {
            Ok(file)
        } else {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
                Err(io::Error::new(io::ErrorKind::WouldBlock, "lock held"))
            } else {
                Err(err)
            }
        }
    }

    #[cfg(not(unix))]
    fn try_acquire_exclusive(lock_path: &Path) -> io::Result<File> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
        {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(io::Error::new(io::ErrorKind::WouldBlock, "lock held"))
            }
            Err(e) => Err(e),
        }
    }

    /// Get the lock file path.
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            // SAFETY: the descriptor is still owned by `lock_file`.
            unsafe {
                libc::flock(self.lock_file.as_raw_fd(), libc::LOCK_UN);
            }
        }
        #[cfg(not(unix))]
        {
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}
