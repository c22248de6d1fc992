//! Crate-level error taxonomy.
//!
//! Components return typed failures; only the binary turns them into
//! messages and exit codes.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cache::{DownloadError, LockError};
use crate::config::ConfigError;
use crate::render::RenderError;

/// Exit code for generic failures.
pub const EXIT_CODE_FAILURE: i32 = 1;

/// Exit code when the page cache has not been generated yet.
pub const EXIT_CODE_NO_CACHE: i32 = 3;

/// Exit code when a required external command is not installed.
pub const EXIT_CODE_TOOL_MISSING: i32 = 127;

/// Exit code for an update aborted by SIGINT/SIGTERM.
pub const EXIT_CODE_CANCELLED: i32 = 130;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unrecognized locale: {0}")]
    UnrecognizedLocale(String),

    #[error("page `{0}` not found")]
    PageNotFound(String),

    #[error("couldn't find the `{tool}` command")]
    ToolMissing { tool: String },

    #[error("page cache does not exist at {}", cache_root.display())]
    NoCache { cache_root: PathBuf },

    #[error("cache directory {} contains unexpected entries", cache_root.display())]
    ForeignContent {
        cache_root: PathBuf,
        /// Every entry that does not belong to the cache layout
        offending: Vec<PathBuf>,
    },

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("failed to render `{page}`: {source}")]
    RenderPage { page: String, source: RenderError },

    #[error(transparent)]
    Render(RenderError),

    #[error("cache lock: {0}")]
    Lock(#[from] LockError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("pager `{pager}` failed: {reason}")]
    Pager { pager: String, reason: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl Error {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ToolMissing { .. } => EXIT_CODE_TOOL_MISSING,
            Self::Render(RenderError::ToolMissing { .. })
            | Self::RenderPage {
                source: RenderError::ToolMissing { .. },
                ..
            } => EXIT_CODE_TOOL_MISSING,
            Self::NoCache { .. } => EXIT_CODE_NO_CACHE,
            Self::Cancelled => EXIT_CODE_CANCELLED,
            _ => EXIT_CODE_FAILURE,
        }
    }
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::ToolMissing { tool } => Self::ToolMissing { tool },
            other => Self::Render(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            Error::ToolMissing {
                tool: "pandoc".to_string()
            }
            .exit_code(),
            127
        );
        assert_eq!(
            Error::NoCache {
                cache_root: PathBuf::from("/tmp/x")
            }
            .exit_code(),
            3
        );
        assert_eq!(Error::PageNotFound("foo".to_string()).exit_code(), 1);
        assert_eq!(Error::Cancelled.exit_code(), 130);
    }

    #[test]
    fn test_missing_formatter_maps_to_tool_missing() {
        let err: Error = RenderError::ToolMissing {
            tool: "pandoc".to_string(),
        }
        .into();
        assert!(matches!(err, Error::ToolMissing { ref tool } if tool == "pandoc"));
        assert_eq!(err.exit_code(), EXIT_CODE_TOOL_MISSING);
    }
}
