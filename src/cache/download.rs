//! Archive download
//!
//! `http://` and `https://` URLs are fetched with `ureq`; `file://` URLs and
//! plain paths are copied from disk. No retries: the first failure aborts the
//! update.

use std::error::Error as StdError;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::signal::CancelToken;

/// Errors fetching or opening the archive. Every variant names the URL.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid archive URL {url}")]
    InvalidUrl { url: String },

    #[error("could not make a connection to {url}")]
    Connection { url: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} returned HTTP status {status}")]
    Http { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("got a bad zip archive from {url}: {reason}")]
    BadArchive { url: String, reason: String },

    #[error("I/O error while downloading {url}: {source}")]
    Io { url: String, source: io::Error },

    #[error("download of {url} was interrupted")]
    Interrupted { url: String },
}

const CHUNK_SIZE: usize = 64 * 1024;

/// Where an archive URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Http,
    Local(PathBuf),
}

fn classify(url: &str) -> Result<Source, DownloadError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(Source::Http)
    } else if let Some(path) = url.strip_prefix("file://") {
        Ok(Source::Local(PathBuf::from(path)))
    } else if url.contains("://") || url.is_empty() {
        Err(DownloadError::InvalidUrl {
            url: url.to_string(),
        })
    } else {
        Ok(Source::Local(PathBuf::from(url)))
    }
}

/// Stream the archive at `url` into `dest`.
///
/// `on_progress(downloaded, total)` is called after every chunk; `total` is
/// the advertised length when known.
pub fn fetch_archive(
    url: &str,
    dest: &mut File,
    timeout: Duration,
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(u64, Option<u64>),
) -> Result<u64, DownloadError> {
    match classify(url)? {
        Source::Http => {
            // Per socket operation, not the whole transfer.
            let agent = ureq::AgentBuilder::new()
                .timeout_connect(timeout)
                .timeout_read(timeout)
                .build();
            let response = agent.get(url).call().map_err(|err| map_ureq_error(url, err))?;
            let total = response
                .header("Content-Length")
                .and_then(|value| value.parse::<u64>().ok());
            let mut reader = response.into_reader();
            copy_with_progress(url, &mut reader, dest, total, cancel, on_progress)
        }
        Source::Local(path) => {
            let mut reader = File::open(&path).map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => DownloadError::Connection {
                    url: url.to_string(),
                },
                _ => DownloadError::Io {
                    url: url.to_string(),
                    source,
                },
            })?;
            let total = reader.metadata().ok().map(|meta| meta.len());
            copy_with_progress(url, &mut reader, dest, total, cancel, on_progress)
        }
    }
}

fn copy_with_progress(
    url: &str,
    reader: &mut dyn Read,
    dest: &mut File,
    total: Option<u64>,
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(u64, Option<u64>),
) -> Result<u64, DownloadError> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut downloaded = 0u64;

    loop {
        if cancel.is_cancelled() {
            return Err(DownloadError::Interrupted {
                url: url.to_string(),
            });
        }

        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(map_io_error(url, err)),
        };

        dest.write_all(&buf[..read]).map_err(|source| DownloadError::Io {
            url: url.to_string(),
            source,
        })?;
        downloaded += read as u64;
        on_progress(downloaded, total);
    }

    dest.flush().map_err(|source| DownloadError::Io {
        url: url.to_string(),
        source,
    })?;
    Ok(downloaded)
}

fn map_io_error(url: &str, err: io::Error) -> DownloadError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => DownloadError::Timeout {
            url: url.to_string(),
        },
        _ => DownloadError::Io {
            url: url.to_string(),
            source: err,
        },
    }
}

fn map_ureq_error(url: &str, err: ureq::Error) -> DownloadError {
    let url = url.to_string();
    match err {
        ureq::Error::Status(status, _response) => DownloadError::Http { url, status },
        ureq::Error::Transport(transport) => {
            let timed_out = transport
                .source()
                .and_then(|source| source.downcast_ref::<io::Error>())
                .is_some_and(|io_err| {
                    matches!(
                        io_err.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                    )
                });
            if timed_out {
                return DownloadError::Timeout { url };
            }
            match transport.kind() {
                ureq::ErrorKind::InvalidUrl | ureq::ErrorKind::UnknownScheme => {
                    DownloadError::InvalidUrl { url }
                }
                ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed => {
                    DownloadError::Connection { url }
                }
                _ => DownloadError::Transport {
                    url,
                    message: transport.to_string(),
                },
            }
        }
    }
}
