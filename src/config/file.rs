//! Optional user config file (layer 2)
//!
//! `$TLDR_MAN_CONFIG`, else `<config dir>/tldr-man/config.toml`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConfigError;

/// Values read from `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub archive_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub lock_timeout_secs: Option<u64>,
    pub download_timeout_secs: Option<u64>,
    pub formatter: Option<String>,
    pub pager: Option<String>,
}

impl FileConfig {
    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse config file contents.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Load the file if present. An explicitly named file must exist; the
    /// default location may be absent.
    pub fn load(path: &Path, explicit: bool) -> Result<Option<Self>, ConfigError> {
        match Self::from_file(path) {
            Ok(config) => Ok(Some(config)),
            Err(ConfigError::Read { source, .. })
                if !explicit && source.kind() == io::ErrorKind::NotFound =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
