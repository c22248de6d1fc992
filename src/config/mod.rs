//! Client configuration
//!
//! Layers, later ones win:
//! 1. Built-in defaults
//! 2. User config file (`~/.config/tldr-man/config.toml` or `$TLDR_MAN_CONFIG`)
//! 3. Environment (`TLDR_MAN_ARCHIVE_URL`, `TLDR_MAN_CACHE_DIR`, `XDG_CACHE_HOME`)
//!
//! The resulting [`Config`] is built once at startup and handed to the
//! synchronizer, resolver and display driver.

mod defaults;
mod file;

pub use defaults::{BuiltinDefaults, CACHE_DIR_NAME, DEFAULT_ARCHIVE_URL};
pub use file::FileConfig;

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors from building the configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("could not determine a cache directory; set TLDR_MAN_CACHE_DIR or XDG_CACHE_HOME")]
    NoCacheHome,

    #[error("{key} must be greater than zero")]
    ZeroTimeout { key: &'static str },
}

/// Snapshot of the environment the configuration is built from.
#[derive(Debug, Clone, Default)]
pub struct ConfigEnv {
    /// `TLDR_MAN_CONFIG`
    pub config_file: Option<PathBuf>,
    /// `TLDR_MAN_ARCHIVE_URL`
    pub archive_url: Option<String>,
    /// `TLDR_MAN_CACHE_DIR`
    pub cache_dir: Option<PathBuf>,
    /// `XDG_CACHE_HOME`
    pub xdg_cache_home: Option<PathBuf>,
    /// Platform cache directory fallback
    pub platform_cache_home: Option<PathBuf>,
    /// Platform config directory
    pub platform_config_home: Option<PathBuf>,
}

impl ConfigEnv {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self {
            config_file: non_empty_var("TLDR_MAN_CONFIG").map(PathBuf::from),
            archive_url: non_empty_var("TLDR_MAN_ARCHIVE_URL")
                .map(|value| value.to_string_lossy().into_owned()),
            cache_dir: non_empty_var("TLDR_MAN_CACHE_DIR").map(PathBuf::from),
            xdg_cache_home: non_empty_var("XDG_CACHE_HOME").map(PathBuf::from),
            platform_cache_home: dirs::cache_dir(),
            platform_config_home: dirs::config_dir(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<OsString> {
    env::var_os(key).filter(|value| !value.is_empty())
}

/// Effective client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the rendered page cache
    pub cache_root: PathBuf,
    /// Archive downloaded by `--update`
    pub archive_url: String,
    /// Bounded wait for the cache lock
    pub lock_timeout: Duration,
    /// Archive download timeout
    pub download_timeout: Duration,
    /// Markdown to man converter program
    pub formatter: String,
    /// Man page viewer program
    pub pager: String,
}

impl Config {
    /// Build the configuration from all layers.
    pub fn build(env: &ConfigEnv) -> Result<Self, ConfigError> {
        let defaults = BuiltinDefaults::default();

        let file = match (&env.config_file, &env.platform_config_home) {
            (Some(path), _) => FileConfig::load(path, true)?,
            (None, Some(dir)) => {
                FileConfig::load(&dir.join(CACHE_DIR_NAME).join("config.toml"), false)?
            }
            (None, None) => None,
        }
        .unwrap_or_default();

        let cache_root = match (&env.cache_dir, &file.cache_dir, &env.xdg_cache_home) {
            (Some(dir), _, _) => dir.clone(),
            (None, Some(dir), _) => dir.clone(),
            (None, None, Some(home)) => home.join(CACHE_DIR_NAME),
            (None, None, None) => env
                .platform_cache_home
                .as_ref()
                .map(|home| home.join(CACHE_DIR_NAME))
                .ok_or(ConfigError::NoCacheHome)?,
        };

        let lock_timeout = match file.lock_timeout_secs {
            Some(0) => return Err(ConfigError::ZeroTimeout { key: "lock_timeout_secs" }),
            Some(secs) => Duration::from_secs(secs),
            None => defaults.lock_timeout,
        };
        let download_timeout = match file.download_timeout_secs {
            Some(0) => {
                return Err(ConfigError::ZeroTimeout {
                    key: "download_timeout_secs",
                })
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.download_timeout,
        };

        Ok(Self {
            cache_root,
            archive_url: env
                .archive_url
                .clone()
                .or(file.archive_url)
                .unwrap_or(defaults.archive_url),
            lock_timeout,
            download_timeout,
            formatter: file.formatter.unwrap_or(defaults.formatter),
            pager: file.pager.unwrap_or(defaults.pager),
        })
    }

    /// Defaults with an explicit cache root.
    pub fn with_cache_root(cache_root: impl Into<PathBuf>) -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            cache_root: cache_root.into(),
            archive_url: defaults.archive_url,
            lock_timeout: defaults.lock_timeout,
            download_timeout: defaults.download_timeout,
            formatter: defaults.formatter,
            pager: defaults.pager,
        }
    }

    /// Directory holding the cache root; staging directories and the lock
    /// file live here so the cache root can be replaced wholesale.
    pub fn cache_parent(&self) -> &Path {
        match self.cache_root.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Lock file guarding the cache root: `<parent>/<cache root name>.lock`.
    pub fn lock_path(&self) -> PathBuf {
        let name = self
            .cache_root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| CACHE_DIR_NAME.to_string());
        self.cache_parent().join(format!("{name}.lock"))
    }
}
