//! Built-in defaults (layer 1)

use std::time::Duration;

/// Canonical tldr-pages release archive.
pub const DEFAULT_ARCHIVE_URL: &str =
    "https://github.com/tldr-pages/tldr/releases/latest/download/tldr.zip";

/// Directory name of the cache root under the cache home.
pub const CACHE_DIR_NAME: &str = "tldr-man";

/// Built-in default configuration values
#[derive(Debug, Clone)]
pub struct BuiltinDefaults {
    /// Archive to download on update
    pub archive_url: String,

    /// How long to wait for the cache lock (default: 5s)
    pub lock_timeout: Duration,

    /// HTTP timeout for the archive download (default: 30s)
    pub download_timeout: Duration,

    /// Markdown to man converter (default: "pandoc")
    pub formatter: String,

    /// Man page viewer (default: "man")
    pub pager: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            lock_timeout: Duration::from_secs(5),
            download_timeout: Duration::from_secs(30),
            formatter: "pandoc".to_string(),
            pager: "man".to_string(),
        }
    }
}
