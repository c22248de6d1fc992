//! Pre-replacement check of the cache root
//!
//! An update deletes the whole cache root. Before doing so, make sure it only
//! holds locale directories (`pages`, `pages.fr`, `pages.pt_BR`), so a
//! misconfigured cache path never wipes user data.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;

use crate::error::{Error, Result};

fn locale_dir_regex() -> &'static Regex {
    static LOCALE_DIR: OnceLock<Regex> = OnceLock::new();
    LOCALE_DIR.get_or_init(|| {
        Regex::new(r"^pages(\.[a-z]{2}(_[A-Z]{2})?)?$").expect("locale dir regex is valid")
    })
}

/// Whether `name` is a valid locale directory name.
pub fn is_locale_dir_name(name: &str) -> bool {
    locale_dir_regex().is_match(name)
}

/// Entries of `cache_root` that do not belong to the cache layout.
///
/// A missing cache root has none.
pub fn foreign_entries(cache_root: &Path) -> io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(cache_root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut offending = Vec::new();
    for entry in entries {
        let entry = entry?;
        let is_dir = entry.file_type()?.is_dir();
        let name_ok = entry.file_name().to_str().is_some_and(is_locale_dir_name);
        if !(is_dir && name_ok) {
            offending.push(entry.path());
        }
    }
    offending.sort();
    Ok(offending)
}

/// Fail with [`Error::ForeignContent`] unless the cache root is absent or
/// contains only locale directories.
pub fn assert_safe_to_replace(cache_root: &Path) -> Result<()> {
    if cache_root.exists() && !cache_root.is_dir() {
        return Err(Error::ForeignContent {
            cache_root: cache_root.to_path_buf(),
            offending: vec![cache_root.to_path_buf()],
        });
    }

    let offending = foreign_entries(cache_root).map_err(|err| Error::io(cache_root, err))?;
    if offending.is_empty() {
        Ok(())
    } else {
        Err(Error::ForeignContent {
            cache_root: cache_root.to_path_buf(),
            offending,
        })
    }
}
