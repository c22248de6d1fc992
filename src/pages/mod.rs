//! Page lookup in the rendered cache
//!
//! Directories are searched locale first, then section, in the order given:
//! every section of the preferred locale is tried before the next locale.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tldr_page::MAN_SECTION;

use crate::cache::{CacheLock, MAN_DIR};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::locale::{self, LocaleEnv, LEGACY_ENGLISH_DIR};

/// `<cache root>/<locale>/<section>/man1` for every pair, locale outer,
/// duplicates removed keeping the first occurrence.
pub fn directory_search_order(
    cache_root: &Path,
    locales: &[String],
    sections: &[String],
) -> Vec<PathBuf> {
    section_dirs(cache_root, locales, sections)
        .into_iter()
        .map(|dir| dir.join(MAN_DIR))
        .collect()
}

fn section_dirs(cache_root: &Path, locales: &[String], sections: &[String]) -> Vec<PathBuf> {
    let mut seen = BTreeSet::new();
    let mut dirs = Vec::new();
    for locale in locales.iter().filter(|l| l.as_str() != LEGACY_ENGLISH_DIR) {
        for section in sections {
            let dir = cache_root.join(locale).join(section);
            if seen.insert(dir.clone()) {
                dirs.push(dir);
            }
        }
    }
    dirs
}

/// Resolves page names against the cache.
#[derive(Debug)]
pub struct PageResolver<'a> {
    config: &'a Config,
}

impl<'a> PageResolver<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn cache_root(&self) -> &Path {
        &self.config.cache_root
    }

    /// Lock the cache, then pick locales from `language` or `env`.
    ///
    /// The existence check, locale selection and every query on the
    /// returned view happen under one lock, held until the view is dropped.
    pub fn open(
        &self,
        language: Option<&str>,
        env: &LocaleEnv,
        sections: Vec<String>,
    ) -> Result<CacheView<'a>> {
        let lock = self.lock()?;
        self.ensure_cache_exists()?;
        let locales = locale::select_locales(&self.config.cache_root, language, env)?;
        Ok(CacheView {
            _lock: lock,
            cache_root: &self.config.cache_root,
            locales,
            sections,
        })
    }

    /// Lock the cache for a fixed locale list.
    pub fn open_with_locales(
        &self,
        locales: Vec<String>,
        sections: Vec<String>,
    ) -> Result<CacheView<'a>> {
        let lock = self.lock()?;
        self.ensure_cache_exists()?;
        Ok(CacheView {
            _lock: lock,
            cache_root: &self.config.cache_root,
            locales,
            sections,
        })
    }

    /// Language codes of the installed locales, read under the lock.
    pub fn language_codes(&self) -> Result<Vec<String>> {
        let _lock = self.lock()?;
        locale::all_language_codes(&self.config.cache_root)
            .map_err(|err| Error::io(&self.config.cache_root, err))
    }

    /// First artifact named `name` in search order.
    pub fn find_page(&self, name: &str, locales: &[String], sections: &[String]) -> Result<PathBuf> {
        self.open_with_locales(locales.to_vec(), sections.to_vec())?
            .find_page(name)
    }

    pub fn list_pages(&self, locales: &[String], sections: &[String]) -> Result<Vec<String>> {
        self.open_with_locales(locales.to_vec(), sections.to_vec())?
            .list_pages()
    }

    pub fn manpath(&self, locales: &[String], sections: &[String]) -> Result<String> {
        Ok(self
            .open_with_locales(locales.to_vec(), sections.to_vec())?
            .manpath())
    }

    /// Fail with [`Error::NoCache`] until the first update has run.
    fn ensure_cache_exists(&self) -> Result<()> {
        if self.config.cache_root.is_dir() {
            Ok(())
        } else {
            Err(Error::NoCache {
                cache_root: self.config.cache_root.clone(),
            })
        }
    }

    fn lock(&self) -> Result<CacheLock> {
        Ok(CacheLock::acquire(
            &self.config.lock_path(),
            self.config.lock_timeout,
        )?)
    }
}

/// A locked, existing cache with the locales and sections to search.
#[derive(Debug)]
pub struct CacheView<'a> {
    _lock: CacheLock,
    cache_root: &'a Path,
    locales: Vec<String>,
    sections: Vec<String>,
}

impl CacheView<'_> {
    pub fn locales(&self) -> &[String] {
        &self.locales
    }

    pub fn directory_search_order(&self) -> Vec<PathBuf> {
        directory_search_order(self.cache_root, &self.locales, &self.sections)
    }

    /// First artifact named `name` in search order.
    pub fn find_page(&self, name: &str) -> Result<PathBuf> {
        let file_name = format!("{name}.{MAN_SECTION}");
        self.directory_search_order()
            .into_iter()
            .map(|dir| dir.join(&file_name))
            .find(|path| path.is_file())
            .ok_or_else(|| Error::PageNotFound(name.to_string()))
    }

    /// Unique page names across the search order.
    ///
    /// Names are sorted within each directory; the first occurrence wins.
    pub fn list_pages(&self) -> Result<Vec<String>> {
        let suffix = format!(".{MAN_SECTION}");
        let mut seen = BTreeSet::new();
        let mut pages = Vec::new();
        for dir in self.directory_search_order() {
            for name in page_stems(&dir, &suffix).map_err(|err| Error::io(&dir, err))? {
                if seen.insert(name.clone()) {
                    pages.push(name);
                }
            }
        }
        Ok(pages)
    }

    /// Section directories of the search order joined with `:`, for `MANPATH`.
    pub fn manpath(&self) -> String {
        let dirs: Vec<String> = section_dirs(self.cache_root, &self.locales, &self.sections)
            .iter()
            .map(|dir| dir.to_string_lossy().into_owned())
            .collect();
        dirs.join(":")
    }
}

/// Sorted artifact names in `dir` with `suffix` removed. A missing
/// directory has none.
fn page_stems(dir: &Path, suffix: &str) -> io::Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(stem) = entry.file_name().to_str().and_then(|n| n.strip_suffix(suffix)) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}
