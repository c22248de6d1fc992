//! Cache update
//!
//! Phases: preflight, download, extract and render into a staging directory,
//! then swap the staging directory in as the new cache root under the cache
//! lock. Any failure before the swap leaves the live cache untouched.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use zip::ZipArchive;

use super::download::{fetch_archive, DownloadError};
use super::guard;
use super::lock::CacheLock;
use super::pool::{default_workers, RenderJob, RenderPool};
use super::stats::{Change, UpdateStats};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::locale::LEGACY_ENGLISH_DIR;
use crate::render::{artifact_name, Formatter};
use crate::signal::CancelToken;
use crate::temp::{remove_dir_if_exists, StagingDir, TempFile};

/// Directory holding the rendered artifacts of one section.
pub const MAN_DIR: &str = "man1";

const STAGING_PREFIX: &str = ".tldr-man-staging-";

/// Update phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Preflight,
    Downloading,
    Extracting,
    Rendering,
    Staged,
    Swapped,
    Reported,
}

/// Receives progress from [`CacheSynchronizer::update`].
///
/// Every method has an empty default.
pub trait SyncObserver {
    fn phase(&mut self, _phase: SyncPhase) {}

    fn download_progress(&mut self, _downloaded: u64, _total: Option<u64>) {}

    fn section_started(&mut self, _locale: &str, _section: &str, _documents: usize) {}

    fn section_advanced(&mut self) {}

    fn section_finished(&mut self, _locale: &str, _section: &str) {}

    fn finished(&mut self, _stats: &UpdateStats) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct SilentObserver;

impl SyncObserver for SilentObserver {}

/// How an archive entry is treated.
#[derive(Debug, PartialEq, Eq)]
enum EntryKind<'a> {
    Document {
        locale: &'a str,
        section: &'a str,
        name: &'a str,
    },
    Directory,
    LegacyEnglish,
    InvalidLocale(&'a str),
    Other,
}

fn classify_entry(path: &str) -> EntryKind<'_> {
    if path.ends_with('/') {
        return EntryKind::Directory;
    }

    let parts: Vec<&str> = path.split('/').collect();
    let [locale, section, name] = parts.as_slice() else {
        return EntryKind::Other;
    };
    if section.is_empty() || !name.ends_with(".md") || name.len() == ".md".len() {
        return EntryKind::Other;
    }
    if *locale == LEGACY_ENGLISH_DIR {
        return EntryKind::LegacyEnglish;
    }
    if !guard::is_locale_dir_name(locale) {
        return EntryKind::InvalidLocale(locale);
    }
    EntryKind::Document {
        locale,
        section,
        name,
    }
}

/// Archive entry index of one source document.
#[derive(Debug, Clone)]
struct ArchiveDocument {
    index: usize,
    name: String,
}

/// locale -> section -> documents
type ArchiveLayout = BTreeMap<String, BTreeMap<String, Vec<ArchiveDocument>>>;

fn group_entries<R: Read + Seek>(archive: &ZipArchive<R>) -> ArchiveLayout {
    let mut layout = ArchiveLayout::new();
    let mut legacy_skipped = 0usize;

    for index in 0..archive.len() {
        let Some(path) = archive.name_for_index(index) else {
            continue;
        };
        match classify_entry(path) {
            EntryKind::Document {
                locale,
                section,
                name,
            } => layout
                .entry(locale.to_string())
                .or_default()
                .entry(section.to_string())
                .or_default()
                .push(ArchiveDocument {
                    index,
                    name: name.to_string(),
                }),
            EntryKind::Directory => {}
            EntryKind::LegacyEnglish => legacy_skipped += 1,
            EntryKind::InvalidLocale(locale) => {
                tracing::warn!(entry = path, locale, "skipping archive entry with invalid locale directory");
            }
            EntryKind::Other => tracing::debug!(entry = path, "skipping archive entry"),
        }
    }

    if legacy_skipped > 0 {
        tracing::debug!(
            entries = legacy_skipped,
            dir = LEGACY_ENGLISH_DIR,
            "skipped legacy English directory"
        );
    }
    for sections in layout.values_mut() {
        for documents in sections.values_mut() {
            documents.sort_by(|a, b| a.name.cmp(&b.name));
        }
    }
    layout
}

/// Downloads the page archive and rebuilds the cache from it.
pub struct CacheSynchronizer<'a> {
    config: &'a Config,
    formatter: Arc<dyn Formatter>,
    cancel: CancelToken,
    workers: usize,
}

impl<'a> CacheSynchronizer<'a> {
    pub fn new(config: &'a Config, formatter: Arc<dyn Formatter>, cancel: CancelToken) -> Self {
        Self {
            config,
            formatter,
            cancel,
            workers: default_workers(),
        }
    }

    /// Override the render worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Run a full update, replacing the cache root on success.
    pub fn update(&self, observer: &mut dyn SyncObserver) -> Result<UpdateStats> {
        let cache_root = &self.config.cache_root;
        let url = self.config.archive_url.as_str();

        observer.phase(SyncPhase::Preflight);
        self.formatter.check_available()?;
        guard::assert_safe_to_replace(cache_root)?;

        observer.phase(SyncPhase::Downloading);
        tracing::info!(url, "downloading page archive");
        let mut download = TempFile::new("tldr-archive-", ".zip")
            .map_err(|err| Error::io(std::env::temp_dir(), err))?;
        let bytes = fetch_archive(
            url,
            download.as_file_mut(),
            self.config.download_timeout,
            &self.cancel,
            &mut |downloaded, total| observer.download_progress(downloaded, total),
        )
        .map_err(|err| match err {
            DownloadError::Interrupted { .. } => Error::Cancelled,
            other => Error::Download(other),
        })?;
        tracing::debug!(bytes, "archive downloaded");
        self.cancel.check()?;

        observer.phase(SyncPhase::Extracting);
        let archive_file = download
            .reopen()
            .map_err(|err| Error::io(download.path(), err))?;
        let mut archive = ZipArchive::new(archive_file).map_err(|err| bad_archive(url, err))?;
        let layout = group_entries(&archive);
        if layout.is_empty() {
            return Err(DownloadError::BadArchive {
                url: url.to_string(),
                reason: "no pages found".to_string(),
            }
            .into());
        }

        let staging = StagingDir::new_in(self.config.cache_parent(), STAGING_PREFIX)
            .map_err(|err| Error::io(self.config.cache_parent(), err))?;
        tracing::debug!(staging = %staging.path().display(), "staging directory created");

        observer.phase(SyncPhase::Rendering);
        let pool = RenderPool::new(self.workers, Arc::clone(&self.formatter), self.cancel.clone())?;
        let mut stats = UpdateStats::default();
        for (locale, sections) in &layout {
            for (section, documents) in sections {
                self.cancel.check()?;
                let jobs = read_jobs(&mut archive, documents, url)?;
                observer.section_started(locale, section, jobs.len());
                self.render_section(&pool, staging.path(), locale, section, jobs, &mut stats, observer)?;
                observer.section_finished(locale, section);
            }
        }
        drop(pool);
        observer.phase(SyncPhase::Staged);

        self.swap(staging)?;
        observer.phase(SyncPhase::Swapped);
        tracing::info!(%stats, cache_root = %cache_root.display(), "cache updated");

        observer.finished(&stats);
        observer.phase(SyncPhase::Reported);
        Ok(stats)
    }

    #[allow(clippy::too_many_arguments)]
    fn render_section(
        &self,
        pool: &RenderPool,
        staging: &Path,
        locale: &str,
        section: &str,
        jobs: Vec<RenderJob>,
        stats: &mut UpdateStats,
        observer: &mut dyn SyncObserver,
    ) -> Result<()> {
        let relative = Path::new(locale).join(section).join(MAN_DIR);
        let prior = {
            let _lock = CacheLock::acquire(&self.config.lock_path(), self.config.lock_timeout)?;
            prior_artifacts(&self.config.cache_root.join(&relative))?
        };

        let out_dir = staging.join(&relative);
        fs::create_dir_all(&out_dir).map_err(|err| Error::io(&out_dir, err))?;

        pool.run_batch(jobs, |artifact| {
            let file_name = artifact_name(&artifact.name);
            let path = out_dir.join(&file_name);
            fs::write(&path, artifact.content.as_bytes()).map_err(|err| Error::io(&path, err))?;

            let change = Change::classify(
                prior.get(&file_name).map(Vec::as_slice),
                artifact.content.as_bytes(),
            );
            stats.record(change);
            observer.section_advanced();
            Ok(())
        })
    }

    fn swap(&self, staging: StagingDir) -> Result<()> {
        let cache_root = &self.config.cache_root;
        self.cancel.check()?;

        let _lock = CacheLock::acquire(&self.config.lock_path(), self.config.lock_timeout)?;
        self.cancel.check()?;
        guard::assert_safe_to_replace(cache_root)?;

        // Past this point the swap runs to completion.
        remove_dir_if_exists(cache_root).map_err(|err| Error::io(cache_root, err))?;
        let parent = self.config.cache_parent();
        fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        staging
            .promote(cache_root)
            .map_err(|err| Error::io(cache_root, err))?;
        Ok(())
    }
}

fn bad_archive(url: &str, err: impl std::fmt::Display) -> Error {
    DownloadError::BadArchive {
        url: url.to_string(),
        reason: err.to_string(),
    }
    .into()
}

fn read_jobs<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    documents: &[ArchiveDocument],
    url: &str,
) -> Result<Vec<RenderJob>> {
    documents
        .iter()
        .map(|document| {
            let mut entry = archive
                .by_index(document.index)
                .map_err(|err| bad_archive(url, err))?;
            let mut source = String::new();
            entry
                .read_to_string(&mut source)
                .map_err(|err| bad_archive(url, format!("{}: {err}", document.name)))?;
            Ok(RenderJob {
                name: document.name.clone(),
                source,
            })
        })
        .collect()
}

/// Contents of the artifacts currently cached in `dir`, keyed by file name.
fn prior_artifacts(dir: &Path) -> Result<HashMap<String, Vec<u8>>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(err) => return Err(Error::io(dir, err)),
    };

    let mut prior = HashMap::new();
    for entry in entries {
        let entry = entry.map_err(|err| Error::io(dir, err))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let mut content = Vec::new();
        File::open(&path)
            .and_then(|mut file| file.read_to_end(&mut content))
            .map_err(|err| Error::io(&path, err))?;
        prior.insert(name, content);
    }
    Ok(prior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    #[test]
    fn test_classify_entry() {
        assert_eq!(
            classify_entry("pages.fr/linux/tar.md"),
            EntryKind::Document {
                locale: "pages.fr",
                section: "linux",
                name: "tar.md"
            }
        );
        assert_eq!(classify_entry("pages/common/"), EntryKind::Directory);
        assert_eq!(classify_entry("pages.en/common/tar.md"), EntryKind::LegacyEnglish);
        assert_eq!(
            classify_entry("notes/common/tar.md"),
            EntryKind::InvalidLocale("notes")
        );
        assert_eq!(classify_entry("LICENSE.md"), EntryKind::Other);
        assert_eq!(classify_entry("pages/common/tar.txt"), EntryKind::Other);
        assert_eq!(classify_entry("pages/common/sub/tar.md"), EntryKind::Other);
        assert_eq!(classify_entry("pages/common/.md"), EntryKind::Other);
    }

    #[test]
    fn test_group_entries() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options = SimpleFileOptions::default();
            for path in [
                "pages/linux/ls.md",
                "pages/common/tar.md",
                "pages/common/cp.md",
                "pages.en/common/tar.md",
                "pages.fr/common/tar.md",
                "index.json",
            ] {
                writer.start_file(path, options).unwrap();
                writer.write_all(b"# x\n").unwrap();
            }
            writer.finish().unwrap();
        }

        let mut archive = ZipArchive::new(buf).unwrap();
        let layout = group_entries(&archive);

        assert_eq!(layout.keys().collect::<Vec<_>>(), ["pages", "pages.fr"]);
        let common: Vec<_> = layout["pages"]["common"]
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(common, ["cp.md", "tar.md"]);
        assert_eq!(layout["pages"]["linux"].len(), 1);
    }

    #[test]
    fn test_prior_artifacts_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(prior_artifacts(&temp_dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn test_prior_artifacts_reads_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("tar.1"), "tar").unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        let prior = prior_artifacts(temp_dir.path()).unwrap();
        assert_eq!(prior.len(), 1);
        assert_eq!(prior["tar.1"], b"tar");
    }
}
