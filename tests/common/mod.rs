//! Shared helpers for the integration tests: archive fixtures, in-process
//! formatters and directory snapshots.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

use tldr_man::render::{Formatter, RenderError};
use tldr_man::{CancelToken, Config};

pub const TAR: &str = "# tar\n\n> Archive utility.\n\n- Create an archive:\n\n`tar -cf {{archive.tar}} {{file}}`\n";

pub const TAR_V2: &str = "# tar\n\n> Archive utility.\n> More information: <https://www.gnu.org/software/tar>.\n\n- Create an archive:\n\n`tar -cf {{archive.tar}} {{file}}`\n\n- Extract an archive:\n\n`tar -xf {{archive.tar}}`\n";

pub const GIT_STATUS: &str = "# git status\n\n> Show the working tree status.\n\n- Show changed files:\n\n`git status`\n";

pub const LS: &str = "# ls\n\n> List directory contents.\n\n- List files one per line:\n\n`ls -1`\n";

pub const CP: &str = "# cp\n\n> Copy files and directories.\n\n- Copy a file:\n\n`cp {{source}} {{target}}`\n";

pub const TAR_FR: &str = "# tar\n\n> Utilitaire d'archivage.\n\n- Créer une archive :\n\n`tar -cf {{archive.tar}} {{fichier}}`\n";

/// Temp directory with a cache root and a place for archives.
pub struct Sandbox {
    pub dir: TempDir,
    pub config: Config,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config::with_cache_root(dir.path().join("cache").join("tldr-man"));
        Self { dir, config }
    }

    /// Write a zip archive of `entries` and point the config at it.
    pub fn use_archive(&mut self, name: &str, entries: &[(&str, &str)]) -> PathBuf {
        let path = self.dir.path().join(name);
        write_zip(&path, entries);
        self.config.archive_url = format!("file://{}", path.display());
        path
    }

    pub fn cache_root(&self) -> &Path {
        &self.config.cache_root
    }

    pub fn artifact(&self, relative: &str) -> PathBuf {
        self.config.cache_root.join(relative)
    }
}

pub fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

/// Every path under `root` with file contents (`None` for directories).
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            let entry = entry.unwrap();
            let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
            let content = entry
                .file_type()
                .is_file()
                .then(|| fs::read(entry.path()).unwrap());
            (relative, content)
        })
        .collect()
}

/// Names in `dir` that look like leftover staging directories.
pub fn staging_leftovers(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.contains("staging"))
        .collect()
}

/// Passes the template through unchanged.
pub struct EchoFormatter;

impl Formatter for EchoFormatter {
    fn program(&self) -> &str {
        "echo"
    }

    fn check_available(&self) -> Result<(), RenderError> {
        Ok(())
    }

    fn format(&self, template: &str) -> Result<String, RenderError> {
        Ok(template.to_string())
    }
}

/// Requests cancellation after rendering `after` documents.
pub struct CancellingFormatter {
    pub token: CancelToken,
    pub after: usize,
    pub seen: AtomicUsize,
}

impl Formatter for CancellingFormatter {
    fn program(&self) -> &str {
        "cancelling"
    }

    fn check_available(&self) -> Result<(), RenderError> {
        Ok(())
    }

    fn format(&self, template: &str) -> Result<String, RenderError> {
        if self.seen.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
            self.token.cancel();
        }
        Ok(template.to_string())
    }
}

/// Trips the token and fails, like a formatter child killed by the same
/// interrupt.
pub struct KilledFormatter {
    pub token: CancelToken,
}

impl Formatter for KilledFormatter {
    fn program(&self) -> &str {
        "killed"
    }

    fn check_available(&self) -> Result<(), RenderError> {
        Ok(())
    }

    fn format(&self, _template: &str) -> Result<String, RenderError> {
        self.token.cancel();
        Err(RenderError::InvalidOutput {
            tool: "killed".to_string(),
        })
    }
}

/// Fails on any template mentioning `poison`.
pub struct PoisonFormatter {
    pub poison: &'static str,
}

impl Formatter for PoisonFormatter {
    fn program(&self) -> &str {
        "poison"
    }

    fn check_available(&self) -> Result<(), RenderError> {
        Ok(())
    }

    fn format(&self, template: &str) -> Result<String, RenderError> {
        if template.contains(self.poison) {
            Err(RenderError::InvalidOutput {
                tool: "poison".to_string(),
            })
        } else {
            Ok(template.to_string())
        }
    }
}
