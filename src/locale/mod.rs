//! Locale resolution
//!
//! Maps language codes (`en_US.UTF-8`, `fr`, `pt_BR`) to locale directories
//! under the cache root:
//! - English is always `pages`, whatever the region
//! - `pages.<lang>_<REGION>` when that directory exists
//! - `pages.<lang>` otherwise

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io;
use std::path::Path;

use crate::cache::guard;
use crate::error::{Error, Result};

/// Locale directory for English pages.
pub const ENGLISH_DIR: &str = "pages";

/// Legacy duplicate of the English directory shipped in some archives.
/// It is never rendered and never searched.
pub const LEGACY_ENGLISH_DIR: &str = "pages.en";

/// Locale preference variables, captured once.
#[derive(Debug, Clone, Default)]
pub struct LocaleEnv {
    /// `TLDR_LANGUAGE`, colon separated
    pub tldr_language: Option<String>,
    /// `LANGUAGE`, colon separated
    pub language: Option<String>,
    /// `LANG`
    pub lang: Option<String>,
}

impl LocaleEnv {
    pub fn from_process() -> Self {
        Self {
            tldr_language: env::var("TLDR_LANGUAGE").ok(),
            language: env::var("LANGUAGE").ok(),
            lang: env::var("LANG").ok(),
        }
    }

    /// Raw language codes in preference order, always ending with `en`.
    pub fn preferred_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();

        for list in [&self.tldr_language, &self.language].into_iter().flatten() {
            codes.extend(
                list.split(':')
                    .map(str::trim)
                    .filter(|code| !code.is_empty())
                    .map(str::to_string),
            );
        }

        if let Some(lang) = self.lang.as_deref().map(str::trim) {
            let (language, _) = language_code_parts(lang);
            if !lang.is_empty() && !matches!(language.as_str(), "c" | "posix") {
                codes.push(lang.to_string());
            }
        }

        codes.push("en".to_string());
        codes
    }
}

/// Split a code into lowercase language and uppercase region, dropping any
/// `.encoding` suffix. The region defaults to the uppercased language.
pub fn language_code_parts(code: &str) -> (String, String) {
    let code = code.split('.').next().unwrap_or_default();
    let (language, region) = match code.split_once('_') {
        Some((language, region)) => (language, Some(region)),
        None => (code, None),
    };

    let language = language.trim().to_lowercase();
    let region = match region {
        Some(region) => region.trim().to_uppercase(),
        None => language.to_uppercase(),
    };
    (language, region)
}

/// Directory name for one language code.
pub fn resolve_locale_directory(cache_root: &Path, code: &str) -> String {
    let (language, region) = language_code_parts(code);
    if language == "en" {
        return ENGLISH_DIR.to_string();
    }

    let regional = format!("{ENGLISH_DIR}.{language}_{region}");
    if cache_root.join(&regional).is_dir() {
        regional
    } else {
        format!("{ENGLISH_DIR}.{language}")
    }
}

/// Locale directories in environment preference order.
///
/// May contain duplicates; the search order deduplicates.
pub fn environment_locales(cache_root: &Path, env: &LocaleEnv) -> Vec<String> {
    env.preferred_codes()
        .iter()
        .map(|code| resolve_locale_directory(cache_root, code))
        .collect()
}

/// Locale directories present under the cache root.
///
/// Empty when the cache root does not exist.
pub fn all_known_locales(cache_root: &Path) -> io::Result<BTreeSet<String>> {
    let entries = match fs::read_dir(cache_root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(err) => return Err(err),
    };

    let mut locales = BTreeSet::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_locale_dir_name(&name) {
            locales.insert(name);
        }
    }
    Ok(locales)
}

/// Language codes for the locale directories present (`en`, `fr`, `pt_BR`).
pub fn all_language_codes(cache_root: &Path) -> io::Result<Vec<String>> {
    Ok(all_known_locales(cache_root)?
        .iter()
        .map(|dir| locale_code(dir).to_string())
        .collect())
}

/// Language code for a locale directory name.
pub fn locale_code(dir_name: &str) -> &str {
    match dir_name.strip_prefix(ENGLISH_DIR) {
        Some("") => "en",
        Some(rest) => rest.strip_prefix('.').unwrap_or(rest),
        None => dir_name,
    }
}

/// Same names the safety guard accepts, minus the legacy English directory.
fn is_locale_dir_name(name: &str) -> bool {
    name != LEGACY_ENGLISH_DIR && guard::is_locale_dir_name(name)
}

/// Locales to search: an explicit `--language` must name an installed
/// locale, otherwise the environment preferences apply.
pub fn select_locales(
    cache_root: &Path,
    language: Option<&str>,
    env: &LocaleEnv,
) -> Result<Vec<String>> {
    match language {
        Some(language) => {
            let dir = resolve_locale_directory(cache_root, language);
            let known = all_known_locales(cache_root).map_err(|err| Error::io(cache_root, err))?;
            if known.contains(&dir) {
                Ok(vec![dir])
            } else {
                Err(Error::UnrecognizedLocale(language.to_string()))
            }
        }
        None => Ok(environment_locales(cache_root, env)),
    }
}
