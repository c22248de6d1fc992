//! Platform sections
//!
//! Pages are grouped by platform (`linux`, `osx`, `windows`, ...) plus the
//! universal `common` section. Lookups search a user override first, then the
//! running platform, then `common`.

use std::fmt;
use std::str::FromStr;

/// The section every lookup falls back to.
pub const COMMON_SECTION: &str = "common";

/// Platforms accepted by `--platform`.
pub const PLATFORM_NAMES: &[&str] = &[
    "android", "freebsd", "linux", "macos", "netbsd", "openbsd", "osx", "sunos", "windows",
];

/// A platform section of the tldr-pages archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Android,
    FreeBsd,
    Linux,
    NetBsd,
    OpenBsd,
    Osx,
    SunOs,
    Windows,
}

impl Platform {
    /// Directory name of the section.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::FreeBsd => "freebsd",
            Self::Linux => "linux",
            Self::NetBsd => "netbsd",
            Self::OpenBsd => "openbsd",
            Self::Osx => "osx",
            Self::SunOs => "sunos",
            Self::Windows => "windows",
        }
    }

    /// Section for the platform this binary was built for.
    pub fn current() -> Option<Self> {
        if cfg!(target_os = "android") {
            Some(Self::Android)
        } else if cfg!(target_os = "linux") {
            Some(Self::Linux)
        } else if cfg!(target_os = "macos") {
            Some(Self::Osx)
        } else if cfg!(target_os = "windows") {
            Some(Self::Windows)
        } else if cfg!(target_os = "freebsd") {
            Some(Self::FreeBsd)
        } else if cfg!(target_os = "netbsd") {
            Some(Self::NetBsd)
        } else if cfg!(target_os = "openbsd") {
            Some(Self::OpenBsd)
        } else if cfg!(target_os = "solaris") || cfg!(target_os = "illumos") {
            Some(Self::SunOs)
        } else {
            None
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown platform name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform `{0}`")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    /// Parse a platform name; `macos` is an alias for `osx`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "android" => Ok(Self::Android),
            "freebsd" => Ok(Self::FreeBsd),
            "linux" => Ok(Self::Linux),
            "macos" | "osx" => Ok(Self::Osx),
            "netbsd" => Ok(Self::NetBsd),
            "openbsd" => Ok(Self::OpenBsd),
            "sunos" => Ok(Self::SunOs),
            "windows" => Ok(Self::Windows),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

/// Sections to search, most specific first.
pub fn ordered_sections(custom: Option<Platform>) -> Vec<String> {
    sections_for(custom, Platform::current())
}

fn sections_for(custom: Option<Platform>, current: Option<Platform>) -> Vec<String> {
    custom
        .into_iter()
        .chain(current)
        .map(|platform| platform.as_str().to_string())
        .chain(std::iter::once(COMMON_SECTION.to_string()))
        .collect()
}
