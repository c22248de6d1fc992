//! tldr-man - tldr pages as man pages
//!
//! Downloads the tldr-pages archive, renders every page into a man page
//! cache split by locale and platform, and resolves lookups against that
//! cache for display with `man`.

pub mod cache;
pub mod config;
pub mod display;
pub mod error;
pub mod locale;
pub mod logging;
pub mod pages;
pub mod platform;
pub mod render;
pub mod signal;
pub mod temp;

pub use cache::{CacheSynchronizer, SilentObserver, SyncObserver, SyncPhase, UpdateStats};
pub use config::{Config, ConfigEnv};
pub use display::Pager;
pub use error::{Error, Result};
pub use locale::LocaleEnv;
pub use pages::{CacheView, PageResolver};
pub use platform::Platform;
pub use render::{Formatter, Pandoc, RenderError};
pub use signal::CancelToken;
