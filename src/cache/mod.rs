//! Rendered page cache
//!
//! Layout: `<cache root>/pages[.<locale>]/<section>/man1/<name>.1`.
//!
//! - [`CacheSynchronizer`] downloads the archive and replaces the cache root
//! - [`CacheLock`] serializes every reader and the writer across processes
//! - [`guard`] refuses to replace a cache root holding foreign content

mod download;
pub mod guard;
mod lock;
mod pool;
mod stats;
mod sync;

pub use download::{fetch_archive, DownloadError};
pub use lock::{CacheLock, LockError, LockResult};
pub use pool::{default_workers, RenderJob, RenderPool, RenderedArtifact};
pub use stats::{Change, UpdateStats};
pub use sync::{CacheSynchronizer, SilentObserver, SyncObserver, SyncPhase, MAN_DIR};
