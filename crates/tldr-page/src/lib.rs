//! tldr-pages document model.
//!
//! Parses one markdown-formatted tldr page into a structured [`TldrPage`] and
//! assembles the pandoc markdown template that is turned into a man page.
//! Everything here is pure: no filesystem access, no subprocesses.

mod parser;
mod template;

pub use parser::{parse_page, Entry, PageParseError, TldrPage};
pub use template::{escape_markup, MAN_SECTION};
