//! Document rendering
//!
//! A tldr page is parsed into a [`TldrPage`], turned into a pandoc markdown
//! template, and piped through an external [`Formatter`] that produces the
//! man page.

mod pandoc;

pub use pandoc::Pandoc;

use std::process::ExitStatus;

use thiserror::Error;
use tldr_page::{parse_page, PageParseError, TldrPage, MAN_SECTION};

/// Errors from rendering one document
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid page: {0}")]
    Grammar(#[from] PageParseError),

    #[error("couldn't find the `{tool}` command")]
    ToolMissing { tool: String },

    #[error("`{tool}` exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed to run `{tool}`: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },

    #[error("`{tool}` produced non UTF-8 output")]
    InvalidOutput { tool: String },
}

/// Converts an assembled template into the display format.
pub trait Formatter: Send + Sync {
    /// Program name, used in diagnostics.
    fn program(&self) -> &str;

    /// Fail with [`RenderError::ToolMissing`] if the formatter is not installed.
    fn check_available(&self) -> Result<(), RenderError>;

    /// Format one template.
    fn format(&self, template: &str) -> Result<String, RenderError>;
}

/// Parse a page and build its formatter input.
pub fn page_template(source: &str) -> Result<String, RenderError> {
    let page: TldrPage = parse_page(source)?;
    Ok(page.to_man_markdown())
}

/// Render one markdown page into a man page.
///
/// Grammar errors are reported before the formatter runs, so a malformed
/// document never produces partial output.
pub fn render(source: &str, formatter: &dyn Formatter) -> Result<String, RenderError> {
    let template = page_template(source)?;
    formatter.format(&template)
}

/// Artifact file name for a source document: `tar.md` becomes `tar.1`.
pub fn artifact_name(document_name: &str) -> String {
    let stem = document_name.strip_suffix(".md").unwrap_or(document_name);
    format!("{stem}.{MAN_SECTION}")
}
