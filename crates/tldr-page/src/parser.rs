//! tldr page parser.
//!
//! A page is a title line, a block of `>` quoted description lines, then a
//! flat list of `-` captions and backtick-quoted commands:
//!
//! ```text
//! # tar
//!
//! > Archive utility.
//!
//! - Create an archive:
//!
//! `tar -cf {{archive.tar}} {{file}}`
//! ```

use thiserror::Error;

/// Errors for documents that do not follow the page grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageParseError {
    #[error("document is empty")]
    EmptyDocument,

    #[error("document has an empty title line")]
    MissingTitle,

    #[error("document has no `>` description line (line {line})")]
    MissingDescription {
        /// 1-based line where a description line was expected
        line: usize,
    },
}

/// One line of the example body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// `- Some explanation:` with the marker stripped
    Caption(String),
    /// `` `some command {{arg}}` `` with both backticks stripped
    Command(String),
}

/// A parsed tldr page. Text is kept unescaped; escaping happens when the
/// template is assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TldrPage {
    pub name: String,
    pub description: Vec<String>,
    pub entries: Vec<Entry>,
}

impl TldrPage {
    /// First description line, used as the man page `NAME` summary.
    pub fn summary(&self) -> &str {
        self.description.first().map(String::as_str).unwrap_or_default()
    }

    /// Captions paired with the command that follows them.
    ///
    /// A caption without a command yields `None`; a command without a
    /// preceding caption is skipped.
    pub fn examples(&self) -> Vec<(&str, Option<&str>)> {
        let mut examples: Vec<(&str, Option<&str>)> = Vec::new();
        for entry in &self.entries {
            match entry {
                Entry::Caption(caption) => examples.push((caption, None)),
                Entry::Command(command) => {
                    if let Some(last) = examples.last_mut() {
                        if last.1.is_none() {
                            last.1 = Some(command);
                        }
                    }
                }
            }
        }
        examples
    }
}

/// Parse a markdown tldr page.
pub fn parse_page(source: &str) -> Result<TldrPage, PageParseError> {
    let mut lines = source.lines().enumerate().peekable();

    let (_, title_line) = lines.next().ok_or(PageParseError::EmptyDocument)?;
    let name = title_line
        .trim_start_matches(|c| c == '#' || c == ' ')
        .trim_end()
        .to_string();
    if name.is_empty() {
        return Err(PageParseError::MissingTitle);
    }

    while lines.next_if(|(_, line)| line.trim().is_empty()).is_some() {}

    let mut description = Vec::new();
    while let Some((_, line)) = lines.next_if(|(_, line)| line.starts_with('>')) {
        description.push(line[1..].trim().to_string());
    }
    if description.is_empty() {
        let line = lines.peek().map(|(idx, _)| idx + 1).unwrap_or(source.lines().count() + 1);
        return Err(PageParseError::MissingDescription { line });
    }

    let mut entries = Vec::new();
    for (_, line) in lines {
        let mut chars = line.chars();
        let Some(indicator) = chars.next() else {
            continue;
        };
        let contents = chars.as_str().trim();
        match indicator {
            '-' => entries.push(Entry::Caption(contents.to_string())),
            '`' => {
                let command = contents.strip_suffix('`').unwrap_or(contents);
                entries.push(Entry::Command(command.to_string()));
            }
            _ => {}
        }
    }

    Ok(TldrPage {
        name,
        description,
        entries,
    })
}
