//! Pandoc markdown template for a parsed page.

use std::sync::OnceLock;

use regex_lite::Regex;

use crate::parser::{Entry, TldrPage};

/// Man page section the rendered pages are filed under.
pub const MAN_SECTION: &str = "1";

/// Client name shown in the man page header.
const CLIENT_NAME: &str = "tldr-man";

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{(.*?)\}\}").expect("placeholder regex is valid"))
}

/// Escape text for pandoc markdown: backslashes first, then literal asterisks.
pub fn escape_markup(text: &str) -> String {
    text.replace('\\', r"\\").replace('*', r"\*")
}

/// Escape a command and turn `{{placeholder}}` tokens into `*placeholder*`.
fn emphasize_placeholders(text: &str) -> String {
    placeholder_regex()
        .replace_all(&escape_markup(text), "*$1*")
        .into_owned()
}

impl TldrPage {
    /// Assemble the pandoc input for this page.
    ///
    /// The output is a pure function of the page, so identical documents
    /// always produce identical templates.
    pub fn to_man_markdown(&self) -> String {
        let mut examples = String::new();
        for entry in &self.entries {
            match entry {
                Entry::Caption(caption) => {
                    examples.push_str(&format!("\n**{}**\n", emphasize_placeholders(caption)));
                }
                Entry::Command(command) => {
                    examples.push_str(&format!(": {}\n", emphasize_placeholders(command)));
                }
            }
        }

        let name = &self.name;
        let details = self
            .description
            .iter()
            .skip(1)
            .map(|line| escape_markup(line))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "% {name}({MAN_SECTION}) {name}\n%\n% {CLIENT_NAME}\n\n# NAME\n{name} - {summary}\n\n# DESCRIPTION\n{details}\n\n# EXAMPLES\n{examples}",
            summary = escape_markup(self.summary()),
        )
    }
}
