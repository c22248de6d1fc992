//! pandoc formatter

use std::io::{self, Write};
use std::process::{Command, Stdio};

use super::{Formatter, RenderError};

/// Arguments selecting markdown input and standalone man output.
const PANDOC_ARGS: &[&str] = &[
    "-",
    "-s",
    "-t",
    "man",
    "-f",
    "markdown-tex_math_dollars-smart",
];

/// Runs `pandoc` to turn a page template into roff.
#[derive(Debug, Clone)]
pub struct Pandoc {
    program: String,
}

impl Pandoc {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn missing(&self) -> RenderError {
        RenderError::ToolMissing {
            tool: self.program.clone(),
        }
    }
}

impl Default for Pandoc {
    fn default() -> Self {
        Self::new("pandoc")
    }
}

impl Formatter for Pandoc {
    fn program(&self) -> &str {
        &self.program
    }

    fn check_available(&self) -> Result<(), RenderError> {
        which::which(&self.program)
            .map(|_| ())
            .map_err(|_| self.missing())
    }

    fn format(&self, template: &str) -> Result<String, RenderError> {
        let spawn_error = |source: io::Error| RenderError::Spawn {
            tool: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(PANDOC_ARGS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => self.missing(),
                _ => spawn_error(err),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(template.as_bytes())
                .map_err(spawn_error)?;
        }

        let output = child.wait_with_output().map_err(spawn_error)?;
        if !output.status.success() {
            return Err(RenderError::ToolFailed {
                tool: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| RenderError::InvalidOutput {
            tool: self.program.clone(),
        })
    }
}
