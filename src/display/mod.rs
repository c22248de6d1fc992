//! Hands a rendered page to the pager

use std::io;
use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};

/// External man page viewer.
#[derive(Debug, Clone)]
pub struct Pager {
    program: String,
}

impl Pager {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Show one artifact and wait for the pager to exit.
    pub fn show(&self, artifact: &Path) -> Result<()> {
        tracing::debug!(pager = %self.program, page = %artifact.display(), "starting pager");
        let status = Command::new(&self.program)
            .arg(artifact)
            .status()
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => Error::ToolMissing {
                    tool: self.program.clone(),
                },
                _ => Error::Pager {
                    pager: self.program.clone(),
                    reason: err.to_string(),
                },
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::Pager {
                pager: self.program.clone(),
                reason: format!("exited with {status}"),
            })
        }
    }
}

impl Default for Pager {
    fn default() -> Self {
        Self::new("man")
    }
}
