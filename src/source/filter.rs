// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Quality filter run over merged fit files.

use std::fs::{self, File};
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use super::config::FilterConfig;
use crate::{DarnError, Result};

/// Produces a filtered copy of a staged file.
pub trait QualityFilter {
    /// Write the filtered form of `input` to `output`.
    ///
    /// On failure no `output` is left behind.
    fn apply(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Runs an external program as `command [args..] <input>` and captures
/// its standard output as the filtered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFilter {
    command: String,
    args: Vec<String>,
}

impl CommandFilter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(&config.command).with_args(config.args.iter().cloned())
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl QualityFilter for CommandFilter {
    fn apply(&self, input: &Path, output: &Path) -> Result<()> {
        let out = File::create(output).map_err(|e| {
            DarnError::filter(format!("Failed to create {}: {e}", output.display()))
        })?;

        debug!(
            context = "CommandFilter",
            command = %self.command,
            input = %input.display(),
            "Running quality filter"
        );
        let result = Command::new(&self.command)
            .args(&self.args)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::piped())
            .output();

        let failure = match result {
            Ok(run) if run.status.success() => return Ok(()),
            Ok(run) => format!(
                "{} exited with {}: {}",
                self.command,
                run.status,
                String::from_utf8_lossy(&run.stderr).trim()
            ),
            Err(e) => format!("Failed to run {}: {e}", self.command),
        };
        let _ = fs::remove_file(output);
        Err(DarnError::filter(failure))
    }
}
