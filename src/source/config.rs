// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Resolver configuration.
//!
//! Configuration is plain data, loaded from TOML or assembled in code.
//! Environment variables are only consulted by the opt-in
//! [`ResolverConfig::from_env`] constructor.
//!
//! ```toml
//! staging_dir = "/tmp/sd"
//!
//! [local]
//! root = "/sd-data"
//! dir_template = "{root}/{year}/{ftype}/{radar}"
//!
//! [remote]
//! host = "sd-data.example.org"
//! username = "reader"
//!
//! [filter]
//! command = "fitexfilter"
//! ```

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{DarnError, FileType, Result};

/// Default layout of the local archive.
pub const DEFAULT_DIR_TEMPLATE: &str = "{root}/{year}/{ftype}/{radar}";

/// Top-level resolver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Directory staged and merged files are written to
    pub staging_dir: PathBuf,
    /// Local archive tier
    pub local: LocalArchiveConfig,
    /// Remote archive tier; absent disables it
    pub remote: Option<RemoteArchiveConfig>,
    /// Quality filter process
    pub filter: FilterConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            staging_dir: env::temp_dir().join("sd"),
            local: LocalArchiveConfig::default(),
            remote: None,
            filter: FilterConfig::default(),
        }
    }
}

/// Local archive tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalArchiveConfig {
    /// Archive root substituted for `{root}`
    pub root: PathBuf,
    /// Directory template, see [`DirTemplate`]
    pub dir_template: String,
    /// Whether the tier is searched at all
    pub enabled: bool,
}

impl Default for LocalArchiveConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/sd-data"),
            dir_template: DEFAULT_DIR_TEMPLATE.to_string(),
            enabled: true,
        }
    }
}

/// Remote archive host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteArchiveConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    /// Archive root on the host; day directories live under
    /// `{root}/{year}/{ftype}/{radar}`
    pub root: String,
    /// Local mount of the remote archive, used instead of a network
    /// session when set
    pub mirror: Option<PathBuf>,
}

impl Default for RemoteArchiveConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            username: String::new(),
            password: None,
            root: "/data".to_string(),
            mirror: None,
        }
    }
}

/// External quality filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Program run as `command [args..] <input>`, writing to stdout
    pub command: String,
    pub args: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            command: "fitexfilter".to_string(),
            args: Vec::new(),
        }
    }
}

impl ResolverConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| DarnError::config(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DarnError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Build a configuration from `DARNIO_*` environment variables.
    ///
    /// `DARNIO_TMPDIR`, `DARNIO_LOCALDIR` and `DARNIO_DIRFORMAT` override
    /// the staging directory, archive root and directory template.
    /// `DARNIO_REMOTE_HOST` enables the remote tier, with credentials from
    /// `DARNIO_REMOTE_USER` and `DARNIO_REMOTE_PASS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(dir) = env::var("DARNIO_TMPDIR") {
            config.staging_dir = PathBuf::from(dir);
        }
        if let Ok(root) = env::var("DARNIO_LOCALDIR") {
            config.local.root = PathBuf::from(root);
        }
        if let Ok(template) = env::var("DARNIO_DIRFORMAT") {
            config.local.dir_template = template;
        }
        if let Ok(host) = env::var("DARNIO_REMOTE_HOST") {
            config.remote = Some(RemoteArchiveConfig {
                host,
                username: env::var("DARNIO_REMOTE_USER").unwrap_or_default(),
                password: env::var("DARNIO_REMOTE_PASS").ok(),
                ..Default::default()
            });
        }
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for errors.
    pub fn validate(&self) -> Result<()> {
        self.dir_template()?;
        if let Some(remote) = &self.remote {
            if remote.host.is_empty() && remote.mirror.is_none() {
                return Err(DarnError::config(
                    "remote archive needs a host or a mirror directory",
                ));
            }
        }
        if self.filter.command.trim().is_empty() {
            return Err(DarnError::config("filter command is empty"));
        }
        Ok(())
    }

    /// Parsed local directory template.
    pub fn dir_template(&self) -> Result<DirTemplate> {
        self.local.dir_template.parse()
    }
}

/// Named placeholder in a directory template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Root,
    Year,
    Month,
    Day,
    FileType,
    Radar,
}

impl Placeholder {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "root" => Some(Placeholder::Root),
            "year" => Some(Placeholder::Year),
            "month" => Some(Placeholder::Month),
            "day" => Some(Placeholder::Day),
            "ftype" => Some(Placeholder::FileType),
            "radar" => Some(Placeholder::Radar),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Placeholder::Root => "root",
            Placeholder::Year => "year",
            Placeholder::Month => "month",
            Placeholder::Day => "day",
            Placeholder::FileType => "ftype",
            Placeholder::Radar => "radar",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// Directory layout with named placeholders.
///
/// Supported placeholders: `{root}`, `{year}` (4 digits), `{month}` and
/// `{day}` (2 digits), `{ftype}` and `{radar}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirTemplate {
    segments: Vec<Segment>,
}

impl DirTemplate {
    /// Render the directory for one day of one subtype and station.
    pub fn render(
        &self,
        root: &Path,
        day: DateTime<Utc>,
        file_type: FileType,
        radar: &str,
    ) -> PathBuf {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Field(Placeholder::Root) => out.push_str(&root.to_string_lossy()),
                Segment::Field(Placeholder::Year) => out.push_str(&format!("{:04}", day.year())),
                Segment::Field(Placeholder::Month) => {
                    out.push_str(&format!("{:02}", day.month()))
                }
                Segment::Field(Placeholder::Day) => out.push_str(&format!("{:02}", day.day())),
                Segment::Field(Placeholder::FileType) => out.push_str(file_type.as_str()),
                Segment::Field(Placeholder::Radar) => out.push_str(radar),
            }
        }
        PathBuf::from(out)
    }
}

impl FromStr for DirTemplate {
    type Err = DarnError;

    fn from_str(s: &str) -> Result<Self> {
        let re = Regex::new(r"\{([^{}]*)\}")
            .map_err(|e| DarnError::config(format!("Invalid template pattern: {e}")))?;

        let mut segments = Vec::new();
        let push_literal = |segments: &mut Vec<Segment>, text: &str| -> Result<()> {
            if text.contains(['{', '}']) {
                return Err(DarnError::config(format!(
                    "Unbalanced brace in directory template '{s}'"
                )));
            }
            if !text.is_empty() {
                segments.push(Segment::Literal(text.to_string()));
            }
            Ok(())
        };

        let mut last = 0;
        for caps in re.captures_iter(s) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_literal(&mut segments, &s[last..whole.start()])?;
            let field = Placeholder::from_name(name.as_str()).ok_or_else(|| {
                DarnError::config(format!(
                    "Unknown placeholder '{{{}}}' in directory template '{s}'",
                    name.as_str()
                ))
            })?;
            segments.push(Segment::Field(field));
            last = whole.end();
        }
        push_literal(&mut segments, &s[last..])?;

        if segments.is_empty() {
            return Err(DarnError::config("Directory template is empty"));
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for DirTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => f.write_str(s)?,
                Segment::Field(p) => write!(f, "{{{}}}", p.name())?,
            }
        }
        Ok(())
    }
}
