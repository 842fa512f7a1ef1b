// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for CLI commands.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use clap::Args;

use darnio::{
    DataPointer, DataRequest, FileType, ResolverConfig, SourcePreference, SourceResolver,
};

pub use anyhow::Result as CliResult;
pub type Result<T = ()> = CliResult<T>;

/// Format a duration to a human-readable string.
pub fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let millis = duration.num_milliseconds().max(0) % 1000;

    if secs >= 3600 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}

/// Format an instant for display.
pub fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Parse a time argument.
///
/// Accepts:
/// - ISO 8601: "2012-11-01T00:00:00Z"
/// - "2012-11-01 00:00" or "2012-11-01 00:00:00" (UTC)
/// - Archive style: "20121101.0000"
/// - Unix timestamp in seconds: "1351728000"
pub fn parse_time(s: &str) -> CliResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y%m%d.%H%M%S", "%Y%m%d.%H%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(secs) = s.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(secs, 0) {
            return Ok(dt);
        }
    }

    Err(anyhow::anyhow!("Invalid time: {s}"))
}

/// Request selectors shared by the commands that resolve data.
#[derive(Args, Clone, Debug)]
pub struct RequestArgs {
    /// Start of the window
    #[arg(long, value_parser = parse_time)]
    pub start: DateTime<Utc>,

    /// End of the window (default: start + 1 day)
    #[arg(long, value_parser = parse_time)]
    pub end: Option<DateTime<Utc>>,

    /// Station code, optionally with a channel suffix ("fhe.a")
    #[arg(long)]
    pub station: Option<String>,

    /// Numeric station id
    #[arg(long)]
    pub station_id: Option<i32>,

    /// Channel letter
    #[arg(long)]
    pub channel: Option<char>,

    /// Beam number
    #[arg(long)]
    pub beam: Option<i32>,

    /// Control program id
    #[arg(long)]
    pub cp: Option<i32>,

    /// Subtype: rawacf, fitacf, fitex, lmfit or iqdat
    #[arg(long, default_value = "fitex")]
    pub file_type: FileType,

    /// Apply the quality filter
    #[arg(long)]
    pub filtered: bool,

    /// Read this file instead of searching the archives
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Where to look: any, local or remote
    #[arg(long, default_value = "any")]
    pub source: SourcePreference,

    /// Ignore previously staged files
    #[arg(long)]
    pub no_cache: bool,

    /// TOML configuration (default: DARNIO_* environment)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl RequestArgs {
    /// Build the validated request.
    pub fn request(&self) -> Result<DataRequest> {
        let mut builder = DataRequest::builder()
            .start(self.start)
            .file_type(self.file_type)
            .filtered(self.filtered)
            .source(self.source)
            .bypass_cache(self.no_cache);

        if let Some(end) = self.end {
            builder = builder.end(end);
        }
        if let Some(station) = &self.station {
            builder = builder.station(station.as_str());
        }
        if let Some(stid) = self.station_id {
            builder = builder.station_id(stid);
        }
        if let Some(channel) = self.channel {
            builder = builder.channel(channel);
        }
        if let Some(beam) = self.beam {
            builder = builder.beam(beam);
        }
        if let Some(cp) = self.cp {
            builder = builder.control_program(cp);
        }
        if let Some(file) = &self.file {
            builder = builder.path(file);
        }

        Ok(builder.build()?)
    }

    /// Load the resolver configuration.
    pub fn config(&self) -> Result<ResolverConfig> {
        Ok(match &self.config {
            Some(path) => ResolverConfig::load(path)?,
            None => ResolverConfig::from_env()?,
        })
    }

    pub fn resolver(&self) -> Result<SourceResolver> {
        Ok(SourceResolver::new(self.config()?)?)
    }

    /// Resolve and open the requested data, failing when none is found.
    pub fn open(&self) -> Result<DataPointer> {
        let request = self.request()?;
        self.resolver()?
            .open(&request)?
            .ok_or_else(|| anyhow::anyhow!("No data found for {}", request.window()))
    }
}
