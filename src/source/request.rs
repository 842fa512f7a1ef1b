// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Data requests and their validation.
//!
//! A [`DataRequest`] describes which records a caller wants and where the
//! resolver may look for them. Requests are only constructed through
//! [`RequestBuilder::build`], which rejects malformed input before any
//! file is touched.
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use darnio::source::DataRequest;
//! use darnio::FileType;
//!
//! let request = DataRequest::builder()
//!     .start(Utc.with_ymd_and_hms(2012, 11, 1, 0, 0, 0).unwrap())
//!     .end(Utc.with_ymd_and_hms(2012, 11, 1, 4, 0, 0).unwrap())
//!     .station("fhe.b")
//!     .file_type(FileType::FitEx)
//!     .build()?;
//! assert_eq!(request.radar(), Some("fhe"));
//! assert_eq!(request.filter().channel.map(|c| c.as_char()), Some('b'));
//! # Ok::<(), darnio::DarnError>(())
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::io::{RecordFilter, TimeWindow};
use crate::{Channel, DarnError, FileType, Result};

/// Archive files may start up to this long before the first record
/// requested, so searches begin this much earlier.
pub const START_SLACK_MINUTES: i64 = 4;

/// Where the resolver may fetch data from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePreference {
    /// Local archive first, then remote
    #[default]
    Any,
    /// Local archive only
    Local,
    /// Remote archive only
    Remote,
}

impl SourcePreference {
    pub fn allows_local(&self) -> bool {
        matches!(self, SourcePreference::Any | SourcePreference::Local)
    }

    pub fn allows_remote(&self) -> bool {
        matches!(self, SourcePreference::Any | SourcePreference::Remote)
    }
}

impl fmt::Display for SourcePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourcePreference::Any => "any",
            SourcePreference::Local => "local",
            SourcePreference::Remote => "remote",
        })
    }
}

impl FromStr for SourcePreference {
    type Err = DarnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "any" => Ok(SourcePreference::Any),
            "local" => Ok(SourcePreference::Local),
            "remote" | "sftp" => Ok(SourcePreference::Remote),
            other => Err(DarnError::invalid_request(
                "source",
                format!("'{other}' is not one of any, local, remote"),
            )),
        }
    }
}

/// A validated request for radar records.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    window: TimeWindow,
    radar: Option<String>,
    filter: RecordFilter,
    file_type: FileType,
    filtered: bool,
    path: Option<PathBuf>,
    source: SourcePreference,
    bypass_cache: bool,
}

impl DataRequest {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// Requested time window.
    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    /// Start of the archive search, slightly before the window start.
    pub fn search_start(&self) -> DateTime<Utc> {
        self.window.start() - Duration::minutes(START_SLACK_MINUTES)
    }

    /// Three-letter station code.
    pub fn radar(&self) -> Option<&str> {
        self.radar.as_deref()
    }

    /// Record selectors.
    pub fn filter(&self) -> &RecordFilter {
        &self.filter
    }

    /// Requested file subtype.
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Whether the quality filter should run on the staged file.
    pub fn filtered(&self) -> bool {
        self.filtered
    }

    /// Explicit file to read instead of searching.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn source(&self) -> SourcePreference {
        self.source
    }

    /// Whether previously staged files are ignored.
    pub fn bypass_cache(&self) -> bool {
        self.bypass_cache
    }
}

/// Builder for [`DataRequest`].
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    station: Option<String>,
    stid: Option<i32>,
    channel: Option<char>,
    bmnum: Option<i32>,
    cp: Option<i32>,
    file_type: Option<FileType>,
    filtered: bool,
    path: Option<PathBuf>,
    source: SourcePreference,
    bypass_cache: bool,
}

impl RequestBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start of the window (required).
    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// End of the window; defaults to one day after the start.
    pub fn end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Station code, optionally with a channel suffix (`"fhe.a"`).
    pub fn station(mut self, station: impl Into<String>) -> Self {
        self.station = Some(station.into());
        self
    }

    /// Station id selector.
    pub fn station_id(mut self, stid: i32) -> Self {
        self.stid = Some(stid);
        self
    }

    /// Channel selector. Takes precedence over a station suffix.
    pub fn channel(mut self, channel: char) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Beam number selector.
    pub fn beam(mut self, bmnum: i32) -> Self {
        self.bmnum = Some(bmnum);
        self
    }

    /// Control program selector.
    pub fn control_program(mut self, cp: i32) -> Self {
        self.cp = Some(cp);
        self
    }

    /// Requested subtype; defaults to fitex.
    pub fn file_type(mut self, file_type: FileType) -> Self {
        self.file_type = Some(file_type);
        self
    }

    pub fn filtered(mut self, filtered: bool) -> Self {
        self.filtered = filtered;
        self
    }

    /// Read this file instead of searching the archives.
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn source(mut self, source: SourcePreference) -> Self {
        self.source = source;
        self
    }

    pub fn bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }

    /// Validate and build the request.
    ///
    /// # Errors
    ///
    /// Returns [`DarnError::InvalidRequest`] if:
    /// - The start time is not set
    /// - The end time precedes the start time
    /// - The station code is missing (and no path is given) or malformed
    /// - The channel is not a letter
    /// - The explicit path does not exist
    pub fn build(self) -> Result<DataRequest> {
        let start = self
            .start
            .ok_or_else(|| DarnError::invalid_request("start", "start time is required"))?;
        let window = match self.end {
            Some(end) => TimeWindow::new(start, end)?,
            None => TimeWindow::day_from(start),
        };

        let (radar, suffix) = match self.station.as_deref() {
            Some(station) => {
                let (radar, suffix) = parse_station(station)?;
                (Some(radar), suffix)
            }
            None if self.path.is_some() => (None, None),
            None => {
                return Err(DarnError::invalid_request(
                    "station",
                    "station code is required unless a file path is given",
                ))
            }
        };

        let channel = match self.channel {
            Some(c) => Some(Channel::new(c).ok_or_else(|| {
                DarnError::invalid_request("channel", format!("'{c}' is not a channel letter"))
            })?),
            None => suffix,
        };

        if let Some(path) = &self.path {
            if !path.is_file() {
                return Err(DarnError::invalid_request(
                    "path",
                    format!("{} does not exist", path.display()),
                ));
            }
        }

        Ok(DataRequest {
            window,
            radar,
            filter: RecordFilter {
                stid: self.stid,
                channel,
                bmnum: self.bmnum,
                cp: self.cp,
            },
            file_type: self.file_type.unwrap_or(FileType::FitEx),
            filtered: self.filtered,
            path: self.path,
            source: self.source,
            bypass_cache: self.bypass_cache,
        })
    }
}

/// Split `"fhe.a"` into the station code and channel.
fn parse_station(station: &str) -> Result<(String, Option<Channel>)> {
    let station = station.trim().to_lowercase();
    let (code, suffix) = match station.split_once('.') {
        Some((code, suffix)) => (code, Some(suffix)),
        None => (station.as_str(), None),
    };

    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(DarnError::invalid_request(
            "station",
            format!("'{station}' is not a station code"),
        ));
    }

    let channel = match suffix {
        None => None,
        Some(s) => {
            let mut chars = s.chars();
            match (chars.next().and_then(Channel::new), chars.next()) {
                (Some(channel), None) => Some(channel),
                _ => {
                    return Err(DarnError::invalid_request(
                        "station",
                        format!("'{s}' is not a channel suffix"),
                    ))
                }
            }
        }
    };

    Ok((code.to_string(), channel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2012, 11, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_defaults() {
        let request = DataRequest::builder()
            .start(start())
            .station("FHE")
            .build()
            .unwrap();
        assert_eq!(request.radar(), Some("fhe"));
        assert_eq!(request.window().end(), start() + Duration::days(1));
        assert_eq!(request.file_type(), FileType::FitEx);
        assert_eq!(request.source(), SourcePreference::Any);
        assert!(request.filter().is_all());
        assert_eq!(request.search_start(), start() - Duration::minutes(4));
    }

    #[test]
    fn test_station_suffix_and_explicit_channel() {
        let request = DataRequest::builder()
            .start(start())
            .station("kod.d")
            .build()
            .unwrap();
        assert_eq!(request.radar(), Some("kod"));
        assert_eq!(request.filter().channel, Channel::new('d'));

        let request = DataRequest::builder()
            .start(start())
            .station("kod.d")
            .channel('a')
            .build()
            .unwrap();
        assert_eq!(request.filter().channel, Some(Channel::A));
    }

    #[test]
    fn test_validation_failures() {
        let missing_start = DataRequest::builder().station("fhe").build();
        assert!(matches!(
            missing_start,
            Err(DarnError::InvalidRequest { ref field, .. }) if field == "start"
        ));

        let inverted = DataRequest::builder()
            .start(start())
            .end(start() - Duration::hours(1))
            .station("fhe")
            .build();
        assert!(inverted.is_err());

        for bad in ["", "f-e", "fhe.ab", "fhe.1"] {
            assert!(
                DataRequest::builder().start(start()).station(bad).build().is_err(),
                "{bad} accepted"
            );
        }

        let bad_channel = DataRequest::builder()
            .start(start())
            .station("fhe")
            .channel('7')
            .build();
        assert!(bad_channel.is_err());

        let no_station = DataRequest::builder().start(start()).build();
        assert!(no_station.is_err());
    }

    #[test]
    fn test_missing_path_rejected() {
        let result = DataRequest::builder()
            .start(start())
            .path("/nonexistent/darnio/file.fitacf")
            .build();
        assert!(matches!(
            result,
            Err(DarnError::InvalidRequest { ref field, .. }) if field == "path"
        ));
    }

    #[test]
    fn test_source_preference_parse() {
        assert_eq!("sftp".parse::<SourcePreference>().unwrap(), SourcePreference::Remote);
        assert_eq!("LOCAL".parse::<SourcePreference>().unwrap(), SourcePreference::Local);
        assert!("ftp".parse::<SourcePreference>().is_err());
        assert!(SourcePreference::Any.allows_local() && SourcePreference::Any.allows_remote());
        assert!(!SourcePreference::Remote.allows_local());
    }
}
