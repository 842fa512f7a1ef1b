// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout darnio.
//!
//! This module provides the foundational types for the library:
//! - [`DarnError`] - Error taxonomy
//! - [`FieldValue`] - Flat decoded field representation
//! - [`FileType`] - Processed-data subtype of a record file
//! - [`Channel`] - Lettered receiver channel
//! - [`DataKind`] - On-disk encoding of the staged data

pub mod error;
pub mod value;

pub use error::{DarnError, Result};
pub use value::{ArrayValue, FieldMap, FieldValue, ValueKind};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Processed-data subtype of a record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Raw auto/cross-correlation functions
    RawAcf,
    /// Standard fitted parameters
    FitAcf,
    /// Extended-fit fitted parameters
    FitEx,
    /// Levenberg-Marquardt fitted parameters
    LmFit,
    /// In-phase/quadrature samples
    IqDat,
}

const FITEX_CHAIN: [FileType; 3] = [FileType::FitEx, FileType::FitAcf, FileType::LmFit];
const FITACF_CHAIN: [FileType; 3] = [FileType::FitAcf, FileType::FitEx, FileType::LmFit];
const LMFIT_CHAIN: [FileType; 3] = [FileType::LmFit, FileType::FitEx, FileType::FitAcf];

impl FileType {
    /// All known subtypes.
    pub const ALL: [FileType; 5] = [
        FileType::RawAcf,
        FileType::FitAcf,
        FileType::FitEx,
        FileType::LmFit,
        FileType::IqDat,
    ];

    /// Name used in archive and staging filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::RawAcf => "rawacf",
            FileType::FitAcf => "fitacf",
            FileType::FitEx => "fitex",
            FileType::LmFit => "lmfit",
            FileType::IqDat => "iqdat",
        }
    }

    /// Whether this subtype carries fitted parameters.
    pub fn is_fit(&self) -> bool {
        matches!(self, FileType::FitAcf | FileType::FitEx | FileType::LmFit)
    }

    /// Subtypes acceptable for a request of this subtype, in priority order.
    ///
    /// The order is asymmetric per requested subtype and must not be
    /// normalized.
    pub fn fallback_chain(&self) -> &'static [FileType] {
        match self {
            FileType::FitEx => &FITEX_CHAIN,
            FileType::FitAcf => &FITACF_CHAIN,
            FileType::LmFit => &LMFIT_CHAIN,
            FileType::RawAcf => &[FileType::RawAcf],
            FileType::IqDat => &[FileType::IqDat],
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FileType {
    type Err = DarnError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        FileType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.to_lowercase())
            .ok_or_else(|| DarnError::unknown_file_type(s))
    }
}

/// Encoding of a staged data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// DMAP self-describing block format
    Dmap,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Dmap => "dmap",
        }
    }
}

/// Lettered receiver channel (`'a'..='z'`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Channel(char);

impl Channel {
    /// Primary channel.
    pub const A: Channel = Channel('a');

    /// Create a channel from a letter; `None` unless `'a'..='z'`.
    pub fn new(letter: char) -> Option<Self> {
        let letter = letter.to_ascii_lowercase();
        letter.is_ascii_lowercase().then_some(Channel(letter))
    }

    /// Derive the channel from the raw integer code stored in records.
    ///
    /// Codes below 2 are channel `a`; otherwise the code selects letter
    /// `code - 1` (0-based), so 2 is `b` and 3 is `c`. Codes past the end of
    /// the alphabet saturate at `z`.
    pub fn from_raw(code: i64) -> Self {
        if code < 2 {
            return Channel::A;
        }
        let index = (code - 1).min(25) as u8;
        Channel((b'a' + index) as char)
    }

    /// The channel letter.
    pub fn as_char(&self) -> char {
        self.0
    }
}

impl Default for Channel {
    fn default() -> Self {
        Channel::A
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Convert epoch seconds (with fractional part) to a UTC instant.
pub fn epoch_to_utc(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    Utc.timestamp_opt(whole as i64, nanos).single()
}

/// Convert a UTC instant to epoch seconds.
pub fn utc_to_epoch(time: DateTime<Utc>) -> f64 {
    time.timestamp() as f64 + time.timestamp_subsec_nanos() as f64 / 1e9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_round_trip_names() {
        for t in FileType::ALL {
            assert_eq!(t.as_str().parse::<FileType>().unwrap(), t);
        }
        assert!("FITACF".parse::<FileType>().is_ok());
        assert!(matches!(
            "grid".parse::<FileType>(),
            Err(DarnError::UnknownFileType { .. })
        ));
    }

    #[test]
    fn test_fallback_chains_are_asymmetric() {
        assert_eq!(
            FileType::FitEx.fallback_chain(),
            &[FileType::FitEx, FileType::FitAcf, FileType::LmFit]
        );
        assert_eq!(
            FileType::FitAcf.fallback_chain(),
            &[FileType::FitAcf, FileType::FitEx, FileType::LmFit]
        );
        assert_eq!(
            FileType::LmFit.fallback_chain(),
            &[FileType::LmFit, FileType::FitEx, FileType::FitAcf]
        );
        assert_eq!(FileType::RawAcf.fallback_chain(), &[FileType::RawAcf]);
        assert_eq!(FileType::IqDat.fallback_chain(), &[FileType::IqDat]);
    }

    #[test]
    fn test_channel_from_raw() {
        assert_eq!(Channel::from_raw(0).as_char(), 'a');
        assert_eq!(Channel::from_raw(1).as_char(), 'a');
        assert_eq!(Channel::from_raw(-4).as_char(), 'a');
        assert_eq!(Channel::from_raw(2).as_char(), 'b');
        assert_eq!(Channel::from_raw(3).as_char(), 'c');
        assert_eq!(Channel::from_raw(26).as_char(), 'z');
        assert_eq!(Channel::from_raw(400).as_char(), 'z');
        assert_eq!(Channel::from_raw(3), Channel::from_raw(3));
    }

    #[test]
    fn test_channel_new() {
        assert_eq!(Channel::new('B').map(|c| c.as_char()), Some('b'));
        assert_eq!(Channel::new('1'), None);
    }

    #[test]
    fn test_epoch_conversion() {
        let t = epoch_to_utc(1_351_728_000.5).unwrap();
        assert_eq!(t.timestamp(), 1_351_728_000);
        assert_eq!(t.timestamp_subsec_millis(), 500);
        assert!((utc_to_epoch(t) - 1_351_728_000.5).abs() < 1e-6);
        assert!(epoch_to_utc(f64::NAN).is_none());
    }
}
