// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Staging area: names, cache lookup, decompression and concatenation.
//!
//! Two naming conventions meet here:
//!
//! - archive files, one per recording interval:
//!   `YYYYMMDD.HHMM.SS.<radar>[.<chan>].<ftype>[.bz2|.gz]`
//! - staged merged files, one per resolved request:
//!   `YYYYMMDD.HHMMSS.YYYYMMDD.HHMMSS.<radar>[.<chan>].<ftype>[f]`, where
//!   the two instants bound the data, the channel suffix is present when
//!   the request selected one and a trailing `f` marks quality-filtered
//!   output

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use bzip2::read::MultiBzDecoder;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use flate2::read::MultiGzDecoder;
use regex::Regex;
use tracing::{debug, warn};

use crate::io::detection::{detect_compression, Compression};
use crate::{Channel, DarnError, FileType, Result};

const STAMP_FORMAT: &str = "%Y%m%d.%H%M%S";

fn staged_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{8}\.\d{6})\.(\d{8}\.\d{6})\.([a-z0-9]+)(?:\.([a-z]))?\.(rawacf|fitacf|fitex|lmfit|iqdat)(f?)$",
        )
        .unwrap_or_else(|e| unreachable!("staged name pattern is valid: {e}"))
    })
}

fn archive_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{8})\.(\d{2})(\d{2})\.(\d{2})\.([a-z0-9]+)(?:\.([a-z]))?\.(rawacf|fitacf|fitex|lmfit|iqdat)(?:\.(bz2|gz))?$",
        )
        .unwrap_or_else(|e| unreachable!("archive name pattern is valid: {e}"))
    })
}

fn parse_stamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, STAMP_FORMAT)
        .ok()
        .map(|t| t.and_utc())
}

/// Name of a staged merged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedName {
    /// Earliest data start
    pub start: DateTime<Utc>,
    /// End of the request the file was built for
    pub end: DateTime<Utc>,
    /// Station code
    pub radar: String,
    /// Channel the data was selected for; `None` holds every channel
    pub channel: Option<Channel>,
    /// Subtype
    pub file_type: FileType,
    /// Quality-filtered marker
    pub filtered: bool,
}

impl StagedName {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        radar: impl Into<String>,
        file_type: FileType,
    ) -> Self {
        Self {
            start,
            end,
            radar: radar.into(),
            channel: None,
            file_type,
            filtered: false,
        }
    }

    /// Same name restricted to `channel`.
    pub fn with_channel(mut self, channel: Option<Channel>) -> Self {
        self.channel = channel;
        self
    }

    /// Parse a staged file name; `None` if it does not follow the
    /// convention.
    pub fn parse(name: &str) -> Option<Self> {
        let caps = staged_pattern().captures(name)?;
        Some(Self {
            start: parse_stamp(caps.get(1)?.as_str())?,
            end: parse_stamp(caps.get(2)?.as_str())?,
            radar: caps.get(3)?.as_str().to_string(),
            channel: caps
                .get(4)
                .and_then(|m| m.as_str().chars().next())
                .and_then(Channel::new),
            file_type: caps.get(5)?.as_str().parse().ok()?,
            filtered: !caps.get(6)?.as_str().is_empty(),
        })
    }

    /// Check if the encoded interval contains `[start, end]`.
    pub fn covers(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start <= start && self.end >= end
    }

    /// Same name with the filtered marker set.
    pub fn to_filtered(&self) -> Self {
        Self {
            filtered: true,
            ..self.clone()
        }
    }
}

impl fmt::Display for StagedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.start.format(STAMP_FORMAT),
            self.end.format(STAMP_FORMAT),
            self.radar
        )?;
        if let Some(channel) = self.channel {
            write!(f, ".{channel}")?;
        }
        write!(
            f,
            ".{}{}",
            self.file_type,
            if self.filtered { "f" } else { "" }
        )
    }
}

/// Name of one archive file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    /// Start of the recording interval
    pub start: DateTime<Utc>,
    pub radar: String,
    /// Channel suffix, if the name carries one
    pub channel: Option<Channel>,
    pub file_type: FileType,
    pub compression: Compression,
}

impl ArchiveName {
    /// Parse an archive file name; `None` if it does not follow the
    /// convention.
    pub fn parse(name: &str) -> Option<Self> {
        let caps = archive_pattern().captures(name)?;
        let date = NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y%m%d").ok()?;
        let hour = caps.get(2)?.as_str().parse().ok()?;
        let minute = caps.get(3)?.as_str().parse().ok()?;
        let second = caps.get(4)?.as_str().parse().ok()?;
        let time = NaiveTime::from_hms_opt(hour, minute, second)?;

        let compression = match caps.get(8).map(|m| m.as_str()) {
            Some("bz2") => Compression::Bzip2,
            Some("gz") => Compression::Gzip,
            _ => Compression::None,
        };

        Some(Self {
            start: date.and_time(time).and_utc(),
            radar: caps.get(5)?.as_str().to_string(),
            channel: caps
                .get(6)
                .and_then(|m| m.as_str().chars().next())
                .and_then(Channel::new),
            file_type: caps.get(7)?.as_str().parse().ok()?,
            compression,
        })
    }

    /// Check if the file starts within the clock hour beginning at `hour`.
    pub fn in_hour(&self, hour: DateTime<Utc>) -> bool {
        self.start.date_naive() == hour.date_naive() && self.start.hour() == hour.hour()
    }

    /// Check station, subtype and channel.
    ///
    /// Unsuffixed names belong to single-channel stations and always
    /// match. With no channel requested any suffix is accepted.
    pub fn matches(&self, radar: &str, file_type: FileType, channel: Option<Channel>) -> bool {
        self.radar == radar
            && self.file_type == file_type
            && match (channel, self.channel) {
                (Some(wanted), Some(found)) => wanted == found,
                _ => true,
            }
    }
}

/// Clock hours an archive search visits for `[search_start, end]`.
///
/// Archive files begin on even hours, so the walk starts at the even
/// hour at or before `search_start` and steps one hour at a time while
/// not past `end`.
pub fn archive_hours(
    search_start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> impl Iterator<Item = DateTime<Utc>> {
    let floored = search_start
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(search_start);
    let first = if floored.hour() % 2 == 1 {
        floored - Duration::hours(1)
    } else {
        floored
    };
    std::iter::successors(Some(first), |t| Some(*t + Duration::hours(1)))
        .take_while(move |t| *t <= end)
}

/// Look for a staged file whose interval covers `[start, end]`.
///
/// Station and channel must match exactly: a file merged for one channel
/// never serves another, and a channel-specific file never serves a
/// request for every channel. With `want_filtered`, filtered files are tried first and unfiltered
/// ones second; otherwise only unfiltered files qualify. A missing
/// staging directory is an empty cache.
pub fn find_cached(
    staging_dir: &Path,
    radar: &str,
    channel: Option<Channel>,
    file_type: FileType,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    want_filtered: bool,
) -> Result<Option<(PathBuf, StagedName)>> {
    let entries = match fs::read_dir(staging_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(DarnError::io(
                "find_cached",
                format!("Failed to list {}: {e}", staging_dir.display()),
            ))
        }
    };

    let mut candidates: Vec<(PathBuf, StagedName)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = StagedName::parse(entry.file_name().to_str()?)?;
            Some((entry.path(), name))
        })
        .filter(|(_, name)| {
            name.radar == radar
                && name.channel == channel
                && name.file_type == file_type
                && name.covers(start, end)
        })
        .collect();
    candidates.sort_by(|a, b| a.0.cmp(&b.0));

    let passes = if want_filtered {
        &[true, false][..]
    } else {
        &[false][..]
    };
    for filtered in passes {
        if let Some(hit) = candidates.iter().find(|(_, n)| n.filtered == *filtered) {
            return Ok(Some(hit.clone()));
        }
    }
    Ok(None)
}

/// Files staged for one subtype, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct StagedParts {
    pub paths: Vec<PathBuf>,
    /// Earliest archive start time seen
    pub earliest: Option<DateTime<Utc>>,
}

impl StagedParts {
    pub fn push(&mut self, path: PathBuf, start: DateTime<Utc>) {
        self.paths.push(path);
        self.earliest = Some(self.earliest.map_or(start, |t| t.min(start)));
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Delete everything staged so far.
    pub fn discard(self) {
        remove_parts(&self.paths);
    }
}

/// Name a file keeps once staged: the compression extension is dropped.
pub fn staged_file_name(name: &str) -> &str {
    name.strip_suffix(".bz2")
        .or_else(|| name.strip_suffix(".gz"))
        .unwrap_or(name)
}

/// Copy `src` into `dest_dir`, decompressing it when compressed.
///
/// Returns the path of the staged copy.
pub fn stage_file(src: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let name = src
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DarnError::io("stage_file", format!("{} has no file name", src.display())))?;
    let dest = dest_dir.join(staged_file_name(name));

    let compression = detect_compression(src)?;
    match compression {
        Compression::None => {
            fs::copy(src, &dest).map_err(|e| {
                DarnError::io(
                    "stage_file",
                    format!("Failed to copy {} to {}: {e}", src.display(), dest.display()),
                )
            })?;
        }
        Compression::Bzip2 | Compression::Gzip => decompress_file(src, compression, &dest)?,
    }

    debug!(
        context = "staging",
        src = %src.display(),
        dest = %dest.display(),
        ?compression,
        "Staged archive file"
    );
    Ok(dest)
}

/// Decompress `src` into `dest`. A partial `dest` is removed on failure.
pub fn decompress_file(src: &Path, compression: Compression, dest: &Path) -> Result<()> {
    let result = (|| -> io::Result<u64> {
        let mut input = BufReader::new(File::open(src)?);
        let mut output = BufWriter::new(File::create(dest)?);
        let copied = match compression {
            Compression::Bzip2 => io::copy(&mut MultiBzDecoder::new(input), &mut output)?,
            Compression::Gzip => io::copy(&mut MultiGzDecoder::new(input), &mut output)?,
            Compression::None => io::copy(&mut input, &mut output)?,
        };
        output.flush()?;
        Ok(copied)
    })();

    result.map(|_| ()).map_err(|e| {
        let _ = fs::remove_file(dest);
        DarnError::decompress(src.display().to_string(), e.to_string())
    })
}

/// Concatenate `parts` in order into `dest`, then delete the parts.
pub fn concat_files(parts: &[PathBuf], dest: &Path) -> Result<()> {
    let result = (|| -> io::Result<()> {
        let mut output = BufWriter::new(File::create(dest)?);
        for part in parts {
            let mut input = BufReader::new(File::open(part)?);
            io::copy(&mut input, &mut output)?;
        }
        output.flush()
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(dest);
        return Err(DarnError::io(
            "concat_files",
            format!("Failed to build {}: {e}", dest.display()),
        ));
    }

    remove_parts(parts);
    debug!(
        context = "staging",
        parts = parts.len(),
        dest = %dest.display(),
        "Concatenated staged files"
    );
    Ok(())
}

/// Delete intermediate staged files, logging failures.
pub fn remove_parts(parts: &[PathBuf]) {
    for part in parts {
        if let Err(e) = fs::remove_file(part) {
            warn!(
                context = "staging",
                path = %part.display(),
                error = %e,
                "Failed to remove staged part"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_staged_name_parse_and_display() {
        let name = StagedName::parse("20121031.220100.20121101.040000.fhe.fitacf").unwrap();
        assert_eq!(name.start, utc(2012, 10, 31, 22, 1));
        assert_eq!(name.end, utc(2012, 11, 1, 4, 0));
        assert_eq!(name.radar, "fhe");
        assert_eq!(name.file_type, FileType::FitAcf);
        assert!(!name.filtered);
        assert_eq!(
            name.to_filtered().to_string(),
            "20121031.220100.20121101.040000.fhe.fitacff"
        );

        let filtered = StagedName::parse("20121031.220100.20121101.040000.fhe.fitexf").unwrap();
        assert!(filtered.filtered);
        assert_eq!(filtered.file_type, FileType::FitEx);

        assert!(StagedName::parse("20121031.220100.fhe.fitacf").is_none());
        assert!(StagedName::parse("20121031.220100.20121101.040000.fhe.grid").is_none());
    }

    #[test]
    fn test_staged_name_with_channel() {
        let name = StagedName::parse("20121101.000000.20121101.010000.fhe.b.fitacff").unwrap();
        assert_eq!(name.radar, "fhe");
        assert_eq!(name.channel, Channel::new('b'));
        assert_eq!(name.file_type, FileType::FitAcf);
        assert!(name.filtered);
        assert_eq!(
            name.to_string(),
            "20121101.000000.20121101.010000.fhe.b.fitacff"
        );

        let built = StagedName::new(
            utc(2012, 11, 1, 0, 0),
            utc(2012, 11, 1, 1, 0),
            "fhe",
            FileType::FitEx,
        )
        .with_channel(Channel::new('a'));
        assert_eq!(built.to_string(), "20121101.000000.20121101.010000.fhe.a.fitex");
    }

    #[test]
    fn test_find_cached_keeps_channels_apart() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "20121101.000000.20121101.010000.fhe.a.fitacf",
            "20121101.000000.20121101.010000.fhe.fitex",
        ] {
            File::create(dir.path().join(name)).unwrap();
        }
        let (s, e) = (utc(2012, 11, 1, 0, 10), utc(2012, 11, 1, 1, 0));

        let a = Channel::new('a');
        let (_, hit) = find_cached(dir.path(), "fhe", a, FileType::FitAcf, s, e, false)
            .unwrap()
            .unwrap();
        assert_eq!(hit.channel, Channel::new('a'));

        for channel in [Channel::new('b'), None] {
            assert!(find_cached(dir.path(), "fhe", channel, FileType::FitAcf, s, e, false)
                .unwrap()
                .is_none());
        }
        assert!(find_cached(dir.path(), "fhe", a, FileType::FitEx, s, e, false)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_staged_name_coverage() {
        let name = StagedName::parse("20120101.000000.20120102.000000.abc.fitacf").unwrap();
        assert!(name.covers(utc(2012, 1, 1, 6, 0), utc(2012, 1, 1, 18, 0)));
        assert!(!name.covers(utc(2012, 1, 2, 6, 0), utc(2012, 1, 3, 0, 0)));
    }

    #[test]
    fn test_archive_name_parse() {
        let name = ArchiveName::parse("20121101.0201.00.fhe.fitacf.bz2").unwrap();
        assert_eq!(name.start, utc(2012, 11, 1, 2, 1));
        assert_eq!(name.radar, "fhe");
        assert_eq!(name.channel, None);
        assert_eq!(name.compression, Compression::Bzip2);
        assert!(name.in_hour(utc(2012, 11, 1, 2, 0)));
        assert!(!name.in_hour(utc(2012, 11, 1, 3, 0)));

        let chan = ArchiveName::parse("20121101.0400.00.kod.c.rawacf").unwrap();
        assert_eq!(chan.channel, Channel::new('c'));
        assert_eq!(chan.compression, Compression::None);
        assert!(chan.matches("kod", FileType::RawAcf, Channel::new('c')));
        assert!(chan.matches("kod", FileType::RawAcf, None));
        assert!(!chan.matches("kod", FileType::RawAcf, Channel::new('d')));
        assert!(!chan.matches("fhe", FileType::RawAcf, None));
        assert!(name.matches("fhe", FileType::FitAcf, Channel::new('b')));

        assert!(ArchiveName::parse("20121101.2601.00.fhe.fitacf").is_none());
        assert!(ArchiveName::parse("notes.txt").is_none());
    }

    #[test]
    fn test_archive_hours_align_to_even_hour() {
        let hours: Vec<_> = archive_hours(utc(2012, 11, 1, 3, 56), utc(2012, 11, 1, 6, 0)).collect();
        assert_eq!(
            hours,
            vec![
                utc(2012, 11, 1, 2, 0),
                utc(2012, 11, 1, 3, 0),
                utc(2012, 11, 1, 4, 0),
                utc(2012, 11, 1, 5, 0),
                utc(2012, 11, 1, 6, 0),
            ]
        );

        let across_midnight: Vec<_> =
            archive_hours(utc(2012, 10, 31, 23, 56), utc(2012, 11, 1, 0, 30)).collect();
        assert_eq!(across_midnight.first(), Some(&utc(2012, 10, 31, 22, 0)));
        assert_eq!(across_midnight.last(), Some(&utc(2012, 11, 1, 0, 0)));
    }

    #[test]
    fn test_find_cached_prefers_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "20120101.000000.20120102.000000.abc.fitacf",
            "20120101.000000.20120102.000000.abc.fitacff",
            "20120101.000000.20120102.000000.abc.fitex",
            "20120101.000000.20120101.120000.abc.fitacf",
        ] {
            File::create(dir.path().join(name)).unwrap();
        }
        let (s, e) = (utc(2012, 1, 1, 6, 0), utc(2012, 1, 1, 18, 0));

        let (_, hit) = find_cached(dir.path(), "abc", None, FileType::FitAcf, s, e, true)
            .unwrap()
            .unwrap();
        assert!(hit.filtered);

        let (path, hit) = find_cached(dir.path(), "abc", None, FileType::FitAcf, s, e, false)
            .unwrap()
            .unwrap();
        assert!(!hit.filtered);
        assert!(path.ends_with("20120101.000000.20120102.000000.abc.fitacf"));

        assert!(find_cached(dir.path(), "xyz", None, FileType::FitAcf, s, e, false)
            .unwrap()
            .is_none());
        assert!(
            find_cached(&dir.path().join("missing"), "abc", None, FileType::FitAcf, s, e, false)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_stage_file_decompresses() {
        let src_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let payload = b"dmap bytes".repeat(10);

        let bz = src_dir.path().join("20121101.0001.00.fhe.fitacf.bz2");
        let mut enc = bzip2::write::BzEncoder::new(File::create(&bz).unwrap(), bzip2::Compression::default());
        enc.write_all(&payload).unwrap();
        enc.finish().unwrap();

        let gz = src_dir.path().join("20121101.0201.00.fhe.fitacf.gz");
        let mut enc = flate2::write::GzEncoder::new(File::create(&gz).unwrap(), flate2::Compression::default());
        enc.write_all(&payload).unwrap();
        enc.finish().unwrap();

        let staged = stage_file(&bz, dest_dir.path()).unwrap();
        assert!(staged.ends_with("20121101.0001.00.fhe.fitacf"));
        assert_eq!(fs::read(&staged).unwrap(), payload);

        let staged = stage_file(&gz, dest_dir.path()).unwrap();
        assert!(staged.ends_with("20121101.0201.00.fhe.fitacf"));
        assert_eq!(fs::read(&staged).unwrap(), payload);
    }

    #[test]
    fn test_corrupt_archive_is_decompress_error() {
        let src_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let bad = src_dir.path().join("20121101.0001.00.fhe.fitacf.bz2");
        fs::write(&bad, b"BZh9 definitely not bzip2").unwrap();

        let err = stage_file(&bad, dest_dir.path()).unwrap_err();
        assert!(matches!(err, DarnError::Decompress { .. }));
        assert!(!dest_dir.path().join("20121101.0001.00.fhe.fitacf").exists());
    }

    #[test]
    fn test_concat_removes_parts() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, b"first,").unwrap();
        fs::write(&b, b"second").unwrap();

        let merged = dir.path().join("merged");
        concat_files(&[a.clone(), b.clone()], &merged).unwrap();
        assert_eq!(fs::read(&merged).unwrap(), b"first,second");
        assert!(!a.exists() && !b.exists());
    }

    #[test]
    fn test_staged_file_name() {
        assert_eq!(staged_file_name("x.fitacf.bz2"), "x.fitacf");
        assert_eq!(staged_file_name("x.fitacf.gz"), "x.fitacf");
        assert_eq!(staged_file_name("x.fitacf"), "x.fitacf");
    }
}
