// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};

use darnio::{DmapRecord, DmapWriter, FieldValue};

/// Station id written into every fixture record.
pub const STID: i16 = 33;

/// Control program id written into every fixture record.
pub const CP: i16 = 153;

// ============================================================================
// Records
// ============================================================================

/// Start of the fixture day.
pub fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2012, 11, 1, 0, 0, 0).unwrap()
}

/// One fitted sounding with two good range gates.
pub fn sounding(time: DateTime<Utc>, beam: i16, scan_start: bool) -> DmapRecord {
    sounding_on(time, beam, scan_start, 0)
}

/// A sounding carrying the raw channel code `channel`.
pub fn sounding_on(time: DateTime<Utc>, beam: i16, scan_start: bool, channel: i16) -> DmapRecord {
    DmapRecord::new()
        .scalar("time", FieldValue::Double(time.timestamp() as f64))
        .scalar("stid", FieldValue::Short(STID))
        .scalar("channel", FieldValue::Short(channel))
        .scalar("bmnum", FieldValue::Short(beam))
        .scalar("cp", FieldValue::Short(CP))
        .scalar("scan", FieldValue::Short(i16::from(scan_start)))
        .scalar("nave", FieldValue::Short(24))
        .scalar("tfreq", FieldValue::Short(10_500))
        .scalar("nrang", FieldValue::Short(75))
        .scalar("mplgs", FieldValue::Short(18))
        .scalar("intt.sc", FieldValue::Short(3))
        .scalar("intt.us", FieldValue::Int(0))
        .scalar("noise.sky", FieldValue::Float(2.5))
        .array_i16("slist", &[10, 11])
        .array_f32("v", &[120.0, -45.5])
        .array_i16("gflg", &[0, 1])
}

/// `scans` scans of `beams` soundings, one every `step` seconds from
/// `start`; the first beam of each scan carries the scan flag.
pub fn scan_records(start: DateTime<Utc>, scans: i64, beams: i64, step: i64) -> Vec<DmapRecord> {
    scan_records_on(start, scans, beams, step, 0)
}

/// Like [`scan_records`], on raw channel code `channel`.
pub fn scan_records_on(
    start: DateTime<Utc>,
    scans: i64,
    beams: i64,
    step: i64,
    channel: i16,
) -> Vec<DmapRecord> {
    (0..scans)
        .flat_map(|s| {
            (0..beams).map(move |b| {
                let time = start + Duration::seconds((s * beams + b) * step);
                sounding_on(time, b as i16, b == 0, channel)
            })
        })
        .collect()
}

/// Encode records as a DMAP byte stream.
pub fn dmap_bytes(records: &[DmapRecord]) -> Vec<u8> {
    let mut writer = DmapWriter::new(Vec::new());
    for record in records {
        writer.write(record).unwrap();
    }
    writer.finish().unwrap()
}

// ============================================================================
// Files
// ============================================================================

/// Write records to a plain DMAP file.
pub fn write_dmap(path: &Path, records: &[DmapRecord]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, dmap_bytes(records)).unwrap();
}

/// Write bytes bzip2-compressed.
pub fn write_bz2(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut enc = bzip2::write::BzEncoder::new(File::create(path).unwrap(), bzip2::Compression::default());
    enc.write_all(bytes).unwrap();
    enc.finish().unwrap();
}

/// Write bytes gzip-compressed.
pub fn write_gz(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut enc = flate2::write::GzEncoder::new(File::create(path).unwrap(), flate2::Compression::default());
    enc.write_all(bytes).unwrap();
    enc.finish().unwrap();
}

/// File names in a directory, sorted.
pub fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().into_string().ok())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
