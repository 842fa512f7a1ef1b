// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Structured beam records.
//!
//! A [`BeamRecord`] is one sounding. It always carries the operating
//! parameters and, depending on the file subtype it came from, one
//! variant [`Payload`]: fitted parameters, a raw correlation spectrum or
//! IQ samples.

pub mod fit;
pub mod hydrate;
pub mod iq;
pub mod prm;
pub mod raw;

pub use fit::FittedParams;
pub use hydrate::RecordHeader;
pub use iq::{IqSamples, SampleSeries};
pub use prm::OperatingParams;
pub use raw::{LagSeries, RawSpectrum};

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Channel, FieldMap, FileType, Result};

static NEXT_POINTER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of the pointer that produced a record.
///
/// Provenance only: records never reach back into their pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PointerId(u64);

impl PointerId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        PointerId(NEXT_POINTER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PointerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ptr#{}", self.0)
    }
}

/// Subtype-specific data of a sounding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum Payload {
    /// The record carries none of its subtype's data arrays (a fitted
    /// sounding with no good range gates, for one)
    None,
    /// Fitted parameters (fitacf, fitex, lmfit)
    Fit(FittedParams),
    /// Raw correlation spectrum (rawacf)
    Raw(RawSpectrum),
    /// IQ samples (iqdat)
    Iq(IqSamples),
}

/// One decoded sounding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeamRecord {
    /// Station id
    pub stid: i32,
    /// Control program id
    pub cp: i32,
    /// Beam number
    pub bmnum: i32,
    /// Receiver channel
    pub channel: Channel,
    /// Sounding time
    pub time: DateTime<Utc>,
    /// Subtype of the file this record was read from
    pub file_type: FileType,
    /// Byte offset of the record in its file
    pub offset: u64,
    /// Pointer that produced the record
    pub source: PointerId,
    /// Operating parameters
    pub prm: OperatingParams,
    /// Subtype data
    pub payload: Payload,
}

impl BeamRecord {
    /// Build a record from a flat field map.
    ///
    /// Operating parameters are always filled; the payload variant is
    /// chosen by `file_type`, and is [`Payload::None`] when none of that
    /// subtype's data arrays are present. Only composite fields (correlation and IQ
    /// arrays) or a missing `time` make this fail.
    pub fn hydrate(
        flat: &FieldMap,
        file_type: FileType,
        offset: u64,
        source: PointerId,
    ) -> Result<Self> {
        let header = RecordHeader::from_fields(flat)?;
        let prm: OperatingParams = hydrate::hydrate(flat, &OperatingParams::default())?;

        let payload = if !has_payload(flat, file_type) {
            Payload::None
        } else {
            match file_type {
                FileType::FitAcf | FileType::FitEx | FileType::LmFit => {
                    Payload::Fit(hydrate::hydrate(flat, &prm)?)
                }
                FileType::RawAcf => Payload::Raw(hydrate::hydrate(flat, &prm)?),
                FileType::IqDat => Payload::Iq(hydrate::hydrate(flat, &prm)?),
            }
        };

        Ok(Self {
            stid: header.stid,
            cp: header.cp,
            bmnum: header.bmnum,
            channel: header.channel,
            time: header.time,
            file_type,
            offset,
            source,
            prm,
            payload,
        })
    }

    /// Whether this record opens a new scan.
    pub fn is_scan_start(&self) -> bool {
        self.prm.is_scan_start()
    }

    pub fn fit(&self) -> Option<&FittedParams> {
        match &self.payload {
            Payload::Fit(f) => Some(f),
            _ => None,
        }
    }

    pub fn raw(&self) -> Option<&RawSpectrum> {
        match &self.payload {
            Payload::Raw(r) => Some(r),
            _ => None,
        }
    }

    pub fn iq(&self) -> Option<&IqSamples> {
        match &self.payload {
            Payload::Iq(q) => Some(q),
            _ => None,
        }
    }
}

/// Arrays whose presence marks subtype data in a record.
fn payload_keys(file_type: FileType) -> &'static [&'static str] {
    match file_type {
        FileType::FitAcf | FileType::FitEx | FileType::LmFit => &["slist"],
        FileType::RawAcf => &["acfd", "xcfd"],
        FileType::IqDat => &["data"],
    }
}

fn has_payload(flat: &FieldMap, file_type: FileType) -> bool {
    payload_keys(file_type).iter().any(|key| flat.contains_key(*key))
}

/// Consecutive records of one scan cycle, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScanData {
    beams: Vec<BeamRecord>,
}

impl ScanData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, beam: BeamRecord) {
        self.beams.push(beam);
    }

    pub fn len(&self) -> usize {
        self.beams.len()
    }

    /// An empty scan marks the end of the stream.
    pub fn is_empty(&self) -> bool {
        self.beams.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BeamRecord> {
        self.beams.iter()
    }

    pub fn beams(&self) -> &[BeamRecord] {
        &self.beams
    }

    pub fn into_beams(self) -> Vec<BeamRecord> {
        self.beams
    }

    /// Time of the first beam.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.beams.first().map(|b| b.time)
    }

    /// Time of the last beam.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.beams.last().map(|b| b.time)
    }
}

impl IntoIterator for ScanData {
    type Item = BeamRecord;
    type IntoIter = std::vec::IntoIter<BeamRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.beams.into_iter()
    }
}

impl<'a> IntoIterator for &'a ScanData {
    type Item = &'a BeamRecord;
    type IntoIter = std::slice::Iter<'a, BeamRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.beams.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::{ArrayValue, ValueKind};
    use crate::FieldValue;

    fn flat(file_scan: i16) -> FieldMap {
        let mut flat = FieldMap::new();
        flat.insert("time".into(), FieldValue::Double(1_351_728_000.0));
        flat.insert("stid".into(), FieldValue::Short(33));
        flat.insert("bmnum".into(), FieldValue::Short(7));
        flat.insert("cp".into(), FieldValue::Short(153));
        flat.insert("channel".into(), FieldValue::Short(2));
        flat.insert("scan".into(), FieldValue::Short(file_scan));
        flat.insert("nrang".into(), FieldValue::Short(1));
        flat.insert("mplgs".into(), FieldValue::Short(1));
        flat
    }

    fn shorts(values: &[i16]) -> FieldValue {
        FieldValue::Array(ArrayValue::new(
            ValueKind::Short,
            values.iter().copied().map(FieldValue::Short).collect(),
        ))
    }

    fn with(mut flat: FieldMap, key: &str, value: FieldValue) -> FieldMap {
        flat.insert(key.into(), value);
        flat
    }

    #[test]
    fn test_payload_follows_file_type() {
        let id = PointerId::next();
        let fit = BeamRecord::hydrate(&with(flat(1), "slist", shorts(&[4])), FileType::FitEx, 0, id)
            .unwrap();
        assert!(fit.fit().is_some());
        assert!(fit.raw().is_none());
        assert!(fit.is_scan_start());
        assert_eq!(fit.channel.as_char(), 'b');
        assert_eq!((fit.stid, fit.bmnum, fit.cp), (33, 7, 153));

        let acfd = FieldValue::Array(ArrayValue::new(
            ValueKind::Float,
            vec![FieldValue::Float(1.0), FieldValue::Float(2.0)],
        ));
        let raw = BeamRecord::hydrate(&with(flat(0), "acfd", acfd), FileType::RawAcf, 64, id)
            .unwrap();
        assert!(raw.raw().is_some());
        assert!(!raw.is_scan_start());
        assert_eq!(raw.offset, 64);
        assert_eq!(raw.source, id);

        let mut iq_flat = with(flat(0), "data", shorts(&[5, 6]));
        iq_flat.insert("seqnum".into(), FieldValue::Int(1));
        iq_flat.insert("smpnum".into(), FieldValue::Int(1));
        let iq = BeamRecord::hydrate(&iq_flat, FileType::IqDat, 0, id).unwrap();
        assert_eq!(iq.iq().map(|q| q.main_data.clone()), Some(vec![vec![[5, 6]]]));
    }

    #[test]
    fn test_missing_subtype_arrays_leave_no_payload() {
        let id = PointerId::next();
        for file_type in FileType::ALL {
            let rec = BeamRecord::hydrate(&flat(0), file_type, 0, id).unwrap();
            assert_eq!(rec.payload, Payload::None);
            assert!(rec.fit().is_none() && rec.raw().is_none() && rec.iq().is_none());
            assert_eq!(rec.bmnum, 7);
        }
    }

    #[test]
    fn test_pointer_ids_are_unique() {
        let a = PointerId::next();
        let b = PointerId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_record_serializes() {
        let flat = with(flat(1), "slist", shorts(&[4]));
        let rec = BeamRecord::hydrate(&flat, FileType::FitAcf, 0, PointerId::next()).unwrap();
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["payload"]["kind"], "fit");
        assert_eq!(json["channel"], "b");
        assert_eq!(json["file_type"], "fitacf");
    }
}
