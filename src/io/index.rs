// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Time index over a record file.
//!
//! A [`RecordIndex`] maps record times to byte offsets, for every record
//! in the window and separately for records that open a scan. It is
//! built by one forward pass and leaves the cursor where it found it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::filter::TimeWindow;
use crate::dmap::RecordCodec;
use crate::record::RecordHeader;
use crate::Result;

/// Time to offset mappings for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordIndex {
    records: BTreeMap<DateTime<Utc>, u64>,
    scan_starts: BTreeMap<DateTime<Utc>, u64>,
}

impl RecordIndex {
    /// Index every record of `codec` whose time lies in `window`.
    ///
    /// The cursor is rewound to the start for the pass and restored
    /// afterwards, on failure as well. Records sharing a timestamp keep
    /// the offset of the last one.
    pub fn build<C: RecordCodec + ?Sized>(codec: &mut C, window: &TimeWindow) -> Result<Self> {
        let saved = codec.offset()?;
        let built = Self::scan(codec, window);
        let restored = codec.seek(saved);
        let index = built?;
        restored?;

        debug!(
            context = "RecordIndex",
            records = index.records.len(),
            scans = index.scan_starts.len(),
            "Built record index"
        );
        Ok(index)
    }

    fn scan<C: RecordCodec + ?Sized>(codec: &mut C, window: &TimeWindow) -> Result<Self> {
        codec.seek(0)?;
        let mut index = Self::default();
        loop {
            let offset = codec.offset()?;
            let Some(fields) = codec.decode_next()? else {
                break;
            };
            let header = RecordHeader::from_fields(&fields)?;
            if !window.contains(header.time) {
                continue;
            }
            index.records.insert(header.time, offset);
            if header.scan {
                index.scan_starts.insert(header.time, offset);
            }
        }
        Ok(index)
    }

    /// Offsets of every indexed record.
    pub fn records(&self) -> &BTreeMap<DateTime<Utc>, u64> {
        &self.records
    }

    /// Offsets of records that open a scan.
    pub fn scan_starts(&self) -> &BTreeMap<DateTime<Utc>, u64> {
        &self.scan_starts
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn scan_count(&self) -> usize {
        self.scan_starts.len()
    }

    /// First indexed record at or after `time`.
    pub fn record_at_or_after(&self, time: DateTime<Utc>) -> Option<(DateTime<Utc>, u64)> {
        self.records.range(time..).next().map(|(t, o)| (*t, *o))
    }

    /// First scan start at or after `time`.
    pub fn scan_at_or_after(&self, time: DateTime<Utc>) -> Option<(DateTime<Utc>, u64)> {
        self.scan_starts.range(time..).next().map(|(t, o)| (*t, *o))
    }

    /// Time span covered by the index.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.records.keys().next()?;
        let last = self.records.keys().next_back()?;
        Some((*first, *last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmap::{DmapCodec, DmapRecord, DmapWriter};
    use crate::FieldValue;
    use chrono::TimeZone;
    use std::io::Cursor;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2012, 11, 1, 0, 0, 0).unwrap()
    }

    /// Records one minute apart; every third opens a scan.
    fn stream(count: i64) -> (Vec<u8>, Vec<u64>) {
        let mut writer = DmapWriter::new(Vec::new());
        let mut offsets = Vec::new();
        for i in 0..count {
            let time = base().timestamp() + i * 60;
            let record = DmapRecord::new()
                .scalar("time", FieldValue::Double(time as f64))
                .scalar("scan", FieldValue::Short(i16::from(i % 3 == 0)));
            offsets.push(writer.write(&record).unwrap());
        }
        (writer.finish().unwrap(), offsets)
    }

    #[test]
    fn test_index_offsets_and_scan_starts() {
        let (bytes, offsets) = stream(9);
        let mut codec = DmapCodec::new(Cursor::new(bytes));
        let window = TimeWindow::new(base(), base() + chrono::Duration::hours(1)).unwrap();

        let index = RecordIndex::build(&mut codec, &window).unwrap();
        assert_eq!(index.len(), 9);
        assert_eq!(index.scan_count(), 3);
        assert_eq!(index.records()[&base()], offsets[0]);
        let fourth = base() + chrono::Duration::minutes(3);
        assert_eq!(index.scan_starts()[&fourth], offsets[3]);
        assert_eq!(
            index.scan_at_or_after(base() + chrono::Duration::seconds(1)),
            Some((fourth, offsets[3]))
        );
    }

    #[test]
    fn test_index_restores_cursor() {
        let (bytes, offsets) = stream(5);
        let mut codec = DmapCodec::new(Cursor::new(bytes));
        codec.seek(offsets[2]).unwrap();

        let window = TimeWindow::day_from(base());
        RecordIndex::build(&mut codec, &window).unwrap();
        assert_eq!(codec.offset().unwrap(), offsets[2]);
    }

    #[test]
    fn test_index_respects_window() {
        let (bytes, _) = stream(10);
        let mut codec = DmapCodec::new(Cursor::new(bytes));
        let window = TimeWindow::new(
            base() + chrono::Duration::minutes(2),
            base() + chrono::Duration::minutes(5),
        )
        .unwrap();

        let index = RecordIndex::build(&mut codec, &window).unwrap();
        assert_eq!(index.len(), 4);
        let (first, last) = index.span().unwrap();
        assert_eq!(first, base() + chrono::Duration::minutes(2));
        assert_eq!(last, base() + chrono::Duration::minutes(5));
        assert!(index.record_at_or_after(last + chrono::Duration::seconds(1)).is_none());
    }
}
