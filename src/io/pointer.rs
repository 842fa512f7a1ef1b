// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Data pointer over one staged record file.
//!
//! A [`DataPointer`] owns the open file and its cursor. It delivers
//! records one at a time ([`read_record`](DataPointer::read_record)) or
//! grouped into scans ([`read_scan`](DataPointer::read_scan)), and can
//! build a time index for random access.
//!
//! # Example
//!
//! ```rust,no_run
//! use chrono::{TimeZone, Utc};
//! use darnio::io::{DataPointer, RecordFilter, TimeWindow};
//! use darnio::FileType;
//!
//! let start = Utc.with_ymd_and_hms(2012, 11, 1, 0, 0, 0).unwrap();
//! let window = TimeWindow::new(start, start + chrono::Duration::hours(2))?;
//! let mut ptr = DataPointer::open(
//!     "/tmp/sd/20121031.220100.20121101.040000.fhe.fitacf",
//!     FileType::FitAcf,
//!     window,
//!     RecordFilter::all(),
//! )?;
//! loop {
//!     let scan = ptr.read_scan()?;
//!     if scan.is_empty() {
//!         break;
//!     }
//!     println!("{} beams", scan.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use super::filter::{RecordFilter, TimeWindow};
use super::index::RecordIndex;
use crate::dmap::{DmapCodec, RecordCodec};
use crate::record::{BeamRecord, PointerId, RecordHeader, ScanData};
use crate::{DarnError, DataKind, FileType, Result};

/// Cursor over one staged record file.
///
/// The pointer is either open (it owns a codec) or closed. Every read on
/// a closed pointer fails with [`DarnError::PointerClosed`]. Dropping the
/// pointer closes it.
pub struct DataPointer {
    id: PointerId,
    path: Option<PathBuf>,
    codec: Option<Box<dyn RecordCodec>>,
    window: TimeWindow,
    filter: RecordFilter,
    file_type: FileType,
    data_kind: DataKind,
    /// First record of the next scan, read one call early
    pending: Option<BeamRecord>,
    index: Option<RecordIndex>,
}

impl DataPointer {
    /// Open a DMAP file.
    pub fn open<P: AsRef<Path>>(
        path: P,
        file_type: FileType,
        window: TimeWindow,
        filter: RecordFilter,
    ) -> Result<Self> {
        let path = path.as_ref();
        let codec = DmapCodec::open(path)?;
        let mut ptr = Self::with_codec(Box::new(codec), file_type, window, filter);
        ptr.path = Some(path.to_path_buf());
        debug!(
            context = "DataPointer",
            id = %ptr.id,
            path = %path.display(),
            file_type = %file_type,
            "Opened data pointer"
        );
        Ok(ptr)
    }

    /// Wrap an already open codec.
    pub fn with_codec(
        codec: Box<dyn RecordCodec>,
        file_type: FileType,
        window: TimeWindow,
        filter: RecordFilter,
    ) -> Self {
        Self {
            id: PointerId::next(),
            path: None,
            codec: Some(codec),
            window,
            filter,
            file_type,
            data_kind: DataKind::Dmap,
            pending: None,
            index: None,
        }
    }

    pub fn id(&self) -> PointerId {
        self.id
    }

    /// Path of the staged file, when opened from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Subtype of the records in the file.
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Encoding of the file.
    pub fn data_kind(&self) -> DataKind {
        self.data_kind
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn filter(&self) -> &RecordFilter {
        &self.filter
    }

    pub fn is_open(&self) -> bool {
        self.codec.is_some()
    }

    /// Index built by [`create_index`](Self::create_index), if any.
    pub fn index(&self) -> Option<&RecordIndex> {
        self.index.as_ref()
    }

    /// Offsets of every indexed record, once the index is built.
    pub fn record_index(&self) -> Option<&std::collections::BTreeMap<DateTime<Utc>, u64>> {
        self.index.as_ref().map(RecordIndex::records)
    }

    /// Offsets of indexed scan starts, once the index is built.
    pub fn scan_index(&self) -> Option<&std::collections::BTreeMap<DateTime<Utc>, u64>> {
        self.index.as_ref().map(RecordIndex::scan_starts)
    }

    fn codec(&mut self) -> Result<&mut Box<dyn RecordCodec>> {
        self.codec.as_mut().ok_or(DarnError::PointerClosed)
    }

    /// Read the next record in the window that matches the filter.
    ///
    /// Returns `Ok(None)` at end of file or at the first record past the
    /// end of the window.
    pub fn read_record(&mut self) -> Result<Option<BeamRecord>> {
        let file_type = self.file_type;
        let source = self.id;
        let codec = self.codec.as_mut().ok_or(DarnError::PointerClosed)?;

        loop {
            let offset = codec.offset()?;
            let Some(fields) = codec.decode_next()? else {
                trace!(context = "DataPointer", id = %source, "Reached end of file");
                return Ok(None);
            };
            let header = RecordHeader::from_fields(&fields)?;
            if self.window.is_past(header.time) {
                trace!(context = "DataPointer", id = %source, "Reached end of window");
                return Ok(None);
            }
            if !self.window.contains(header.time) || !self.filter.matches(&header) {
                continue;
            }
            return BeamRecord::hydrate(&fields, file_type, offset, source).map(Some);
        }
    }

    /// Read the next scan.
    ///
    /// The beam selector is suspended while the scan is collected, since
    /// a scan sweeps every beam. A scan starts with the record held over
    /// from the previous call (or the next record read) and runs until the
    /// next record that opens a scan; that record is held over for the
    /// following call. When the seed is a scan start read from the stream,
    /// the record right after it always joins the scan. An empty scan marks
    /// the end of the stream.
    pub fn read_scan(&mut self) -> Result<ScanData> {
        self.codec()?;
        let beam_filter = self.filter.bmnum.take();
        let scan = self.collect_scan();
        self.filter.bmnum = beam_filter;
        scan
    }

    fn collect_scan(&mut self) -> Result<ScanData> {
        let mut scan = ScanData::new();
        // A flagged seed read from the stream also takes the record after
        // it, flagged or not.
        let (seed, mut first) = match self.pending.take() {
            Some(beam) => (Some(beam), false),
            None => {
                let beam = self.read_record()?;
                let first = beam.as_ref().is_some_and(|b| b.is_scan_start());
                (beam, first)
            }
        };
        let Some(seed) = seed else {
            return Ok(scan);
        };
        scan.push(seed);

        while let Some(beam) = self.read_record()? {
            if beam.is_scan_start() && !first {
                self.pending = Some(beam);
                break;
            }
            first = false;
            scan.push(beam);
        }
        Ok(scan)
    }

    /// Build (or rebuild) the time index for the window.
    ///
    /// The cursor position is unchanged afterwards.
    pub fn create_index(&mut self) -> Result<&RecordIndex> {
        let codec = self.codec.as_mut().ok_or(DarnError::PointerClosed)?;
        let index = RecordIndex::build(codec.as_mut(), &self.window)?;
        Ok(self.index.insert(index))
    }

    /// Move the cursor to a byte offset.
    ///
    /// Any record held over for the next scan is discarded.
    pub fn offset_seek(&mut self, offset: u64) -> Result<u64> {
        let pos = self.codec()?.seek(offset)?;
        self.pending = None;
        Ok(pos)
    }

    /// Current byte offset of the cursor.
    pub fn offset_tell(&mut self) -> Result<u64> {
        self.codec()?.offset()
    }

    /// Move the cursor back to the start of the file.
    pub fn rewind(&mut self) -> Result<()> {
        self.offset_seek(0).map(|_| ())
    }

    /// Position the cursor at the first indexed record at or after `time`.
    ///
    /// Builds the index on first use. Returns `false`, leaving the cursor
    /// alone, when no such record exists.
    pub fn seek_time(&mut self, time: DateTime<Utc>) -> Result<bool> {
        if self.index.is_none() {
            self.create_index()?;
        }
        let target = self
            .index
            .as_ref()
            .and_then(|index| index.record_at_or_after(time));
        match target {
            Some((_, offset)) => {
                self.offset_seek(offset)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Read every remaining record.
    pub fn read_all(&mut self) -> Result<Vec<BeamRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Release the file. Safe to call more than once.
    pub fn close(&mut self) {
        if self.codec.take().is_some() {
            debug!(context = "DataPointer", id = %self.id, "Closed data pointer");
        }
        self.pending = None;
    }
}

impl Iterator for DataPointer {
    type Item = Result<BeamRecord>;

    /// Yields records until the stream ends. A read error is yielded once
    /// and closes the pointer.
    fn next(&mut self) -> Option<Self::Item> {
        if !self.is_open() {
            return None;
        }
        match self.read_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.close();
                Some(Err(e))
            }
        }
    }
}

impl Drop for DataPointer {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for DataPointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataPointer")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("open", &self.is_open())
            .field("window", &self.window)
            .field("filter", &self.filter)
            .field("file_type", &self.file_type)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}
