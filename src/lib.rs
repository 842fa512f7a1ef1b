// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Darnio
//!
//! Acquisition, indexing and scan-grouped streaming of SuperDARN radar
//! record files.
//!
//! This library finds the files that hold a requested time window of radar
//! soundings, stages them locally and streams decoded records out of them:
//! - **Source resolution** in [`source`](crate::source): explicit path,
//!   staging cache, local archive tree, remote archive
//! - **Streaming** in [`io`](crate::io): a [`DataPointer`] over one staged
//!   file with filtered reads, scan grouping and a time index
//! - **Records** in [`record`](crate::record): [`BeamRecord`] hydration
//!   from flat decoded fields
//! - **DMAP codec** in [`dmap`](crate::dmap): the block format the files
//!   are stored in
//!
//! ## Example: Reading Scans
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use chrono::{TimeZone, Utc};
//! use darnio::{DataRequest, FileType, ResolverConfig};
//!
//! let request = DataRequest::builder()
//!     .start(Utc.with_ymd_and_hms(2012, 11, 1, 0, 0, 0).unwrap())
//!     .end(Utc.with_ymd_and_hms(2012, 11, 1, 2, 0, 0).unwrap())
//!     .station("fhe")
//!     .file_type(FileType::FitAcf)
//!     .build()?;
//!
//! if let Some(mut ptr) = darnio::open(&request, ResolverConfig::from_env()?)? {
//!     loop {
//!         let scan = ptr.read_scan()?;
//!         if scan.is_empty() {
//!             break;
//!         }
//!         println!("scan of {} beams starting {:?}", scan.len(), scan.start_time());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use core::{Channel, DarnError, DataKind, FieldMap, FieldValue, FileType, Result};

// DMAP block codec
pub mod dmap;

pub use dmap::{DmapCodec, DmapRecord, DmapWriter, RecordCodec};

// Structured records
pub mod record;

pub use record::{BeamRecord, Payload, PointerId, ScanData};

// Pointer, index and selectors
pub mod io;

pub use io::{DataPointer, RecordFilter, RecordIndex, TimeWindow};

// Source resolution
pub mod source;

pub use source::{DataRequest, Resolution, ResolverConfig, SourcePreference, SourceResolver};

/// Resolve a request with `config` and open a pointer on the result.
///
/// Returns `Ok(None)` when no data was found.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the staging area is
/// unusable or the resolved file cannot be opened.
pub fn open(request: &DataRequest, config: ResolverConfig) -> Result<Option<DataPointer>> {
    SourceResolver::new(config)?.open(request)
}
