// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! DMAP record codec.
//!
//! DMAP is the self-describing block format radar record files are stored
//! in. Each block holds one sounding as a list of named scalars followed by
//! a list of named, possibly multi-dimensional arrays.
//!
//! # Block Structure
//!
//! All integers are little-endian.
//!
//! ```text
//! code: i32 (0x00010001) | size: i32 (whole block) | scalars: i32 | arrays: i32
//! scalar := name\0 type:u8 value
//! array  := name\0 type:u8 dims:i32 extent:i32 * dims value * product(extents)
//! ```
//!
//! [`RecordCodec`] is the seam the rest of the crate reads through; it only
//! needs positioning and "decode the next block" primitives.

pub mod reader;
pub mod writer;

pub use reader::DmapCodec;
pub use writer::{DmapRecord, DmapWriter};

use crate::{FieldMap, Result};

/// Block code identifying a DMAP record.
pub const DMAP_CODE: i32 = 0x0001_0001;

/// Size of the fixed block header (code, size, scalar count, array count).
pub const BLOCK_HEADER_SIZE: usize = 16;

/// Decoder for a sequential binary record stream with byte-offset access.
///
/// Implementations own the underlying handle; dropping the codec releases
/// it.
pub trait RecordCodec {
    /// Current byte offset of the cursor.
    fn offset(&mut self) -> Result<u64>;

    /// Move the cursor to `offset`, returning the new offset.
    fn seek(&mut self, offset: u64) -> Result<u64>;

    /// Decode the record at the cursor and advance past it.
    ///
    /// Returns `Ok(None)` at end of stream.
    fn decode_next(&mut self) -> Result<Option<FieldMap>>;
}

impl<C: RecordCodec + ?Sized> RecordCodec for Box<C> {
    fn offset(&mut self) -> Result<u64> {
        (**self).offset()
    }

    fn seek(&mut self, offset: u64) -> Result<u64> {
        (**self).seek(offset)
    }

    fn decode_next(&mut self) -> Result<Option<FieldMap>> {
        (**self).decode_next()
    }
}
