// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! DMAP block reader.
//!
//! `DmapCodec` reads one block per call from any `Read + Seek` source. The
//! whole block is read into memory first, so the cursor always lands on the
//! next block boundary no matter how much of the body was understood.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use chrono::NaiveDate;
use tracing::warn;

use super::{RecordCodec, BLOCK_HEADER_SIZE, DMAP_CODE};
use crate::core::value::{ArrayValue, ValueKind};
use crate::{DarnError, FieldMap, FieldValue, Result};

/// Upper bound on a single block, guarding against corrupt size fields.
const MAX_BLOCK_SIZE: usize = 256 * 1024 * 1024;

/// DMAP implementation of [`RecordCodec`].
pub struct DmapCodec<R> {
    reader: R,
}

impl DmapCodec<BufReader<File>> {
    /// Open a DMAP file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            DarnError::io(
                "DmapCodec::open",
                format!("Failed to open {}: {e}", path.display()),
            )
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read + Seek> DmapCodec<R> {
    /// Wrap a reader positioned at a block boundary.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Consume the codec, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read up to `buf.len()` bytes, stopping early only at EOF.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DarnError::io("DmapCodec::read", e.to_string())),
            }
        }
        Ok(filled)
    }

    /// Read the raw bytes of the next block (header included).
    fn read_block(&mut self, start: u64) -> Result<Option<Vec<u8>>> {
        let mut prefix = [0u8; 8];
        let n = self.fill(&mut prefix)?;
        if n == 0 {
            return Ok(None);
        }
        if n < prefix.len() {
            warn!(
                context = "DmapCodec",
                offset = start,
                "Truncated block header at end of file, treating as end of stream"
            );
            return Ok(None);
        }

        let mut header = Cursor::new(&prefix[..]);
        let code = header.read_i32::<LittleEndian>()?;
        let size = header.read_i32::<LittleEndian>()?;

        if code != DMAP_CODE {
            return Err(DarnError::decode(
                start,
                format!("Invalid block code 0x{code:08x}"),
            ));
        }
        if size < BLOCK_HEADER_SIZE as i32 || size as usize > MAX_BLOCK_SIZE {
            return Err(DarnError::decode(start, format!("Invalid block size {size}")));
        }

        let mut block = vec![0u8; size as usize];
        block[..8].copy_from_slice(&prefix);
        let n = self.fill(&mut block[8..])?;
        if n < block.len() - 8 {
            warn!(
                context = "DmapCodec",
                offset = start,
                expected = size,
                found = n + 8,
                "Truncated block at end of file, treating as end of stream"
            );
            return Ok(None);
        }
        Ok(Some(block))
    }
}

impl<R: Read + Seek> RecordCodec for DmapCodec<R> {
    fn offset(&mut self) -> Result<u64> {
        self.reader
            .stream_position()
            .map_err(|e| DarnError::io("DmapCodec::offset", e.to_string()))
    }

    fn seek(&mut self, offset: u64) -> Result<u64> {
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| DarnError::io("DmapCodec::seek", e.to_string()))
    }

    fn decode_next(&mut self) -> Result<Option<FieldMap>> {
        let start = self.offset()?;
        let Some(block) = self.read_block(start)? else {
            return Ok(None);
        };

        let mut fields = parse_block_body(&block[8..])
            .map_err(|e| DarnError::decode(start, e.to_string()))?;
        synthesize_time(&mut fields);
        Ok(Some(fields))
    }
}

/// Parse the scalar and array sections of a block.
fn parse_block_body(body: &[u8]) -> std::io::Result<FieldMap> {
    let mut cursor = Cursor::new(body);
    let scalar_count = read_count(&mut cursor, "scalar count")?;
    let array_count = read_count(&mut cursor, "array count")?;

    let mut fields = FieldMap::with_capacity(scalar_count + array_count);

    for _ in 0..scalar_count {
        let name = read_cstring(&mut cursor)?;
        let kind = read_kind(&mut cursor, &name)?;
        let value = read_value(&mut cursor, kind)?;
        fields.insert(name, value);
    }

    for _ in 0..array_count {
        let name = read_cstring(&mut cursor)?;
        let kind = read_kind(&mut cursor, &name)?;
        let dim_count = read_count(&mut cursor, "array dimension count")?;

        let mut dims = Vec::with_capacity(dim_count);
        let mut total: usize = 1;
        for _ in 0..dim_count {
            let extent = read_count(&mut cursor, "array extent")?;
            total = total.checked_mul(extent).ok_or_else(|| {
                invalid_data(format!("array '{name}' element count overflows"))
            })?;
            dims.push(extent as u32);
        }

        let remaining = body.len() - cursor.position() as usize;
        if let Some(elem) = kind.size() {
            if total.saturating_mul(elem) > remaining {
                return Err(invalid_data(format!(
                    "array '{name}' needs {total} elements but only {remaining} bytes remain"
                )));
            }
        }

        let mut values = Vec::with_capacity(total.min(remaining));
        for _ in 0..total {
            values.push(read_value(&mut cursor, kind)?);
        }
        fields.insert(name, FieldValue::Array(ArrayValue::with_dims(kind, dims, values)));
    }

    Ok(fields)
}

fn invalid_data(message: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, message)
}

fn read_count(cursor: &mut Cursor<&[u8]>, what: &str) -> std::io::Result<usize> {
    let value = cursor.read_i32::<LittleEndian>()?;
    usize::try_from(value).map_err(|_| invalid_data(format!("negative {what}: {value}")))
}

fn read_kind(cursor: &mut Cursor<&[u8]>, name: &str) -> std::io::Result<ValueKind> {
    let code = cursor.read_u8()?;
    ValueKind::from_code(code)
        .ok_or_else(|| invalid_data(format!("field '{name}' has unknown type code {code}")))
}

fn read_cstring(cursor: &mut Cursor<&[u8]>) -> std::io::Result<String> {
    let mut bytes = Vec::new();
    loop {
        match cursor.read_u8()? {
            0 => break,
            b => bytes.push(b),
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_value(cursor: &mut Cursor<&[u8]>, kind: ValueKind) -> std::io::Result<FieldValue> {
    Ok(match kind {
        ValueKind::Char => FieldValue::Char(cursor.read_i8()?),
        ValueKind::Short => FieldValue::Short(cursor.read_i16::<LittleEndian>()?),
        ValueKind::Int => FieldValue::Int(cursor.read_i32::<LittleEndian>()?),
        ValueKind::Float => FieldValue::Float(cursor.read_f32::<LittleEndian>()?),
        ValueKind::Double => FieldValue::Double(cursor.read_f64::<LittleEndian>()?),
        ValueKind::String => FieldValue::String(read_cstring(cursor)?),
        ValueKind::Long => FieldValue::Long(cursor.read_i64::<LittleEndian>()?),
        ValueKind::UChar => FieldValue::UChar(cursor.read_u8()?),
        ValueKind::UShort => FieldValue::UShort(cursor.read_u16::<LittleEndian>()?),
        ValueKind::UInt => FieldValue::UInt(cursor.read_u32::<LittleEndian>()?),
        ValueKind::ULong => FieldValue::ULong(cursor.read_u64::<LittleEndian>()?),
    })
}

/// Insert an epoch-seconds `time` field built from the broken-down
/// `time.*` scalars when the block does not carry one.
fn synthesize_time(fields: &mut FieldMap) {
    if fields.contains_key("time") {
        return;
    }
    let part = |key: &str| fields.get(key).and_then(FieldValue::as_i64);
    let (Some(yr), Some(mo), Some(dy), Some(hr), Some(mt), Some(sc)) = (
        part("time.yr"),
        part("time.mo"),
        part("time.dy"),
        part("time.hr"),
        part("time.mt"),
        part("time.sc"),
    ) else {
        return;
    };
    let us = part("time.us").unwrap_or(0);

    let instant = NaiveDate::from_ymd_opt(yr as i32, mo as u32, dy as u32)
        .and_then(|d| d.and_hms_opt(hr as u32, mt as u32, sc as u32));
    if let Some(instant) = instant {
        let secs = instant.and_utc().timestamp() as f64 + us as f64 / 1e6;
        fields.insert("time".to_string(), FieldValue::Double(secs));
    }
}
