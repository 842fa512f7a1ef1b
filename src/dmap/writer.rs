// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! DMAP block writer.
//!
//! Encodes [`DmapRecord`]s into the block layout read by
//! [`DmapCodec`](super::DmapCodec). Field order is preserved exactly as
//! added.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use super::{BLOCK_HEADER_SIZE, DMAP_CODE};
use crate::core::value::{ArrayValue, ValueKind};
use crate::{DarnError, FieldValue, Result};

/// One record to be encoded: ordered scalars followed by ordered arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DmapRecord {
    scalars: Vec<(String, FieldValue)>,
    arrays: Vec<(String, ArrayValue)>,
}

impl DmapRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scalar field.
    pub fn scalar(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.scalars.push((name.into(), value));
        self
    }

    /// Append an array field with explicit extents.
    pub fn array_with_dims(
        mut self,
        name: impl Into<String>,
        kind: ValueKind,
        dims: Vec<u32>,
        values: Vec<FieldValue>,
    ) -> Self {
        self.arrays
            .push((name.into(), ArrayValue::with_dims(kind, dims, values)));
        self
    }

    /// Append a one-dimensional `short` array.
    pub fn array_i16(self, name: impl Into<String>, values: &[i16]) -> Self {
        let values = values.iter().map(|v| FieldValue::Short(*v)).collect();
        self.array_1d(name, ValueKind::Short, values)
    }

    /// Append a one-dimensional `int` array.
    pub fn array_i32(self, name: impl Into<String>, values: &[i32]) -> Self {
        let values = values.iter().map(|v| FieldValue::Int(*v)).collect();
        self.array_1d(name, ValueKind::Int, values)
    }

    /// Append a one-dimensional `float` array.
    pub fn array_f32(self, name: impl Into<String>, values: &[f32]) -> Self {
        let values = values.iter().map(|v| FieldValue::Float(*v)).collect();
        self.array_1d(name, ValueKind::Float, values)
    }

    fn array_1d(self, name: impl Into<String>, kind: ValueKind, values: Vec<FieldValue>) -> Self {
        let dims = vec![values.len() as u32];
        self.array_with_dims(name, kind, dims, values)
    }

    /// Encode this record as a complete block.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        body.write_i32::<LittleEndian>(self.scalars.len() as i32)?;
        body.write_i32::<LittleEndian>(self.arrays.len() as i32)?;

        for (name, value) in &self.scalars {
            if value.is_array() {
                return Err(DarnError::io(
                    "DmapRecord::encode",
                    format!("scalar '{name}' holds an array"),
                ));
            }
            write_cstring(&mut body, name)?;
            body.write_u8(value.kind().code())?;
            write_value(&mut body, name, value.kind(), value)?;
        }

        for (name, array) in &self.arrays {
            let expected: usize = array.dims.iter().map(|d| *d as usize).product();
            if expected != array.values.len() {
                return Err(DarnError::io(
                    "DmapRecord::encode",
                    format!(
                        "array '{name}' declares {expected} elements but holds {}",
                        array.values.len()
                    ),
                ));
            }
            write_cstring(&mut body, name)?;
            body.write_u8(array.kind.code())?;
            body.write_i32::<LittleEndian>(array.dims.len() as i32)?;
            for extent in &array.dims {
                body.write_i32::<LittleEndian>(*extent as i32)?;
            }
            for value in &array.values {
                write_value(&mut body, name, array.kind, value)?;
            }
        }

        // body already carries the two count words of the header
        let size = BLOCK_HEADER_SIZE - 8 + body.len();
        let mut block = Vec::with_capacity(size);
        block.write_i32::<LittleEndian>(DMAP_CODE)?;
        block.write_i32::<LittleEndian>(size as i32)?;
        block.extend_from_slice(&body);
        Ok(block)
    }
}

/// Sequential DMAP block writer.
pub struct DmapWriter<W: Write> {
    writer: W,
    records: u64,
    bytes: u64,
}

impl<W: Write> DmapWriter<W> {
    /// Create a writer over any byte sink.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            records: 0,
            bytes: 0,
        }
    }

    /// Encode and write one record, returning the byte offset it starts at.
    pub fn write(&mut self, record: &DmapRecord) -> Result<u64> {
        let block = record.encode()?;
        let offset = self.bytes;
        self.writer
            .write_all(&block)
            .map_err(|e| DarnError::io("DmapWriter::write", e.to_string()))?;
        self.records += 1;
        self.bytes += block.len() as u64;
        Ok(offset)
    }

    /// Number of records written so far.
    pub fn record_count(&self) -> u64 {
        self.records
    }

    /// Flush and return the underlying sink.
    pub fn finish(mut self) -> Result<W> {
        self.writer
            .flush()
            .map_err(|e| DarnError::io("DmapWriter::finish", e.to_string()))?;
        Ok(self.writer)
    }
}

fn write_cstring(out: &mut Vec<u8>, s: &str) -> Result<()> {
    if s.as_bytes().contains(&0) {
        return Err(DarnError::io(
            "DmapRecord::encode",
            format!("name or string '{s}' contains NUL"),
        ));
    }
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    Ok(())
}

fn write_value(out: &mut Vec<u8>, name: &str, kind: ValueKind, value: &FieldValue) -> Result<()> {
    match (kind, value) {
        (ValueKind::Char, FieldValue::Char(v)) => out.write_i8(*v)?,
        (ValueKind::Short, FieldValue::Short(v)) => out.write_i16::<LittleEndian>(*v)?,
        (ValueKind::Int, FieldValue::Int(v)) => out.write_i32::<LittleEndian>(*v)?,
        (ValueKind::Float, FieldValue::Float(v)) => out.write_f32::<LittleEndian>(*v)?,
        (ValueKind::Double, FieldValue::Double(v)) => out.write_f64::<LittleEndian>(*v)?,
        (ValueKind::String, FieldValue::String(v)) => write_cstring(out, v)?,
        (ValueKind::Long, FieldValue::Long(v)) => out.write_i64::<LittleEndian>(*v)?,
        (ValueKind::UChar, FieldValue::UChar(v)) => out.write_u8(*v)?,
        (ValueKind::UShort, FieldValue::UShort(v)) => out.write_u16::<LittleEndian>(*v)?,
        (ValueKind::UInt, FieldValue::UInt(v)) => out.write_u32::<LittleEndian>(*v)?,
        (ValueKind::ULong, FieldValue::ULong(v)) => out.write_u64::<LittleEndian>(*v)?,
        (kind, other) => {
            return Err(DarnError::io(
                "DmapRecord::encode",
                format!(
                    "field '{name}' declared {kind} but holds {}",
                    other.type_name()
                ),
            ))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_header() {
        let block = DmapRecord::new()
            .scalar("bmnum", FieldValue::Short(7))
            .encode()
            .unwrap();
        assert_eq!(&block[0..4], &DMAP_CODE.to_le_bytes());
        assert_eq!(&block[4..8], &(block.len() as i32).to_le_bytes());
        assert_eq!(&block[8..12], &1i32.to_le_bytes());
        assert_eq!(&block[12..16], &0i32.to_le_bytes());
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let record = DmapRecord::new().array_with_dims(
            "pwr0",
            ValueKind::Float,
            vec![1],
            vec![FieldValue::Double(1.0)],
        );
        assert!(record.encode().is_err());
    }

    #[test]
    fn test_extent_mismatch_rejected() {
        let record = DmapRecord::new().array_with_dims(
            "acfd",
            ValueKind::Float,
            vec![2, 3],
            vec![FieldValue::Float(0.0); 5],
        );
        assert!(record.encode().is_err());
    }

    #[test]
    fn test_writer_offsets() {
        let record = DmapRecord::new().scalar("time", FieldValue::Double(0.0));
        let len = record.encode().unwrap().len() as u64;
        let mut writer = DmapWriter::new(Vec::new());
        assert_eq!(writer.write(&record).unwrap(), 0);
        assert_eq!(writer.write(&record).unwrap(), len);
        assert_eq!(writer.record_count(), 2);
        assert_eq!(writer.finish().unwrap().len() as u64, 2 * len);
    }
}
