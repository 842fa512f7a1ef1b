// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Field value type system.
//!
//! Provides the flat value representation a record codec produces for one
//! decoded record: a mapping from field name to a scalar or an array.
//! Arrays are stored flattened in file order together with their declared
//! extents, so consumers can reshape them as needed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Type alias for a decoded record as field name -> value mapping.
pub type FieldMap = HashMap<String, FieldValue>;

/// Element type of a field, matching the DMAP type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// 8-bit signed integer
    Char,
    /// 16-bit signed integer
    Short,
    /// 32-bit signed integer
    Int,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// NUL-terminated string
    String,
    /// 64-bit signed integer
    Long,
    /// 8-bit unsigned integer
    UChar,
    /// 16-bit unsigned integer
    UShort,
    /// 32-bit unsigned integer
    UInt,
    /// 64-bit unsigned integer
    ULong,
}

impl ValueKind {
    /// Type code used on disk.
    pub const fn code(self) -> u8 {
        match self {
            ValueKind::Char => 1,
            ValueKind::Short => 2,
            ValueKind::Int => 3,
            ValueKind::Float => 4,
            ValueKind::Double => 8,
            ValueKind::String => 9,
            ValueKind::Long => 10,
            ValueKind::UChar => 16,
            ValueKind::UShort => 17,
            ValueKind::UInt => 18,
            ValueKind::ULong => 19,
        }
    }

    /// Parse an on-disk type code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ValueKind::Char),
            2 => Some(ValueKind::Short),
            3 => Some(ValueKind::Int),
            4 => Some(ValueKind::Float),
            8 => Some(ValueKind::Double),
            9 => Some(ValueKind::String),
            10 => Some(ValueKind::Long),
            16 => Some(ValueKind::UChar),
            17 => Some(ValueKind::UShort),
            18 => Some(ValueKind::UInt),
            19 => Some(ValueKind::ULong),
            _ => None,
        }
    }

    /// Size in bytes of one element, if fixed.
    pub const fn size(self) -> Option<usize> {
        match self {
            ValueKind::Char | ValueKind::UChar => Some(1),
            ValueKind::Short | ValueKind::UShort => Some(2),
            ValueKind::Int | ValueKind::UInt | ValueKind::Float => Some(4),
            ValueKind::Double | ValueKind::Long | ValueKind::ULong => Some(8),
            ValueKind::String => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Char => "char",
            ValueKind::Short => "short",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Long => "long",
            ValueKind::UChar => "uchar",
            ValueKind::UShort => "ushort",
            ValueKind::UInt => "uint",
            ValueKind::ULong => "ulong",
        };
        f.write_str(name)
    }
}

/// A flattened multi-dimensional array field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    /// Element type
    pub kind: ValueKind,
    /// Declared extents, as stored in the file
    pub dims: Vec<u32>,
    /// Elements in file order
    pub values: Vec<FieldValue>,
}

impl ArrayValue {
    /// Create a one-dimensional array.
    pub fn new(kind: ValueKind, values: Vec<FieldValue>) -> Self {
        Self {
            kind,
            dims: vec![values.len() as u32],
            values,
        }
    }

    /// Create an array with explicit extents.
    pub fn with_dims(kind: ValueKind, dims: Vec<u32>, values: Vec<FieldValue>) -> Self {
        Self { kind, dims, values }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Value of one decoded field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Char(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    UChar(u8),
    UShort(u16),
    UInt(u32),
    ULong(u64),
    Float(f32),
    Double(f64),
    String(String),
    Array(ArrayValue),
}

impl FieldValue {
    /// Element kind of this value (for arrays, the element kind).
    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Char(_) => ValueKind::Char,
            FieldValue::Short(_) => ValueKind::Short,
            FieldValue::Int(_) => ValueKind::Int,
            FieldValue::Long(_) => ValueKind::Long,
            FieldValue::UChar(_) => ValueKind::UChar,
            FieldValue::UShort(_) => ValueKind::UShort,
            FieldValue::UInt(_) => ValueKind::UInt,
            FieldValue::ULong(_) => ValueKind::ULong,
            FieldValue::Float(_) => ValueKind::Float,
            FieldValue::Double(_) => ValueKind::Double,
            FieldValue::String(_) => ValueKind::String,
            FieldValue::Array(a) => a.kind,
        }
    }

    /// Check if this value is a numeric scalar.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, FieldValue::String(_) | FieldValue::Array(_))
    }

    /// Check if this value is an integer scalar.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldValue::Char(_)
                | FieldValue::Short(_)
                | FieldValue::Int(_)
                | FieldValue::Long(_)
                | FieldValue::UChar(_)
                | FieldValue::UShort(_)
                | FieldValue::UInt(_)
                | FieldValue::ULong(_)
        )
    }

    /// Check if this value is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, FieldValue::Array(_))
    }

    /// Try to convert this value to f64 (numeric scalars only).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Char(v) => Some(*v as f64),
            FieldValue::Short(v) => Some(*v as f64),
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Long(v) => Some(*v as f64),
            FieldValue::UChar(v) => Some(*v as f64),
            FieldValue::UShort(v) => Some(*v as f64),
            FieldValue::UInt(v) => Some(*v as f64),
            FieldValue::ULong(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v as f64),
            FieldValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to convert this value to i64 (integer scalars only).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Char(v) => Some(*v as i64),
            FieldValue::Short(v) => Some(*v as i64),
            FieldValue::Int(v) => Some(*v as i64),
            FieldValue::Long(v) => Some(*v),
            FieldValue::UChar(v) => Some(*v as i64),
            FieldValue::UShort(v) => Some(*v as i64),
            FieldValue::UInt(v) => Some(*v as i64),
            FieldValue::ULong(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to convert this value to i32 (integer scalars that fit).
    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().and_then(|v| i32::try_from(v).ok())
    }

    /// Try to get the inner string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the inner array.
    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            FieldValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Convert a numeric array to a flat `Vec<f64>`.
    ///
    /// Returns `None` for scalars, string arrays, or arrays holding
    /// non-numeric elements.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        self.as_array()?.values.iter().map(|v| v.as_f64()).collect()
    }

    /// Convert an integer array to a flat `Vec<i32>`.
    pub fn to_i32_vec(&self) -> Option<Vec<i32>> {
        self.as_array()?.values.iter().map(|v| v.as_i32()).collect()
    }

    /// Get the type name of this value as a string.
    pub fn type_name(&self) -> String {
        match self {
            FieldValue::Array(a) => format!("{}[]", a.kind),
            other => other.kind().to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Char(v) => write!(f, "{v}"),
            FieldValue::Short(v) => write!(f, "{v}"),
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Long(v) => write!(f, "{v}"),
            FieldValue::UChar(v) => write!(f, "{v}"),
            FieldValue::UShort(v) => write!(f, "{v}"),
            FieldValue::UInt(v) => write!(f, "{v}"),
            FieldValue::ULong(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Double(v) => write!(f, "{v}"),
            FieldValue::String(v) => write!(f, "\"{v}\""),
            FieldValue::Array(a) => write!(f, "[{} x {}]", a.len(), a.kind),
        }
    }
}
