// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for darnio.
//!
//! Covers the failure classes of the acquisition and decoding pipeline:
//! - Request validation
//! - Record decoding and hydration
//! - Transport, decompression and filter process failures
//! - Configuration loading
//!
//! "No data found" and "end of stream" are not errors: both are
//! ordinary results (`Ok(None)` / empty scans), never errors.

use thiserror::Error;

/// Errors that can occur while resolving, staging or decoding radar data.
#[derive(Debug, Clone, Error)]
pub enum DarnError {
    /// A request parameter failed validation
    #[error("Invalid request field '{field}': {reason}")]
    InvalidRequest {
        /// Offending field
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// File subtype name not recognized
    #[error("Unknown file type: '{name}'")]
    UnknownFileType {
        /// Name that failed to parse
        name: String,
    },

    /// Filesystem I/O failure
    #[error("I/O error in {context}: {message}")]
    Io {
        /// Operation that failed
        context: String,
        /// Error message
        message: String,
    },

    /// Malformed record in the binary stream
    #[error("Decode error at offset {offset}: {message}")]
    Decode {
        /// Byte offset of the record being decoded
        offset: u64,
        /// Error message
        message: String,
    },

    /// A composite field could not be reshaped from the flat record
    #[error("Failed to hydrate field '{field}': {reason}")]
    Hydration {
        /// Field being hydrated
        field: String,
        /// Why it failed
        reason: String,
    },

    /// Remote archive session or transfer failure
    #[error("Transport error ({host}): {message}")]
    Transport {
        /// Archive host
        host: String,
        /// Error message
        message: String,
    },

    /// Decompression of a staged file failed
    #[error("Failed to decompress '{path}': {message}")]
    Decompress {
        /// Source path
        path: String,
        /// Error message
        message: String,
    },

    /// Quality-filter process failure
    #[error("Filter error: {message}")]
    Filter {
        /// Error message
        message: String,
    },

    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Read attempted on a pointer with no open file
    #[error("No data: pointer is closed")]
    PointerClosed,
}

impl DarnError {
    /// Create an invalid request error.
    pub fn invalid_request(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DarnError::InvalidRequest {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown file type error.
    pub fn unknown_file_type(name: impl Into<String>) -> Self {
        DarnError::UnknownFileType { name: name.into() }
    }

    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, message: impl Into<String>) -> Self {
        DarnError::Io {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(offset: u64, message: impl Into<String>) -> Self {
        DarnError::Decode {
            offset,
            message: message.into(),
        }
    }

    /// Create a hydration error.
    pub fn hydration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DarnError::Hydration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(host: impl Into<String>, message: impl Into<String>) -> Self {
        DarnError::Transport {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create a decompression error.
    pub fn decompress(path: impl Into<String>, message: impl Into<String>) -> Self {
        DarnError::Decompress {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a filter error.
    pub fn filter(message: impl Into<String>) -> Self {
        DarnError::Filter {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        DarnError::Config {
            message: message.into(),
        }
    }

    /// Whether the error belongs to the soft-failure class that resolution
    /// tiers log and skip past.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            DarnError::Transport { .. }
                | DarnError::Decompress { .. }
                | DarnError::Filter { .. }
                | DarnError::Io { .. }
        )
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            DarnError::InvalidRequest { field, reason } => {
                vec![("field", field.clone()), ("reason", reason.clone())]
            }
            DarnError::UnknownFileType { name } => vec![("name", name.clone())],
            DarnError::Io { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
            DarnError::Decode { offset, message } => {
                vec![("offset", offset.to_string()), ("message", message.clone())]
            }
            DarnError::Hydration { field, reason } => {
                vec![("field", field.clone()), ("reason", reason.clone())]
            }
            DarnError::Transport { host, message } => {
                vec![("host", host.clone()), ("message", message.clone())]
            }
            DarnError::Decompress { path, message } => {
                vec![("path", path.clone()), ("message", message.clone())]
            }
            DarnError::Filter { message } | DarnError::Config { message } => {
                vec![("message", message.clone())]
            }
            DarnError::PointerClosed => Vec::new(),
        }
    }
}

impl From<std::io::Error> for DarnError {
    fn from(err: std::io::Error) -> Self {
        DarnError::Io {
            context: "io".to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for darnio operations.
pub type Result<T> = std::result::Result<T, DarnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_error() {
        let err = DarnError::invalid_request("channel", "must be a single letter");
        assert!(matches!(err, DarnError::InvalidRequest { .. }));
        assert_eq!(
            err.to_string(),
            "Invalid request field 'channel': must be a single letter"
        );
    }

    #[test]
    fn test_decode_error() {
        let err = DarnError::decode(128, "bad block code");
        assert_eq!(err.to_string(), "Decode error at offset 128: bad block code");
    }

    #[test]
    fn test_hydration_error() {
        let err = DarnError::hydration("acfd", "too short");
        assert_eq!(err.to_string(), "Failed to hydrate field 'acfd': too short");
    }

    #[test]
    fn test_pointer_closed() {
        assert_eq!(
            DarnError::PointerClosed.to_string(),
            "No data: pointer is closed"
        );
        assert!(DarnError::PointerClosed.log_fields().is_empty());
    }

    #[test]
    fn test_soft_classification() {
        assert!(DarnError::transport("host", "refused").is_soft());
        assert!(DarnError::decompress("a.bz2", "corrupt").is_soft());
        assert!(DarnError::filter("exit 1").is_soft());
        assert!(!DarnError::decode(0, "x").is_soft());
        assert!(!DarnError::hydration("acfd", "x").is_soft());
    }

    #[test]
    fn test_log_fields_decode() {
        let err = DarnError::decode(42, "truncated");
        let fields = err.log_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0], ("offset", "42".to_string()));
        assert_eq!(fields[1], ("message", "truncated".to_string()));
    }

    #[test]
    fn test_log_fields_transport() {
        let err = DarnError::transport("sd-data.example", "timeout");
        let fields = err.log_fields();
        assert_eq!(fields[0].0, "host");
        assert_eq!(fields[0].1, "sd-data.example");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DarnError = io_err.into();
        assert!(matches!(err, DarnError::Io { .. }));
        assert_eq!(err.to_string(), "I/O error in io: file not found");
    }

    #[test]
    fn test_error_clone() {
        let err1 = DarnError::config("bad template");
        let err2 = err1.clone();
        assert_eq!(err1.to_string(), err2.to_string());
    }
}
