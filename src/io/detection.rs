// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Compression and data-kind detection using magic numbers.
//!
//! Archive files may arrive bzip2- or gzip-compressed, with or without a
//! matching extension. Detection checks the file signature first and
//! falls back to the extension when the file cannot be read.
//!
//! # Example
//!
//! ```rust,no_run
//! use darnio::io::detection::{detect_compression, Compression};
//!
//! let compression = detect_compression("20121101.0001.00.fhe.fitacf.bz2")?;
//! assert_eq!(compression, Compression::Bzip2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::dmap::DMAP_CODE;
use crate::{DarnError, DataKind, Result};

const BZIP2_MAGIC: &[u8] = b"BZh";
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];

/// Compression wrapper of an archive file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Plain file
    None,
    /// bzip2 stream
    Bzip2,
    /// gzip stream
    Gzip,
}

impl Compression {
    /// Conventional filename extension, without the dot.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Compression::None => None,
            Compression::Bzip2 => Some("bz2"),
            Compression::Gzip => Some("gz"),
        }
    }
}

/// Detect the compression of a file from its signature, falling back to
/// the extension.
pub fn detect_compression<P: AsRef<Path>>(path: P) -> Result<Compression> {
    let path = path.as_ref();

    match read_header(path) {
        Ok(header) => {
            let detected = detect_from_magic(&header);
            if detected != Compression::None || header.len() >= BZIP2_MAGIC.len() {
                return Ok(detected);
            }
        }
        Err(_) => {
            // unreadable, fall back to the name
        }
    }

    Ok(detect_from_extension(path))
}

/// Check whether a file is compressed.
pub fn is_compressed<P: AsRef<Path>>(path: P) -> bool {
    !matches!(detect_compression(path), Ok(Compression::None))
}

/// Detect the data kind of an uncompressed file.
///
/// Returns `None` when the file does not start with a known record block.
pub fn detect_data_kind<P: AsRef<Path>>(path: P) -> Result<Option<DataKind>> {
    let header = read_header(path.as_ref())?;
    if header.len() >= 4 && header[..4] == DMAP_CODE.to_le_bytes() {
        return Ok(Some(DataKind::Dmap));
    }
    Ok(None)
}

fn read_header(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| {
        DarnError::io(
            "detection",
            format!("Failed to open {}: {e}", path.display()),
        )
    })?;
    let mut header = [0u8; 8];
    let mut filled = 0;
    while filled < header.len() {
        let n = file.read(&mut header[filled..]).map_err(|e| {
            DarnError::io(
                "detection",
                format!("Failed to read header of {}: {e}", path.display()),
            )
        })?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(header[..filled].to_vec())
}

fn detect_from_magic(header: &[u8]) -> Compression {
    if header.starts_with(BZIP2_MAGIC) {
        Compression::Bzip2
    } else if header.starts_with(GZIP_MAGIC) {
        Compression::Gzip
    } else {
        Compression::None
    }
}

fn detect_from_extension(path: &Path) -> Compression {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| match ext.to_lowercase().as_str() {
            "bz2" => Compression::Bzip2,
            "gz" => Compression::Gzip,
            _ => Compression::None,
        })
        .unwrap_or(Compression::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_temp_file(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(data).unwrap();
        path
    }

    #[test]
    fn test_magic_wins_over_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_temp_file(&dir, "a.fitacf", b"BZh91AY&SY");
        assert_eq!(detect_compression(&path).unwrap(), Compression::Bzip2);

        let path = create_temp_file(&dir, "b.fitacf.bz2", &[0x1f, 0x8b, 8, 0]);
        assert_eq!(detect_compression(&path).unwrap(), Compression::Gzip);
    }

    #[test]
    fn test_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_temp_file(&dir, "c.fitacf", &DMAP_CODE.to_le_bytes());
        assert_eq!(detect_compression(&path).unwrap(), Compression::None);
        assert!(!is_compressed(&path));
        assert_eq!(detect_data_kind(&path).unwrap(), Some(DataKind::Dmap));
    }

    #[test]
    fn test_extension_fallback_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.rawacf.gz");
        assert_eq!(detect_compression(&missing).unwrap(), Compression::Gzip);
    }

    #[test]
    fn test_unknown_data_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_temp_file(&dir, "d.txt", b"hello world");
        assert_eq!(detect_data_kind(&path).unwrap(), None);
    }

    #[test]
    fn test_extensions() {
        assert_eq!(Compression::Bzip2.extension(), Some("bz2"));
        assert_eq!(Compression::None.extension(), None);
    }
}
