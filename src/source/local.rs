// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Local archive tier.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::config::{DirTemplate, LocalArchiveConfig};
use super::staging::{archive_hours, stage_file, ArchiveName, StagedParts};
use crate::{Channel, DarnError, FileType, Result};

/// Archive tree on a locally mounted filesystem.
#[derive(Debug, Clone)]
pub struct LocalArchive {
    root: PathBuf,
    template: DirTemplate,
}

impl LocalArchive {
    pub fn new(root: impl Into<PathBuf>, template: DirTemplate) -> Self {
        Self {
            root: root.into(),
            template,
        }
    }

    pub fn from_config(config: &LocalArchiveConfig) -> Result<Self> {
        Ok(Self::new(&config.root, config.dir_template.parse()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one day of one subtype for a station.
    pub fn day_dir(&self, day: DateTime<Utc>, file_type: FileType, radar: &str) -> PathBuf {
        self.template.render(&self.root, day, file_type, radar)
    }

    /// Stage every archive file of `file_type` for the hours covering
    /// `[search_start, end]`.
    ///
    /// Missing directories are skipped. A file that fails to decompress
    /// is logged and skipped. Any other I/O failure discards what was
    /// staged and is returned.
    pub fn collect(
        &self,
        radar: &str,
        channel: Option<Channel>,
        file_type: FileType,
        search_start: DateTime<Utc>,
        end: DateTime<Utc>,
        staging_dir: &Path,
    ) -> Result<StagedParts> {
        let mut parts = StagedParts::default();
        let mut listing: Option<(PathBuf, Vec<ArchiveFile>)> = None;

        for hour in archive_hours(search_start, end) {
            let dir = self.day_dir(hour, file_type, radar);
            if listing.as_ref().map_or(true, |(d, _)| *d != dir) {
                match list_archive_dir(&dir) {
                    Ok(files) => listing = Some((dir.clone(), files)),
                    Err(e) => {
                        parts.discard();
                        return Err(e);
                    }
                }
            }
            let Some((_, files)) = listing.as_ref() else {
                continue;
            };

            for file in files {
                if !file.name.in_hour(hour) || !file.name.matches(radar, file_type, channel) {
                    continue;
                }
                match stage_file(&file.path, staging_dir) {
                    Ok(staged) => parts.push(staged, file.name.start),
                    Err(e @ DarnError::Decompress { .. }) => {
                        warn!(
                            context = "LocalArchive",
                            path = %file.path.display(),
                            error = %e,
                            "Skipping unreadable archive file"
                        );
                    }
                    Err(e) => {
                        parts.discard();
                        return Err(e);
                    }
                }
            }
        }

        debug!(
            context = "LocalArchive",
            radar,
            file_type = %file_type,
            staged = parts.len(),
            "Local archive walk complete"
        );
        Ok(parts)
    }
}

#[derive(Debug, Clone)]
struct ArchiveFile {
    path: PathBuf,
    name: ArchiveName,
}

/// Archive files in `dir`, sorted by name. A missing directory is empty.
fn list_archive_dir(dir: &Path) -> Result<Vec<ArchiveFile>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(context = "LocalArchive", dir = %dir.display(), "No such archive directory");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(DarnError::io(
                "LocalArchive",
                format!("Failed to list {}: {e}", dir.display()),
            ))
        }
    };

    let mut files: Vec<ArchiveFile> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = ArchiveName::parse(entry.file_name().to_str()?)?;
            Some(ArchiveFile {
                path: entry.path(),
                name,
            })
        })
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs::File;
    use std::io::Write;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn archive(root: &Path) -> LocalArchive {
        LocalArchive::new(root, "{root}/{year}/{ftype}/{radar}".parse().unwrap())
    }

    #[test]
    fn test_day_dir_uses_template() {
        let local = LocalArchive::new(
            "/sd-data",
            "{root}/{year}/{month}/{day}/{radar}.{ftype}".parse().unwrap(),
        );
        assert_eq!(
            local.day_dir(utc(2012, 11, 1, 4, 0), FileType::FitEx, "fhe"),
            PathBuf::from("/sd-data/2012/11/01/fhe.fitex")
        );
    }

    #[test]
    fn test_collect_stages_matching_hours() {
        let root = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let dir = root.path().join("2012/fitacf/fhe");
        fs::create_dir_all(&dir).unwrap();
        for name in [
            "20121101.0001.00.fhe.fitacf",
            "20121101.0201.00.fhe.fitacf",
            "20121101.0401.00.fhe.fitacf",
            "20121101.0201.00.kod.fitacf",
            "20121101.0201.00.fhe.fitex",
        ] {
            File::create(dir.join(name))
                .unwrap()
                .write_all(name.as_bytes())
                .unwrap();
        }

        let parts = archive(root.path())
            .collect(
                "fhe",
                None,
                FileType::FitAcf,
                utc(2012, 11, 1, 1, 56),
                utc(2012, 11, 1, 3, 0),
                staging.path(),
            )
            .unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts.earliest, Some(utc(2012, 11, 1, 0, 1)));
        assert!(parts.paths[0].ends_with("20121101.0001.00.fhe.fitacf"));
        assert!(parts.paths[1].ends_with("20121101.0201.00.fhe.fitacf"));
        assert!(parts.paths.iter().all(|p| p.starts_with(staging.path())));
    }

    #[test]
    fn test_missing_tree_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let parts = archive(root.path())
            .collect(
                "fhe",
                None,
                FileType::FitAcf,
                utc(2012, 11, 1, 0, 0),
                utc(2012, 11, 1, 6, 0),
                staging.path(),
            )
            .unwrap();
        assert!(parts.is_empty());
        assert_eq!(parts.earliest, None);
    }
}
