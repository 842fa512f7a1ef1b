// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Remote archive tier.
//!
//! The resolver talks to a remote archive through two small traits: an
//! [`ArchiveConnector`] opens a session and the resulting
//! [`ArchiveTransport`] lists directories and fetches files. Two
//! connectors are provided:
//!
//! - [`MirrorConnector`] serves a locally mounted copy of the archive and
//!   needs no network
//! - `SftpConnector` (feature `sftp`) speaks SFTP over SSH

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, warn};

use super::config::RemoteArchiveConfig;
use super::staging::{
    archive_hours, decompress_file, staged_file_name, ArchiveName, StagedParts,
};
use crate::io::Compression;
use crate::{Channel, DarnError, FileType, Result};

/// Open session against an archive host.
pub trait ArchiveTransport {
    /// File names (not paths) in a remote directory.
    fn list_dir(&mut self, dir: &str) -> Result<Vec<String>>;

    /// Copy a remote file to a local path.
    fn fetch(&mut self, remote: &str, dest: &Path) -> Result<()>;
}

/// Factory for archive sessions.
pub trait ArchiveConnector {
    /// Host name used in logs and errors.
    fn host(&self) -> &str;

    /// Open a new session.
    fn connect(&self) -> Result<Box<dyn ArchiveTransport>>;
}

/// Archive served from a local directory tree laid out like the host.
///
/// Remote paths under `remote_root` map to the same relative path under
/// the mirror directory.
#[derive(Debug, Clone)]
pub struct MirrorConnector {
    dir: PathBuf,
    remote_root: String,
}

impl MirrorConnector {
    pub fn new(dir: impl Into<PathBuf>, remote_root: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            remote_root: remote_root.into(),
        }
    }
}

impl ArchiveConnector for MirrorConnector {
    fn host(&self) -> &str {
        "mirror"
    }

    fn connect(&self) -> Result<Box<dyn ArchiveTransport>> {
        if !self.dir.is_dir() {
            return Err(DarnError::transport(
                self.host(),
                format!("Mirror directory {} is not available", self.dir.display()),
            ));
        }
        Ok(Box::new(MirrorTransport {
            dir: self.dir.clone(),
            remote_root: self.remote_root.clone(),
        }))
    }
}

struct MirrorTransport {
    dir: PathBuf,
    remote_root: String,
}

impl MirrorTransport {
    fn local_path(&self, remote: &str) -> PathBuf {
        let relative = remote
            .strip_prefix(self.remote_root.as_str())
            .unwrap_or(remote)
            .trim_start_matches('/');
        self.dir.join(relative)
    }
}

impl ArchiveTransport for MirrorTransport {
    fn list_dir(&mut self, dir: &str) -> Result<Vec<String>> {
        let path = self.local_path(dir);
        let entries = match fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DarnError::transport("mirror", format!("list {dir}: {e}"))),
        };
        Ok(entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect())
    }

    fn fetch(&mut self, remote: &str, dest: &Path) -> Result<()> {
        fs::copy(self.local_path(remote), dest)
            .map(|_| ())
            .map_err(|e| DarnError::transport("mirror", format!("fetch {remote}: {e}")))
    }
}

#[cfg(feature = "sftp")]
pub use sftp::SftpConnector;

#[cfg(feature = "sftp")]
mod sftp {
    use std::fs::File;
    use std::io::{self, BufWriter, Write};
    use std::net::TcpStream;
    use std::path::Path;

    use super::{ArchiveConnector, ArchiveTransport};
    use crate::source::config::RemoteArchiveConfig;
    use crate::{DarnError, Result};

    /// SFTP session factory.
    ///
    /// Authenticates with the configured password, or through the SSH
    /// agent when none is set.
    #[derive(Debug, Clone)]
    pub struct SftpConnector {
        host: String,
        port: u16,
        username: String,
        password: Option<String>,
    }

    impl SftpConnector {
        pub fn from_config(config: &RemoteArchiveConfig) -> Self {
            Self {
                host: config.host.clone(),
                port: config.port,
                username: config.username.clone(),
                password: config.password.clone(),
            }
        }

        fn err(&self, e: impl std::fmt::Display) -> DarnError {
            DarnError::transport(&self.host, e.to_string())
        }
    }

    impl ArchiveConnector for SftpConnector {
        fn host(&self) -> &str {
            &self.host
        }

        fn connect(&self) -> Result<Box<dyn ArchiveTransport>> {
            let tcp = TcpStream::connect((self.host.as_str(), self.port)).map_err(|e| self.err(e))?;
            let mut session = ssh2::Session::new().map_err(|e| self.err(e))?;
            session.set_tcp_stream(tcp);
            session.handshake().map_err(|e| self.err(e))?;
            match &self.password {
                Some(password) => session.userauth_password(&self.username, password),
                None => session.userauth_agent(&self.username),
            }
            .map_err(|e| self.err(e))?;
            let sftp = session.sftp().map_err(|e| self.err(e))?;

            Ok(Box::new(SftpTransport {
                host: self.host.clone(),
                sftp,
                _session: session,
            }))
        }
    }

    struct SftpTransport {
        host: String,
        sftp: ssh2::Sftp,
        _session: ssh2::Session,
    }

    impl ArchiveTransport for SftpTransport {
        fn list_dir(&mut self, dir: &str) -> Result<Vec<String>> {
            let entries = self
                .sftp
                .readdir(Path::new(dir))
                .map_err(|e| DarnError::transport(&self.host, format!("list {dir}: {e}")))?;
            Ok(entries
                .into_iter()
                .filter_map(|(path, _)| {
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .map(str::to_string)
                })
                .collect())
        }

        fn fetch(&mut self, remote: &str, dest: &Path) -> Result<()> {
            let result = (|| -> std::result::Result<(), String> {
                let mut src = self.sftp.open(Path::new(remote)).map_err(|e| e.to_string())?;
                let mut out = BufWriter::new(File::create(dest).map_err(|e| e.to_string())?);
                io::copy(&mut src, &mut out).map_err(|e| e.to_string())?;
                out.flush().map_err(|e| e.to_string())
            })();
            result.map_err(|e| {
                let _ = std::fs::remove_file(dest);
                DarnError::transport(&self.host, format!("fetch {remote}: {e}"))
            })
        }
    }
}

/// Pick a connector for the configured remote archive.
///
/// A mirror directory wins over a network session. Without the `sftp`
/// feature only mirrors are available.
pub fn connector_from_config(config: &RemoteArchiveConfig) -> Option<Box<dyn ArchiveConnector>> {
    if let Some(mirror) = &config.mirror {
        return Some(Box::new(MirrorConnector::new(mirror, config.root.clone())));
    }

    #[cfg(feature = "sftp")]
    {
        if !config.host.is_empty() {
            return Some(Box::new(SftpConnector::from_config(config)));
        }
    }

    debug!(
        context = "RemoteArchive",
        host = %config.host,
        "No usable transport for remote archive"
    );
    None
}

/// Per-day directory on the host: `{root}/{year}/{ftype}/{radar}`.
pub fn remote_dir(root: &str, day: DateTime<Utc>, file_type: FileType, radar: &str) -> String {
    format!(
        "{}/{:04}/{}/{}",
        root.trim_end_matches('/'),
        day.year(),
        file_type,
        radar
    )
}

/// Download and stage every archive file of `file_type` for the hours
/// covering `[search_start, end]`.
///
/// The year directory is listed once per year crossed. Transport errors
/// discard what was staged and are returned so the caller can move on.
#[allow(clippy::too_many_arguments)]
pub fn collect_remote(
    connector: &dyn ArchiveConnector,
    root: &str,
    radar: &str,
    channel: Option<Channel>,
    file_type: FileType,
    search_start: DateTime<Utc>,
    end: DateTime<Utc>,
    staging_dir: &Path,
) -> Result<StagedParts> {
    let mut parts = StagedParts::default();
    match walk_remote(
        connector,
        root,
        radar,
        channel,
        file_type,
        search_start,
        end,
        staging_dir,
        &mut parts,
    ) {
        Ok(()) => Ok(parts),
        Err(e) => {
            parts.discard();
            Err(e)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn walk_remote(
    connector: &dyn ArchiveConnector,
    root: &str,
    radar: &str,
    channel: Option<Channel>,
    file_type: FileType,
    search_start: DateTime<Utc>,
    end: DateTime<Utc>,
    staging_dir: &Path,
    parts: &mut StagedParts,
) -> Result<()> {
    let mut session = connector.connect()?;
    let mut listing: Option<(i32, String, Vec<(String, ArchiveName)>)> = None;

    for hour in archive_hours(search_start, end) {
        if listing.as_ref().map_or(true, |(year, ..)| *year != hour.year()) {
            let dir = remote_dir(root, hour, file_type, radar);
            let mut files: Vec<(String, ArchiveName)> = session
                .list_dir(&dir)?
                .into_iter()
                .filter_map(|n| ArchiveName::parse(&n).map(|parsed| (n, parsed)))
                .collect();
            files.sort_by(|a, b| a.0.cmp(&b.0));
            listing = Some((hour.year(), dir, files));
        }
        let Some((_, dir, files)) = listing.as_ref() else {
            continue;
        };

        for (file_name, name) in files {
            if !name.in_hour(hour) || !name.matches(radar, file_type, channel) {
                continue;
            }
            let download = staging_dir.join(file_name);
            session.fetch(&format!("{dir}/{file_name}"), &download)?;
            debug!(
                context = "RemoteArchive",
                host = connector.host(),
                file = %file_name,
                "Fetched archive file"
            );

            if name.compression == Compression::None {
                parts.push(download, name.start);
                continue;
            }
            let staged = staging_dir.join(staged_file_name(file_name));
            let result = decompress_file(&download, name.compression, &staged);
            let _ = fs::remove_file(&download);
            match result {
                Ok(()) => parts.push(staged, name.start),
                Err(e) => warn!(
                    context = "RemoteArchive",
                    file = %file_name,
                    error = %e,
                    "Skipping unreadable archive file"
                ),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_remote_dir_layout() {
        assert_eq!(
            remote_dir("/data/", utc(2012, 11, 1, 0, 0), FileType::FitAcf, "fhe"),
            "/data/2012/fitacf/fhe"
        );
    }

    #[test]
    fn test_mirror_collect() {
        let mirror = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let dir = mirror.path().join("2012/rawacf/kod");
        fs::create_dir_all(&dir).unwrap();
        for name in [
            "20121101.0000.00.kod.c.rawacf",
            "20121101.0000.00.kod.d.rawacf",
            "20121101.0200.00.kod.c.rawacf",
            "20121101.0600.00.kod.c.rawacf",
        ] {
            fs::write(dir.join(name), name).unwrap();
        }

        let connector = MirrorConnector::new(mirror.path(), "/data");
        let parts = collect_remote(
            &connector,
            "/data",
            "kod",
            Channel::new('c'),
            FileType::RawAcf,
            utc(2012, 10, 31, 23, 56),
            utc(2012, 11, 1, 3, 0),
            staging.path(),
        )
        .unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts.earliest, Some(utc(2012, 11, 1, 0, 0)));
        assert!(parts.paths[0].ends_with("20121101.0000.00.kod.c.rawacf"));
        assert_eq!(
            fs::read_to_string(&parts.paths[1]).unwrap(),
            "20121101.0200.00.kod.c.rawacf"
        );
    }

    #[test]
    fn test_unavailable_mirror_is_transport_error() {
        let staging = tempfile::tempdir().unwrap();
        let connector = MirrorConnector::new(staging.path().join("absent"), "/data");
        let err = collect_remote(
            &connector,
            "/data",
            "kod",
            None,
            FileType::RawAcf,
            utc(2012, 11, 1, 0, 0),
            utc(2012, 11, 1, 2, 0),
            staging.path(),
        )
        .unwrap_err();
        assert!(matches!(err, DarnError::Transport { .. }));
    }

    #[test]
    fn test_connector_from_config_prefers_mirror() {
        let config = RemoteArchiveConfig {
            mirror: Some(PathBuf::from("/mnt/archive")),
            ..Default::default()
        };
        let connector = connector_from_config(&config).unwrap();
        assert_eq!(connector.host(), "mirror");
    }
}
