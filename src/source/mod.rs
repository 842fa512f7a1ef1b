// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Source resolution.
//!
//! [`SourceResolver`] turns a [`DataRequest`] into one staged local file,
//! trying in order:
//!
//! 1. the explicit path on the request
//! 2. a merged file already in the staging area
//! 3. the local archive tree
//! 4. the remote archive
//!
//! Files found in an archive are decompressed into the staging area,
//! concatenated in discovery order and, when requested, passed through
//! the quality filter. Finding nothing is not an error: `resolve` returns
//! `Ok(None)`.
//!
//! # Example
//!
//! ```rust,no_run
//! use chrono::{TimeZone, Utc};
//! use darnio::source::{DataRequest, ResolverConfig, SourceResolver};
//!
//! let resolver = SourceResolver::new(ResolverConfig::load("darnio.toml")?)?;
//! let request = DataRequest::builder()
//!     .start(Utc.with_ymd_and_hms(2012, 11, 1, 0, 0, 0).unwrap())
//!     .station("fhe")
//!     .build()?;
//! match resolver.open(&request)? {
//!     Some(mut ptr) => println!("{:?}", ptr.read_record()?),
//!     None => println!("no data found"),
//! }
//! # Ok::<(), darnio::DarnError>(())
//! ```

pub mod config;
pub use config::{
    DirTemplate, FilterConfig, LocalArchiveConfig, RemoteArchiveConfig, ResolverConfig,
};

pub mod filter;
pub use filter::{CommandFilter, QualityFilter};

pub mod local;
pub use local::LocalArchive;

pub mod remote;
pub use remote::{ArchiveConnector, ArchiveTransport, MirrorConnector};

pub mod request;
pub use request::{DataRequest, RequestBuilder, SourcePreference};

pub mod staging;
pub use staging::{ArchiveName, StagedName};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::io::{is_compressed, DataPointer};
use crate::{DarnError, FileType, Result};
use staging::StagedParts;

/// Tier a resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Explicit,
    Cache,
    Local,
    Remote,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Origin::Explicit => "explicit path",
            Origin::Cache => "staging cache",
            Origin::Local => "local archive",
            Origin::Remote => "remote archive",
        };
        f.write_str(s)
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Staged file to read
    pub path: PathBuf,
    /// Subtype actually found, possibly a fallback of the requested one
    pub file_type: FileType,
    /// Whether `path` holds quality-filtered data
    pub filtered: bool,
    pub origin: Origin,
}

impl Resolution {
    pub fn is_cached(&self) -> bool {
        self.origin == Origin::Cache
    }
}

/// Locates, stages and opens record files for requests.
pub struct SourceResolver {
    config: ResolverConfig,
    local: LocalArchive,
    connector: Option<Box<dyn ArchiveConnector>>,
    filter: Box<dyn QualityFilter>,
}

impl SourceResolver {
    /// Create a resolver from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `DarnError::Config` if the configuration is invalid.
    pub fn new(config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        let local = LocalArchive::from_config(&config.local)?;
        let connector = config.remote.as_ref().and_then(remote::connector_from_config);
        let filter = Box::new(CommandFilter::from_config(&config.filter));
        Ok(Self {
            config,
            local,
            connector,
            filter,
        })
    }

    /// Replace the remote archive connector.
    pub fn with_connector(mut self, connector: Box<dyn ArchiveConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Replace the quality filter.
    pub fn with_filter(mut self, filter: Box<dyn QualityFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn staging_dir(&self) -> &Path {
        &self.config.staging_dir
    }

    /// Resolve a request to one staged file.
    ///
    /// Returns `Ok(None)` when no tier has data for the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the staging area cannot be used or the merged
    /// file cannot be written. Archive and transport failures are logged
    /// and only make the resolver move on to the next tier.
    pub fn resolve(&self, request: &DataRequest) -> Result<Option<Resolution>> {
        let staging_dir = self.staging_dir();
        fs::create_dir_all(staging_dir).map_err(|e| {
            DarnError::io(
                "SourceResolver",
                format!("Failed to create staging area {}: {e}", staging_dir.display()),
            )
        })?;

        if let Some(path) = request.path() {
            return self.resolve_explicit(request, path);
        }

        let radar = request
            .radar()
            .ok_or_else(|| DarnError::invalid_request("station", "a station code is required"))?;
        let channel = request.filter().channel;
        let requested = request.file_type();
        let search_start = request.search_start();
        let end = request.window().end();

        if !request.bypass_cache() {
            if let Some((path, name)) = staging::find_cached(
                staging_dir,
                radar,
                channel,
                requested,
                search_start,
                end,
                request.filtered(),
            )? {
                info!(
                    context = "SourceResolver",
                    path = %path.display(),
                    "Found cached {} data",
                    name.file_type
                );
                return Ok(Some(self.finish(path, requested, Origin::Cache, request.filtered())));
            }
        }

        let mut remote_allowed = request.source().allows_remote();
        let mut found = None;

        if request.source().allows_local() && self.config.local.enabled {
            match self.collect_local(radar, request) {
                Ok(hit) => found = hit,
                Err(e) => {
                    warn!(
                        context = "SourceResolver",
                        root = %self.local.root().display(),
                        error = %e,
                        "Problem reading local archive, trying other sources"
                    );
                    remote_allowed = true;
                }
            }
        }

        if found.is_none() && remote_allowed {
            found = self.collect_remote(radar, request);
        }

        let Some((file_type, parts, origin)) = found else {
            info!(
                context = "SourceResolver",
                radar,
                window = %request.window(),
                "No data found"
            );
            return Ok(None);
        };

        let start = parts.earliest.unwrap_or(request.window().start());
        let name = StagedName::new(start, end, radar, file_type).with_channel(channel);
        let merged = staging_dir.join(name.to_string());
        if let Err(e) = staging::concat_files(&parts.paths, &merged) {
            parts.discard();
            return Err(e);
        }
        info!(
            context = "SourceResolver",
            path = %merged.display(),
            files = parts.len(),
            "Merged {} data from {}",
            file_type,
            origin
        );

        Ok(Some(self.finish(merged, file_type, origin, request.filtered())))
    }

    /// Resolve a request and open a pointer on the result.
    ///
    /// Returns `Ok(None)` when no data was found.
    pub fn open(&self, request: &DataRequest) -> Result<Option<DataPointer>> {
        let Some(resolution) = self.resolve(request)? else {
            return Ok(None);
        };
        let ptr = DataPointer::open(
            &resolution.path,
            resolution.file_type,
            *request.window(),
            *request.filter(),
        )?;
        Ok(Some(ptr))
    }

    fn resolve_explicit(&self, request: &DataRequest, path: &Path) -> Result<Option<Resolution>> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let file_type = ArchiveName::parse(name)
            .map(|n| n.file_type)
            .or_else(|| StagedName::parse(name).map(|n| n.file_type))
            .unwrap_or(request.file_type());

        let staged = if is_compressed(path) {
            match staging::stage_file(path, self.staging_dir()) {
                Ok(staged) => staged,
                Err(e) if e.is_soft() => {
                    warn!(
                        context = "SourceResolver",
                        path = %path.display(),
                        error = %e,
                        "Failed to decompress requested file"
                    );
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        } else {
            path.to_path_buf()
        };

        debug!(
            context = "SourceResolver",
            path = %staged.display(),
            file_type = %file_type,
            "Using explicit file"
        );
        Ok(Some(self.finish(staged, file_type, Origin::Explicit, request.filtered())))
    }

    fn collect_local(
        &self,
        radar: &str,
        request: &DataRequest,
    ) -> Result<Option<(FileType, StagedParts, Origin)>> {
        for &file_type in request.file_type().fallback_chain() {
            let parts = self.local.collect(
                radar,
                request.filter().channel,
                file_type,
                request.search_start(),
                request.window().end(),
                self.staging_dir(),
            )?;
            if !parts.is_empty() {
                info!(context = "SourceResolver", "Found {} data in local archive", file_type);
                return Ok(Some((file_type, parts, Origin::Local)));
            }
            info!(context = "SourceResolver", "No {} data in local archive", file_type);
        }
        Ok(None)
    }

    fn collect_remote(
        &self,
        radar: &str,
        request: &DataRequest,
    ) -> Option<(FileType, StagedParts, Origin)> {
        let Some(connector) = self.connector.as_deref() else {
            debug!(context = "SourceResolver", "No remote archive configured");
            return None;
        };
        let root = self
            .config
            .remote
            .as_ref()
            .map_or("/data", |remote| remote.root.as_str());

        for &file_type in request.file_type().fallback_chain() {
            match remote::collect_remote(
                connector,
                root,
                radar,
                request.filter().channel,
                file_type,
                request.search_start(),
                request.window().end(),
                self.staging_dir(),
            ) {
                Ok(parts) if !parts.is_empty() => {
                    info!(
                        context = "SourceResolver",
                        host = connector.host(),
                        "Found {} data in remote archive",
                        file_type
                    );
                    return Some((file_type, parts, Origin::Remote));
                }
                Ok(_) => info!(
                    context = "SourceResolver",
                    host = connector.host(),
                    "No {} data in remote archive",
                    file_type
                ),
                Err(e) => warn!(
                    context = "SourceResolver",
                    host = connector.host(),
                    file_type = %file_type,
                    error = %e,
                    fields = ?e.log_fields(),
                    "Remote archive failed, moving on"
                ),
            }
        }
        None
    }

    /// Apply the quality filter if wanted, falling back to the unfiltered
    /// file when it fails.
    fn finish(
        &self,
        path: PathBuf,
        file_type: FileType,
        origin: Origin,
        want_filtered: bool,
    ) -> Resolution {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let already_filtered = name.ends_with(&format!("{file_type}f"));

        if want_filtered && !already_filtered {
            let output = self.staging_dir().join(format!("{name}f"));
            match self.filter.apply(&path, &output) {
                Ok(()) => {
                    debug!(
                        context = "SourceResolver",
                        path = %output.display(),
                        "Filtered staged file"
                    );
                    return Resolution {
                        path: output,
                        file_type,
                        filtered: true,
                        origin,
                    };
                }
                Err(e) => warn!(
                    context = "SourceResolver",
                    path = %path.display(),
                    error = %e,
                    "Quality filter failed, using unfiltered data"
                ),
            }
        }

        Resolution {
            path,
            file_type,
            filtered: already_filtered,
            origin,
        }
    }
}

impl fmt::Debug for SourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceResolver")
            .field("config", &self.config)
            .field("remote", &self.connector.as_ref().map(|c| c.host().to_string()))
            .finish_non_exhaustive()
    }
}
