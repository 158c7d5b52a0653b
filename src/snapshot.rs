//! Snapshot publication
//!
//! A verified registry hash is published twice: a rolling snapshot that is
//! replaced on every run, and an archival snapshot per `registry_version`
//! that is written exactly once and never touched again.
//!
//! ```text
//! snapshots/
//! ├── current_snapshot.json
//! └── archive/
//!     ├── 1.0.0.json
//!     └── 1.1.0.json
//! ```

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::artifact::RegistryArtifacts;
use crate::checksum::{compute_registry_hash, Checksum, HashInputs};
use crate::error::{GateError, Result};
use crate::version::RegistryVersion;

/// Latest verified state, always replaceable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingSnapshot {
    pub registry_hash: String,
    pub operating_mode: String,
    pub registry_version: String,
    pub files_included: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Per-version record, write-once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivalSnapshot {
    pub registry_version: String,
    pub registry_hash: String,
    pub files_included: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Publication state of a single version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationState {
    Unpublished,
    Published,
}

/// What a successful publication wrote
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub registry_hash: Checksum,
    pub rolling_path: PathBuf,
    pub archive_path: PathBuf,
}

/// Owns the snapshot directory
pub struct SnapshotManager {
    rolling_path: PathBuf,
    archive_dir: PathBuf,
    files_included: Vec<String>,
}

impl SnapshotManager {
    pub fn new(
        snapshot_dir: impl AsRef<Path>,
        rolling_file: &str,
        archive_dir: &str,
        files_included: Vec<String>,
    ) -> Self {
        let dir = snapshot_dir.as_ref();
        Self {
            rolling_path: dir.join(rolling_file),
            archive_dir: dir.join(archive_dir),
            files_included,
        }
    }

    pub fn rolling_path(&self) -> &Path {
        &self.rolling_path
    }

    pub fn archive_path(&self, version: &RegistryVersion) -> PathBuf {
        self.archive_dir.join(version.archive_file_name())
    }

    /// Whether an archival snapshot exists for `version`
    pub fn state(&self, version: &RegistryVersion) -> PublicationState {
        if self.archive_path(version).exists() {
            PublicationState::Published
        } else {
            PublicationState::Unpublished
        }
    }

    /// Recompute the hash, verify it against the manifest and publish.
    ///
    /// Nothing is written unless the recomputed hash matches. The rolling
    /// snapshot is written before the archive is attempted.
    pub fn publish(&self, artifacts: &RegistryArtifacts) -> Result<PublishOutcome> {
        let manifest = &artifacts.manifest;
        let version = RegistryVersion::parse(manifest.require_version()?)?;
        let manifest_hash = manifest.require_hash()?;

        let computed = compute_registry_hash(&HashInputs {
            registry: &artifacts.registry.raw,
            index: &artifacts.index.raw,
            graph: &artifacts.graph.raw,
        });

        if !computed.matches(manifest_hash) {
            return Err(GateError::HashMismatch {
                computed: computed.to_string(),
                manifest: manifest_hash.to_string(),
            });
        }

        let generated_at = Utc::now();

        let rolling = RollingSnapshot {
            registry_hash: computed.to_string(),
            operating_mode: artifacts.registry.typed.operating_mode.clone(),
            registry_version: version.to_string(),
            files_included: self.files_included.clone(),
            generated_at,
        };
        self.write_rolling(&rolling)?;

        let archival = ArchivalSnapshot {
            registry_version: version.to_string(),
            registry_hash: computed.to_string(),
            files_included: self.files_included.clone(),
            generated_at,
        };
        let archive_path = self.write_archival(&version, &archival)?;

        info!(version = %version, hash = %computed, "registry snapshot published");

        Ok(PublishOutcome {
            registry_hash: computed,
            rolling_path: self.rolling_path.clone(),
            archive_path,
        })
    }

    fn write_rolling(&self, snapshot: &RollingSnapshot) -> Result<()> {
        if let Some(parent) = self.rolling_path.parent() {
            fs::create_dir_all(parent).map_err(|e| GateError::io(parent, e))?;
        }
        let content = to_pretty_json(snapshot)?;
        fs::write(&self.rolling_path, content).map_err(|e| GateError::io(&self.rolling_path, e))?;
        debug!(path = %self.rolling_path.display(), "rolling snapshot written");
        Ok(())
    }

    /// Write-once: an existing file for this version is never compared or replaced
    fn write_archival(&self, version: &RegistryVersion, snapshot: &ArchivalSnapshot) -> Result<PathBuf> {
        let path = self.archive_path(version);

        if path.exists() {
            warn!(version = %version, "archival snapshot already exists");
            return Err(GateError::ImmutabilityViolation {
                version: version.to_string(),
                path,
            });
        }

        fs::create_dir_all(&self.archive_dir).map_err(|e| GateError::io(&self.archive_dir, e))?;
        let content = to_pretty_json(snapshot)?;

        // Write beside the target, then link into place without replacing.
        // A failed write leaves only the temp file, which is removed on drop.
        let mut staged = tempfile::Builder::new()
            .prefix(".publish-")
            .suffix(".partial")
            .tempfile_in(&self.archive_dir)
            .map_err(|e| GateError::io(&self.archive_dir, e))?;
        staged
            .write_all(content.as_bytes())
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|e| GateError::io(staged.path(), e))?;

        match staged.persist_noclobber(&path) {
            Ok(_) => {}
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                return Err(GateError::ImmutabilityViolation {
                    version: version.to_string(),
                    path,
                })
            }
            Err(e) => return Err(GateError::io(&path, e.error)),
        }

        Ok(path)
    }

    /// Read back the rolling snapshot, if one has been written
    pub fn load_rolling(&self) -> Result<Option<RollingSnapshot>> {
        read_snapshot(&self.rolling_path)
    }

    /// Read back the archival snapshot of `version`
    pub fn load_archived(&self, version: &RegistryVersion) -> Result<Option<ArchivalSnapshot>> {
        read_snapshot(&self.archive_path(version))
    }

    /// All archived versions, oldest first
    pub fn published_versions(&self) -> Result<Vec<RegistryVersion>> {
        if !self.archive_dir.exists() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in WalkDir::new(&self.archive_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(self.archive_dir.as_path()).to_path_buf();
                GateError::io(path, e.into())
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy()) else {
                continue;
            };
            match RegistryVersion::parse(&stem) {
                Ok(version) => versions.push(version),
                Err(_) => debug!(path = %path.display(), "skipping unrecognised archive entry"),
            }
        }

        versions.sort();
        Ok(versions)
    }
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| GateError::Schema(format!("Unable to encode snapshot: {}", e)))
}

fn read_snapshot<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(GateError::io(path, e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| GateError::Parse {
            path: path.to_path_buf(),
            source,
        })
}
