//! Registry Gate
//!
//! Loads the four registry artifacts and runs the fixed check sequence:
//! freeze guard, completeness, acyclicity, operating mode, hash. The
//! snapshot path runs the same sequence before anything is written.

use serde::Serialize;
use tracing::{debug, info};

use crate::artifact::{RawArtifacts, RegistryArtifacts};
use crate::checksum::{compute_registry_hash, Checksum, HashInputs};
use crate::config::GateConfig;
use crate::error::{GateError, Result};
use crate::freeze::{ChangeSetProvider, FreezeGuard};
use crate::snapshot::{PublishOutcome, SnapshotManager};
use crate::validate::{check_acyclic, check_completeness, check_operating_mode};

/// Overall verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Valid,
    Invalid,
}

/// The single structured result of a validation run
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_hash: Option<String>,
}

impl ValidationReport {
    pub fn valid(hash: &Checksum) -> Self {
        Self {
            status: Status::Valid,
            error_kind: None,
            error: None,
            computed_hash: Some(hash.to_string()),
            manifest_hash: Some(hash.to_string()),
        }
    }

    pub fn from_error(err: &GateError) -> Self {
        let (computed_hash, manifest_hash) = match err {
            GateError::HashMismatch { computed, manifest } => (Some(computed.clone()), Some(manifest.clone())),
            _ => (None, None),
        };
        Self {
            status: Status::Invalid,
            error_kind: Some(err.kind().to_string()),
            error: Some(err.to_string()),
            computed_hash,
            manifest_hash,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == Status::Valid
    }
}

impl From<Result<Checksum>> for ValidationReport {
    fn from(result: Result<Checksum>) -> Self {
        match result {
            Ok(hash) => Self::valid(&hash),
            Err(err) => Self::from_error(&err),
        }
    }
}

/// Validation and publication engine for one configured registry
pub struct RegistryGate<'a> {
    config: GateConfig,
    change_set: &'a dyn ChangeSetProvider,
}

impl<'a> RegistryGate<'a> {
    pub fn new(config: GateConfig, change_set: &'a dyn ChangeSetProvider) -> Self {
        Self { config, change_set }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Read the four artifacts from their configured locations, uninterpreted
    pub fn load_artifacts(&self) -> Result<RawArtifacts> {
        debug!(root = %self.config.root.display(), "loading registry artifacts");
        RawArtifacts::load(
            &self.config.registry_path(),
            &self.config.index_path(),
            &self.config.graph_path(),
            &self.config.manifest_path(),
        )
    }

    /// Freeze guard. Runs before any record is interpreted.
    pub fn check_freeze(&self, raw: &RawArtifacts) -> Result<()> {
        let protected = self.config.protected_paths();
        FreezeGuard::new(&protected, &self.config.freeze.reference, self.change_set).enforce(raw.freeze_mode()?)
    }

    /// The three structural checks. Stops at the first failure.
    pub fn check_structure(&self, artifacts: &RegistryArtifacts) -> Result<()> {
        check_completeness(&artifacts.registry.typed, &artifacts.index.typed)?;
        check_acyclic(&artifacts.graph.typed)?;
        check_operating_mode(
            &artifacts.manifest,
            &artifacts.registry.typed,
            &self.config.validation.allowed_modes,
        )?;
        Ok(())
    }

    /// Structural checks and hash comparison; returns the verified hash
    pub fn verify(&self, artifacts: &RegistryArtifacts) -> Result<Checksum> {
        self.check_structure(artifacts)?;

        let manifest_hash = artifacts.manifest.require_hash()?;
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
        Ok(computed)
    }

    /// Load and pass the freeze guard, then interpret
    fn admit(&self) -> Result<RegistryArtifacts> {
        let raw = self.load_artifacts()?;
        self.check_freeze(&raw)?;
        raw.interpret()
    }

    /// Validator path: load, freeze guard, verify, report
    pub fn validate(&self) -> ValidationReport {
        let result = self.admit().and_then(|artifacts| self.verify(&artifacts));
        match &result {
            Ok(hash) => info!(hash = %hash, "registry VALID"),
            Err(err) => info!(kind = %err.kind(), error = %err, "registry INVALID"),
        }
        result.into()
    }

    /// Snapshot path: load, run every check, then publish
    pub fn publish(&self) -> Result<PublishOutcome> {
        let artifacts = self.admit()?;
        self.check_structure(&artifacts)?;
        self.snapshot_manager().publish(&artifacts)
    }

    pub fn snapshot_manager(&self) -> SnapshotManager {
        SnapshotManager::new(
            self.config.snapshot_dir(),
            &self.config.snapshot.rolling_file,
            &self.config.snapshot.archive_dir,
            self.config.hashed_files(),
        )
    }
}
