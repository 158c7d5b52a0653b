//! Configuration for the registry gate
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (helixgate.toml)
//! - Environment variables (HELIXGATE__*)
//!
//! ## Example config file (helixgate.toml):
//! ```toml
//! root = "."
//!
//! [artifacts]
//! registry = "03_canonical_registry/global_registry.json"
//! index = "03_canonical_registry/acu_index.json"
//! graph = "03_canonical_registry/dependency_graph.json"
//! manifest = "03_canonical_registry/version_manifest.json"
//!
//! [freeze]
//! reference = "origin/main"
//!
//! [snapshot]
//! directory = "snapshots"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Main configuration for the registry gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Repository root; relative artifact paths resolve against it
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Artifact locations
    #[serde(default)]
    pub artifacts: ArtifactPaths,

    /// Freeze-mode settings
    #[serde(default)]
    pub freeze: FreezeConfig,

    /// Snapshot output settings
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Paths of the four registry artifacts, relative to `root`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactPaths {
    #[serde(default = "default_registry_path")]
    pub registry: PathBuf,
    #[serde(default = "default_index_path")]
    pub index: PathBuf,
    #[serde(default = "default_graph_path")]
    pub graph: PathBuf,
    #[serde(default = "default_manifest_path")]
    pub manifest: PathBuf,
}

/// Freeze-mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreezeConfig {
    /// Baseline the change-set is computed against
    #[serde(default = "default_reference")]
    pub reference: String,

    /// Files that may not change under freeze, relative to `root`.
    /// Empty means the four artifact paths.
    #[serde(default)]
    pub protected_paths: Vec<PathBuf>,
}

/// Snapshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Directory holding the rolling snapshot and the archive
    #[serde(default = "default_snapshot_dir")]
    pub directory: PathBuf,

    /// Rolling snapshot file name
    #[serde(default = "default_rolling_name")]
    pub rolling_file: String,

    /// Archive subdirectory name
    #[serde(default = "default_archive_dir")]
    pub archive_dir: String,
}

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Sanctioned operating modes
    #[serde(default = "default_allowed_modes")]
    pub allowed_modes: Vec<String>,
}

// Default value functions
fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("03_canonical_registry/global_registry.json")
}

fn default_index_path() -> PathBuf {
    PathBuf::from("03_canonical_registry/acu_index.json")
}

fn default_graph_path() -> PathBuf {
    PathBuf::from("03_canonical_registry/dependency_graph.json")
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("03_canonical_registry/version_manifest.json")
}

fn default_reference() -> String {
    "origin/main".to_string()
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

fn default_rolling_name() -> String {
    "current_snapshot.json".to_string()
}

fn default_archive_dir() -> String {
    "archive".to_string()
}

fn default_allowed_modes() -> Vec<String> {
    vec!["STRUCTURAL_ONLY".to_string()]
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            registry: default_registry_path(),
            index: default_index_path(),
            graph: default_graph_path(),
            manifest: default_manifest_path(),
        }
    }
}

impl Default for FreezeConfig {
    fn default() -> Self {
        Self {
            reference: default_reference(),
            protected_paths: Vec::new(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            directory: default_snapshot_dir(),
            rolling_file: default_rolling_name(),
            archive_dir: default_archive_dir(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            allowed_modes: default_allowed_modes(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            artifacts: ArtifactPaths::default(),
            freeze: FreezeConfig::default(),
            snapshot: SnapshotConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl GateConfig {
    /// Default layout rooted at `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["helixgate.toml", ".helixgate.toml", "config/helixgate.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "helixgate", "helixgate") {
            let xdg_config = config_dir.config_dir().join("helixgate.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // HELIXGATE__FREEZE__REFERENCE=origin/release etc.
        // List keys take comma-separated values.
        builder = builder.add_source(
            Environment::with_prefix("HELIXGATE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("validation.allowed_modes")
                .with_list_parse_key("freeze.protected_paths"),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.resolve(&self.artifacts.registry)
    }

    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.artifacts.index)
    }

    pub fn graph_path(&self) -> PathBuf {
        self.resolve(&self.artifacts.graph)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.resolve(&self.artifacts.manifest)
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.resolve(&self.snapshot.directory)
    }

    /// Files guarded by freeze mode, resolved against `root`
    pub fn protected_paths(&self) -> Vec<PathBuf> {
        if !self.freeze.protected_paths.is_empty() {
            return self.freeze.protected_paths.iter().map(|p| self.resolve(p)).collect();
        }
        vec![
            self.registry_path(),
            self.index_path(),
            self.graph_path(),
            self.manifest_path(),
        ]
    }

    /// Artifact paths in hash order, as recorded in snapshots
    pub fn hashed_files(&self) -> Vec<String> {
        [&self.artifacts.registry, &self.artifacts.index, &self.artifacts.graph]
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }
}
