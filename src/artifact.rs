//! Registry artifact types
//!
//! Each artifact is kept twice: the raw JSON document, which is what gets
//! hashed, and a typed view used by the structural checks.

use std::collections::BTreeSet;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{GateError, Result};

/// A single atomic unit in the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "acu_id", alias = "id")]
    pub id: String,
    /// Everything else on the record; never interpreted here
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// The canonical registry: source of truth for which ids exist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    #[serde(rename = "ac_units", alias = "records")]
    pub records: Vec<Record>,
    #[serde(rename = "total_acu_count", alias = "total_count", default)]
    pub total_count: Option<u64>,
    pub operating_mode: String,
}

impl Registry {
    pub fn ids(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }
}

/// Mirror of the registry keyed by record id
#[derive(Debug, Clone, Default)]
pub struct Index {
    pub entries: Map<String, Value>,
}

impl Index {
    pub fn ids(&self) -> BTreeSet<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

/// A directed dependency between two records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// Declared dependency graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: Vec<String>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Version manifest: the declared registry digest and mode
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionManifest {
    #[serde(default)]
    pub registry_version: Option<String>,
    #[serde(default)]
    pub registry_hash: Option<String>,
    #[serde(default)]
    pub operating_mode: Option<String>,
    #[serde(default)]
    pub freeze_mode: bool,
}

impl VersionManifest {
    /// Non-empty registry hash, or a schema error
    pub fn require_hash(&self) -> Result<&str> {
        require_field(self.registry_hash.as_deref(), "registry_hash")
    }

    /// Non-empty registry version, or a schema error
    pub fn require_version(&self) -> Result<&str> {
        require_field(self.registry_version.as_deref(), "registry_version")
    }
}

fn require_field<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(GateError::Schema(format!(
            "Version manifest is missing required field '{}'",
            field
        ))),
    }
}

/// A raw JSON document together with its typed view
#[derive(Debug, Clone)]
pub struct Document<T> {
    pub raw: Value,
    pub typed: T,
}

/// All four artifacts of one registry revision
#[derive(Debug, Clone)]
pub struct RegistryArtifacts {
    pub registry: Document<Registry>,
    pub index: Document<Index>,
    pub graph: Document<DependencyGraph>,
    pub manifest: VersionManifest,
}

/// Read and parse a JSON document from disk
pub fn load_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| GateError::io(path, e))?;
    serde_json::from_str(&content).map_err(|source| GateError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn typed_view<T: DeserializeOwned>(raw: &Value, what: &str) -> Result<T> {
    T::deserialize(raw).map_err(|e| GateError::Schema(format!("Malformed {}: {}", what, e)))
}

impl Document<Registry> {
    pub fn from_value(raw: Value) -> Result<Self> {
        let typed = typed_view(&raw, "registry")?;
        Ok(Self { raw, typed })
    }
}

impl Document<Index> {
    pub fn from_value(raw: Value) -> Result<Self> {
        let entries = raw
            .as_object()
            .cloned()
            .ok_or_else(|| GateError::Schema("Malformed index: expected an object keyed by ACU id".to_string()))?;
        Ok(Self { raw, typed: Index { entries } })
    }
}

impl Document<DependencyGraph> {
    pub fn from_value(raw: Value) -> Result<Self> {
        let typed = typed_view(&raw, "dependency graph")?;
        Ok(Self { raw, typed })
    }
}

/// The four artifacts as parsed JSON, before any field is interpreted
#[derive(Debug, Clone)]
pub struct RawArtifacts {
    pub registry: Value,
    pub index: Value,
    pub graph: Value,
    pub manifest: Value,
}

impl RawArtifacts {
    /// Read the four artifacts from disk
    pub fn load(registry: &Path, index: &Path, graph: &Path, manifest: &Path) -> Result<Self> {
        Ok(Self {
            registry: load_json(registry)?,
            index: load_json(index)?,
            graph: load_json(graph)?,
            manifest: load_json(manifest)?,
        })
    }

    /// The manifest's `freeze_mode` flag, read without interpreting anything else.
    /// Absent or null means off.
    pub fn freeze_mode(&self) -> Result<bool> {
        match self.manifest.get("freeze_mode") {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(flag)) => Ok(*flag),
            Some(other) => Err(GateError::Schema(format!(
                "Malformed version manifest: freeze_mode must be a boolean, got {}",
                other
            ))),
        }
    }

    /// Build the typed views
    pub fn interpret(self) -> Result<RegistryArtifacts> {
        Ok(RegistryArtifacts {
            registry: Document::<Registry>::from_value(self.registry)?,
            index: Document::<Index>::from_value(self.index)?,
            graph: Document::<DependencyGraph>::from_value(self.graph)?,
            manifest: typed_view(&self.manifest, "version manifest")?,
        })
    }
}

impl RegistryArtifacts {
    /// Build from already-parsed documents
    pub fn from_values(registry: Value, index: Value, graph: Value, manifest: Value) -> Result<Self> {
        RawArtifacts {
            registry,
            index,
            graph,
            manifest,
        }
        .interpret()
    }

    /// Load and interpret the four artifacts
    pub fn load(registry: &Path, index: &Path, graph: &Path, manifest: &Path) -> Result<Self> {
        RawArtifacts::load(registry, index, graph, manifest)?.interpret()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_aliases() {
        let doc = Document::<Registry>::from_value(json!({
            "records": [{"id": "A", "owner": "x"}],
            "total_count": 1,
            "operating_mode": "STRUCTURAL_ONLY"
        }))
        .unwrap();
        assert_eq!(doc.typed.records[0].id, "A");
        assert_eq!(doc.typed.records[0].metadata["owner"], "x");
        assert_eq!(doc.typed.total_count, Some(1));
    }

    #[test]
    fn test_index_must_be_object() {
        let err = Document::<Index>::from_value(json!(["A"])).unwrap_err();
        assert!(matches!(err, GateError::Schema(_)));
    }

    #[test]
    fn test_manifest_required_fields() {
        let manifest = VersionManifest {
            registry_version: Some("  ".to_string()),
            registry_hash: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(manifest.require_hash().unwrap(), "abc");
        assert!(matches!(manifest.require_version(), Err(GateError::Schema(_))));
        assert!(!manifest.freeze_mode);
    }

    #[test]
    fn test_freeze_flag_read_from_raw_manifest() {
        let mut raw = RawArtifacts {
            registry: json!({"ac_units": [{"no_id": true}]}),
            index: json!([]),
            graph: json!(null),
            manifest: json!({"freeze_mode": true}),
        };
        assert!(raw.freeze_mode().unwrap());

        raw.manifest = json!({});
        assert!(!raw.freeze_mode().unwrap());

        raw.manifest = json!({"freeze_mode": "yes"});
        assert!(matches!(raw.freeze_mode(), Err(GateError::Schema(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_json(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, GateError::Io { .. }));
    }
}
