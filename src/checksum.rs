//! Registry digest computation

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::canonical::canonical_bytes;

/// One of the three artifacts that participate in the registry hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashedArtifact {
    Registry,
    Index,
    DependencyGraph,
}

/// Concatenation order for the registry hash.
///
/// Shared by validation and snapshot publication. Reordering this changes
/// every digest ever recorded in a manifest. The manifest is never hashed.
pub const HASH_ORDER: [HashedArtifact; 3] = [
    HashedArtifact::Registry,
    HashedArtifact::Index,
    HashedArtifact::DependencyGraph,
];

/// The raw documents fed into the hash
#[derive(Debug, Clone, Copy)]
pub struct HashInputs<'a> {
    pub registry: &'a Value,
    pub index: &'a Value,
    pub graph: &'a Value,
}

impl<'a> HashInputs<'a> {
    pub fn get(&self, artifact: HashedArtifact) -> &'a Value {
        match artifact {
            HashedArtifact::Registry => self.registry,
            HashedArtifact::Index => self.index,
            HashedArtifact::DependencyGraph => self.graph,
        }
    }
}

/// SHA256 checksum rendered as lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a digest recorded elsewhere (e.g. a manifest)
    pub fn matches(&self, recorded: &str) -> bool {
        self.0 == recorded.trim()
    }
}

/// Hash registry, index and graph in [`HASH_ORDER`]
pub fn compute_registry_hash(inputs: &HashInputs<'_>) -> Checksum {
    let mut hasher = Sha256::new();
    for artifact in HASH_ORDER {
        hasher.update(canonical_bytes(inputs.get(artifact)));
    }
    Checksum(format!("{:x}", hasher.finalize()))
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Checksum {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Checksum {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonical_string;
    use serde_json::json;

    fn sample() -> (Value, Value, Value) {
        (
            json!({"ac_units": [{"acu_id": "A"}], "total_acu_count": 1, "operating_mode": "STRUCTURAL_ONLY"}),
            json!({"A": {"title": "first"}}),
            json!({"nodes": ["A"], "edges": []}),
        )
    }

    #[test]
    fn test_hash_is_deterministic() {
        let (r, i, g) = sample();
        let inputs = HashInputs { registry: &r, index: &i, graph: &g };
        assert_eq!(compute_registry_hash(&inputs), compute_registry_hash(&inputs));
        assert_eq!(compute_registry_hash(&inputs).as_str().len(), 64);
    }

    #[test]
    fn test_hash_matches_concatenated_canonical_text() {
        let (r, i, g) = sample();
        let inputs = HashInputs { registry: &r, index: &i, graph: &g };
        let concatenated = format!(
            "{}{}{}",
            canonical_string(&r),
            canonical_string(&i),
            canonical_string(&g)
        );
        assert_eq!(compute_registry_hash(&inputs), Checksum::from_bytes(concatenated.as_bytes()));
    }

    #[test]
    fn test_order_is_fixed() {
        let (r, i, g) = sample();
        let forward = compute_registry_hash(&HashInputs { registry: &r, index: &i, graph: &g });
        let swapped = compute_registry_hash(&HashInputs { registry: &i, index: &r, graph: &g });
        assert_ne!(forward, swapped);
    }

    #[test]
    fn test_any_input_change_changes_digest() {
        let (r, i, g) = sample();
        let base = compute_registry_hash(&HashInputs { registry: &r, index: &i, graph: &g });

        let r2 = json!({"ac_units": [{"acu_id": "B"}], "total_acu_count": 1, "operating_mode": "STRUCTURAL_ONLY"});
        let i2 = json!({"A": {"title": "firsu"}});
        let g2 = json!({"nodes": ["A"], "edges": [], "x": 0});

        assert_ne!(base, compute_registry_hash(&HashInputs { registry: &r2, index: &i, graph: &g }));
        assert_ne!(base, compute_registry_hash(&HashInputs { registry: &r, index: &i2, graph: &g }));
        assert_ne!(base, compute_registry_hash(&HashInputs { registry: &r, index: &i, graph: &g2 }));
    }

    #[test]
    fn test_large_integer_change_changes_digest() {
        let (_, i, g) = sample();
        let r1: Value = serde_json::from_str(r#"{"ac_units": [], "n": 18446744073709551616}"#).unwrap();
        let r2: Value = serde_json::from_str(r#"{"ac_units": [], "n": 18446744073709551617}"#).unwrap();
        assert_ne!(
            compute_registry_hash(&HashInputs { registry: &r1, index: &i, graph: &g }),
            compute_registry_hash(&HashInputs { registry: &r2, index: &i, graph: &g })
        );
    }

    #[test]
    fn test_matches_trims_recorded_value() {
        let sum = Checksum::from_bytes(b"x");
        let padded = format!(" {}\n", sum);
        assert!(sum.matches(&padded));
        assert!(!sum.matches(&sum.as_str().to_uppercase()));
    }
}
