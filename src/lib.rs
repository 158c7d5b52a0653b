//! HelixGate Registry Gate
//!
//! Validates a versioned canonical registry of atomic records (ACUs) and
//! publishes content-addressed snapshots of it. The gate only reads and
//! records; it never repairs or mutates the registry.
//!
//! ## Check sequence
//!
//! 1. **Freeze guard**: under `freeze_mode`, protected files may not differ from the reference baseline
//! 2. **Completeness**: registry and index carry the same ids, and the declared count agrees
//! 3. **Acyclicity**: the dependency graph only references declared nodes and has no cycle
//! 4. **Mode**: manifest and registry agree on a sanctioned operating mode
//! 5. **Hash**: SHA256 over canonical (registry, index, graph) equals the manifest digest
//!
//! ## Layout
//!
//! ```text
//! 03_canonical_registry/
//! ├── global_registry.json
//! ├── acu_index.json
//! ├── dependency_graph.json
//! └── version_manifest.json
//! snapshots/
//! ├── current_snapshot.json      (rolling, replaced every publish)
//! └── archive/
//!     └── 1.0.0.json             (write-once per registry_version)
//! ```

pub mod artifact;
pub mod canonical;
pub mod checksum;
pub mod config;
pub mod error;
pub mod freeze;
pub mod gate;
pub mod snapshot;
pub mod validate;
pub mod version;

pub use artifact::{DependencyGraph, Edge, Index, RawArtifacts, Record, Registry, RegistryArtifacts, VersionManifest};
pub use canonical::{canonical_bytes, canonical_string};
pub use checksum::{compute_registry_hash, Checksum, HashInputs, HashedArtifact, HASH_ORDER};
pub use config::GateConfig;
pub use error::{ErrorKind, GateError, Result};
pub use freeze::{ChangeSet, ChangeSetError, ChangeSetProvider, FreezeGuard, GitChangeSetProvider, StaticChangeSet};
pub use gate::{RegistryGate, Status, ValidationReport};
pub use snapshot::{ArchivalSnapshot, PublicationState, PublishOutcome, RollingSnapshot, SnapshotManager};
pub use version::RegistryVersion;
