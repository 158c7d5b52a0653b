//! Registry version keys
//!
//! A `registry_version` names an archival snapshot file, so it must be a
//! plain file stem. Versions that parse as semver sort semantically.

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use semver::Version;

use crate::error::{GateError, Result};

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._+-]*$").expect("version key pattern is valid")
    })
}

/// A validated registry version, usable as an archive key
#[derive(Debug, Clone)]
pub struct RegistryVersion {
    raw: String,
    semver: Option<Version>,
}

impl RegistryVersion {
    /// Parse a version string from a manifest
    pub fn parse(version_str: &str) -> Result<Self> {
        let raw = version_str.trim();
        if !key_pattern().is_match(raw) || raw.contains("..") {
            return Err(GateError::Schema(format!(
                "registry_version '{}' is not a valid snapshot key",
                version_str
            )));
        }

        // Strip leading 'v' if present
        let semver = Version::parse(raw.strip_prefix('v').unwrap_or(raw)).ok();
        Ok(Self {
            raw: raw.to_string(),
            semver,
        })
    }

    /// The version exactly as declared
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// File name of the archival snapshot for this version
    pub fn archive_file_name(&self) -> String {
        format!("{}.json", self.raw)
    }

    pub fn semver(&self) -> Option<&Version> {
        self.semver.as_ref()
    }
}

impl fmt::Display for RegistryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for RegistryVersion {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for RegistryVersion {}

impl PartialOrd for RegistryVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RegistryVersion {
    /// Semver versions first, in semantic order, then the rest lexically
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.semver, &other.semver) {
            (Some(a), Some(b)) => a.cmp(b).then_with(|| self.raw.cmp(&other.raw)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}
