//! Freeze-mode mutation firewall
//!
//! When the manifest sets `freeze_mode`, none of the protected canonical
//! files may differ from the reference baseline. The change-set comes from
//! a [`ChangeSetProvider`]; if it cannot be obtained, or a protected file
//! cannot be placed inside the repository it describes, the guard fails
//! closed.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use git2::{DiffOptions, Repository};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{GateError, Result};

/// The change-set could not be determined
#[derive(Error, Debug)]
#[error("{0}")]
pub struct ChangeSetError(pub String);

impl From<git2::Error> for ChangeSetError {
    fn from(e: git2::Error) -> Self {
        ChangeSetError(e.message().to_string())
    }
}

/// Paths changed since a reference, relative to `workdir`
#[derive(Debug, Clone)]
pub struct ChangeSet {
    pub workdir: PathBuf,
    pub paths: BTreeSet<String>,
}

impl ChangeSet {
    pub fn contains(&self, relative: &str) -> bool {
        self.paths.contains(relative)
    }
}

/// Source of "paths changed since a reference baseline"
pub trait ChangeSetProvider {
    fn list_changed_paths(&self, reference: &str) -> std::result::Result<ChangeSet, ChangeSetError>;
}

/// Normalize a repository-relative path for comparison
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/");
    while let Some(stripped) = normalized.strip_prefix("./") {
        normalized = stripped.to_string();
    }
    normalized
}

/// Absolute, symlink-resolved form of `path`. The file itself may be gone
/// (a deletion is a change), so the nearest existing ancestor is resolved
/// and the rest re-attached.
fn locate(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other),
        }
    }

    let mut existing = lexical.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(resolved) = existing.canonicalize() {
            return rest.iter().rev().fold(resolved, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return lexical,
        }
    }
}

/// Change-set computed with libgit2: reference tree vs. working directory
/// (index included), like `git diff --name-only <reference>`.
pub struct GitChangeSetProvider {
    repo_path: PathBuf,
}

impl GitChangeSetProvider {
    pub fn new(repo_path: impl AsRef<Path>) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
        }
    }
}

impl ChangeSetProvider for GitChangeSetProvider {
    fn list_changed_paths(&self, reference: &str) -> std::result::Result<ChangeSet, ChangeSetError> {
        let repo = Repository::discover(&self.repo_path)?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| ChangeSetError("repository has no working directory".to_string()))?
            .to_path_buf();
        let tree = repo.revparse_single(reference)?.peel_to_tree()?;

        let mut opts = DiffOptions::new();
        opts.include_untracked(false);
        let diff = repo.diff_tree_to_workdir_with_index(Some(&tree), Some(&mut opts))?;

        let mut paths = BTreeSet::new();
        for delta in diff.deltas() {
            for file in [delta.old_file(), delta.new_file()] {
                if let Some(path) = file.path() {
                    paths.insert(normalize_path(&path.to_string_lossy()));
                }
            }
        }

        debug!(reference, workdir = %workdir.display(), changed = paths.len(), "computed git change-set");
        Ok(ChangeSet { workdir, paths })
    }
}

/// Fixed change-set, for tests and for callers that compute the diff themselves
#[derive(Debug, Clone)]
pub struct StaticChangeSet {
    result: std::result::Result<ChangeSet, String>,
}

impl StaticChangeSet {
    /// `paths` are relative to `workdir`
    pub fn new<I, S>(workdir: impl AsRef<Path>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            result: Ok(ChangeSet {
                workdir: workdir.as_ref().to_path_buf(),
                paths: paths.into_iter().map(|p| normalize_path(p.as_ref())).collect(),
            }),
        }
    }

    /// A provider that can never answer
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self { result: Err(reason.into()) }
    }
}

impl ChangeSetProvider for StaticChangeSet {
    fn list_changed_paths(&self, _reference: &str) -> std::result::Result<ChangeSet, ChangeSetError> {
        self.result.clone().map_err(ChangeSetError)
    }
}

/// Mutation firewall over a fixed set of protected files
pub struct FreezeGuard<'a> {
    protected: Vec<PathBuf>,
    reference: &'a str,
    provider: &'a dyn ChangeSetProvider,
}

impl<'a> FreezeGuard<'a> {
    /// `protected` are filesystem paths, absolute or relative to the process directory
    pub fn new(protected: &[PathBuf], reference: &'a str, provider: &'a dyn ChangeSetProvider) -> Self {
        Self {
            protected: protected.to_vec(),
            reference,
            provider,
        }
    }

    fn unavailable(&self, reason: String) -> GateError {
        GateError::FreezeUnavailable {
            reference: self.reference.to_string(),
            reason,
        }
    }

    /// No-op unless `freeze_mode` is set
    pub fn enforce(&self, freeze_mode: bool) -> Result<()> {
        if !freeze_mode {
            return Ok(());
        }

        info!(reference = self.reference, "freeze mode active, checking protected files");

        let change_set = self
            .provider
            .list_changed_paths(self.reference)
            .map_err(|e| self.unavailable(e.0))?;
        let workdir = locate(&change_set.workdir);

        for protected in &self.protected {
            let located = locate(protected);
            let relative = located.strip_prefix(&workdir).map_err(|_| {
                self.unavailable(format!(
                    "protected file {} is outside repository {}",
                    protected.display(),
                    workdir.display()
                ))
            })?;
            let key = normalize_path(&relative.to_string_lossy());

            if change_set.contains(&key) {
                warn!(path = %key, "protected file modified under freeze");
                return Err(GateError::FreezeViolation { path: key });
            }
        }

        Ok(())
    }
}
