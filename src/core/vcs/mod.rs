//! Version-control abstraction used by the rename/commit coordinator.

mod git;

pub use git::{GitResolver, GitVcs};

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::utils::io;

/// Snapshot of a file's identity at one point in time: where it lives and
/// what it contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentRevision {
    pub path: PathBuf,
    pub digest: String,
}

impl ContentRevision {
    pub fn capture(path: &Path) -> Result<Self> {
        let bytes = io::read_bytes(path, &format!("capture revision of {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            digest: hex::encode(Sha256::digest(&bytes)),
        })
    }
}

/// One renamed file, as submitted to the VCS commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub before: ContentRevision,
    pub after: ContentRevision,
}

/// Result of the best-effort commit step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitStatus {
    Committed {
        #[serde(skip_serializing_if = "Option::is_none")]
        revision: Option<String>,
    },
    /// The backend cannot check anything in; the commit was skipped.
    Unavailable,
    Failed {
        message: String,
    },
    /// No commit was attempted (nothing to commit, or never reached).
    Skipped,
}

pub trait Vcs: Send {
    fn name(&self) -> &str;

    fn root(&self) -> &Path;

    /// Directory for tool state such as the working-tree lease.
    fn state_dir(&self) -> PathBuf {
        self.root().to_path_buf()
    }

    /// Record every change in a single commit.
    fn commit(&self, changes: &[ChangeRecord], message: &str) -> CommitStatus;
}

pub trait VcsResolver: Sync {
    fn resolve(&self, project_base: &Path) -> Option<Box<dyn Vcs>>;
}

/// Resolver for runs that deliberately have no version control.
pub struct NoVcs;

impl VcsResolver for NoVcs {
    fn resolve(&self, _project_base: &Path) -> Option<Box<dyn Vcs>> {
        None
    }
}
