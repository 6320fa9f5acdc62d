//! History-preserving rename/commit/rename-back.
//!
//! 1. Validate the commit message and resolve the VCS (no side effects yet)
//! 2. Rename every source-extension file to the target extension
//! 3. Commit all renames at once so the VCS records them as moves
//! 4. Rename every target-extension file in the input back to the source extension
//!
//! The tree ends up where it started, with a commit that links each file's
//! history to its target-language name.

mod coordinator;

pub use coordinator::Coordinator;

use serde::Serialize;

use crate::vcs::CommitStatus;

/// Coordinator state. Any active phase can move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    MessageValidated,
    Renaming,
    Committing,
    RenamingBack,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamedFile {
    pub from: String,
    pub to: String,
}

/// What had happened when a phase stopped early. Nothing is rolled back:
/// `renamed` lists files the caller may need to restore by hand.
#[derive(Debug, Clone, Serialize)]
pub struct PartialRename {
    pub phase: Phase,
    pub renamed: Vec<RenamedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<String>,
    pub not_attempted: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitStatus>,
}

/// Result of a coordinator run that did not fail.
///
/// `success` is false only for the nothing-to-commit terminal value, in
/// which case no commit and no rename-back were attempted.
#[derive(Debug, Clone, Serialize)]
pub struct CommitOutcome {
    pub success: bool,
    pub phase: Phase,
    pub vcs: String,
    pub vcs_root: String,
    pub renamed: Vec<RenamedFile>,
    pub commit: CommitStatus,
    pub restored: Vec<RenamedFile>,
}

impl CommitOutcome {
    pub fn nothing_to_commit(&self) -> bool {
        !self.success && self.commit == CommitStatus::Skipped
    }
}
