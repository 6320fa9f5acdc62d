//! Selection confirmation boundary.
//!
//! The core hands a candidate list to a `Confirmer` and gets back the subset
//! the user approved. It never truncates the list itself; above the soft cap
//! it only attaches a warning.

use serde::Serialize;

use crate::error::Result;
use crate::file::FileHandle;

/// Above this many files the external converter is known to be unreliable.
pub const DEFAULT_SELECTION_CAP: usize = 15;

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmRequest {
    pub candidates: Vec<FileHandle>,
    pub cap: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ConfirmRequest {
    pub fn new(candidates: Vec<FileHandle>, cap: usize) -> Self {
        let warning = if candidates.len() > cap {
            Some(format!(
                "WARNING: Converting more than {} files can cause unpredictable results",
                cap
            ))
        } else {
            None
        };
        Self {
            candidates,
            cap,
            warning,
        }
    }

    /// The entries a confirmer should offer pre-selected: the first `cap`.
    pub fn default_selection(&self) -> Vec<FileHandle> {
        self.candidates.iter().take(self.cap).cloned().collect()
    }
}

/// What came back from the confirmation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Selected(Vec<FileHandle>),
    /// The user declined, or approved nothing. Not an error.
    Cancelled,
}

impl Selection {
    /// Normalise an approved list: an empty approval means "nothing to do".
    pub fn from_files(files: Vec<FileHandle>) -> Self {
        if files.is_empty() {
            Selection::Cancelled
        } else {
            Selection::Selected(files)
        }
    }
}

pub trait Confirmer {
    fn confirm(&self, request: &ConfirmRequest) -> Result<Selection>;
}

/// Non-interactive confirmer that approves the pre-selected entries.
pub struct AcceptDefaults;

impl Confirmer for AcceptDefaults {
    fn confirm(&self, request: &ConfirmRequest) -> Result<Selection> {
        Ok(Selection::from_files(request.default_selection()))
    }
}

/// Non-interactive confirmer that approves every candidate.
pub struct AcceptAll;

impl Confirmer for AcceptAll {
    fn confirm(&self, request: &ConfirmRequest) -> Result<Selection> {
        Ok(Selection::from_files(request.candidates.clone()))
    }
}
