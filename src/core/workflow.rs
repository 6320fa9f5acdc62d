//! End-to-end conversion flows: discover, confirm, commit renames, convert.

use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::convert::{CommitOutcome, Coordinator};
use crate::error::{Error, Result};
use crate::file::{Convertibility, ExtensionPair, FileHandle};
use crate::search::{self, find_matching, SearchCriteria};
use crate::selection::{ConfirmRequest, Confirmer, Selection, DEFAULT_SELECTION_CAP};
use crate::trigger::{ConversionContext, ConversionTrigger, Converter, TriggerGate, TriggerOutcome};
use crate::vcs::VcsResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowOutcome {
    /// Renames committed and restored, converter invoked.
    Converted,
    /// Converter invoked without a history commit.
    Staged,
    NothingToCommit,
    Cancelled,
    NoCandidates,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub outcome: WorkflowOutcome,
    pub candidates: usize,
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerOutcome>,
    /// Progress recorded when a run was cancelled part-way.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<serde_json::Value>,
}

impl WorkflowReport {
    fn new(outcome: WorkflowOutcome, candidates: usize) -> Self {
        Self {
            outcome,
            candidates,
            files: Vec::new(),
            warning: None,
            commit: None,
            trigger: None,
            partial: None,
        }
    }

    /// Informational cancellation becomes a report; anything else stays an error.
    fn from_cancellation(err: Error, candidates: usize) -> Result<Self> {
        if !err.is_informational() {
            return Err(err);
        }
        crate::log_status!("convert", "Conversion cancelled");
        let mut report = Self::new(WorkflowOutcome::Cancelled, candidates);
        report.partial = err.details.get("partial").cloned();
        Ok(report)
    }
}

/// Collaborators shared by every flow.
pub struct Workflow<'a> {
    pub pair: ExtensionPair,
    pub rules: Convertibility,
    pub selection_cap: usize,
    pub resolver: &'a dyn VcsResolver,
    pub confirmer: &'a dyn Confirmer,
    pub converter: &'a dyn Converter,
    pub cancel: CancelToken,
}

impl<'a> Workflow<'a> {
    pub fn new(
        pair: ExtensionPair,
        resolver: &'a dyn VcsResolver,
        confirmer: &'a dyn Confirmer,
        converter: &'a dyn Converter,
    ) -> Self {
        Self {
            rules: Convertibility::for_pair(&pair),
            pair,
            selection_cap: DEFAULT_SELECTION_CAP,
            resolver,
            confirmer,
            converter,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_rules(mut self, rules: Convertibility) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_selection_cap(mut self, cap: usize) -> Self {
        self.selection_cap = cap;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Search `root`, let the user confirm the candidates, then convert.
    pub fn search_and_convert(
        &self,
        root: &Path,
        criteria: &SearchCriteria,
        message: &str,
    ) -> Result<WorkflowReport> {
        let candidates = match search::run_search(root, criteria, &self.rules, &self.cancel) {
            Ok(found) => found,
            Err(err) => return WorkflowReport::from_cancellation(err, 0),
        };
        if candidates.is_empty() {
            crate::log_status!("search", "No convertible files matched");
            return Ok(WorkflowReport::new(WorkflowOutcome::NoCandidates, 0));
        }

        let total = candidates.len();
        let request = ConfirmRequest::new(candidates, self.selection_cap);
        if let Some(warning) = &request.warning {
            crate::log_status!("search", "{}", warning);
        }

        let mut report = match self.confirmer.confirm(&request)? {
            Selection::Cancelled => {
                crate::log_status!("search", "No files selected");
                WorkflowReport::new(WorkflowOutcome::Cancelled, total)
            }
            Selection::Selected(files) => {
                self.finish(files, message, root, criteria.auto_commit, total)?
            }
        };
        report.warning = request.warning;
        Ok(report)
    }

    /// Convert the files under `root` whose paths end with one of the
    /// newline-separated names. No confirmation step.
    pub fn convert_list(
        &self,
        root: &Path,
        names: &str,
        auto_commit: bool,
        message: &str,
    ) -> Result<WorkflowReport> {
        let criteria = SearchCriteria::new()
            .with_name_list(names)
            .with_auto_commit(auto_commit);
        let Some(names) = &criteria.names else {
            return Ok(WorkflowReport::new(WorkflowOutcome::NoCandidates, 0));
        };

        let files = search::filter_by_names(root, names, &self.rules)?;
        if files.is_empty() {
            return Ok(WorkflowReport::new(WorkflowOutcome::NoCandidates, 0));
        }
        let total = files.len();
        self.finish(files, message, root, criteria.auto_commit, total)
    }

    /// Convert explicitly chosen paths. Directories contribute their
    /// convertible descendants.
    pub fn convert_selected(
        &self,
        paths: &[PathBuf],
        project_base: &Path,
        message: &str,
    ) -> Result<WorkflowReport> {
        let files = self.expand_selection(paths)?;
        if files.is_empty() {
            return Ok(WorkflowReport::new(WorkflowOutcome::NoCandidates, 0));
        }
        let total = files.len();
        self.finish(files, message, project_base, true, total)
    }

    fn expand_selection(&self, paths: &[PathBuf]) -> Result<Vec<FileHandle>> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for path in paths {
            let expanded = if path.is_dir() {
                find_matching(path, &self.rules, |_| Ok(true))?
            } else {
                vec![FileHandle::new(path)]
            };
            for file in expanded {
                if seen.insert(file.path().to_path_buf()) {
                    files.push(file);
                }
            }
        }
        Ok(files)
    }

    fn finish(
        &self,
        mut files: Vec<FileHandle>,
        message: &str,
        project_base: &Path,
        auto_commit: bool,
        candidates: usize,
    ) -> Result<WorkflowReport> {
        for file in &files {
            crate::log_status!("convert", "Preparing to convert file: {}", file);
        }
        let context = ConversionContext::new(project_base);
        let trigger = ConversionTrigger::new(self.converter);

        if !auto_commit {
            let mut report = WorkflowReport::new(WorkflowOutcome::Staged, candidates);
            report.trigger = Some(trigger.fire(&files, &context, TriggerGate::WithoutCommit)?);
            report.files = labels(&files, project_base);
            return Ok(report);
        }

        let mut coordinator = Coordinator::new(self.pair.clone()).with_cancel(self.cancel.clone());
        let outcome =
            match coordinator.execute_in_background(&mut files, message, project_base, self.resolver) {
                Ok(outcome) => outcome,
                Err(err) => return WorkflowReport::from_cancellation(err, candidates),
            };

        let gate = TriggerGate::Committed(outcome.success);
        let mut report = if outcome.nothing_to_commit() {
            WorkflowReport::new(WorkflowOutcome::NothingToCommit, candidates)
        } else {
            WorkflowReport::new(WorkflowOutcome::Converted, candidates)
        };
        report.trigger = Some(trigger.fire(&files, &context, gate)?);
        report.files = labels(&files, project_base);
        report.commit = Some(outcome);
        Ok(report)
    }
}

fn labels(files: &[FileHandle], root: &Path) -> Vec<String> {
    files.iter().map(|f| f.relative_to(root)).collect()
}
