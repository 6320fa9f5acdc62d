use std::path::Path;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::file::{ExtensionPair, FileHandle};
use crate::lease::WorktreeLease;
use crate::vcs::{ChangeRecord, CommitStatus, Vcs, VcsResolver};

use super::{CommitOutcome, PartialRename, Phase, RenamedFile};

/// Drives one rename → commit → rename-back sequence.
#[derive(Debug, Clone)]
pub struct Coordinator {
    pair: ExtensionPair,
    cancel: CancelToken,
    phase: Phase,
}

impl Coordinator {
    pub fn new(pair: ExtensionPair) -> Self {
        Self {
            pair,
            cancel: CancelToken::new(),
            phase: Phase::Idle,
        }
    }

    /// Cancellation is honoured before each forward rename only. Once the
    /// commit starts, the sequence runs to the end so the tree is restored.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pair(&self) -> &ExtensionPair {
        &self.pair
    }

    /// Run `execute` on a worker thread and hand the result back to the caller's thread.
    pub fn execute_in_background(
        &mut self,
        files: &mut [FileHandle],
        message: &str,
        project_base: &Path,
        resolver: &dyn VcsResolver,
    ) -> Result<CommitOutcome> {
        std::thread::scope(|scope| {
            let worker = scope.spawn(|| self.execute(files, message, project_base, resolver));
            worker
                .join()
                .unwrap_or_else(|_| Err(Error::internal_unexpected("conversion worker panicked")))
        })
    }

    pub fn execute(
        &mut self,
        files: &mut [FileHandle],
        message: &str,
        project_base: &Path,
        resolver: &dyn VcsResolver,
    ) -> Result<CommitOutcome> {
        self.phase = Phase::Idle;
        let result = self.run(files, message, project_base, resolver);
        if result.is_err() {
            self.phase = Phase::Failed;
        }
        result
    }

    fn run(
        &mut self,
        files: &mut [FileHandle],
        message: &str,
        project_base: &Path,
        resolver: &dyn VcsResolver,
    ) -> Result<CommitOutcome> {
        if message.trim().is_empty() {
            return Err(Error::empty_commit_message());
        }
        validate_files(files)?;
        self.phase = Phase::MessageValidated;

        let vcs = resolver
            .resolve(project_base)
            .ok_or_else(|| Error::no_version_control(project_base.display().to_string()))?;
        let _lease = WorktreeLease::acquire(&vcs.state_dir())?;

        self.phase = Phase::Renaming;
        let (changes, renamed) = self.rename_forward(files, vcs.root())?;

        if changes.is_empty() {
            crate::log_status!("convert", "No files found to commit");
            self.phase = Phase::Done;
            return Ok(self.outcome(false, vcs.as_ref(), renamed, CommitStatus::Skipped, Vec::new()));
        }

        self.phase = Phase::Committing;
        let commit = vcs.commit(&changes, message);
        match &commit {
            CommitStatus::Committed { revision } => crate::log_status!(
                "convert",
                "Committed {} rename(s) {}",
                changes.len(),
                revision.as_deref().unwrap_or("")
            ),
            CommitStatus::Unavailable => crate::log_status!(
                "convert",
                "{} cannot check in from this tree; restoring files without a commit",
                vcs.name()
            ),
            CommitStatus::Failed { message } => {
                crate::log_status!("convert", "Commit failed: {}", message)
            }
            CommitStatus::Skipped => {}
        }

        self.phase = Phase::RenamingBack;
        let restored = self.rename_back(files, vcs.root(), &commit)?;

        self.phase = Phase::Done;
        Ok(self.outcome(true, vcs.as_ref(), renamed, commit, restored))
    }

    fn rename_forward(
        &self,
        files: &mut [FileHandle],
        root: &Path,
    ) -> Result<(Vec<ChangeRecord>, Vec<RenamedFile>)> {
        let mut changes = Vec::new();
        let mut renamed = Vec::new();

        let pending: Vec<usize> = (0..files.len())
            .filter(|&i| files[i].has_extension(&self.pair.source))
            .collect();

        for (n, &i) in pending.iter().enumerate() {
            let rest = &pending[n + 1..];

            if self.cancel.is_cancelled() {
                let remaining = labels(files, &pending[n..], root);
                let mut err = Error::cancelled("rename");
                err.details["partial"] = partial_value(PartialRename {
                    phase: Phase::Renaming,
                    renamed,
                    failed: None,
                    not_attempted: remaining,
                    commit: None,
                });
                return Err(err);
            }

            let from = files[i].relative_to(root);
            let before = match files[i].content_revision() {
                Ok(rev) => rev,
                Err(e) => {
                    let partial = self.partial(Phase::Renaming, renamed, &from, labels(files, rest, root), None);
                    return Err(Error::rename_failed(from, e.to_string(), partial));
                }
            };

            crate::log_status!("convert", "Renaming file `{}` to `.{}`", from, self.pair.target);
            if let Err(e) = files[i].rename_extension(&self.pair.target) {
                let partial = self.partial(Phase::Renaming, renamed, &from, labels(files, rest, root), None);
                return Err(Error::rename_failed(from, e.to_string(), partial));
            }
            let to = files[i].relative_to(root);
            renamed.push(RenamedFile {
                from: from.clone(),
                to: to.clone(),
            });

            let after = match files[i].content_revision() {
                Ok(rev) => rev,
                Err(e) => {
                    let partial = self.partial(Phase::Renaming, renamed, &to, labels(files, rest, root), None);
                    return Err(Error::rename_failed(to, e.to_string(), partial));
                }
            };
            changes.push(ChangeRecord { before, after });
        }

        Ok((changes, renamed))
    }

    /// Every target-extension file in the input goes back to the source
    /// extension, including ones that already carried it on entry.
    fn rename_back(
        &self,
        files: &mut [FileHandle],
        root: &Path,
        commit: &CommitStatus,
    ) -> Result<Vec<RenamedFile>> {
        let mut restored = Vec::new();

        let pending: Vec<usize> = (0..files.len())
            .filter(|&i| files[i].has_extension(&self.pair.target))
            .collect();

        for (n, &i) in pending.iter().enumerate() {
            let from = files[i].relative_to(root);
            crate::log_status!("convert", "Renaming file `{}` back to `.{}`", from, self.pair.source);

            if let Err(e) = files[i].rename_extension(&self.pair.source) {
                let partial = self.partial(
                    Phase::RenamingBack,
                    restored,
                    &from,
                    labels(files, &pending[n + 1..], root),
                    Some(commit.clone()),
                );
                return Err(Error::rename_failed(from, e.to_string(), partial));
            }
            restored.push(RenamedFile {
                from,
                to: files[i].relative_to(root),
            });
        }

        Ok(restored)
    }

    fn partial(
        &self,
        phase: Phase,
        renamed: Vec<RenamedFile>,
        failed: &str,
        not_attempted: Vec<String>,
        commit: Option<CommitStatus>,
    ) -> PartialRename {
        PartialRename {
            phase,
            renamed,
            failed: Some(failed.to_string()),
            not_attempted,
            commit,
        }
    }

    fn outcome(
        &self,
        success: bool,
        vcs: &dyn Vcs,
        renamed: Vec<RenamedFile>,
        commit: CommitStatus,
        restored: Vec<RenamedFile>,
    ) -> CommitOutcome {
        CommitOutcome {
            success,
            phase: self.phase,
            vcs: vcs.name().to_string(),
            vcs_root: vcs.root().display().to_string(),
            renamed,
            commit,
            restored,
        }
    }
}

fn labels(files: &[FileHandle], indices: &[usize], root: &Path) -> Vec<String> {
    indices.iter().map(|&i| files[i].relative_to(root)).collect()
}

fn partial_value(partial: PartialRename) -> serde_json::Value {
    serde_json::to_value(partial).unwrap_or(serde_json::Value::Null)
}

fn validate_files(files: &[FileHandle]) -> Result<()> {
    for file in files {
        if file.is_dir() {
            return Err(Error::validation_invalid_argument(
                "files",
                "Directories cannot be renamed; select the files inside instead",
                Some(file.to_string()),
                None,
            ));
        }
        if !file.is_writable() {
            return Err(Error::validation_invalid_argument(
                "files",
                "File is missing or not writable",
                Some(file.to_string()),
                None,
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct Recorder {
        root: PathBuf,
        status: CommitStatus,
        commits: Arc<Mutex<Vec<(Vec<ChangeRecord>, String)>>>,
        resolutions: Arc<Mutex<usize>>,
        /// Directory created while committing, to block a later rename.
        squat: Option<PathBuf>,
    }

    impl Recorder {
        fn new(root: &Path, status: CommitStatus) -> Self {
            Self {
                root: root.to_path_buf(),
                status,
                commits: Arc::new(Mutex::new(Vec::new())),
                resolutions: Arc::new(Mutex::new(0)),
                squat: None,
            }
        }

        fn squatting_on(mut self, path: PathBuf) -> Self {
            self.squat = Some(path);
            self
        }

        fn commit_count(&self) -> usize {
            self.commits.lock().unwrap().len()
        }
    }

    impl Vcs for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn root(&self) -> &Path {
            &self.root
        }

        fn commit(&self, changes: &[ChangeRecord], message: &str) -> CommitStatus {
            // Both sides of each rename must be on disk state at commit time.
            for change in changes {
                assert!(change.after.path.exists());
                assert!(!change.before.path.exists());
            }
            self.commits
                .lock()
                .unwrap()
                .push((changes.to_vec(), message.to_string()));
            if let Some(squat) = &self.squat {
                fs::create_dir_all(squat).unwrap();
            }
            self.status.clone()
        }
    }

    impl VcsResolver for Recorder {
        fn resolve(&self, _project_base: &Path) -> Option<Box<dyn Vcs>> {
            *self.resolutions.lock().unwrap() += 1;
            Some(Box::new(self.clone()))
        }
    }

    fn write(dir: &Path, name: &str) -> FileHandle {
        let path = dir.join(name);
        fs::write(&path, format!("// {}\n", name)).unwrap();
        FileHandle::new(path)
    }

    fn coordinator() -> Coordinator {
        Coordinator::new(ExtensionPair::default())
    }

    #[test]
    fn blank_message_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = vec![write(dir.path(), "A.java"), write(dir.path(), "B.java")];
        let vcs = Recorder::new(dir.path(), CommitStatus::Committed { revision: None });

        let mut c = coordinator();
        let err = c.execute(&mut files, "   ", dir.path(), &vcs).unwrap_err();

        assert_eq!(err.code.as_str(), "convert.empty_commit_message");
        assert_eq!(c.phase(), Phase::Failed);
        assert!(dir.path().join("A.java").exists());
        assert!(dir.path().join("B.java").exists());
        assert_eq!(*vcs.resolutions.lock().unwrap(), 0);
        assert_eq!(vcs.commit_count(), 0);
    }

    #[test]
    fn missing_vcs_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = vec![write(dir.path(), "A.java")];

        let err = coordinator()
            .execute(&mut files, "convert", dir.path(), &crate::vcs::NoVcs)
            .unwrap_err();

        assert_eq!(err.code.as_str(), "convert.no_version_control");
        assert!(dir.path().join("A.java").exists());
        assert!(!dir.path().join("A.kt").exists());
    }

    #[test]
    fn renames_commits_and_restores() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = vec![write(dir.path(), "A.java"), write(dir.path(), "B.java")];
        let vcs = Recorder::new(dir.path(), CommitStatus::Committed { revision: Some("abc".into()) });

        let mut c = coordinator();
        let outcome = c.execute(&mut files, "Convert A and B", dir.path(), &vcs).unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.phase, Phase::Done);
        assert_eq!(outcome.renamed.len(), 2);
        assert_eq!(outcome.restored.len(), 2);
        assert_eq!(outcome.renamed[0], RenamedFile { from: "A.java".into(), to: "A.kt".into() });

        let commits = vcs.commits.lock().unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].0.len(), 2);
        assert_eq!(commits[0].1, "Convert A and B");
        assert_eq!(commits[0].0[0].before.digest, commits[0].0[0].after.digest);

        assert!(dir.path().join("A.java").exists());
        assert!(dir.path().join("B.java").exists());
        assert_eq!(files[0].path(), dir.path().join("A.java"));
    }

    #[test]
    fn already_converted_files_are_nothing_to_commit() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = vec![write(dir.path(), "A.kt"), write(dir.path(), "B.kt")];
        let vcs = Recorder::new(dir.path(), CommitStatus::Committed { revision: None });

        let outcome = coordinator().execute(&mut files, "convert", dir.path(), &vcs).unwrap();

        assert!(!outcome.success);
        assert!(outcome.nothing_to_commit());
        assert!(outcome.renamed.is_empty());
        assert!(outcome.restored.is_empty());
        assert_eq!(vcs.commit_count(), 0);
        assert!(dir.path().join("A.kt").exists());
        assert!(dir.path().join("B.kt").exists());
    }

    #[test]
    fn empty_input_is_nothing_to_commit() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = Recorder::new(dir.path(), CommitStatus::Committed { revision: None });

        let outcome = coordinator().execute(&mut [], "convert", dir.path(), &vcs).unwrap();

        assert!(outcome.nothing_to_commit());
        assert_eq!(vcs.commit_count(), 0);
    }

    #[test]
    fn target_extension_files_are_skipped_in_rename_phase() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = vec![write(dir.path(), "A.java"), write(dir.path(), "Done.kt")];
        let vcs = Recorder::new(dir.path(), CommitStatus::Committed { revision: None });

        let outcome = coordinator().execute(&mut files, "convert", dir.path(), &vcs).unwrap();

        let commits = vcs.commits.lock().unwrap();
        assert_eq!(commits[0].0.len(), 1);
        assert_eq!(outcome.renamed.len(), 1);
        // Rename-back covers every target-extension file in the input.
        assert_eq!(outcome.restored.len(), 2);
        assert!(dir.path().join("Done.java").exists());
    }

    #[test]
    fn unavailable_commit_still_restores_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = vec![write(dir.path(), "A.java"), write(dir.path(), "B.java")];
        let vcs = Recorder::new(dir.path(), CommitStatus::Unavailable);

        let outcome = coordinator().execute(&mut files, "convert", dir.path(), &vcs).unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.commit, CommitStatus::Unavailable);
        assert_eq!(outcome.renamed.len(), outcome.restored.len());
        assert!(dir.path().join("A.java").exists());
        assert!(dir.path().join("B.java").exists());
    }

    #[test]
    fn failed_commit_still_restores_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = vec![write(dir.path(), "A.java")];
        let vcs = Recorder::new(
            dir.path(),
            CommitStatus::Failed { message: "no identity".into() },
        );

        let outcome = coordinator().execute(&mut files, "convert", dir.path(), &vcs).unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.restored.len(), 1);
        assert!(dir.path().join("A.java").exists());
    }

    #[test]
    fn directories_are_rejected_before_any_rename() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("pkg.java");
        fs::create_dir_all(&pkg).unwrap();
        let mut files = vec![write(dir.path(), "A.java"), FileHandle::new(&pkg)];
        let vcs = Recorder::new(dir.path(), CommitStatus::Committed { revision: None });

        let err = coordinator().execute(&mut files, "convert", dir.path(), &vcs).unwrap_err();

        assert_eq!(err.details["field"], "files");
        assert!(dir.path().join("A.java").exists());
        assert_eq!(vcs.commit_count(), 0);
    }

    #[test]
    fn rename_failure_reports_partial_progress() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = vec![
            write(dir.path(), "A.java"),
            write(dir.path(), "B.java"),
            write(dir.path(), "C.java"),
        ];
        // A directory squatting on the target name makes B's rename fail.
        fs::create_dir_all(dir.path().join("B.kt").join("occupied")).unwrap();
        let vcs = Recorder::new(dir.path(), CommitStatus::Committed { revision: None });

        let mut c = coordinator();
        let err = c.execute(&mut files, "convert", dir.path(), &vcs).unwrap_err();

        assert_eq!(err.code.as_str(), "convert.rename_failed");
        assert_eq!(c.phase(), Phase::Failed);
        let partial = &err.details["partial"];
        assert_eq!(partial["phase"], "renaming");
        assert_eq!(partial["renamed"][0]["to"], "A.kt");
        assert_eq!(partial["failed"], "B.java");
        assert_eq!(partial["not_attempted"][0], "C.java");
        // No rollback: A stays renamed, C is untouched, nothing committed.
        assert!(dir.path().join("A.kt").exists());
        assert!(dir.path().join("C.java").exists());
        assert_eq!(vcs.commit_count(), 0);
    }

    #[test]
    fn existing_target_file_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = vec![write(dir.path(), "A.java")];
        fs::write(dir.path().join("A.kt"), "class A\n").unwrap();
        let vcs = Recorder::new(dir.path(), CommitStatus::Committed { revision: None });

        let err = coordinator().execute(&mut files, "convert", dir.path(), &vcs).unwrap_err();

        assert_eq!(err.code.as_str(), "convert.rename_failed");
        assert_eq!(err.details["partial"]["failed"], "A.java");
        assert!(err.details["partial"]["renamed"].as_array().unwrap().is_empty());
        assert_eq!(fs::read_to_string(dir.path().join("A.kt")).unwrap(), "class A\n");
        assert_eq!(fs::read_to_string(dir.path().join("A.java")).unwrap(), "// A.java\n");
        assert_eq!(vcs.commit_count(), 0);
    }

    #[test]
    fn rename_back_failure_reports_committed_progress() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = vec![
            write(dir.path(), "A.java"),
            write(dir.path(), "B.java"),
            write(dir.path(), "C.java"),
        ];
        let vcs = Recorder::new(dir.path(), CommitStatus::Committed { revision: Some("abc".into()) })
            .squatting_on(dir.path().join("B.java"));

        let mut c = coordinator();
        let err = c.execute(&mut files, "convert", dir.path(), &vcs).unwrap_err();

        assert_eq!(err.code.as_str(), "convert.rename_failed");
        assert_eq!(c.phase(), Phase::Failed);
        let partial = &err.details["partial"];
        assert_eq!(partial["phase"], "renaming_back");
        assert_eq!(partial["renamed"][0]["from"], "A.kt");
        assert_eq!(partial["renamed"][0]["to"], "A.java");
        assert_eq!(partial["failed"], "B.kt");
        assert_eq!(partial["not_attempted"][0], "C.kt");
        assert_eq!(partial["commit"]["status"], "committed");
        assert_eq!(partial["commit"]["revision"], "abc");
        // The commit already landed; the rest of the tree is left as it was.
        assert_eq!(vcs.commit_count(), 1);
        assert!(dir.path().join("A.java").is_file());
        assert!(dir.path().join("B.kt").is_file());
        assert!(dir.path().join("C.kt").is_file());
    }

    #[test]
    fn cancellation_stops_forward_renames() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = vec![write(dir.path(), "A.java")];
        let vcs = Recorder::new(dir.path(), CommitStatus::Committed { revision: None });
        let token = CancelToken::new();
        token.cancel();

        let err = coordinator()
            .with_cancel(token)
            .execute(&mut files, "convert", dir.path(), &vcs)
            .unwrap_err();

        assert!(err.is_informational());
        assert_eq!(err.details["partial"]["not_attempted"][0], "A.java");
        assert!(dir.path().join("A.java").exists());
        assert_eq!(vcs.commit_count(), 0);
    }

    #[test]
    fn concurrent_run_on_same_tree_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = vec![write(dir.path(), "A.java")];
        let vcs = Recorder::new(dir.path(), CommitStatus::Committed { revision: None });
        let _held = WorktreeLease::acquire(dir.path()).unwrap();

        let err = coordinator().execute(&mut files, "convert", dir.path(), &vcs).unwrap_err();

        assert_eq!(err.code.as_str(), "convert.busy");
        assert!(dir.path().join("A.java").exists());
    }

    #[test]
    fn background_execution_returns_outcome_to_caller() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = vec![write(dir.path(), "A.java")];
        let vcs = Recorder::new(dir.path(), CommitStatus::Committed { revision: None });

        let outcome = coordinator()
            .execute_in_background(&mut files, "convert", dir.path(), &vcs)
            .unwrap();

        assert!(outcome.success);
        assert_eq!(vcs.commit_count(), 1);
        assert!(dir.path().join("A.java").exists());
    }
}
