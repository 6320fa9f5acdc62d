use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::command;

use super::{ChangeRecord, CommitStatus, Vcs, VcsResolver};

/// Finds the git working tree that covers a project directory.
pub struct GitResolver;

impl VcsResolver for GitResolver {
    fn resolve(&self, project_base: &Path) -> Option<Box<dyn Vcs>> {
        GitVcs::discover(project_base).map(|vcs| Box::new(vcs) as Box<dyn Vcs>)
    }
}

#[derive(Debug, Clone)]
pub struct GitVcs {
    root: PathBuf,
    git_dir: PathBuf,
}

impl GitVcs {
    /// Returns None if the path is not within a git working tree
    /// (or git is not installed).
    pub fn discover(path: &Path) -> Option<Self> {
        let root = command::run_in_optional(path, "git", &["rev-parse", "--show-toplevel"])?;
        let git_dir = command::run_in_optional(path, "git", &["rev-parse", "--absolute-git-dir"])
            .unwrap_or_else(|| format!("{}/.git", root));
        Some(Self {
            root: PathBuf::from(root),
            git_dir: PathBuf::from(git_dir),
        })
    }

    /// Pathspec for `path` relative to the repository root.
    ///
    /// The parent is canonicalized rather than the file, since the file on
    /// one side of a rename no longer exists.
    fn pathspec(&self, path: &Path) -> String {
        let resolved = match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => std::fs::canonicalize(parent)
                .map(|p| p.join(name))
                .unwrap_or_else(|_| path.to_path_buf()),
            _ => path.to_path_buf(),
        };
        let root = std::fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        resolved
            .strip_prefix(&root)
            .unwrap_or(&resolved)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn is_tracked(&self, pathspec: &str) -> bool {
        command::run_in_optional(&self.root, "git", &["ls-files", "--", pathspec]).is_some()
    }

    fn git(&self, args: &[&str]) -> Result<()> {
        let subcommand = args.first().copied().unwrap_or("");
        match command::capture_in(&self.root, "git", args) {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(Error::vcs_command_failed(format!(
                "git {} failed: {}",
                subcommand,
                command::error_text(&output)
            ))),
            Err(e) => Err(Error::vcs_command_failed(format!(
                "git {} failed: {}",
                subcommand, e
            ))),
        }
    }

    fn can_check_in(&self) -> bool {
        match command::capture_in(&self.root, "git", &["rev-parse", "--is-inside-work-tree"]) {
            Ok(output) => {
                output.status.success() && String::from_utf8_lossy(&output.stdout).trim() == "true"
            }
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(_) => false,
        }
    }
}

impl Vcs for GitVcs {
    fn name(&self) -> &str {
        "git"
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn state_dir(&self) -> PathBuf {
        self.git_dir.clone()
    }

    fn commit(&self, changes: &[ChangeRecord], message: &str) -> CommitStatus {
        if !self.can_check_in() {
            return CommitStatus::Unavailable;
        }

        let mut commit_paths = Vec::with_capacity(changes.len() * 2);
        for change in changes {
            let before = self.pathspec(&change.before.path);
            let after = self.pathspec(&change.after.path);

            // The old path only exists for git if it was tracked.
            if self.is_tracked(&before) {
                if let Err(e) = self.git(&["rm", "--cached", "--quiet", "--", &before]) {
                    return CommitStatus::Failed { message: e.message };
                }
                commit_paths.push(before);
            }
            if let Err(e) = self.git(&["add", "--", &after]) {
                return CommitStatus::Failed { message: e.message };
            }
            commit_paths.push(after);
        }

        // Restrict the commit to the renamed paths so unrelated staged work stays staged.
        let mut args = vec!["commit", "--quiet", "-m", message, "--"];
        args.extend(commit_paths.iter().map(String::as_str));
        if let Err(e) = self.git(&args) {
            return CommitStatus::Failed { message: e.message };
        }

        CommitStatus::Committed {
            revision: command::run_in_optional(&self.root, "git", &["rev-parse", "HEAD"]),
        }
    }
}
