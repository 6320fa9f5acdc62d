//! Exclusive per-working-tree execution guard.
//!
//! The lock file holds the lease token on its first line and the owning
//! process id on the second. A lock whose owner is no longer running is
//! stale and gets replaced.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::command;

pub const LOCK_FILE_NAME: &str = "carryover.lock";

/// Held for the duration of one coordinator run. The lock file is created
/// atomically and removed when the lease is dropped.
#[derive(Debug)]
pub struct WorktreeLease {
    path: PathBuf,
    token: String,
}

/// Contents of an existing lock file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LockRecord {
    token: String,
    pid: Option<u32>,
}

impl LockRecord {
    fn read(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        let mut lines = content.lines().map(str::trim);
        let token = lines.next().unwrap_or("").to_string();
        let pid = lines.next().and_then(|l| l.parse().ok());
        Some(Self { token, pid })
    }

    /// Only a recorded owner that is gone makes a lock stale.
    fn is_stale(&self) -> bool {
        match self.pid {
            Some(pid) => !process_alive(pid),
            None => false,
        }
    }
}

fn process_alive(pid: u32) -> bool {
    if pid == std::process::id() {
        return true;
    }
    let proc_dir = Path::new("/proc");
    if proc_dir.is_dir() {
        return proc_dir.join(pid.to_string()).exists();
    }
    if cfg!(unix) {
        let pid = pid.to_string();
        return match command::capture_in(Path::new("/"), "kill", &["-0", &pid]) {
            Ok(output) => output.status.success(),
            // Without a way to check, assume the owner is still running.
            Err(_) => true,
        };
    }
    true
}

fn create(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

impl WorktreeLease {
    pub fn acquire(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join(LOCK_FILE_NAME);
        let token = uuid::Uuid::new_v4().to_string();

        let mut file = match create(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = LockRecord::read(&path);
                match holder.filter(LockRecord::is_stale) {
                    Some(stale) => {
                        crate::log_status!(
                            "convert",
                            "Removing stale lock left by process {}",
                            stale.pid.unwrap_or_default()
                        );
                        let _ = fs::remove_file(&path);
                        create(&path).map_err(|e| Self::open_error(&path, e))?
                    }
                    None => return Err(Self::open_error(&path, e)),
                }
            }
            Err(e) => return Err(Self::open_error(&path, e)),
        };

        if let Err(e) = writeln!(file, "{}\n{}", token, std::process::id()) {
            let _ = fs::remove_file(&path);
            return Err(Error::internal_io(
                e.to_string(),
                Some(format!("write {}", path.display())),
            ));
        }

        Ok(Self { path, token })
    }

    fn open_error(path: &Path, e: std::io::Error) -> Error {
        if e.kind() == ErrorKind::AlreadyExists {
            let holder = LockRecord::read(path).map(|r| r.token);
            return Error::busy(path.display().to_string(), holder);
        }
        Error::internal_io(e.to_string(), Some(format!("create {}", path.display())))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorktreeLease {
    fn drop(&mut self) {
        // Only remove the lock if it is still ours.
        let still_ours = LockRecord::read(&self.path)
            .map(|r| r.token == self.token)
            .unwrap_or(false);
        if still_ours {
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lease_on_same_tree_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let first = WorktreeLease::acquire(dir.path()).unwrap();

        let err = WorktreeLease::acquire(dir.path()).unwrap_err();

        assert_eq!(err.code.as_str(), "convert.busy");
        assert_eq!(err.details["holder"], first.token());
    }

    #[test]
    fn dropping_lease_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        {
            let lease = WorktreeLease::acquire(dir.path()).unwrap();
            assert!(lease.path().exists());
        }
        assert!(!dir.path().join(LOCK_FILE_NAME).exists());
        assert!(WorktreeLease::acquire(dir.path()).is_ok());
    }

    #[test]
    fn lock_records_owner_process() {
        let dir = tempfile::tempdir().unwrap();
        let lease = WorktreeLease::acquire(dir.path()).unwrap();

        let record = LockRecord::read(lease.path()).unwrap();

        assert_eq!(record.token, lease.token());
        assert_eq!(record.pid, Some(std::process::id()));
    }

    #[test]
    fn leaked_lease_of_a_running_process_stays_busy() {
        let dir = tempfile::tempdir().unwrap();
        std::mem::forget(WorktreeLease::acquire(dir.path()).unwrap());

        let err = WorktreeLease::acquire(dir.path()).unwrap_err();

        assert_eq!(err.code.as_str(), "convert.busy");
    }

    #[test]
    fn lock_of_a_dead_process_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE_NAME);
        // Above any real pid_max.
        fs::write(&path, "old-token\n4000000000\n").unwrap();

        let lease = WorktreeLease::acquire(dir.path()).unwrap();

        assert_ne!(lease.token(), "old-token");
        assert_eq!(LockRecord::read(&path).unwrap().token, lease.token());
    }

    #[test]
    fn lock_without_owner_is_not_treated_as_stale() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LOCK_FILE_NAME), "old-token\n").unwrap();

        let err = WorktreeLease::acquire(dir.path()).unwrap_err();

        assert_eq!(err.code.as_str(), "convert.busy");
        assert_eq!(err.details["holder"], "old-token");
    }
}
