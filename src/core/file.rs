//! File handles and the rules that decide whether a file can be converted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Source and target extensions of a conversion (without the leading dot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionPair {
    pub source: String,
    pub target: String,
}

impl Default for ExtensionPair {
    fn default() -> Self {
        Self {
            source: "java".to_string(),
            target: "kt".to_string(),
        }
    }
}

impl ExtensionPair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Result<Self> {
        let source = normalize_extension(&source.into(), "source_extension")?;
        let target = normalize_extension(&target.into(), "target_extension")?;
        if source == target {
            return Err(Error::validation_invalid_argument(
                "target_extension",
                "Source and target extensions must differ",
                Some(target),
                None,
            ));
        }
        Ok(Self { source, target })
    }
}

fn normalize_extension(raw: &str, field: &str) -> Result<String> {
    let ext = raw.trim().trim_start_matches('.');
    if ext.is_empty() || ext.contains(['/', '\\', '.']) {
        return Err(Error::validation_invalid_argument(
            field,
            format!("'{}' is not a valid file extension", raw),
            None,
            None,
        ));
    }
    Ok(ext.to_string())
}

/// A file in the working tree.
///
/// The handle keeps its identity across the temporary extension swap:
/// `rename_extension` updates the stored path in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FileHandle {
    path: PathBuf,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    pub fn has_extension(&self, ext: &str) -> bool {
        self.extension() == Some(ext)
    }

    pub fn is_dir(&self) -> bool {
        self.path.is_dir()
    }

    pub fn is_writable(&self) -> bool {
        fs::metadata(&self.path)
            .map(|m| !m.permissions().readonly())
            .unwrap_or(false)
    }

    /// Canonical path as text, falling back to the stored path when the file
    /// cannot be resolved (e.g. it was removed after discovery).
    pub fn canonical_path(&self) -> String {
        fs::canonicalize(&self.path)
            .unwrap_or_else(|_| self.path.clone())
            .to_string_lossy()
            .to_string()
    }

    /// Path relative to `root` for display and VCS pathspecs.
    pub fn relative_to(&self, root: &Path) -> String {
        self.path
            .strip_prefix(root)
            .unwrap_or(&self.path)
            .to_string_lossy()
            .to_string()
    }

    /// Current content revision, read from disk.
    pub fn content_revision(&self) -> Result<crate::vcs::ContentRevision> {
        crate::vcs::ContentRevision::capture(&self.path)
    }

    /// Rename the file on disk to the same stem with a new extension.
    ///
    /// Refuses to replace anything already at the destination.
    pub fn rename_extension(&mut self, extension: &str) -> std::io::Result<()> {
        let renamed = self.path.with_extension(extension);
        if fs::symlink_metadata(&renamed).is_ok() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", renamed.display()),
            ));
        }
        fs::rename(&self.path, &renamed)?;
        self.path = renamed;
        Ok(())
    }
}

impl std::fmt::Display for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Directory marker used when no exclusions are configured.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &["build"];

/// The "convertible" predicate applied at every traversal step.
#[derive(Debug, Clone)]
pub struct Convertibility {
    pub extension: String,
    pub excluded_dirs: Vec<String>,
}

impl Convertibility {
    pub fn new(extension: impl Into<String>, excluded_dirs: Vec<String>) -> Self {
        Self {
            extension: extension.into(),
            excluded_dirs,
        }
    }

    pub fn for_pair(pair: &ExtensionPair) -> Self {
        Self::new(
            pair.source.clone(),
            DEFAULT_EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect(),
        )
    }

    /// True when a directory name marks an excluded subtree.
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.excluded_dirs.iter().any(|d| d == name)
    }

    /// True when any directory component of `path` below `root` is excluded.
    pub fn is_under_excluded(&self, path: &Path, root: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let parent = relative.parent().unwrap_or(Path::new(""));
        parent.components().any(|c| match c {
            Component::Normal(name) => self.is_excluded_dir(&name.to_string_lossy()),
            _ => false,
        })
    }

    pub fn accepts(&self, file: &FileHandle, root: &Path) -> bool {
        file.has_extension(&self.extension)
            && !file.is_dir()
            && file.is_writable()
            && !self.is_under_excluded(file.path(), root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_pair_strips_leading_dot() {
        let pair = ExtensionPair::new(".java", "kt").unwrap();
        assert_eq!(pair.source, "java");
        assert_eq!(pair.target, "kt");
    }

    #[test]
    fn extension_pair_rejects_identical_extensions() {
        let err = ExtensionPair::new("java", ".java").unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }

    #[test]
    fn extension_pair_rejects_paths() {
        assert!(ExtensionPair::new("src/java", "kt").is_err());
        assert!(ExtensionPair::new("", "kt").is_err());
    }

    #[test]
    fn rename_extension_keeps_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Widget.java");
        fs::write(&path, "class Widget {}\n").unwrap();

        let mut handle = FileHandle::new(&path);
        handle.rename_extension("kt").unwrap();

        assert_eq!(handle.path(), dir.path().join("Widget.kt"));
        assert!(!path.exists());
        assert_eq!(handle.name(), "Widget.kt");
    }

    #[test]
    fn rename_extension_never_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("Widget.java");
        let taken = dir.path().join("Widget.kt");
        fs::write(&source, "class Widget {}\n").unwrap();
        fs::write(&taken, "class Widget\n").unwrap();

        let mut handle = FileHandle::new(&source);
        let err = handle.rename_extension("kt").unwrap_err();

        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert_eq!(handle.path(), source);
        assert_eq!(fs::read_to_string(&taken).unwrap(), "class Widget\n");
        assert!(source.exists());
    }

    #[test]
    fn convertibility_excludes_build_subtree() {
        let dir = tempfile::tempdir().unwrap();
        let build = dir.path().join("sub").join("build");
        fs::create_dir_all(&build).unwrap();
        fs::write(build.join("D.java"), "").unwrap();
        fs::write(dir.path().join("sub").join("C.java"), "").unwrap();

        let rules = Convertibility::for_pair(&ExtensionPair::default());
        assert!(!rules.accepts(&FileHandle::new(build.join("D.java")), dir.path()));
        assert!(rules.accepts(&FileHandle::new(dir.path().join("sub").join("C.java")), dir.path()));
    }

    #[test]
    fn convertibility_rejects_wrong_extension_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("A.kt"), "").unwrap();
        fs::create_dir_all(dir.path().join("pkg.java")).unwrap();

        let rules = Convertibility::for_pair(&ExtensionPair::default());
        assert!(!rules.accepts(&FileHandle::new(dir.path().join("A.kt")), dir.path()));
        assert!(!rules.accepts(&FileHandle::new(dir.path().join("pkg.java")), dir.path()));
    }

    #[test]
    fn convertibility_rejects_read_only_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Locked.java");
        fs::write(&path, "").unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&path, perms).unwrap();

        let rules = Convertibility::for_pair(&ExtensionPair::default());
        assert!(!rules.accepts(&FileHandle::new(&path), dir.path()));
    }

    #[test]
    fn excluded_marker_only_matches_whole_components() {
        let rules = Convertibility::for_pair(&ExtensionPair::default());
        let root = Path::new("/repo");
        assert!(rules.is_under_excluded(Path::new("/repo/app/build/A.java"), root));
        assert!(!rules.is_under_excluded(Path::new("/repo/buildSrc/A.java"), root));
        assert!(!rules.is_under_excluded(Path::new("/repo/build.java"), root));
    }
}
