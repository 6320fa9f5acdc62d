//! Candidate discovery: tree traversal plus name, regex and line-count filters.

use regex::Regex;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use walkdir::{DirEntry, WalkDir};

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::file::{Convertibility, FileHandle};
use crate::utils::io;

use super::criteria::LineCountFilter;

/// Ordered, deterministic result of one filter stage.
pub type CandidateSet = Vec<FileHandle>;

/// VCS metadata directories are never part of a working tree's sources.
const ALWAYS_SKIP_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Where the line-count stage takes its input from.
#[derive(Debug, Clone)]
pub enum LineCountSource {
    /// No earlier stage ran: traverse the tree.
    Root(PathBuf),
    /// Narrow the output of an earlier stage without re-traversing.
    Candidates(CandidateSet),
}

// ============================================================================
// Traversal
// ============================================================================

fn is_pruned(entry: &DirEntry, rules: &Convertibility) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    ALWAYS_SKIP_DIRS.contains(&name.as_ref()) || rules.is_excluded_dir(&name)
}

/// Files a traversal kept, plus the paths it could not read.
#[derive(Debug, Default)]
pub(crate) struct Walk {
    pub found: CandidateSet,
    pub skipped: Vec<PathBuf>,
}

/// Visit every convertible file under `root` depth-first in file-name order,
/// keeping those accepted by `matcher`. Unreadable entries are logged and
/// skipped so a partial scan stays visible.
pub(crate) fn walk<F>(root: &Path, rules: &Convertibility, mut matcher: F) -> Result<Walk>
where
    F: FnMut(&FileHandle) -> Result<bool>,
{
    let mut walk = Walk::default();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_pruned(e, rules));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                crate::log_status!("search", "Skipping unreadable path {}: {}", path.display(), err);
                walk.skipped.push(path);
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }
        let file = FileHandle::new(entry.path());
        if rules.accepts(&file, root) && matcher(&file)? {
            walk.found.push(file);
        }
    }

    Ok(walk)
}

pub(crate) fn find_matching<F>(root: &Path, rules: &Convertibility, matcher: F) -> Result<CandidateSet>
where
    F: FnMut(&FileHandle) -> Result<bool>,
{
    Ok(walk(root, rules, matcher)?.found)
}

// ============================================================================
// Filters
// ============================================================================

/// True when `path` ends with `name` on a path-component boundary.
fn ends_with_name(path: &str, name: &str) -> bool {
    let name = name.trim_start_matches(['/', '\\']);
    if name.is_empty() || !path.ends_with(name) {
        return false;
    }
    let prefix = &path[..path.len() - name.len()];
    prefix.is_empty() || prefix.ends_with('/') || prefix.ends_with(MAIN_SEPARATOR)
}

/// Convertible files whose canonical path ends with one of `names`.
///
/// A file matching several names is still returned once.
pub fn filter_by_names(root: &Path, names: &[String], rules: &Convertibility) -> Result<CandidateSet> {
    let normalized: Vec<String> = names
        .iter()
        .map(|n| n.trim().replace('\\', "/"))
        .filter(|n| !n.is_empty())
        .collect();

    find_matching(root, rules, |file| {
        let canonical = file.canonical_path().replace('\\', "/");
        Ok(normalized.iter().any(|name| ends_with_name(&canonical, name)))
    })
}

/// Convertible files whose bare name contains a match for `pattern`.
pub fn filter_by_regex(root: &Path, pattern: &Regex, rules: &Convertibility) -> Result<CandidateSet> {
    find_matching(root, rules, |file| Ok(pattern.is_match(&file.name())))
}

/// Count lines the way an editor does: every `\r\n`, `\n` or lone `\r` is one
/// boundary and the text after the last boundary is a line too, so an empty
/// file has one line and a trailing newline adds an empty final line.
pub fn count_lines(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut boundaries = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => boundaries += 1,
            b'\r' => {
                boundaries += 1;
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    boundaries + 1
}

fn file_line_count(file: &FileHandle) -> Result<usize> {
    let text = io::read_text_lossy(file.path(), &format!("count lines in {}", file))?;
    Ok(count_lines(&text))
}

/// Keep files whose line count satisfies `filter`.
///
/// With `Candidates` the set is narrowed in place; with `Root` the tree is
/// traversed. A disabled filter (negative threshold) leaves candidates as
/// they are and sources nothing from a root. The token is checked before
/// each file is read.
pub fn filter_by_line_count(
    source: LineCountSource,
    filter: LineCountFilter,
    rules: &Convertibility,
    cancel: &CancelToken,
) -> Result<CandidateSet> {
    match source {
        LineCountSource::Candidates(mut candidates) => {
            if !filter.is_enabled() {
                return Ok(candidates);
            }
            let mut kept = Vec::with_capacity(candidates.len());
            for file in candidates.drain(..) {
                cancel.check("line_count")?;
                if filter.matches(file_line_count(&file)?) {
                    kept.push(file);
                }
            }
            Ok(kept)
        }
        LineCountSource::Root(root) => {
            if !filter.is_enabled() {
                return Ok(Vec::new());
            }
            find_matching(&root, rules, |file| {
                cancel.check("line_count")?;
                Ok(filter.matches(file_line_count(file)?))
            })
        }
    }
}
