//! Candidate discovery: find convertible files by name list, regex and line count.
//!
//! Stages compose left to right: a name list or a regex sources the initial
//! set, and the line-count stage narrows it (or sources it alone). Searching
//! never writes to the working tree.

mod criteria;
mod filter;

pub use criteria::{parse_threshold, Comparison, LineCountFilter, NamePattern, SearchCriteria};
pub use filter::{
    count_lines, filter_by_line_count, filter_by_names, filter_by_regex, CandidateSet,
    LineCountSource,
};

pub(crate) use filter::find_matching;

use std::path::Path;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::file::Convertibility;

/// Run every stage described by `criteria` against the tree at `root`.
pub fn run_search(
    root: &Path,
    criteria: &SearchCriteria,
    rules: &Convertibility,
    cancel: &CancelToken,
) -> Result<CandidateSet> {
    criteria.validate()?;

    let sourced = if let Some(names) = &criteria.names {
        Some(filter_by_names(root, names, rules)?)
    } else if let Some(pattern) = &criteria.pattern {
        Some(filter_by_regex(root, &pattern.compile()?, rules)?)
    } else {
        None
    };

    let Some(line_count) = criteria.active_line_count() else {
        return Ok(sourced.unwrap_or_default());
    };

    let source = match sourced {
        Some(candidates) => LineCountSource::Candidates(candidates),
        None => LineCountSource::Root(root.to_path_buf()),
    };

    crate::log_status!("search", "Scanning files...");
    filter_by_line_count(source, line_count, rules, cancel)
}
