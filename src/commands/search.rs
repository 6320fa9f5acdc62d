use clap::Args;
use serde::Serialize;

use carryover::cancel::CancelToken;
use carryover::defaults::{self, SearchPreferences};
use carryover::search::{self, Comparison, NamePattern, SearchCriteria};
use carryover::selection::ConfirmRequest;

use super::{resolve_dir, CmdResult, Settings};

/// Discovery filters shared by `search` and `convert`.
#[derive(Args, Debug, Default)]
pub struct CriteriaArgs {
    /// Keep files whose name contains this text
    #[arg(long)]
    pub regex: Option<String>,

    /// Treat --regex as a regular expression instead of literal text
    #[arg(long, requires = "regex")]
    pub regex_syntax: bool,

    /// Line-count threshold; a negative value disables the line-count filter
    #[arg(long, allow_hyphen_values = true)]
    pub lines: Option<String>,

    /// How line counts compare to --lines: lt, le, eq, ge, gt
    #[arg(long, requires = "lines")]
    pub compare: Option<String>,

    /// Start from the remembered search values
    #[arg(long)]
    pub last: bool,

    /// Remember these search values for next time
    #[arg(long)]
    pub remember: bool,
}

impl CriteriaArgs {
    /// Fold the flags over the starting preferences.
    fn preferences(&self) -> carryover::Result<SearchPreferences> {
        let mut prefs = if self.last {
            defaults::load_preferences()
        } else {
            SearchPreferences::default()
        };

        if let Some(regex) = &self.regex {
            prefs.regex_enabled = !regex.is_empty();
            prefs.regex = regex.clone();
        }
        if let Some(raw) = &self.lines {
            let threshold = search::parse_threshold(raw)?;
            prefs.line_count_enabled = threshold >= 0;
            prefs.line_count = threshold;
        }
        if let Some(compare) = &self.compare {
            prefs.comparison = compare.parse::<Comparison>()?;
        }
        Ok(prefs)
    }

    pub fn to_criteria(&self) -> carryover::Result<SearchCriteria> {
        let prefs = self.preferences()?;
        let mut criteria = prefs.to_criteria();
        if self.regex_syntax && prefs.regex_enabled {
            criteria = criteria.with_pattern(NamePattern::regex(&prefs.regex));
        }

        if criteria.pattern.is_none() && criteria.active_line_count().is_none() {
            return Err(carryover::Error::validation_missing_argument(vec![
                "--regex".to_string(),
                "--lines".to_string(),
            ])
            .with_hint("Pass --last to reuse the previous search"));
        }

        if self.remember {
            defaults::save_preferences(&SearchPreferences {
                commit_message: defaults::load_preferences().commit_message,
                ..prefs
            })?;
        }
        Ok(criteria)
    }
}

#[derive(Args)]
pub struct SearchArgs {
    /// Directory to search (defaults to the current directory)
    pub path: Option<String>,

    #[command(flatten)]
    pub criteria: CriteriaArgs,
}

#[derive(Debug, Serialize)]
pub struct SearchOutput {
    command: String,
    root: String,
    count: usize,
    candidates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

pub fn run(args: SearchArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<SearchOutput> {
    let settings = Settings::load()?;
    let root = resolve_dir(args.path.as_deref(), "path")?;
    let criteria = args.criteria.to_criteria()?;

    let found = search::run_search(&root, &criteria, &settings.rules, &CancelToken::new())?;
    let request = ConfirmRequest::new(found, settings.selection_cap);

    Ok((
        SearchOutput {
            command: "search".to_string(),
            root: root.display().to_string(),
            count: request.candidates.len(),
            candidates: request
                .candidates
                .iter()
                .map(|f| f.relative_to(&root))
                .collect(),
            warning: request.warning,
        },
        0,
    ))
}
