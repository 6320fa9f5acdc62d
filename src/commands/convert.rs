use clap::Args;
use serde::Serialize;

use carryover::selection::{AcceptAll, AcceptDefaults, Confirmer};
use carryover::vcs::GitResolver;
use carryover::workflow::{Workflow, WorkflowReport};

use super::search::CriteriaArgs;
use super::{commit_message, resolve_dir, CmdResult, CommitArgs, Settings};

#[derive(Args)]
pub struct ConvertArgs {
    /// Project directory to search (defaults to the current directory)
    pub path: Option<String>,

    #[command(flatten)]
    pub criteria: CriteriaArgs,

    #[command(flatten)]
    pub commit: CommitArgs,

    /// Skip the picker and take the pre-selected files
    #[arg(short, long, conflicts_with = "all")]
    pub yes: bool,

    /// Skip the picker and take every candidate, ignoring the soft cap
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
pub struct ConvertOutput {
    pub command: String,
    pub root: String,
    #[serde(flatten)]
    pub report: WorkflowReport,
}

pub(crate) fn confirmer(yes: bool, all: bool) -> carryover::Result<Box<dyn Confirmer>> {
    if all {
        return Ok(Box::new(AcceptAll));
    }
    if yes {
        return Ok(Box::new(AcceptDefaults));
    }
    if !crate::tty::can_prompt() {
        return Err(carryover::Error::validation_missing_argument(vec![
            "--yes".to_string(),
            "--all".to_string(),
        ])
        .with_hint("File confirmation needs a terminal; pass --yes or --all when scripting"));
    }
    Ok(Box::new(crate::tty::TtyConfirmer))
}

pub fn run(args: ConvertArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ConvertOutput> {
    let settings = Settings::load()?;
    let root = resolve_dir(args.path.as_deref(), "path")?;
    let criteria = args
        .criteria
        .to_criteria()?
        .with_auto_commit(!args.commit.no_commit);
    let confirmer = confirmer(args.yes, args.all)?;
    let message = commit_message(&args.commit)?;

    let workflow = Workflow::new(
        settings.pair,
        &GitResolver,
        confirmer.as_ref(),
        settings.converter.as_ref(),
    )
    .with_rules(settings.rules)
    .with_selection_cap(settings.selection_cap);

    let report = workflow.search_and_convert(&root, &criteria, &message)?;

    Ok((
        ConvertOutput {
            command: "convert".to_string(),
            root: root.display().to_string(),
            report,
        },
        0,
    ))
}
