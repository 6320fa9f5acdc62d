use clap::Args;
use std::path::PathBuf;

use carryover::file::FileHandle;
use carryover::selection::AcceptAll;
use carryover::trigger::common_base;
use carryover::vcs::GitResolver;
use carryover::workflow::Workflow;

use super::convert::ConvertOutput;
use super::{canonical, commit_message, resolve_dir, CmdResult, CommitArgs, Settings};

#[derive(Args)]
pub struct SelectedArgs {
    /// Files or directories to convert
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Project directory used to find version control (defaults to the deepest
    /// directory shared by the selected paths)
    #[arg(long)]
    pub base: Option<String>,

    /// Message for the rename commit (prompted for on a terminal)
    #[arg(short, long)]
    pub message: Option<String>,
}

pub fn run(args: SelectedArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ConvertOutput> {
    let settings = Settings::load()?;

    let mut paths: Vec<PathBuf> = Vec::with_capacity(args.paths.len());
    for raw in &args.paths {
        let path = carryover::paths::expand(raw);
        if !path.exists() {
            return Err(carryover::Error::validation_invalid_argument(
                "paths",
                "File not found",
                Some(raw.clone()),
                None,
            ));
        }
        paths.push(canonical(&path)?);
    }

    let base = match args.base.as_deref() {
        Some(base) => resolve_dir(Some(base), "base")?,
        None => {
            let handles: Vec<FileHandle> = paths.iter().map(FileHandle::new).collect();
            match common_base(&handles) {
                Some(shared) if shared.is_dir() => shared,
                _ => resolve_dir(None, "base")?,
            }
        }
    };

    let message = commit_message(&CommitArgs {
        message: args.message,
        no_commit: false,
    })?;

    let workflow = Workflow::new(
        settings.pair,
        &GitResolver,
        &AcceptAll,
        settings.converter.as_ref(),
    )
    .with_rules(settings.rules);

    let report = workflow.convert_selected(&paths, &base, &message)?;

    Ok((
        ConvertOutput {
            command: "selected".to_string(),
            root: base.display().to_string(),
            report,
        },
        0,
    ))
}
