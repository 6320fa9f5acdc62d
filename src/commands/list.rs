use clap::Args;
use std::io::{IsTerminal, Read};

use carryover::selection::AcceptAll;
use carryover::utils::{io, validation};
use carryover::vcs::GitResolver;
use carryover::workflow::Workflow;

use super::convert::ConvertOutput;
use super::{commit_message, resolve_dir, CmdResult, CommitArgs, Settings};

#[derive(Args)]
pub struct ListArgs {
    /// File names or path suffixes to convert (e.g. `Foo.java`, `app/src/Bar.java`)
    pub names: Vec<String>,

    /// Read newline-separated names from a file, or `-` for stdin
    #[arg(long, value_name = "FILE")]
    pub from_file: Option<String>,

    /// Project directory (defaults to the current directory)
    #[arg(long)]
    pub path: Option<String>,

    #[command(flatten)]
    pub commit: CommitArgs,
}

fn read_names(args: &ListArgs) -> carryover::Result<String> {
    let mut text = args.names.join("\n");
    let Some(source) = &args.from_file else {
        return Ok(text);
    };

    let extra = if source.trim() == "-" {
        let mut stdin = std::io::stdin();
        if stdin.is_terminal() {
            return Err(carryover::Error::validation_invalid_argument(
                "from_file",
                "Cannot read names from stdin when stdin is a TTY",
                None,
                None,
            ));
        }
        let mut buf = String::new();
        stdin.read_to_string(&mut buf).map_err(|e| {
            carryover::Error::internal_io(e.to_string(), Some("read stdin".to_string()))
        })?;
        buf
    } else {
        io::read_text_lossy(&carryover::paths::expand(source), "read name list")?
    };

    if !text.is_empty() {
        text.push('\n');
    }
    text.push_str(&extra);
    Ok(text)
}

pub fn run(args: ListArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ConvertOutput> {
    let settings = Settings::load()?;
    let root = resolve_dir(args.path.as_deref(), "path")?;
    let names = read_names(&args)?;
    validation::require_non_empty(&names, "names", "Give at least one file name or --from-file")?;
    let message = commit_message(&args.commit)?;

    let workflow = Workflow::new(
        settings.pair,
        &GitResolver,
        &AcceptAll,
        settings.converter.as_ref(),
    )
    .with_rules(settings.rules);

    let report = workflow.convert_list(&root, &names, !args.commit.no_commit, &message)?;

    Ok((
        ConvertOutput {
            command: "list".to_string(),
            root: root.display().to_string(),
            report,
        },
        0,
    ))
}
