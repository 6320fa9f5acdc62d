use clap::Args;
use std::path::{Path, PathBuf};

use carryover::defaults::{self, Defaults};
use carryover::file::{Convertibility, ExtensionPair};
use carryover::paths;
use carryover::trigger::{CommandConverter, Converter, NullConverter};

pub type CmdResult<T> = carryover::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

/// Commit options shared by the converting commands.
#[derive(Args, Default, Debug)]
pub struct CommitArgs {
    /// Message for the rename commit (prompted for on a terminal)
    #[arg(short, long)]
    pub message: Option<String>,

    /// Convert without recording the rename in version control
    #[arg(long)]
    pub no_commit: bool,
}

/// Settings every converting command needs, resolved from carryover.json.
pub(crate) struct Settings {
    pub pair: ExtensionPair,
    pub rules: Convertibility,
    pub selection_cap: usize,
    pub converter: Box<dyn Converter>,
}

impl Settings {
    pub fn load() -> carryover::Result<Self> {
        Self::from_defaults(&defaults::load_config().defaults)
    }

    fn from_defaults(defaults: &Defaults) -> carryover::Result<Self> {
        let pair = defaults.extension_pair()?;
        let converter: Box<dyn Converter> = match &defaults.converter {
            Some(config) => Box::new(CommandConverter::from_command(&config.command)?),
            None => Box::new(NullConverter),
        };
        Ok(Self {
            rules: defaults.convertibility(&pair),
            pair,
            selection_cap: defaults.selection_cap,
            converter,
        })
    }
}

/// Resolve a directory argument (defaults to the current directory).
pub(crate) fn resolve_dir(path: Option<&str>, field: &str) -> carryover::Result<PathBuf> {
    let dir = match path {
        Some(p) => paths::expand(p),
        None => std::env::current_dir().map_err(|e| {
            carryover::Error::internal_io(e.to_string(), Some("read current dir".to_string()))
        })?,
    };
    if !dir.is_dir() {
        return Err(carryover::Error::validation_invalid_argument(
            field,
            "Not a directory",
            Some(dir.display().to_string()),
            None,
        ));
    }
    canonical(&dir)
}

pub(crate) fn canonical(path: &Path) -> carryover::Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|e| {
        carryover::Error::internal_io(e.to_string(), Some(format!("resolve {}", path.display())))
    })
}

/// The commit message to use, prompting on a terminal when none was given.
pub(crate) fn commit_message(args: &CommitArgs) -> carryover::Result<String> {
    if args.no_commit {
        return Ok(args.message.clone().unwrap_or_default());
    }
    if let Some(message) = &args.message {
        return Ok(message.clone());
    }
    if !crate::tty::can_prompt() {
        return Err(carryover::Error::validation_missing_argument(vec![
            "--message".to_string(),
        ]));
    }

    let mut preferences = defaults::load_preferences();
    let message = crate::tty::prompt_with_default("Commit message", &preferences.commit_message)?;
    if message != preferences.commit_message && !message.trim().is_empty() {
        preferences.commit_message = message.clone();
        if let Err(err) = defaults::save_preferences(&preferences) {
            carryover::log_status!("config", "Could not remember commit message: {}", err.message);
        }
    }
    Ok(message)
}

pub mod config;
pub mod convert;
pub mod list;
pub mod search;
pub mod selected;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (carryover::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Search(args) => dispatch!(args, global, search),
        crate::Commands::Convert(args) => dispatch!(args, global, convert),
        crate::Commands::List(args) => dispatch!(args, global, list),
        crate::Commands::Selected(args) => dispatch!(args, global, selected),
        crate::Commands::Config(args) => dispatch!(args, global, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carryover::defaults::ConverterConfig;

    #[test]
    fn settings_follow_config_defaults() {
        let defaults = Defaults {
            source_extension: ".groovy".to_string(),
            excluded_dirs: vec!["out".to_string()],
            selection_cap: 5,
            ..Defaults::default()
        };
        let settings = Settings::from_defaults(&defaults).unwrap();
        assert_eq!(settings.pair.source, "groovy");
        assert_eq!(settings.pair.target, "kt");
        assert_eq!(settings.selection_cap, 5);
        assert!(settings.rules.is_excluded_dir("out"));
        assert_eq!(settings.converter.name(), "none");
    }

    #[test]
    fn configured_converter_is_used() {
        let defaults = Defaults {
            converter: Some(ConverterConfig {
                command: vec!["j2k".to_string(), "--in-place".to_string()],
            }),
            ..Defaults::default()
        };
        let settings = Settings::from_defaults(&defaults).unwrap();
        assert_eq!(settings.converter.name(), "j2k");
    }

    #[test]
    fn no_commit_needs_no_message() {
        let args = CommitArgs {
            message: None,
            no_commit: true,
        };
        assert_eq!(commit_message(&args).unwrap(), "");
    }

    #[test]
    fn explicit_message_is_used_verbatim() {
        let args = CommitArgs {
            message: Some("Convert Foo".to_string()),
            no_commit: false,
        };
        assert_eq!(commit_message(&args).unwrap(), "Convert Foo");
    }

    #[test]
    fn missing_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = resolve_dir(missing.to_str(), "path").unwrap_err();
        assert_eq!(err.details["field"], "path");
    }
}
