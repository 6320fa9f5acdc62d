//! Hand-off to the external converter once files are staged.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::file::FileHandle;
use crate::utils::command;

/// What the converter needs besides the files themselves.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionContext {
    pub project_base: PathBuf,
}

impl ConversionContext {
    pub fn new(project_base: impl Into<PathBuf>) -> Self {
        Self {
            project_base: project_base.into(),
        }
    }
}

pub trait Converter {
    fn name(&self) -> &str;

    fn apply(&self, files: &[FileHandle], context: &ConversionContext) -> Result<()>;
}

/// Runs an external program with the staged file paths appended.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a `[program, args...]` list as stored in config.
    pub fn from_command(command: &[String]) -> Result<Self> {
        let (program, args) = command.split_first().ok_or_else(|| {
            Error::config_invalid_value(
                "defaults.converter.command",
                None,
                "Converter command must name a program",
            )
        })?;
        if program.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "defaults.converter.command",
                Some(program.clone()),
                "Converter command must name a program",
            ));
        }
        Ok(Self::new(program.clone(), args.to_vec()))
    }
}

impl Converter for CommandConverter {
    fn name(&self) -> &str {
        &self.program
    }

    fn apply(&self, files: &[FileHandle], context: &ConversionContext) -> Result<()> {
        let paths: Vec<String> = files
            .iter()
            .map(|f| f.path().to_string_lossy().to_string())
            .collect();
        let mut args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        args.extend(paths.iter().map(String::as_str));

        crate::log_status!("convert", "Running {} on {} file(s)", self.program, files.len());
        match command::capture_in(&context.project_base, &self.program, &args) {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(Error::converter_failed(
                &self.program,
                command::error_text(&output),
            )),
            Err(e) => Err(Error::converter_failed(&self.program, e.to_string())),
        }
    }
}

/// Leaves the files staged for a converter run outside this tool.
pub struct NullConverter;

impl Converter for NullConverter {
    fn name(&self) -> &str {
        "none"
    }

    fn apply(&self, files: &[FileHandle], context: &ConversionContext) -> Result<()> {
        crate::log_status!(
            "convert",
            "{} file(s) under {} are ready for conversion",
            files.len(),
            context.project_base.display()
        );
        Ok(())
    }
}

/// Whether the trigger may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerGate {
    /// The coordinator ran; carries its success flag.
    Committed(bool),
    /// The caller chose to convert without a history commit.
    WithoutCommit,
}

impl TriggerGate {
    fn is_open(self) -> bool {
        matches!(self, TriggerGate::Committed(true) | TriggerGate::WithoutCommit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TriggerOutcome {
    Invoked { converter: String, files: usize },
    Skipped { reason: String },
}

pub struct ConversionTrigger<'a> {
    converter: &'a dyn Converter,
}

impl<'a> ConversionTrigger<'a> {
    pub fn new(converter: &'a dyn Converter) -> Self {
        Self { converter }
    }

    /// Invoke the converter, unless the set is empty or the gate is closed.
    pub fn fire(
        &self,
        files: &[FileHandle],
        context: &ConversionContext,
        gate: TriggerGate,
    ) -> Result<TriggerOutcome> {
        if files.is_empty() {
            return Ok(TriggerOutcome::Skipped {
                reason: "no files".to_string(),
            });
        }
        if !gate.is_open() {
            return Ok(TriggerOutcome::Skipped {
                reason: "rename commit did not succeed".to_string(),
            });
        }

        self.converter.apply(files, context)?;
        Ok(TriggerOutcome::Invoked {
            converter: self.converter.name().to_string(),
            files: files.len(),
        })
    }
}

/// Project base for a set of explicit files: the deepest directory they share.
pub fn common_base(files: &[FileHandle]) -> Option<PathBuf> {
    let mut base: Option<PathBuf> = None;
    for file in files {
        let parent = file.path().parent().unwrap_or(Path::new("")).to_path_buf();
        base = Some(match base {
            None => parent,
            Some(current) => {
                let shared: PathBuf = current
                    .components()
                    .zip(parent.components())
                    .take_while(|(a, b)| a == b)
                    .map(|(a, _)| a)
                    .collect();
                shared
            }
        });
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recording {
        calls: RefCell<Vec<usize>>,
    }

    impl Converter for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn apply(&self, files: &[FileHandle], _context: &ConversionContext) -> Result<()> {
            self.calls.borrow_mut().push(files.len());
            Ok(())
        }
    }

    fn files() -> Vec<FileHandle> {
        vec![FileHandle::new("/p/src/A.java"), FileHandle::new("/p/src/b/B.java")]
    }

    #[test]
    fn fires_only_when_commit_succeeded() {
        let converter = Recording::default();
        let trigger = ConversionTrigger::new(&converter);
        let context = ConversionContext::new("/p");

        let skipped = trigger
            .fire(&files(), &context, TriggerGate::Committed(false))
            .unwrap();
        assert!(matches!(skipped, TriggerOutcome::Skipped { .. }));
        assert!(converter.calls.borrow().is_empty());

        let invoked = trigger
            .fire(&files(), &context, TriggerGate::Committed(true))
            .unwrap();
        assert_eq!(
            invoked,
            TriggerOutcome::Invoked {
                converter: "recording".into(),
                files: 2
            }
        );
    }

    #[test]
    fn never_fires_with_empty_set() {
        let converter = Recording::default();
        let trigger = ConversionTrigger::new(&converter);

        let outcome = trigger
            .fire(&[], &ConversionContext::new("/p"), TriggerGate::WithoutCommit)
            .unwrap();

        assert!(matches!(outcome, TriggerOutcome::Skipped { .. }));
        assert!(converter.calls.borrow().is_empty());
    }

    #[test]
    fn without_commit_gate_is_open() {
        let converter = Recording::default();
        ConversionTrigger::new(&converter)
            .fire(&files(), &ConversionContext::new("/p"), TriggerGate::WithoutCommit)
            .unwrap();
        assert_eq!(*converter.calls.borrow(), vec![2]);
    }

    #[test]
    fn empty_converter_command_is_rejected() {
        let err = CommandConverter::from_command(&[]).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[cfg(unix)]
    #[test]
    fn command_converter_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let converter = CommandConverter::new("false", Vec::new());
        let err = converter
            .apply(&files(), &ConversionContext::new(dir.path()))
            .unwrap_err();
        assert_eq!(err.code.as_str(), "convert.converter_failed");
    }

    #[test]
    fn common_base_is_deepest_shared_directory() {
        assert_eq!(common_base(&files()), Some(PathBuf::from("/p/src")));
        assert_eq!(common_base(&[]), None);
    }
}
