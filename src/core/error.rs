use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationMissingArgument,
    ValidationInvalidArgument,
    ValidationInvalidJson,

    ConvertEmptyCommitMessage,
    ConvertNoVersionControl,
    ConvertRenameFailed,
    ConvertBusy,
    ConvertCancelled,
    ConvertConverterFailed,

    VcsCommandFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",
            ErrorCode::ValidationInvalidJson => "validation.invalid_json",

            ErrorCode::ConvertEmptyCommitMessage => "convert.empty_commit_message",
            ErrorCode::ConvertNoVersionControl => "convert.no_version_control",
            ErrorCode::ConvertRenameFailed => "convert.rename_failed",
            ErrorCode::ConvertBusy => "convert.busy",
            ErrorCode::ConvertCancelled => "convert.cancelled",
            ErrorCode::ConvertConverterFailed => "convert.converter_failed",

            ErrorCode::VcsCommandFailed => "vcs.command_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoVersionControlDetails {
    pub project_base: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameFailedDetails<P: Serialize> {
    pub file: String,
    pub cause: String,
    pub partial: P,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusyDetails {
    pub lock_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverterFailedDetails {
    pub converter: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    /// Cancellations are reported to the user but are not failures.
    pub fn is_informational(&self) -> bool {
        self.code == ErrorCode::ConvertCancelled
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ValidationMissingArgument,
            "Missing required argument",
            to_details(MissingArgumentDetails { args }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            id,
            tried,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn validation_invalid_json(
        err: serde_json::Error,
        context: Option<String>,
        input_preview: Option<String>,
    ) -> Self {
        let details = serde_json::json!({
            "error": err.to_string(),
            "context": context,
            "inputPreview": input_preview,
        });

        Self::new(ErrorCode::ValidationInvalidJson, "Invalid JSON", details)
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn empty_commit_message() -> Self {
        Self::new(
            ErrorCode::ConvertEmptyCommitMessage,
            "Commit message cannot be empty",
            Value::Object(serde_json::Map::new()),
        )
        .with_hint("Pass a non-blank message with --message")
    }

    pub fn no_version_control(project_base: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConvertNoVersionControl,
            "Unable to find version control for the selected project",
            to_details(NoVersionControlDetails {
                project_base: project_base.into(),
            }),
        )
        .with_hint("Run inside a git working tree, or pass --no-commit to skip the history commit")
    }

    /// A single rename (forward or back) failed. `partial` describes which files
    /// were already renamed so the caller can restore the tree by hand.
    pub fn rename_failed<P: Serialize>(
        file: impl Into<String>,
        cause: impl Into<String>,
        partial: P,
    ) -> Self {
        let file = file.into();
        let message = format!("Error while renaming file `{}`", file);
        let details = to_details(RenameFailedDetails {
            file,
            cause: cause.into(),
            partial,
        });

        Self::new(ErrorCode::ConvertRenameFailed, message, details).with_hint(
            "Files listed under details.partial.renamed were not restored automatically",
        )
    }

    pub fn busy(lock_path: impl Into<String>, holder: Option<String>) -> Self {
        let lock_path = lock_path.into();
        let mut err = Self::new(
            ErrorCode::ConvertBusy,
            "Another conversion is already running in this working tree",
            to_details(BusyDetails {
                lock_path: lock_path.clone(),
                holder,
            }),
        )
        .with_hint(format!(
            "If no conversion is running, remove the stale lock: {}",
            lock_path
        ));
        err.retryable = Some(true);
        err
    }

    pub fn cancelled(stage: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConvertCancelled,
            "Operation cancelled",
            serde_json::json!({ "stage": stage.into() }),
        )
    }

    pub fn converter_failed(converter: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConvertConverterFailed,
            "External converter failed",
            to_details(ConverterFailedDetails {
                converter: converter.into(),
                error: error.into(),
            }),
        )
    }

    pub fn vcs_command_failed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::VcsCommandFailed,
            message,
            Value::Object(serde_json::Map::new()),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
